use async_trait::async_trait;
use rdkafka::message::{Message, OwnedMessage};
use rdkafka::TopicPartitionList;

use crate::consumer::error::HandlerError;

/// A record delivered to a [`ConsumerGroupHandler`]
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub key: Option<Vec<u8>>,
    pub payload: Option<Vec<u8>>,
    /// Milliseconds since the epoch, when the broker supplied one
    pub timestamp: Option<i64>,
}

impl Record {
    /// Create a record without key or timestamp
    pub fn new(
        topic: impl Into<String>,
        partition: i32,
        offset: i64,
        payload: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            topic: topic.into(),
            partition,
            offset,
            key: None,
            payload: Some(payload.into()),
            timestamp: None,
        }
    }

    /// Set the record key (builder pattern)
    pub fn with_key(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// The key as UTF-8, if present and valid
    pub fn key_str(&self) -> Option<&str> {
        self.key.as_deref().and_then(|k| std::str::from_utf8(k).ok())
    }
}

impl From<OwnedMessage> for Record {
    fn from(msg: OwnedMessage) -> Self {
        Self {
            topic: msg.topic().to_string(),
            partition: msg.partition(),
            offset: msg.offset(),
            key: msg.key().map(<[u8]>::to_vec),
            payload: msg.payload().map(<[u8]>::to_vec),
            timestamp: msg.timestamp().to_millis(),
        }
    }
}

/// Partitions owned by this member for one group generation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Assignment {
    pub partitions: Vec<(String, i32)>,
}

impl Assignment {
    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }
}

impl From<&TopicPartitionList> for Assignment {
    fn from(list: &TopicPartitionList) -> Self {
        Self {
            partitions: list
                .elements()
                .iter()
                .map(|e| (e.topic().to_string(), e.partition()))
                .collect(),
        }
    }
}

/// Business logic invoked by the group session
///
/// `setup` runs when a generation's partitions are assigned, `consume_record`
/// once per record in broker order within a partition, and `cleanup` when
/// the generation ends. An error from any of them ends the current consume
/// call; the runner then rejoins.
#[async_trait]
pub trait ConsumerGroupHandler: Send + Sync {
    async fn setup(&self, _assignment: &Assignment) -> Result<(), HandlerError> {
        Ok(())
    }

    async fn consume_record(&self, record: Record) -> Result<(), HandlerError>;

    async fn cleanup(&self, _assignment: &Assignment) -> Result<(), HandlerError> {
        Ok(())
    }
}
