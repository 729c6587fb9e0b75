use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rdkafka::client::ClientContext;
use rdkafka::consumer::{BaseConsumer, Consumer, ConsumerContext, Rebalance, StreamConsumer};
use rdkafka::error::KafkaError;
use rdkafka::Offset;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::consumer::{
    config::ConsumerGroupConfig,
    error::{ConsumerError, Result},
    handler::{Assignment, ConsumerGroupHandler, Record},
};

const ERROR_CHANNEL_CAPACITY: usize = 256;
const SEEK_TIMEOUT: Duration = Duration::from_secs(5);

/// A live consumer-group membership
///
/// The runner only talks to the group through this capability, so tests can
/// substitute an in-memory session.
#[async_trait]
pub trait GroupSession: Send + Sync {
    /// Join the group for `topics` and dispatch records to `handler`
    ///
    /// Returns `Ok(())` when the current generation ends (partitions revoked
    /// by a rebalance) or when `cancel` fires. Cancellation is only observed
    /// between records; a running handler call is never interrupted.
    ///
    /// A record the handler rejects is handed out again by the next call.
    async fn consume(
        &self,
        topics: &[String],
        handler: Arc<dyn ConsumerGroupHandler>,
        cancel: &CancellationToken,
    ) -> Result<()>;

    /// Channel of background client errors; can be taken once
    fn errors(&self) -> Option<mpsc::Receiver<ConsumerError>>;

    /// Leave the group
    fn close(&self);
}

#[derive(Debug)]
enum GroupEvent {
    Assigned(Assignment),
    Revoked(Assignment),
    Failed(String),
}

/// Forwards rebalance callbacks and client errors onto channels
struct GroupContext {
    events: mpsc::UnboundedSender<GroupEvent>,
    errors: mpsc::Sender<ConsumerError>,
}

impl ClientContext for GroupContext {
    fn error(&self, error: KafkaError, reason: &str) {
        let err = ConsumerError::Consume(format!("{}: {}", error, reason));
        if self.errors.try_send(err).is_err() {
            warn!(error = %error, reason, "consumer error channel full, dropping error");
        }
    }
}

impl ConsumerContext for GroupContext {
    fn pre_rebalance(&self, _consumer: &BaseConsumer<Self>, rebalance: &Rebalance<'_>) {
        if let Rebalance::Revoke(list) = rebalance {
            let _ = self.events.send(GroupEvent::Revoked(Assignment::from(*list)));
        }
    }

    fn post_rebalance(&self, _consumer: &BaseConsumer<Self>, rebalance: &Rebalance<'_>) {
        let event = match rebalance {
            Rebalance::Assign(list) => GroupEvent::Assigned(Assignment::from(*list)),
            Rebalance::Revoke(_) => return,
            Rebalance::Error(e) => GroupEvent::Failed(e.to_string()),
        };
        let _ = self.events.send(event);
    }
}

/// Kafka consumer-group session backed by an rdkafka `StreamConsumer`
pub struct KafkaGroupSession {
    consumer: Arc<StreamConsumer<GroupContext>>,
    events: tokio::sync::Mutex<mpsc::UnboundedReceiver<GroupEvent>>,
    errors: Mutex<Option<mpsc::Receiver<ConsumerError>>>,
    subscription: Mutex<Vec<String>>,
    active: tokio::sync::Mutex<Option<Assignment>>,
}

impl KafkaGroupSession {
    /// Create the client and wait for broker metadata
    ///
    /// Fails with [`ConsumerError::Connection`] when the client cannot be
    /// created or no broker answers within `metadata_timeout`.
    pub async fn connect(config: &ConsumerGroupConfig) -> Result<Self> {
        let session = Self::create(config)?;

        let probe = Arc::clone(&session.consumer);
        let timeout = config.metadata_timeout;

        let metadata = tokio::task::spawn_blocking(move || probe.fetch_metadata(None, timeout))
            .await
            .map_err(|e| ConsumerError::Connection(e.to_string()))?
            .map_err(|e| ConsumerError::Connection(e.to_string()))?;

        info!(
            brokers = metadata.brokers().len(),
            group_id = %config.group_id,
            "consumer group session established"
        );

        Ok(session)
    }

    /// Create the client without contacting a broker
    fn create(config: &ConsumerGroupConfig) -> Result<Self> {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (errors_tx, errors_rx) = mpsc::channel(ERROR_CHANNEL_CAPACITY);

        let context = GroupContext {
            events: events_tx,
            errors: errors_tx,
        };

        let consumer: StreamConsumer<GroupContext> = config
            .client_config()
            .create_with_context(context)
            .map_err(|e| ConsumerError::Connection(e.to_string()))?;

        Ok(Self {
            consumer: Arc::new(consumer),
            events: tokio::sync::Mutex::new(events_rx),
            errors: Mutex::new(Some(errors_rx)),
            subscription: Mutex::new(Vec::new()),
            active: tokio::sync::Mutex::new(None),
        })
    }

    fn ensure_subscribed(&self, topics: &[String]) -> Result<()> {
        let mut current = self
            .subscription
            .lock()
            .map_err(|e| ConsumerError::Consume(e.to_string()))?;

        if current.as_slice() == topics {
            return Ok(());
        }

        let names: Vec<&str> = topics.iter().map(String::as_str).collect();
        self.consumer
            .subscribe(&names)
            .map_err(|e| ConsumerError::Consume(format!("subscribe failed: {}", e)))?;
        info!(topics = ?names, "subscribed");

        *current = topics.to_vec();
        Ok(())
    }

    fn leave(&self) {
        self.consumer.unsubscribe();
        if let Ok(mut current) = self.subscription.lock() {
            current.clear();
        }
    }

    /// Move the read position back onto a record the handler rejected
    ///
    /// The fetcher is already past `offset`. If the seek fails the session
    /// leaves the group, and the next call rejoins from the committed offset,
    /// which never lies past a rejected record.
    fn rewind(&self, topic: &str, partition: i32, offset: i64) {
        match self
            .consumer
            .seek(topic, partition, Offset::Offset(offset), SEEK_TIMEOUT)
        {
            Ok(()) => debug!(topic, partition, offset, "rewound to rejected record"),
            Err(e) => {
                warn!(topic, partition, offset, error = %e, "seek failed, leaving group");
                self.leave();
            }
        }
    }
}

async fn release(handler: &dyn ConsumerGroupHandler, active: &mut Option<Assignment>) {
    if let Some(assignment) = active.take() {
        if let Err(e) = handler.cleanup(&assignment).await {
            warn!(error = %e, "cleanup after failed generation failed");
        }
    }
}

#[async_trait]
impl GroupSession for KafkaGroupSession {
    async fn consume(
        &self,
        topics: &[String],
        handler: Arc<dyn ConsumerGroupHandler>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        self.ensure_subscribed(topics)?;

        // One consume call at a time owns the event stream
        let mut events = self.events.lock().await;
        let mut active = self.active.lock().await;

        // Re-entering after a failed call: the partitions are still ours
        if active.is_none() {
            let current = Assignment::from(&self.consumer.assignment()?);
            if !current.is_empty() {
                handler.setup(&current).await?;
                *active = Some(current);
            }
        }

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    if let Some(assignment) = active.take() {
                        handler.cleanup(&assignment).await?;
                    }
                    return Ok(());
                }
                event = events.recv() => match event {
                    Some(GroupEvent::Assigned(assignment)) => {
                        if let Some(previous) = active.take() {
                            handler.cleanup(&previous).await?;
                        }
                        debug!(partitions = ?assignment.partitions, "partitions assigned");
                        handler.setup(&assignment).await?;
                        *active = Some(assignment);
                    }
                    Some(GroupEvent::Revoked(revoked)) => {
                        debug!(partitions = ?revoked.partitions, "partitions revoked");
                        if let Some(assignment) = active.take() {
                            handler.cleanup(&assignment).await?;
                            return Ok(());
                        }
                    }
                    Some(GroupEvent::Failed(reason)) => {
                        release(handler.as_ref(), &mut active).await;
                        let reason = format!("rebalance failed: {}", reason);
                        return Err(ConsumerError::Consume(reason));
                    }
                    None => {
                        let reason = "group event channel closed".to_string();
                        return Err(ConsumerError::Consume(reason));
                    }
                },
                message = self.consumer.recv() => {
                    let record = Record::from(message?.detach());
                    let (topic, partition, offset) =
                        (record.topic.clone(), record.partition, record.offset);

                    if let Err(e) = handler.consume_record(record).await {
                        self.rewind(&topic, partition, offset);
                        release(handler.as_ref(), &mut active).await;
                        return Err(e.into());
                    }

                    // Next offset to read, picked up by the auto-commit
                    self.consumer.store_offset(&topic, partition, offset + 1)?;
                }
            }
        }
    }

    fn errors(&self) -> Option<mpsc::Receiver<ConsumerError>> {
        self.errors.lock().ok().and_then(|mut errors| errors.take())
    }

    fn close(&self) {
        self.leave();
        info!("left consumer group");
    }
}
