use thiserror::Error;

use crate::storage::StorageError;

/// Result type for consumer-group operations
pub type Result<T> = std::result::Result<T, ConsumerError>;

/// Errors raised by the group session and the runner
#[derive(Debug, Error)]
pub enum ConsumerError {
    /// The group session could not be established
    #[error("Connection error: {0}")]
    Connection(String),

    /// Transient failure while consuming; the runner re-enters the loop
    #[error("Consume error: {0}")]
    Consume(String),

    /// The record handler failed and ended the current consume call
    #[error("Handler error: {0}")]
    Handler(#[from] HandlerError),

    /// Consecutive failures reached the configured limit
    #[error("Giving up after {failures} consecutive consume failures: {last}")]
    TooManyFailures { failures: u32, last: String },
}

impl From<rdkafka::error::KafkaError> for ConsumerError {
    fn from(err: rdkafka::error::KafkaError) -> Self {
        ConsumerError::Consume(err.to_string())
    }
}

/// Errors returned by a [`ConsumerGroupHandler`](super::ConsumerGroupHandler)
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The result store rejected the operation
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("{0}")]
    Other(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_failure_surfaces_through_consumer_error() {
        let storage = StorageError::Query("connection reset".to_string());
        let err: ConsumerError = HandlerError::from(storage).into();

        assert!(matches!(
            err,
            ConsumerError::Handler(HandlerError::Storage(StorageError::Query(_)))
        ));
        assert_eq!(
            err.to_string(),
            "Handler error: Storage error: Query error: connection reset"
        );
    }
}
