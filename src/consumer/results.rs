use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::consumer::{
    error::HandlerError,
    handler::{Assignment, ConsumerGroupHandler, Record},
};
use crate::models::DeliveryResult;
use crate::storage::{ResultRepository, StorageError};

/// Persists predicted delivery times read from the results topic
///
/// Each record carries a JSON [`DeliveryResult`]. Records that cannot be
/// decoded, and ids that are already stored (redelivery after a crash before
/// commit), are logged and skipped so one bad record cannot stall its
/// partition. Any other store failure is returned and ends the consume call.
pub struct ResultHandler {
    repository: Arc<dyn ResultRepository>,
}

impl ResultHandler {
    pub fn new(repository: Arc<dyn ResultRepository>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl ConsumerGroupHandler for ResultHandler {
    async fn setup(&self, assignment: &Assignment) -> Result<(), HandlerError> {
        info!(partitions = ?assignment.partitions, "result handler assigned");
        Ok(())
    }

    async fn consume_record(&self, record: Record) -> Result<(), HandlerError> {
        let Some(payload) = record.payload.as_deref() else {
            warn!(
                topic = %record.topic,
                partition = record.partition,
                offset = record.offset,
                "skipping empty record"
            );
            return Ok(());
        };

        let result: DeliveryResult = match serde_json::from_slice(payload) {
            Ok(result) => result,
            Err(e) => {
                warn!(
                    topic = %record.topic,
                    partition = record.partition,
                    offset = record.offset,
                    error = %e,
                    "skipping undecodable record"
                );
                return Ok(());
            }
        };

        match self
            .repository
            .insert_result(&result.id, result.delivery_time)
            .await
        {
            Ok(()) => {
                info!(id = %result.id, delivery_time = result.delivery_time, "result stored");
                Ok(())
            }
            Err(StorageError::Constraint(reason)) => {
                warn!(id = %result.id, reason = %reason, "result already stored, skipping");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn cleanup(&self, assignment: &Assignment) -> Result<(), HandlerError> {
        info!(partitions = ?assignment.partitions, "result handler released");
        Ok(())
    }
}
