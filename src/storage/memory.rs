use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::storage::{
    error::{Result, StorageError},
    store::ResultRepository,
};

/// In-memory result repository with a unique key on `id`
///
/// Mirrors the `results` table semantics without a database; useful for
/// tests and local runs of the HTTP layer.
#[derive(Debug, Default)]
pub struct InMemoryResults {
    rows: Mutex<HashMap<String, f64>>,
}

impl InMemoryResults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored rows
    pub fn len(&self) -> usize {
        self.rows.lock().map(|rows| rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ResultRepository for InMemoryResults {
    async fn get_result(&self, id: &str) -> Result<f64> {
        let rows = self
            .rows
            .lock()
            .map_err(|e| StorageError::Query(e.to_string()))?;

        rows.get(id)
            .copied()
            .ok_or_else(|| StorageError::NotFound { id: id.to_string() })
    }

    async fn insert_result(&self, id: &str, delivery_time: f64) -> Result<()> {
        let mut rows = self
            .rows
            .lock()
            .map_err(|e| StorageError::Query(e.to_string()))?;

        if rows.contains_key(id) {
            return Err(StorageError::Constraint(format!(
                "duplicate key value violates unique constraint \"results_pkey\": {}",
                id
            )));
        }

        rows.insert(id.to_string(), delivery_time);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_then_get() {
        let repo = InMemoryResults::new();
        repo.insert_result("order-42", 17.5).await.unwrap();

        assert_eq!(repo.get_result("order-42").await.unwrap(), 17.5);
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_id_is_not_found() {
        let repo = InMemoryResults::new();
        let err = repo.get_result("missing").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_duplicate_keeps_first_value() {
        let repo = InMemoryResults::new();
        repo.insert_result("order-1", 10.0).await.unwrap();

        let err = repo.insert_result("order-1", 99.0).await.unwrap_err();
        assert!(matches!(err, StorageError::Constraint(_)));
        assert_eq!(repo.get_result("order-1").await.unwrap(), 10.0);
    }
}
