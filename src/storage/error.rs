use std::time::Duration;

use thiserror::Error;
use tokio_postgres::error::SqlState;

/// Result type for result store operations
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors returned by the result store
#[derive(Debug, Error)]
pub enum StorageError {
    /// Connection error - database unreachable or authentication failure
    #[error("Connection error: {0}")]
    Connection(String),

    /// The store did not become reachable before the connect deadline
    #[error("Unable to connect to database within {timeout:?}")]
    ConnectionTimeout { timeout: Duration },

    /// No row matches the requested id
    #[error("Result not found: {id}")]
    NotFound { id: String },

    /// Write violates a constraint declared by the schema
    #[error("Constraint violation: {0}")]
    Constraint(String),

    /// Any other driver-level failure (connection loss, type mismatch)
    #[error("Query error: {0}")]
    Query(String),

    /// Pool checkout failed or the pool was closed
    #[error("Pool error: {0}")]
    Pool(String),

    /// Connection establishment was cancelled
    #[error("Connection cancelled")]
    Cancelled,
}

impl StorageError {
    /// True when the error is a missing row
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound { .. })
    }
}

/// Convert tokio-postgres errors to store errors
impl From<tokio_postgres::Error> for StorageError {
    fn from(err: tokio_postgres::Error) -> Self {
        if let Some(db_error) = err.as_db_error() {
            let code = db_error.code();
            if is_constraint_violation(code) {
                return StorageError::Constraint(format!("{}: {}", code.code(), db_error.message()));
            }
            return StorageError::Query(format!("{}: {}", code.code(), db_error.message()));
        }

        StorageError::Query(err.to_string())
    }
}

/// Convert deadpool errors to store errors
impl From<deadpool_postgres::PoolError> for StorageError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        match err {
            deadpool_postgres::PoolError::Backend(e) => StorageError::Connection(e.to_string()),
            other => StorageError::Pool(other.to_string()),
        }
    }
}

impl From<deadpool_postgres::BuildError> for StorageError {
    fn from(err: deadpool_postgres::BuildError) -> Self {
        StorageError::Connection(err.to_string())
    }
}

// Class 23 is integrity constraint violation
fn is_constraint_violation(code: &SqlState) -> bool {
    code.code().starts_with("23")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constraint_codes() {
        assert!(is_constraint_violation(&SqlState::UNIQUE_VIOLATION));
        assert!(is_constraint_violation(&SqlState::INTEGRITY_CONSTRAINT_VIOLATION));
        assert!(!is_constraint_violation(&SqlState::UNDEFINED_TABLE));
        assert!(!is_constraint_violation(&SqlState::CONNECTION_FAILURE));
    }

    #[test]
    fn test_error_display() {
        let err = StorageError::NotFound {
            id: "order-42".to_string(),
        };
        assert_eq!(err.to_string(), "Result not found: order-42");
        assert!(err.is_not_found());

        let err = StorageError::ConnectionTimeout {
            timeout: Duration::from_secs(10),
        };
        assert_eq!(err.to_string(), "Unable to connect to database within 10s");
        assert!(!err.is_not_found());
    }
}
