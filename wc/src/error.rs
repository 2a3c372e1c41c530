//! Store error types

use std::time::Duration;
use thiserror::Error;

/// Errors reported by a wide-column store backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Row not found")]
    NotFound,

    #[error("Deadline exceeded after {0:?}")]
    DeadlineExceeded(Duration),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Store error: {0}")]
    Backend(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Blocking task failed: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

impl StoreError {
    /// Check if the store reported a not-found status
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound)
    }

    /// Check if this error is transient and the call may be retried
    pub fn is_retryable(&self) -> bool {
        match self {
            StoreError::DeadlineExceeded(_) => true,
            StoreError::Unavailable(_) => true,
            StoreError::Sqlite(rusqlite::Error::SqliteFailure(err, _)) => matches!(
                err.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ),
            StoreError::Sqlite(_) => false,
            StoreError::NotFound => false,
            StoreError::Backend(_) => false,
            StoreError::TaskJoin(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_not_found() {
        assert!(StoreError::NotFound.is_not_found());
        assert!(!StoreError::Backend("boom".to_string()).is_not_found());
    }

    #[test]
    fn test_is_retryable() {
        assert!(StoreError::DeadlineExceeded(Duration::from_millis(10)).is_retryable());
        assert!(StoreError::Unavailable("connection reset".to_string()).is_retryable());

        // Permanent failures should not be retried
        assert!(!StoreError::NotFound.is_retryable());
        assert!(!StoreError::Backend("bad request".to_string()).is_retryable());
        assert!(!StoreError::Sqlite(rusqlite::Error::InvalidQuery).is_retryable());
    }

    #[test]
    fn test_busy_sqlite_is_retryable() {
        let busy = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            Some("database is locked".to_string()),
        );
        assert!(StoreError::Sqlite(busy).is_retryable());
    }
}
