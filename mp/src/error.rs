//! Error types for media progress operations

use thiserror::Error;
use widecolumn::StoreError;

/// A stored row that cannot be turned back into a record
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("Malformed row key {0:?}: expected user_id#data_type#title_id#media_id")]
    MalformedRowKey(String),

    #[error("Invalid integer in column {column}: {value:?}")]
    InvalidInteger { column: String, value: String },

    #[error("Missing column {0}")]
    MissingCell(String),
}

/// Errors returned by the progress repository
#[derive(Debug, Error)]
pub enum ProgressError {
    #[error("No progress stored at {row_key}")]
    NotFound { row_key: String },

    #[error("Invalid {field} {value:?}: must not contain '{delimiter}'", delimiter = crate::domain::KEY_DELIMITER)]
    InvalidKeyField { field: &'static str, value: String },

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Transport error: {0}")]
    Transport(#[from] StoreError),
}

impl ProgressError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ProgressError::NotFound { .. })
    }

    /// Check if the failure came from a transient store condition
    pub fn is_retryable(&self) -> bool {
        match self {
            ProgressError::Transport(err) => err.is_retryable(),
            _ => false,
        }
    }
}
