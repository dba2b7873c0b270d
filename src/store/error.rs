use uuid::Uuid;

use crate::models::{Bucket, ValidationError};
use crate::remote::RemoteError;

/// Errors that can occur during record store operations.
#[derive(Debug)]
pub enum StoreError {
    /// No live record with this id in the bucket
    NotFound { bucket: Bucket, id: Uuid },
    /// The record or patch failed validation
    Validation(ValidationError),
    /// Local database error
    Database(sqlx::Error),
    /// Remote table API error
    Remote(RemoteError),
    /// Payload could not be encoded or decoded
    Serialization(serde_json::Error),
    /// A stored row could not be read back
    Corrupt(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::NotFound { bucket, id } => {
                write!(f, "Record not found in '{}': {}", bucket, id)
            }
            StoreError::Validation(e) => write!(f, "{}", e),
            StoreError::Database(e) => write!(f, "Database error: {}", e),
            StoreError::Remote(e) => write!(f, "Remote error: {}", e),
            StoreError::Serialization(e) => write!(f, "Serialization error: {}", e),
            StoreError::Corrupt(e) => write!(f, "Corrupt record: {}", e),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Validation(e) => Some(e),
            StoreError::Database(e) => Some(e),
            StoreError::Remote(e) => Some(e),
            StoreError::Serialization(e) => Some(e),
            _ => None,
        }
    }
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

impl From<ValidationError> for StoreError {
    fn from(e: ValidationError) -> Self {
        StoreError::Validation(e)
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Database(e)
    }
}

impl From<RemoteError> for StoreError {
    fn from(e: RemoteError) -> Self {
        StoreError::Remote(e)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e)
    }
}
