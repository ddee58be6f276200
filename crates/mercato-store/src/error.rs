//! Store error types.

use thiserror::Error;

/// Errors that can occur when using the document store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to serialize or deserialize a document.
    #[error("Serialization error: {0}")]
    SerializeError(#[from] serde_json::Error),

    /// A document already exists under the key.
    #[error("Key already exists: {0}")]
    AlreadyExists(String),

    /// No document under the key.
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Concurrent modification detected.
    #[error("Version conflict on {key}: expected {expected}, found {actual}")]
    VersionConflict {
        key: String,
        expected: u64,
        actual: u64,
    },

    /// Failed to perform store operation.
    #[error("Store operation failed: {0}")]
    Backend(String),
}

impl StoreError {
    /// Whether the error is an optimistic-concurrency conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::VersionConflict { .. })
    }
}
