//! Storage error types.
//!
//! Every variant carries enough context to diagnose the failure from a log
//! line alone. [`StorageError::Conflict`] and [`StorageError::ObjectNotFound`]
//! are expected outcomes; everything else is an infrastructure failure.

/// Errors that can occur in a storage collaborator.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Failed to open or migrate the backend.
    #[error("failed to open storage at '{path}': {reason}")]
    Open { path: String, reason: String },

    /// A uniqueness constraint rejected the write.
    #[error("{entity} '{key}' already exists")]
    Conflict { entity: &'static str, key: String },

    /// Failed to read from storage.
    #[error("failed to read {entity} '{key}': {reason}")]
    Read {
        entity: &'static str,
        key: String,
        reason: String,
    },

    /// Failed to write to storage.
    #[error("failed to write {entity} '{key}': {reason}")]
    Write {
        entity: &'static str,
        key: String,
        reason: String,
    },

    /// Failed to delete from storage.
    #[error("failed to delete {entity} '{key}': {reason}")]
    Delete {
        entity: &'static str,
        key: String,
        reason: String,
    },

    /// Failed to begin or commit a transaction.
    #[error("transaction failed: {reason}")]
    Transaction { reason: String },

    /// The object store has no object under the given key.
    #[error("object '{key}' not found")]
    ObjectNotFound { key: String },

    /// An object key was not a single safe path component.
    #[error("invalid object key '{key}'")]
    InvalidObjectKey { key: String },
}

impl StorageError {
    /// Whether this error is a uniqueness violation rather than a failure.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}
