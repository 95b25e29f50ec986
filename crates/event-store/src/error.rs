use thiserror::Error;

use crate::EventId;

/// Errors that can occur when interacting with the event store.
#[derive(Debug, Error)]
pub enum EventStoreError {
    /// An event with the same id has already been recorded.
    #[error("Event {0} has already been stored")]
    DuplicateEvent(EventId),

    /// The underlying storage rejected the write or read.
    #[error("Storage error: {0}")]
    Storage(String),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for event store operations.
pub type Result<T> = std::result::Result<T, EventStoreError>;
