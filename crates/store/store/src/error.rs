use thiserror::Error;

/// Errors from file repository, directory, counter and lock operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("file not found: {0}")]
    NotFound(String),

    #[error("a pending file already exists for slot {0}")]
    PendingConflict(String),

    #[error("no pending file {file_id} for slot {slot}")]
    NoPendingFile { slot: String, file_id: String },

    #[error("lock expired: {0}")]
    LockExpired(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("backend error: {0}")]
    Backend(String),

    #[error("operation timed out after {0:?}")]
    Timeout(std::time::Duration),
}
