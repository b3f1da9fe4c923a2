use thiserror::Error;

/// Errors that can occur during blob storage operations.
#[derive(Debug, Error)]
pub enum BlobError {
    /// The key is empty or escapes the store's namespace.
    #[error("invalid blob key: {0}")]
    InvalidKey(String),

    /// The backend could not be reached.
    #[error("blob connection error: {0}")]
    Connection(String),

    /// A storage backend error occurred.
    #[error("blob storage error: {0}")]
    Storage(String),
}
