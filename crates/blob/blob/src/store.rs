use async_trait::async_trait;
use bytes::Bytes;

use crate::error::BlobError;

/// Pluggable blob storage backend for file payloads.
///
/// Keys are opaque to the store and derived by callers from file ids; a key
/// is never reused for a different payload. Implementations must be safe for
/// concurrent access.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `data` under `key`, replacing any previous payload.
    async fn save(&self, key: &str, data: Bytes, content_type: &str) -> Result<(), BlobError>;

    /// Delete the payload under `key`. Returns `true` if it existed.
    ///
    /// Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<bool, BlobError>;

    /// List every key starting with `prefix`.
    ///
    /// Used by reconciliation only; may be expensive on large buckets.
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, BlobError>;
}
