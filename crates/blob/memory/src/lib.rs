use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;

use zoo_blob::{BlobError, BlobStore};

#[derive(Debug, Clone)]
struct StoredBlob {
    data: Bytes,
    content_type: String,
}

/// In-memory [`BlobStore`] backed by a [`DashMap`].
///
/// Payloads live for the lifetime of the process. Intended for tests and
/// single-node development setups.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: DashMap<String, StoredBlob>,
}

impl MemoryBlobStore {
    /// Create a new, empty in-memory blob store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the payload stored under `key`, if any.
    pub fn get(&self, key: &str) -> Option<Bytes> {
        self.blobs.get(key).map(|b| b.data.clone())
    }

    /// Return the content type recorded for `key`, if any.
    pub fn content_type(&self, key: &str) -> Option<String> {
        self.blobs.get(key).map(|b| b.content_type.clone())
    }

    /// Number of stored payloads.
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    /// Whether the store holds no payloads.
    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn save(&self, key: &str, data: Bytes, content_type: &str) -> Result<(), BlobError> {
        if key.is_empty() {
            return Err(BlobError::InvalidKey("empty key".into()));
        }
        self.blobs.insert(
            key.to_owned(),
            StoredBlob {
                data,
                content_type: content_type.to_owned(),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, BlobError> {
        Ok(self.blobs.remove(key).is_some())
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, BlobError> {
        Ok(self
            .blobs
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| entry.key().clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use zoo_blob::testing::run_blob_conformance_tests;

    use super::*;

    #[tokio::test]
    async fn conformance() {
        let store = MemoryBlobStore::new();
        run_blob_conformance_tests(&store)
            .await
            .expect("conformance tests should pass");
    }

    #[tokio::test]
    async fn records_payload_and_content_type() {
        let store = MemoryBlobStore::new();
        store
            .save("files/abc", Bytes::from_static(b"weights"), "application/octet-stream")
            .await
            .unwrap();
        assert_eq!(store.get("files/abc").unwrap(), Bytes::from_static(b"weights"));
        assert_eq!(
            store.content_type("files/abc").as_deref(),
            Some("application/octet-stream")
        );
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn rejects_empty_key() {
        let store = MemoryBlobStore::new();
        let err = store
            .save("", Bytes::new(), "application/octet-stream")
            .await
            .unwrap_err();
        assert!(matches!(err, BlobError::InvalidKey(_)));
        assert!(store.is_empty());
    }
}
