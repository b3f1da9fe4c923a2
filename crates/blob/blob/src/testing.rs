use bytes::Bytes;

use crate::error::BlobError;
use crate::store::BlobStore;

/// Run the blob store conformance test suite against a fresh store.
///
/// # Errors
///
/// Returns an error if any backend call fails. Assertion failures panic.
pub async fn run_blob_conformance_tests(store: &dyn BlobStore) -> Result<(), BlobError> {
    test_save_then_list(store).await?;
    test_overwrite(store).await?;
    test_delete(store).await?;
    test_delete_missing(store).await?;
    test_list_prefix_filter(store).await?;
    Ok(())
}

async fn test_save_then_list(store: &dyn BlobStore) -> Result<(), BlobError> {
    store
        .save("conf/a/one", Bytes::from_static(b"1"), "application/octet-stream")
        .await?;
    let keys = store.list_keys("conf/a/").await?;
    assert_eq!(keys, vec!["conf/a/one".to_owned()]);
    Ok(())
}

async fn test_overwrite(store: &dyn BlobStore) -> Result<(), BlobError> {
    store
        .save("conf/b/x", Bytes::from_static(b"first"), "application/octet-stream")
        .await?;
    store
        .save("conf/b/x", Bytes::from_static(b"second"), "application/octet-stream")
        .await?;
    let keys = store.list_keys("conf/b/").await?;
    assert_eq!(keys.len(), 1, "overwrite must not duplicate keys");
    Ok(())
}

async fn test_delete(store: &dyn BlobStore) -> Result<(), BlobError> {
    store
        .save("conf/c/gone", Bytes::from_static(b"x"), "application/octet-stream")
        .await?;
    assert!(store.delete("conf/c/gone").await?, "delete should report existing key");
    assert!(store.list_keys("conf/c/").await?.is_empty());
    Ok(())
}

async fn test_delete_missing(store: &dyn BlobStore) -> Result<(), BlobError> {
    let existed = store.delete("conf/d/never-written").await?;
    assert!(!existed, "delete of a missing key should return false");
    Ok(())
}

async fn test_list_prefix_filter(store: &dyn BlobStore) -> Result<(), BlobError> {
    store
        .save("conf/e/1", Bytes::from_static(b"1"), "application/octet-stream")
        .await?;
    store
        .save("conf/e/2", Bytes::from_static(b"2"), "application/octet-stream")
        .await?;
    store
        .save("conf/f/1", Bytes::from_static(b"3"), "application/octet-stream")
        .await?;
    let mut keys = store.list_keys("conf/e/").await?;
    keys.sort();
    assert_eq!(keys, vec!["conf/e/1".to_owned(), "conf/e/2".to_owned()]);
    Ok(())
}
