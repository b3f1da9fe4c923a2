use std::sync::Arc;

use tracing::info;

use zoo_blob::BlobStore;
#[cfg(feature = "s3")]
use zoo_blob_s3::{S3BlobConfig, S3BlobStore};
use zoo_blob_fs::FsBlobStore;
use zoo_blob_memory::MemoryBlobStore;

use crate::config::BlobConfig;
use crate::error::ServerError;

/// Create the blob store from the given configuration.
#[allow(clippy::unused_async)]
pub async fn create_blob_store(config: &BlobConfig) -> Result<Arc<dyn BlobStore>, ServerError> {
    let store: Arc<dyn BlobStore> = match config.backend.as_str() {
        "memory" => Arc::new(MemoryBlobStore::new()),
        "fs" => {
            let path = config
                .path
                .as_deref()
                .ok_or_else(|| ServerError::Config("fs blob backend requires [blob] path".into()))?;
            info!(path = %path, "filesystem blob store configured");
            Arc::new(FsBlobStore::new(path))
        }
        #[cfg(feature = "s3")]
        "s3" => {
            let bucket = config
                .bucket
                .clone()
                .ok_or_else(|| ServerError::Config("s3 blob backend requires [blob] bucket".into()))?;
            let region = config
                .region
                .clone()
                .unwrap_or_else(|| "us-east-1".to_owned());
            let mut s3_config = S3BlobConfig::new(region, bucket);
            if let Some(prefix) = &config.prefix {
                s3_config = s3_config.with_prefix(prefix);
            }
            if let Some(endpoint) = &config.endpoint_url {
                s3_config = s3_config.with_endpoint_url(endpoint);
            }
            s3_config.force_path_style = config.force_path_style;
            Arc::new(S3BlobStore::new(s3_config).await)
        }
        other => {
            return Err(ServerError::Config(format!(
                "unknown blob backend: {other} (is the feature enabled?)"
            )));
        }
    };
    Ok(store)
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    #[tokio::test]
    async fn fs_backend_requires_path() {
        let config = BlobConfig {
            backend: "fs".into(),
            ..BlobConfig::default()
        };
        assert!(matches!(
            create_blob_store(&config).await,
            Err(ServerError::Config(msg)) if msg.contains("path")
        ));
    }

    #[tokio::test]
    async fn fs_backend_writes_under_root() {
        let dir = tempfile::tempdir().unwrap();
        let config = BlobConfig {
            backend: "fs".into(),
            path: Some(dir.path().display().to_string()),
            ..BlobConfig::default()
        };
        let store = create_blob_store(&config).await.unwrap();
        store
            .save("files/abc", Bytes::from_static(b"x"), "application/octet-stream")
            .await
            .unwrap();
        assert_eq!(store.list_keys("files/").await.unwrap(), vec!["files/abc"]);
    }
}
