use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use tracing::{debug, error, info};

use zoo_blob::{BlobError, BlobStore};

use crate::config::S3BlobConfig;

/// [`BlobStore`] backed by an S3 bucket.
///
/// S3 needs the exact content length up front, which is why the upload
/// pipeline buffers the whole payload before calling [`BlobStore::save`].
pub struct S3BlobStore {
    client: aws_sdk_s3::Client,
    config: S3BlobConfig,
}

impl std::fmt::Debug for S3BlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3BlobStore")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl S3BlobStore {
    /// Build a store using the standard AWS credential chain.
    pub async fn new(config: S3BlobConfig) -> Self {
        let mut loader =
            aws_config::from_env().region(aws_config::Region::new(config.region.clone()));
        if let Some(endpoint) = &config.endpoint_url {
            debug!(endpoint = %endpoint, "using custom S3 endpoint");
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(config.force_path_style)
            .build();

        info!(bucket = %config.bucket, region = %config.region, "S3 blob store configured");

        Self {
            client: aws_sdk_s3::Client::from_conf(s3_config),
            config,
        }
    }

    /// Build a store from an existing client.
    pub fn from_client(client: aws_sdk_s3::Client, config: S3BlobConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn save(&self, key: &str, data: Bytes, content_type: &str) -> Result<(), BlobError> {
        if key.is_empty() {
            return Err(BlobError::InvalidKey("empty key".into()));
        }
        let object_key = self.config.object_key(key);
        debug!(bucket = %self.config.bucket, key = %object_key, size = data.len(), "uploading object to S3");

        self.client
            .put_object()
            .bucket(&self.config.bucket)
            .key(&object_key)
            .content_type(content_type)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, key = %object_key, "S3 put_object failed");
                BlobError::Storage(format!("put_object {object_key}: {e}"))
            })?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, BlobError> {
        let object_key = self.config.object_key(key);

        // DeleteObject succeeds for missing keys, so check with HeadObject first.
        let exists = match self
            .client
            .head_object()
            .bucket(&self.config.bucket)
            .key(&object_key)
            .send()
            .await
        {
            Ok(_) => true,
            Err(e) if e.as_service_error().is_some_and(|se| se.is_not_found()) => false,
            Err(e) => {
                return Err(BlobError::Storage(format!("head_object {object_key}: {e}")));
            }
        };
        if !exists {
            return Ok(false);
        }

        self.client
            .delete_object()
            .bucket(&self.config.bucket)
            .key(&object_key)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, key = %object_key, "S3 delete_object failed");
                BlobError::Storage(format!("delete_object {object_key}: {e}"))
            })?;

        Ok(true)
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, BlobError> {
        let object_prefix = self.config.object_key(prefix);
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(&self.config.bucket)
            .prefix(&object_prefix)
            .into_paginator()
            .send();

        let mut keys = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| BlobError::Storage(format!("list_objects_v2: {e}")))?;
            for object in page.contents() {
                if let Some(key) = object.key().and_then(|k| self.config.blob_key(k)) {
                    keys.push(key.to_owned());
                }
            }
        }
        Ok(keys)
    }
}

#[cfg(all(test, feature = "integration"))]
mod integration_tests {
    use zoo_blob::testing::run_blob_conformance_tests;

    use super::*;

    #[tokio::test]
    async fn conformance() {
        let endpoint =
            std::env::var("S3_ENDPOINT_URL").unwrap_or_else(|_| "http://localhost:4566".into());
        let bucket = std::env::var("S3_BUCKET").unwrap_or_else(|_| "zoo-test".into());
        let mut config = S3BlobConfig::new("us-east-1", bucket)
            .with_endpoint_url(endpoint)
            .with_prefix(format!("conformance-{}/", std::process::id()));
        config.force_path_style = true;
        let store = S3BlobStore::new(config).await;
        run_blob_conformance_tests(&store)
            .await
            .expect("conformance tests should pass");
    }
}
