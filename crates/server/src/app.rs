use std::sync::Arc;

use tracing::info;

use zoo_pipeline::UploadPipeline;

use crate::api::AppState;
use crate::auth::ApiKeyTable;
use crate::blob_factory::create_blob_store;
use crate::config::ZooConfig;
use crate::error::ServerError;
use crate::store_factory::create_store;

/// Wire the configured backends into an upload pipeline.
pub async fn build_pipeline(config: &ZooConfig) -> Result<UploadPipeline, ServerError> {
    let stores = create_store(&config.store, &config.fixtures).await?;
    let blobs = create_blob_store(&config.blob).await?;
    info!(
        store = %config.store.backend,
        blob = %config.blob.backend,
        "backends initialized"
    );

    Ok(UploadPipeline::builder()
        .files(stores.files)
        .blobs(blobs)
        .users(stores.users)
        .models(stores.models)
        .downloads(stores.downloads)
        .lock(stores.lock)
        .config(config.upload.to_upload_config())
        .build()?)
}

/// Build the shared handler state.
pub async fn build_state(config: &ZooConfig) -> Result<AppState, ServerError> {
    let pipeline = build_pipeline(config).await?;
    let api_keys = ApiKeyTable::new(&config.auth.api_keys);
    if api_keys.is_empty() {
        tracing::warn!("no API keys configured, uploads will be rejected");
    }
    Ok(AppState {
        pipeline: Arc::new(pipeline),
        api_keys: Arc::new(api_keys),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn default_config_builds() {
        let config: ZooConfig = toml::from_str("").unwrap();
        let state = build_state(&config).await.unwrap();
        assert!(state.api_keys.is_empty());
        assert_eq!(state.pipeline.metrics().snapshot().uploads_started, 0);
    }

    #[tokio::test]
    async fn unknown_blob_backend_fails() {
        let config: ZooConfig = toml::from_str("[blob]\nbackend = \"gcs\"").unwrap();
        assert!(matches!(
            build_pipeline(&config).await,
            Err(ServerError::Config(_))
        ));
    }
}
