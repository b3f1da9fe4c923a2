use std::sync::Arc;

use zoo_blob::BlobStore;
use zoo_store::{DistributedLock, DownloadCounter, FileRepository, ModelDirectory, UserDirectory};

use crate::config::UploadConfig;
use crate::context::Stores;
use crate::error::PipelineError;
use crate::metrics::UploadMetrics;
use crate::pipeline::UploadPipeline;

/// Fluent builder for an [`UploadPipeline`].
///
/// Every collaborator is required; the config defaults to
/// [`UploadConfig::default`].
#[derive(Default)]
pub struct UploadPipelineBuilder {
    files: Option<Arc<dyn FileRepository>>,
    blobs: Option<Arc<dyn BlobStore>>,
    users: Option<Arc<dyn UserDirectory>>,
    models: Option<Arc<dyn ModelDirectory>>,
    downloads: Option<Arc<dyn DownloadCounter>>,
    lock: Option<Arc<dyn DistributedLock>>,
    config: UploadConfig,
    metrics: Option<Arc<UploadMetrics>>,
}

impl UploadPipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn files(mut self, files: Arc<dyn FileRepository>) -> Self {
        self.files = Some(files);
        self
    }

    #[must_use]
    pub fn blobs(mut self, blobs: Arc<dyn BlobStore>) -> Self {
        self.blobs = Some(blobs);
        self
    }

    #[must_use]
    pub fn users(mut self, users: Arc<dyn UserDirectory>) -> Self {
        self.users = Some(users);
        self
    }

    #[must_use]
    pub fn models(mut self, models: Arc<dyn ModelDirectory>) -> Self {
        self.models = Some(models);
        self
    }

    #[must_use]
    pub fn downloads(mut self, downloads: Arc<dyn DownloadCounter>) -> Self {
        self.downloads = Some(downloads);
        self
    }

    #[must_use]
    pub fn lock(mut self, lock: Arc<dyn DistributedLock>) -> Self {
        self.lock = Some(lock);
        self
    }

    #[must_use]
    pub fn config(mut self, config: UploadConfig) -> Self {
        self.config = config;
        self
    }

    /// Share an existing metrics instance instead of creating one.
    #[must_use]
    pub fn metrics(mut self, metrics: Arc<UploadMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Build the pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Configuration`] if a collaborator is missing.
    pub fn build(self) -> Result<UploadPipeline, PipelineError> {
        fn required<T: ?Sized>(
            value: Option<Arc<T>>,
            name: &str,
        ) -> Result<Arc<T>, PipelineError> {
            value.ok_or_else(|| PipelineError::Configuration(format!("{name} is required")))
        }

        let stores = Stores {
            files: required(self.files, "file repository")?,
            blobs: required(self.blobs, "blob store")?,
            users: required(self.users, "user directory")?,
            models: required(self.models, "model directory")?,
            downloads: required(self.downloads, "download counter")?,
            lock: required(self.lock, "distributed lock")?,
        };

        Ok(UploadPipeline::new(
            Arc::new(stores),
            self.config,
            self.metrics.unwrap_or_default(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use zoo_store_memory::MemoryFileRepository;

    use super::*;

    #[test]
    fn missing_collaborator_is_a_configuration_error() {
        let err = UploadPipelineBuilder::new()
            .files(Arc::new(MemoryFileRepository::new()))
            .build()
            .unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(msg) if msg == "blob store is required"));
    }
}
