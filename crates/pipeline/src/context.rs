use std::sync::Arc;

use tracing::Span;

use zoo_blob::BlobStore;
use zoo_core::Caller;
use zoo_store::{DistributedLock, DownloadCounter, FileRepository, ModelDirectory, UserDirectory};

/// Handles to every collaborator the pipeline talks to.
#[derive(Clone)]
pub struct Stores {
    pub files: Arc<dyn FileRepository>,
    pub blobs: Arc<dyn BlobStore>,
    pub users: Arc<dyn UserDirectory>,
    pub models: Arc<dyn ModelDirectory>,
    pub downloads: Arc<dyn DownloadCounter>,
    pub lock: Arc<dyn DistributedLock>,
}

impl std::fmt::Debug for Stores {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stores").finish_non_exhaustive()
    }
}

/// Everything one request needs, passed explicitly into the pipeline:
/// who is calling, the collaborator handles, and the span that log fields
/// accumulate on.
#[derive(Debug, Clone)]
pub struct UploadContext {
    pub caller: Caller,
    pub stores: Arc<Stores>,
    pub span: Span,
}

impl UploadContext {
    /// Build a context with a fresh `upload` span for `caller`.
    pub fn new(caller: Caller, stores: Arc<Stores>) -> Self {
        let span = tracing::info_span!(
            "upload",
            user_id = %caller.user_id,
            file_username = tracing::field::Empty,
            file_model_slug = tracing::field::Empty,
            file_framework = tracing::field::Empty,
            file_framework_version = tracing::field::Empty,
            filename = tracing::field::Empty,
            client_name = tracing::field::Empty,
            file_user_id = tracing::field::Empty,
            file_model_id = tracing::field::Empty,
            file_id = tracing::field::Empty,
            file_size_bytes = tracing::field::Empty,
        );
        Self {
            caller,
            stores,
            span,
        }
    }
}
