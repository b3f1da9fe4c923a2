use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use zoo_core::{File, Model};
use zoo_pipeline::MetricsSnapshot;

/// Error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    #[schema(example = "No model by that username and slug could be found")]
    pub error: String,
}

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: String,
    pub metrics: MetricsResponse,
}

/// Upload pipeline counters.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MetricsResponse {
    /// Uploads that entered the pipeline.
    #[schema(example = 42)]
    pub uploads_started: u64,
    /// Uploads whose file was committed.
    #[schema(example = 40)]
    pub uploads_committed: u64,
    /// Uploads refused for validation, lookup or ownership reasons.
    pub uploads_rejected: u64,
    /// Uploads that failed on a storage or lock error.
    pub uploads_failed: u64,
    /// Payload bytes of committed uploads.
    pub bytes_committed: u64,
    /// Stale pending files removed before staging.
    pub stale_pending_removed: u64,
    /// Old versions deleted by the retention sweep.
    pub files_swept: u64,
    /// Per-item sweep failures.
    pub sweep_errors: u64,
    /// Failed download-count hydrations.
    pub hydrate_errors: u64,
}

impl From<MetricsSnapshot> for MetricsResponse {
    fn from(s: MetricsSnapshot) -> Self {
        Self {
            uploads_started: s.uploads_started,
            uploads_committed: s.uploads_committed,
            uploads_rejected: s.uploads_rejected,
            uploads_failed: s.uploads_failed,
            bytes_committed: s.bytes_committed,
            stale_pending_removed: s.stale_pending_removed,
            files_swept: s.files_swept,
            sweep_errors: s.sweep_errors,
            hydrate_errors: s.hydrate_errors,
        }
    }
}

/// Multipart form of an upload. Parts may come in either order.
#[derive(Debug, ToSchema)]
pub struct UploadForm {
    /// JSON object with arbitrary string keys.
    #[schema(example = r#"{"epoch": 12}"#)]
    pub metadata: String,
    /// The file payload.
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}

/// A committed upload.
#[derive(Debug, Serialize, ToSchema)]
pub struct FileResponse {
    pub file: File,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ModelResponse {
    pub model: Model,
}

/// The newest committed file per filename.
#[derive(Debug, Serialize, ToSchema)]
pub struct FilesResponse {
    pub files: Vec<File>,
}

/// Result of a reconciliation pass.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReconcileResponse {
    pub scanned_blobs: usize,
    pub scanned_files: usize,
    /// Blob keys with no committed file behind them.
    pub orphan_blobs: Vec<String>,
    /// Committed files whose blob is missing.
    pub missing_blobs: Vec<String>,
    pub deleted_blobs: Vec<String>,
    pub failed_deletes: Vec<String>,
    /// Whether orphan blobs were deleted.
    pub applied: bool,
}
