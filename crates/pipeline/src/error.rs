use thiserror::Error;

use zoo_core::MetadataError;

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Client message for storage failures before the commit.
pub const SAVE_FAILED: &str = "Could not save your file, please try again soon";

/// Client message for a failed commit.
pub const FINALIZE_FAILED: &str = "Could not finalize file upload, please try again soon";

/// Client message for a failed user lookup.
pub const LOOKUP_FAILED: &str = "Could not get that model, please try again soon";

/// Client message for a failed file listing.
pub const LIST_FAILED: &str = "Could not get files for that model, please try again soon";

/// Failure class of an [`UploadError`]. Each maps to one HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Client-caused: bad metadata, oversized or unreadable payload.
    Validation,
    /// Unknown owner or model.
    NotFound,
    /// The caller does not own the model.
    Authorization,
    /// Repository, blob store or lock failure.
    Upstream,
}

impl ErrorKind {
    /// HTTP status code for this class.
    #[must_use]
    pub fn status_code(self) -> u16 {
        match self {
            Self::Validation => 400,
            Self::Authorization => 401,
            Self::NotFound => 404,
            Self::Upstream => 502,
        }
    }
}

/// A failed upload or lookup.
///
/// `Display` yields the fixed client-facing message; underlying causes are
/// reachable through [`std::error::Error::source`] and are only logged.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Could not decode metadata")]
    InvalidMetadata(#[source] MetadataError),

    #[error("Could not get uploaded file")]
    MissingFile,

    #[error("Could not read uploaded file")]
    UnreadableBody(#[source] BoxError),

    #[error("Uploaded file exceeds the maximum size for this model's plan")]
    PayloadTooLarge { limit: u64 },

    #[error("No user by that username could be found")]
    UserNotFound,

    #[error("No model by that username and slug could be found")]
    ModelNotFound,

    #[error("You're only allowed to upload files for your own models")]
    NotOwner,

    #[error("{message}")]
    Upstream {
        message: &'static str,
        #[source]
        source: BoxError,
    },
}

impl UploadError {
    pub(crate) fn upstream(message: &'static str, source: impl Into<BoxError>) -> Self {
        Self::Upstream {
            message,
            source: source.into(),
        }
    }

    /// The failure class, which selects the HTTP status.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidMetadata(_)
            | Self::MissingFile
            | Self::UnreadableBody(_)
            | Self::PayloadTooLarge { .. } => ErrorKind::Validation,
            Self::UserNotFound | Self::ModelNotFound => ErrorKind::NotFound,
            Self::NotOwner => ErrorKind::Authorization,
            Self::Upstream { .. } => ErrorKind::Upstream,
        }
    }
}

/// A non-fatal failure during cleanup. Collected into
/// [`crate::UploadOutcome::warnings`] instead of failing the upload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CleanupFailure {
    #[error("could not delete blob of stale pending file {file_id}: {error}")]
    StalePendingBlob { file_id: String, error: String },

    #[error("could not list files beyond retention: {error}")]
    SweepListing { error: String },

    #[error("could not delete blob of old file {file_id}: {error}")]
    SweepBlob { file_id: String, error: String },

    #[error("could not delete record of old file {file_id}: {error}")]
    SweepRecord { file_id: String, error: String },

    #[error("could not hydrate download counts: {error}")]
    Hydrate { error: String },

    #[error("could not release slot lock: {error}")]
    LockRelease { error: String },
}

/// Errors constructing the pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Configuration(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_statuses() {
        assert_eq!(UploadError::MissingFile.kind().status_code(), 400);
        assert_eq!(UploadError::NotOwner.kind().status_code(), 401);
        assert_eq!(UploadError::ModelNotFound.kind().status_code(), 404);
        assert_eq!(
            UploadError::upstream(SAVE_FAILED, "disk on fire")
                .kind()
                .status_code(),
            502
        );
    }

    #[test]
    fn upstream_hides_cause_in_display() {
        let err = UploadError::upstream(FINALIZE_FAILED, "connection reset by peer");
        assert_eq!(err.to_string(), FINALIZE_FAILED);
        let source = std::error::Error::source(&err).expect("source kept");
        assert_eq!(source.to_string(), "connection reset by peer");
    }

    #[test]
    fn fixed_messages() {
        let bad = zoo_core::parse_metadata("{bad json").unwrap_err();
        assert_eq!(
            UploadError::InvalidMetadata(bad).to_string(),
            "Could not decode metadata"
        );
        assert_eq!(
            UploadError::PayloadTooLarge { limit: 1 }.to_string(),
            "Uploaded file exceeds the maximum size for this model's plan"
        );
    }
}
