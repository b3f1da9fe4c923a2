use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

use zoo_blob::BlobError;
use zoo_pipeline::{PipelineError, ReconcileError, UploadError};
use zoo_store::StoreError;

const INTERNAL_MESSAGE: &str = "Internal server error";
const RECONCILE_MESSAGE: &str = "Could not reconcile storage, please try again soon";

/// Errors that can occur when running the zoo server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Config(String),

    /// An I/O error (e.g. binding the listener).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("blob error: {0}")]
    Blob(#[from] BlobError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// An upload or lookup failure. Renders its fixed client message.
    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error("reconciliation failed: {0}")]
    Reconcile(#[from] ReconcileError),

    /// Missing or unknown credentials.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Valid credentials without the required role.
    #[error("forbidden: {0}")]
    Forbidden(String),
}

impl ServerError {
    /// Status code and the message shown to the client. Backend detail stays
    /// in the logs.
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            Self::Upload(e) => (
                StatusCode::from_u16(e.kind().status_code())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                e.to_string(),
            ),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, self.to_string()),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, self.to_string()),
            Self::Reconcile(_) => (StatusCode::BAD_GATEWAY, RECONCILE_MESSAGE.to_owned()),
            Self::Config(_) | Self::Io(_) | Self::Store(_) | Self::Blob(_) | Self::Pipeline(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE.to_owned())
            }
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        if status.is_server_error() {
            error!(error = %self, status = status.as_u16(), "request failed");
        }

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}
