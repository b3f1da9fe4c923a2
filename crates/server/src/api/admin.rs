use axum::Json;
use axum::extract::{Extension, Query, State};
use serde::Deserialize;
use tracing::{info, warn};

use zoo_core::Caller;

use crate::config::KeyRole;
use crate::error::ServerError;

use super::AppState;
use super::schemas::{ErrorResponse, ReconcileResponse};

#[derive(Debug, Default, Deserialize)]
pub struct ReconcileQuery {
    /// Delete orphan blobs instead of only reporting them.
    #[serde(default)]
    pub apply: bool,
}

/// `POST /admin/reconcile` -- cross-check the blob store against the file
/// records. Any key may read the report; deleting orphans with `apply`
/// needs an admin key.
#[utoipa::path(
    post,
    path = "/admin/reconcile",
    tag = "Admin",
    summary = "Reconcile blobs and files",
    params(
        ("apply" = Option<bool>, Query, description = "Delete orphan blobs")
    ),
    responses(
        (status = 200, description = "Reconciliation report", body = ReconcileResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "`apply` without an admin key", body = ErrorResponse),
        (status = 502, description = "A store could not be listed", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
pub async fn reconcile(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Extension(role): Extension<KeyRole>,
    Query(query): Query<ReconcileQuery>,
) -> Result<Json<ReconcileResponse>, ServerError> {
    if query.apply && role != KeyRole::Admin {
        warn!(user_id = %caller.user_id, "reconcile apply refused: not an admin key");
        return Err(ServerError::Forbidden("applying reconciliation needs an admin key".into()));
    }
    info!(user_id = %caller.user_id, apply = query.apply, "reconciliation requested");
    let report = state.pipeline.reconciler().run(query.apply).await?;
    Ok(Json(ReconcileResponse {
        scanned_blobs: report.scanned_blobs,
        scanned_files: report.scanned_files,
        orphan_blobs: report.orphan_blobs,
        missing_blobs: report.missing_blobs,
        deleted_blobs: report.deleted_blobs,
        failed_deletes: report.failed_deletes,
        applied: query.apply,
    }))
}
