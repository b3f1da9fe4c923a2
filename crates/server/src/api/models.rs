use axum::Json;
use axum::extract::{Path, State};

use crate::error::ServerError;

use super::AppState;
use super::schemas::{ErrorResponse, FilesResponse, ModelResponse};

/// `GET /api/model/{username}/{slug}` -- a model with its download counters.
#[utoipa::path(
    get,
    path = "/api/model/{username}/{slug}",
    tag = "Models",
    summary = "Get model",
    params(
        ("username" = String, Path, description = "Owner of the model"),
        ("slug" = String, Path, description = "Model slug")
    ),
    responses(
        (status = 200, description = "The model", body = ModelResponse),
        (status = 404, description = "Unknown user or model", body = ErrorResponse),
        (status = 502, description = "Lookup failure", body = ErrorResponse)
    )
)]
pub async fn get_model(
    State(state): State<AppState>,
    Path((username, slug)): Path<(String, String)>,
) -> Result<Json<ModelResponse>, ServerError> {
    let model = state.pipeline.model(&username, &slug).await?;
    Ok(Json(ModelResponse { model }))
}

/// `GET /api/model/{username}/{slug}/files` -- the newest committed version
/// of every file of a model.
#[utoipa::path(
    get,
    path = "/api/model/{username}/{slug}/files",
    tag = "Models",
    summary = "List latest files",
    params(
        ("username" = String, Path, description = "Owner of the model"),
        ("slug" = String, Path, description = "Model slug")
    ),
    responses(
        (status = 200, description = "Latest file per filename", body = FilesResponse),
        (status = 404, description = "Unknown user or model", body = ErrorResponse),
        (status = 502, description = "Lookup failure", body = ErrorResponse)
    )
)]
pub async fn list_files(
    State(state): State<AppState>,
    Path((username, slug)): Path<(String, String)>,
) -> Result<Json<FilesResponse>, ServerError> {
    let files = state.pipeline.latest_files(&username, &slug).await?;
    Ok(Json(FilesResponse { files }))
}
