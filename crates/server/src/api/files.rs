use axum::Json;
use axum::extract::{Extension, Multipart, Path, State};
use axum::http::HeaderMap;
use tracing::warn;

use zoo_core::Caller;
use zoo_pipeline::{UploadError, UploadRequest};

use crate::error::ServerError;

use super::AppState;
use super::schemas::{ErrorResponse, FileResponse, UploadForm};

/// Header carrying the client framework version.
pub const FRAMEWORK_VERSION_HEADER: &str = "x-gradientzoo-framework-version";

/// Header carrying the client library name.
pub const CLIENT_NAME_HEADER: &str = "x-gradientzoo-client-name";

fn header_value(headers: &HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_owned()
}

/// `POST /api/file/{username}/{slug}/{framework}/{filename}` -- upload a new
/// version of a model file.
///
/// The multipart body carries a `metadata` field and a `file` field, in
/// either order. The model is resolved from the path first, so the `file`
/// part is read against its plan limit as soon as it arrives.
#[utoipa::path(
    post,
    path = "/api/file/{username}/{slug}/{framework}/{filename}",
    tag = "Files",
    summary = "Upload file version",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    params(
        ("username" = String, Path, description = "Owner of the model"),
        ("slug" = String, Path, description = "Model slug"),
        ("framework" = String, Path, description = "Framework the file was produced with"),
        ("filename" = String, Path, description = "Logical file name"),
        ("X-Gradientzoo-Framework-Version" = Option<String>, Header, description = "Framework version"),
        ("X-Gradientzoo-Client-Name" = Option<String>, Header, description = "Client library name")
    ),
    responses(
        (status = 200, description = "File committed", body = FileResponse),
        (status = 400, description = "Invalid metadata or payload", body = ErrorResponse),
        (status = 401, description = "Unauthenticated or not the model owner", body = ErrorResponse),
        (status = 404, description = "Unknown user or model", body = ErrorResponse),
        (status = 502, description = "Storage failure", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
pub async fn upload(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path((username, slug, framework, filename)): Path<(String, String, String, String)>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<FileResponse>, ServerError> {
    let mut request = UploadRequest {
        username,
        slug,
        framework,
        filename,
        framework_version: header_value(&headers, FRAMEWORK_VERSION_HEADER),
        client_name: header_value(&headers, CLIENT_NAME_HEADER),
        metadata: None,
    };
    let ctx = state.pipeline.context(caller);
    let target = state.pipeline.authorize(&ctx, &request).await;

    let mut file = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| UploadError::UnreadableBody(Box::new(e)))?
    {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("metadata") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| UploadError::UnreadableBody(Box::new(e)))?;
                request.metadata = Some(text);
            }
            Some("file") if file.is_none() => {
                // A refused target leaves the part unread.
                let Ok(target) = &target else { continue };
                let read = state.pipeline.read_file(&ctx, target, field).await;
                let failed = read.is_err();
                file = Some(read);
                if failed {
                    break;
                }
            }
            _ => {}
        }
    }

    let outcome = state.pipeline.complete(&ctx, request, target, file).await?;
    for warning in &outcome.warnings {
        warn!(file_id = %outcome.file.id, warning = %warning, "upload cleanup incomplete");
    }
    Ok(Json(FileResponse { file: outcome.file }))
}
