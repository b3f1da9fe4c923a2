#![allow(clippy::needless_for_each)]

use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};

use zoo_core::{DownloadCounts, File, FileStatus, Model};

use super::schemas::{
    ErrorResponse, FileResponse, FilesResponse, HealthResponse, MetricsResponse, ModelResponse,
    ReconcileResponse, UploadForm,
};

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

#[derive(utoipa::OpenApi)]
#[openapi(
    info(
        title = "Zoo Model File API",
        version = "0.1.0",
        description = "Upload versioned model files and read their download counters."
    ),
    tags(
        (name = "Health", description = "Service health and metrics"),
        (name = "Files", description = "Versioned file uploads"),
        (name = "Models", description = "Model and latest-file lookups"),
        (name = "Admin", description = "Blob and record reconciliation")
    ),
    paths(
        super::health::health,
        super::health::metrics,
        super::files::upload,
        super::models::get_model,
        super::models::list_files,
        super::admin::reconcile,
    ),
    components(schemas(
        ErrorResponse,
        HealthResponse,
        MetricsResponse,
        UploadForm,
        FileResponse,
        FilesResponse,
        ModelResponse,
        ReconcileResponse,
        File,
        FileStatus,
        Model,
        DownloadCounts,
    )),
    modifiers(&BearerAuth)
)]
pub struct ApiDoc;
