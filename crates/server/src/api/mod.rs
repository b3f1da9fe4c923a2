pub mod admin;
pub mod files;
pub mod health;
pub mod models;
pub mod openapi;
pub mod schemas;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use zoo_pipeline::UploadPipeline;

use crate::auth::ApiKeyTable;
use crate::auth::middleware::require_api_key;

use self::openapi::ApiDoc;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<UploadPipeline>,
    /// Keys accepted on protected routes.
    pub api_keys: Arc<ApiKeyTable>,
}

/// Build the Axum router with all API routes, middleware, and Swagger UI.
pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/health", get(health::health))
        .route("/metrics", get(health::metrics))
        .route("/api/model/{username}/{slug}", get(models::get_model))
        .route("/api/model/{username}/{slug}/files", get(models::list_files));

    let protected = Router::new()
        .route(
            "/api/file/{username}/{slug}/{framework}/{filename}",
            post(files::upload).layer(DefaultBodyLimit::disable()),
        )
        .route("/admin/reconcile", post(admin::reconcile))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_api_key,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
