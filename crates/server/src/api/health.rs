use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;

use super::AppState;
use super::schemas::{HealthResponse, MetricsResponse};

/// `GET /health` -- service status together with a metrics snapshot.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    summary = "Health check",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let body = HealthResponse {
        status: "ok".into(),
        metrics: state.pipeline.metrics().snapshot().into(),
    };
    (StatusCode::OK, Json(body))
}

/// `GET /metrics` -- upload pipeline counters as JSON.
#[utoipa::path(
    get,
    path = "/metrics",
    tag = "Health",
    summary = "Upload metrics",
    responses(
        (status = 200, description = "Current metric counters", body = MetricsResponse)
    )
)]
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let body = MetricsResponse::from(state.pipeline.metrics().snapshot());
    (StatusCode::OK, Json(body))
}
