use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::debug;

use crate::api::AppState;
use crate::error::ServerError;

/// Resolve `Authorization: Bearer <key>` into [`zoo_core::Caller`] and
/// [`crate::config::KeyRole`] request extensions, or reject with 401.
pub async fn require_api_key(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let token = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim);

    let Some(token) = token.filter(|t| !t.is_empty()) else {
        return ServerError::Unauthorized("missing bearer token".into()).into_response();
    };

    match state.api_keys.authenticate(token) {
        Some((caller, role)) => {
            debug!(user_id = %caller.user_id, ?role, "caller authenticated");
            req.extensions_mut().insert(caller);
            req.extensions_mut().insert(role);
            next.run(req).await
        }
        None => ServerError::Unauthorized("invalid API key".into()).into_response(),
    }
}
