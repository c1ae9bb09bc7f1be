//! Resource-path routes. Every request not matched elsewhere is handed to the path driver,
//! so a missing `/entities/` prefix still yields the structured 404.

use crate::error::ApiError;
use crate::query::resolve_request;
use crate::response::ApiResult;
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::State,
    http::{Method, Uri},
    Router,
};
use serde_json::Value;
use tower_http::limit::RequestBodyLimitLayer;

fn parse_body(bytes: &[u8]) -> Result<Value, ApiError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(bytes).map_err(|e| ApiError::BadRequest(format!("body must be JSON: {}", e)))
}

async fn dispatch(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> Result<ApiResult, ApiError> {
    let body = parse_body(&body)?;
    let result = resolve_request(&state.registry, uri.path(), &method, body).await;
    match &result {
        Ok(r) => tracing::debug!(method = %method, path = %uri.path(), status = %r.status_code, "resolved"),
        Err(e) if e.status_code().is_client_error() => {
            tracing::warn!(method = %method, path = %uri.path(), error = %e, "rejected")
        }
        Err(_) => {}
    }
    result
}

/// Fallback router feeding every request into the driver. Bodies above `max_body_bytes` get 413.
pub fn entity_routes(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .fallback(dispatch)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .with_state(state)
}
