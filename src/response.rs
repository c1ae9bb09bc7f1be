//! Terminal result of a path walk and its HTTP rendering.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;

/// Status plus optional payload. `ApiResult::default()` is a bare 200.
#[derive(Clone, Debug, PartialEq)]
pub struct ApiResult {
    pub status_code: StatusCode,
    pub payload: Option<Value>,
}

impl ApiResult {
    pub fn ok(payload: Value) -> Self {
        Self {
            status_code: StatusCode::OK,
            payload: Some(payload),
        }
    }

    /// Wraps a single member value as `{ "value": ... }`.
    pub fn value(value: Value) -> Self {
        Self::ok(serde_json::json!({ "value": value }))
    }
}

impl Default for ApiResult {
    fn default() -> Self {
        Self {
            status_code: StatusCode::OK,
            payload: None,
        }
    }
}

impl IntoResponse for ApiResult {
    fn into_response(self) -> Response {
        match self.payload {
            Some(payload) => (self.status_code, Json(payload)).into_response(),
            None => self.status_code.into_response(),
        }
    }
}
