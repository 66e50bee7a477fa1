//! Application routes, mounted under `/api/v1`.

use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use pulse_core::error::PulseError;

use crate::app_state::AppState;
use crate::error::ApiError;

pub fn routes() -> Router<AppState> {
    Router::new().route("/hello", get(hello))
}

pub async fn hello() -> impl IntoResponse {
    Json(json!({ "message": "Hello, World!" }))
}

/// Fallback for unmatched routes.
pub async fn not_found() -> ApiError {
    ApiError(PulseError::NotFound)
}
