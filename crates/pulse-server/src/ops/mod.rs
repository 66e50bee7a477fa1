//! Operational HTTP endpoints.
//!
//! - `/health`       : status, version, uptime (JSON)
//! - `/health/ready` : readiness (503 when any probe fails)
//! - `/health/live`  : liveness
//! - `/metrics`      : JSON snapshot of the request accumulator

pub mod probe;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use pulse_core::duration::format_duration;
use pulse_core::MetricsSnapshot;

use crate::app_state::{AppState, VERSION};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub version: &'static str,
    pub uptime: String,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now(),
        version: VERSION,
        uptime: format_duration(state.uptime()),
    })
}

pub async fn ready(State(state): State<AppState>) -> Response {
    match state.probes().check_all().await {
        Ok(()) => (StatusCode::OK, "ready").into_response(),
        Err(failure) => {
            tracing::warn!(probe = failure.probe, reason = %failure.reason, "readiness probe failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                format!("not ready: {}", failure.probe),
            )
                .into_response()
        }
    }
}

pub async fn live() -> impl IntoResponse {
    (StatusCode::OK, "alive")
}

pub async fn metrics(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.metrics().snapshot())
}
