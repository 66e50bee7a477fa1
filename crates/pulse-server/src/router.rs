//! Axum router wiring.
//!
//! Health routes bypass rate limiting so orchestrator probes are never
//! throttled; `/metrics` and `/api/v1/*` are limited per client.

use std::time::Duration;

use axum::http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, LINK};
use axum::http::request::Parts;
use axum::http::{HeaderName, HeaderValue, Method, StatusCode};
use axum::{middleware, routing::get, Router};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;

use crate::middleware::{access_log, limit_by_client, recover_panics, track_requests};
use crate::{api, app_state::AppState, ops};

const CORS_MAX_AGE: Duration = Duration::from_secs(300);

pub fn build_router(state: AppState) -> Router {
    let limited = Router::new()
        .route("/metrics", get(ops::metrics))
        .nest("/api/v1", api::routes())
        .route_layer(middleware::from_fn_with_state(state.clone(), limit_by_client));

    Router::new()
        .route("/health", get(ops::health))
        .route("/health/ready", get(ops::ready))
        .route("/health/live", get(ops::live))
        .merge(limited)
        .fallback(api::not_found)
        .with_state(state.clone())
        .layer(CompressionLayer::new())
        .layer(cors_layer())
        .layer(timeout_layer(state.cfg().server.write_timeout))
        .layer(middleware::from_fn(recover_panics))
        .layer(middleware::from_fn_with_state(state.metrics(), track_requests))
        .layer(middleware::from_fn(access_log))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

/// Requests still running after `limit` are answered with 408.
pub fn timeout_layer(limit: Duration) -> TimeoutLayer {
    TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, limit)
}

/// Any http(s) origin, no credentials.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(|origin: &HeaderValue, _: &Parts| {
            let o = origin.as_bytes();
            o.starts_with(b"https://") || o.starts_with(b"http://")
        }))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
            Method::PATCH,
        ])
        .allow_headers([
            ACCEPT,
            AUTHORIZATION,
            CONTENT_TYPE,
            HeaderName::from_static("x-csrf-token"),
        ])
        .expose_headers([LINK])
        .allow_credentials(false)
        .max_age(CORS_MAX_AGE)
}
