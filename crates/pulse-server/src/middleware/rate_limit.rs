//! Per-client rate limiting middleware.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use pulse_core::error::PulseError;

use crate::app_state::AppState;
use crate::error::ApiError;

pub async fn limit_by_client(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let ip = client_ip(&req);
    match state.limiter().check(ip) {
        Ok(()) => next.run(req).await,
        Err(retry_after_secs) => {
            tracing::debug!(%ip, retry_after_secs, "rate limited");
            ApiError(PulseError::RateLimited { retry_after_secs }).into_response()
        }
    }
}

/// Best guess at the real client address.
///
/// Order: `X-Real-IP`, first hop of `X-Forwarded-For`, the socket peer. Falls
/// back to `0.0.0.0` when the server runs without connect info (tests).
pub fn client_ip(req: &Request) -> IpAddr {
    let header_ip = |name: &str| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .and_then(|v| v.trim().parse::<IpAddr>().ok())
    };

    header_ip("x-real-ip")
        .or_else(|| header_ip("x-forwarded-for"))
        .or_else(|| {
            req.extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip())
        })
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}
