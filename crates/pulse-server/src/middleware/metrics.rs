//! Request instrumentation.
//!
//! Every request is wrapped in an [`InFlight`] guard: the start is recorded on
//! entry and the finish is recorded when the guard drops. Dropping covers
//! normal completion as well as a request future cancelled mid-flight (client
//! disconnect), so `active_requests` cannot leak upward.
//!
//! Panics are expected to be turned into a 500 by the recovery layer, which
//! sits inside this one.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;

use pulse_core::Metrics;

/// Recorded for requests dropped before any status was produced.
/// Non-standard, but widely understood as "client closed request".
pub const CLIENT_CLOSED_REQUEST: u16 = 499;

/// Remembers the first status written for a response.
///
/// Later `write_header` calls are ignored, like a real transport where only
/// the first status line goes out. Writing a body without a status latches
/// 200.
///
/// An axum `Response` carries exactly one status, so `track_requests` writes
/// the latch once. First-write-wins only comes into play for callers that
/// drive an [`InFlight`] by hand across several writes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StatusLatch {
    status: Option<u16>,
}

impl StatusLatch {
    pub fn write_header(&mut self, status: u16) {
        self.status.get_or_insert(status);
    }

    pub fn write_body(&mut self) {
        self.write_header(StatusCode::OK.as_u16());
    }

    /// The effective status, if any was written.
    pub fn effective(&self) -> Option<u16> {
        self.status
    }
}

/// Scoped "request in flight" marker.
pub struct InFlight {
    metrics: Arc<Metrics>,
    started: Instant,
    status: StatusLatch,
}

impl InFlight {
    pub fn begin(metrics: Arc<Metrics>) -> Self {
        let started = Instant::now();
        metrics.record_start();
        Self {
            metrics,
            started,
            status: StatusLatch::default(),
        }
    }

    pub fn status(&mut self) -> &mut StatusLatch {
        &mut self.status
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        let status = self.status.effective().unwrap_or(CLIENT_CLOSED_REQUEST);
        self.metrics.record_finish(status, self.started.elapsed());
    }
}

pub async fn track_requests(
    State(metrics): State<Arc<Metrics>>,
    req: Request,
    next: Next,
) -> Response {
    let mut flight = InFlight::begin(metrics);
    let res = next.run(req).await;
    flight.status().write_header(res.status().as_u16());
    res
}
