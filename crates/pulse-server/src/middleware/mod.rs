//! Request middleware.
//!
//! Stack, outermost first: request id, access log, metrics instrumentation,
//! panic recovery, timeout, CORS, compression. Rate limiting is attached per
//! route group in `router`.

pub mod access_log;
pub mod metrics;
pub mod rate_limit;
pub mod recovery;

pub use access_log::access_log;
pub use metrics::{track_requests, InFlight, StatusLatch};
pub use rate_limit::{client_ip, limit_by_client};
pub use recovery::recover_panics;
