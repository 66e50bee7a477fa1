//! Request admission policy.
//!
//! Currently a per-client leaky-bucket limiter applied in front of the
//! metrics and application routes.

pub mod rate_limit;

pub use rate_limit::{ClientRateLimiter, LeakyBucket};
