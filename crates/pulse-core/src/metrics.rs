//! In-process request metrics accumulator.
//!
//! Scalar counters are independent atomics so the hot write path never takes
//! a lock. Only the per-status breakdown sits behind an `RwLock`, held for a
//! single map increment or a single map copy and never across the scalar
//! updates.
//!
//! # Consistency
//! Each field is updated atomically, but `record_finish` is not one
//! transaction. A concurrent reader can observe e.g. `error_count` already
//! bumped while `status_codes[500]` is not yet. Snapshots are best-effort
//! point-in-time views; individual fields are never torn.
//!
//! State lives for the process lifetime and resets on restart. Nothing is
//! persisted.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::duration::serialize_human;

/// Largest average the snapshot reports, in nanoseconds.
///
/// Matches the range of a signed 64-bit nanosecond duration; larger averages
/// are clamped here instead of wrapping.
pub const MAX_AVERAGE_NANOS: u64 = i64::MAX as u64;

/// Responses at or above this status count as errors.
pub const ERROR_STATUS_FLOOR: u16 = 500;

/// Shared request counters. Construct once at startup, then share via `Arc`.
#[derive(Debug)]
pub struct Metrics {
    request_count: AtomicU64,
    error_count: AtomicU64,
    total_duration_nanos: AtomicU64,
    active_requests: AtomicI64,
    status_codes: RwLock<HashMap<u16, u64>>,
    started_at: Instant,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            request_count: AtomicU64::new(0),
            error_count: AtomicU64::new(0),
            total_duration_nanos: AtomicU64::new(0),
            active_requests: AtomicI64::new(0),
            status_codes: RwLock::new(HashMap::new()),
            started_at: Instant::now(),
        }
    }

    /// A request entered the pipeline.
    pub fn record_start(&self) {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        self.active_requests.fetch_add(1, Ordering::Relaxed);
    }

    /// A request left the pipeline with `status` after `duration`.
    pub fn record_finish(&self, status: u16, duration: Duration) {
        self.active_requests.fetch_sub(1, Ordering::Relaxed);

        let nanos = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
        self.total_duration_nanos.fetch_add(nanos, Ordering::Relaxed);

        {
            let mut codes = self
                .status_codes
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            *codes.entry(status).or_insert(0) += 1;
        }

        if status >= ERROR_STATUS_FLOOR {
            self.error_count.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Total requests started, including in-flight ones.
    pub fn request_count(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Total responses with a 5xx status.
    pub fn error_count(&self) -> u64 {
        self.error_count.load(Ordering::Relaxed)
    }

    pub fn active_requests(&self) -> i64 {
        self.active_requests.load(Ordering::Relaxed)
    }

    /// Accumulated duration divided by requests started, clamped to
    /// [`MAX_AVERAGE_NANOS`]. Zero before the first request.
    pub fn average_duration(&self) -> Duration {
        let count = self.request_count.load(Ordering::Relaxed);
        if count == 0 {
            return Duration::ZERO;
        }
        let total = self.total_duration_nanos.load(Ordering::Relaxed);
        Duration::from_nanos((total / count).min(MAX_AVERAGE_NANOS))
    }

    /// Errors as a percentage of requests started. Zero before the first request.
    pub fn error_rate(&self) -> f64 {
        let requests = self.request_count.load(Ordering::Relaxed);
        if requests == 0 {
            return 0.0;
        }
        let errors = self.error_count.load(Ordering::Relaxed);
        (errors as f64 / requests as f64) * 100.0
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Owned copy of the per-status counts.
    pub fn status_codes(&self) -> HashMap<u16, u64> {
        self.status_codes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_requests: self.request_count(),
            active_requests: self.active_requests(),
            error_count: self.error_count(),
            error_rate_percent: self.error_rate(),
            average_duration: self.average_duration(),
            uptime: self.uptime(),
            status_codes: self.status_codes(),
        }
    }
}

/// Point-in-time view of [`Metrics`], detached from the live counters.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub active_requests: i64,
    pub error_count: u64,
    pub error_rate_percent: f64,
    #[serde(serialize_with = "serialize_human")]
    pub average_duration: Duration,
    #[serde(serialize_with = "serialize_human")]
    pub uptime: Duration,
    pub status_codes: HashMap<u16, u64>,
}
