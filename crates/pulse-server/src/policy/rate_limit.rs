//! Per-client rate limiter.
//!
//! - One leaky bucket per client IP, created on first sight.
//! - Rejections carry a Retry-After hint in whole seconds (min 1).
//! - When the map grows past `max_ip_entries`, buckets that have refilled
//!   completely are dropped. A full bucket is indistinguishable from a fresh
//!   one, so trimming never loosens a limit that is currently biting.
//! - Trimming scans the whole map, so it runs at most once per refill window
//!   (the time an empty bucket needs to fill up). Between trims the map may
//!   sit above the cap.

use std::net::IpAddr;
use std::time::Instant;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use dashmap::DashMap;

use crate::config::RateLimitSection;

/// Simple leaky bucket (capacity/refill, best-effort).
#[derive(Debug)]
pub struct LeakyBucket {
    capacity: u32,
    tokens: f64,
    refill_per_sec: f64,
    last: Instant,
}

impl LeakyBucket {
    pub fn new(capacity: u32, refill_per_sec: u32) -> Self {
        let cap = capacity.max(1);
        Self {
            capacity: cap,
            tokens: cap as f64,
            refill_per_sec: refill_per_sec.max(1) as f64,
            last: Instant::now(),
        }
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last).as_secs_f64();
        self.last = now;
        self.tokens = (self.tokens + elapsed * self.refill_per_sec).min(self.capacity as f64);
    }

    /// Consume `cost` tokens. Returns Ok if allowed, Err with retry_after seconds (ceil).
    pub fn try_take(&mut self, cost: u32) -> Result<(), u64> {
        self.refill(Instant::now());
        let c = cost.max(1) as f64;
        if self.tokens >= c {
            self.tokens -= c;
            Ok(())
        } else {
            let missing = c - self.tokens;
            let wait = (missing / self.refill_per_sec).ceil();
            Err(wait.max(1.0) as u64)
        }
    }

    /// True once the bucket would be back at full capacity.
    fn is_full_at(&self, now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(self.last).as_secs_f64();
        self.tokens + elapsed * self.refill_per_sec >= self.capacity as f64
    }
}

/// In-memory per-IP limiter shared by every request task.
#[derive(Debug)]
pub struct ClientRateLimiter {
    cfg: RateLimitSection,
    per_ip: DashMap<IpAddr, Mutex<LeakyBucket>>,
    created: Instant,
    refill_window_ms: u64,
    // Milliseconds since `created` before which no trim may start.
    next_trim_ms: AtomicU64,
    trims: AtomicU64,
}

impl ClientRateLimiter {
    pub fn new(cfg: RateLimitSection) -> Self {
        let rps = u64::from(cfg.requests_per_second.max(1));
        let refill_window_ms = (u64::from(cfg.burst.max(1)) * 1000).div_ceil(rps).max(1);
        Self {
            cfg,
            per_ip: DashMap::new(),
            created: Instant::now(),
            refill_window_ms,
            next_trim_ms: AtomicU64::new(0),
            trims: AtomicU64::new(0),
        }
    }

    /// Check allowance for `ip`. On reject, returns retry-after seconds (min 1).
    pub fn check(&self, ip: IpAddr) -> Result<(), u64> {
        {
            let entry = self.per_ip.entry(ip).or_insert_with(|| {
                Mutex::new(LeakyBucket::new(self.cfg.burst, self.cfg.requests_per_second))
            });
            let mut bucket = entry.value().lock().unwrap_or_else(PoisonError::into_inner);
            bucket.try_take(1)?;
        }

        if self.per_ip.len() > self.cfg.max_ip_entries {
            self.maybe_trim();
        }
        Ok(())
    }

    /// Number of tracked client addresses.
    pub fn tracked(&self) -> usize {
        self.per_ip.len()
    }

    /// Number of trims run so far.
    pub fn trims(&self) -> u64 {
        self.trims.load(Ordering::Relaxed)
    }

    fn maybe_trim(&self) {
        let now = Instant::now();
        let now_ms = u64::try_from(now.saturating_duration_since(self.created).as_millis())
            .unwrap_or(u64::MAX);
        let due = self.next_trim_ms.load(Ordering::Relaxed);
        if now_ms < due {
            return;
        }
        // Only the task that moves the deadline forward gets to scan.
        let next = now_ms.saturating_add(self.refill_window_ms);
        if self
            .next_trim_ms
            .compare_exchange(due, next, Ordering::AcqRel, Ordering::Relaxed)
            .is_err()
        {
            return;
        }
        self.trim(now);
    }

    fn trim(&self, now: Instant) {
        let before = self.per_ip.len();
        self.per_ip.retain(|_, bucket| match bucket.try_lock() {
            Ok(b) => !b.is_full_at(now),
            Err(_) => true,
        });
        self.trims.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(before, after = self.per_ip.len(), "rate limiter ip map trimmed");
    }
}
