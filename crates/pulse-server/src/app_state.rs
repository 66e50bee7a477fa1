//! Shared application state for the pulse server.
//!
//! Every long-lived component is constructed once in `main` and handed in
//! here explicitly; handlers and middleware reach it through axum `State`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use pulse_core::error::Result;
use pulse_core::Metrics;

use crate::config::ServerConfig;
use crate::ops::probe::{DrainProbe, ProbeRegistry};
use crate::policy::ClientRateLimiter;

/// Reported by `/health`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
    metrics: Arc<Metrics>,
    limiter: Arc<ClientRateLimiter>,
    probes: Arc<ProbeRegistry>,
}

struct AppStateInner {
    cfg: ServerConfig,
    started_at: Instant,
    draining: Arc<AtomicBool>,
}

impl AppState {
    /// Build application state around an existing metrics accumulator.
    pub fn new(cfg: ServerConfig, metrics: Arc<Metrics>) -> Result<Self> {
        cfg.validate()?;

        let limiter = ClientRateLimiter::new(cfg.rate_limit.clone());
        let draining = Arc::new(AtomicBool::new(false));

        let probes = ProbeRegistry::new();
        probes.register(Arc::new(DrainProbe::new(Arc::clone(&draining))));

        Ok(Self {
            inner: Arc::new(AppStateInner {
                cfg,
                started_at: Instant::now(),
                draining,
            }),
            metrics,
            limiter: Arc::new(limiter),
            probes: Arc::new(probes),
        })
    }

    pub fn cfg(&self) -> &ServerConfig {
        &self.inner.cfg
    }

    pub fn uptime(&self) -> Duration {
        self.inner.started_at.elapsed()
    }

    pub fn metrics(&self) -> Arc<Metrics> {
        Arc::clone(&self.metrics)
    }

    pub fn limiter(&self) -> &ClientRateLimiter {
        &self.limiter
    }

    pub fn probes(&self) -> &ProbeRegistry {
        &self.probes
    }

    /// Mark draining state; readiness fails from here on.
    pub fn set_draining(&self) {
        self.inner.draining.store(true, Ordering::Relaxed);
    }

    pub fn is_draining(&self) -> bool {
        self.inner.draining.load(Ordering::Relaxed)
    }
}
