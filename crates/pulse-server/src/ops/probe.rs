//! Readiness probes.
//!
//! Anything the process depends on before it should take traffic registers a
//! probe here. `/health/ready` runs them all and reports the first failure.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use pulse_core::error::{PulseError, Result};

#[async_trait]
pub trait ReadinessProbe: Send + Sync {
    fn name(&self) -> &'static str;
    async fn check(&self) -> Result<()>;
}

/// A probe that failed, with its error rendered for logs.
#[derive(Debug, Clone)]
pub struct ProbeFailure {
    pub probe: &'static str,
    pub reason: String,
}

#[derive(Default)]
pub struct ProbeRegistry {
    probes: DashMap<&'static str, Arc<dyn ReadinessProbe>>,
}

impl ProbeRegistry {
    pub fn new() -> Self {
        Self {
            probes: DashMap::new(),
        }
    }

    /// Register a probe, replacing any probe with the same name.
    pub fn register(&self, probe: Arc<dyn ReadinessProbe>) {
        self.probes.insert(probe.name(), probe);
    }

    pub fn registered(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.probes.iter().map(|e| *e.key()).collect();
        names.sort_unstable();
        names
    }

    /// Run every probe in name order; stop at the first failure.
    pub async fn check_all(&self) -> std::result::Result<(), ProbeFailure> {
        // Snapshot out of the map so no shard guard is held across an await.
        let mut probes: Vec<Arc<dyn ReadinessProbe>> =
            self.probes.iter().map(|e| Arc::clone(e.value())).collect();
        probes.sort_unstable_by_key(|p| p.name());

        for probe in probes {
            if let Err(e) = probe.check().await {
                return Err(ProbeFailure {
                    probe: probe.name(),
                    reason: e.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Fails once shutdown has begun so load balancers stop routing here.
pub struct DrainProbe {
    draining: Arc<AtomicBool>,
}

impl DrainProbe {
    pub fn new(draining: Arc<AtomicBool>) -> Self {
        Self { draining }
    }
}

#[async_trait]
impl ReadinessProbe for DrainProbe {
    fn name(&self) -> &'static str {
        "draining"
    }

    async fn check(&self) -> Result<()> {
        if self.draining.load(Ordering::Relaxed) {
            return Err(PulseError::Internal("server is draining".into()));
        }
        Ok(())
    }
}
