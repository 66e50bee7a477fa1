use std::time::Duration;

use serde::{Deserialize, Deserializer};

use pulse_core::duration::parse_duration;
use pulse_core::error::{PulseError, Result};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub rate_limit: RateLimitSection,
}

impl ServerConfig {
    pub fn validate(&self) -> Result<()> {
        self.server.validate()?;
        self.rate_limit.validate()?;
        Ok(())
    }

    /// Overlay environment values onto this config.
    ///
    /// `lookup` returns the raw value for a variable name. Empty values count
    /// as unset; values that fail to parse keep the current setting and log a
    /// warning.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(host) = get("HOST") {
            self.server.host = host;
        }
        if let Some(env) = get("ENVIRONMENT") {
            self.server.environment = env;
        }
        overlay(&get, "PORT", &mut self.server.port, |raw| raw.parse().ok());
        overlay(&get, "WRITE_TIMEOUT", &mut self.server.write_timeout, |raw| {
            parse_duration(raw).ok()
        });
        overlay(&get, "SHUTDOWN_TIMEOUT", &mut self.server.shutdown_timeout, |raw| {
            parse_duration(raw).ok()
        });
        overlay(&get, "RATE_LIMIT_RPS", &mut self.rate_limit.requests_per_second, |raw| {
            raw.parse().ok()
        });
        overlay(&get, "RATE_LIMIT_BURST", &mut self.rate_limit.burst, |raw| raw.parse().ok());
    }
}

fn overlay<T>(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
    slot: &mut T,
    parse: impl Fn(&str) -> Option<T>,
) {
    let Some(raw) = get(key) else { return };
    match parse(&raw) {
        Some(v) => *slot = v,
        None => tracing::warn!(key, value = %raw, "ignoring unparsable env value"),
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_environment")]
    pub environment: String,

    /// Deadline for producing a response.
    #[serde(default = "default_write_timeout", deserialize_with = "de_duration")]
    pub write_timeout: Duration,

    /// Grace period for in-flight requests after a shutdown signal.
    #[serde(default = "default_shutdown_timeout", deserialize_with = "de_duration")]
    pub shutdown_timeout: Duration,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            environment: default_environment(),
            write_timeout: default_write_timeout(),
            shutdown_timeout: default_shutdown_timeout(),
        }
    }
}

impl ServerSection {
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(PulseError::Config("server.host must not be empty".into()));
        }
        if self.port == 0 {
            return Err(PulseError::Config("server.port must be non-zero".into()));
        }
        if self.write_timeout.is_zero() {
            return Err(PulseError::Config("server.write_timeout must be positive".into()));
        }
        if self.shutdown_timeout.is_zero() {
            return Err(PulseError::Config(
                "server.shutdown_timeout must be positive".into(),
            ));
        }
        Ok(())
    }

    /// `host:port` listen address.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RateLimitSection {
    #[serde(default = "default_rps")]
    pub requests_per_second: u32,

    #[serde(default = "default_burst")]
    pub burst: u32,

    /// Tracked client addresses before idle buckets are trimmed.
    #[serde(default = "default_max_ip_entries")]
    pub max_ip_entries: usize,
}

impl Default for RateLimitSection {
    fn default() -> Self {
        Self {
            requests_per_second: default_rps(),
            burst: default_burst(),
            max_ip_entries: default_max_ip_entries(),
        }
    }
}

impl RateLimitSection {
    pub fn validate(&self) -> Result<()> {
        if self.requests_per_second == 0 {
            return Err(PulseError::Config(
                "rate_limit.requests_per_second must be at least 1".into(),
            ));
        }
        if self.burst == 0 {
            return Err(PulseError::Config("rate_limit.burst must be at least 1".into()));
        }
        if self.max_ip_entries == 0 {
            return Err(PulseError::Config(
                "rate_limit.max_ip_entries must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

fn de_duration<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Duration, D::Error> {
    let raw = String::deserialize(d)?;
    parse_duration(&raw).map_err(serde::de::Error::custom)
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8080
}
fn default_environment() -> String {
    "production".into()
}
fn default_write_timeout() -> Duration {
    Duration::from_secs(10)
}
fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(30)
}
fn default_rps() -> u32 {
    100
}
fn default_burst() -> u32 {
    200
}
fn default_max_ip_entries() -> usize {
    10_000
}
