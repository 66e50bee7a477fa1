//! Server config loader.
//!
//! Defaults, then an optional strict YAML file named by `CONFIG_FILE`, then
//! environment variables. The result is validated before use.

pub mod schema;

use std::fs;

use pulse_core::error::{PulseError, Result};

pub use schema::{RateLimitSection, ServerConfig, ServerSection};

/// Variable naming an optional YAML config file.
pub const CONFIG_FILE_ENV: &str = "CONFIG_FILE";

/// Load config from the process environment.
pub fn load() -> Result<ServerConfig> {
    from_lookup(|key| std::env::var(key).ok())
}

/// Load config using `lookup` in place of the process environment.
pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<ServerConfig> {
    let mut cfg = match lookup(CONFIG_FILE_ENV).filter(|p| !p.is_empty()) {
        Some(path) => parse_file(&path)?,
        None => ServerConfig::default(),
    };
    cfg.apply_env(lookup);
    cfg.validate()?;
    Ok(cfg)
}

pub fn load_from_str(s: &str) -> Result<ServerConfig> {
    let cfg = parse_str(s)?;
    cfg.validate()?;
    Ok(cfg)
}

fn parse_file(path: &str) -> Result<ServerConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| PulseError::Config(format!("read {path} failed: {e}")))?;
    parse_str(&s)
}

fn parse_str(s: &str) -> Result<ServerConfig> {
    serde_yaml::from_str(s).map_err(|e| PulseError::Config(format!("invalid yaml: {e}")))
}
