//! Shared error type across pulse crates.

use thiserror::Error;

/// Client-facing error codes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCode {
    /// No route or resource matched.
    NotFound,
    /// Rate limited.
    RateLimited,
    /// Internal server error.
    Internal,
}

impl ClientCode {
    /// String representation used in JSON responses.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientCode::NotFound => "NOT_FOUND",
            ClientCode::RateLimited => "RATE_LIMITED",
            ClientCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, PulseError>;

/// Unified error type used by core and server.
#[derive(Debug, Error)]
pub enum PulseError {
    #[error("resource not found")]
    NotFound,
    #[error("rate limited (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },
    #[error("invalid config: {0}")]
    Config(String),
    #[error("invalid duration: {0:?}")]
    InvalidDuration(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl PulseError {
    /// Map internal error to a stable client-facing code.
    ///
    /// Config and duration errors only surface at startup, so they are
    /// reported as internal if they ever reach a client.
    pub fn client_code(&self) -> ClientCode {
        match self {
            PulseError::NotFound => ClientCode::NotFound,
            PulseError::RateLimited { .. } => ClientCode::RateLimited,
            PulseError::Config(_) | PulseError::InvalidDuration(_) | PulseError::Internal(_) => {
                ClientCode::Internal
            }
        }
    }
}
