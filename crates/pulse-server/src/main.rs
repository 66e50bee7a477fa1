//! pulse server
//!
//! - `/health`, `/health/ready`, `/health/live`
//! - `/metrics`: JSON request metrics
//! - `/api/v1/*`: application routes
//!
//! Config comes from the environment (see `config`). Log level from
//! `RUST_LOG`, default `info`.

use std::process::ExitCode;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

use pulse_core::duration::format_duration;
use pulse_core::error::{PulseError, Result};
use pulse_core::Metrics;
use pulse_server::{app_state, config, router, shutdown};

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "pulse-server failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let cfg = config::load()?;
    let listen = cfg.server.address();
    let grace = cfg.server.shutdown_timeout;

    let metrics = Arc::new(Metrics::new());
    let state = app_state::AppState::new(cfg, metrics)?;
    let app = router::build_router(state.clone());

    let listener = TcpListener::bind(listen.as_str())
        .await
        .map_err(|e| PulseError::Internal(format!("bind {listen} failed: {e}")))?;

    let server = &state.cfg().server;
    tracing::info!(
        %listen,
        environment = %server.environment,
        version = app_state::VERSION,
        write_timeout = %format_duration(server.write_timeout),
        shutdown_timeout = %format_duration(grace),
        "pulse-server starting"
    );

    shutdown::serve(listener, app, state, grace).await?;
    Ok(())
}
