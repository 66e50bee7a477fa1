//! Serve until SIGINT/SIGTERM, then drain.
//!
//! On signal the readiness probe starts failing and axum stops accepting new
//! connections. In-flight requests get `grace` to finish; after that the
//! server future is dropped and the process exits anyway.

use std::future::{Future, IntoFuture};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::Notify;

use pulse_core::duration::format_duration;
use pulse_core::error::{PulseError, Result};

use crate::app_state::AppState;

/// How the server stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// Every connection closed within the grace period.
    Drained,
    /// The grace period ran out with requests still in flight.
    Forced,
}

/// Serve until SIGINT/SIGTERM.
pub async fn serve(
    listener: TcpListener,
    app: Router,
    state: AppState,
    grace: Duration,
) -> Result<ShutdownOutcome> {
    serve_with_shutdown(listener, app, state, grace, shutdown_signal()).await
}

/// Serve until `trigger` resolves, then drain for at most `grace`.
pub async fn serve_with_shutdown<F>(
    listener: TcpListener,
    app: Router,
    state: AppState,
    grace: Duration,
    trigger: F,
) -> Result<ShutdownOutcome>
where
    F: Future<Output = ()> + Send + 'static,
{
    let signalled = Arc::new(Notify::new());
    let notify = Arc::clone(&signalled);
    let drain_state = state.clone();

    let server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        trigger.await;
        drain_state.set_draining();
        tracing::info!("shutting down server");
        notify.notify_one();
    })
    .into_future();

    let deadline = async {
        signalled.notified().await;
        tokio::time::sleep(grace).await;
    };

    let outcome = tokio::select! {
        res = server => {
            res.map_err(|e| PulseError::Internal(format!("server failed: {e}")))?;
            ShutdownOutcome::Drained
        }
        _ = deadline => {
            tracing::warn!(
                grace = %format_duration(grace),
                active_requests = state.metrics().active_requests(),
                "server forced to shutdown"
            );
            ShutdownOutcome::Forced
        }
    };

    tracing::info!(?outcome, "server exited");
    Ok(outcome)
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "SIGTERM handler unavailable; waiting for ctrl-c");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    tracing::info!("shutdown signal received");
}
