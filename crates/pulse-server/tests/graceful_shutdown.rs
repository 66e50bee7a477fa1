#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::routing::get;
use axum::Router;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{oneshot, Notify};
use tower::ServiceExt;

use pulse_core::Metrics;
use pulse_server::app_state::AppState;
use pulse_server::config::ServerConfig;
use pulse_server::router::build_router;
use pulse_server::shutdown::{serve_with_shutdown, ShutdownOutcome};

fn state() -> AppState {
    AppState::new(ServerConfig::default(), Arc::new(Metrics::new())).unwrap()
}

async fn wait_until(cond: impl Fn() -> bool) {
    for _ in 0..500 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached within 5s");
}

async fn ready_status(state: &AppState) -> StatusCode {
    let req = Request::builder().uri("/health/ready").body(Body::empty()).unwrap();
    build_router(state.clone()).oneshot(req).await.unwrap().status()
}

#[tokio::test]
async fn in_flight_request_forces_exit_after_grace() {
    let state = state();
    let entered = Arc::new(Notify::new());
    let slow_entered = Arc::clone(&entered);
    let app = build_router(state.clone()).merge(Router::new().route(
        "/slow",
        get(move || {
            let entered = Arc::clone(&slow_entered);
            async move {
                entered.notify_one();
                tokio::time::sleep(Duration::from_secs(60)).await;
                "late"
            }
        }),
    ));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let grace = Duration::from_millis(300);
    let (tx, rx) = oneshot::channel::<()>();
    let server = tokio::spawn(serve_with_shutdown(listener, app, state.clone(), grace, async move {
        let _ = rx.await;
    }));

    let mut conn = TcpStream::connect(addr).await.unwrap();
    conn.write_all(b"GET /slow HTTP/1.1\r\nhost: localhost\r\n\r\n")
        .await
        .unwrap();
    tokio::time::timeout(Duration::from_secs(5), entered.notified())
        .await
        .expect("slow handler never started");

    assert_eq!(ready_status(&state).await, StatusCode::OK);

    let fired = Instant::now();
    tx.send(()).unwrap();
    wait_until(|| state.is_draining()).await;
    assert_eq!(ready_status(&state).await, StatusCode::SERVICE_UNAVAILABLE);

    let outcome = tokio::time::timeout(grace + Duration::from_secs(5), server)
        .await
        .expect("serve did not return")
        .unwrap()
        .unwrap();
    let elapsed = fired.elapsed();

    assert_eq!(outcome, ShutdownOutcome::Forced);
    assert!(elapsed >= grace, "returned before grace: {elapsed:?}");
    assert!(elapsed < grace + Duration::from_secs(2), "returned too late: {elapsed:?}");
    drop(conn);
}

#[tokio::test]
async fn idle_server_drains_cleanly() {
    let state = state();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let grace = Duration::from_secs(30);
    let (tx, rx) = oneshot::channel::<()>();
    let server = tokio::spawn(serve_with_shutdown(
        listener,
        build_router(state.clone()),
        state.clone(),
        grace,
        async move {
            let _ = rx.await;
        },
    ));

    tx.send(()).unwrap();
    let outcome = tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("idle server should stop well before grace")
        .unwrap()
        .unwrap();

    assert_eq!(outcome, ShutdownOutcome::Drained);
    assert!(state.is_draining());
}
