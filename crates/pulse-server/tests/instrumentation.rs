#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::routing::get;
use axum::{middleware, Router};
use tower::ServiceExt;

use pulse_core::Metrics;
use pulse_server::middleware::metrics::CLIENT_CLOSED_REQUEST;
use pulse_server::middleware::{
    access_log, recover_panics, track_requests, InFlight, StatusLatch,
};
use pulse_server::router::timeout_layer;

async fn boom() -> &'static str {
    panic!("boom")
}

async fn teapot() -> StatusCode {
    StatusCode::IM_A_TEAPOT
}

async fn slow() -> &'static str {
    tokio::time::sleep(Duration::from_secs(60)).await;
    "late"
}

fn instrumented(metrics: &Arc<Metrics>) -> Router {
    Router::new()
        .route("/ok", get(|| async { "ok" }))
        .route("/teapot", get(teapot))
        .route("/boom", get(boom))
        .route("/slow", get(slow))
        .layer(middleware::from_fn(recover_panics))
        .layer(middleware::from_fn_with_state(Arc::clone(metrics), track_requests))
}

fn get_req(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[test]
fn latch_keeps_first_status() {
    let mut latch = StatusLatch::default();
    assert_eq!(latch.effective(), None);

    latch.write_header(404);
    latch.write_header(500);
    assert_eq!(latch.effective(), Some(404));

    latch.write_body();
    assert_eq!(latch.effective(), Some(404));
}

#[test]
fn body_without_status_latches_ok() {
    let mut latch = StatusLatch::default();
    latch.write_body();
    latch.write_header(503);
    assert_eq!(latch.effective(), Some(200));
}

#[test]
fn in_flight_guard_records_on_drop() {
    let metrics = Arc::new(Metrics::new());

    let mut flight = InFlight::begin(Arc::clone(&metrics));
    assert_eq!(metrics.active_requests(), 1);
    flight.status().write_header(201);
    drop(flight);

    assert_eq!(metrics.active_requests(), 0);
    assert_eq!(metrics.status_codes().get(&201), Some(&1));

    let abandoned = InFlight::begin(Arc::clone(&metrics));
    drop(abandoned);
    assert_eq!(metrics.active_requests(), 0);
    assert_eq!(metrics.status_codes().get(&CLIENT_CLOSED_REQUEST), Some(&1));
    assert_eq!(metrics.error_count(), 0);
}

#[tokio::test]
async fn records_handler_status() {
    let metrics = Arc::new(Metrics::new());
    let app = instrumented(&metrics);

    let res = app.clone().oneshot(get_req("/ok")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let res = app.oneshot(get_req("/teapot")).await.unwrap();
    assert_eq!(res.status(), StatusCode::IM_A_TEAPOT);

    assert_eq!(metrics.request_count(), 2);
    assert_eq!(metrics.active_requests(), 0);
    assert_eq!(metrics.status_codes().get(&200), Some(&1));
    assert_eq!(metrics.status_codes().get(&418), Some(&1));
    assert_eq!(metrics.error_count(), 0);
}

#[tokio::test]
async fn panics_are_recorded_as_server_errors() {
    let metrics = Arc::new(Metrics::new());
    let app = instrumented(&metrics);

    let res = app.oneshot(get_req("/boom")).await.unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);

    assert_eq!(metrics.active_requests(), 0);
    assert_eq!(metrics.error_count(), 1);
    assert_eq!(metrics.status_codes().get(&500), Some(&1));
}

#[tokio::test]
async fn cancelled_requests_do_not_leak_active_count() {
    let metrics = Arc::new(Metrics::new());
    let app = instrumented(&metrics);

    let res = tokio::time::timeout(Duration::from_millis(50), app.oneshot(get_req("/slow"))).await;
    assert!(res.is_err(), "slow handler should not finish");

    assert_eq!(metrics.request_count(), 1);
    assert_eq!(metrics.active_requests(), 0);
    assert_eq!(metrics.status_codes().get(&CLIENT_CLOSED_REQUEST), Some(&1));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_balance_out() {
    let metrics = Arc::new(Metrics::new());
    let app = instrumented(&metrics);

    let mut tasks = Vec::new();
    for i in 0..200 {
        let app = app.clone();
        let uri = if i % 4 == 0 { "/boom" } else { "/ok" };
        tasks.push(tokio::spawn(async move { app.oneshot(get_req(uri)).await.unwrap().status() }));
    }
    for t in tasks {
        t.await.unwrap();
    }

    let snap = metrics.snapshot();
    assert_eq!(snap.total_requests, 200);
    assert_eq!(snap.active_requests, 0);
    assert_eq!(snap.error_count, 50);
    assert_eq!(snap.status_codes.values().sum::<u64>(), 200);
    assert!((snap.error_rate_percent - 25.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn timed_out_requests_are_recorded_as_408() {
    let metrics = Arc::new(Metrics::new());
    let app = Router::new()
        .route("/slow", get(slow))
        .layer(timeout_layer(Duration::from_millis(20)))
        .layer(middleware::from_fn_with_state(Arc::clone(&metrics), track_requests));

    let res = app.oneshot(get_req("/slow")).await.unwrap();
    assert_eq!(res.status(), StatusCode::REQUEST_TIMEOUT);
    assert_eq!(metrics.status_codes().get(&408), Some(&1));
    assert_eq!(metrics.active_requests(), 0);
}

#[tokio::test]
async fn access_log_passes_responses_through() {
    let app = Router::new()
        .route("/teapot", get(teapot))
        .layer(middleware::from_fn(access_log));

    let res = app.oneshot(get_req("/teapot")).await.unwrap();
    assert_eq!(res.status(), StatusCode::IM_A_TEAPOT);
}
