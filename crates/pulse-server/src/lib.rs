//! pulse server library entry.
//!
//! Wires config, shared state, middleware, and the operational and
//! application routes into an axum router. Consumed by the binary
//! (`main.rs`) and by integration tests.

pub mod api;
pub mod app_state;
pub mod config;
pub mod error;
pub mod middleware;
pub mod ops;
pub mod policy;
pub mod router;
pub mod shutdown;
