//! pulse core: transport-agnostic metrics accumulator, duration helpers, and
//! the shared error type.
//!
//! This crate carries no HTTP or runtime dependencies. The server crate feeds
//! it request lifecycle events and reads snapshots back out of it.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here. Every accumulator
//! operation is total, and fallible helpers surface `PulseError`/`Result`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod duration;
pub mod error;
pub mod metrics;

pub use error::{ClientCode, PulseError, Result};
pub use metrics::{Metrics, MetricsSnapshot};
