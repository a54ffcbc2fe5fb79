//! Core types and policy for the Riskwatch remediation tracker.
//!
//! This crate is deliberately free of HTTP, database, and runtime
//! dependencies. Every numeric and scheduling rule lives here as a pure
//! function so it can be tested without a store or an estimator.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod answers;
pub mod assessment;
pub mod clock;
pub mod error;
pub mod estimate;
pub mod health;
pub mod risk;
pub mod schedule;
pub mod store;

pub use error::{Error, Result};
