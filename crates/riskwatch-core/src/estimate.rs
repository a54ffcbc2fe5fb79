//! The `ControlEstimator` trait.
//!
//! An estimator turns remediation evidence into an updated control rating
//! (0–5). Implementations may be slow or non-deterministic (e.g. backed by an
//! external reasoning service); callers bound them with a timeout and fall
//! back to the last known rating when they fail.

use std::future::Future;

use thiserror::Error;

use crate::{answers::Answers, risk::Risk};

pub trait ControlEstimator: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Estimate the control rating for `risk` given the submitted `evidence`.
  fn estimate<'a>(
    &'a self,
    risk: &'a Risk,
    evidence: &'a Answers,
  ) -> impl Future<Output = Result<f64, Self::Error>> + Send + 'a;
}

/// An estimator that is never available. Every submission recorded with it
/// runs in degraded mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unavailable;

#[derive(Debug, Error)]
#[error("no control-effectiveness estimator is configured")]
pub struct UnavailableError;

impl ControlEstimator for Unavailable {
  type Error = UnavailableError;

  async fn estimate(
    &self,
    _risk: &Risk,
    _evidence: &Answers,
  ) -> Result<f64, UnavailableError> {
    Err(UnavailableError)
  }
}
