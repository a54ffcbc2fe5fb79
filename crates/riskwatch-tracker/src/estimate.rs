//! The call-with-fallback wrapper around a [`ControlEstimator`].
//!
//! This is the only place an estimator is invoked. It bounds the call with a
//! timeout, rejects ratings outside `[0, 5]`, and on any failure hands back
//! the caller's fallback rating together with the reason.

use std::time::Duration;

use riskwatch_core::{
  answers::Answers,
  assessment::{RATING_MAX, RATING_MIN},
  estimate::ControlEstimator,
  risk::Risk,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a submission ran without a fresh control rating.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Degradation {
  #[error("estimator did not answer within {after_ms} ms")]
  TimedOut { after_ms: u64 },

  #[error("estimator failed: {message}")]
  Failed { message: String },

  #[error("estimator returned {value}, outside [0, 5]")]
  OutOfRange { value: f64 },
}

/// The control rating a submission will use.
#[derive(Debug, Clone, PartialEq)]
pub struct EstimationOutcome {
  /// A fresh estimate, or the fallback when `degraded` is set.
  pub control_rating: f64,
  pub degraded:       Option<Degradation>,
}

impl EstimationOutcome {
  pub fn is_degraded(&self) -> bool { self.degraded.is_some() }
}

/// Ask `estimator` for a rating, falling back to `fallback` if it fails,
/// times out, or answers out of range.
pub async fn estimate_with_fallback<E: ControlEstimator>(
  estimator: &E,
  risk: &Risk,
  evidence: &Answers,
  timeout: Duration,
  fallback: f64,
) -> EstimationOutcome {
  let degraded = match tokio::time::timeout(timeout, estimator.estimate(risk, evidence)).await {
    Ok(Ok(value)) if (RATING_MIN..=RATING_MAX).contains(&value) => {
      return EstimationOutcome {
        control_rating: value,
        degraded:       None,
      };
    }
    Ok(Ok(value)) => Degradation::OutOfRange { value },
    Ok(Err(e)) => Degradation::Failed {
      message: e.to_string(),
    },
    Err(_) => Degradation::TimedOut {
      after_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
    },
  };

  tracing::warn!(
    risk_id = %risk.risk_id,
    fallback,
    "control estimate degraded: {degraded}"
  );
  EstimationOutcome {
    control_rating: fallback,
    degraded:       Some(degraded),
  }
}
