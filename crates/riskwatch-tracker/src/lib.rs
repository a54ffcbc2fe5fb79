//! The Riskwatch remediation tracker.
//!
//! [`Tracker`] is the explicit context every operation runs against: a
//! [`RiskStore`], a [`ControlEstimator`], a [`Clock`], and a
//! [`TrackerConfig`]. There is no process-wide state; two trackers over two
//! stores are fully independent.
//!
//! Reads (due list, health, alerts, metrics) never mutate. Only
//! [`Tracker::submit_followup`] writes to an existing record, and it
//! serialises submissions per risk.

pub mod error;
pub mod estimate;
mod locks;
mod monitor;
mod recorder;

use std::{sync::Arc, time::Duration};

use riskwatch_core::{
  clock::Clock, estimate::ControlEstimator, schedule::DEFAULT_THRESHOLD_DAYS,
  store::RiskStore,
};

pub use error::{Error, Result};
pub use estimate::{Degradation, EstimationOutcome};
pub use recorder::SubmissionReport;

use crate::locks::RecordLocks;

/// Library-side tuning for a [`Tracker`].
#[derive(Debug, Clone)]
pub struct TrackerConfig {
  /// Days after creation before the first check-in is due.
  pub due_threshold_days: u32,
  /// Upper bound on a single estimator call.
  pub estimator_timeout:  Duration,
}

impl Default for TrackerConfig {
  fn default() -> Self {
    Self {
      due_threshold_days: DEFAULT_THRESHOLD_DAYS,
      estimator_timeout:  Duration::from_secs(30),
    }
  }
}

pub struct Tracker<S, E> {
  store:     Arc<S>,
  estimator: Arc<E>,
  clock:     Arc<dyn Clock>,
  config:    TrackerConfig,
  locks:     RecordLocks,
}

impl<S, E> Tracker<S, E>
where
  S: RiskStore,
  E: ControlEstimator,
{
  pub fn new(
    store: Arc<S>,
    estimator: Arc<E>,
    clock: Arc<dyn Clock>,
    config: TrackerConfig,
  ) -> Self {
    Self {
      store,
      estimator,
      clock,
      config,
      locks: RecordLocks::default(),
    }
  }

  pub fn store(&self) -> &S { &self.store }

  pub fn config(&self) -> &TrackerConfig { &self.config }

  pub fn clock(&self) -> &dyn Clock { self.clock.as_ref() }
}
