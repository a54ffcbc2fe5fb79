//! Error types for `riskwatch-tracker`.

use riskwatch_core::risk::RiskId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("risk not found: {0}")]
  NotFound(RiskId),

  #[error("risk {0} already exists")]
  DuplicateRisk(RiskId),

  #[error("risk {0} was modified concurrently; retry the submission")]
  Conflict(RiskId),

  /// Rejected input or a record that fails validation.
  #[error(transparent)]
  Core(#[from] riskwatch_core::Error),

  #[error("store error: {0}")]
  Persistence(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub(crate) fn persistence(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Persistence(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
