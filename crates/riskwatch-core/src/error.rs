//! Error types for `riskwatch-core`.

use thiserror::Error;

use crate::risk::RiskId;

#[derive(Debug, Error)]
pub enum Error {
  /// A stored record violates a range or lifecycle invariant.
  #[error("risk {risk_id} is invalid: {reason}")]
  InvalidRecord { risk_id: RiskId, reason: String },

  #[error("invalid input: {0}")]
  InvalidInput(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
