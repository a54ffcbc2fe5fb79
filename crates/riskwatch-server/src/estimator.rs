//! Control-effectiveness estimators the server can be configured with.
//!
//! [`HttpEstimator`] posts the risk and the submitted evidence to an external
//! service and expects `{"control_rating": <0..5>}` back. When no URL is
//! configured the server runs with [`Unavailable`] and every check-in is
//! recorded in degraded mode.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use riskwatch_core::{
  answers::Answers,
  estimate::{ControlEstimator, Unavailable, UnavailableError},
  risk::{Risk, RiskId},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EstimatorError {
  #[error("estimator request failed: {0}")]
  Http(#[from] reqwest::Error),

  #[error("estimator answered {0}")]
  Status(StatusCode),

  #[error(transparent)]
  Unavailable(#[from] UnavailableError),
}

/// What the estimator service receives.
#[derive(Debug, Serialize)]
struct EstimateRequest<'a> {
  risk_id:                &'a RiskId,
  asset_name:             &'a str,
  threat_name:            &'a str,
  inherent_risk_rating:   f64,
  control_rating:         f64,
  current_control_rating: Option<f64>,
  completion_percentage:  f64,
  evidence:               &'a Answers,
}

#[derive(Debug, Deserialize)]
struct EstimateResponse {
  control_rating: f64,
}

/// Estimator backed by an HTTP endpoint.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Debug, Clone)]
pub struct HttpEstimator {
  client: Client,
  url:    String,
}

impl HttpEstimator {
  /// The client-level timeout is a backstop; the tracker applies its own
  /// bound around every call.
  pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, EstimatorError> {
    let client = Client::builder().timeout(timeout).build()?;
    Ok(Self {
      client,
      url: url.into(),
    })
  }
}

impl ControlEstimator for HttpEstimator {
  type Error = EstimatorError;

  async fn estimate(&self, risk: &Risk, evidence: &Answers) -> Result<f64, EstimatorError> {
    let body = EstimateRequest {
      risk_id:                &risk.risk_id,
      asset_name:             &risk.asset_name,
      threat_name:            &risk.threat_name,
      inherent_risk_rating:   risk.inherent_risk_rating,
      control_rating:         risk.control_rating,
      current_control_rating: risk.current_control_rating,
      completion_percentage:  risk.completion_percentage,
      evidence,
    };
    let resp = self.client.post(&self.url).json(&body).send().await?;
    if !resp.status().is_success() {
      return Err(EstimatorError::Status(resp.status()));
    }
    let parsed: EstimateResponse = resp.json().await?;
    Ok(parsed.control_rating)
  }
}

/// The estimator selected by configuration.
#[derive(Debug, Clone)]
pub enum ConfiguredEstimator {
  Http(HttpEstimator),
  Unavailable(Unavailable),
}

impl ConfiguredEstimator {
  pub fn from_url(url: Option<&str>, timeout: Duration) -> Result<Self, EstimatorError> {
    match url.map(str::trim).filter(|u| !u.is_empty()) {
      Some(url) => Ok(Self::Http(HttpEstimator::new(url, timeout)?)),
      None => Ok(Self::Unavailable(Unavailable)),
    }
  }

  pub fn is_available(&self) -> bool { matches!(self, Self::Http(_)) }
}

impl ControlEstimator for ConfiguredEstimator {
  type Error = EstimatorError;

  async fn estimate(&self, risk: &Risk, evidence: &Answers) -> Result<f64, EstimatorError> {
    match self {
      Self::Http(http) => http.estimate(risk, evidence).await,
      Self::Unavailable(none) => Ok(none.estimate(risk, evidence).await?),
    }
  }
}
