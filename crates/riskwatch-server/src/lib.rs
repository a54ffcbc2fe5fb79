//! HTTP server wiring for Riskwatch.
//!
//! Holds the deserialised [`ServerConfig`], the configured estimator, and the
//! top-level router. The binary in `main.rs` only parses arguments, sets up
//! tracing, and calls into this crate.

pub mod estimator;

use std::{path::PathBuf, sync::Arc, time::Duration};

use axum::Router;
use riskwatch_core::{
  estimate::ControlEstimator, schedule::DEFAULT_THRESHOLD_DAYS, store::RiskStore,
};
use riskwatch_tracker::{Tracker, TrackerConfig};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

pub use estimator::{ConfiguredEstimator, EstimatorError, HttpEstimator};

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `RISKWATCH_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                   String,
  #[serde(default = "default_port")]
  pub port:                   u16,
  #[serde(default = "default_store_path")]
  pub store_path:             PathBuf,
  #[serde(default = "default_threshold")]
  pub due_threshold_days:     u32,
  /// Unset: every check-in is recorded without a fresh estimate.
  #[serde(default)]
  pub estimator_url:          Option<String>,
  #[serde(default = "default_estimator_timeout")]
  pub estimator_timeout_secs: u64,
}

fn default_host() -> String { "127.0.0.1".to_string() }
fn default_port() -> u16 { 8080 }
fn default_store_path() -> PathBuf { PathBuf::from("riskwatch.db") }
fn default_threshold() -> u32 { DEFAULT_THRESHOLD_DAYS }
fn default_estimator_timeout() -> u64 { 30 }

impl ServerConfig {
  pub fn tracker_config(&self) -> TrackerConfig {
    TrackerConfig {
      due_threshold_days: self.due_threshold_days,
      estimator_timeout:  Duration::from_secs(self.estimator_timeout_secs),
    }
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// The full application: the JSON API under `/api`, with request tracing.
pub fn app<S, E>(tracker: Arc<Tracker<S, E>>) -> Router
where
  S: RiskStore + 'static,
  E: ControlEstimator + 'static,
{
  Router::new()
    .nest("/api", riskwatch_api::api_router(tracker))
    .layer(TraceLayer::new_for_http())
}
