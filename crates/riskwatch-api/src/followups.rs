//! Handlers for `/followups` and `/alerts`: the read-only monitoring views.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/followups/due` | Optional `?threshold_days=N` (default from config) |
//! | `GET`  | `/followups/overdue` | Most overdue first |
//! | `GET`  | `/followups/metrics` | Dashboard counters |
//! | `GET`  | `/alerts` | Health buckets, stats, and excluded records |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Query, State},
};
use riskwatch_core::{
  estimate::ControlEstimator,
  health::AlertSummary,
  schedule::{DueFollowup, FollowupMetrics, OverdueFollowup},
  store::RiskStore,
};
use riskwatch_tracker::Tracker;
use serde::Deserialize;

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct DueParams {
  pub threshold_days: Option<u32>,
}

/// `GET /followups/due[?threshold_days=N]`
pub async fn due<S, E>(
  State(tracker): State<Arc<Tracker<S, E>>>,
  Query(params): Query<DueParams>,
) -> Result<Json<Vec<DueFollowup>>, ApiError>
where
  S: RiskStore,
  E: ControlEstimator,
{
  Ok(Json(tracker.get_due_followups(params.threshold_days).await?))
}

/// `GET /followups/overdue`
pub async fn overdue<S, E>(
  State(tracker): State<Arc<Tracker<S, E>>>,
) -> Result<Json<Vec<OverdueFollowup>>, ApiError>
where
  S: RiskStore,
  E: ControlEstimator,
{
  Ok(Json(tracker.get_overdue_followups().await?))
}

/// `GET /followups/metrics`
pub async fn metrics<S, E>(
  State(tracker): State<Arc<Tracker<S, E>>>,
) -> Result<Json<FollowupMetrics>, ApiError>
where
  S: RiskStore,
  E: ControlEstimator,
{
  Ok(Json(tracker.get_followup_metrics().await?))
}

/// `GET /alerts`
pub async fn alerts<S, E>(
  State(tracker): State<Arc<Tracker<S, E>>>,
) -> Result<Json<AlertSummary>, ApiError>
where
  S: RiskStore,
  E: ControlEstimator,
{
  Ok(Json(tracker.get_alert_summary().await?))
}
