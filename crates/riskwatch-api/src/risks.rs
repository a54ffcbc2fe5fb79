//! Handlers for `/risks` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/risks` | Optional `?status=Open\|In Progress\|...`, `?history=true` |
//! | `POST` | `/risks` | Body: [`NewRisk`]; 201 + stored risk, 409 if the id exists |
//! | `GET`  | `/risks/{id}` | Full record with history; 404 if not found |
//! | `GET`  | `/risks/{id}/health` | Health report |
//! | `GET`  | `/risks/{id}/recommendations` | List of recommendation strings |
//! | `POST` | `/risks/{id}/followups` | Body: [`SubmitBody`]; 201 + submission report |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use riskwatch_core::{
  answers::Answers,
  estimate::ControlEstimator,
  health::HealthReport,
  risk::{NewRisk, Risk, RiskId, RiskStatus, TreatmentDecision},
  store::{RiskFilter, RiskStore},
};
use riskwatch_tracker::{SubmissionReport, Tracker};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::ApiError;

// ─── List ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub status:  Option<RiskStatus>,
  /// Include each risk's follow-up history. Default `false`.
  #[serde(default)]
  pub history: bool,
}

/// `GET /risks[?status=<status>][&history=true]`
pub async fn list<S, E>(
  State(tracker): State<Arc<Tracker<S, E>>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Risk>>, ApiError>
where
  S: RiskStore,
  E: ControlEstimator,
{
  let mut filter = match params.status {
    Some(status) => RiskFilter::status(status),
    None => RiskFilter::default(),
  };
  filter.with_history = params.history;
  Ok(Json(tracker.list_risks(&filter).await?))
}

// ─── Create ──────────────────────────────────────────────────────────────────

/// `POST /risks`
pub async fn create<S, E>(
  State(tracker): State<Arc<Tracker<S, E>>>,
  Json(body): Json<NewRisk>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RiskStore,
  E: ControlEstimator,
{
  let risk = tracker.create_risk(body).await?;
  Ok((StatusCode::CREATED, Json(risk)))
}

// ─── Get one ─────────────────────────────────────────────────────────────────

/// `GET /risks/{id}`
pub async fn get_one<S, E>(
  State(tracker): State<Arc<Tracker<S, E>>>,
  Path(id): Path<RiskId>,
) -> Result<Json<Risk>, ApiError>
where
  S: RiskStore,
  E: ControlEstimator,
{
  Ok(Json(tracker.get_risk(&id).await?))
}

/// `GET /risks/{id}/health`
pub async fn health<S, E>(
  State(tracker): State<Arc<Tracker<S, E>>>,
  Path(id): Path<RiskId>,
) -> Result<Json<HealthReport>, ApiError>
where
  S: RiskStore,
  E: ControlEstimator,
{
  Ok(Json(tracker.classify_health(&id).await?))
}

/// `GET /risks/{id}/recommendations`
pub async fn recommendations<S, E>(
  State(tracker): State<Arc<Tracker<S, E>>>,
  Path(id): Path<RiskId>,
) -> Result<Json<Value>, ApiError>
where
  S: RiskStore,
  E: ControlEstimator,
{
  let recommendations = tracker.get_risk_recommendations(&id).await?;
  Ok(Json(json!({
    "risk_id": id,
    "recommendations": recommendations,
  })))
}

// ─── Submit follow-up ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SubmitBody {
  /// Answers keyed by field role, e.g. `{"completion_percentage": 80}`.
  #[serde(default)]
  pub answers:       Answers,
  /// Defaults to the risk's own treatment decision.
  #[serde(default)]
  pub decision_type: Option<TreatmentDecision>,
}

/// `POST /risks/{id}/followups`
pub async fn submit_followup<S, E>(
  State(tracker): State<Arc<Tracker<S, E>>>,
  Path(id): Path<RiskId>,
  Json(body): Json<SubmitBody>,
) -> Result<(StatusCode, Json<SubmissionReport>), ApiError>
where
  S: RiskStore,
  E: ControlEstimator,
{
  let report = tracker
    .submit_followup(&id, body.answers, body.decision_type)
    .await?;
  Ok((StatusCode::CREATED, Json(report)))
}
