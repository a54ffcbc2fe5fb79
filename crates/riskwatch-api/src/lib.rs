//! JSON REST API for Riskwatch.
//!
//! Exposes an axum [`Router`] over a [`Tracker`]. Auth, TLS, and transport
//! concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", riskwatch_api::api_router(tracker.clone()))
//! ```

pub mod error;
pub mod followups;
pub mod risks;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use riskwatch_core::{estimate::ControlEstimator, store::RiskStore};
use riskwatch_tracker::Tracker;

pub use error::ApiError;

/// Build a fully-materialised API router for `tracker`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, E>(tracker: Arc<Tracker<S, E>>) -> Router<()>
where
  S: RiskStore + 'static,
  E: ControlEstimator + 'static,
{
  Router::new()
    // Risks
    .route("/risks", get(risks::list::<S, E>).post(risks::create::<S, E>))
    .route("/risks/{id}", get(risks::get_one::<S, E>))
    .route("/risks/{id}/health", get(risks::health::<S, E>))
    .route(
      "/risks/{id}/recommendations",
      get(risks::recommendations::<S, E>),
    )
    .route("/risks/{id}/followups", post(risks::submit_followup::<S, E>))
    // Monitoring
    .route("/followups/due", get(followups::due::<S, E>))
    .route("/followups/overdue", get(followups::overdue::<S, E>))
    .route("/followups/metrics", get(followups::metrics::<S, E>))
    .route("/alerts", get(followups::alerts::<S, E>))
    .with_state(tracker)
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use chrono::{TimeDelta, TimeZone as _, Utc};
  use riskwatch_core::{clock::FixedClock, estimate::Unavailable};
  use riskwatch_store_sqlite::SqliteStore;
  use riskwatch_tracker::TrackerConfig;
  use serde_json::{Value, json};
  use tower::ServiceExt as _;

  use super::*;

  async fn app() -> (Router, Arc<FixedClock>) {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let clock = Arc::new(FixedClock::new(
      Utc.with_ymd_and_hms(2025, 3, 3, 10, 0, 0).unwrap(),
    ));
    let tracker = Tracker::new(
      Arc::new(store),
      Arc::new(Unavailable),
      clock.clone(),
      TrackerConfig::default(),
    );
    (api_router(Arc::new(tracker)), clock)
  }

  async fn send(
    app:    &Router,
    method: &str,
    uri:    &str,
    body:   Option<Value>,
  ) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
      Some(b) => builder
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(b.to_string()))
        .unwrap(),
      None => builder.body(Body::empty()).unwrap(),
    };
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap();
    let json = if bytes.is_empty() {
      Value::Null
    } else {
      serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
  }

  fn risk_body(id: &str) -> Value {
    json!({
      "risk_id": id,
      "asset_name": "HR laptop fleet",
      "threat_name": "Disk theft",
      "treatment_decision": "TREAT",
      "inherent_risk_rating": 5.0,
      "control_rating": 1.0,
      "residual_risk_rating": 4.0
    })
  }

  #[tokio::test]
  async fn create_then_get_risk() {
    let (app, _) = app().await;
    let (status, created) =
      send(&app, "POST", "/risks", Some(risk_body("RSK-001"))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["status"], "Open");
    assert_eq!(created["followup_count"], 0);

    let (status, fetched) = send(&app, "GET", "/risks/RSK-001", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["asset_name"], "HR laptop fleet");
  }

  #[tokio::test]
  async fn duplicate_risk_is_a_conflict() {
    let (app, _) = app().await;
    send(&app, "POST", "/risks", Some(risk_body("RSK-001"))).await;
    let (status, body) =
      send(&app, "POST", "/risks", Some(risk_body("RSK-001"))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
  }

  #[tokio::test]
  async fn out_of_range_rating_is_a_bad_request() {
    let (app, _) = app().await;
    let mut body = risk_body("RSK-001");
    body["inherent_risk_rating"] = json!(8.0);
    let (status, body) = send(&app, "POST", "/risks", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("inherent_risk_rating"));
  }

  #[tokio::test]
  async fn unknown_risk_returns_404_json() {
    let (app, _) = app().await;
    for uri in ["/risks/RSK-404", "/risks/RSK-404/health"] {
      let (status, body) = send(&app, "GET", uri, None).await;
      assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
      assert_eq!(body["success"], false);
    }
    let (status, _) = send(
      &app,
      "POST",
      "/risks/RSK-404/followups",
      Some(json!({ "answers": { "completion_percentage": 10 } })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn followup_without_estimator_is_degraded_but_succeeds() {
    let (app, _) = app().await;
    send(&app, "POST", "/risks", Some(risk_body("RSK-001"))).await;

    let (status, report) = send(
      &app,
      "POST",
      "/risks/RSK-001/followups",
      Some(json!({
        "answers": {
          "completion_percentage": "80%",
          "action_owner": "M. Okafor"
        }
      })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(report["success"], true);
    assert_eq!(report["status"], "In Progress");
    assert_eq!(report["next_followup_date"], "2025-03-10");
    assert_eq!(report["followup_count"], 1);
    assert_eq!(report["degraded"], true);
    assert_eq!(report["degradation"]["kind"], "failed");
    assert_eq!(report["new_control_rating"], 1.0);

    let (_, risk) = send(&app, "GET", "/risks/RSK-001", None).await;
    assert_eq!(risk["followup_history"].as_array().unwrap().len(), 1);
    assert_eq!(risk["action_owner"], "M. Okafor");
  }

  #[tokio::test]
  async fn list_filters_by_status() {
    let (app, _) = app().await;
    send(&app, "POST", "/risks", Some(risk_body("RSK-001"))).await;
    send(&app, "POST", "/risks", Some(risk_body("RSK-002"))).await;
    send(
      &app,
      "POST",
      "/risks/RSK-002/followups",
      Some(json!({ "answers": { "completion_percentage": 30 } })),
    )
    .await;

    let (_, all) = send(&app, "GET", "/risks", None).await;
    assert_eq!(all.as_array().unwrap().len(), 2);

    let (status, in_progress) =
      send(&app, "GET", "/risks?status=In%20Progress", None).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = in_progress
      .as_array()
      .unwrap()
      .iter()
      .map(|r| r["risk_id"].as_str().unwrap())
      .collect();
    assert_eq!(ids, ["RSK-002"]);
  }

  #[tokio::test]
  async fn monitoring_views_follow_the_clock() {
    let (app, clock) = app().await;
    send(&app, "POST", "/risks", Some(risk_body("RSK-001"))).await;

    let (_, due) = send(&app, "GET", "/followups/due", None).await;
    assert!(due.as_array().unwrap().is_empty());

    clock.advance(TimeDelta::days(30));

    let (_, due) = send(&app, "GET", "/followups/due?threshold_days=7", None).await;
    assert_eq!(due.as_array().unwrap().len(), 1);
    assert_eq!(due[0]["days_since_creation"], 30);
    assert_eq!(due[0]["reason"], "first_check_in");

    let (_, alerts) = send(&app, "GET", "/alerts", None).await;
    assert_eq!(alerts["stats"]["critical_count"], 1);
    assert_eq!(alerts["critical"][0]["health_status"], "CRITICAL");
    assert_eq!(alerts["critical"][0]["risk_id"], "RSK-001");

    let (_, metrics) = send(&app, "GET", "/followups/metrics", None).await;
    assert_eq!(metrics["never_followed_up"], 1);

    let (status, overdue) = send(&app, "GET", "/followups/overdue", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(overdue.as_array().unwrap().is_empty());

    let (_, recs) = send(&app, "GET", "/risks/RSK-001/recommendations", None).await;
    assert!(!recs["recommendations"].as_array().unwrap().is_empty());
  }
}
