//! Read-only views: due and overdue check-ins, health, alerts, metrics.
//!
//! Nothing here takes the per-record lock. A view computed while a
//! submission is in flight sees the record either before or after it.

use riskwatch_core::{
  estimate::ControlEstimator,
  health::{self, AlertSummary, HealthReport},
  risk::RiskId,
  schedule::{self, DueFollowup, FollowupMetrics, OverdueFollowup},
  store::{RiskFilter, RiskStore},
};

use crate::{Result, Tracker};

impl<S, E> Tracker<S, E>
where
  S: RiskStore,
  E: ControlEstimator,
{
  /// Risks needing a check-in now, oldest first. `threshold_days` defaults
  /// to the configured value.
  pub async fn get_due_followups(
    &self,
    threshold_days: Option<u32>,
  ) -> Result<Vec<DueFollowup>> {
    let threshold = threshold_days.unwrap_or(self.config.due_threshold_days);
    let filter = RiskFilter {
      with_history: true,
      ..RiskFilter::not_closed()
    };
    let risks = self.list_risks(&filter).await?;
    let candidates = risks.len();
    let due = schedule::select_due(risks, threshold, self.clock.now());
    tracing::debug!(candidates, due = due.len(), threshold, "computed due list");
    Ok(due)
  }

  /// Open risks whose scheduled check-in date has passed.
  pub async fn get_overdue_followups(&self) -> Result<Vec<OverdueFollowup>> {
    let filter = RiskFilter {
      with_history: true,
      ..RiskFilter::open()
    };
    let risks = self.list_risks(&filter).await?;
    Ok(schedule::select_overdue(risks, self.clock.now()))
  }

  pub async fn get_followup_metrics(&self) -> Result<FollowupMetrics> {
    let risks = self.list_risks(&RiskFilter::default()).await?;
    Ok(schedule::followup_metrics(
      &risks,
      self.config.due_threshold_days,
      self.clock.now(),
    ))
  }

  pub async fn classify_health(&self, risk_id: &RiskId) -> Result<HealthReport> {
    let risk = self.get_risk(risk_id).await?;
    Ok(health::classify_health(&risk, self.clock.now())?)
  }

  pub async fn get_risk_recommendations(
    &self,
    risk_id: &RiskId,
  ) -> Result<Vec<String>> {
    let risk = self.get_risk(risk_id).await?;
    Ok(health::recommendations(&risk, self.clock.now())?)
  }

  /// Classify every open risk (neither completed nor closed). Records that
  /// cannot be classified are excluded and logged, never fatal.
  pub async fn get_alert_summary(&self) -> Result<AlertSummary> {
    let risks = self.list_risks(&RiskFilter::open()).await?;
    let summary = AlertSummary::build(&risks, self.clock.now());
    for excluded in &summary.excluded {
      tracing::warn!(
        risk_id = %excluded.risk_id,
        reason = %excluded.reason,
        "risk excluded from alert summary"
      );
    }
    Ok(summary)
  }
}
