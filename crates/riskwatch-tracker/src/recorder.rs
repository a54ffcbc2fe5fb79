//! Risk creation and follow-up recording: the only writes in the system.

use chrono::NaiveDate;
use riskwatch_core::{
  answers::{AnswerSignals, AnswerWarning, Answers, drop_non_finite},
  assessment::{reschedule, residual_risk, risk_reduction_percentage, timeline_status},
  estimate::ControlEstimator,
  risk::{
    FollowupEvent, FollowupSummary, NewRisk, Risk, RiskId, RiskStatus,
    TreatmentDecision,
  },
  store::{RiskFilter, RiskStore, RiskUpdate, UpdateOutcome},
};
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result, Tracker,
  estimate::{Degradation, estimate_with_fallback},
};

/// What a successful [`Tracker::submit_followup`] reports back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionReport {
  pub success:                   bool,
  pub message:                   String,
  pub risk_id:                   RiskId,
  pub followup_count:            u32,
  pub next_followup_date:        Option<NaiveDate>,
  pub status:                    RiskStatus,
  /// The rating used for this check-in: fresh, or the fallback if degraded.
  pub new_control_rating:        f64,
  pub new_residual_risk:         f64,
  pub risk_reduction_percentage: Option<f64>,
  /// `true` when the estimator could not be used and nothing was recomputed.
  pub degraded:                  bool,
  pub degradation:               Option<Degradation>,
  /// Lenient defaults applied while reading the answers.
  pub warnings:                  Vec<AnswerWarning>,
}

impl<S, E> Tracker<S, E>
where
  S: RiskStore,
  E: ControlEstimator,
{
  // ─── Records ─────────────────────────────────────────────────────────────

  /// Register a newly identified risk.
  pub async fn create_risk(&self, input: NewRisk) -> Result<Risk> {
    input.validate()?;
    if self
      .store
      .get_risk(&input.risk_id)
      .await
      .map_err(Error::persistence)?
      .is_some()
    {
      return Err(Error::DuplicateRisk(input.risk_id));
    }

    // The store refuses a taken id itself; a racing create lands here.
    let risk_id = input.risk_id.clone();
    let risk = self
      .store
      .create_risk(input, self.clock.now())
      .await
      .map_err(Error::persistence)?
      .ok_or(Error::DuplicateRisk(risk_id))?;
    tracing::info!(risk_id = %risk.risk_id, "risk created");
    Ok(risk)
  }

  pub async fn get_risk(&self, risk_id: &RiskId) -> Result<Risk> {
    self
      .store
      .get_risk(risk_id)
      .await
      .map_err(Error::persistence)?
      .ok_or_else(|| Error::NotFound(risk_id.clone()))
  }

  pub async fn list_risks(&self, filter: &RiskFilter) -> Result<Vec<Risk>> {
    self
      .store
      .list_risks(filter)
      .await
      .map_err(Error::persistence)
  }

  // ─── Follow-ups ──────────────────────────────────────────────────────────

  /// Record one check-in for `risk_id`.
  ///
  /// The record is either fully updated (scalars, count, and one appended
  /// history event) or left exactly as it was. Malformed answers and an
  /// unusable estimator do not fail the submission; they are reported in
  /// the result.
  pub async fn submit_followup(
    &self,
    risk_id: &RiskId,
    mut answers: Answers,
    decision_type: Option<TreatmentDecision>,
  ) -> Result<SubmissionReport> {
    let mut warnings = drop_non_finite(&mut answers);

    let _guard = self.locks.lock(risk_id).await;

    let risk = self.get_risk(risk_id).await?;
    let now = self.clock.now();
    let today = now.date_naive();

    let signals = AnswerSignals::extract(&answers);
    warnings.extend(signals.warnings.iter().cloned());
    for warning in &warnings {
      tracing::warn!(risk_id = %risk_id, "lenient default applied: {warning}");
    }

    let estimate = estimate_with_fallback(
      self.estimator.as_ref(),
      &risk,
      &answers,
      self.config.estimator_timeout,
      risk.latest_control_rating(),
    )
    .await;

    // A degraded check-in leaves the recalculated fields as they were.
    let (current_control_rating, current_residual_risk, reduction) =
      if estimate.is_degraded() {
        (
          risk.current_control_rating,
          risk.current_residual_risk,
          risk.risk_reduction_percentage,
        )
      } else {
        let new_residual =
          residual_risk(risk.inherent_risk_rating, estimate.control_rating);
        (
          Some(estimate.control_rating),
          Some(new_residual),
          Some(risk_reduction_percentage(
            risk.latest_residual_risk(),
            new_residual,
          )),
        )
      };

    let schedule = reschedule(signals.completion_percentage, signals.blocked, today);

    let revised_completion_date = signals
      .expected_completion_date
      .or(risk.revised_completion_date);
    let timeline = match (signals.expected_completion_date, risk.target_completion_date) {
      (Some(expected), Some(target)) => Some(timeline_status(expected, target)),
      _ => risk.timeline_status,
    };

    let update = RiskUpdate {
      status: schedule.status,
      completion_percentage: signals.completion_percentage,
      last_followup_date: today,
      next_followup_date: schedule.next_followup_date,
      current_control_rating,
      current_residual_risk,
      risk_reduction_percentage: reduction,
      timeline_status: timeline,
      revised_completion_date,
      action_owner: signals.action_owner.clone().or(risk.action_owner.clone()),
      updated_at: now,
    };
    let event = FollowupEvent {
      seq: risk.followup_count.saturating_add(1),
      recorded_at: now,
      decision_type: decision_type.or(risk.treatment_decision),
      answers,
      summary: FollowupSummary {
        status:                schedule.status,
        completion_percentage: signals.completion_percentage,
        blocker_count:         signals.blocker_count,
        control_effectiveness: Some(estimate.control_rating),
        estimate_degraded:     estimate.is_degraded(),
      },
    };

    let updated = match self
      .store
      .update_risk(risk_id, risk.version, update, event)
      .await
      .map_err(Error::persistence)?
    {
      UpdateOutcome::Applied(updated) => updated,
      UpdateOutcome::NotFound => return Err(Error::NotFound(risk_id.clone())),
      UpdateOutcome::Conflict { current_version } => {
        tracing::warn!(
          risk_id = %risk_id,
          expected = risk.version,
          current_version,
          "follow-up rejected: record changed underneath"
        );
        return Err(Error::Conflict(risk_id.clone()));
      }
    };

    tracing::info!(
      risk_id = %risk_id,
      followup_count = updated.followup_count,
      status = %updated.status,
      degraded = estimate.is_degraded(),
      "follow-up recorded"
    );

    let message = match updated.next_followup_date {
      Some(next) => format!(
        "Follow-up #{} recorded. Next check-in on {next}.",
        updated.followup_count
      ),
      None => format!(
        "Follow-up #{} recorded. Risk {}.",
        updated.followup_count,
        updated.status.as_ref().to_lowercase()
      ),
    };

    Ok(SubmissionReport {
      success: true,
      message,
      risk_id: updated.risk_id.clone(),
      followup_count: updated.followup_count,
      next_followup_date: updated.next_followup_date,
      status: updated.status,
      new_control_rating: estimate.control_rating,
      new_residual_risk: updated.latest_residual_risk(),
      risk_reduction_percentage: updated.risk_reduction_percentage,
      degraded: estimate.is_degraded(),
      degradation: estimate.degraded,
      warnings,
    })
  }
}
