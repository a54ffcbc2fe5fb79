//! The risk record and its follow-up history.
//!
//! A risk record is created once when a risk is identified and is afterwards
//! mutated only by follow-up submissions. Its history is append-only: each
//! check-in produces one immutable [`FollowupEvent`].

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  answers::Answers,
  assessment::{self, RATING_MAX, RATING_MIN},
};

// ─── Identity ────────────────────────────────────────────────────────────────

/// Unique, immutable identifier of a risk (e.g. `RSK-008`).
#[derive(
  Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RiskId(String);

impl RiskId {
  pub fn new(id: impl Into<String>) -> Self { Self(id.into()) }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for RiskId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for RiskId {
  fn from(s: &str) -> Self { Self(s.to_owned()) }
}

impl From<String> for RiskId {
  fn from(s: String) -> Self { Self(s) }
}

// ─── Enumerations ────────────────────────────────────────────────────────────

/// Where a risk sits in its remediation lifecycle.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::AsRefStr,
)]
pub enum RiskStatus {
  Open,
  #[serde(rename = "In Progress")]
  #[strum(serialize = "In Progress")]
  InProgress,
  Blocked,
  Completed,
  Closed,
}

impl RiskStatus {
  /// `Completed` and `Closed` risks receive no further check-ins.
  pub fn is_finished(self) -> bool {
    matches!(self, Self::Completed | Self::Closed)
  }
}

/// Whether remediation is running against its planned completion date.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::AsRefStr,
)]
pub enum TimelineStatus {
  #[serde(rename = "On Track")]
  #[strum(serialize = "On Track")]
  OnTrack,
  Delayed,
  #[serde(rename = "Ahead of Schedule")]
  #[strum(serialize = "Ahead of Schedule")]
  AheadOfSchedule,
}

/// The treatment category chosen for a risk.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::AsRefStr,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum TreatmentDecision {
  Treat,
  Accept,
  Transfer,
  Terminate,
}

// ─── Follow-up events ────────────────────────────────────────────────────────

/// Snapshot derived from a check-in at the moment it was appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowupSummary {
  /// Status the risk was moved to by this check-in.
  pub status:                RiskStatus,
  pub completion_percentage: f64,
  pub blocker_count:         u32,
  /// Control rating used for recalculation, fresh or fallback.
  pub control_effectiveness: Option<f64>,
  /// `true` when the estimator could not be used for this check-in.
  #[serde(default)]
  pub estimate_degraded:     bool,
}

/// One immutable check-in. `seq` starts at 1 and equals the record's
/// `followup_count` immediately after the event was appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowupEvent {
  pub seq:           u32,
  pub recorded_at:   DateTime<Utc>,
  pub decision_type: Option<TreatmentDecision>,
  pub answers:       Answers,
  pub summary:       FollowupSummary,
}

// ─── Risk record ─────────────────────────────────────────────────────────────

/// One identified risk tracked through remediation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Risk {
  pub risk_id:                   RiskId,
  pub asset_name:                String,
  pub threat_name:               String,
  pub treatment_decision:        Option<TreatmentDecision>,
  pub status:                    RiskStatus,
  pub created_at:                DateTime<Utc>,
  pub last_updated:              DateTime<Utc>,
  /// Optimistic-concurrency stamp; bumped by every successful write.
  pub version:                   u64,
  pub last_followup_date:        Option<NaiveDate>,
  pub next_followup_date:        Option<NaiveDate>,
  pub followup_count:            u32,
  pub completion_percentage:     f64,
  pub inherent_risk_rating:      f64,
  /// Baseline control rating from the initial assessment.
  pub control_rating:            f64,
  /// Baseline residual risk from the initial assessment.
  pub residual_risk_rating:      f64,
  pub current_control_rating:    Option<f64>,
  pub current_residual_risk:     Option<f64>,
  pub risk_reduction_percentage: Option<f64>,
  pub timeline_status:           Option<TimelineStatus>,
  pub target_completion_date:    Option<NaiveDate>,
  pub revised_completion_date:   Option<NaiveDate>,
  pub action_owner:              Option<String>,
  pub followup_history:          Vec<FollowupEvent>,
}

impl Risk {
  /// Whole days between creation and `now`, by calendar date.
  pub fn days_old(&self, now: DateTime<Utc>) -> i64 {
    (now.date_naive() - self.created_at.date_naive()).num_days()
  }

  /// Whole days since the last check-in, if there has been one.
  pub fn days_since_last_followup(&self, now: DateTime<Utc>) -> Option<i64> {
    self
      .last_followup_date
      .map(|d| (now.date_naive() - d).num_days())
  }

  /// Whether any check-in has ever been recorded for this risk.
  pub fn has_followups(&self) -> bool {
    self.followup_count > 0 || self.last_followup_date.is_some()
  }

  /// The residual risk most recently computed, or the baseline.
  pub fn latest_residual_risk(&self) -> f64 {
    self
      .current_residual_risk
      .unwrap_or(self.residual_risk_rating)
  }

  /// The control rating most recently estimated, or the baseline.
  pub fn latest_control_rating(&self) -> f64 {
    self
      .current_control_rating
      .unwrap_or(self.control_rating)
  }

  /// Check that every numeric field lies in its documented range.
  pub fn validate(&self) -> Result<()> {
    let invalid = |reason: String| Error::InvalidRecord {
      risk_id: self.risk_id.clone(),
      reason,
    };

    let ratings = [
      ("inherent_risk_rating", Some(self.inherent_risk_rating)),
      ("control_rating", Some(self.control_rating)),
      ("residual_risk_rating", Some(self.residual_risk_rating)),
      ("current_control_rating", self.current_control_rating),
      ("current_residual_risk", self.current_residual_risk),
    ];
    for (name, value) in ratings {
      if let Some(v) = value
        && !(RATING_MIN..=RATING_MAX).contains(&v)
      {
        return Err(invalid(format!("{name} {v} outside [0, 5]")));
      }
    }

    if !(0.0..=100.0).contains(&self.completion_percentage) {
      return Err(invalid(format!(
        "completion_percentage {} outside [0, 100]",
        self.completion_percentage
      )));
    }

    if self.status.is_finished() && self.next_followup_date.is_some() {
      return Err(invalid(format!(
        "status {} has a scheduled follow-up",
        self.status
      )));
    }

    Ok(())
  }
}

// ─── NewRisk ─────────────────────────────────────────────────────────────────

/// Input to [`crate::store::RiskStore::create_risk`].
///
/// Timestamps, status, and follow-up bookkeeping are set by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRisk {
  pub risk_id:                RiskId,
  #[serde(default)]
  pub asset_name:             String,
  #[serde(default)]
  pub threat_name:            String,
  #[serde(default)]
  pub treatment_decision:     Option<TreatmentDecision>,
  pub inherent_risk_rating:   f64,
  pub control_rating:         f64,
  /// Assessed residual risk; derived from the formula when omitted.
  #[serde(default)]
  pub residual_risk_rating:   Option<f64>,
  #[serde(default)]
  pub target_completion_date: Option<NaiveDate>,
}

impl NewRisk {
  /// Convenience constructor with all optional fields left empty.
  pub fn new(
    risk_id: impl Into<RiskId>,
    inherent_risk_rating: f64,
    control_rating: f64,
  ) -> Self {
    Self {
      risk_id: risk_id.into(),
      asset_name: String::new(),
      threat_name: String::new(),
      treatment_decision: None,
      inherent_risk_rating,
      control_rating,
      residual_risk_rating: None,
      target_completion_date: None,
    }
  }

  /// The baseline residual risk this record will start with.
  pub fn baseline_residual(&self) -> f64 {
    self.residual_risk_rating.unwrap_or_else(|| {
      assessment::residual_risk(self.inherent_risk_rating, self.control_rating)
    })
  }

  pub fn validate(&self) -> Result<()> {
    if self.risk_id.as_str().trim().is_empty() {
      return Err(Error::InvalidInput("risk_id must not be empty".into()));
    }
    let ratings = [
      ("inherent_risk_rating", self.inherent_risk_rating),
      ("control_rating", self.control_rating),
      ("residual_risk_rating", self.baseline_residual()),
    ];
    for (name, v) in ratings {
      if !(RATING_MIN..=RATING_MAX).contains(&v) {
        return Err(Error::InvalidInput(format!("{name} {v} outside [0, 5]")));
      }
    }
    Ok(())
  }

  /// Build the initial record for this input, created at `now`.
  pub fn into_risk(self, now: DateTime<Utc>) -> Risk {
    let residual_risk_rating = self.baseline_residual();
    Risk {
      risk_id: self.risk_id,
      asset_name: self.asset_name,
      threat_name: self.threat_name,
      treatment_decision: self.treatment_decision,
      status: RiskStatus::Open,
      created_at: now,
      last_updated: now,
      version: 0,
      last_followup_date: None,
      next_followup_date: None,
      followup_count: 0,
      completion_percentage: 0.0,
      inherent_risk_rating: self.inherent_risk_rating,
      control_rating: self.control_rating,
      residual_risk_rating,
      current_control_rating: None,
      current_residual_risk: None,
      risk_reduction_percentage: None,
      timeline_status: None,
      target_completion_date: self.target_completion_date,
      revised_completion_date: None,
      action_owner: None,
      followup_history: Vec::new(),
    }
  }
}
