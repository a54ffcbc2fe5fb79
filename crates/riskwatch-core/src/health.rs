//! Health classification of in-flight remediation.
//!
//! Rules are evaluated in a fixed order and the first match wins. A
//! worsening residual-risk trend is checked first so that a regression is
//! never reported as "on track", however good the reported progress looks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  Result,
  assessment::round1,
  risk::{Risk, RiskId, RiskStatus},
};

const STALE_OPEN_DAYS: i64 = 30;
const SLOW_PROGRESS_DAYS: i64 = 60;
const SLOW_PROGRESS_COMPLETION: f64 = 50.0;
const DEADLINE_WARNING_DAYS: i64 = 75;
const DEADLINE_DAYS: i64 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Trend {
  Improving,
  Worsening,
  Same,
  /// No recalculation has happened yet.
  Unknown,
}

impl Trend {
  /// Compare the baseline residual risk to the latest recalculation.
  pub fn of(risk: &Risk) -> Self {
    match risk.current_residual_risk {
      None => Self::Unknown,
      Some(current) if current < risk.residual_risk_rating => Self::Improving,
      Some(current) if current > risk.residual_risk_rating => Self::Worsening,
      Some(_) => Self::Same,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthStatus {
  Critical,
  Warning,
  OnTrack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
  High,
  Medium,
  Low,
}

/// The verdict for one risk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
  pub health_status:  HealthStatus,
  pub severity:       Severity,
  pub problem:        Option<String>,
  pub recommendation: String,
  pub days_old:       i64,
  pub trend:          Trend,
}

/// Classify the health of `risk` as of `now`.
///
/// Fails only when the record itself is malformed (ratings or completion out
/// of range), so that aggregate views can skip it.
pub fn classify_health(risk: &Risk, now: DateTime<Utc>) -> Result<HealthReport> {
  risk.validate()?;

  let days_old = risk.days_old(now);
  let trend = Trend::of(risk);
  let completion = risk.completion_percentage;

  let report = |health_status, severity, problem: Option<String>, recommendation: &str| {
    HealthReport {
      health_status,
      severity,
      problem,
      recommendation: recommendation.to_owned(),
      days_old,
      trend,
    }
  };

  if trend == Trend::Worsening {
    return Ok(report(
      HealthStatus::Critical,
      Severity::High,
      Some(format!(
        "Risk increased after treatment (from {}/5 to {}/5)",
        risk.residual_risk_rating,
        risk.latest_residual_risk()
      )),
      "Immediate review required. Current controls may be ineffective.",
    ));
  }

  if days_old >= STALE_OPEN_DAYS
    && risk.followup_count == 0
    && risk.status == RiskStatus::Open
  {
    return Ok(report(
      HealthStatus::Critical,
      Severity::High,
      Some(format!("No progress for {days_old} days and no check-in recorded")),
      "Contact the action owner immediately and schedule an urgent review.",
    ));
  }

  if days_old >= SLOW_PROGRESS_DAYS && completion < SLOW_PROGRESS_COMPLETION {
    return Ok(report(
      HealthStatus::Warning,
      Severity::Medium,
      Some(format!("Only {completion}% complete after {days_old} days")),
      "Review timeline and resources. Consider escalation.",
    ));
  }

  if days_old >= DEADLINE_WARNING_DAYS && risk.status != RiskStatus::Completed {
    return Ok(report(
      HealthStatus::Warning,
      Severity::Medium,
      Some(format!(
        "Approaching the {DEADLINE_DAYS}-day deadline ({days_old} days old)"
      )),
      "Expedite remaining actions or request a timeline extension.",
    ));
  }

  if trend == Trend::Improving || completion >= SLOW_PROGRESS_COMPLETION {
    return Ok(report(
      HealthStatus::OnTrack,
      Severity::Low,
      None,
      "Continue monitoring. Risk is progressing well.",
    ));
  }

  Ok(report(
    HealthStatus::OnTrack,
    Severity::Low,
    None,
    "No issues detected. Continue as planned.",
  ))
}

/// The classifier's recommendation followed by hints derived from progress.
pub fn recommendations(risk: &Risk, now: DateTime<Utc>) -> Result<Vec<String>> {
  let report = classify_health(risk, now)?;
  let completion = risk.completion_percentage;

  let mut out = vec![report.recommendation];
  if completion == 0.0 && risk.followup_count == 0 {
    out.push("Schedule the first follow-up to assess progress.".to_owned());
  }
  if completion > 0.0 && completion < 100.0 {
    out.push(format!(
      "Track the remaining {}% of implementation.",
      100.0 - completion
    ));
  }
  if risk.followup_count > 0 && completion < SLOW_PROGRESS_COMPLETION {
    out.push("Consider additional resources or a timeline adjustment.".to_owned());
  }
  Ok(out)
}

// ─── Alert summary ───────────────────────────────────────────────────────────

/// One classified risk in the alert summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAlert {
  pub risk_id:     RiskId,
  pub asset_name:  String,
  pub threat_name: String,
  pub status:      RiskStatus,
  #[serde(flatten)]
  pub health:      HealthReport,
}

/// A risk left out of the summary because it could not be classified.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExcludedRisk {
  pub risk_id: RiskId,
  pub reason:  String,
}

/// Counts and percentage breakdown across the three buckets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertStats {
  pub total_risks:    usize,
  pub critical_count: usize,
  pub warning_count:  usize,
  pub on_track_count: usize,
  pub critical_pct:   f64,
  pub warning_pct:    f64,
  pub on_track_pct:   f64,
}

impl AlertStats {
  fn from_counts(critical: usize, warning: usize, on_track: usize) -> Self {
    let total = critical + warning + on_track;
    let pct = |n: usize| {
      if total == 0 {
        0.0
      } else {
        round1(n as f64 / total as f64 * 100.0)
      }
    };
    Self {
      total_risks:    total,
      critical_count: critical,
      warning_count:  warning,
      on_track_count: on_track,
      critical_pct:   pct(critical),
      warning_pct:    pct(warning),
      on_track_pct:   pct(on_track),
    }
  }
}

/// Classifier output for a set of risks, grouped by health status.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlertSummary {
  pub critical: Vec<RiskAlert>,
  pub warning:  Vec<RiskAlert>,
  pub on_track: Vec<RiskAlert>,
  pub stats:    AlertStats,
  pub excluded: Vec<ExcludedRisk>,
}

impl AlertSummary {
  /// Classify every risk; records that fail classification are listed in
  /// `excluded` and left out of the buckets and stats.
  pub fn build<'a>(
    risks: impl IntoIterator<Item = &'a Risk>,
    now: DateTime<Utc>,
  ) -> Self {
    let mut summary = Self::default();
    for risk in risks {
      let health = match classify_health(risk, now) {
        Ok(h) => h,
        Err(e) => {
          summary.excluded.push(ExcludedRisk {
            risk_id: risk.risk_id.clone(),
            reason:  e.to_string(),
          });
          continue;
        }
      };
      let bucket = match health.health_status {
        HealthStatus::Critical => &mut summary.critical,
        HealthStatus::Warning => &mut summary.warning,
        HealthStatus::OnTrack => &mut summary.on_track,
      };
      bucket.push(RiskAlert {
        risk_id: risk.risk_id.clone(),
        asset_name: risk.asset_name.clone(),
        threat_name: risk.threat_name.clone(),
        status: risk.status,
        health,
      });
    }
    summary.stats = AlertStats::from_counts(
      summary.critical.len(),
      summary.warning.len(),
      summary.on_track.len(),
    );
    summary
  }
}
