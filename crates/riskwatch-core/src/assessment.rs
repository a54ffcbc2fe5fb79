//! Residual-risk arithmetic and check-in rescheduling.
//!
//! These functions do not know how a control rating was produced; they only
//! apply the formulas to whatever rating they are handed.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::risk::{RiskStatus, TimelineStatus};

pub const RATING_MIN: f64 = 0.0;
pub const RATING_MAX: f64 = 5.0;

/// Clamp a rating into `[0, 5]`. NaN collapses to the minimum.
pub fn clamp_rating(value: f64) -> f64 {
  if value.is_nan() {
    return RATING_MIN;
  }
  value.clamp(RATING_MIN, RATING_MAX)
}

/// `clamp(inherent − control, 0, 5)`.
pub fn residual_risk(inherent: f64, control: f64) -> f64 {
  clamp_rating(inherent - control)
}

/// Relative drop from `old_residual` to `new_residual`, in percent.
///
/// Zero when there was no residual risk to reduce. Negative when the risk
/// grew.
pub fn risk_reduction_percentage(old_residual: f64, new_residual: f64) -> f64 {
  if old_residual > 0.0 {
    (old_residual - new_residual) / old_residual * 100.0
  } else {
    0.0
  }
}

// ─── Rescheduling ────────────────────────────────────────────────────────────

/// Progress band a check-in falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressTier {
  /// 100 %: remediation finished.
  Finished,
  /// 75 % and above.
  NearlyDone,
  /// 50 % and above.
  Halfway,
  /// Anything above zero.
  Started,
  /// No progress at all; re-checked urgently.
  NotStarted,
}

impl ProgressTier {
  pub fn from_completion(completion: f64) -> Self {
    if completion >= 100.0 {
      Self::Finished
    } else if completion >= 75.0 {
      Self::NearlyDone
    } else if completion >= 50.0 {
      Self::Halfway
    } else if completion > 0.0 {
      Self::Started
    } else {
      Self::NotStarted
    }
  }

  /// Days until the next check-in; `None` once finished.
  pub fn interval_days(self) -> Option<u64> {
    match self {
      Self::Finished => None,
      Self::NearlyDone => Some(7),
      Self::Halfway | Self::Started => Some(5),
      Self::NotStarted => Some(3),
    }
  }

  pub fn status(self) -> RiskStatus {
    match self {
      Self::Finished => RiskStatus::Closed,
      Self::NearlyDone | Self::Halfway | Self::Started => RiskStatus::InProgress,
      Self::NotStarted => RiskStatus::Open,
    }
  }
}

/// Outcome of rescheduling one check-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reschedule {
  pub tier:               ProgressTier,
  pub status:             RiskStatus,
  pub next_followup_date: Option<NaiveDate>,
}

/// Pick the next check-in date and status from reported progress.
///
/// A reported blocker forces `Blocked` while keeping the tier's date so the
/// risk is still re-checked promptly. A finished risk closes even when a
/// blocker is reported, because a closed risk has no next check-in.
pub fn reschedule(completion: f64, blocked: bool, today: NaiveDate) -> Reschedule {
  let tier = ProgressTier::from_completion(completion);
  let next_followup_date = tier
    .interval_days()
    .and_then(|d| today.checked_add_days(Days::new(d)));
  let status = if blocked && tier != ProgressTier::Finished {
    RiskStatus::Blocked
  } else {
    tier.status()
  };
  Reschedule { tier, status, next_followup_date }
}

/// Compare a reported expected completion date to the planned one.
pub fn timeline_status(expected: NaiveDate, target: NaiveDate) -> TimelineStatus {
  match expected.cmp(&target) {
    std::cmp::Ordering::Greater => TimelineStatus::Delayed,
    std::cmp::Ordering::Less => TimelineStatus::AheadOfSchedule,
    std::cmp::Ordering::Equal => TimelineStatus::OnTrack,
  }
}

/// Round to one decimal place, as dashboards display percentages.
pub fn round1(value: f64) -> f64 { (value * 10.0).round() / 10.0 }

#[cfg(test)]
mod tests {
  use super::*;

  fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
  }

  #[test]
  fn residual_is_clamped() {
    assert_eq!(residual_risk(5.0, 3.0), 2.0);
    assert_eq!(residual_risk(2.0, 4.5), 0.0);
    assert_eq!(residual_risk(5.0, -3.0), 5.0);
    assert_eq!(residual_risk(f64::NAN, 1.0), 0.0);
  }

  #[test]
  fn reduction_matches_worked_example() {
    let new_residual = residual_risk(5.0, 3.0);
    assert_eq!(risk_reduction_percentage(4.0, new_residual), 50.0);
  }

  #[test]
  fn reduction_is_zero_without_prior_residual() {
    assert_eq!(risk_reduction_percentage(0.0, 0.0), 0.0);
    assert_eq!(risk_reduction_percentage(0.0, 3.0), 0.0);
  }

  #[test]
  fn reduction_goes_negative_when_risk_grows() {
    assert_eq!(risk_reduction_percentage(2.0, 3.0), -50.0);
  }

  #[test]
  fn tiers_follow_completion_bands() {
    let today = day(2025, 3, 10);
    let cases = [
      (100.0, None, RiskStatus::Closed),
      (80.0, Some(day(2025, 3, 17)), RiskStatus::InProgress),
      (75.0, Some(day(2025, 3, 17)), RiskStatus::InProgress),
      (50.0, Some(day(2025, 3, 15)), RiskStatus::InProgress),
      (10.0, Some(day(2025, 3, 15)), RiskStatus::InProgress),
      (0.0, Some(day(2025, 3, 13)), RiskStatus::Open),
    ];
    for (completion, next, status) in cases {
      let r = reschedule(completion, false, today);
      assert_eq!(r.next_followup_date, next, "completion {completion}");
      assert_eq!(r.status, status, "completion {completion}");
    }
  }

  #[test]
  fn blocker_overrides_status_but_keeps_date() {
    let today = day(2025, 3, 10);
    let r = reschedule(60.0, true, today);
    assert_eq!(r.status, RiskStatus::Blocked);
    assert_eq!(r.next_followup_date, Some(day(2025, 3, 15)));

    let r = reschedule(0.0, true, today);
    assert_eq!(r.status, RiskStatus::Blocked);
    assert_eq!(r.next_followup_date, Some(day(2025, 3, 13)));
  }

  #[test]
  fn finished_risk_closes_despite_blocker() {
    let r = reschedule(100.0, true, day(2025, 3, 10));
    assert_eq!(r.status, RiskStatus::Closed);
    assert_eq!(r.next_followup_date, None);
  }

  #[test]
  fn timeline_compares_against_target() {
    let target = day(2025, 6, 1);
    assert_eq!(timeline_status(day(2025, 6, 2), target), TimelineStatus::Delayed);
    assert_eq!(
      timeline_status(day(2025, 5, 20), target),
      TimelineStatus::AheadOfSchedule
    );
    assert_eq!(timeline_status(target, target), TimelineStatus::OnTrack);
  }

  #[test]
  fn round1_rounds_half_up() {
    assert_eq!(round1(33.333), 33.3);
    assert_eq!(round1(66.666), 66.7);
  }
}
