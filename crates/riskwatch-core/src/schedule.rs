//! Due-date selection: which risks need a check-in now.

use chrono::{DateTime, Days, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  assessment::round1,
  risk::{Risk, RiskStatus, TimelineStatus},
};

/// Default number of days after creation before the first check-in is due.
pub const DEFAULT_THRESHOLD_DAYS: u32 = 5;

/// Why a risk appears in the due list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DueReason {
  /// Never checked in, and the threshold since creation has passed.
  FirstCheckIn,
  /// The scheduled next check-in date has arrived.
  Recurring,
}

/// A risk due for a check-in, with derived age fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DueFollowup {
  pub risk:                     Risk,
  pub reason:                   DueReason,
  pub days_since_creation:      i64,
  pub days_since_last_followup: Option<i64>,
}

/// Decide whether `risk` is due at `now`.
pub fn due_reason(
  risk: &Risk,
  threshold_days: u32,
  now: DateTime<Utc>,
) -> Option<DueReason> {
  if risk.status == RiskStatus::Closed {
    return None;
  }
  let today = now.date_naive();

  if !risk.has_followups() {
    let first_due = risk
      .created_at
      .date_naive()
      .checked_add_days(Days::new(u64::from(threshold_days)));
    if first_due.is_some_and(|d| d <= today) {
      return Some(DueReason::FirstCheckIn);
    }
  }

  match risk.next_followup_date {
    Some(next) if next <= today => Some(DueReason::Recurring),
    _ => None,
  }
}

/// Select the risks due at `now`, oldest first (ties broken by id).
pub fn select_due(
  risks: impl IntoIterator<Item = Risk>,
  threshold_days: u32,
  now: DateTime<Utc>,
) -> Vec<DueFollowup> {
  let mut due: Vec<DueFollowup> = risks
    .into_iter()
    .filter_map(|risk| {
      let reason = due_reason(&risk, threshold_days, now)?;
      Some(DueFollowup {
        reason,
        days_since_creation: risk.days_old(now),
        days_since_last_followup: risk.days_since_last_followup(now),
        risk,
      })
    })
    .collect();

  due.sort_by(|a, b| {
    a.risk
      .created_at
      .cmp(&b.risk.created_at)
      .then_with(|| a.risk.risk_id.cmp(&b.risk.risk_id))
  });
  due
}

// ─── Overdue ─────────────────────────────────────────────────────────────────

/// A risk whose scheduled check-in date has already passed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverdueFollowup {
  pub risk:         Risk,
  pub days_overdue: i64,
}

/// Open risks whose `next_followup_date` is strictly before today, most
/// overdue first.
pub fn select_overdue(
  risks: impl IntoIterator<Item = Risk>,
  now: DateTime<Utc>,
) -> Vec<OverdueFollowup> {
  let today = now.date_naive();
  let mut overdue: Vec<OverdueFollowup> = risks
    .into_iter()
    .filter(|r| !r.status.is_finished())
    .filter_map(|risk| {
      let next = risk.next_followup_date?;
      (next < today).then(|| OverdueFollowup {
        days_overdue: (today - next).num_days(),
        risk,
      })
    })
    .collect();

  overdue.sort_by(|a, b| {
    b.days_overdue
      .cmp(&a.days_overdue)
      .then_with(|| a.risk.risk_id.cmp(&b.risk.risk_id))
  });
  overdue
}

// ─── Metrics ─────────────────────────────────────────────────────────────────

/// Follow-up statistics for the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FollowupMetrics {
  pub total_with_followups:       usize,
  pub overdue_followups:          usize,
  pub never_followed_up:          usize,
  pub avg_followups_per_risk:     f64,
  pub completed_after_followup:   usize,
  pub high_followup_low_progress: usize,
  pub delayed_risks:              usize,
}

pub fn followup_metrics(
  risks: &[Risk],
  threshold_days: u32,
  now: DateTime<Utc>,
) -> FollowupMetrics {
  let today = now.date_naive();
  let open = |r: &&Risk| !r.status.is_finished();

  let total_followups: u64 =
    risks.iter().map(|r| u64::from(r.followup_count)).sum();
  let avg = if risks.is_empty() {
    0.0
  } else {
    round1(total_followups as f64 / risks.len() as f64)
  };

  FollowupMetrics {
    total_with_followups:       risks
      .iter()
      .filter(|r| r.followup_count > 0)
      .count(),
    overdue_followups:          risks
      .iter()
      .filter(open)
      .filter(|r| r.next_followup_date.is_some_and(|d| d < today))
      .count(),
    never_followed_up:          risks
      .iter()
      .filter(open)
      .filter(|r| r.followup_count == 0)
      .filter(|r| r.days_old(now) >= i64::from(threshold_days))
      .count(),
    avg_followups_per_risk:     avg,
    completed_after_followup:   risks
      .iter()
      .filter(|r| r.followup_count > 0 && r.status.is_finished())
      .count(),
    high_followup_low_progress: risks
      .iter()
      .filter(open)
      .filter(|r| r.followup_count >= 3 && r.completion_percentage < 25.0)
      .count(),
    delayed_risks:              risks
      .iter()
      .filter(open)
      .filter(|r| r.timeline_status == Some(TimelineStatus::Delayed))
      .count(),
  }
}

#[cfg(test)]
mod tests {
  use chrono::{Duration, TimeZone as _};

  use super::*;
  use crate::risk::NewRisk;

  fn now() -> DateTime<Utc> { Utc.with_ymd_and_hms(2025, 3, 20, 12, 0, 0).unwrap() }

  fn risk_created(id: &str, days_ago: i64) -> Risk {
    NewRisk::new(id, 4.0, 2.0).into_risk(now() - Duration::days(days_ago))
  }

  #[test]
  fn first_checkin_due_after_threshold() {
    let due = select_due([risk_created("RSK-001", 10)], 5, now());
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].reason, DueReason::FirstCheckIn);
    assert_eq!(due[0].days_since_creation, 10);
    assert_eq!(due[0].days_since_last_followup, None);
  }

  #[test]
  fn first_checkin_due_exactly_at_threshold() {
    assert!(due_reason(&risk_created("RSK-001", 5), 5, now()).is_some());
    assert!(due_reason(&risk_created("RSK-001", 4), 5, now()).is_none());
  }

  #[test]
  fn recurring_checkin_due_on_or_after_next_date() {
    let mut risk = risk_created("RSK-002", 30);
    risk.followup_count = 1;
    risk.last_followup_date = Some(now().date_naive() - Duration::days(3));
    risk.next_followup_date = Some(now().date_naive());
    assert_eq!(due_reason(&risk, 5, now()), Some(DueReason::Recurring));

    risk.next_followup_date = Some(now().date_naive() + Duration::days(1));
    assert_eq!(due_reason(&risk, 5, now()), None);
  }

  #[test]
  fn closed_risks_are_never_due() {
    let mut risk = risk_created("RSK-003", 40);
    risk.status = RiskStatus::Closed;
    assert_eq!(due_reason(&risk, 5, now()), None);
  }

  #[test]
  fn due_list_is_oldest_first_with_id_tiebreak() {
    let a = risk_created("RSK-010", 8);
    let b = risk_created("RSK-002", 20);
    let c = risk_created("RSK-001", 8);
    let due = select_due([a, b, c], 5, now());
    let ids: Vec<&str> = due.iter().map(|d| d.risk.risk_id.as_str()).collect();
    assert_eq!(ids, ["RSK-002", "RSK-001", "RSK-010"]);
  }

  #[test]
  fn overdue_sorted_by_days_overdue() {
    let today = now().date_naive();
    let mut a = risk_created("RSK-001", 30);
    a.next_followup_date = Some(today - Duration::days(2));
    let mut b = risk_created("RSK-002", 30);
    b.next_followup_date = Some(today - Duration::days(9));
    let mut c = risk_created("RSK-003", 30);
    c.next_followup_date = Some(today);

    let overdue = select_overdue([a, b, c], now());
    assert_eq!(overdue.len(), 2);
    assert_eq!(overdue[0].risk.risk_id.as_str(), "RSK-002");
    assert_eq!(overdue[0].days_overdue, 9);
    assert_eq!(overdue[1].days_overdue, 2);
  }

  #[test]
  fn metrics_count_each_category() {
    let today = now().date_naive();

    let never = risk_created("RSK-001", 10);

    let mut stalled = risk_created("RSK-002", 40);
    stalled.followup_count = 3;
    stalled.completion_percentage = 10.0;
    stalled.status = RiskStatus::InProgress;
    stalled.next_followup_date = Some(today - Duration::days(1));
    stalled.timeline_status = Some(TimelineStatus::Delayed);

    let mut done = risk_created("RSK-003", 50);
    done.followup_count = 2;
    done.completion_percentage = 100.0;
    done.status = RiskStatus::Closed;

    let m = followup_metrics(&[never, stalled, done], 5, now());
    assert_eq!(m.total_with_followups, 2);
    assert_eq!(m.overdue_followups, 1);
    assert_eq!(m.never_followed_up, 1);
    assert_eq!(m.avg_followups_per_risk, 1.7);
    assert_eq!(m.completed_after_followup, 1);
    assert_eq!(m.high_followup_low_progress, 1);
    assert_eq!(m.delayed_risks, 1);
  }

  #[test]
  fn metrics_for_empty_register_are_zero() {
    assert_eq!(followup_metrics(&[], 5, now()), FollowupMetrics::default());
  }
}
