//! The `RiskStore` trait and supporting write/query types.
//!
//! The trait is implemented by storage backends (e.g.
//! `riskwatch-store-sqlite`). The tracker depends on this abstraction, not on
//! any concrete backend.

use std::future::Future;

use chrono::{DateTime, NaiveDate, Utc};

use crate::risk::{
  FollowupEvent, NewRisk, Risk, RiskId, RiskStatus, TimelineStatus,
};

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for [`RiskStore::list_risks`].
#[derive(Debug, Clone, Default)]
pub struct RiskFilter {
  /// Only return risks in one of these statuses (empty = any).
  pub statuses:         Vec<RiskStatus>,
  /// Never return risks in these statuses.
  pub exclude_statuses: Vec<RiskStatus>,
  /// Load each risk's follow-up history as well.
  pub with_history:     bool,
}

impl RiskFilter {
  /// Every risk that has not been closed.
  pub fn not_closed() -> Self {
    Self {
      exclude_statuses: vec![RiskStatus::Closed],
      ..Self::default()
    }
  }

  /// Every risk still under remediation (neither completed nor closed).
  pub fn open() -> Self {
    Self {
      exclude_statuses: vec![RiskStatus::Completed, RiskStatus::Closed],
      ..Self::default()
    }
  }

  pub fn status(status: RiskStatus) -> Self {
    Self {
      statuses: vec![status],
      ..Self::default()
    }
  }

  pub fn matches(&self, status: RiskStatus) -> bool {
    (self.statuses.is_empty() || self.statuses.contains(&status))
      && !self.exclude_statuses.contains(&status)
  }
}

// ─── Write type ──────────────────────────────────────────────────────────────

/// The scalar fields a follow-up submission writes. Every field holds its
/// final value; the store writes them verbatim, increments
/// `followup_count`, and bumps `version`.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskUpdate {
  pub status:                    RiskStatus,
  pub completion_percentage:     f64,
  pub last_followup_date:        NaiveDate,
  pub next_followup_date:        Option<NaiveDate>,
  pub current_control_rating:    Option<f64>,
  pub current_residual_risk:     Option<f64>,
  pub risk_reduction_percentage: Option<f64>,
  pub timeline_status:           Option<TimelineStatus>,
  pub revised_completion_date:   Option<NaiveDate>,
  pub action_owner:              Option<String>,
  pub updated_at:                DateTime<Utc>,
}

/// Result of [`RiskStore::update_risk`].
#[derive(Debug, Clone)]
pub enum UpdateOutcome {
  /// The update and history append were committed together.
  Applied(Risk),
  NotFound,
  /// The record's version no longer matched; nothing was written.
  Conflict { current_version: u64 },
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a risk register backend.
///
/// Follow-up history is append-only. All methods return `Send` futures so
/// the trait can be used in multi-threaded async runtimes.
pub trait RiskStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Persist a new risk record created at `now`. Returns `None`, writing
  /// nothing, if the id is already taken.
  fn create_risk(
    &self,
    input: NewRisk,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<Risk>, Self::Error>> + Send + '_;

  /// Retrieve a risk with its full history. Returns `None` if not found.
  fn get_risk<'a>(
    &'a self,
    risk_id: &'a RiskId,
  ) -> impl Future<Output = Result<Option<Risk>, Self::Error>> + Send + 'a;

  /// List risks matching `filter`, oldest first.
  fn list_risks<'a>(
    &'a self,
    filter: &'a RiskFilter,
  ) -> impl Future<Output = Result<Vec<Risk>, Self::Error>> + Send + 'a;

  /// Atomically write `update` and append `event`, provided the stored
  /// version still equals `expected_version`. Either both happen or
  /// neither does.
  fn update_risk<'a>(
    &'a self,
    risk_id: &'a RiskId,
    expected_version: u64,
    update: RiskUpdate,
    event: FollowupEvent,
  ) -> impl Future<Output = Result<UpdateOutcome, Self::Error>> + Send + 'a;
}
