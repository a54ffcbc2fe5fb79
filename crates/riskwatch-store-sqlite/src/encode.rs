//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings with microsecond precision so
//! that they sort lexicographically. Calendar dates are `YYYY-MM-DD`.
//! Enumerations use their display strings. Answers and summaries are compact
//! JSON.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use riskwatch_core::risk::{FollowupEvent, Risk, RiskId};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

/// Drop sub-microsecond precision so a value survives a round trip.
pub fn truncate_dt(dt: DateTime<Utc>) -> Result<DateTime<Utc>> {
  decode_dt(&encode_dt(dt))
}

// ─── NaiveDate ───────────────────────────────────────────────────────────────

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── Enumerations ────────────────────────────────────────────────────────────

pub fn decode_enum<T: FromStr>(column: &'static str, s: &str) -> Result<T> {
  T::from_str(s).map_err(|_| Error::Decode {
    column,
    value: s.to_owned(),
  })
}

fn decode_count<T: TryFrom<i64>>(column: &'static str, v: i64) -> Result<T> {
  T::try_from(v).map_err(|_| Error::Decode {
    column,
    value: v.to_string(),
  })
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching the field order of [`RawRisk`].
pub const RISK_COLUMNS: &str = "
  risk_id, asset_name, threat_name, treatment_decision, status,
  created_at, last_updated, version,
  last_followup_date, next_followup_date, followup_count,
  completion_percentage, inherent_risk_rating, control_rating,
  residual_risk_rating, current_control_rating, current_residual_risk,
  risk_reduction_percentage, timeline_status, target_completion_date,
  revised_completion_date, action_owner";

/// Raw values read directly from a `risks` row.
pub struct RawRisk {
  pub risk_id:                   String,
  pub asset_name:                String,
  pub threat_name:               String,
  pub treatment_decision:        Option<String>,
  pub status:                    String,
  pub created_at:                String,
  pub last_updated:              String,
  pub version:                   i64,
  pub last_followup_date:        Option<String>,
  pub next_followup_date:        Option<String>,
  pub followup_count:            i64,
  pub completion_percentage:     f64,
  pub inherent_risk_rating:      f64,
  pub control_rating:            f64,
  pub residual_risk_rating:      f64,
  pub current_control_rating:    Option<f64>,
  pub current_residual_risk:     Option<f64>,
  pub risk_reduction_percentage: Option<f64>,
  pub timeline_status:           Option<String>,
  pub target_completion_date:    Option<String>,
  pub revised_completion_date:   Option<String>,
  pub action_owner:              Option<String>,
}

impl RawRisk {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      risk_id:                   row.get(0)?,
      asset_name:                row.get(1)?,
      threat_name:               row.get(2)?,
      treatment_decision:        row.get(3)?,
      status:                    row.get(4)?,
      created_at:                row.get(5)?,
      last_updated:              row.get(6)?,
      version:                   row.get(7)?,
      last_followup_date:        row.get(8)?,
      next_followup_date:        row.get(9)?,
      followup_count:            row.get(10)?,
      completion_percentage:     row.get(11)?,
      inherent_risk_rating:      row.get(12)?,
      control_rating:            row.get(13)?,
      residual_risk_rating:      row.get(14)?,
      current_control_rating:    row.get(15)?,
      current_residual_risk:     row.get(16)?,
      risk_reduction_percentage: row.get(17)?,
      timeline_status:           row.get(18)?,
      target_completion_date:    row.get(19)?,
      revised_completion_date:   row.get(20)?,
      action_owner:              row.get(21)?,
    })
  }

  pub fn into_risk(self, history: Vec<FollowupEvent>) -> Result<Risk> {
    Ok(Risk {
      risk_id:                   RiskId::new(self.risk_id),
      asset_name:                self.asset_name,
      threat_name:               self.threat_name,
      treatment_decision:        self
        .treatment_decision
        .as_deref()
        .map(|s| decode_enum("treatment_decision", s))
        .transpose()?,
      status:                    decode_enum("status", &self.status)?,
      created_at:                decode_dt(&self.created_at)?,
      last_updated:              decode_dt(&self.last_updated)?,
      version:                   decode_count("version", self.version)?,
      last_followup_date:        self
        .last_followup_date
        .as_deref()
        .map(decode_date)
        .transpose()?,
      next_followup_date:        self
        .next_followup_date
        .as_deref()
        .map(decode_date)
        .transpose()?,
      followup_count:            decode_count("followup_count", self.followup_count)?,
      completion_percentage:     self.completion_percentage,
      inherent_risk_rating:      self.inherent_risk_rating,
      control_rating:            self.control_rating,
      residual_risk_rating:      self.residual_risk_rating,
      current_control_rating:    self.current_control_rating,
      current_residual_risk:     self.current_residual_risk,
      risk_reduction_percentage: self.risk_reduction_percentage,
      timeline_status:           self
        .timeline_status
        .as_deref()
        .map(|s| decode_enum("timeline_status", s))
        .transpose()?,
      target_completion_date:    self
        .target_completion_date
        .as_deref()
        .map(decode_date)
        .transpose()?,
      revised_completion_date:   self
        .revised_completion_date
        .as_deref()
        .map(decode_date)
        .transpose()?,
      action_owner:              self.action_owner,
      followup_history:          history,
    })
  }
}

/// Column list matching the field order of [`RawEvent`].
pub const EVENT_COLUMNS: &str =
  "risk_id, seq, recorded_at, decision_type, answers_json, summary_json";

/// Raw values read directly from a `followup_events` row.
pub struct RawEvent {
  pub risk_id:       String,
  pub seq:           i64,
  pub recorded_at:   String,
  pub decision_type: Option<String>,
  pub answers_json:  String,
  pub summary_json:  String,
}

impl RawEvent {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      risk_id:       row.get(0)?,
      seq:           row.get(1)?,
      recorded_at:   row.get(2)?,
      decision_type: row.get(3)?,
      answers_json:  row.get(4)?,
      summary_json:  row.get(5)?,
    })
  }

  pub fn into_event(self) -> Result<FollowupEvent> {
    Ok(FollowupEvent {
      seq:           decode_count("seq", self.seq)?,
      recorded_at:   decode_dt(&self.recorded_at)?,
      decision_type: self
        .decision_type
        .as_deref()
        .map(|s| decode_enum("decision_type", s))
        .transpose()?,
      answers:       serde_json::from_str(&self.answers_json)?,
      summary:       serde_json::from_str(&self.summary_json)?,
    })
  }
}
