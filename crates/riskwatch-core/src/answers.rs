//! Submitted check-in answers, keyed by semantic field role.
//!
//! Questionnaire fields are tagged with a [`FieldRole`] when they are
//! authored. This module interprets the values behind those roles; it never
//! looks at question wording. Missing or malformed values are tolerated and
//! reported as [`AnswerWarning`]s rather than rejected.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The semantic role a questionnaire field was tagged with at authoring time.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FieldRole {
  /// Overall remediation progress, 0–100.
  CompletionPercentage,
  /// Free-text status reported by the action owner.
  Status,
  /// Description of anything blocking remediation.
  BlockerText,
  /// Revised expected completion date, `YYYY-MM-DD`.
  ExpectedCompletionDate,
  ActionOwner,
  /// Evidence about control implementation, forwarded to the estimator.
  ControlEvidence,
  Notes,
}

/// A single typed answer value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
  Bool(bool),
  Number(f64),
  Text(String),
}

impl AnswerValue {
  pub fn as_text(&self) -> Option<&str> {
    match self {
      Self::Text(s) => Some(s.as_str()),
      _ => None,
    }
  }
}

/// A submitted check-in: one value per tagged field.
pub type Answers = BTreeMap<FieldRole, AnswerValue>;

/// A lenient validation problem found while reading answers.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnswerWarning {
  #[error("no completion percentage submitted; assuming 0")]
  MissingCompletion,

  #[error("completion percentage {value:?} is not a number; assuming 0")]
  MalformedCompletion { value: String },

  #[error("completion percentage {value} clamped into [0, 100]")]
  CompletionClamped { value: f64 },

  #[error("expected completion date {value:?} is not YYYY-MM-DD; ignored")]
  MalformedExpectedDate { value: String },

  #[error("answer for {role} has an unexpected type; ignored")]
  UnexpectedType { role: FieldRole },

  #[error("answer for {role} is not a finite number; dropped")]
  NonFiniteNumber { role: FieldRole },
}

/// Remove numeric answers that are NaN or infinite. They have no JSON form
/// and cannot be stored in the history.
pub fn drop_non_finite(answers: &mut Answers) -> Vec<AnswerWarning> {
  let mut warnings = Vec::new();
  answers.retain(|role, value| match value {
    AnswerValue::Number(n) if !n.is_finite() => {
      warnings.push(AnswerWarning::NonFiniteNumber { role: *role });
      false
    }
    _ => true,
  });
  warnings
}

/// Texts that mean "nothing is blocking" when given as blocker text.
const NO_BLOCKER: &[&str] = &["none", "n/a", "na", "no", "nil", "-"];

/// Structured signals read out of a submission.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnswerSignals {
  pub completion_percentage:    f64,
  /// An explicit blocker was reported (status `blocked` or blocker text).
  pub blocked:                  bool,
  pub blocker_count:            u32,
  pub expected_completion_date: Option<NaiveDate>,
  pub action_owner:             Option<String>,
  pub warnings:                 Vec<AnswerWarning>,
}

impl AnswerSignals {
  pub fn extract(answers: &Answers) -> Self {
    let mut signals = Self::default();

    signals.completion_percentage = signals.read_completion(answers);

    let blocker_count = answers
      .get(&FieldRole::BlockerText)
      .and_then(|v| signals.text_for(FieldRole::BlockerText, v))
      .map(count_blockers)
      .unwrap_or(0);
    let status_blocked = answers
      .get(&FieldRole::Status)
      .and_then(|v| signals.text_for(FieldRole::Status, v))
      .is_some_and(|s| s.trim().eq_ignore_ascii_case("blocked"));
    signals.blocker_count = blocker_count;
    signals.blocked = status_blocked || blocker_count > 0;

    if let Some(v) = answers.get(&FieldRole::ExpectedCompletionDate)
      && let Some(raw) = signals.text_for(FieldRole::ExpectedCompletionDate, v)
    {
      let raw = raw.trim();
      if !raw.is_empty() {
        match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
          Ok(date) => signals.expected_completion_date = Some(date),
          Err(_) => signals.warnings.push(AnswerWarning::MalformedExpectedDate {
            value: raw.to_owned(),
          }),
        }
      }
    }

    signals.action_owner = answers
      .get(&FieldRole::ActionOwner)
      .and_then(|v| signals.text_for(FieldRole::ActionOwner, v))
      .map(str::trim)
      .filter(|s| !s.is_empty())
      .map(str::to_owned);

    signals
  }

  fn read_completion(&mut self, answers: &Answers) -> f64 {
    let raw = match answers.get(&FieldRole::CompletionPercentage) {
      None => {
        self.warnings.push(AnswerWarning::MissingCompletion);
        return 0.0;
      }
      Some(AnswerValue::Number(n)) => Some(*n),
      Some(AnswerValue::Text(s)) => {
        let cleaned = s.trim().trim_end_matches('%').trim();
        match cleaned.parse::<f64>() {
          Ok(n) => Some(n),
          Err(_) => {
            self.warnings.push(AnswerWarning::MalformedCompletion {
              value: s.clone(),
            });
            None
          }
        }
      }
      Some(AnswerValue::Bool(_)) => {
        self.warnings.push(AnswerWarning::UnexpectedType {
          role: FieldRole::CompletionPercentage,
        });
        None
      }
    };

    match raw {
      Some(n) if n.is_nan() => {
        self.warnings.push(AnswerWarning::MalformedCompletion {
          value: n.to_string(),
        });
        0.0
      }
      Some(n) if !(0.0..=100.0).contains(&n) => {
        self.warnings.push(AnswerWarning::CompletionClamped { value: n });
        n.clamp(0.0, 100.0)
      }
      Some(n) => n,
      None => 0.0,
    }
  }

  fn text_for<'a>(
    &mut self,
    role: FieldRole,
    value: &'a AnswerValue,
  ) -> Option<&'a str> {
    let text = value.as_text();
    if text.is_none() {
      self.warnings.push(AnswerWarning::UnexpectedType { role });
    }
    text
  }
}

/// Number of distinct blockers described by free text; zero when the text
/// says there are none.
fn count_blockers(text: &str) -> u32 {
  let trimmed = text.trim();
  if trimmed.is_empty()
    || NO_BLOCKER.iter().any(|n| trimmed.eq_ignore_ascii_case(n))
  {
    return 0;
  }
  let items = trimmed
    .split(['\n', ';'])
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .count();
  u32::try_from(items).unwrap_or(u32::MAX)
}
