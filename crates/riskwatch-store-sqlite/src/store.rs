//! [`SqliteStore`], the SQLite implementation of [`RiskStore`].

use std::{collections::HashMap, path::Path};

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;

use riskwatch_core::{
  answers::AnswerValue,
  risk::{FollowupEvent, NewRisk, Risk, RiskId},
  store::{RiskFilter, RiskStore, RiskUpdate, UpdateOutcome},
};

use crate::{
  Error, Result,
  encode::{
    EVENT_COLUMNS, RISK_COLUMNS, RawEvent, RawRisk, encode_date, encode_dt,
    truncate_dt,
  },
  schema::SCHEMA,
};

/// What the write transaction in [`SqliteStore::update_risk`] observed.
enum WriteResult {
  Committed(Box<Risk>),
  Missing,
  Stale(i64),
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A risk register backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

/// Read history rows (one risk, or all when `risk_id` is `None`) in
/// sequence order.
fn query_events(
  conn: &rusqlite::Connection,
  risk_id: Option<&str>,
) -> rusqlite::Result<Vec<RawEvent>> {
  match risk_id {
    Some(id) => {
      let mut stmt = conn.prepare(&format!(
        "SELECT {EVENT_COLUMNS} FROM followup_events
         WHERE risk_id = ?1 ORDER BY seq ASC"
      ))?;
      stmt
        .query_map(rusqlite::params![id], RawEvent::from_row)?
        .collect()
    }
    None => {
      let mut stmt = conn.prepare(&format!(
        "SELECT {EVENT_COLUMNS} FROM followup_events ORDER BY risk_id, seq"
      ))?;
      stmt.query_map([], RawEvent::from_row)?.collect()
    }
  }
}

fn decode_events(raws: Vec<RawEvent>) -> Result<Vec<FollowupEvent>> {
  raws.into_iter().map(RawEvent::into_event).collect()
}

// ─── RiskStore impl ──────────────────────────────────────────────────────────

impl RiskStore for SqliteStore {
  type Error = Error;

  async fn create_risk(
    &self,
    input: NewRisk,
    now: DateTime<Utc>,
  ) -> Result<Option<Risk>> {
    input.validate()?;
    let risk = input.into_risk(truncate_dt(now)?);

    let id_str        = risk.risk_id.as_str().to_owned();
    let decision_str  = risk.treatment_decision.map(|d| d.as_ref().to_owned());
    let status_str    = risk.status.as_ref().to_owned();
    let at_str        = encode_dt(risk.created_at);
    let target_str    = risk.target_completion_date.map(encode_date);
    let asset_name    = risk.asset_name.clone();
    let threat_name   = risk.threat_name.clone();
    let inherent      = risk.inherent_risk_rating;
    let control       = risk.control_rating;
    let residual      = risk.residual_risk_rating;

    let inserted = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "INSERT OR IGNORE INTO risks (
             risk_id, asset_name, threat_name, treatment_decision, status,
             created_at, last_updated, version,
             inherent_risk_rating, control_rating, residual_risk_rating,
             target_completion_date
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6, 0, ?7, ?8, ?9, ?10)",
          rusqlite::params![
            id_str,
            asset_name,
            threat_name,
            decision_str,
            status_str,
            at_str,
            inherent,
            control,
            residual,
            target_str,
          ],
        )?;
        Ok(n == 1)
      })
      .await?;

    Ok(inserted.then_some(risk))
  }

  async fn get_risk(&self, risk_id: &RiskId) -> Result<Option<Risk>> {
    let id_str = risk_id.as_str().to_owned();

    // Record and history are read in one call so they form one snapshot.
    let raw: Option<(RawRisk, Vec<RawEvent>)> = self
      .conn
      .call(move |conn| {
        let risk = conn
          .query_row(
            &format!("SELECT {RISK_COLUMNS} FROM risks WHERE risk_id = ?1"),
            rusqlite::params![id_str],
            RawRisk::from_row,
          )
          .optional()?;
        let Some(risk) = risk else {
          return Ok(None);
        };
        let events = query_events(conn, Some(&id_str))?;
        Ok(Some((risk, events)))
      })
      .await?;

    let Some((raw, events)) = raw else {
      return Ok(None);
    };
    raw.into_risk(decode_events(events)?).map(Some)
  }

  async fn list_risks(&self, filter: &RiskFilter) -> Result<Vec<Risk>> {
    let include: Vec<String> =
      filter.statuses.iter().map(|s| s.as_ref().to_owned()).collect();
    let exclude: Vec<String> = filter
      .exclude_statuses
      .iter()
      .map(|s| s.as_ref().to_owned())
      .collect();

    let with_history = filter.with_history;

    let (raws, events): (Vec<RawRisk>, Vec<RawEvent>) = self
      .conn
      .call(move |conn| {
        // Build WHERE clause dynamically; values are always bound.
        let mut conds: Vec<String> = vec![];
        let mut params: Vec<String> = vec![];
        if !include.is_empty() {
          let marks = vec!["?"; include.len()].join(", ");
          conds.push(format!("status IN ({marks})"));
          params.extend(include);
        }
        if !exclude.is_empty() {
          let marks = vec!["?"; exclude.len()].join(", ");
          conds.push(format!("status NOT IN ({marks})"));
          params.extend(exclude);
        }
        let where_clause = if conds.is_empty() {
          String::new()
        } else {
          format!("WHERE {}", conds.join(" AND "))
        };

        let mut stmt = conn.prepare(&format!(
          "SELECT {RISK_COLUMNS} FROM risks {where_clause}
           ORDER BY created_at ASC, risk_id ASC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), RawRisk::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let events = if with_history {
          query_events(conn, None)?
        } else {
          Vec::new()
        };
        Ok((rows, events))
      })
      .await?;

    let mut histories: HashMap<String, Vec<FollowupEvent>> = HashMap::new();
    for raw in events {
      let key = raw.risk_id.clone();
      histories.entry(key).or_default().push(raw.into_event()?);
    }

    raws
      .into_iter()
      .map(|raw| {
        let history = histories.remove(&raw.risk_id).unwrap_or_default();
        raw.into_risk(history)
      })
      .collect()
  }

  async fn update_risk(
    &self,
    risk_id:          &RiskId,
    expected_version: u64,
    update:           RiskUpdate,
    event:            FollowupEvent,
  ) -> Result<UpdateOutcome> {
    let id_str            = risk_id.as_str().to_owned();
    let expected          = i64::try_from(expected_version).unwrap_or(i64::MAX);
    let status_str        = update.status.as_ref().to_owned();
    let last_str          = encode_date(update.last_followup_date);
    let next_str          = update.next_followup_date.map(encode_date);
    let timeline_str      = update.timeline_status.map(|t| t.as_ref().to_owned());
    let revised_str       = update.revised_completion_date.map(encode_date);
    let updated_str       = encode_dt(update.updated_at);
    let seq               = i64::from(event.seq);
    let recorded_str      = encode_dt(event.recorded_at);
    let decision_str      = event.decision_type.map(|d| d.as_ref().to_owned());
    // serde_json writes NaN and infinities as `null`, which would not read
    // back as an answer.
    if let Some((role, _)) = event
      .answers
      .iter()
      .find(|(_, v)| matches!(v, AnswerValue::Number(n) if !n.is_finite()))
    {
      return Err(Error::Core(riskwatch_core::Error::InvalidInput(format!(
        "answer for {role} is not a finite number"
      ))));
    }
    let answers_json      = serde_json::to_string(&event.answers)?;
    let summary_json      = serde_json::to_string(&event.summary)?;

    let result = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let changed = tx.execute(
          "UPDATE risks SET
             status                    = ?3,
             completion_percentage     = ?4,
             last_followup_date        = ?5,
             next_followup_date        = ?6,
             current_control_rating    = ?7,
             current_residual_risk     = ?8,
             risk_reduction_percentage = ?9,
             timeline_status           = ?10,
             revised_completion_date   = ?11,
             action_owner              = ?12,
             last_updated              = ?13,
             followup_count            = followup_count + 1,
             version                   = version + 1
           WHERE risk_id = ?1 AND version = ?2",
          rusqlite::params![
            id_str,
            expected,
            status_str,
            update.completion_percentage,
            last_str,
            next_str,
            update.current_control_rating,
            update.current_residual_risk,
            update.risk_reduction_percentage,
            timeline_str,
            revised_str,
            update.action_owner,
            updated_str,
          ],
        )?;

        if changed == 0 {
          // Dropping the transaction rolls it back.
          let current: Option<i64> = tx
            .query_row(
              "SELECT version FROM risks WHERE risk_id = ?1",
              rusqlite::params![id_str],
              |r| r.get(0),
            )
            .optional()?;
          return Ok(match current {
            None => WriteResult::Missing,
            Some(v) => WriteResult::Stale(v),
          });
        }

        let count: i64 = tx.query_row(
          "SELECT followup_count FROM risks WHERE risk_id = ?1",
          rusqlite::params![id_str],
          |r| r.get(0),
        )?;
        if count != seq {
          return Ok(WriteResult::Stale(expected));
        }

        tx.execute(
          "INSERT INTO followup_events (
             risk_id, seq, recorded_at, decision_type, answers_json, summary_json
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![
            id_str,
            seq,
            recorded_str,
            decision_str,
            answers_json,
            summary_json,
          ],
        )?;

        // Read back inside the transaction so a record that fails to
        // decode is never committed.
        let raw = tx.query_row(
          &format!("SELECT {RISK_COLUMNS} FROM risks WHERE risk_id = ?1"),
          rusqlite::params![id_str],
          RawRisk::from_row,
        )?;
        let events = query_events(&tx, Some(&id_str))?;
        let risk = decode_events(events)
          .and_then(|history| raw.into_risk(history))
          .map_err(|e| tokio_rusqlite::Error::Other(Box::new(e)))?;

        tx.commit()?;
        Ok(WriteResult::Committed(Box::new(risk)))
      })
      .await?;

    match result {
      WriteResult::Missing => Ok(UpdateOutcome::NotFound),
      WriteResult::Stale(v) => Ok(UpdateOutcome::Conflict {
        current_version: u64::try_from(v).unwrap_or_default(),
      }),
      WriteResult::Committed(risk) => Ok(UpdateOutcome::Applied(*risk)),
    }
  }
}
