//! SQL schema for the Riskwatch SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS risks (
    risk_id                   TEXT PRIMARY KEY,
    asset_name                TEXT NOT NULL DEFAULT '',
    threat_name               TEXT NOT NULL DEFAULT '',
    treatment_decision        TEXT,            -- 'TREAT' | 'ACCEPT' | 'TRANSFER' | 'TERMINATE'
    status                    TEXT NOT NULL DEFAULT 'Open',
    created_at                TEXT NOT NULL,   -- RFC 3339 UTC
    last_updated              TEXT NOT NULL,   -- RFC 3339 UTC
    version                   INTEGER NOT NULL DEFAULT 0,
    last_followup_date        TEXT,            -- YYYY-MM-DD
    next_followup_date        TEXT,            -- YYYY-MM-DD
    followup_count            INTEGER NOT NULL DEFAULT 0
                              CHECK (followup_count >= 0),
    completion_percentage     REAL NOT NULL DEFAULT 0
                              CHECK (completion_percentage BETWEEN 0 AND 100),
    inherent_risk_rating      REAL NOT NULL CHECK (inherent_risk_rating BETWEEN 0 AND 5),
    control_rating            REAL NOT NULL CHECK (control_rating BETWEEN 0 AND 5),
    residual_risk_rating      REAL NOT NULL CHECK (residual_risk_rating BETWEEN 0 AND 5),
    current_control_rating    REAL,
    current_residual_risk     REAL CHECK (current_residual_risk IS NULL
                                          OR current_residual_risk BETWEEN 0 AND 5),
    risk_reduction_percentage REAL,
    timeline_status           TEXT,            -- 'On Track' | 'Delayed' | 'Ahead of Schedule'
    target_completion_date    TEXT,
    revised_completion_date   TEXT,
    action_owner              TEXT,
    CHECK (next_followup_date IS NULL OR status NOT IN ('Completed', 'Closed'))
);

-- Follow-up events are strictly append-only: one row per check-in, keyed by
-- the risk and its 1-based sequence number.
CREATE TABLE IF NOT EXISTS followup_events (
    risk_id       TEXT NOT NULL REFERENCES risks(risk_id),
    seq           INTEGER NOT NULL CHECK (seq >= 1),
    recorded_at   TEXT NOT NULL,
    decision_type TEXT,
    answers_json  TEXT NOT NULL,
    summary_json  TEXT NOT NULL,
    PRIMARY KEY (risk_id, seq)
);

CREATE TRIGGER IF NOT EXISTS followup_events_no_update
BEFORE UPDATE ON followup_events
BEGIN
    SELECT RAISE(ABORT, 'follow-up events are immutable');
END;

CREATE TRIGGER IF NOT EXISTS followup_events_no_delete
BEFORE DELETE ON followup_events
BEGIN
    SELECT RAISE(ABORT, 'follow-up events are immutable');
END;

CREATE INDEX IF NOT EXISTS risks_status_idx  ON risks(status);
CREATE INDEX IF NOT EXISTS risks_created_idx ON risks(created_at);
CREATE INDEX IF NOT EXISTS risks_next_idx    ON risks(next_followup_date);

PRAGMA user_version = 1;
";
