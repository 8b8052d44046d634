//! SQL schema for the rollcall SQLite store.
//!
//! Executed at every open; idempotent thanks to `CREATE TABLE IF NOT
//! EXISTS`. Future migrations will be gated on `PRAGMA user_version`.

pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS identities (
    identity_id   TEXT PRIMARY KEY,
    name          TEXT NOT NULL,
    email         TEXT NOT NULL UNIQUE,
    embedding     TEXT NOT NULL,   -- JSON float array
    registered_at TEXT NOT NULL    -- RFC 3339 UTC
);

-- At most one row per identity per calendar day; a repeat mark on the
-- same day must return the existing row, never insert a second one.
CREATE TABLE IF NOT EXISTS attendance_events (
    event_id      TEXT PRIMARY KEY,
    identity_id   TEXT NOT NULL REFERENCES identities(identity_id),
    display_name  TEXT NOT NULL,   -- identity name at marking time
    marked_at     TEXT NOT NULL,   -- RFC 3339 UTC
    calendar_date TEXT NOT NULL,   -- YYYY-MM-DD in the ledger timezone
    UNIQUE (identity_id, calendar_date)
);

CREATE INDEX IF NOT EXISTS attendance_identity_idx ON attendance_events(identity_id);
CREATE INDEX IF NOT EXISTS attendance_marked_idx   ON attendance_events(marked_at);

PRAGMA user_version = 1;
";
