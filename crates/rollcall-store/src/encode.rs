//! Encoding helpers between domain types and the text columns SQLite
//! stores them in.
//!
//! Timestamps are RFC 3339 strings, calendar dates are `YYYY-MM-DD`,
//! embeddings are compact JSON float arrays, UUIDs are hyphenated
//! lowercase strings.

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use rollcall_core::{AttendanceEvent, Embedding, Identity};

use crate::error::{Error, Result};

pub fn encode_uuid(id: Uuid) -> String {
    id.hyphenated().to_string()
}

pub fn decode_uuid(s: &str) -> Result<Uuid> {
    Ok(Uuid::parse_str(s)?)
}

pub fn encode_dt(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_date(date: NaiveDate) -> String {
    date.to_string()
}

pub fn decode_date(s: &str) -> Result<NaiveDate> {
    s.parse().map_err(|_| Error::DateParse(format!("bad calendar date: {s:?}")))
}

pub fn encode_embedding(embedding: &Embedding) -> Result<String> {
    Ok(serde_json::to_string(&embedding.values)?)
}

pub fn decode_embedding(s: &str) -> Result<Embedding> {
    Ok(Embedding { values: serde_json::from_str(s)? })
}

/// Raw strings read directly from an `identities` row.
pub struct RawIdentity {
    pub identity_id: String,
    pub name: String,
    pub email: String,
    pub embedding: String,
    pub registered_at: String,
}

impl RawIdentity {
    pub fn into_identity(self) -> Result<Identity> {
        Ok(Identity {
            id: decode_uuid(&self.identity_id)?,
            name: self.name,
            email: self.email,
            embedding: decode_embedding(&self.embedding)?,
            registered_at: decode_dt(&self.registered_at)?,
        })
    }
}

/// Raw strings read directly from an `attendance_events` row.
pub struct RawEvent {
    pub event_id: String,
    pub identity_id: String,
    pub display_name: String,
    pub marked_at: String,
    pub calendar_date: String,
}

impl RawEvent {
    pub fn into_event(self) -> Result<AttendanceEvent> {
        Ok(AttendanceEvent {
            id: decode_uuid(&self.event_id)?,
            identity_id: decode_uuid(&self.identity_id)?,
            display_name: self.display_name,
            marked_at: decode_dt(&self.marked_at)?,
            calendar_date: decode_date(&self.calendar_date)?,
        })
    }
}
