//! [`SqliteStore`] — the SQLite implementation of [`IdentityStore`] and
//! [`AttendanceLedger`].

use std::path::Path;

use chrono::{DateTime, FixedOffset, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use rollcall_core::types::calendar_date_at;
use rollcall_core::{
    AttendanceEvent, AttendanceLedger, AttendanceStatus, Identity, IdentityStore, NewIdentity,
};

use crate::encode::{
    encode_date, encode_dt, encode_embedding, encode_uuid, RawEvent, RawIdentity,
};
use crate::error::Result;
use crate::schema::SCHEMA;

/// An attendance store backed by a single SQLite file.
///
/// Cloning is cheap; clones share the underlying connection, and all
/// database work is serialized on its worker thread.
#[derive(Clone)]
pub struct SqliteStore {
    conn: tokio_rusqlite::Connection,
    /// Offset applied to instants before taking the calendar date.
    offset: FixedOffset,
}

impl SqliteStore {
    /// Open (or create) a store at `path` and run schema initialization.
    pub async fn open(path: impl AsRef<Path>, offset: FixedOffset) -> Result<Self> {
        let conn = tokio_rusqlite::Connection::open(path).await?;
        let store = Self { conn, offset };
        store.init_schema().await?;
        Ok(store)
    }

    /// Open an in-memory store, for tests.
    pub async fn open_in_memory(offset: FixedOffset) -> Result<Self> {
        let conn = tokio_rusqlite::Connection::open_in_memory().await?;
        let store = Self { conn, offset };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<()> {
        self.conn
            .call(|conn| {
                conn.execute_batch(SCHEMA)?;
                Ok(())
            })
            .await?;
        Ok(())
    }
}

impl IdentityStore for SqliteStore {
    type Error = crate::Error;

    /// Insert a new identity, or overwrite the name, embedding, and
    /// registration time of the existing row with the same email. The
    /// surviving row keeps its original id and rowid, so list order is
    /// stable across re-registration.
    async fn upsert_identity(&self, input: NewIdentity) -> Result<Identity> {
        let id_str = encode_uuid(Uuid::new_v4());
        let at_str = encode_dt(Utc::now());
        let embedding_str = encode_embedding(&input.embedding)?;
        let name = input.name;
        let email = input.email;

        let raw: RawIdentity = self
            .conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO identities (identity_id, name, email, embedding, registered_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)
                     ON CONFLICT(email) DO UPDATE SET
                         name = excluded.name,
                         embedding = excluded.embedding,
                         registered_at = excluded.registered_at",
                    rusqlite::params![id_str, name, email, embedding_str, at_str],
                )?;

                let raw = conn.query_row(
                    "SELECT identity_id, name, email, embedding, registered_at
                     FROM identities WHERE email = ?1",
                    rusqlite::params![email],
                    |row| {
                        Ok(RawIdentity {
                            identity_id: row.get(0)?,
                            name: row.get(1)?,
                            email: row.get(2)?,
                            embedding: row.get(3)?,
                            registered_at: row.get(4)?,
                        })
                    },
                )?;

                Ok(raw)
            })
            .await?;

        raw.into_identity()
    }

    /// All identities in insertion order (rowid order; updates keep it).
    async fn list_identities(&self) -> Result<Vec<Identity>> {
        let raws: Vec<RawIdentity> = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT identity_id, name, email, embedding, registered_at
                     FROM identities ORDER BY rowid",
                )?;
                let rows = stmt
                    .query_map([], |row| {
                        Ok(RawIdentity {
                            identity_id: row.get(0)?,
                            name: row.get(1)?,
                            email: row.get(2)?,
                            embedding: row.get(3)?,
                            registered_at: row.get(4)?,
                        })
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(rows)
            })
            .await?;

        raws.into_iter().map(RawIdentity::into_identity).collect()
    }

    async fn find_identity(&self, id: Uuid) -> Result<Option<Identity>> {
        let id_str = encode_uuid(id);

        let raw: Option<RawIdentity> = self
            .conn
            .call(move |conn| {
                Ok(conn
                    .query_row(
                        "SELECT identity_id, name, email, embedding, registered_at
                         FROM identities WHERE identity_id = ?1",
                        rusqlite::params![id_str],
                        |row| {
                            Ok(RawIdentity {
                                identity_id: row.get(0)?,
                                name: row.get(1)?,
                                email: row.get(2)?,
                                embedding: row.get(3)?,
                                registered_at: row.get(4)?,
                            })
                        },
                    )
                    .optional()?)
            })
            .await?;

        raw.map(RawIdentity::into_identity).transpose()
    }
}

impl AttendanceLedger for SqliteStore {
    type Error = crate::Error;

    /// Mark attendance for `identity` on the calendar day containing
    /// `now`. The insert and the read-back run inside one connection
    /// call, so a repeat mark for the same day always comes back as the
    /// original row, whatever else is in flight.
    async fn mark(&self, identity: &Identity, now: DateTime<Utc>) -> Result<AttendanceEvent> {
        let event_id_str = encode_uuid(Uuid::new_v4());
        let identity_id_str = encode_uuid(identity.id);
        let display_name = identity.name.clone();
        let marked_at_str = encode_dt(now);
        let date_str = encode_date(calendar_date_at(now, self.offset));

        let raw: RawEvent = self
            .conn
            .call(move |conn| {
                conn.execute(
                    "INSERT OR IGNORE INTO attendance_events
                         (event_id, identity_id, display_name, marked_at, calendar_date)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    rusqlite::params![
                        event_id_str,
                        identity_id_str,
                        display_name,
                        marked_at_str,
                        date_str,
                    ],
                )?;

                let raw = conn.query_row(
                    "SELECT event_id, identity_id, display_name, marked_at, calendar_date
                     FROM attendance_events
                     WHERE identity_id = ?1 AND calendar_date = ?2",
                    rusqlite::params![identity_id_str, date_str],
                    |row| {
                        Ok(RawEvent {
                            event_id: row.get(0)?,
                            identity_id: row.get(1)?,
                            display_name: row.get(2)?,
                            marked_at: row.get(3)?,
                            calendar_date: row.get(4)?,
                        })
                    },
                )?;

                Ok(raw)
            })
            .await?;

        raw.into_event()
    }

    async fn status(&self, identity_id: Uuid, now: DateTime<Utc>) -> Result<AttendanceStatus> {
        let id_str = encode_uuid(identity_id);
        let date_str = encode_date(calendar_date_at(now, self.offset));

        let (marked_today, last): (bool, Option<String>) = self
            .conn
            .call(move |conn| {
                let marked_today: bool = conn
                    .query_row(
                        "SELECT 1 FROM attendance_events
                         WHERE identity_id = ?1 AND calendar_date = ?2",
                        rusqlite::params![id_str, date_str],
                        |_| Ok(true),
                    )
                    .optional()?
                    .unwrap_or(false);

                let last: Option<String> = conn
                    .query_row(
                        "SELECT marked_at FROM attendance_events
                         WHERE identity_id = ?1
                         ORDER BY marked_at DESC, rowid DESC LIMIT 1",
                        rusqlite::params![id_str],
                        |row| row.get(0),
                    )
                    .optional()?;

                Ok((marked_today, last))
            })
            .await?;

        let last_marked = last.as_deref().map(crate::encode::decode_dt).transpose()?;
        Ok(AttendanceStatus { marked_today, last_marked })
    }

    /// Every event, newest first. Rowid breaks timestamp ties so the
    /// order is stable.
    async fn all_events(&self) -> Result<Vec<AttendanceEvent>> {
        let raws: Vec<RawEvent> = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT event_id, identity_id, display_name, marked_at, calendar_date
                     FROM attendance_events
                     ORDER BY marked_at DESC, rowid DESC",
                )?;
                let rows = stmt
                    .query_map([], |row| {
                        Ok(RawEvent {
                            event_id: row.get(0)?,
                            identity_id: row.get(1)?,
                            display_name: row.get(2)?,
                            marked_at: row.get(3)?,
                            calendar_date: row.get(4)?,
                        })
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(rows)
            })
            .await?;

        raws.into_iter().map(RawEvent::into_event).collect()
    }
}
