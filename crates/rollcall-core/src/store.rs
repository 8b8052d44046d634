//! Storage traits implemented by persistence backends (e.g.
//! `rollcall-store`).
//!
//! The [`AttendanceService`](crate::service::AttendanceService) depends on
//! these abstractions, never on a concrete backend. Each store exclusively
//! owns its records: identities live in the [`IdentityStore`], attendance
//! events in the [`AttendanceLedger`], and the two reference each other by
//! id only.
//!
//! All methods return `Send` futures so the traits can be served from
//! multi-threaded async runtimes.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::types::{AttendanceEvent, AttendanceStatus, Identity, NewIdentity};

/// Durable record of registered identities and their reference embeddings.
///
/// Mutations persist before the returned future resolves — a crash after
/// the call returns must not lose the record.
pub trait IdentityStore: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Insert a new identity, or — when the email is already registered —
    /// replace that identity's name, embedding, and registration time in
    /// place, keeping its id. Re-registration is an update, never an
    /// error.
    fn upsert_identity(
        &self,
        input: NewIdentity,
    ) -> impl Future<Output = Result<Identity, Self::Error>> + Send + '_;

    /// All registered identities, insertion order preserved.
    /// Re-registration keeps an identity's original position.
    fn list_identities(
        &self,
    ) -> impl Future<Output = Result<Vec<Identity>, Self::Error>> + Send + '_;

    /// Look up one identity by id. `None` if not registered.
    fn find_identity(
        &self,
        id: Uuid,
    ) -> impl Future<Output = Result<Option<Identity>, Self::Error>> + Send + '_;
}

/// Durable per-day attendance ledger.
///
/// The ledger trusts the [`Identity`] it is given; resolving and
/// validating identity existence is the orchestrator's job.
pub trait AttendanceLedger: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Record attendance for `identity` on the calendar date of `now`.
    ///
    /// Idempotent: when an event already exists for that identity and
    /// date, the existing event is returned unchanged — calling twice in
    /// one day is a re-read, not a write.
    fn mark<'a>(
        &'a self,
        identity: &'a Identity,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<AttendanceEvent, Self::Error>> + Send + 'a;

    /// Whether the identity is marked on the calendar date of `now`, plus
    /// the most recent marking instant across all dates.
    fn status(
        &self,
        identity_id: Uuid,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<AttendanceStatus, Self::Error>> + Send + '_;

    /// Every attendance event, newest first — the canonical order for
    /// audit and admin views.
    fn all_events(
        &self,
    ) -> impl Future<Output = Result<Vec<AttendanceEvent>, Self::Error>> + Send + '_;
}
