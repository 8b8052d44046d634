//! The attendance service — the only entry point presentation layers use.
//!
//! Composes the identity store, the matcher, and the attendance ledger.
//! Holds no mutable state of its own; every mutation happens inside a
//! store, and storage failures propagate to the caller instead of being
//! papered over with fabricated records.

use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use crate::matcher::{MatchResult, Matcher};
use crate::store::{AttendanceLedger, IdentityStore};
use crate::types::{
    AttendanceEvent, AttendanceStatus, Embedding, EmbeddingError, Identity, IdentitySummary,
    NewIdentity,
};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("identity not found: {0}")]
    IdentityNotFound(Uuid),
    #[error("invalid embedding: {0}")]
    InvalidEmbedding(#[from] EmbeddingError),
    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl ServiceError {
    fn storage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Storage(Box::new(err))
    }
}

/// Orchestrates registration, recognition, and attendance marking over
/// the two stores. Cheap to share behind an `Arc`; all methods take
/// `&self`.
pub struct AttendanceService<S, L> {
    identities: S,
    ledger: L,
    matcher: Box<dyn Matcher + Send + Sync>,
    threshold: f32,
    embedding_dim: usize,
}

impl<S, L> AttendanceService<S, L>
where
    S: IdentityStore,
    L: AttendanceLedger,
{
    pub fn new(
        identities: S,
        ledger: L,
        matcher: Box<dyn Matcher + Send + Sync>,
        threshold: f32,
        embedding_dim: usize,
    ) -> Self {
        Self {
            identities,
            ledger,
            matcher,
            threshold,
            embedding_dim,
        }
    }

    /// Register a person, or re-register them (same email) with a fresh
    /// name and embedding. Rejects malformed embeddings before anything
    /// touches the store.
    pub async fn register(&self, input: NewIdentity) -> Result<Identity, ServiceError> {
        input.embedding.validate(self.embedding_dim)?;

        let identity = self
            .identities
            .upsert_identity(input)
            .await
            .map_err(ServiceError::storage)?;

        tracing::info!(id = %identity.id, email = %identity.email, "identity registered");
        Ok(identity)
    }

    /// Match a query embedding against every registered identity.
    ///
    /// "No confident match" is a normal result (the `"unknown"` sentinel),
    /// not an error. The query is validated like a registration embedding:
    /// a wrong-length vector would otherwise corrupt every distance
    /// silently.
    pub async fn recognize(&self, query: &Embedding) -> Result<MatchResult, ServiceError> {
        query.validate(self.embedding_dim)?;

        let gallery = self
            .identities
            .list_identities()
            .await
            .map_err(ServiceError::storage)?;
        let result = self.matcher.best_match(query, &gallery, self.threshold);

        tracing::debug!(
            label = %result.label,
            distance = result.distance,
            gallery_size = gallery.len(),
            "recognition attempt"
        );
        Ok(result)
    }

    /// Attendance status for an identity as of now: marked today, and the
    /// most recent marking across all days.
    pub async fn check_status(&self, identity_id: Uuid) -> Result<AttendanceStatus, ServiceError> {
        self.ledger
            .status(identity_id, Utc::now())
            .await
            .map_err(ServiceError::storage)
    }

    /// Mark attendance for a registered identity. Resolves the identity
    /// first — marking an unknown id is the caller's error — then
    /// delegates to the idempotent ledger.
    pub async fn mark_attendance(&self, identity_id: Uuid) -> Result<AttendanceEvent, ServiceError> {
        let identity = self
            .identities
            .find_identity(identity_id)
            .await
            .map_err(ServiceError::storage)?
            .ok_or(ServiceError::IdentityNotFound(identity_id))?;

        let event = self
            .ledger
            .mark(&identity, Utc::now())
            .await
            .map_err(ServiceError::storage)?;

        tracing::info!(
            identity = %identity.id,
            name = %identity.name,
            date = %event.calendar_date,
            "attendance marked"
        );
        Ok(event)
    }

    /// Every attendance event, newest first.
    pub async fn list_attendance(&self) -> Result<Vec<AttendanceEvent>, ServiceError> {
        self.ledger
            .all_events()
            .await
            .map_err(ServiceError::storage)
    }

    /// Registered identities as display summaries — no embeddings leave
    /// this layer.
    pub async fn list_identities(&self) -> Result<Vec<IdentitySummary>, ServiceError> {
        let identities = self
            .identities
            .list_identities()
            .await
            .map_err(ServiceError::storage)?;
        Ok(identities.iter().map(Identity::summary).collect())
    }
}
