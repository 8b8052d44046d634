use uuid::Uuid;
use zbus::interface;

use rollcall_core::{AttendanceService, Embedding, NewIdentity, ServiceError};
use rollcall_store::SqliteStore;

use crate::config::MatchMetric;

/// D-Bus interface for the rollcall attendance daemon.
///
/// Bus name: org.rollcall.Rollcall1
/// Object path: /org/rollcall/Rollcall1
///
/// Every method returns its payload as a JSON string; embeddings arrive
/// as D-Bus double arrays and are narrowed to f32 before validation.
pub struct RollcallService {
    service: AttendanceService<SqliteStore, SqliteStore>,
    threshold: f32,
    metric: MatchMetric,
}

impl RollcallService {
    pub fn new(
        service: AttendanceService<SqliteStore, SqliteStore>,
        threshold: f32,
        metric: MatchMetric,
    ) -> Self {
        Self {
            service,
            threshold,
            metric,
        }
    }
}

fn to_fdo(err: ServiceError) -> zbus::fdo::Error {
    match err {
        ServiceError::InvalidEmbedding(_) => zbus::fdo::Error::InvalidArgs(err.to_string()),
        ServiceError::IdentityNotFound(_) | ServiceError::Storage(_) => {
            zbus::fdo::Error::Failed(err.to_string())
        }
    }
}

fn parse_identity_id(raw: &str) -> zbus::fdo::Result<Uuid> {
    Uuid::parse_str(raw)
        .map_err(|_| zbus::fdo::Error::InvalidArgs(format!("invalid identity id: {raw:?}")))
}

fn narrow_embedding(values: Vec<f64>) -> Embedding {
    Embedding {
        values: values.into_iter().map(|v| v as f32).collect(),
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> zbus::fdo::Result<String> {
    serde_json::to_string(value).map_err(|e| zbus::fdo::Error::Failed(e.to_string()))
}

#[interface(name = "org.rollcall.Rollcall1")]
impl RollcallService {
    /// Register a person, or update their record if the email is taken.
    async fn register(
        &self,
        name: &str,
        email: &str,
        embedding: Vec<f64>,
    ) -> zbus::fdo::Result<String> {
        tracing::info!(name, email, "register requested");
        let input = NewIdentity {
            name: name.to_string(),
            email: email.to_string(),
            embedding: narrow_embedding(embedding),
        };
        let identity = self.service.register(input).await.map_err(to_fdo)?;
        to_json(&identity.summary())
    }

    /// Match an embedding against the registered gallery.
    async fn recognize(&self, embedding: Vec<f64>) -> zbus::fdo::Result<String> {
        let result = self
            .service
            .recognize(&narrow_embedding(embedding))
            .await
            .map_err(to_fdo)?;
        to_json(&result)
    }

    /// Mark attendance for a registered identity. Idempotent per day.
    async fn mark_attendance(&self, identity_id: &str) -> zbus::fdo::Result<String> {
        tracing::info!(identity_id, "mark requested");
        let id = parse_identity_id(identity_id)?;
        let event = self.service.mark_attendance(id).await.map_err(to_fdo)?;
        to_json(&event)
    }

    /// Attendance status for one identity as of now.
    async fn check_status(&self, identity_id: &str) -> zbus::fdo::Result<String> {
        let id = parse_identity_id(identity_id)?;
        let status = self.service.check_status(id).await.map_err(to_fdo)?;
        to_json(&status)
    }

    /// Registered identities as a JSON array of summaries (no embeddings).
    async fn list_identities(&self) -> zbus::fdo::Result<String> {
        let summaries = self.service.list_identities().await.map_err(to_fdo)?;
        to_json(&summaries)
    }

    /// Every attendance event, newest first, as a JSON array.
    async fn list_attendance(&self) -> zbus::fdo::Result<String> {
        let events = self.service.list_attendance().await.map_err(to_fdo)?;
        to_json(&events)
    }

    /// Return daemon status information.
    async fn status(&self) -> zbus::fdo::Result<String> {
        let identities = self.service.list_identities().await.map_err(to_fdo)?;
        let events = self.service.list_attendance().await.map_err(to_fdo)?;
        Ok(serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "identities": identities.len(),
            "events": events.len(),
            "threshold": self.threshold,
            "metric": self.metric.name(),
        })
        .to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollcall_core::EmbeddingError;

    #[test]
    fn test_invalid_embedding_maps_to_invalid_args() {
        let err = ServiceError::InvalidEmbedding(EmbeddingError::WrongDimension {
            expected: 128,
            actual: 3,
        });
        assert!(matches!(to_fdo(err), zbus::fdo::Error::InvalidArgs(_)));
    }

    #[test]
    fn test_unknown_identity_maps_to_failed() {
        let id = Uuid::new_v4();
        let err = ServiceError::IdentityNotFound(id);
        match to_fdo(err) {
            zbus::fdo::Error::Failed(msg) => assert!(msg.contains(&id.to_string())),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_identity_id_parsing() {
        assert!(parse_identity_id("not-a-uuid").is_err());
        let id = Uuid::new_v4();
        assert_eq!(parse_identity_id(&id.to_string()).unwrap(), id);
    }

    #[test]
    fn test_embedding_narrowing() {
        let narrowed = narrow_embedding(vec![1.0, 0.5, -0.25]);
        assert_eq!(narrowed.values, vec![1.0f32, 0.5, -0.25]);
    }
}
