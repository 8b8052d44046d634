use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Face embedding vector, produced by an external extraction model
/// (typically 128- or 512-dimensional depending on the model).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Embedding {
    pub values: Vec<f32>,
}

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("expected {expected}-dimensional embedding, got {actual}")]
    WrongDimension { expected: usize, actual: usize },
    #[error("embedding value at index {index} is not finite")]
    NonFinite { index: usize },
}

impl Embedding {
    /// Number of dimensions.
    pub fn dim(&self) -> usize {
        self.values.len()
    }

    /// Reject embeddings of the wrong length or containing NaN/infinite
    /// values. Run before any vector reaches the store or the matcher.
    pub fn validate(&self, expected_dim: usize) -> Result<(), EmbeddingError> {
        if self.dim() != expected_dim {
            return Err(EmbeddingError::WrongDimension {
                expected: expected_dim,
                actual: self.dim(),
            });
        }
        if let Some(index) = self.values.iter().position(|v| !v.is_finite()) {
            return Err(EmbeddingError::NonFinite { index });
        }
        Ok(())
    }

    /// Compute Euclidean distance between two embeddings.
    pub fn euclidean_distance(&self, other: &Embedding) -> f32 {
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f32>()
            .sqrt()
    }

    /// Compute cosine similarity between two embeddings.
    ///
    /// Returns a value in [-1, 1]. Higher = more similar. Zero vectors
    /// compare as 0.
    pub fn similarity(&self, other: &Embedding) -> f32 {
        let mut dot = 0.0f32;
        let mut norm_a = 0.0f32;
        let mut norm_b = 0.0f32;

        for (a, b) in self.values.iter().zip(other.values.iter()) {
            dot += a * b;
            norm_a += a * a;
            norm_b += b * b;
        }

        let denom = norm_a.sqrt() * norm_b.sqrt();
        if denom > 0.0 { dot / denom } else { 0.0 }
    }
}

/// A registered person: reference embedding plus contact attributes.
///
/// `email` is the dedup key — registering again with the same email
/// replaces the name and embedding in place. `id` is never reused.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub embedding: Embedding,
    /// Creation or last re-registration time.
    pub registered_at: DateTime<Utc>,
}

impl Identity {
    /// Display projection without the embedding, for callers that only
    /// render identities and have no business holding biometric data.
    pub fn summary(&self) -> IdentitySummary {
        IdentitySummary {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            registered_at: self.registered_at,
        }
    }
}

/// Registration input; the store assigns id and timestamp.
#[derive(Debug, Clone)]
pub struct NewIdentity {
    pub name: String,
    pub email: String,
    pub embedding: Embedding,
}

/// Identity without its embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentitySummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub registered_at: DateTime<Utc>,
}

/// One attendance marking. Created at most once per identity per calendar
/// date; never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceEvent {
    pub id: Uuid,
    pub identity_id: Uuid,
    /// Identity name at marking time; survives later renames.
    pub display_name: String,
    /// Exact marking instant.
    pub marked_at: DateTime<Utc>,
    /// Date of `marked_at` in the ledger's reference timezone — the
    /// dedup partition key.
    pub calendar_date: NaiveDate,
}

/// Answer to "is this identity marked today, and when were they last seen".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceStatus {
    pub marked_today: bool,
    pub last_marked: Option<DateTime<Utc>>,
}

/// Calendar date of `now` at a fixed UTC offset.
///
/// The offset is the ledger's reference timezone: the same instant falls
/// on different dates in different zones, and the one-event-per-day
/// invariant is only meaningful against a single fixed choice.
pub fn calendar_date_at(now: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    now.with_timezone(&offset).date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_dim_is_vector_length() {
        let e = Embedding { values: vec![0.0; 128] };
        assert_eq!(e.dim(), 128);
        assert_eq!(Embedding { values: vec![] }.dim(), 0);
    }

    #[test]
    fn test_validate_accepts_well_formed() {
        let e = Embedding { values: vec![0.1, -0.2, 0.3] };
        assert!(e.validate(3).is_ok());
    }

    #[test]
    fn test_validate_rejects_wrong_dimension() {
        let e = Embedding { values: vec![1.0, 2.0] };
        let err = e.validate(3).unwrap_err();
        assert!(matches!(
            err,
            EmbeddingError::WrongDimension { expected: 3, actual: 2 }
        ));
    }

    #[test]
    fn test_validate_rejects_nan() {
        let e = Embedding { values: vec![0.0, f32::NAN, 0.0] };
        let err = e.validate(3).unwrap_err();
        assert!(matches!(err, EmbeddingError::NonFinite { index: 1 }));
    }

    #[test]
    fn test_validate_rejects_infinity() {
        let e = Embedding { values: vec![f32::INFINITY, 0.0] };
        assert!(matches!(
            e.validate(2).unwrap_err(),
            EmbeddingError::NonFinite { index: 0 }
        ));
    }

    #[test]
    fn test_euclidean_distance_exact_copy() {
        let a = Embedding { values: vec![1.0, 2.0, 3.0] };
        let b = Embedding { values: vec![1.0, 2.0, 3.0] };
        assert_eq!(a.euclidean_distance(&b), 0.0);
    }

    #[test]
    fn test_euclidean_distance_unit_apart() {
        let a = Embedding { values: vec![0.0, 0.0] };
        let b = Embedding { values: vec![0.0, 1.0] };
        assert!((a.euclidean_distance(&b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_identical() {
        let a = Embedding { values: vec![1.0, 0.0, 0.0] };
        let b = Embedding { values: vec![1.0, 0.0, 0.0] };
        assert!((a.similarity(&b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        let a = Embedding { values: vec![1.0, 0.0] };
        let b = Embedding { values: vec![0.0, 1.0] };
        assert!(a.similarity(&b).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_zero_vector() {
        let a = Embedding { values: vec![0.0, 0.0] };
        let b = Embedding { values: vec![1.0, 0.0] };
        assert_eq!(a.similarity(&b), 0.0);
    }

    #[test]
    fn test_calendar_date_utc() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 23, 30, 0).unwrap();
        let utc = FixedOffset::east_opt(0).unwrap();
        assert_eq!(
            calendar_date_at(now, utc),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
        );
    }

    #[test]
    fn test_calendar_date_crosses_midnight_east() {
        // 23:30 UTC is already the next day at +01:00.
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 23, 30, 0).unwrap();
        let cet = FixedOffset::east_opt(3600).unwrap();
        assert_eq!(
            calendar_date_at(now, cet),
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
        );
    }

    #[test]
    fn test_calendar_date_crosses_midnight_west() {
        // 00:30 UTC is still the previous day at -02:00.
        let now = Utc.with_ymd_and_hms(2024, 1, 2, 0, 30, 0).unwrap();
        let west = FixedOffset::west_opt(2 * 3600).unwrap();
        assert_eq!(
            calendar_date_at(now, west),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
        );
    }

    #[test]
    fn test_summary_carries_no_embedding() {
        let identity = Identity {
            id: Uuid::new_v4(),
            name: "Alice".into(),
            email: "alice@example.com".into(),
            embedding: Embedding { values: vec![1.0, 0.0] },
            registered_at: Utc::now(),
        };
        let summary = identity.summary();
        assert_eq!(summary.id, identity.id);
        assert_eq!(summary.name, "Alice");
        // Serialized form must not leak the vector.
        let json = serde_json::to_string(&summary).unwrap();
        assert!(!json.contains("embedding"));
    }
}
