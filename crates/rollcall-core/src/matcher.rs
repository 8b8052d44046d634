//! Nearest-neighbor matching of a query embedding against the gallery of
//! registered identities.
//!
//! Matching is pure: no state, no randomness. A gallery entry wins only
//! when its distance is strictly below the threshold; everything else is
//! the `"unknown"` sentinel. Linear scan is the intended baseline — the
//! gallery is the set of registered people, not a vector database.

use serde::{Deserialize, Serialize};

use crate::types::{Embedding, Identity};

/// Label reported when no gallery entry clears the threshold.
pub const UNKNOWN_LABEL: &str = "unknown";

/// Distance reported for a non-match. Fixed at 1.0 — above any realistic
/// threshold — to signal "no confident match" rather than a measurement.
pub const UNKNOWN_DISTANCE: f32 = 1.0;

/// Result of matching a query embedding against the gallery.
///
/// `label` is the matched identity's id rendered as a string, or
/// [`UNKNOWN_LABEL`]. Callers map a non-unknown label back to an identity
/// themselves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResult {
    pub label: String,
    pub distance: f32,
}

impl MatchResult {
    /// The sentinel non-match result.
    pub fn unknown() -> Self {
        Self {
            label: UNKNOWN_LABEL.to_string(),
            distance: UNKNOWN_DISTANCE,
        }
    }

    /// True when `label` names a gallery identity.
    pub fn is_match(&self) -> bool {
        self.label != UNKNOWN_LABEL
    }
}

/// Strategy for comparing a query embedding against registered identities.
pub trait Matcher {
    fn best_match(
        &self,
        query: &Embedding,
        gallery: &[Identity],
        threshold: f32,
    ) -> MatchResult;
}

/// Euclidean nearest-neighbor matcher — the reference metric.
///
/// Always iterates the whole gallery. Ties resolve to the earliest entry
/// in gallery order (strict `<` against the running best), so a given
/// gallery ordering always produces the same result.
pub struct EuclideanMatcher;

impl Matcher for EuclideanMatcher {
    fn best_match(
        &self,
        query: &Embedding,
        gallery: &[Identity],
        threshold: f32,
    ) -> MatchResult {
        let mut best_dist = f32::INFINITY;
        let mut best_idx: Option<usize> = None;

        for (i, identity) in gallery.iter().enumerate() {
            let dist = query.euclidean_distance(&identity.embedding);
            if dist < best_dist {
                best_dist = dist;
                best_idx = Some(i);
            }
        }

        match best_idx {
            Some(idx) if best_dist < threshold => MatchResult {
                label: gallery[idx].id.to_string(),
                distance: best_dist,
            },
            _ => MatchResult::unknown(),
        }
    }
}

/// Cosine-distance matcher (`1 − cosine similarity`).
///
/// Preferable for embedding models that L2-normalize their output, where
/// angular separation is what distinguishes identities. Same selection
/// and threshold contract as [`EuclideanMatcher`].
pub struct CosineMatcher;

impl Matcher for CosineMatcher {
    fn best_match(
        &self,
        query: &Embedding,
        gallery: &[Identity],
        threshold: f32,
    ) -> MatchResult {
        let mut best_dist = f32::INFINITY;
        let mut best_idx: Option<usize> = None;

        for (i, identity) in gallery.iter().enumerate() {
            let dist = 1.0 - query.similarity(&identity.embedding);
            if dist < best_dist {
                best_dist = dist;
                best_idx = Some(i);
            }
        }

        match best_idx {
            Some(idx) if best_dist < threshold => MatchResult {
                label: gallery[idx].id.to_string(),
                distance: best_dist,
            },
            _ => MatchResult::unknown(),
        }
    }
}
