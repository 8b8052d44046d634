//! rollcall-core — Attendance domain logic.
//!
//! Identity and attendance records, embedding matching, the storage
//! traits, and the service that ties them together. Backend-agnostic:
//! anything implementing the store traits can sit underneath.

pub mod matcher;
pub mod service;
pub mod store;
pub mod types;

pub use matcher::{CosineMatcher, EuclideanMatcher, MatchResult, Matcher, UNKNOWN_LABEL};
pub use service::{AttendanceService, ServiceError};
pub use store::{AttendanceLedger, IdentityStore};
pub use types::{
    AttendanceEvent, AttendanceStatus, Embedding, EmbeddingError, Identity, IdentitySummary,
    NewIdentity,
};
