use std::path::PathBuf;

use chrono::FixedOffset;

/// Distance metric used by the matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMetric {
    Euclidean,
    Cosine,
}

impl MatchMetric {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "euclidean" => Some(Self::Euclidean),
            "cosine" => Some(Self::Cosine),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Euclidean => "euclidean",
            Self::Cosine => "cosine",
        }
    }
}

/// Which message bus to claim the service name on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusKind {
    Session,
    System,
}

impl BusKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "session" => Some(Self::Session),
            "system" => Some(Self::System),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Session => "session",
            Self::System => "system",
        }
    }
}

/// Daemon configuration, loaded from environment variables.
pub struct Config {
    /// Path to the SQLite database file.
    pub db_path: PathBuf,
    /// Distance below which a recognition counts as a match.
    pub distance_threshold: f32,
    /// Expected embedding length; vectors of any other length are rejected.
    pub embedding_dim: usize,
    /// Metric the matcher ranks candidates with.
    pub match_metric: MatchMetric,
    /// Offset applied to instants before taking the attendance date.
    pub utc_offset: FixedOffset,
    /// Bus to register the daemon on.
    pub bus: BusKind,
}

impl Config {
    /// Load configuration from `ROLLCALL_*` environment variables with defaults.
    pub fn from_env() -> Self {
        let data_dir = std::env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
                PathBuf::from(home).join(".local/share")
            })
            .join("rollcall");

        let db_path = std::env::var("ROLLCALL_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("attendance.db"));

        // chrono rejects offsets of a whole day or more
        let utc_offset = env_i32("ROLLCALL_UTC_OFFSET_MINUTES", 0)
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| FixedOffset::east_opt(0).expect("zero offset is in range"));

        Self {
            db_path,
            distance_threshold: env_f32("ROLLCALL_DISTANCE_THRESHOLD", 0.6),
            embedding_dim: env_usize("ROLLCALL_EMBEDDING_DIM", 128),
            match_metric: std::env::var("ROLLCALL_MATCH_METRIC")
                .ok()
                .and_then(|v| MatchMetric::parse(&v))
                .unwrap_or(MatchMetric::Euclidean),
            utc_offset,
            bus: std::env::var("ROLLCALL_BUS")
                .ok()
                .and_then(|v| BusKind::parse(&v))
                .unwrap_or(BusKind::Session),
        }
    }
}

fn env_f32(key: &str, default: f32) -> f32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_i32(key: &str, default: i32) -> i32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
