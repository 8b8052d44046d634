use anyhow::Result;
use tracing_subscriber::EnvFilter;

use rollcall_core::{AttendanceService, CosineMatcher, EuclideanMatcher, Matcher};
use rollcall_store::SqliteStore;

mod config;
mod dbus_interface;

use config::{BusKind, Config, MatchMetric};
use dbus_interface::RollcallService;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::info!("rollcalld starting");

    let config = Config::from_env();

    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let store = SqliteStore::open(&config.db_path, config.utc_offset).await?;
    tracing::info!(path = %config.db_path.display(), "database opened");

    let matcher: Box<dyn Matcher + Send + Sync> = match config.match_metric {
        MatchMetric::Euclidean => Box::new(EuclideanMatcher),
        MatchMetric::Cosine => Box::new(CosineMatcher),
    };
    let service = AttendanceService::new(
        store.clone(),
        store,
        matcher,
        config.distance_threshold,
        config.embedding_dim,
    );
    tracing::info!(
        metric = config.match_metric.name(),
        threshold = config.distance_threshold,
        embedding_dim = config.embedding_dim,
        "attendance service ready"
    );

    let interface =
        RollcallService::new(service, config.distance_threshold, config.match_metric);
    let builder = match config.bus {
        BusKind::Session => zbus::connection::Builder::session()?,
        BusKind::System => zbus::connection::Builder::system()?,
    };
    let _conn = builder
        .name("org.rollcall.Rollcall1")?
        .serve_at("/org/rollcall/Rollcall1", interface)?
        .build()
        .await?;

    tracing::info!(bus = config.bus.name(), "rollcalld ready");

    // Keep running until signaled
    tokio::signal::ctrl_c().await?;
    tracing::info!("rollcalld shutting down");

    Ok(())
}
