// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod classify;
pub mod config;
pub mod error;
pub mod ingest;
pub mod metrics;
pub mod model;
pub mod store;

use std::sync::Arc;
use std::time::Duration;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::classify::Classifier;
pub use crate::config::AppConfig;
pub use crate::ingest::scheduler::{spawn_periodic, CycleReport, Fetcher, SourceReport};
pub use crate::model::{ItemIngest, ScoredItem};

/// Wire the service objects from config: store, scorer, feed registry,
/// orchestrator. Each is built once and shared by reference.
pub async fn build_app_state(cfg: &AppConfig) -> anyhow::Result<AppState> {
    let store: store::DynStore =
        Arc::new(store::SqliteItemStore::connect(&cfg.database_url).await?);
    let classifier = Arc::new(Classifier::new(classify::build_scorer(&cfg.scorer)));
    let sources = ingest::providers::build_registry(cfg)?;
    let fetcher = Arc::new(Fetcher::new(
        sources,
        Arc::clone(&classifier),
        Arc::clone(&store),
        Duration::from_secs(cfg.fetch_interval_secs),
    ));
    tracing::info!(
        scorer = classifier.scorer_name(),
        sources = ?fetcher.source_slugs(),
        "app state ready"
    );
    Ok(AppState {
        store,
        classifier,
        fetcher,
    })
}
