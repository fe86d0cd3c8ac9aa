// src/ingest/scheduler.rs
//! Fetch orchestrator.
//!
//! A cycle visits every registered source in order: fetch (isolated), then,
//! only if something came back, open one store session for that source,
//! classify + upsert each item, and drop the session before moving on.
//!
//! The periodic loop and on-demand cycles share [`Fetcher::run_cycle`] and may
//! overlap. That is fine: every write is an idempotent upsert keyed by id.

use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::{counter, gauge, histogram};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::classify::Classifier;
use crate::ingest::providers::SourceRegistry;
use crate::ingest::{ensure_metrics_described, fetch_isolated};
use crate::model::ItemIngest;
use crate::store::DynStore;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SourceReport {
    pub source: String,
    pub fetched: usize,
    pub persisted: usize,
    /// Persisted without scores after a scorer failure.
    pub unscored: usize,
    pub store_errors: usize,
    /// The store session could not be opened; nothing was written.
    pub session_failed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub sources: Vec<SourceReport>,
    /// Stopped early by a shutdown signal.
    pub cancelled: bool,
}

impl CycleReport {
    pub fn persisted(&self) -> usize {
        self.sources.iter().map(|s| s.persisted).sum()
    }
}

pub struct Fetcher {
    sources: SourceRegistry,
    classifier: Arc<Classifier>,
    store: DynStore,
    interval: Duration,
}

impl Fetcher {
    pub fn new(
        sources: SourceRegistry,
        classifier: Arc<Classifier>,
        store: DynStore,
        interval: Duration,
    ) -> Self {
        Self {
            sources,
            classifier,
            store,
            interval,
        }
    }

    pub fn source_slugs(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.slug()).collect()
    }

    /// One full synchronous cycle. Per-source failures are reported, never returned.
    pub async fn run_cycle(&self) -> CycleReport {
        self.cycle(None).await
    }

    async fn cycle(&self, shutdown: Option<&watch::Receiver<bool>>) -> CycleReport {
        ensure_metrics_described();
        let t0 = Instant::now();
        info!(target: "fetcher", sources = self.sources.len(), "fetch cycle started");

        let mut report = CycleReport::default();
        for provider in &self.sources {
            if shutdown.is_some_and(|rx| *rx.borrow()) {
                warn!(target: "fetcher", "fetch cycle cancelled");
                report.cancelled = true;
                break;
            }

            let items = fetch_isolated(provider.as_ref()).await;
            if items.is_empty() {
                report.sources.push(SourceReport {
                    source: provider.slug().to_string(),
                    ..Default::default()
                });
                continue;
            }
            report
                .sources
                .push(self.persist_source(provider.slug(), items).await);
        }

        counter!("fetch_cycles_total").increment(1);
        histogram!("fetch_cycle_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        gauge!("fetch_last_run_ts").set(chrono::Utc::now().timestamp() as f64);
        info!(
            target: "fetcher",
            persisted = report.persisted(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "fetch cycle complete"
        );
        report
    }

    async fn persist_source(&self, slug: &str, items: Vec<ItemIngest>) -> SourceReport {
        let mut rep = SourceReport {
            source: slug.to_string(),
            fetched: items.len(),
            ..Default::default()
        };

        // Session lives until the end of this function, on every path.
        let mut session = match self.store.session().await {
            Ok(s) => s,
            Err(e) => {
                error!(target: "fetcher", source = slug, error = %e, "could not open store session");
                counter!("store_errors_total").increment(1);
                rep.session_failed = true;
                return rep;
            }
        };

        for item in items {
            let id = item.id.clone();
            match self.classifier.classify_and_save(item, session.as_mut()).await {
                Ok(saved) => {
                    rep.persisted += 1;
                    if saved.importance_score.is_none() {
                        rep.unscored += 1;
                    }
                }
                Err(e) => {
                    counter!("store_errors_total").increment(1);
                    error!(target: "fetcher", source = slug, %id, error = %e, "item write failed");
                    rep.store_errors += 1;
                }
            }
        }
        rep
    }

    /// Periodic loop: cycle, sleep, repeat until `shutdown` turns true (or its
    /// sender is dropped). Checked between sources and during the sleep.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        info!(
            target: "fetcher",
            interval_secs = self.interval.as_secs(),
            "periodic fetcher started"
        );
        loop {
            if *shutdown.borrow() {
                break;
            }
            let report = self.cycle(Some(&shutdown)).await;
            if report.cancelled || sleep_or_shutdown(self.interval, &mut shutdown).await {
                break;
            }
        }
        info!(target: "fetcher", "periodic fetcher stopped");
    }
}

/// Sleep for `dur`. Returns true if shutdown was requested first.
async fn sleep_or_shutdown(dur: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    let sleep = tokio::time::sleep(dur);
    tokio::pin!(sleep);
    loop {
        tokio::select! {
            _ = &mut sleep => return false,
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    return true;
                }
            }
        }
    }
}

/// Spawn the periodic loop on the tokio runtime.
pub fn spawn_periodic(fetcher: Arc<Fetcher>, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
    tokio::spawn(fetcher.run(shutdown))
}
