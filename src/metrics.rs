// src/metrics.rs
use anyhow::{Context, Result};
use axum::{routing::get, Router};
use metrics::gauge;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

/// Millisecond buckets shared by the cycle and parse timings.
const TIMING_BUCKETS_MS: &[f64] = &[
    5.0, 25.0, 100.0, 250.0, 1_000.0, 5_000.0, 15_000.0, 60_000.0,
];

pub struct Metrics {
    pub handle: PrometheusHandle,
}

fn builder() -> Result<PrometheusBuilder> {
    let mut b = PrometheusBuilder::new();
    for name in ["fetch_cycle_ms", "ingest_parse_ms"] {
        b = b
            .set_buckets_for_metric(Matcher::Full(name.to_string()), TIMING_BUCKETS_MS)
            .with_context(|| format!("prometheus: buckets for {name}"))?;
    }
    Ok(b)
}

impl Metrics {
    /// Install the global Prometheus recorder and publish the configured fetch interval.
    pub fn init(fetch_interval_secs: u64) -> Result<Self> {
        let handle = builder()?
            .install_recorder()
            .context("prometheus: install recorder")?;

        gauge!("fetch_interval_secs").set(fetch_interval_secs as f64);

        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
