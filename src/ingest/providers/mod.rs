// src/ingest/providers/mod.rs
pub mod rss;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::config::AppConfig;
use crate::ingest::types::SourceProvider;

pub use rss::FeedSource;

/// Adapters in fixed visiting order.
pub type SourceRegistry = Vec<Arc<dyn SourceProvider>>;

/// Build the feed registry from config, sharing one HTTP client.
pub fn build_registry(cfg: &AppConfig) -> Result<SourceRegistry> {
    let client = reqwest::Client::builder()
        .user_agent(cfg.http_user_agent.as_str())
        .connect_timeout(Duration::from_secs(5))
        .timeout(Duration::from_secs(20))
        .build()
        .context("building feed http client")?;

    Ok(cfg
        .sources
        .iter()
        .map(|s| {
            Arc::new(FeedSource::from_url(&s.slug, &s.url, client.clone())) as Arc<dyn SourceProvider>
        })
        .collect())
}
