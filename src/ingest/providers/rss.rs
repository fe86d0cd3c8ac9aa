// src/ingest/providers/rss.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::histogram;
use tracing::warn;

use crate::error::SourceFetchError;
use crate::ingest::feed::{parse_feed, FeedEntry};
use crate::ingest::types::SourceProvider;
use crate::model::ItemIngest;

/// A feed adapter for RSS 2.0 and Atom documents.
pub struct FeedSource {
    slug: String,
    mode: Mode,
}

enum Mode {
    // Owned copy so tests can pass any &str.
    Fixture(String),
    Http {
        url: String,
        client: reqwest::Client,
    },
}

impl FeedSource {
    pub fn from_fixture(slug: &str, xml: &str) -> Self {
        Self {
            slug: slug.to_string(),
            mode: Mode::Fixture(xml.to_string()),
        }
    }

    pub fn from_url(slug: &str, url: &str, client: reqwest::Client) -> Self {
        Self {
            slug: slug.to_string(),
            mode: Mode::Http {
                url: url.to_string(),
                client,
            },
        }
    }

    fn parse_items_from_str(&self, xml: &str) -> Result<Vec<ItemIngest>, SourceFetchError> {
        let t0 = std::time::Instant::now();
        let entries = parse_feed(xml)?;
        let items = entries_to_items(&self.slug, entries, Utc::now());
        histogram!("ingest_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        Ok(items)
    }
}

/// Convert parsed entries to ingest records. Entries without an id or a title
/// are dropped one by one; a missing date falls back to `fetched_at`.
pub fn entries_to_items(
    slug: &str,
    entries: Vec<FeedEntry>,
    fetched_at: DateTime<Utc>,
) -> Vec<ItemIngest> {
    let mut out = Vec::with_capacity(entries.len());
    for e in entries {
        let Some(id) = e.id else {
            warn!(target: "ingest", source = slug, "skipping entry with no id or link");
            continue;
        };
        if e.title.is_empty() {
            warn!(target: "ingest", source = slug, %id, "skipping entry with empty title");
            continue;
        }
        out.push(ItemIngest {
            id,
            source: slug.to_string(),
            title: e.title,
            body: e.body,
            published_at: e.published.unwrap_or(fetched_at),
        });
    }
    out
}

#[async_trait]
impl SourceProvider for FeedSource {
    fn slug(&self) -> &str {
        &self.slug
    }

    async fn fetch_latest(&self) -> Result<Vec<ItemIngest>, SourceFetchError> {
        match &self.mode {
            Mode::Fixture(s) => self.parse_items_from_str(s),
            Mode::Http { url, client } => {
                let resp = client.get(url.as_str()).send().await?;
                if !resp.status().is_success() {
                    return Err(SourceFetchError::Status(resp.status().as_u16()));
                }
                let body = resp.text().await?;
                self.parse_items_from_str(&body)
            }
        }
    }
}
