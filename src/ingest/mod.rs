// src/ingest/mod.rs
pub mod feed;
pub mod providers;
pub mod scheduler;
pub mod types;

use crate::ingest::types::SourceProvider;
use crate::model::ItemIngest;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_items_total", "Items emitted by source adapters.");
        describe_counter!(
            "ingest_provider_errors_total",
            "Source fetch/parse errors (source yielded nothing)."
        );
        describe_counter!("items_scored_total", "Items classified successfully.");
        describe_counter!(
            "classification_failures_total",
            "Items persisted unscored after a scorer failure."
        );
        describe_counter!("store_errors_total", "Failed item writes.");
        describe_counter!("fetch_cycles_total", "Completed fetch cycles.");
        describe_histogram!("ingest_parse_ms", "Feed parse time in milliseconds.");
        describe_histogram!("fetch_cycle_ms", "Fetch cycle wall time in milliseconds.");
        describe_gauge!("fetch_last_run_ts", "Unix ts when the last fetch cycle finished.");
    });
}

/// Turn feed markup into plain text: decode entities, strip tags, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    // 3) Collapse whitespace
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    re_ws.replace_all(&out, " ").trim().to_string()
}

/// Call an adapter with failure isolation: any error is logged and counted,
/// and the source contributes nothing to this cycle. Every returned item
/// carries the adapter's slug as its `source`.
pub async fn fetch_isolated(provider: &dyn SourceProvider) -> Vec<ItemIngest> {
    ensure_metrics_described();
    let slug = provider.slug();
    match provider.fetch_latest().await {
        Ok(mut items) => {
            for it in &mut items {
                if it.source != slug {
                    it.source = slug.to_string();
                }
            }
            counter!("ingest_items_total").increment(items.len() as u64);
            tracing::info!(target: "ingest", source = slug, fetched = items.len(), "source fetched");
            items
        }
        Err(e) => {
            counter!("ingest_provider_errors_total").increment(1);
            tracing::error!(target: "ingest", source = slug, error = %e, "source fetch failed");
            Vec::new()
        }
    }
}
