// src/ingest/types.rs
use async_trait::async_trait;

use crate::error::SourceFetchError;
use crate::model::ItemIngest;

/// One feed. Implementations report failures as `Err`; callers go through
/// [`crate::ingest::fetch_isolated`], which turns any failure into an empty
/// result so a broken feed never blocks the others.
#[async_trait]
pub trait SourceProvider: Send + Sync {
    /// Unique slug; partition key and `source` of every emitted item.
    fn slug(&self) -> &str;

    /// Latest items in feed order. Entries without an id are already dropped.
    async fn fetch_latest(&self) -> Result<Vec<ItemIngest>, SourceFetchError>;
}
