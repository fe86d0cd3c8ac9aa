// src/store/mod.rs
//! Item store contract.
//!
//! Writes go through a [`StoreSession`], an exclusive handle acquired per
//! source (or per ingest batch) and released when dropped. Reads go straight
//! to the store.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use std::cmp::Ordering;
use std::sync::Arc;

use crate::error::StoreError;
use crate::model::ScoredItem;

pub use memory::MemoryItemStore;
pub use sqlite::SqliteItemStore;

#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Acquire a write session. Never shared across sources or cycles.
    async fn session(&self) -> Result<Box<dyn StoreSession>, StoreError>;

    /// Every `is_filtered` record, `final_score` descending, ties by `id`.
    async fn query_filtered_sorted(&self) -> Result<Vec<ScoredItem>, StoreError>;

    async fn get(&self, id: &str) -> Result<Option<ScoredItem>, StoreError>;

    async fn count(&self) -> Result<u64, StoreError>;
}

#[async_trait]
pub trait StoreSession: Send {
    /// Atomic insert-or-replace keyed by `item.id`.
    async fn upsert(&mut self, item: &ScoredItem) -> Result<(), StoreError>;
}

pub type DynStore = Arc<dyn ItemStore>;

/// Retrieval order: higher `final_score` first, missing scores last, then `id`.
pub fn ranking_order(a: &ScoredItem, b: &ScoredItem) -> Ordering {
    match (a.final_score, b.final_score) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| a.id.cmp(&b.id))
}
