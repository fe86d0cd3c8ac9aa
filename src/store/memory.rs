// src/store/memory.rs
//! In-memory [`ItemStore`] used by tests and throwaway local runs.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{ranking_order, ItemStore, StoreSession};
use crate::error::StoreError;
use crate::model::ScoredItem;

#[derive(Default)]
struct Inner {
    items: Mutex<BTreeMap<String, ScoredItem>>,
    sessions_opened: AtomicUsize,
    upserts: AtomicUsize,
    fail_writes: AtomicBool,
}

/// Cheap to clone; clones share the same records and counters.
#[derive(Clone, Default)]
pub struct MemoryItemStore {
    inner: Arc<Inner>,
}

impl MemoryItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sessions_opened(&self) -> usize {
        self.inner.sessions_opened.load(Ordering::SeqCst)
    }

    pub fn upserts(&self) -> usize {
        self.inner.upserts.load(Ordering::SeqCst)
    }

    /// Make every subsequent upsert fail with `StoreError::Unavailable`.
    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, ScoredItem>>, StoreError> {
        self.inner
            .items
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store mutex poisoned".into()))
    }
}

struct MemorySession {
    inner: Arc<Inner>,
}

#[async_trait]
impl StoreSession for MemorySession {
    async fn upsert(&mut self, item: &ScoredItem) -> Result<(), StoreError> {
        self.inner.upserts.fetch_add(1, Ordering::SeqCst);
        if self.inner.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("writes disabled".into()));
        }
        let mut items = self
            .inner
            .items
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store mutex poisoned".into()))?;
        items.insert(item.id.clone(), item.clone());
        Ok(())
    }
}

#[async_trait]
impl ItemStore for MemoryItemStore {
    async fn session(&self) -> Result<Box<dyn StoreSession>, StoreError> {
        self.inner.sessions_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemorySession {
            inner: Arc::clone(&self.inner),
        }))
    }

    async fn query_filtered_sorted(&self) -> Result<Vec<ScoredItem>, StoreError> {
        let items = self.lock()?;
        let mut out: Vec<ScoredItem> = items.values().filter(|i| i.is_filtered).cloned().collect();
        out.sort_by(ranking_order);
        Ok(out)
    }

    async fn get(&self, id: &str) -> Result<Option<ScoredItem>, StoreError> {
        Ok(self.lock()?.get(id).cloned())
    }

    async fn count(&self) -> Result<u64, StoreError> {
        Ok(self.lock()?.len() as u64)
    }
}
