// SPDX-License-Identifier: Apache-2.0

use crate::store::{SheetDoc, SheetStoreBackend, StoreError};
use shiftbook_model::SheetSnapshot;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct SheetCacheConfig {
    /// Zero disables caching entirely; every read hits the backend.
    pub ttl: Duration,
    pub max_entries: usize,
}

impl Default for SheetCacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(30),
            max_entries: 32,
        }
    }
}

#[derive(Clone)]
struct CachedSheet {
    snapshot: SheetSnapshot,
    fetched_at: Instant,
}

/// Snapshot cache in front of the spreadsheet backend, keyed by worksheet.
/// Writes pass through and drop the touched sheet's entry so the next read
/// observes them.
pub struct SheetCacheManager {
    backend: Arc<dyn SheetStoreBackend>,
    cfg: SheetCacheConfig,
    entries: Mutex<HashMap<(SheetDoc, String), CachedSheet>>,
    pub hits: AtomicU64,
    pub misses: AtomicU64,
}

impl SheetCacheManager {
    pub fn new(backend: Arc<dyn SheetStoreBackend>, cfg: SheetCacheConfig) -> Self {
        Self {
            backend,
            cfg,
            entries: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub async fn sheet(&self, doc: SheetDoc, title: &str) -> Result<SheetSnapshot, StoreError> {
        let key = (doc, title.to_string());
        if !self.cfg.ttl.is_zero() {
            let mut entries = self.entries.lock().await;
            entries.retain(|_, v| v.fetched_at.elapsed() <= self.cfg.ttl);
            if let Some(entry) = entries.get(&key) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(entry.snapshot.clone());
            }
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        let snapshot = self.backend.fetch_sheet(doc, title).await?;
        if !self.cfg.ttl.is_zero() {
            let mut entries = self.entries.lock().await;
            if entries.len() >= self.cfg.max_entries {
                if let Some(victim) = entries
                    .iter()
                    .min_by_key(|(_, v)| v.fetched_at)
                    .map(|(k, _)| k.clone())
                {
                    debug!(sheet = %victim.1, "evicting oldest cached sheet");
                    entries.remove(&victim);
                }
            }
            entries.insert(
                key,
                CachedSheet {
                    snapshot: snapshot.clone(),
                    fetched_at: Instant::now(),
                },
            );
        }
        Ok(snapshot)
    }

    pub async fn invalidate(&self, doc: SheetDoc, title: &str) {
        self.entries
            .lock()
            .await
            .remove(&(doc, title.to_string()));
    }

    pub async fn update_cell(
        &self,
        doc: SheetDoc,
        title: &str,
        row: usize,
        col: usize,
        value: &str,
    ) -> Result<(), StoreError> {
        self.backend.update_cell(doc, title, row, col, value).await?;
        self.invalidate(doc, title).await;
        Ok(())
    }

    pub async fn append_row(
        &self,
        doc: SheetDoc,
        title: &str,
        values: &[String],
    ) -> Result<(), StoreError> {
        self.backend.append_row(doc, title, values).await?;
        self.invalidate(doc, title).await;
        Ok(())
    }

    pub async fn read_note(
        &self,
        doc: SheetDoc,
        title: &str,
        row: usize,
        col: usize,
    ) -> Result<Option<String>, StoreError> {
        self.backend.read_note(doc, title, row, col).await
    }

    pub async fn write_note(
        &self,
        doc: SheetDoc,
        title: &str,
        row: usize,
        col: usize,
        note: &str,
    ) -> Result<(), StoreError> {
        self.backend.write_note(doc, title, row, col, note).await?;
        self.invalidate(doc, title).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::FakeSheetStore;

    fn sheet_rows() -> Vec<Vec<String>> {
        vec![vec!["사번".to_string()], vec!["1042".to_string()]]
    }

    #[tokio::test]
    async fn second_read_within_ttl_is_served_from_cache() {
        let store = Arc::new(FakeSheetStore::default());
        store.seed(SheetDoc::Work, "1월", sheet_rows()).await;
        let cache = SheetCacheManager::new(store.clone(), SheetCacheConfig::default());

        cache.sheet(SheetDoc::Work, "1월").await.expect("fetch");
        cache.sheet(SheetDoc::Work, "1월").await.expect("fetch");
        assert_eq!(store.fetch_calls.load(Ordering::Relaxed), 1);
        assert_eq!(cache.hits.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn zero_ttl_disables_caching() {
        let store = Arc::new(FakeSheetStore::default());
        store.seed(SheetDoc::Work, "1월", sheet_rows()).await;
        let cfg = SheetCacheConfig {
            ttl: Duration::ZERO,
            ..SheetCacheConfig::default()
        };
        let cache = SheetCacheManager::new(store.clone(), cfg);

        cache.sheet(SheetDoc::Work, "1월").await.expect("fetch");
        cache.sheet(SheetDoc::Work, "1월").await.expect("fetch");
        assert_eq!(store.fetch_calls.load(Ordering::Relaxed), 2);
    }

    #[tokio::test]
    async fn cell_write_invalidates_only_the_touched_sheet() {
        let store = Arc::new(FakeSheetStore::default());
        store.seed(SheetDoc::Work, "1월", sheet_rows()).await;
        store.seed(SheetDoc::Work, "2월", sheet_rows()).await;
        let cache = SheetCacheManager::new(store.clone(), SheetCacheConfig::default());

        cache.sheet(SheetDoc::Work, "1월").await.expect("fetch");
        cache.sheet(SheetDoc::Work, "2월").await.expect("fetch");
        cache
            .update_cell(SheetDoc::Work, "1월", 2, 1, "2077")
            .await
            .expect("write");

        let fresh = cache.sheet(SheetDoc::Work, "1월").await.expect("fetch");
        assert_eq!(fresh.cell(1, 0), "2077");
        cache.sheet(SheetDoc::Work, "2월").await.expect("fetch");
        // 1월 twice, 2월 once.
        assert_eq!(store.fetch_calls.load(Ordering::Relaxed), 3);
    }

    #[tokio::test]
    async fn capacity_evicts_the_oldest_entry() {
        let store = Arc::new(FakeSheetStore::default());
        for title in ["1월", "2월", "3월"] {
            store.seed(SheetDoc::Work, title, sheet_rows()).await;
        }
        let cfg = SheetCacheConfig {
            max_entries: 2,
            ..SheetCacheConfig::default()
        };
        let cache = SheetCacheManager::new(store.clone(), cfg);

        cache.sheet(SheetDoc::Work, "1월").await.expect("fetch");
        cache.sheet(SheetDoc::Work, "2월").await.expect("fetch");
        cache.sheet(SheetDoc::Work, "3월").await.expect("fetch");
        // 1월 was evicted, so this is a miss.
        cache.sheet(SheetDoc::Work, "1월").await.expect("fetch");
        assert_eq!(store.fetch_calls.load(Ordering::Relaxed), 4);
    }
}
