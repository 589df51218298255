use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::models::Document;

/// Identifies one document's content within a room
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DocKey {
    pub room_code: String,
    pub doc_id: i64,
}

impl DocKey {
    pub fn new(room_code: impl Into<String>, doc_id: i64) -> Self {
        Self { room_code: room_code.into(), doc_id }
    }

    /// Parse the `doc:{roomCode}:{docId}:content` form used by the cache tier
    pub fn parse(raw: &str) -> Result<Self, StoreError> {
        let inner = raw
            .strip_prefix("doc:")
            .and_then(|rest| rest.strip_suffix(":content"))
            .ok_or_else(|| StoreError::InvalidKey(raw.to_string()))?;
        let (room_code, doc_id) = inner
            .rsplit_once(':')
            .ok_or_else(|| StoreError::InvalidKey(raw.to_string()))?;
        let doc_id = doc_id
            .parse::<i64>()
            .map_err(|_| StoreError::InvalidKey(raw.to_string()))?;
        if room_code.is_empty() {
            return Err(StoreError::InvalidKey(raw.to_string()));
        }
        Ok(Self::new(room_code, doc_id))
    }
}

impl fmt::Display for DocKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "doc:{}:{}:content", self.room_code, self.doc_id)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("cache tier error: {0}")]
    Cache(String),
    #[error("durable tier error: {0}")]
    Durable(#[from] sqlx::Error),
    #[error("invalid document key '{0}'")]
    InvalidKey(String),
}

/// Fast, TTL-bounded tier holding the in-flight content of active documents
#[async_trait]
pub trait CacheTier: Send + Sync {
    async fn get(&self, key: &DocKey) -> Result<Option<String>, StoreError>;

    /// Overwrite the entry, refreshing its TTL
    async fn set(&self, key: &DocKey, content: String) -> Result<(), StoreError>;

    /// Every live document key
    async fn keys(&self) -> Result<Vec<DocKey>, StoreError>;

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Persistent tier, reconciled from the cache tier by the background sync
#[async_trait]
pub trait DurableTier: Send + Sync {
    async fn load_content(&self, key: &DocKey) -> Result<Option<String>, StoreError>;

    /// Update an existing document's content. Unknown documents are left alone.
    async fn save_content(&self, key: &DocKey, content: &str) -> Result<(), StoreError>;

    async fn create_document(&self, room_code: &str, title: &str, content: &str) -> Result<i64, StoreError>;

    async fn list_documents(&self, room_code: &str) -> Result<Vec<Document>, StoreError>;
}

/// Outcome of one cache -> durable sweep
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    pub synced: usize,
    pub failed: usize,
}

/// Two-tier content store.
///
/// The cache entry of a document is the source of truth for edits while present. The durable
/// tier is only written by [`ContentStore::sync_to_durable`], so it lags the cache by at most
/// one sync interval. Per-key get/set are atomic but there is no check-and-set: concurrent
/// get -> apply -> set sequences on one document race and the last `set` wins.
pub struct ContentStore {
    cache: Arc<dyn CacheTier>,
    durable: Arc<dyn DurableTier>,
}

impl ContentStore {
    pub fn new(cache: Arc<dyn CacheTier>, durable: Arc<dyn DurableTier>) -> Self {
        Self { cache, durable }
    }

    pub fn durable(&self) -> &Arc<dyn DurableTier> {
        &self.durable
    }

    /// Current content of a document. Never fails: absence reads as an empty document.
    pub async fn get(&self, room_code: &str, doc_id: i64) -> String {
        let key = DocKey::new(room_code, doc_id);

        match self.cache.get(&key).await {
            Ok(Some(content)) => return content,
            Ok(None) => debug!("Cache miss for {}", key),
            Err(e) => warn!("Cache read failed for {}: {}", key, e),
        }

        let content = match self.durable.load_content(&key).await {
            Ok(Some(content)) => content,
            Ok(None) => {
                // New or never synced document, it reaches the durable tier on a later sweep
                info!("Document {} not found in durable tier, starting empty", key);
                String::new()
            }
            Err(e) => {
                // Not cached, so the next sweep cannot overwrite stored content with ""
                error!("Durable read failed for {}: {}", key, e);
                return String::new();
            }
        };

        if let Err(e) = self.cache.set(&key, content.clone()).await {
            warn!("Failed to populate cache for {}: {}", key, e);
        }
        content
    }

    /// Overwrite the cached content. The durable tier is left to the background sync.
    pub async fn set(&self, room_code: &str, doc_id: i64, content: String) -> Result<(), StoreError> {
        let key = DocKey::new(room_code, doc_id);
        self.cache.set(&key, content).await
    }

    /// Write every live cache entry to the durable tier. Individual failures do not abort
    /// the sweep.
    pub async fn sync_to_durable(&self) -> Result<SyncReport, StoreError> {
        let keys = self.cache.keys().await?;
        let mut report = SyncReport::default();

        for key in keys {
            let content = match self.cache.get(&key).await {
                Ok(Some(content)) => content,
                // Expired between enumeration and read
                Ok(None) => continue,
                Err(e) => {
                    warn!("Skipping {} during sync: {}", key, e);
                    report.failed += 1;
                    continue;
                }
            };

            match self.durable.save_content(&key, &content).await {
                Ok(()) => report.synced += 1,
                Err(e) => {
                    warn!("Failed to sync {} to durable tier: {}", key, e);
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    pub async fn is_ready(&self) -> bool {
        self.cache.ping().await.is_ok()
    }

    /// Number of live cache entries
    pub async fn cached_count(&self) -> usize {
        self.cache.keys().await.map(|keys| keys.len()).unwrap_or(0)
    }
}


#[cfg(test)]
mod tests {
    use super::testing::FlakyCache;
    use super::*;
    use crate::db::memdocs::MemoryDocStore;
    use crate::db::mokacache::MokaCacheTier;
    use std::sync::atomic::Ordering;

    fn store() -> (ContentStore, Arc<MokaCacheTier>, Arc<MemoryDocStore>) {
        let cache = Arc::new(MokaCacheTier::default());
        let durable = Arc::new(MemoryDocStore::default());
        (ContentStore::new(cache.clone(), durable.clone()), cache, durable)
    }

    #[test]
    fn doc_key_round_trips_through_cache_form() {
        let key = DocKey::new("ABC123", 7);
        assert_eq!(key.to_string(), "doc:ABC123:7:content");
        assert_eq!(DocKey::parse("doc:ABC123:7:content").unwrap(), key);
    }

    #[test]
    fn doc_key_rejects_malformed_forms() {
        for raw in ["doc:ABC:x:content", "doc::1:content", "ABC:1", "doc:ABC:1:meta"] {
            assert!(DocKey::parse(raw).is_err(), "{raw} should not parse");
        }
    }

    #[tokio::test]
    async fn get_unknown_document_is_empty_and_cached() {
        let (store, cache, _) = store();
        assert_eq!(store.get("nowhere", 1).await, "");
        let cached = cache.get(&DocKey::new("nowhere", 1)).await.unwrap();
        assert_eq!(cached.as_deref(), Some(""));
    }

    #[tokio::test]
    async fn get_falls_back_to_durable_and_populates_cache() {
        let (store, cache, durable) = store();
        let id = durable.create_document("ROOM", "Notes", "# Notes\n\n").await.unwrap();
        assert_eq!(store.get("ROOM", id).await, "# Notes\n\n");
        let cached = cache.get(&DocKey::new("ROOM", id)).await.unwrap();
        assert_eq!(cached.as_deref(), Some("# Notes\n\n"));
    }

    #[tokio::test]
    async fn set_does_not_touch_durable_until_sync() {
        let (store, _, durable) = store();
        let id = durable.create_document("ROOM", "Notes", "old").await.unwrap();
        store.set("ROOM", id, "new".to_string()).await.unwrap();

        assert_eq!(store.get("ROOM", id).await, "new");
        let key = DocKey::new("ROOM", id);
        assert_eq!(durable.load_content(&key).await.unwrap().as_deref(), Some("old"));

        let report = store.sync_to_durable().await.unwrap();
        assert_eq!(report, SyncReport { synced: 1, failed: 0 });
        assert_eq!(durable.load_content(&key).await.unwrap().as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn sync_skips_documents_missing_from_durable() {
        let (store, _, durable) = store();
        store.set("ROOM", 42, "orphan".to_string()).await.unwrap();
        store.sync_to_durable().await.unwrap();
        assert!(durable.load_content(&DocKey::new("ROOM", 42)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn set_failure_surfaces_and_get_degrades_to_empty() {
        let cache = Arc::new(FlakyCache::default());
        let durable = Arc::new(MemoryDocStore::default());
        let store = ContentStore::new(cache.clone(), durable.clone());
        let id = durable.create_document("ROOM", "Doc", "persisted").await.unwrap();

        cache.failing.store(true, Ordering::SeqCst);
        assert!(store.set("ROOM", id, "x".to_string()).await.is_err());
        // Durable tier still answers while the cache is down
        assert_eq!(store.get("ROOM", id).await, "persisted");
        assert!(store.sync_to_durable().await.is_err());
    }

    /// Durable tier refusing writes for one document
    struct RejectingDurable {
        inner: MemoryDocStore,
        rejected_id: i64,
    }

    #[async_trait]
    impl DurableTier for RejectingDurable {
        async fn load_content(&self, key: &DocKey) -> Result<Option<String>, StoreError> {
            self.inner.load_content(key).await
        }

        async fn save_content(&self, key: &DocKey, content: &str) -> Result<(), StoreError> {
            if key.doc_id == self.rejected_id {
                return Err(StoreError::Durable(sqlx::Error::PoolTimedOut));
            }
            self.inner.save_content(key, content).await
        }

        async fn create_document(&self, room_code: &str, title: &str, content: &str) -> Result<i64, StoreError> {
            self.inner.create_document(room_code, title, content).await
        }

        async fn list_documents(&self, room_code: &str) -> Result<Vec<Document>, StoreError> {
            self.inner.list_documents(room_code).await
        }
    }

    #[tokio::test]
    async fn one_failing_document_does_not_abort_the_sync() {
        let durable = Arc::new(RejectingDurable { inner: MemoryDocStore::default(), rejected_id: 2 });
        let store = ContentStore::new(Arc::new(MokaCacheTier::default()), durable.clone());
        for id in 1..=3 {
            let created = durable.create_document("ROOM", "Doc", "old").await.unwrap();
            store.set("ROOM", created, format!("new {id}")).await.unwrap();
        }

        let report = store.sync_to_durable().await.unwrap();
        assert_eq!(report, SyncReport { synced: 2, failed: 1 });

        for (id, expected) in [(1, "new 1"), (2, "old"), (3, "new 3")] {
            let stored = durable.inner.load_content(&DocKey::new("ROOM", id)).await.unwrap();
            assert_eq!(stored.as_deref(), Some(expected));
        }
    }

    #[tokio::test]
    async fn concurrent_edits_race_and_last_set_wins() {
        let (store, _, _) = store();
        store.set("ROOM", 1, "base".to_string()).await.unwrap();

        // Both writers read the same snapshot before either sets
        let a = store.get("ROOM", 1).await;
        let b = store.get("ROOM", 1).await;
        let a = crate::services::op_engine::apply(&a, &crate::models::Operation::insert(0, "A"));
        let b = crate::services::op_engine::apply(&b, &crate::models::Operation::insert(4, "B"));
        store.set("ROOM", 1, a).await.unwrap();
        store.set("ROOM", 1, b).await.unwrap();

        assert_eq!(store.get("ROOM", 1).await, "baseB");
    }
}
