use async_trait::async_trait;
use moka::future::Cache;
use std::time::Duration;
use tracing::info;

use crate::services::content_store::{CacheTier, DocKey, StoreError};

/// In-process cache tier.
///
/// Entries expire a fixed time after their last write; reads do not extend them.
pub struct MokaCacheTier {
    cache: Cache<DocKey, String>,
}

impl MokaCacheTier {
    pub fn new(ttl: Duration, max_capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(ttl)
            .build();
        info!("In-process document cache initialized (ttl {:?})", ttl);
        Self { cache }
    }
}

impl Default for MokaCacheTier {
    fn default() -> Self {
        Self::new(Duration::from_secs(60 * 60), 100_000)
    }
}

#[async_trait]
impl CacheTier for MokaCacheTier {
    async fn get(&self, key: &DocKey) -> Result<Option<String>, StoreError> {
        Ok(self.cache.get(key).await)
    }

    async fn set(&self, key: &DocKey, content: String) -> Result<(), StoreError> {
        self.cache.insert(key.clone(), content).await;
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<DocKey>, StoreError> {
        Ok(self.cache.iter().map(|(key, _)| (*key).clone()).collect())
    }
}
