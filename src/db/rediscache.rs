use async_trait::async_trait;
use tracing::{debug, warn};

use crate::services::content_store::{CacheTier, DocKey, StoreError};

const KEY_PATTERN: &str = "doc:*:*:content";

/// Redis-backed cache tier, keyed `doc:{roomCode}:{docId}:content`
pub struct RedisCacheTier {
    client: redis::Client,
    /// TTL in seconds, refreshed on every write
    ttl_seconds: u64,
}

impl RedisCacheTier {
    pub fn new(redis_url: &str, ttl_seconds: u64) -> Result<Self, StoreError> {
        let client = redis::Client::open(redis_url).map_err(|e| StoreError::Cache(e.to_string()))?;
        Ok(Self { client, ttl_seconds })
    }

    async fn get_connection(&self) -> Result<redis::aio::MultiplexedConnection, StoreError> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| StoreError::Cache(format!("Redis connection failed: {}", e)))
    }
}

#[async_trait]
impl CacheTier for RedisCacheTier {
    async fn get(&self, key: &DocKey) -> Result<Option<String>, StoreError> {
        let mut conn = self.get_connection().await?;
        redis::cmd("GET")
            .arg(key.to_string())
            .query_async(&mut conn)
            .await
            .map_err(|e| StoreError::Cache(format!("Redis GET failed: {}", e)))
    }

    async fn set(&self, key: &DocKey, content: String) -> Result<(), StoreError> {
        let mut conn = self.get_connection().await?;
        redis::cmd("SETEX")
            .arg(key.to_string())
            .arg(self.ttl_seconds)
            .arg(content)
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| StoreError::Cache(format!("Redis SETEX failed: {}", e)))?;
        debug!("Cached {} for {}s", key, self.ttl_seconds);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<DocKey>, StoreError> {
        let mut conn = self.get_connection().await?;
        let raw: Vec<String> = redis::cmd("KEYS")
            .arg(KEY_PATTERN)
            .query_async(&mut conn)
            .await
            .map_err(|e| StoreError::Cache(format!("Redis KEYS failed: {}", e)))?;

        Ok(raw
            .iter()
            .filter_map(|k| match DocKey::parse(k) {
                Ok(key) => Some(key),
                Err(e) => {
                    warn!("Ignoring cache key: {}", e);
                    None
                }
            })
            .collect())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.get_connection().await?;
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(|e| StoreError::Cache(format!("Redis PING failed: {}", e)))?;
        Ok(())
    }
}
