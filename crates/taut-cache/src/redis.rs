use async_trait::async_trait;
use redis::AsyncCommands;
use std::time::Duration;
use taut_core::cache::{CacheKey, LinkCache, Result};
use taut_core::error::CacheError;
use tracing::{debug, trace, warn};

/// A Redis-based implementation of [`LinkCache`].
///
/// Values are stored as plain strings under prefixed keys, each with its
/// own TTL. The multiplexed connection is a cheap-to-clone shared handle,
/// safe for concurrent use.
#[derive(Debug, Clone)]
pub struct RedisLinkCache {
    conn: redis::aio::MultiplexedConnection,
    key_prefix: String,
}

fn map_redis_error(operation: &str, err: redis::RedisError) -> CacheError {
    let message = format!("{operation}: {err}");
    if message.to_ascii_lowercase().contains("timed out") {
        CacheError::Timeout(message)
    } else {
        CacheError::Operation(message)
    }
}

impl RedisLinkCache {
    /// Creates a new Redis link cache.
    pub fn new(conn: redis::aio::MultiplexedConnection) -> Self {
        Self {
            conn,
            key_prefix: "taut:".to_string(),
        }
    }

    /// Creates a new Redis link cache with a custom key prefix.
    pub fn with_prefix(
        conn: redis::aio::MultiplexedConnection,
        key_prefix: impl Into<String>,
    ) -> Self {
        Self {
            conn,
            key_prefix: key_prefix.into(),
        }
    }

    fn storage_key(&self, key: &CacheKey<'_>) -> String {
        format!("{}{}", self.key_prefix, key.render())
    }
}

#[async_trait]
impl LinkCache for RedisLinkCache {
    async fn get(&self, key: &CacheKey<'_>) -> Result<Option<String>> {
        let storage_key = self.storage_key(key);
        trace!(key = %key, "Fetching value from Redis cache");

        let mut conn = self.conn.clone();
        match conn.get::<_, Option<String>>(&storage_key).await {
            Ok(Some(value)) => {
                debug!(key = %key, "Cache hit in Redis");
                Ok(Some(value))
            }
            Ok(None) => {
                trace!(key = %key, "Cache miss in Redis");
                Ok(None)
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Redis error on get");
                Err(map_redis_error("failed to fetch value from Redis", e))
            }
        }
    }

    async fn set(&self, key: &CacheKey<'_>, value: &str, ttl: Duration) -> Result<()> {
        let storage_key = self.storage_key(key);
        trace!(key = %key, ttl = ?ttl, "Storing value in Redis cache");

        let mut conn = self.conn.clone();
        match conn
            .set_ex::<_, _, ()>(&storage_key, value, ttl.as_secs())
            .await
        {
            Ok(()) => {
                debug!(key = %key, "Cached value in Redis");
                Ok(())
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to cache value in Redis");
                Err(map_redis_error("failed to write value to Redis", e))
            }
        }
    }

    async fn del(&self, key: &CacheKey<'_>) -> Result<()> {
        let storage_key = self.storage_key(key);
        trace!(key = %key, "Removing value from Redis cache");

        let mut conn = self.conn.clone();
        match conn.del::<_, ()>(&storage_key).await {
            Ok(()) => {
                debug!(key = %key, "Removed value from Redis cache");
                Ok(())
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to remove value from Redis cache");
                Err(map_redis_error("failed to delete value from Redis", e))
            }
        }
    }
}
