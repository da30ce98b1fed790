use async_trait::async_trait;
use moka::future::Cache;
use moka::Expiry;
use std::time::{Duration, Instant};
use taut_core::cache::{CacheKey, LinkCache, Result};
use tracing::trace;

/// A cached value together with the TTL it was stored with.
#[derive(Debug, Clone)]
struct Entry {
    value: String,
    ttl: Duration,
}

/// Expires each entry after the TTL recorded at insert time.
struct PerEntryTtl;

impl Expiry<String, Entry> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        entry: &Entry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }
}

/// An in-process implementation of [`LinkCache`] backed by moka.
///
/// Used where a Redis deployment is not wanted (tests, single-node
/// setups). Operations are infallible; a lost entry only costs a store
/// round-trip on the next read.
#[derive(Debug, Clone)]
pub struct MokaLinkCache {
    cache: Cache<String, Entry>,
}

impl MokaLinkCache {
    /// Creates a cache bounded to `capacity` entries.
    pub fn with_capacity(capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(capacity)
            .expire_after(PerEntryTtl)
            .build();
        Self { cache }
    }
}

impl Default for MokaLinkCache {
    fn default() -> Self {
        Self::with_capacity(10_000)
    }
}

#[async_trait]
impl LinkCache for MokaLinkCache {
    async fn get(&self, key: &CacheKey<'_>) -> Result<Option<String>> {
        Ok(self.cache.get(&key.render()).await.map(|entry| entry.value))
    }

    async fn set(&self, key: &CacheKey<'_>, value: &str, ttl: Duration) -> Result<()> {
        trace!(key = %key, ttl = ?ttl, "Storing value in moka cache");
        self.cache
            .insert(
                key.render(),
                Entry {
                    value: value.to_string(),
                    ttl,
                },
            )
            .await;
        Ok(())
    }

    async fn del(&self, key: &CacheKey<'_>) -> Result<()> {
        self.cache.invalidate(&key.render()).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LONG_TTL: Duration = Duration::from_secs(300);

    #[tokio::test]
    async fn set_get_del_roundtrip() {
        let cache = MokaLinkCache::default();
        let key = CacheKey::Redirect("abc123");

        assert_eq!(cache.get(&key).await.unwrap(), None);

        cache.set(&key, "https://example.com", LONG_TTL).await.unwrap();
        assert_eq!(
            cache.get(&key).await.unwrap(),
            Some("https://example.com".to_string())
        );

        cache.del(&key).await.unwrap();
        assert_eq!(cache.get(&key).await.unwrap(), None);
    }

    #[tokio::test]
    async fn del_on_absent_key_is_ok() {
        let cache = MokaLinkCache::default();
        cache.del(&CacheKey::Stats("missing")).await.unwrap();
    }

    #[tokio::test]
    async fn entries_expire_on_their_own_ttl() {
        let cache = MokaLinkCache::default();
        let short = CacheKey::Redirect("short");
        let long = CacheKey::Redirect("long");

        cache
            .set(&short, "https://short.example", Duration::from_millis(50))
            .await
            .unwrap();
        cache.set(&long, "https://long.example", LONG_TTL).await.unwrap();

        tokio::time::sleep(Duration::from_millis(120)).await;

        assert_eq!(cache.get(&short).await.unwrap(), None);
        assert_eq!(
            cache.get(&long).await.unwrap(),
            Some("https://long.example".to_string())
        );
    }

    #[tokio::test]
    async fn namespaces_do_not_collide() {
        let cache = MokaLinkCache::default();

        cache
            .set(&CacheKey::Redirect("abc"), "url", LONG_TTL)
            .await
            .unwrap();
        assert_eq!(cache.get(&CacheKey::Stats("abc")).await.unwrap(), None);
    }
}
