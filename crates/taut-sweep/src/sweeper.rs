use jiff::Timestamp;
use std::sync::Arc;
use taut_cache::spawn_invalidate;
use taut_core::cache::LinkCache;
use taut_core::config::LinkConfig;
use taut_core::error::StoreError;
use taut_core::store::LinkStore;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Periodic batch deletion of outdated links.
///
/// Each run deletes every link whose absolute expiry has passed, plus
/// every never-expiring link that has been neither updated nor used
/// within the inactivity TTL, in one store transaction. Cache entries of
/// deleted links are then invalidated fire-and-forget: the store commit
/// has already happened and an unreachable cache cannot undo it.
///
/// The sweeper is not a caller-visible component; its failures surface
/// only through logging.
pub struct Sweeper<S, C> {
    store: Arc<S>,
    cache: Arc<C>,
    config: LinkConfig,
}

impl<S: LinkStore, C: LinkCache> Sweeper<S, C> {
    pub fn new(store: Arc<S>, cache: Arc<C>, config: LinkConfig) -> Self {
        Self {
            store,
            cache,
            config,
        }
    }

    /// Runs one sweep and returns how many links were deleted.
    pub async fn sweep_once(&self) -> Result<usize, StoreError> {
        let removed = self
            .store
            .delete_outdated(Timestamp::now(), self.config.inactivity_ttl)
            .await?;

        info!(outdated = removed.len(), "Sweep completed");

        for link in &removed {
            info!(code = %link.short_code, "Deleting outdated link");
            spawn_invalidate(
                Arc::clone(&self.cache),
                Some(link.short_code.clone()),
                Some(link.long_url.clone()),
            );
        }

        Ok(removed.len())
    }

    /// Spawns the sweep loop on the configured interval.
    ///
    /// Runs until the returned handle is aborted or the runtime shuts
    /// down. Sweep errors are logged and the loop keeps going.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.config.sweep_interval);
            // The first tick fires immediately; skip it so a freshly
            // started process does not sweep before serving traffic.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(e) = self.sweep_once().await {
                    error!(error = %e, "Sweep failed; will retry next interval");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::SignedDuration;
    use std::time::Duration;
    use taut_cache::MokaLinkCache;
    use taut_core::cache::CacheKey;
    use taut_core::link::NewLink;
    use taut_storage::InMemoryLinkStore;

    fn sweeper(
        store: Arc<InMemoryLinkStore>,
        cache: Arc<MokaLinkCache>,
    ) -> Sweeper<InMemoryLinkStore, MokaLinkCache> {
        let config = LinkConfig::builder()
            .generation_secret("s3cret")
            .sweep_interval(Duration::from_millis(20))
            .build();
        Sweeper::new(store, cache, config)
    }

    fn new_link(code: &str, url: &str, expires_at: Option<Timestamp>) -> NewLink {
        NewLink {
            short_code: code.to_string(),
            long_url: url.to_string(),
            author_id: None,
            expires_at,
        }
    }

    #[tokio::test]
    async fn removes_expired_and_invalidates_their_cache_entries() {
        let store = Arc::new(InMemoryLinkStore::new());
        let cache = Arc::new(MokaLinkCache::default());

        let past = Timestamp::now() - SignedDuration::from_secs(120);
        store
            .insert(new_link("dead42", "https://dead.example", Some(past)))
            .await
            .unwrap();
        store
            .insert(new_link("live42", "https://live.example", None))
            .await
            .unwrap();

        cache
            .set(
                &CacheKey::Redirect("dead42"),
                "https://dead.example",
                Duration::from_secs(300),
            )
            .await
            .unwrap();

        let removed = sweeper(Arc::clone(&store), Arc::clone(&cache))
            .sweep_once()
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert!(store.get_by_code("dead42").await.unwrap().is_none());
        assert!(store.get_by_code("live42").await.unwrap().is_some());

        // Invalidation is spawned; give it a beat.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(cache
            .get(&CacheKey::Redirect("dead42"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn empty_sweep_is_fine() {
        let store = Arc::new(InMemoryLinkStore::new());
        let cache = Arc::new(MokaLinkCache::default());

        let removed = sweeper(store, cache).sweep_once().await.unwrap();
        assert_eq!(removed, 0);
    }

    #[tokio::test]
    async fn spawned_loop_sweeps_on_its_interval() {
        let store = Arc::new(InMemoryLinkStore::new());
        let cache = Arc::new(MokaLinkCache::default());

        let past = Timestamp::now() - SignedDuration::from_secs(120);
        store
            .insert(new_link("dead42", "https://dead.example", Some(past)))
            .await
            .unwrap();

        let handle = sweeper(Arc::clone(&store), cache).spawn();
        tokio::time::sleep(Duration::from_millis(80)).await;
        handle.abort();

        assert!(store.get_by_code("dead42").await.unwrap().is_none());
    }
}
