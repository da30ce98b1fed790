use crate::error::Result;
use crate::generator::CodeGenerator;
use crate::service::LinkService;
use taut_core::cache::{CacheKey, LinkCache};
use taut_core::store::LinkStore;
use tracing::{debug, trace, warn};

/// The consistency-critical redirect read path.
///
/// Consults the cache first and falls back to the store on a miss,
/// repopulating the cache with a short TTL. Only the destination URL is
/// cached, never the whole response, so the redirect counter still
/// advances on every hit: the bump is deferred to a spawned task that
/// runs after the URL has been returned.
#[derive(Debug, Clone)]
pub struct Redirector<S, C, G> {
    links: LinkService<S, C, G>,
}

impl<S: LinkStore, C: LinkCache, G: CodeGenerator> Redirector<S, C, G> {
    pub fn new(links: LinkService<S, C, G>) -> Self {
        Self { links }
    }

    /// Resolves a short code to its destination URL.
    ///
    /// Cache errors degrade to a miss; the store remains authoritative.
    /// Fails with `NotFound` when the code does not exist, which the
    /// boundary turns into a not-found response.
    pub async fn redirect(&self, code: &str) -> Result<String> {
        let key = CacheKey::Redirect(code);

        let cached = match self.links.cache.get(&key).await {
            Ok(value) => value,
            Err(e) => {
                warn!(key = %key, error = %e, "Cache read failed; treating as miss");
                None
            }
        };

        if let Some(url) = cached {
            trace!(code = %code, "Redirect served from cache");
            self.spawn_counter(code);
            return Ok(url);
        }

        let link = self.links.resolve(code).await?;

        if let Err(e) = self
            .links
            .cache
            .set(&key, &link.long_url, self.links.config.redirect_cache_ttl)
            .await
        {
            warn!(key = %key, error = %e, "Failed to populate redirect cache");
        }

        debug!(code = %code, url = %link.long_url, "Redirect served from store");
        self.spawn_counter(code);
        Ok(link.long_url)
    }

    /// Defers the counter bump until after the response value has been
    /// produced. The task may be delayed or dropped at shutdown; nobody
    /// observes its result.
    fn spawn_counter(&self, code: &str) {
        let links = self.links.clone();
        let code = code.to_string();
        tokio::spawn(async move {
            links.record_redirect(&code).await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::HashCodeGenerator;
    use crate::service::CreateLink;
    use crate::LinkError;
    use std::time::Duration;
    use taut_cache::MokaLinkCache;
    use taut_core::config::LinkConfig;
    use taut_storage::InMemoryLinkStore;

    fn redirector() -> Redirector<InMemoryLinkStore, MokaLinkCache, HashCodeGenerator> {
        let service = LinkService::new(
            InMemoryLinkStore::new(),
            MokaLinkCache::default(),
            HashCodeGenerator::new(6),
            LinkConfig::builder().generation_secret("s3cret").build(),
        );
        Redirector::new(service)
    }

    async fn create(
        redirector: &Redirector<InMemoryLinkStore, MokaLinkCache, HashCodeGenerator>,
        url: &str,
    ) -> String {
        redirector
            .links
            .create(CreateLink {
                long_url: url.to_string(),
                custom_alias: None,
                expires_at: None,
                owner: None,
            })
            .await
            .unwrap()
            .short_code
    }

    #[tokio::test]
    async fn miss_populates_cache_and_returns_url() {
        let redirector = redirector();
        let code = create(&redirector, "https://example.com").await;

        let url = redirector.redirect(&code).await.unwrap();
        assert_eq!(url, "https://example.com");

        let cached = redirector
            .links
            .cache
            .get(&CacheKey::Redirect(&code))
            .await
            .unwrap();
        assert_eq!(cached, Some("https://example.com".to_string()));
    }

    #[tokio::test]
    async fn hit_skips_the_store() {
        let redirector = redirector();
        let code = create(&redirector, "https://example.com").await;

        // Seed the cache with a value that differs from the store so a
        // hit is observable.
        redirector
            .links
            .cache
            .set(
                &CacheKey::Redirect(&code),
                "https://cached.example",
                Duration::from_secs(300),
            )
            .await
            .unwrap();

        let url = redirector.redirect(&code).await.unwrap();
        assert_eq!(url, "https://cached.example");
    }

    #[tokio::test]
    async fn unknown_code_is_not_found() {
        let redirector = redirector();
        let err = redirector.redirect("nope42").await.unwrap_err();
        assert!(matches!(err, LinkError::NotFound));
    }

    #[tokio::test]
    async fn every_redirect_advances_the_counter() {
        let redirector = redirector();
        let code = create(&redirector, "https://example.com").await;

        redirector.redirect(&code).await.unwrap(); // miss
        redirector.redirect(&code).await.unwrap(); // hit

        // Counter bumps are spawned; let them run.
        tokio::time::sleep(Duration::from_millis(50)).await;

        let link = redirector.links.resolve(&code).await.unwrap();
        assert_eq!(link.redirect_counter, 2);
        assert!(link.last_used_at.is_some());
    }
}
