use crate::error::CacheError;
use async_trait::async_trait;
use std::fmt::Display;
use std::time::Duration;

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;

/// Logical cache namespaces and their discriminating parameter.
///
/// Every cache entry is keyed by one of these, so the invalidation path
/// names a namespace plus a parameter instead of coupling to whichever
/// caller populated the entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheKey<'a> {
    /// Destination URL for the redirect path, keyed by short code.
    Redirect(&'a str),
    /// Per-link statistics, keyed by short code.
    Stats(&'a str),
    /// Search-by-URL results, keyed by the normalized URL value.
    ///
    /// Invalidation after a URL change can only target the new value;
    /// entries for the old value age out on their own TTL.
    Search(&'a str),
    /// The "all links" listing. No discriminating parameter.
    ListAll,
}

impl CacheKey<'_> {
    /// Renders the deterministic key string for this entry.
    pub fn render(&self) -> String {
        match self {
            CacheKey::Redirect(code) => format!("links:redirect:{code}"),
            CacheKey::Stats(code) => format!("links:stats:{code}"),
            CacheKey::Search(url) => format!("links:search:{url}"),
            CacheKey::ListAll => "links:all".to_string(),
        }
    }
}

impl Display for CacheKey<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render())
    }
}

/// An advisory, TTL-bounded key-value cache.
///
/// Entries are expendable copies of store state: losing the cache (or an
/// individual invalidation) must never corrupt results, only slow them.
/// Values are opaque strings; callers serialize structured data themselves.
#[async_trait]
pub trait LinkCache: Send + Sync + 'static {
    /// Fetches a cached value. `Ok(None)` on miss.
    async fn get(&self, key: &CacheKey<'_>) -> Result<Option<String>>;

    /// Stores a value under the key for at most `ttl`.
    async fn set(&self, key: &CacheKey<'_>, value: &str, ttl: Duration) -> Result<()>;

    /// Removes a cached value. Not an error if the key is absent.
    async fn del(&self, key: &CacheKey<'_>) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_namespaced_by_operation() {
        assert_eq!(CacheKey::Redirect("abc").render(), "links:redirect:abc");
        assert_eq!(CacheKey::Stats("abc").render(), "links:stats:abc");
        assert_eq!(
            CacheKey::Search("https://example.com").render(),
            "links:search:https://example.com"
        );
        assert_eq!(CacheKey::ListAll.render(), "links:all");
    }

    #[test]
    fn same_parameter_different_namespace_never_collides() {
        assert_ne!(
            CacheKey::Redirect("abc").render(),
            CacheKey::Stats("abc").render()
        );
    }

    #[test]
    fn display_matches_render() {
        let key = CacheKey::Redirect("abc");
        assert_eq!(key.to_string(), key.render());
    }
}
