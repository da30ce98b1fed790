use std::sync::Arc;
use taut_core::cache::{CacheKey, LinkCache};
use taut_core::error::CacheError;
use tracing::{trace, warn};

/// Removes every cache entry a link mutation can have made stale: the
/// redirect and stats entries for its short code, and the search entry
/// for its URL.
///
/// All deletions are attempted even when one fails; the first failure is
/// returned. The result is advisory — a stale entry ages out on its TTL,
/// so callers on mutation paths are permitted to ignore it.
pub async fn invalidate_link<C>(
    cache: &C,
    short_code: Option<&str>,
    long_url: Option<&str>,
) -> Result<(), CacheError>
where
    C: LinkCache + ?Sized,
{
    let mut first_error = None;

    if let Some(code) = short_code {
        for key in [CacheKey::Redirect(code), CacheKey::Stats(code)] {
            trace!(key = %key, "Invalidating cache entry");
            if let Err(e) = cache.del(&key).await {
                first_error.get_or_insert(e);
            }
        }
    }

    if let Some(url) = long_url {
        let key = CacheKey::Search(url);
        trace!(key = %key, "Invalidating cache entry");
        if let Err(e) = cache.del(&key).await {
            first_error.get_or_insert(e);
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Fire-and-forget form of [`invalidate_link`] for use after a committed
/// mutation: failures are logged and never propagate, so an unreachable
/// cache cannot block the operation that triggered the invalidation.
pub fn spawn_invalidate<C>(
    cache: Arc<C>,
    short_code: Option<String>,
    long_url: Option<String>,
) -> tokio::task::JoinHandle<()>
where
    C: LinkCache + ?Sized,
{
    tokio::spawn(async move {
        if let Err(e) =
            invalidate_link(cache.as_ref(), short_code.as_deref(), long_url.as_deref()).await
        {
            warn!(
                error = %e,
                code = short_code.as_deref().unwrap_or("-"),
                "Cache invalidation failed; stale entries will age out on TTL"
            );
        }
    })
}
