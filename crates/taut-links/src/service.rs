use crate::error::{LinkError, Result};
use crate::generator::CodeGenerator;
use jiff::Timestamp;
use std::sync::Arc;
use taut_cache::spawn_invalidate;
use taut_core::cache::LinkCache;
use taut_core::config::LinkConfig;
use taut_core::error::StoreError;
use taut_core::link::{Caller, Link, LinkChange, NewLink};
use taut_core::store::LinkStore;
use taut_core::time::minute_floor;
use tracing::{debug, warn};

const MIN_ALIAS_LENGTH: usize = 4;
const MAX_ALIAS_LENGTH: usize = 16;

/// Parameters for creating a link.
#[derive(Debug, Clone)]
pub struct CreateLink {
    pub long_url: String,
    /// Caller-supplied short code; bypasses generation when present.
    pub custom_alias: Option<String>,
    pub expires_at: Option<Timestamp>,
    /// `None` creates an anonymous (ownerless) link.
    pub owner: Option<Caller>,
}

/// Parameters for updating a link.
///
/// `long_url: None` keeps the current URL; `expires_at: None` clears the
/// expiry.
#[derive(Debug, Clone)]
pub struct UpdateLink {
    pub long_url: Option<String>,
    pub expires_at: Option<Timestamp>,
}

/// The link resolver: orchestrates create/read/update/delete against the
/// authoritative store, enforces uniqueness and ownership, and triggers
/// cache invalidation after every committed mutation.
///
/// Concurrent updates to the same link are last-commit-wins; there is no
/// optimistic-lock version check.
#[derive(Debug)]
pub struct LinkService<S, C, G> {
    pub(crate) store: Arc<S>,
    pub(crate) cache: Arc<C>,
    generator: Arc<G>,
    pub(crate) config: LinkConfig,
}

impl<S, C, G> Clone for LinkService<S, C, G> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            cache: Arc::clone(&self.cache),
            generator: Arc::clone(&self.generator),
            config: self.config.clone(),
        }
    }
}

/// Prefixes `http://` when the input has no scheme. A lossy heuristic,
/// not validation: the boundary layer rejects malformed URLs before the
/// resolver sees them.
fn normalize_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    }
}

/// The URL values a search query may be stored under: the raw input,
/// plus both scheme-prefixed variants when the input has none.
fn search_candidates(raw: &str) -> Vec<String> {
    let trimmed = raw.trim();
    let mut candidates = vec![trimmed.to_string()];
    if !trimmed.starts_with("http://") && !trimmed.starts_with("https://") {
        candidates.push(format!("https://{trimmed}"));
        candidates.push(format!("http://{trimmed}"));
    }
    candidates
}

/// Maps a unique violation surfacing at commit time back to the error
/// kind the pre-check would have raised, so concurrent creates lose with
/// the same error as sequential ones.
fn insert_error(err: StoreError, custom_alias: bool) -> LinkError {
    match err {
        StoreError::DuplicateUrl(url) => LinkError::DuplicateUrl(url),
        StoreError::DuplicateCode(code) if custom_alias => LinkError::DuplicateAlias(code),
        StoreError::DuplicateCode(code) => LinkError::DuplicateShortCode(code),
        other => LinkError::Store(other),
    }
}

impl<S: LinkStore, C: LinkCache, G: CodeGenerator> LinkService<S, C, G> {
    pub fn new(store: S, cache: C, generator: G, config: LinkConfig) -> Self {
        Self {
            store: Arc::new(store),
            cache: Arc::new(cache),
            generator: Arc::new(generator),
            config,
        }
    }

    /// Shortens a URL: normalizes it, enforces URL uniqueness, allocates
    /// or validates the short code, and persists the row in one commit.
    ///
    /// No cache write happens here; reads populate the cache lazily.
    pub async fn create(&self, req: CreateLink) -> Result<Link> {
        let long_url = normalize_url(&req.long_url);

        // URL uniqueness comes first: a second create for the same URL is
        // rejected before any code allocation work.
        if self.store.url_exists(&long_url).await? {
            return Err(LinkError::DuplicateUrl(long_url));
        }

        let custom = req.custom_alias.is_some();
        let short_code = match req.custom_alias {
            Some(alias) => self.validated_alias(alias).await?,
            None => self.allocate_code(&long_url).await?,
        };

        let link = self
            .store
            .insert(NewLink {
                short_code,
                long_url,
                author_id: req.owner.map(|caller| caller.id),
                expires_at: req.expires_at.map(minute_floor),
            })
            .await
            .map_err(|e| insert_error(e, custom))?;

        debug!(code = %link.short_code, "Created link");
        Ok(link)
    }

    /// Exact lookup by short code. Expired-but-unswept links still
    /// resolve; only the sweeper retires them.
    pub async fn resolve(&self, code: &str) -> Result<Link> {
        self.store
            .get_by_code(code.trim())
            .await?
            .ok_or(LinkError::NotFound)
    }

    /// Looks a link up by its destination URL, tolerating scheme-less
    /// search input by also trying both prefixed variants.
    pub async fn find_by_url(&self, long_url: &str) -> Result<Link> {
        self.store
            .find_by_urls(&search_candidates(long_url))
            .await?
            .ok_or(LinkError::NotFound)
    }

    /// Updates a link's destination and/or expiry, then invalidates the
    /// cache entries keyed by its code and by the new URL.
    ///
    /// Search entries for the old URL are not invalidated (they are keyed
    /// by URL value, not code) and age out on their own TTL.
    pub async fn update(&self, code: &str, caller: &Caller, req: UpdateLink) -> Result<Link> {
        let link = self.resolve(code).await?;
        if !link.is_owned_by(caller) {
            return Err(LinkError::PermissionDenied);
        }

        let long_url = match req.long_url {
            Some(url) => {
                let url = normalize_url(&url);
                if url != link.long_url && self.store.url_exists(&url).await? {
                    return Err(LinkError::DuplicateUrl(url));
                }
                url
            }
            None => link.long_url,
        };

        let updated = self
            .store
            .update(
                code,
                LinkChange {
                    long_url,
                    expires_at: req.expires_at.map(minute_floor),
                },
            )
            .await?
            .ok_or(LinkError::NotFound)?;

        spawn_invalidate(
            Arc::clone(&self.cache),
            Some(updated.short_code.clone()),
            Some(updated.long_url.clone()),
        );

        Ok(updated)
    }

    /// Physically removes a link and invalidates its cache entries.
    ///
    /// Invalidation is fire-and-forget: the deletion has committed by the
    /// time it runs, and an unreachable cache must not undo that.
    pub async fn delete(&self, code: &str, caller: &Caller) -> Result<Link> {
        let link = self.resolve(code).await?;
        if !link.is_owned_by(caller) {
            return Err(LinkError::PermissionDenied);
        }

        let removed = self.store.delete(code).await?.ok_or(LinkError::NotFound)?;

        spawn_invalidate(
            Arc::clone(&self.cache),
            Some(removed.short_code.clone()),
            Some(removed.long_url.clone()),
        );

        debug!(code = %removed.short_code, "Deleted link");
        Ok(removed)
    }

    /// Best-effort counter bump after a redirect. Runs once the response
    /// has already been produced, so failures are logged, never returned,
    /// and a link deleted in the meantime is a silent no-op.
    pub async fn record_redirect(&self, code: &str) {
        if let Err(e) = self.store.record_redirect(code, Timestamp::now()).await {
            warn!(code = %code, error = %e, "Failed to record redirect");
        }
    }

    /// All links, for the boundary's listing surface.
    pub async fn list_all(&self) -> Result<Vec<Link>> {
        Ok(self.store.list_all().await?)
    }

    /// The caller's links, newest first.
    pub async fn list_by_author(&self, author_id: i64) -> Result<Vec<Link>> {
        Ok(self.store.list_by_author(author_id).await?)
    }

    async fn validated_alias(&self, alias: String) -> Result<String> {
        let alias = alias.trim().to_string();
        if alias.len() < MIN_ALIAS_LENGTH || alias.len() > MAX_ALIAS_LENGTH {
            return Err(LinkError::InvalidAliasLength(alias.len()));
        }
        if self.store.code_exists(&alias).await? {
            return Err(LinkError::DuplicateAlias(alias));
        }
        Ok(alias)
    }

    /// The collision-retry protocol: derive a code from the URL, and on
    /// collision re-seed with the previous code plus a server-side secret
    /// for a bounded number of attempts.
    async fn allocate_code(&self, long_url: &str) -> Result<String> {
        let mut code = self.generator.generate(long_url);
        if !self.store.code_exists(&code).await? {
            return Ok(code);
        }

        for _ in 0..self.config.generation_attempts {
            code = self
                .generator
                .generate(&format!("{code}{}", self.config.generation_secret));
            if !self.store.code_exists(&code).await? {
                return Ok(code);
            }
        }

        // Persistent collisions mean the code space is exhausted or the
        // secret/algorithm is misconfigured; operators watch for this.
        warn!(
            attempts = self.config.generation_attempts,
            "Exhausted short code generation attempts"
        );
        Err(LinkError::ExhaustedRetries {
            attempts: self.config.generation_attempts,
        })
    }
}
