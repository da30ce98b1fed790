use crate::error::StoreError;
use crate::link::{Link, LinkChange, NewLink};
use async_trait::async_trait;
use jiff::{SignedDuration, Timestamp};

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// The authoritative store of links.
///
/// This is the single source of truth for existence, ownership, counters
/// and timestamps. Every mutation commits before any cache invalidation
/// is attempted, so readers may see a stale cache entry but never an
/// uncommitted row.
#[async_trait]
pub trait LinkStore: Send + Sync + 'static {
    /// Exact lookup by short code. Returns `None` if absent.
    async fn get_by_code(&self, code: &str) -> Result<Option<Link>>;

    /// Looks up a link whose `long_url` matches any of the candidates.
    ///
    /// Callers pass the raw input plus scheme-prefixed variants so that
    /// scheme-agnostic search queries still match.
    async fn find_by_urls(&self, candidates: &[String]) -> Result<Option<Link>>;

    /// Whether a short code is already taken.
    async fn code_exists(&self, code: &str) -> Result<bool>;

    /// Whether a normalized URL is already shortened.
    async fn url_exists(&self, url: &str) -> Result<bool>;

    /// Inserts a new link, assigning its id and timestamps.
    ///
    /// The unique constraints on `short_code` and `long_url` are the
    /// final arbiter under concurrent creates: violations surface as
    /// [`StoreError::DuplicateCode`] / [`StoreError::DuplicateUrl`].
    async fn insert(&self, link: NewLink) -> Result<Link>;

    /// Applies a change to an existing link and bumps `updated_at`,
    /// all in one transaction. Returns `None` if the row vanished
    /// (race with a delete or a sweep).
    async fn update(&self, code: &str, change: LinkChange) -> Result<Option<Link>>;

    /// Physically removes a link, returning the deleted row so its
    /// URL-keyed cache entries can be invalidated.
    async fn delete(&self, code: &str) -> Result<Option<Link>>;

    /// Increments the redirect counter and stamps `last_used_at`.
    ///
    /// A missing row is a silent no-op: this runs after the redirect
    /// response has already been produced, so there is nobody to report
    /// a race with delete/sweep to.
    async fn record_redirect(&self, code: &str, at: Timestamp) -> Result<()>;

    /// All links, unordered.
    async fn list_all(&self) -> Result<Vec<Link>>;

    /// Links owned by the given author, newest first.
    async fn list_by_author(&self, author_id: i64) -> Result<Vec<Link>>;

    /// Deletes every outdated link in a single transaction and returns
    /// the deleted rows.
    ///
    /// A link is outdated when its absolute expiry has passed, or when it
    /// has no absolute expiry and both its last update and its last use
    /// (when any) are older than `now - inactivity_ttl`. The batch is
    /// all-or-nothing: a failure mid-batch rolls the whole sweep back.
    async fn delete_outdated(
        &self,
        now: Timestamp,
        inactivity_ttl: SignedDuration,
    ) -> Result<Vec<Link>>;
}
