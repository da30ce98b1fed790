use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// A stored link in the authoritative store.
///
/// Timestamps are truncated to whole minutes (see [`crate::time::minute_floor`])
/// so that cache keys and equality checks are insensitive to sub-minute jitter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    /// Stable numeric identity, assigned by the store.
    pub id: i64,
    /// Unique short code; 4-16 characters when caller-supplied,
    /// generator-length when derived from the URL.
    pub short_code: String,
    /// Destination URL, stored normalized (absolute, with scheme).
    pub long_url: String,
    /// Incremented once per successful redirect. Never decreases.
    pub redirect_counter: u64,
    /// Owner reference; `None` for anonymously created links.
    pub author_id: Option<i64>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    /// Absolute expiry; once in the past the link is eligible for sweep.
    pub expires_at: Option<Timestamp>,
    /// Set on every redirect.
    pub last_used_at: Option<Timestamp>,
}

/// A link about to be inserted. The store assigns `id`, `created_at`
/// and `updated_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLink {
    pub short_code: String,
    pub long_url: String,
    pub author_id: Option<i64>,
    pub expires_at: Option<Timestamp>,
}

/// The mutable fields of a link, applied by [`crate::store::LinkStore::update`].
///
/// `expires_at: None` clears the expiry; the store bumps `updated_at` itself.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkChange {
    pub long_url: String,
    pub expires_at: Option<Timestamp>,
}

/// An authenticated caller, as supplied by the identity layer.
///
/// The resolver never authenticates; it only compares `id` against a
/// link's `author_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub id: i64,
    pub is_superuser: bool,
}

impl Link {
    /// Whether the caller owns this link.
    ///
    /// Anonymous links (`author_id` of `None`) are owned by nobody, so
    /// this is `false` for every caller.
    pub fn is_owned_by(&self, caller: &Caller) -> bool {
        self.author_id == Some(caller.id)
    }
}
