use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use jiff::{SignedDuration, Timestamp};
use std::sync::atomic::{AtomicI64, Ordering};
use taut_core::error::StoreError;
use taut_core::link::{Link, LinkChange, NewLink};
use taut_core::store::{LinkStore, Result};
use taut_core::time::minute_floor;

/// In-memory implementation of [`LinkStore`] using DashMap, keyed by
/// short code.
///
/// DashMap's sharded locks allow concurrent reads and writes to different
/// buckets without blocking. URL uniqueness is checked by scan, which is
/// fine at test scale; the MySQL store enforces it with an index.
#[derive(Debug)]
pub struct InMemoryLinkStore {
    links: DashMap<String, Link>,
    next_id: AtomicI64,
}

impl InMemoryLinkStore {
    /// Creates an empty in-memory store.
    pub fn new() -> Self {
        Self {
            links: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }

    /// Number of stored links.
    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

impl Default for InMemoryLinkStore {
    fn default() -> Self {
        Self::new()
    }
}

fn outdated(link: &Link, now: Timestamp, ttl_limit: Timestamp) -> bool {
    match link.expires_at {
        Some(expires_at) => expires_at < now,
        None => {
            link.updated_at < ttl_limit
                && link.last_used_at.is_none_or(|last_used| last_used < ttl_limit)
        }
    }
}

#[async_trait]
impl LinkStore for InMemoryLinkStore {
    async fn get_by_code(&self, code: &str) -> Result<Option<Link>> {
        Ok(self.links.get(code).map(|entry| entry.clone()))
    }

    async fn find_by_urls(&self, candidates: &[String]) -> Result<Option<Link>> {
        Ok(self
            .links
            .iter()
            .find(|entry| candidates.iter().any(|url| *url == entry.long_url))
            .map(|entry| entry.clone()))
    }

    async fn code_exists(&self, code: &str) -> Result<bool> {
        Ok(self.links.contains_key(code))
    }

    async fn url_exists(&self, url: &str) -> Result<bool> {
        Ok(self.links.iter().any(|entry| entry.long_url == url))
    }

    async fn insert(&self, link: NewLink) -> Result<Link> {
        // The URL scan is best-effort (the resolver pre-checks it too);
        // it must run before the entry guard is taken or it would
        // deadlock on the guarded shard.
        if self.url_exists(&link.long_url).await? {
            return Err(StoreError::DuplicateUrl(link.long_url));
        }

        let now = minute_floor(Timestamp::now());
        // The entry guard arbitrates concurrent inserts of the same code,
        // like the unique index in MySQL.
        match self.links.entry(link.short_code.clone()) {
            Entry::Occupied(_) => Err(StoreError::DuplicateCode(link.short_code)),
            Entry::Vacant(slot) => {
                let stored = Link {
                    id: self.next_id.fetch_add(1, Ordering::SeqCst),
                    short_code: link.short_code,
                    long_url: link.long_url,
                    redirect_counter: 0,
                    author_id: link.author_id,
                    created_at: now,
                    updated_at: now,
                    expires_at: link.expires_at,
                    last_used_at: None,
                };
                slot.insert(stored.clone());
                Ok(stored)
            }
        }
    }

    async fn update(&self, code: &str, change: LinkChange) -> Result<Option<Link>> {
        let Some(mut entry) = self.links.get_mut(code) else {
            return Ok(None);
        };
        entry.long_url = change.long_url;
        entry.expires_at = change.expires_at;
        entry.updated_at = minute_floor(Timestamp::now());
        Ok(Some(entry.clone()))
    }

    async fn delete(&self, code: &str) -> Result<Option<Link>> {
        Ok(self.links.remove(code).map(|(_, link)| link))
    }

    async fn record_redirect(&self, code: &str, at: Timestamp) -> Result<()> {
        if let Some(mut entry) = self.links.get_mut(code) {
            entry.redirect_counter += 1;
            entry.last_used_at = Some(minute_floor(at));
        }
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Link>> {
        Ok(self.links.iter().map(|entry| entry.clone()).collect())
    }

    async fn list_by_author(&self, author_id: i64) -> Result<Vec<Link>> {
        let mut links: Vec<Link> = self
            .links
            .iter()
            .filter(|entry| entry.author_id == Some(author_id))
            .map(|entry| entry.clone())
            .collect();
        // Newest first; ids break ties since timestamps are minute-floored.
        links.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(links)
    }

    async fn delete_outdated(
        &self,
        now: Timestamp,
        inactivity_ttl: SignedDuration,
    ) -> Result<Vec<Link>> {
        let ttl_limit = now - inactivity_ttl;
        let codes: Vec<String> = self
            .links
            .iter()
            .filter(|entry| outdated(entry.value(), now, ttl_limit))
            .map(|entry| entry.key().clone())
            .collect();

        let mut removed = Vec::with_capacity(codes.len());
        for code in codes {
            // Re-checked under the shard lock: a row updated or used
            // since the scan is no longer outdated and survives.
            let swept = self
                .links
                .remove_if(&code, |_, link| outdated(link, now, ttl_limit));
            if let Some((_, link)) = swept {
                removed.push(link);
            }
        }
        Ok(removed)
    }
}
