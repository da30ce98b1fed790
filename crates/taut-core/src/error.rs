use thiserror::Error;

/// Errors from the authoritative store.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("short code already exists: {0}")]
    DuplicateCode(String),
    #[error("long url already exists: {0}")]
    DuplicateUrl(String),
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("storage operation timed out: {0}")]
    Timeout(String),
    #[error("storage query failed: {0}")]
    Query(String),
    #[error("stored data is invalid: {0}")]
    InvalidData(String),
}

/// Errors from the advisory cache.
///
/// The cache is never authoritative, so callers on the read and
/// invalidation paths are permitted to ignore these.
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
    #[error("cache operation timed out: {0}")]
    Timeout(String),
    #[error("cache serialization failed: {0}")]
    Serialization(String),
    #[error("cache value is invalid: {0}")]
    InvalidData(String),
    #[error("cache operation failed: {0}")]
    Operation(String),
}
