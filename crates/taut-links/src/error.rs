use taut_core::error::StoreError;
use thiserror::Error;

/// Result type for resolver operations.
pub type Result<T> = std::result::Result<T, LinkError>;

#[derive(Debug, Clone, Error)]
pub enum LinkError {
    #[error("link not found")]
    NotFound,
    #[error("alias already exists: {0}")]
    DuplicateAlias(String),
    #[error("short code already exists: {0}")]
    DuplicateShortCode(String),
    #[error("url has already been shortened: {0}")]
    DuplicateUrl(String),
    #[error("alias length must be between 4 and 16 characters, got {0}")]
    InvalidAliasLength(usize),
    #[error("caller does not own this link")]
    PermissionDenied,
    #[error("cannot allocate a unique short code after {attempts} attempts")]
    ExhaustedRetries { attempts: u32 },
    #[error("store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for LinkError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateCode(code) => LinkError::DuplicateShortCode(code),
            StoreError::DuplicateUrl(url) => LinkError::DuplicateUrl(url),
            other => LinkError::Store(other),
        }
    }
}
