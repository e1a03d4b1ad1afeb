// Error types for cache backends.
// Separates the cache-miss condition from every other store failure.

use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache not found: {0}")]
    NotFound(String),

    #[error("invalid cache name {name:?}: {reason}")]
    InvalidName { name: String, reason: &'static str },

    #[error("operation cancelled")]
    Cancelled,

    #[error("deadline exceeded")]
    DeadlineExceeded,

    #[error("cache entry is closed")]
    Closed,

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl CacheError {
    /// Whether this error is the cache-miss condition.
    ///
    /// Every other variant is a store failure the caller cannot fix by
    /// populating the cache.
    pub fn is_not_found(&self) -> bool {
        matches!(self, CacheError::NotFound(_))
    }

    pub(crate) fn invalid_name(name: &str, reason: &'static str) -> Self {
        CacheError::InvalidName {
            name: name.to_string(),
            reason,
        }
    }
}

impl From<CacheError> for io::Error {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::Io(e) => e,
            CacheError::NotFound(_) => io::Error::new(io::ErrorKind::NotFound, err),
            CacheError::InvalidName { .. } => io::Error::new(io::ErrorKind::InvalidInput, err),
            CacheError::Cancelled => io::Error::new(io::ErrorKind::Interrupted, err),
            CacheError::DeadlineExceeded => io::Error::new(io::ErrorKind::TimedOut, err),
            CacheError::Closed => io::Error::other(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, CacheError>;
