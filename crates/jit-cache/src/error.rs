//! Error types for the credential cache.
//!
//! Only directory setup errors ever leave this crate; everything else is
//! logged and degraded to a cache miss.

use chrono::{DateTime, Utc};

use crate::probe::ProbeError;

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, CacheError>;

/// Errors that can occur in the credential cache.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The platform has no per-user cache directory.
    #[error("cannot find cache directory")]
    NoCacheDir,

    /// The cache directory could not be created.
    #[error("cannot create cache directory '{path}': {source}")]
    CreateDir {
        path: String,
        source: std::io::Error,
    },

    /// Filesystem error on a cache entry.
    #[error("{op} '{path}': {source}")]
    Io {
        op: &'static str,
        path: String,
        source: std::io::Error,
    },

    /// A cache entry exists but is not a valid document for its kind.
    #[error("invalid JSON in cache entry '{path}': {source}")]
    Corrupt {
        path: String,
        source: serde_json::Error,
    },

    /// A credential could not be serialized.
    #[error("cannot serialize credential: {0}")]
    Serialize(#[source] serde_json::Error),

    /// The credential expires within the reuse buffer.
    #[error("credential expires at {0}")]
    Expired(DateTime<Utc>),

    /// The recorded expiration is missing or unparseable.
    #[error("invalid expiration time in cache entry: {0:?}")]
    InvalidExpiration(String),

    /// The remote system no longer accepts the credential.
    #[error("credential rejected: {0}")]
    Revoked(#[from] ProbeError),
}
