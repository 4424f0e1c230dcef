//! Client error types.

use thiserror::Error;

/// Client error type.
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parsing failed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A response body was not the expected JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The broker answered with a non-success status.
    #[error("url: {url}, status: {status}, message: {message}")]
    Api {
        status: u16,
        url: String,
        message: String,
    },

    /// The credentials were accepted but are not usable.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// A requested object does not exist or is not visible to the user.
    #[error("{0}")]
    NotFound(String),

    /// Invalid client configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed encoded data in a broker response.
    #[error("Decode error: {0}")]
    Decode(String),

    /// A request could not be signed.
    #[error("Signing error: {0}")]
    Signing(String),
}

impl Error {
    /// Check if this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_)) || matches!(self, Error::Api { status: 404, .. })
    }

    /// Check if this is an authentication error.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Error::Auth(_))
            || matches!(self, Error::Api { status: 401 | 403, .. })
    }

    /// Status code of an API error.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<Error> for jit_cache::ProbeError {
    fn from(err: Error) -> Self {
        jit_cache::ProbeError::new(err.to_string())
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;
