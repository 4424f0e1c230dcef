//! Error types for the interactive login.

use std::time::Duration;

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, LoginError>;

/// Terminal outcomes of an interactive login other than a token.
///
/// None of these are retried; the caller decides whether to start over.
#[derive(Debug, thiserror::Error)]
pub enum LoginError {
    /// Nobody called back before the deadline.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The login page reported that the user canceled.
    #[error("canceled")]
    Canceled,

    /// A posted callback came from an origin other than the broker.
    #[error("unauthorized origin: {origin}")]
    UnauthorizedOrigin { origin: String },

    /// The callback could not be understood. `body` is kept for debugging
    /// only and is never part of the message.
    #[error("malformed callback: {reason}")]
    MalformedCallback { reason: String, body: Option<String> },

    /// The local listener could not be bound.
    #[error("cannot listen on {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    /// The browser could not be opened.
    #[error("failed to open interactive browser session: {source}")]
    BrowserLaunch {
        url: String,
        source: std::io::Error,
    },

    /// Listener-side failure after binding, or an unusable broker origin.
    #[error("callback transport error: {0}")]
    Transport(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message_keeps_sub_second_precision() {
        let err = LoginError::Timeout(Duration::from_millis(100));
        assert_eq!(err.to_string(), "timed out after 100ms");
        assert_eq!(
            LoginError::Timeout(Duration::from_secs(180)).to_string(),
            "timed out after 180s"
        );
    }
}
