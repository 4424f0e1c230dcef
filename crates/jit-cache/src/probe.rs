//! Liveness probe seam.

use async_trait::async_trait;

/// A remote check failed: the credential was rejected, or the system was unreachable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ProbeError(pub String);

impl ProbeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// A cheap authenticated call proving a cached credential is still accepted.
///
/// Any error, transport errors included, makes the cache treat the credential
/// as revoked.
#[async_trait]
pub trait LivenessProbe<C>: Send + Sync {
    async fn probe(&self, credential: &C) -> Result<(), ProbeError>;
}
