//! Per-kind cache contract.

use chrono::{DateTime, Duration, Utc};
use jit_types::{AwsConfigOutput, CredentialKind, DuploCredsOutput, ExecCredential};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{CacheError, Result};

/// A credential is only reused if it is still valid this far into the future.
pub const EXPIRY_BUFFER: Duration = Duration::minutes(5);

/// A credential document the cache knows how to store and age.
pub trait CachedCredential: Serialize + DeserializeOwned + Send + Sync {
    /// The kind recorded in the cache file name.
    const KIND: CredentialKind;

    /// Absolute expiration; `Ok(None)` for kinds whose issuer does not disclose one.
    fn expiration(&self) -> Result<Option<DateTime<Utc>>>;
}

impl CachedCredential for AwsConfigOutput {
    const KIND: CredentialKind = CredentialKind::Aws;

    fn expiration(&self) -> Result<Option<DateTime<Utc>>> {
        self.expires_at()
            .map(Some)
            .map_err(|_| CacheError::InvalidExpiration(self.expiration.clone()))
    }
}

impl CachedCredential for DuploCredsOutput {
    const KIND: CredentialKind = CredentialKind::Duplo;

    fn expiration(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(None)
    }
}

impl CachedCredential for ExecCredential {
    const KIND: CredentialKind = CredentialKind::K8s;

    fn expiration(&self) -> Result<Option<DateTime<Utc>>> {
        self.expires_at().map(Some).ok_or_else(|| {
            CacheError::InvalidExpiration(
                self.status
                    .as_ref()
                    .and_then(|s| s.expiration_timestamp.clone())
                    .unwrap_or_default(),
            )
        })
    }
}

/// TTL check: expired if `now + EXPIRY_BUFFER` is past the recorded expiration.
pub(crate) fn check_ttl<C: CachedCredential>(credential: &C, now: DateTime<Utc>) -> Result<()> {
    match credential.expiration()? {
        Some(expires) if now + EXPIRY_BUFFER > expires => Err(CacheError::Expired(expires)),
        _ => Ok(()),
    }
}
