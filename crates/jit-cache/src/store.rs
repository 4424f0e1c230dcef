//! File-backed credential cache.
//!
//! One JSON file per (key, kind): `{key},{kind}-creds.json`. Writes go to a
//! uniquely named temp file in the same directory and are renamed into place,
//! so a concurrent reader sees either the old document or the new one in
//! full. Concurrent writers to the same key: last write wins.

use std::io::Write;
use std::path::PathBuf;

use chrono::Utc;
use jit_types::{CacheKey, CredentialKind};
use tracing::{debug, warn};

use crate::config::CacheConfig;
use crate::credential::{CachedCredential, check_ttl};
use crate::error::{CacheError, Result};
use crate::probe::LivenessProbe;

/// Validated credential cache over a [`CacheConfig`].
#[derive(Debug, Clone, Copy)]
pub struct CredentialCache<'a> {
    config: &'a CacheConfig,
}

impl<'a> CredentialCache<'a> {
    pub fn new(config: &'a CacheConfig) -> Self {
        Self { config }
    }

    /// Path of the entry for `key` and `kind`, or `None` when caching is disabled.
    pub fn entry_path(&self, key: &CacheKey, kind: CredentialKind) -> Option<PathBuf> {
        self.config.dir().map(|d| d.join(key.file_name(kind)))
    }

    /// Return a reusable credential, or `None`.
    ///
    /// The TTL check runs first; the liveness probe runs only if it passes.
    /// On any failure the entry is removed before `None` is returned.
    pub async fn get<C: CachedCredential>(
        &self,
        key: &CacheKey,
        probe: &dyn LivenessProbe<C>,
    ) -> Option<C> {
        let path = self.entry_path(key, C::KIND)?;

        let credential = match read_entry::<C>(&path) {
            Ok(Some(credential)) => credential,
            Ok(None) => return None,
            Err(e) => {
                warn!(key = %key, kind = %C::KIND, "{}", e);
                self.invalidate(key, C::KIND);
                return None;
            }
        };

        let verdict = match check_ttl(&credential, Utc::now()) {
            Ok(()) => probe.probe(&credential).await.map_err(CacheError::from),
            Err(e) => Err(e),
        };

        match verdict {
            Ok(()) => {
                debug!(key = %key, kind = %C::KIND, "using cached credentials");
                Some(credential)
            }
            Err(e) => {
                match &e {
                    CacheError::InvalidExpiration(_) => {
                        warn!(key = %key, kind = %C::KIND, "{}", e)
                    }
                    _ => debug!(key = %key, kind = %C::KIND, reason = %e, "discarding cached credentials"),
                }
                self.invalidate(key, C::KIND);
                None
            }
        }
    }

    /// Store a credential, replacing any previous entry. Failures are only logged.
    pub fn put<C: CachedCredential>(&self, key: &CacheKey, credential: &C) {
        let Some(path) = self.entry_path(key, C::KIND) else {
            return;
        };
        if let Err(e) = write_entry(&path, credential) {
            warn!(key = %key, kind = %C::KIND, "unable to write to cache: {}", e);
        }
    }

    /// Remove an entry. A missing entry is not an error; other failures are only logged.
    pub fn invalidate(&self, key: &CacheKey, kind: CredentialKind) {
        let Some(path) = self.entry_path(key, kind) else {
            return;
        };
        match std::fs::remove_file(&path) {
            Ok(()) => debug!(key = %key, kind = %kind, "removed cache entry"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(key = %key, kind = %kind, "unable to remove from credentials cache: {}", e)
            }
        }
    }
}

fn read_entry<C: CachedCredential>(path: &std::path::Path) -> Result<Option<C>> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(CacheError::Io {
                op: "unable to read from cache",
                path: path.display().to_string(),
                source: e,
            });
        }
    };

    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| CacheError::Corrupt {
            path: path.display().to_string(),
            source: e,
        })
}

fn write_entry<C: CachedCredential>(path: &std::path::Path, credential: &C) -> Result<()> {
    let json = serde_json::to_vec(credential).map_err(CacheError::Serialize)?;
    let dir = path.parent().unwrap_or_else(|| std::path::Path::new("."));
    let io_err = |op: &'static str| {
        let path = path.display().to_string();
        move |source| CacheError::Io { op, path, source }
    };

    // NamedTempFile is created with mode 0600 on unix.
    let mut temp = tempfile::NamedTempFile::new_in(dir).map_err(io_err("create temp file for"))?;
    temp.write_all(&json).map_err(io_err("write temp file for"))?;
    temp.as_file().sync_all().map_err(io_err("sync temp file for"))?;
    temp.persist(path)
        .map_err(|e| e.error)
        .map_err(io_err("replace"))?;
    Ok(())
}
