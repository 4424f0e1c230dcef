//! Validated on-disk credential cache.
//!
//! A cached credential is reused only if it outlives the next five minutes
//! *and* a cheap authenticated probe against its target system still accepts
//! it. Anything else (missing, corrupt, expiring, revoked) is a miss, and the
//! stale entry is removed before the miss is reported.
//!
//! # Components
//!
//! - [`config`]: where the cache lives and whether it is enabled
//! - [`credential`]: the [`CachedCredential`] contract per credential kind
//! - [`probe`]: the [`LivenessProbe`] seam implemented by remote clients
//! - [`store`]: [`CredentialCache`]: `get` / `put` / `invalidate`

pub mod config;
pub mod credential;
pub mod error;
pub mod probe;
pub mod store;

pub use config::CacheConfig;
pub use credential::{CachedCredential, EXPIRY_BUFFER};
pub use error::{CacheError, Result};
pub use probe::{LivenessProbe, ProbeError};
pub use store::CredentialCache;
