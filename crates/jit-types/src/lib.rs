//! Shared types for duplo-jit.
//!
//! - [`credential`]: the three credential documents written to stdout and to the cache
//! - [`key`]: cache keys and credential kinds

pub mod credential;
pub mod key;

pub use credential::{
    AwsConfigOutput, DuploCredsOutput, EXEC_CREDENTIAL_API_VERSION, ExecCredential,
    ExecCredentialCluster, ExecCredentialSpec, ExecCredentialStatus, format_timestamp,
};
pub use key::{CacheKey, CredentialKind};

/// Tool identity, used for the cache namespace and the login URL.
pub const APP_NAME: &str = "duplo-jit";
