//! Cache keys and credential kinds.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The kind of credential stored under a cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialKind {
    /// Cloud console / API credentials.
    Aws,
    /// Broker session token.
    Duplo,
    /// Cluster access exec-credential.
    K8s,
}

impl CredentialKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Aws => "aws",
            Self::Duplo => "duplo",
            Self::K8s => "k8s",
        }
    }
}

impl fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stable, filesystem-safe identifier for one logical credential target.
///
/// Built from the broker origin plus role discriminators, e.g.
/// `example.duplocloud.net,tenant,dev01`. Every component is percent-encoded
/// before joining, so a `,` or `/` inside a tenant name can neither escape the
/// cache directory nor make two distinct targets collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Start a key for the given broker origin. A leading `https://` is dropped.
    pub fn new(host: &str) -> Self {
        let origin = host.strip_prefix("https://").unwrap_or(host);
        Self(urlencoding::encode(origin).into_owned())
    }

    /// Append a role discriminator (`admin`, `tenant`, a tenant name, a plan id...).
    pub fn with(mut self, part: &str) -> Self {
        self.0.push(',');
        self.0.push_str(&urlencoding::encode(part));
        self
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Cache file name for a kind: `{key},{kind}-creds.json`.
    pub fn file_name(&self, kind: CredentialKind) -> String {
        format!("{},{}-creds.json", self.0, kind)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
