//! Configuration types.
//!
//! ```toml
//! host = "https://example.duplocloud.net"
//! interactive = true
//! port = 0
//! no_cache = false
//! timeout_secs = 180
//! request_timeout_secs = 20
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// How long the interactive browser login may take.
pub const DEFAULT_LOGIN_TIMEOUT_SECS: u64 = 180;

/// Per-call timeout for broker fetches and liveness probes.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 20;

/// Contents of a config file. Every field is optional so layers can merge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JitConfig {
    /// Broker base URL.
    pub host: Option<String>,
    /// Allow interactive browser logins.
    pub interactive: Option<bool>,
    /// Local callback port (0 = ephemeral).
    pub port: Option<u16>,
    /// Disable the credential cache.
    pub no_cache: Option<bool>,
    /// Interactive login timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: Option<u64>,
}

impl JitConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Merge another layer on top of this one; set fields in `other` win.
    pub fn merge(&mut self, other: JitConfig) {
        if other.host.is_some() {
            self.host = other.host;
        }
        if other.interactive.is_some() {
            self.interactive = other.interactive;
        }
        if other.port.is_some() {
            self.port = other.port;
        }
        if other.no_cache.is_some() {
            self.no_cache = other.no_cache;
        }
        if other.timeout_secs.is_some() {
            self.timeout_secs = other.timeout_secs;
        }
        if other.request_timeout_secs.is_some() {
            self.request_timeout_secs = other.request_timeout_secs;
        }
    }

    /// Resolve into concrete settings, validating the host.
    pub fn resolve(self) -> Result<Settings> {
        let host = normalize_host(self.host.as_deref().unwrap_or_default())?;
        Ok(Settings {
            host,
            interactive: self.interactive.unwrap_or(false),
            port: self.port.unwrap_or(0),
            no_cache: self.no_cache.unwrap_or(false),
            login_timeout: Duration::from_secs(
                self.timeout_secs.unwrap_or(DEFAULT_LOGIN_TIMEOUT_SECS),
            ),
            request_timeout: Duration::from_secs(
                self.request_timeout_secs
                    .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            ),
        })
    }
}

/// Fully resolved settings for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Broker base URL, `https://`, no trailing slash.
    pub host: String,
    pub interactive: bool,
    pub port: u16,
    pub no_cache: bool,
    pub login_timeout: Duration,
    pub request_timeout: Duration,
}

/// Refuse anything but `https://` and trim a trailing slash.
pub fn normalize_host(host: &str) -> Result<String> {
    let host = host.trim();
    if !host.starts_with("https://") || host.len() == "https://".len() {
        return Err(ConfigError::InvalidHost);
    }
    Ok(host.trim_end_matches('/').to_string())
}
