//! Credential documents.
//!
//! These are written verbatim to stdout (where the AWS CLI or kubectl parse
//! them) and to the on-disk cache, so field names follow the consumers'
//! formats rather than Rust conventions.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// API version of the exec-credential document understood by kubectl.
pub const EXEC_CREDENTIAL_API_VERSION: &str = "client.authentication.k8s.io/v1beta1";

/// Format a timestamp the way both consumers expect: RFC 3339, whole seconds, `Z`.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(value).map(|t| t.with_timezone(&Utc))
}

// ─────────────────────────────────────────────────────────────────────────────
// Cloud console credentials
// ─────────────────────────────────────────────────────────────────────────────

/// AWS `credential_process` output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwsConfigOutput {
    #[serde(rename = "Version")]
    pub version: u32,
    #[serde(rename = "ConsoleUrl", default)]
    pub console_url: String,
    #[serde(rename = "AccessKeyId")]
    pub access_key_id: String,
    #[serde(rename = "SecretAccessKey")]
    pub secret_access_key: String,
    #[serde(rename = "Region", default)]
    pub region: String,
    #[serde(
        rename = "SessionToken",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub session_token: Option<String>,
    /// RFC 3339 absolute expiration.
    #[serde(rename = "Expiration", default)]
    pub expiration: String,
}

impl AwsConfigOutput {
    pub fn expires_at(&self) -> Result<DateTime<Utc>, chrono::ParseError> {
        parse_timestamp(&self.expiration)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Broker session credentials
// ─────────────────────────────────────────────────────────────────────────────

/// Broker session token output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuploCredsOutput {
    #[serde(rename = "Version")]
    pub version: u32,
    #[serde(rename = "DuploToken", default, skip_serializing_if = "String::is_empty")]
    pub duplo_token: String,
    #[serde(rename = "NeedOTP", default)]
    pub need_otp: bool,
}

impl DuploCredsOutput {
    pub fn new(token: impl Into<String>, need_otp: bool) -> Self {
        Self {
            version: 1,
            duplo_token: token.into(),
            need_otp,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Cluster access credentials
// ─────────────────────────────────────────────────────────────────────────────

/// A `client.authentication.k8s.io/v1beta1` ExecCredential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecCredential {
    pub kind: String,
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub spec: ExecCredentialSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ExecCredentialStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecCredentialSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster: Option<ExecCredentialCluster>,
    #[serde(default)]
    pub interactive: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecCredentialCluster {
    pub server: String,
    /// Raw (decoded) CA bundle; base64 on the wire.
    #[serde(
        rename = "certificate-authority-data",
        default,
        skip_serializing_if = "Option::is_none",
        with = "base64_bytes"
    )]
    pub certificate_authority_data: Option<Vec<u8>>,
    #[serde(
        rename = "insecure-skip-tls-verify",
        default,
        skip_serializing_if = "std::ops::Not::not"
    )]
    pub insecure_skip_tls_verify: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecCredentialStatus {
    #[serde(
        rename = "expirationTimestamp",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub expiration_timestamp: Option<String>,
    #[serde(default)]
    pub token: String,
}

impl ExecCredential {
    pub fn new(cluster: ExecCredentialCluster, status: ExecCredentialStatus) -> Self {
        Self {
            kind: "ExecCredential".to_string(),
            api_version: EXEC_CREDENTIAL_API_VERSION.to_string(),
            spec: ExecCredentialSpec {
                cluster: Some(cluster),
                interactive: false,
            },
            status: Some(status),
        }
    }

    /// Absolute expiration, or `None` when the document carries none (or an unparseable one).
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.status
            .as_ref()
            .and_then(|s| s.expiration_timestamp.as_deref())
            .and_then(|t| parse_timestamp(t).ok())
    }

    pub fn token(&self) -> Option<&str> {
        self.status.as_ref().map(|s| s.token.as_str())
    }

    pub fn server(&self) -> Option<&str> {
        self.spec.cluster.as_ref().map(|c| c.server.as_str())
    }
}

mod base64_bytes {
    use base64::{Engine, engine::general_purpose::STANDARD};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Vec<u8>>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(bytes) => s.serialize_str(&STANDARD.encode(bytes)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<u8>>, D::Error> {
        let encoded: Option<String> = Option::deserialize(d)?;
        encoded
            .map(|e| STANDARD.decode(e).map_err(serde::de::Error::custom))
            .transpose()
    }
}
