//! Broker responses to credential documents.
//!
//! Relative lifetimes are turned into absolute expirations here, once, so a
//! cached document can be aged later without knowing when it was written.

use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use jit_types::{
    AwsConfigOutput, ExecCredential, ExecCredentialCluster, ExecCredentialStatus,
    format_timestamp,
};

use crate::error::{Error, Result};
use crate::types::{AwsJitCredentials, K8sJitConfig};

/// Lifetime assumed when the broker reports none.
pub const DEFAULT_VALIDITY_SECS: i64 = 3600;

/// How long a cluster token lives after the broker last refreshed it.
pub const K8S_TOKEN_WINDOW: Duration = Duration::minutes(55);

fn validity(seconds: i64) -> Duration {
    if seconds <= 0 {
        Duration::seconds(DEFAULT_VALIDITY_SECS)
    } else {
        Duration::seconds(seconds)
    }
}

/// Build the `credential_process` document for AWS credentials issued at `now`.
pub fn convert_aws(creds: &AwsJitCredentials, now: DateTime<Utc>) -> AwsConfigOutput {
    AwsConfigOutput {
        version: 1,
        console_url: creds.console_url.clone(),
        access_key_id: creds.access_key_id.clone(),
        secret_access_key: creds.secret_access_key.clone(),
        region: creds.region.clone(),
        session_token: creds.session_token.clone().filter(|t| !t.is_empty()),
        expiration: format_timestamp(now + validity(creds.validity)),
    }
}

/// Build the exec-credential document for a cluster descriptor fetched at `now`.
pub fn convert_k8s(config: &K8sJitConfig, now: DateTime<Utc>) -> Result<ExecCredential> {
    let mut cluster = ExecCredentialCluster {
        server: config.api_server.clone(),
        ..Default::default()
    };
    match config
        .certificate_authority_data_base64
        .as_deref()
        .filter(|d| !d.is_empty())
    {
        Some(data) => {
            let bytes = STANDARD
                .decode(data)
                .map_err(|e| Error::Decode(format!("CA certificate data: {}", e)))?;
            cluster.certificate_authority_data = Some(bytes);
        }
        None => cluster.insecure_skip_tls_verify = true,
    }

    let refreshed = config
        .last_token_refresh_time
        .as_deref()
        .filter(|t| !t.is_empty())
        .and_then(|t| {
            let parsed = parse_refresh_time(t);
            if parsed.is_none() {
                tracing::warn!(value = t, "ignoring unparseable LastTokenRefreshTime");
            }
            parsed
        });
    let expiration = match refreshed {
        Some(at) => at + K8S_TOKEN_WINDOW,
        None => now + validity(config.validity),
    };

    Ok(ExecCredential::new(
        cluster,
        ExecCredentialStatus {
            expiration_timestamp: Some(format_timestamp(expiration)),
            token: config.token.clone(),
        },
    ))
}

/// RFC 3339, or a bare timestamp taken as UTC.
fn parse_refresh_time(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc3339(value) {
        return Some(at.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}
