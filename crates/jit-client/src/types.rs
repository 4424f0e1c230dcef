//! Broker API response types.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Just-in-time AWS credentials as issued by the broker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwsJitCredentials {
    #[serde(rename = "ConsoleUrl", default)]
    pub console_url: String,
    #[serde(rename = "AccessKeyId")]
    pub access_key_id: String,
    #[serde(rename = "SecretAccessKey")]
    pub secret_access_key: String,
    #[serde(rename = "Region", default)]
    pub region: String,
    #[serde(rename = "SessionToken", default)]
    pub session_token: Option<String>,
    /// Lifetime in seconds; `<= 0` means the broker did not say.
    #[serde(rename = "Validity", default)]
    pub validity: i64,
}

/// A tenant as seen by the current user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserTenant {
    #[serde(rename = "TenantId", default)]
    pub tenant_id: String,
    #[serde(rename = "AccountName")]
    pub account_name: String,
    #[serde(rename = "PlanID", default)]
    pub plan_id: String,
}

/// System-wide feature flags. Only the OTP flag matters here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemFeatures {
    #[serde(rename = "IsOtpNeeded", default)]
    pub is_otp_needed: bool,
    #[serde(flatten)]
    pub other: HashMap<String, serde_json::Value>,
}

/// Cluster access descriptor for a plan or tenant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct K8sJitConfig {
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "ApiServer")]
    pub api_server: String,
    #[serde(rename = "Token", default)]
    pub token: String,
    #[serde(rename = "CertificateAuthorityDataBase64", default)]
    pub certificate_authority_data_base64: Option<String>,
    /// When the broker last rotated the token, if it says.
    #[serde(rename = "LastTokenRefreshTime", default)]
    pub last_token_refresh_time: Option<String>,
    #[serde(rename = "Validity", default)]
    pub validity: i64,
}
