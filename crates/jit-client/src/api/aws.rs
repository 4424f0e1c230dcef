//! AWS JIT API.

use crate::client::DuploClient;
use crate::error::Result;
use crate::types::AwsJitCredentials;

/// AWS JIT API client.
pub struct AwsApi {
    client: DuploClient,
}

impl AwsApi {
    pub(crate) fn new(client: DuploClient) -> Self {
        Self { client }
    }

    /// Admin credentials for a named role (`admin`, `duplo-ops`, ...).
    pub async fn admin_jit_access(&self, role: &str) -> Result<AwsJitCredentials> {
        self.client
            .get(&format!("v3/admin/aws/jitAccess/{}", role))
            .await
    }

    /// Admin credentials, falling back to the legacy endpoint on brokers
    /// that predate the role-based one.
    pub async fn admin_credentials(&self) -> Result<AwsJitCredentials> {
        match self.admin_jit_access("admin").await {
            Err(e) if e.status() == Some(404) => {
                tracing::debug!("jitAccess not available, using legacy admin endpoint");
                self.legacy_admin_credentials().await
            }
            other => other,
        }
    }

    /// Admin credentials from the legacy endpoint.
    pub async fn legacy_admin_credentials(&self) -> Result<AwsJitCredentials> {
        self.client
            .get("adminproxy/GetJITAwsConsoleAccessUrl")
            .await
    }

    /// Credentials scoped to one tenant.
    pub async fn tenant_credentials(&self, tenant_id: &str) -> Result<AwsJitCredentials> {
        self.client
            .get(&format!("subscriptions/{}/GetAwsConsoleTokenUrl", tenant_id))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn creds_body(key: &str) -> serde_json::Value {
        serde_json::json!({
            "ConsoleUrl": "https://console",
            "AccessKeyId": key,
            "SecretAccessKey": "secret",
            "Region": "us-west-2",
            "SessionToken": "session",
            "Validity": 3600
        })
    }

    fn client(server: &MockServer) -> DuploClient {
        DuploClient::builder()
            .base_url(server.uri())
            .token("tok")
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_admin_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v3/admin/aws/jitAccess/admin"))
            .respond_with(ResponseTemplate::new(200).set_body_json(creds_body("NEW")))
            .mount(&server)
            .await;

        let creds = client(&server).aws().admin_credentials().await.unwrap();
        assert_eq!(creds.access_key_id, "NEW");
        assert_eq!(creds.validity, 3600);
    }

    #[tokio::test]
    async fn test_admin_credentials_legacy_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v3/admin/aws/jitAccess/admin"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/adminproxy/GetJITAwsConsoleAccessUrl"))
            .respond_with(ResponseTemplate::new(200).set_body_json(creds_body("LEGACY")))
            .expect(1)
            .mount(&server)
            .await;

        let creds = client(&server).aws().admin_credentials().await.unwrap();
        assert_eq!(creds.access_key_id, "LEGACY");
    }

    #[tokio::test]
    async fn test_admin_credentials_no_fallback_on_403() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v3/admin/aws/jitAccess/admin"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/adminproxy/GetJITAwsConsoleAccessUrl"))
            .respond_with(ResponseTemplate::new(200).set_body_json(creds_body("LEGACY")))
            .expect(0)
            .mount(&server)
            .await;

        let err = client(&server).aws().admin_credentials().await.unwrap_err();
        assert_eq!(err.status(), Some(403));
    }

    #[tokio::test]
    async fn test_tenant_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/subscriptions/tenant-id/GetAwsConsoleTokenUrl"))
            .respond_with(ResponseTemplate::new(200).set_body_json(creds_body("TENANT")))
            .mount(&server)
            .await;

        let creds = client(&server)
            .aws()
            .tenant_credentials("tenant-id")
            .await
            .unwrap();
        assert_eq!(creds.access_key_id, "TENANT");
    }
}
