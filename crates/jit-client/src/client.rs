//! Main client implementation.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use url::Url;

use crate::api::{AwsApi, FeaturesApi, K8sApi, TenantsApi};
use crate::error::{Error, Result};

/// Default timeout for requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Header carrying a one-time passcode for MFA-protected calls.
const OTP_HEADER: &str = "otpcode";

/// Older (non-`/v3/`) APIs answer bad connection details with bare 400/404s.
const CONNECTION_HINT: &str = "Please verify your Duplo connection information.";

/// Duplo broker API client.
///
/// ```no_run
/// use jit_client::DuploClient;
///
/// # async fn example() -> jit_client::Result<()> {
/// let client = DuploClient::builder()
///     .base_url("https://example.duplocloud.net")
///     .token("secret")
///     .build()?;
///
/// let features = client.features().system().await?;
/// println!("otp needed: {}", features.is_otp_needed);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct DuploClient {
    inner: Arc<ClientInner>,
}

pub(crate) struct ClientInner {
    pub(crate) http: reqwest::Client,
    pub(crate) base_url: Url,
    pub(crate) has_otp: bool,
}

impl DuploClient {
    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Whether requests carry a one-time passcode.
    pub fn has_otp(&self) -> bool {
        self.inner.has_otp
    }

    // ─────────────────────────────────────────────────────────────────────────
    // API accessors
    // ─────────────────────────────────────────────────────────────────────────

    /// Access the feature flag API.
    pub fn features(&self) -> FeaturesApi {
        FeaturesApi::new(self.clone())
    }

    /// Access the tenant API.
    pub fn tenants(&self) -> TenantsApi {
        TenantsApi::new(self.clone())
    }

    /// Access the AWS JIT API.
    pub fn aws(&self) -> AwsApi {
        AwsApi::new(self.clone())
    }

    /// Access the Kubernetes JIT API.
    pub fn k8s(&self) -> K8sApi {
        K8sApi::new(self.clone())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internal HTTP methods
    // ─────────────────────────────────────────────────────────────────────────

    /// Build a URL for an API path.
    pub(crate) fn url(&self, path: &str) -> Result<Url> {
        let path = path.trim_start_matches('/');
        self.inner.base_url.join(path).map_err(Error::from)
    }

    /// Make a GET request.
    pub(crate) async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path)?;
        tracing::trace!(url = %url, "GET");
        let response = self.inner.http.get(url.clone()).send().await?;
        self.handle_response(&url, response).await
    }

    /// Handle a response, extracting the body or error.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        url: &Url,
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            return Err(self.extract_error(url, response).await);
        }
        let body = response.text().await?;
        tracing::trace!(url = %url, status = status.as_u16(), bytes = body.len(), "received response");
        Ok(serde_json::from_str(&body)?)
    }

    /// Extract an error from a failed response.
    async fn extract_error(&self, url: &Url, response: reqwest::Response) -> Error {
        let status = response.status().as_u16();
        let mut message = match response.text().await {
            Ok(body) if !body.trim().is_empty() => body.trim().to_string(),
            Ok(_) => format!("HTTP {}", status),
            Err(_) => "(read of body failed)".to_string(),
        };

        if !url.path().starts_with("/v3/") && (status == 400 || status == 404) {
            message = format!("{}. {}", message, CONNECTION_HINT);
        }

        let err = Error::Api {
            status,
            url: url.to_string(),
            message,
        };
        tracing::trace!(error = %err, "broker request failed");
        err
    }
}

/// Builder for creating a DuploClient.
#[derive(Debug)]
pub struct ClientBuilder {
    base_url: Option<String>,
    token: Option<String>,
    otp: Option<String>,
    timeout: Duration,
    user_agent: Option<String>,
}

impl ClientBuilder {
    /// Create a new builder with defaults.
    pub fn new() -> Self {
        Self {
            base_url: None,
            token: None,
            otp: None,
            timeout: DEFAULT_TIMEOUT,
            user_agent: None,
        }
    }

    /// Set the broker base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the bearer token.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set a one-time passcode. Empty passcodes are ignored.
    pub fn otp(mut self, otp: Option<String>) -> Self {
        self.otp = otp.filter(|o| !o.is_empty());
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set a custom user agent.
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<DuploClient> {
        let base_url = self
            .base_url
            .filter(|u| !u.is_empty())
            .ok_or_else(|| Error::Config("missing config for Duplo 'host'".to_string()))?;
        let token = self
            .token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::Config("missing config for Duplo 'token'".to_string()))?;

        // Parse and normalize base URL
        let mut base_url = Url::parse(&base_url)?;
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/json; charset=utf-8"),
        );

        let mut auth = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| Error::Config("Invalid token".to_string()))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        if let Some(otp) = &self.otp {
            let mut value = HeaderValue::from_str(otp)
                .map_err(|_| Error::Config("Invalid OTP code".to_string()))?;
            value.set_sensitive(true);
            headers.insert(HeaderName::from_static(OTP_HEADER), value);
        }

        let user_agent = self
            .user_agent
            .unwrap_or_else(|| format!("duplo-jit/{}", env!("CARGO_PKG_VERSION")));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(user_agent)
            .timeout(self.timeout)
            .build()?;

        Ok(DuploClient {
            inner: Arc::new(ClientInner {
                http,
                base_url,
                has_otp: self.otp.is_some(),
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> DuploClient {
        DuploClient::builder()
            .base_url(server.uri())
            .token("tok")
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_requires_base_url() {
        let result = DuploClient::builder().token("tok").build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_builder_requires_token() {
        let result = DuploClient::builder()
            .base_url("https://example.duplocloud.net")
            .build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_builder_normalizes_url() {
        let client = DuploClient::builder()
            .base_url("https://example.duplocloud.net")
            .token("tok")
            .build()
            .unwrap();
        assert_eq!(client.base_url().as_str(), "https://example.duplocloud.net/");
        assert_eq!(
            client.url("/v3/features/system").unwrap().as_str(),
            "https://example.duplocloud.net/v3/features/system"
        );
    }

    #[test]
    fn test_empty_otp_is_ignored() {
        let client = DuploClient::builder()
            .base_url("https://example.duplocloud.net")
            .token("tok")
            .otp(Some(String::new()))
            .build()
            .unwrap();
        assert!(!client.has_otp());
    }

    #[tokio::test]
    async fn test_sends_bearer_and_otp() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v3/features/system"))
            .and(header("authorization", "Bearer tok"))
            .and(header("otpcode", "123456"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"IsOtpNeeded":true}"#))
            .expect(1)
            .mount(&server)
            .await;

        let client = DuploClient::builder()
            .base_url(server.uri())
            .token("tok")
            .otp(Some("123456".to_string()))
            .build()
            .unwrap();
        let features = client.features().system().await.unwrap();
        assert!(features.is_otp_needed);
    }

    #[tokio::test]
    async fn test_legacy_404_gets_hint() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/admin/GetTenantsForUser"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
            .mount(&server)
            .await;

        let err = client(&server).tenants().list_for_user().await.unwrap_err();
        assert!(err.is_not_found());
        let message = err.to_string();
        assert!(message.contains("status: 404"));
        assert!(message.contains(CONNECTION_HINT));
    }

    #[tokio::test]
    async fn test_v3_404_has_no_hint() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v3/features/system"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = client(&server).features().system().await.unwrap_err();
        assert_eq!(err.status(), Some(404));
        assert!(!err.to_string().contains(CONNECTION_HINT));
    }

    #[tokio::test]
    async fn test_unauthorized_is_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
            .mount(&server)
            .await;

        let err = client(&server).features().system().await.unwrap_err();
        assert!(err.is_auth_error());
    }

    #[tokio::test]
    async fn test_invalid_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = client(&server).features().system().await.unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }
}
