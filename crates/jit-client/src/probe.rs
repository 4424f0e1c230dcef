//! Liveness probes for cached credentials.
//!
//! Each probe makes the cheapest authenticated call its target system offers.
//! They never retry: any failure, a timeout included, means "do not reuse".

use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use aws_credential_types::Credentials;
use aws_sigv4::http_request::{SignableBody, SignableRequest, SigningSettings, sign};
use aws_sigv4::sign::v4;
use jit_cache::{LivenessProbe, ProbeError};
use jit_types::{AwsConfigOutput, DuploCredsOutput, ExecCredential};

use crate::client::{DEFAULT_TIMEOUT, DuploClient};
use crate::error::{Error, Result};

// ─────────────────────────────────────────────────────────────────────────────
// Broker session
// ─────────────────────────────────────────────────────────────────────────────

/// Checks a broker session token: system features, the user's tenants, and
/// the first tenant's features must all be readable.
pub struct DuploProbe {
    base_url: String,
    timeout: Duration,
}

impl DuploProbe {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl LivenessProbe<DuploCredsOutput> for DuploProbe {
    async fn probe(&self, creds: &DuploCredsOutput) -> std::result::Result<(), ProbeError> {
        let client = DuploClient::builder()
            .base_url(&self.base_url)
            .token(&creds.duplo_token)
            .timeout(self.timeout)
            .build()?;

        client.features().system().await?;
        let tenants = client.tenants().list_for_user().await?;
        let first = tenants
            .first()
            .ok_or_else(|| Error::Auth("user has no tenants".to_string()))?;
        client.features().tenant(&first.tenant_id).await?;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// AWS
// ─────────────────────────────────────────────────────────────────────────────

/// Region used when the credentials do not name one.
pub const DEFAULT_AWS_REGION: &str = "us-east-1";

const STS_BODY: &str = "Action=GetCallerIdentity&Version=2011-06-15";

/// Regional STS endpoint.
pub fn sts_endpoint(region: &str) -> String {
    format!("https://sts.{}.amazonaws.com/", region)
}

/// Checks AWS credentials with a SigV4-signed STS `GetCallerIdentity`.
pub struct StsProbe {
    http: reqwest::Client,
    endpoint: Option<String>,
}

impl StsProbe {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            endpoint: None,
        })
    }

    /// Send to a fixed endpoint instead of the regional one.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }
}

/// Build a signed `GetCallerIdentity` request.
pub fn signed_caller_identity_request(
    endpoint: &str,
    region: &str,
    creds: &AwsConfigOutput,
    time: SystemTime,
) -> Result<reqwest::Request> {
    let signing_error = |e: &dyn std::fmt::Display| Error::Signing(e.to_string());

    let identity = Credentials::new(
        &creds.access_key_id,
        &creds.secret_access_key,
        creds.session_token.clone(),
        None,
        "duplo-jit",
    )
    .into();
    let params = v4::SigningParams::builder()
        .identity(&identity)
        .region(region)
        .name("sts")
        .time(time)
        .settings(SigningSettings::default())
        .build()
        .map_err(|e| signing_error(&e))?
        .into();

    let mut request = http::Request::builder()
        .method(http::Method::POST)
        .uri(endpoint)
        .header(
            http::header::CONTENT_TYPE,
            "application/x-www-form-urlencoded; charset=utf-8",
        )
        .body(STS_BODY.to_string())
        .map_err(|e| signing_error(&e))?;

    let signable = SignableRequest::new(
        request.method().as_str(),
        request.uri().to_string(),
        request
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str(), v))),
        SignableBody::Bytes(STS_BODY.as_bytes()),
    )
    .map_err(|e| signing_error(&e))?;
    let (instructions, _signature) = sign(signable, &params)
        .map_err(|e| signing_error(&e))?
        .into_parts();
    instructions.apply_to_request_http1x(&mut request);

    Ok(reqwest::Request::try_from(request)?)
}

#[async_trait]
impl LivenessProbe<AwsConfigOutput> for StsProbe {
    async fn probe(&self, creds: &AwsConfigOutput) -> std::result::Result<(), ProbeError> {
        let region = if creds.region.is_empty() {
            DEFAULT_AWS_REGION
        } else {
            creds.region.as_str()
        };
        let endpoint = self
            .endpoint
            .clone()
            .unwrap_or_else(|| sts_endpoint(region));

        let request = signed_caller_identity_request(&endpoint, region, creds, SystemTime::now())?;
        let response = self.http.execute(request).await.map_err(Error::from)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProbeError::new(format!(
                "sts GetCallerIdentity returned {}",
                status
            )));
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Kubernetes
// ─────────────────────────────────────────────────────────────────────────────

/// Checks a cluster token by listing service accounts in one namespace.
///
/// Certificate verification is off: the probe only asks whether the token
/// is accepted, and plan-level credentials may come without a CA bundle.
pub struct K8sProbe {
    http: reqwest::Client,
    namespace: String,
}

impl K8sProbe {
    pub fn new(namespace: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            namespace: namespace.into(),
        })
    }

    /// Probe a tenant's namespace.
    pub fn for_tenant(tenant_name: &str, timeout: Duration) -> Result<Self> {
        Self::new(format!("duploservices-{}", tenant_name), timeout)
    }

    /// Probe a plan-level credential.
    pub fn for_plan(timeout: Duration) -> Result<Self> {
        Self::new("kube-system", timeout)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

#[async_trait]
impl LivenessProbe<ExecCredential> for K8sProbe {
    async fn probe(&self, cred: &ExecCredential) -> std::result::Result<(), ProbeError> {
        let server = cred
            .server()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ProbeError::new("exec credential has no server"))?;
        let token = cred
            .token()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ProbeError::new("exec credential has no token"))?;

        let url = format!(
            "{}/api/v1/namespaces/{}/serviceaccounts",
            server.trim_end_matches('/'),
            self.namespace
        );
        let response = self
            .http
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(Error::from)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProbeError::new(format!("GET {} returned {}", url, status)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jit_types::{ExecCredentialCluster, ExecCredentialStatus};
    use wiremock::matchers::{body_string, header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn aws_creds(session_token: Option<&str>) -> AwsConfigOutput {
        AwsConfigOutput {
            version: 1,
            console_url: String::new(),
            access_key_id: "AKIDEXAMPLE".to_string(),
            secret_access_key: "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY".to_string(),
            region: "us-west-2".to_string(),
            session_token: session_token.map(str::to_string),
            expiration: String::new(),
        }
    }

    #[test]
    fn test_sts_endpoint() {
        assert_eq!(sts_endpoint("eu-west-1"), "https://sts.eu-west-1.amazonaws.com/");
    }

    #[test]
    fn test_signed_request_headers() {
        let request = signed_caller_identity_request(
            "https://sts.us-west-2.amazonaws.com/",
            "us-west-2",
            &aws_creds(Some("session")),
            SystemTime::now(),
        )
        .unwrap();

        let auth = request.headers()["authorization"].to_str().unwrap();
        assert!(auth.starts_with("AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/"));
        assert!(auth.contains("/us-west-2/sts/aws4_request"));
        assert!(request.headers().contains_key("x-amz-date"));
        assert_eq!(request.headers()["x-amz-security-token"], "session");
        assert_eq!(request.method(), reqwest::Method::POST);
    }

    #[tokio::test]
    async fn test_sts_probe_accepts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .and(header_exists("authorization"))
            .and(body_string(STS_BODY))
            .respond_with(ResponseTemplate::new(200).set_body_string("<GetCallerIdentityResponse/>"))
            .expect(1)
            .mount(&server)
            .await;

        let probe = StsProbe::new(DEFAULT_TIMEOUT)
            .unwrap()
            .with_endpoint(format!("{}/", server.uri()));
        probe.probe(&aws_creds(None)).await.unwrap();
    }

    #[tokio::test]
    async fn test_sts_probe_rejects() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("<ErrorResponse/>"))
            .mount(&server)
            .await;

        let probe = StsProbe::new(DEFAULT_TIMEOUT)
            .unwrap()
            .with_endpoint(format!("{}/", server.uri()));
        let err = probe.probe(&aws_creds(None)).await.unwrap_err();
        assert!(err.to_string().contains("403"));
    }

    async fn broker(tenants: serde_json::Value) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v3/features/system"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/admin/GetTenantsForUser"))
            .respond_with(ResponseTemplate::new(200).set_body_json(tenants))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v3/features/tenant/t1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn test_duplo_probe_accepts() {
        let server = broker(serde_json::json!([{"TenantId": "t1", "AccountName": "dev01"}])).await;
        let probe = DuploProbe::new(server.uri());
        probe
            .probe(&DuploCredsOutput::new("tok", false))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_duplo_probe_no_tenants() {
        let server = broker(serde_json::json!([])).await;
        let probe = DuploProbe::new(server.uri());
        let err = probe
            .probe(&DuploCredsOutput::new("tok", false))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no tenants"));
    }

    #[tokio::test]
    async fn test_duplo_probe_bad_token() {
        let server = broker(serde_json::json!([])).await;
        let probe = DuploProbe::new(server.uri());
        assert!(
            probe
                .probe(&DuploCredsOutput::new("other", false))
                .await
                .is_err()
        );
    }

    /// Collects formatted log output for one test.
    #[derive(Clone, Default)]
    struct CapturedLogs(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CapturedLogs {
        type Writer = CapturedLogs;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[tokio::test]
    async fn test_revoked_session_is_silent_at_warn() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v3/features/system"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
            .mount(&server)
            .await;

        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let result = DuploProbe::new(server.uri())
            .probe(&DuploCredsOutput::new("revoked", false))
            .await;
        assert!(result.is_err());
        assert_eq!(logs.text(), "");

        tracing::warn!("visible");
        assert!(logs.text().contains("visible"));
    }

    fn exec_credential(server: &str, token: &str) -> ExecCredential {
        ExecCredential::new(
            ExecCredentialCluster {
                server: server.to_string(),
                certificate_authority_data: None,
                insecure_skip_tls_verify: true,
            },
            ExecCredentialStatus {
                expiration_timestamp: None,
                token: token.to_string(),
            },
        )
    }

    #[tokio::test]
    async fn test_k8s_probe_tenant_namespace() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/namespaces/duploservices-dev01/serviceaccounts"))
            .and(header("authorization", "Bearer k8s-token"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"items":[]}"#))
            .expect(1)
            .mount(&server)
            .await;

        let probe = K8sProbe::for_tenant("dev01", DEFAULT_TIMEOUT).unwrap();
        probe
            .probe(&exec_credential(&server.uri(), "k8s-token"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_k8s_probe_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/namespaces/kube-system/serviceaccounts"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let probe = K8sProbe::for_plan(DEFAULT_TIMEOUT).unwrap();
        assert!(
            probe
                .probe(&exec_credential(&server.uri(), "k8s-token"))
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_k8s_probe_missing_token() {
        let probe = K8sProbe::for_plan(DEFAULT_TIMEOUT).unwrap();
        assert!(
            probe
                .probe(&exec_credential("https://k8s.example", ""))
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_probe_unreachable_is_failure() {
        let probe = K8sProbe::for_plan(Duration::from_millis(500)).unwrap();
        assert!(
            probe
                .probe(&exec_credential("http://127.0.0.1:9", "tok"))
                .await
                .is_err()
        );
    }
}
