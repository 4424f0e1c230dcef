//! Broker session acquisition.
//!
//! Sources are tried in order: an explicit token, a cached session, and
//! finally an interactive browser login. Explicit tokens are never cached.

use anyhow::{Context as _, Result, anyhow, bail};
use jit_client::{DuploClient, DuploProbe};
use jit_login::{LoginRequest, acquire_token};
use jit_types::{CredentialKind, DuploCredsOutput};

use crate::commands::Context;

/// An authenticated broker client plus the session document it was built from.
pub struct Session {
    pub client: DuploClient,
    pub creds: DuploCredsOutput,
}

enum TokenCheck {
    Usable(DuploClient, bool),
    NeedsOtp,
    Rejected(anyhow::Error),
}

/// Ping the broker with a token; admin calls also need an OTP when the broker requires MFA.
async fn check_token(ctx: &Context, token: &str, otp: Option<String>, admin: bool) -> TokenCheck {
    let client = match DuploClient::builder()
        .base_url(&ctx.settings.host)
        .token(token)
        .otp(otp)
        .timeout(ctx.settings.request_timeout)
        .build()
    {
        Ok(client) => client,
        Err(e) => return TokenCheck::Rejected(e.into()),
    };

    match client.features().system().await {
        Err(e) => TokenCheck::Rejected(e.into()),
        Ok(features) if admin && features.is_otp_needed && !client.has_otp() => {
            TokenCheck::NeedsOtp
        }
        Ok(features) => TokenCheck::Usable(client, features.is_otp_needed),
    }
}

/// Obtain a usable broker session.
pub async fn obtain(ctx: &Context, admin: bool) -> Result<Session> {
    let key = ctx.host_key();
    let cache = ctx.cache();
    let interactive = ctx.settings.interactive;

    if let Some(token) = &ctx.token {
        cache.invalidate(&key, CredentialKind::Duplo);
        match check_token(ctx, token, None, admin).await {
            TokenCheck::Usable(client, _) => {
                return Ok(Session {
                    client,
                    creds: DuploCredsOutput::new(token.as_str(), false),
                });
            }
            TokenCheck::NeedsOtp if !interactive => {
                bail!("server requires MFA but --interactive mode is disabled")
            }
            TokenCheck::NeedsOtp => {
                tracing::info!("server requires MFA, continuing interactively");
            }
            TokenCheck::Rejected(e) => {
                return Err(e.context("authentication failure: failed to collect system features"));
            }
        }
    }

    if !interactive {
        bail!("--token not specified and --interactive mode is disabled");
    }

    if ctx.token.is_none() {
        let probe = DuploProbe::new(&ctx.settings.host).with_timeout(ctx.settings.request_timeout);
        if let Some(mut creds) = cache.get::<DuploCredsOutput>(&key, &probe).await {
            match check_token(ctx, &creds.duplo_token, None, admin).await {
                TokenCheck::Usable(client, need_otp) => {
                    creds.need_otp = need_otp;
                    return Ok(Session { client, creds });
                }
                _ => {
                    tracing::debug!(key = %key, "cached session not usable here, logging in again");
                    cache.invalidate(&key, CredentialKind::Duplo);
                }
            }
        }
    }

    let request = LoginRequest::new(ctx.settings.host.as_str())
        .with_admin(admin)
        .with_port(ctx.settings.port)
        .with_timeout(ctx.settings.login_timeout);
    let grant = acquire_token(&request, ctx.browser.as_ref())
        .await
        .context("authentication failure: failed to get token interactively")?;

    let need_otp = grant.otp.is_some();
    let client = match check_token(ctx, &grant.token, grant.otp, admin).await {
        TokenCheck::Usable(client, _) => client,
        TokenCheck::NeedsOtp => {
            return Err(anyhow!("server requires MFA but no OTP was provided"))
                .context("authentication failure");
        }
        TokenCheck::Rejected(e) => {
            return Err(e.context("authentication failure: failed to collect system features"));
        }
    };

    let creds = DuploCredsOutput::new(grant.token, need_otp);
    if ctx.token.is_none() {
        cache.put(&key, &creds);
    }
    Ok(Session { client, creds })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use jit_cache::{CacheConfig, CredentialCache};
    use jit_config::Settings;
    use jit_login::BrowserLauncher;
    use jit_types::CacheKey;
    use tempfile::TempDir;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// A browser that must never be opened.
    struct NoBrowser;

    impl BrowserLauncher for NoBrowser {
        fn open(&self, url: &str) -> std::io::Result<()> {
            panic!("unexpected browser launch: {url}");
        }
    }

    fn context(host: &str, token: Option<&str>, interactive: bool, cache: CacheConfig) -> Context {
        Context {
            settings: Settings {
                host: host.to_string(),
                interactive,
                port: 0,
                no_cache: false,
                login_timeout: Duration::from_secs(1),
                request_timeout: Duration::from_secs(5),
            },
            token: token.map(str::to_string),
            cache,
            browser: Arc::new(NoBrowser),
        }
    }

    async fn broker(otp_needed: bool) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v3/features/system"))
            .and(header("authorization", "Bearer good"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "IsOtpNeeded": otp_needed })),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v3/features/system"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/admin/GetTenantsForUser"))
            .and(header("authorization", "Bearer good"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([{"TenantId": "t1", "AccountName": "dev01"}])),
            )
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
    async fn test_explicit_token() {
        let server = broker(false).await;
        let ctx = context(&server.uri(), Some("good"), false, CacheConfig::disabled());

        let session = obtain(&ctx, true).await.unwrap();
        assert_eq!(session.creds.duplo_token, "good");
        assert!(!session.creds.need_otp);
    }

    #[tokio::test]
    async fn test_explicit_token_is_never_cached() {
        let server = broker(false).await;
        let dir = TempDir::new().unwrap();
        let cache = CacheConfig::at(dir.path()).unwrap();
        let key = CacheKey::new(&server.uri());
        CredentialCache::new(&cache).put(&key, &DuploCredsOutput::new("stale", false));

        let ctx = context(&server.uri(), Some("good"), false, cache);
        obtain(&ctx, false).await.unwrap();

        let entry = ctx.cache().entry_path(&key, CredentialKind::Duplo).unwrap();
        assert!(!entry.exists());
    }

    #[tokio::test]
    async fn test_explicit_token_rejected() {
        let server = broker(false).await;
        let ctx = context(&server.uri(), Some("bad"), true, CacheConfig::disabled());

        let err = obtain(&ctx, false).await.err().unwrap();
        assert!(format!("{err:#}").contains("authentication failure"));
    }

    #[tokio::test]
    async fn test_mfa_without_interactive() {
        let server = broker(true).await;
        let ctx = context(&server.uri(), Some("good"), false, CacheConfig::disabled());

        let err = obtain(&ctx, true).await.err().unwrap();
        assert_eq!(
            err.to_string(),
            "server requires MFA but --interactive mode is disabled"
        );
    }

    #[tokio::test]
    async fn test_mfa_only_matters_for_admin() {
        let server = broker(true).await;
        let ctx = context(&server.uri(), Some("good"), false, CacheConfig::disabled());
        assert!(obtain(&ctx, false).await.is_ok());
    }

    #[tokio::test]
    async fn test_no_token_no_interactive() {
        let ctx = context("https://example.invalid", None, false, CacheConfig::disabled());
        let err = obtain(&ctx, false).await.err().unwrap();
        assert_eq!(
            err.to_string(),
            "--token not specified and --interactive mode is disabled"
        );
    }

    #[tokio::test]
    async fn test_cached_session_reused() {
        let server = broker(false).await;
        let dir = TempDir::new().unwrap();
        let cache = CacheConfig::at(dir.path()).unwrap();
        CredentialCache::new(&cache).put(
            &CacheKey::new(&server.uri()),
            &DuploCredsOutput::new("good", false),
        );

        let ctx = context(&server.uri(), None, true, cache);
        let session = obtain(&ctx, false).await.unwrap();
        assert_eq!(session.creds.duplo_token, "good");
    }

    /// A browser that "logs in" by posting a token to the callback listener.
    struct PostingBrowser {
        base: String,
        token: &'static str,
    }

    impl BrowserLauncher for PostingBrowser {
        fn open(&self, url: &str) -> std::io::Result<()> {
            let port = url
                .split("localPort=")
                .nth(1)
                .and_then(|rest| rest.split('&').next())
                .and_then(|p| p.parse::<u16>().ok())
                .ok_or_else(|| std::io::Error::other("no port in login url"))?;
            let origin = self.base.clone();
            let body = format!(r#"{{"token":"{}"}}"#, self.token);
            tokio::spawn(async move {
                let _ = post_token(port, &origin, body).await;
            });
            Ok(())
        }
    }

    async fn post_token(port: u16, origin: &str, body: String) -> std::io::Result<()> {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        let mut stream = tokio::net::TcpStream::connect(("127.0.0.1", port)).await?;
        let request = format!(
            "POST /v2/callbackWithOtp HTTP/1.1\r\nHost: 127.0.0.1:{port}\r\nOrigin: {origin}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        stream.write_all(request.as_bytes()).await?;
        let mut response = Vec::new();
        stream.read_to_end(&mut response).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_interactive_login_is_cached() {
        let server = broker(false).await;
        let dir = TempDir::new().unwrap();
        let cache = CacheConfig::at(dir.path()).unwrap();

        let mut ctx = context(&server.uri(), None, true, cache);
        ctx.settings.login_timeout = Duration::from_secs(10);
        ctx.browser = Arc::new(PostingBrowser {
            base: server.uri(),
            token: "good",
        });

        let session = obtain(&ctx, false).await.unwrap();
        assert_eq!(session.creds.duplo_token, "good");

        let entry = ctx
            .cache()
            .entry_path(&ctx.host_key(), CredentialKind::Duplo)
            .unwrap();
        assert!(entry.exists());
    }
}
