//! Interactive token acquisition.

use std::time::Duration;

use jit_types::APP_NAME;

use crate::browser::BrowserLauncher;
use crate::error::LoginError;
use crate::listener::{CallbackListener, TokenResult};
use crate::login_url::build_login_url;

/// How long the user gets to finish logging in.
pub const DEFAULT_LOGIN_TIMEOUT: Duration = Duration::from_secs(180);

/// Parameters for one interactive login.
#[derive(Debug, Clone)]
pub struct LoginRequest {
    /// Broker base URL, also the only origin allowed to post a token.
    pub base_url: String,
    pub app_name: String,
    pub admin: bool,
    /// Preferred local port; 0 picks a free one.
    pub port: u16,
    pub timeout: Duration,
}

impl LoginRequest {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            app_name: APP_NAME.to_string(),
            admin: false,
            port: 0,
            timeout: DEFAULT_LOGIN_TIMEOUT,
        }
    }

    pub fn with_admin(mut self, admin: bool) -> Self {
        self.admin = admin;
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = app_name.into();
        self
    }
}

/// Run a browser login and wait for the token.
///
/// The listener is bound before the browser opens so the login page can
/// never call back into nothing. If binding fails the browser is not opened.
pub async fn acquire_token(request: &LoginRequest, browser: &dyn BrowserLauncher) -> TokenResult {
    let listener = CallbackListener::bind(request).await?;
    let url = build_login_url(
        &request.base_url,
        &request.app_name,
        listener.port(),
        request.admin,
    );

    tracing::info!(url = %url, "opening browser for interactive login");
    browser
        .open(&url)
        .map_err(|source| LoginError::BrowserLaunch {
            url: url.clone(),
            source,
        })?;

    let result = listener.wait(request.timeout).await;
    match &result {
        Ok(_) => tracing::debug!("interactive login completed"),
        Err(e) => tracing::debug!(error = %e, "interactive login failed"),
    }
    result
}
