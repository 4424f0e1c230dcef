//! Loopback callback listener.
//!
//! The broker's login page hands the token back to us in one of two ways:
//! a browser redirect to `GET /?t=<token>`, or a cross-origin
//! `POST /v2/callbackWithOtp` from the page's script carrying
//! `{"token": "...", "otp": "..."}`. Whichever arrives first wins; every
//! later callback is answered but its result is dropped.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Query, State},
    http::{
        HeaderMap, HeaderName, HeaderValue, Method, StatusCode,
        header::{
            ACCEPT, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE,
            LOCATION, ORIGIN,
        },
    },
    response::{IntoResponse, Response},
    routing::{get, post},
};
use parking_lot::Mutex;
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::error::{LoginError, Result};
use crate::flow::LoginRequest;
use crate::login_url::build_redirect_url;

/// Path of the posted callback.
pub const POSTED_CALLBACK_PATH: &str = "/v2/callbackWithOtp";

const ALLOWED_HEADERS: &str = "X-Requested-With, Accept, Content-Type";

/// A token handed back by the login page.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenGrant {
    pub token: String,
    pub otp: Option<String>,
}

impl std::fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenGrant")
            .field("token", &"<redacted>")
            .field("otp", &self.otp.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Outcome of one interactive login.
pub type TokenResult = std::result::Result<TokenGrant, LoginError>;

/// Single-use rendezvous between the callback handlers and the waiter.
#[derive(Clone)]
pub struct ResultSlot(Arc<Mutex<Option<oneshot::Sender<TokenResult>>>>);

impl ResultSlot {
    pub fn new() -> (Self, oneshot::Receiver<TokenResult>) {
        let (tx, rx) = oneshot::channel();
        (Self(Arc::new(Mutex::new(Some(tx)))), rx)
    }

    /// Hand over a result. Returns false if a result was already delivered
    /// or nobody is waiting any more.
    pub fn deliver(&self, result: TokenResult) -> bool {
        let Some(tx) = self.0.lock().take() else {
            tracing::debug!("login result already delivered, ignoring callback");
            return false;
        };
        if tx.send(result).is_err() {
            tracing::debug!("login no longer waiting, dropping callback result");
            return false;
        }
        true
    }
}

struct CallbackState {
    base_url: String,
    redirect_url: String,
    slot: ResultSlot,
}

/// Build the callback router.
///
/// Every response carries `Access-Control-Allow-Origin: <base_url>` so the
/// login page's script can read it.
pub fn callback_router(base_url: &str, redirect_url: String, slot: ResultSlot) -> Result<Router> {
    let origin = HeaderValue::from_str(base_url)
        .map_err(|e| LoginError::Transport(format!("invalid broker origin {base_url}: {e}")))?;

    let state = Arc::new(CallbackState {
        base_url: base_url.to_string(),
        redirect_url,
        slot,
    });

    let cors = CorsLayer::new()
        .allow_origin(origin.clone())
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([HeaderName::from_static("x-requested-with"), ACCEPT, CONTENT_TYPE]);

    Ok(Router::new()
        .route("/", get(handle_query_token))
        .route(POSTED_CALLBACK_PATH, post(handle_posted_token))
        .with_state(state)
        .layer(cors)
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_ORIGIN,
            origin,
        ))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOWED_HEADERS),
        )))
}

/// Handle GET /?t=<token>
async fn handle_query_token(
    State(state): State<Arc<CallbackState>>,
    Query(params): Query<Vec<(String, String)>>,
) -> Response {
    // Repeated `t` parameters are allowed; the first non-empty one wins.
    let token = params
        .into_iter()
        .find_map(|(name, value)| (name == "t" && !value.is_empty()).then_some(value));
    match token {
        Some(token) => {
            state.slot.deliver(Ok(TokenGrant { token, otp: None }));
            (StatusCode::FOUND, [(LOCATION, state.redirect_url.clone())]).into_response()
        }
        None => {
            state.slot.deliver(Err(LoginError::MalformedCallback {
                reason: "missing token".to_string(),
                body: None,
            }));
            (StatusCode::BAD_REQUEST, "missing token").into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
struct PostedToken {
    token: String,
    #[serde(default)]
    otp: Option<String>,
}

/// Handle POST /v2/callbackWithOtp
async fn handle_posted_token(
    State(state): State<Arc<CallbackState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let origin = headers
        .get(ORIGIN)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if origin != state.base_url {
        tracing::debug!(origin, "rejecting login callback from unauthorized origin");
        state.slot.deliver(Err(LoginError::UnauthorizedOrigin {
            origin: origin.to_string(),
        }));
        return (StatusCode::FORBIDDEN, Json("failed")).into_response();
    }

    let result = parse_posted_token(&String::from_utf8_lossy(&body));
    let status = match &result {
        Err(LoginError::MalformedCallback { .. }) => StatusCode::BAD_REQUEST,
        _ => StatusCode::OK,
    };
    state.slot.deliver(result);

    if status.is_success() {
        (status, Json("done")).into_response()
    } else {
        (status, Json("failed")).into_response()
    }
}

/// An empty body means the user canceled on the login page.
fn parse_posted_token(body: &str) -> TokenResult {
    if body.trim().is_empty() {
        return Err(LoginError::Canceled);
    }
    match serde_json::from_str::<PostedToken>(body) {
        Ok(posted) if !posted.token.is_empty() => Ok(TokenGrant {
            token: posted.token,
            otp: posted.otp.filter(|otp| !otp.is_empty()),
        }),
        Ok(_) => Err(LoginError::MalformedCallback {
            reason: "missing token".to_string(),
            body: Some(body.to_string()),
        }),
        Err(e) => Err(LoginError::MalformedCallback {
            reason: e.to_string(),
            body: Some(body.to_string()),
        }),
    }
}

/// Stops the server when the listener goes away, however the wait ended.
struct ShutdownOnDrop(Option<oneshot::Sender<()>>);

impl Drop for ShutdownOnDrop {
    fn drop(&mut self) {
        if let Some(tx) = self.0.take() {
            let _ = tx.send(());
        }
    }
}

/// A bound, serving callback listener.
pub struct CallbackListener {
    port: u16,
    result: oneshot::Receiver<TokenResult>,
    shutdown: ShutdownOnDrop,
}

impl CallbackListener {
    /// Bind `127.0.0.1:<request.port>` (0 picks a free port) and start serving.
    pub async fn bind(request: &LoginRequest) -> Result<Self> {
        let addr = format!("127.0.0.1:{}", request.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| LoginError::Bind {
                addr: addr.clone(),
                source,
            })?;
        let port = listener
            .local_addr()
            .map_err(|source| LoginError::Bind { addr, source })?
            .port();

        let redirect_url =
            build_redirect_url(&request.base_url, &request.app_name, port, request.admin);
        let (slot, result) = ResultSlot::new();
        let router = callback_router(&request.base_url, redirect_url, slot)?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            let served = axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await;
            if let Err(e) = served {
                tracing::warn!(error = %e, "login callback listener failed");
            }
        });
        tracing::debug!(port, "login callback listener started");

        Ok(Self {
            port,
            result,
            shutdown: ShutdownOnDrop(Some(shutdown_tx)),
        })
    }

    /// The bound port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Wait for the first callback, or time out. The listener shuts down
    /// either way.
    pub async fn wait(self, timeout: Duration) -> TokenResult {
        let Self {
            result, shutdown, ..
        } = self;
        let outcome = match tokio::time::timeout(timeout, result).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(LoginError::Transport(
                "callback listener stopped before a result arrived".to_string(),
            )),
            Err(_) => Err(LoginError::Timeout(timeout)),
        };
        drop(shutdown);
        outcome
    }
}
