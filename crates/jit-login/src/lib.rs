//! Interactive browser login for duplo-jit.
//!
//! A one-shot loopback HTTP listener races the user's browser login against
//! a deadline:
//!
//! 1. bind `127.0.0.1:<port>` and start serving callbacks
//! 2. open the broker's verify-token page, telling it our port
//! 3. take the first callback (token, cancel, or rejection) or time out
//! 4. shut the listener down
//!
//! Exactly one outcome is produced per login. Callbacks that arrive after it
//! are answered but have no effect.

pub mod browser;
pub mod error;
pub mod flow;
pub mod listener;
pub mod login_url;

pub use browser::{BrowserLauncher, SystemBrowser};
pub use error::{LoginError, Result};
pub use flow::{DEFAULT_LOGIN_TIMEOUT, LoginRequest, acquire_token};
pub use listener::{CallbackListener, ResultSlot, TokenGrant, TokenResult, callback_router};
pub use login_url::{build_login_url, build_redirect_url};
