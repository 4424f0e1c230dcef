//! Configuration system for duplo-jit.
//!
//! Provides TOML-based defaults for the command-line flags:
//! - `~/.config/duplo-jit/config.toml` (or `$DUPLO_JIT_CONFIG_DIR/config.toml`)
//! - environment variables and CLI arguments layered on top (handled by the binary)
//!
//! The resolved [`Settings`] value is built once at startup and passed down by
//! reference; nothing here is process-global.

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{LoadedConfig, load_config, load_config_file, xdg_config_dir, xdg_config_path};
pub use error::{ConfigError, Result};
pub use types::{
    DEFAULT_LOGIN_TIMEOUT_SECS, DEFAULT_REQUEST_TIMEOUT_SECS, JitConfig, Settings, normalize_host,
};
