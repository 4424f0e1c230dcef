//! Config file discovery.
//!
//! Resolution order (later overrides earlier):
//! 1. built-in defaults
//! 2. `~/.config/duplo-jit/config.toml` (XDG user config)
//! 3. environment variables and CLI arguments (handled externally)

use std::path::{Path, PathBuf};

use jit_types::APP_NAME;

use crate::{ConfigError, JitConfig, Result};

/// Default config filename within the XDG config directory.
const USER_CONFIG_FILE: &str = "config.toml";

/// Environment variable to override the config directory.
const CONFIG_DIR_ENV: &str = "DUPLO_JIT_CONFIG_DIR";

/// Result of config discovery and loading.
#[derive(Debug, Clone, Default)]
pub struct LoadedConfig {
    /// The loaded configuration (empty if no file was found).
    pub config: JitConfig,
    /// Path that was loaded, if any.
    pub source: Option<PathBuf>,
    /// Warnings generated during loading (e.g., a malformed file).
    pub warnings: Vec<String>,
}

/// Load the user config file, if present.
///
/// `config_dir` overrides both `DUPLO_JIT_CONFIG_DIR` and the platform default.
/// A missing file yields an empty config; a malformed one yields an empty
/// config plus a warning, never an error.
pub fn load_config(config_dir: Option<&Path>) -> LoadedConfig {
    let path = match config_dir {
        Some(dir) => Some(dir.join(USER_CONFIG_FILE)),
        None => xdg_config_path(),
    };

    let Some(path) = path else {
        return LoadedConfig::default();
    };

    if !path.is_file() {
        return LoadedConfig::default();
    }

    match load_config_file(&path) {
        Ok(config) => LoadedConfig {
            config,
            source: Some(path),
            warnings: Vec::new(),
        },
        Err(e) => LoadedConfig {
            config: JitConfig::new(),
            source: None,
            warnings: vec![format!("Failed to load {}: {}", path.display(), e)],
        },
    }
}

/// Load config from a specific file path (no discovery).
pub fn load_config_file(path: &Path) -> Result<JitConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.display().to_string(),
        source: e,
    })?;
    JitConfig::from_toml(&contents)
}

/// Get the user config file path.
pub fn xdg_config_path() -> Option<PathBuf> {
    xdg_config_dir().map(|d| d.join(USER_CONFIG_FILE))
}

/// Get the config directory for duplo-jit.
///
/// Checks `DUPLO_JIT_CONFIG_DIR` first, then falls back to the platform default.
pub fn xdg_config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV)
        && !dir.is_empty()
    {
        return Some(PathBuf::from(dir));
    }
    dirs::config_dir().map(|d| d.join(APP_NAME))
}
