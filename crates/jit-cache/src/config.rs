//! Cache location and the disable switch.

use std::path::{Path, PathBuf};

use crate::error::{CacheError, Result};

/// Where cached credentials live, fixed once at startup.
///
/// A disabled cache has no directory: every lookup misses and every write or
/// removal is a no-op.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    dir: Option<PathBuf>,
}

impl CacheConfig {
    /// Resolve `<user cache dir>/<tool>` and create it (mode `0700`), unless disabled.
    pub fn init(tool: &str, disabled: bool) -> Result<Self> {
        if disabled {
            return Ok(Self::disabled());
        }
        let base = dirs::cache_dir().ok_or(CacheError::NoCacheDir)?;
        Self::at(base.join(tool))
    }

    /// Use an explicit directory, creating it if needed.
    pub fn at(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        create_private_dir(&dir)?;
        Ok(Self { dir: Some(dir) })
    }

    pub fn disabled() -> Self {
        Self { dir: None }
    }

    pub fn is_disabled(&self) -> bool {
        self.dir.is_none()
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }
}

fn create_private_dir(dir: &Path) -> Result<()> {
    let mut builder = std::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder.create(dir).map_err(|e| CacheError::CreateDir {
        path: dir.display().to_string(),
        source: e,
    })
}
