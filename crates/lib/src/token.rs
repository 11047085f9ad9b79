//! Persisted credential: the single bearer token kept between runs.
//!
//! Stored as plain text in one file with a fixed name (e.g. `~/.askdoc/token`).
//! Session and document caches are never persisted.

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// File name of the stored token inside the config directory.
pub const TOKEN_FILE_NAME: &str = "token";

/// Backing storage for the bearer token.
pub trait TokenStore: Send + Sync {
    /// Stored token, if any. Empty or whitespace-only contents count as absent.
    fn load(&self) -> Option<String>;
    fn save(&self, token: &str) -> Result<()>;
    /// Remove the stored token. Clearing an absent token is not an error.
    fn clear(&self) -> Result<()>;
}

/// Token kept in a file on disk.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Option<String> {
        let s = std::fs::read_to_string(&self.path).ok()?;
        let t = s.trim().to_string();
        if t.is_empty() {
            None
        } else {
            Some(t)
        }
    }

    fn save(&self, token: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, token)?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Token kept only for the life of the process.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Option<String> {
        let g = self.token.lock().unwrap_or_else(|e| e.into_inner());
        g.as_ref()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
    }

    fn save(&self, token: &str) -> Result<()> {
        *self.token.lock().unwrap_or_else(|e| e.into_inner()) = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.token.lock().unwrap_or_else(|e| e.into_inner()) = None;
        Ok(())
    }
}
