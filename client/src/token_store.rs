//! Where the client keeps its access/refresh token pair between requests
//! (and, for the file store, between runs).

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use shared::AuthTokens;
use tracing::debug;

use crate::error::ApiError;

pub trait TokenStore: Send + Sync {
    fn load(&self) -> Result<Option<AuthTokens>, ApiError>;
    fn save(&self, tokens: &AuthTokens) -> Result<(), ApiError>;
    fn clear(&self) -> Result<(), ApiError>;
}

/// Tokens that live as long as the process
#[derive(Default)]
pub struct MemoryTokenStore {
    tokens: Mutex<Option<AuthTokens>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<AuthTokens>, ApiError> {
        Ok(self.tokens.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    fn save(&self, tokens: &AuthTokens) -> Result<(), ApiError> {
        *self.tokens.lock().unwrap_or_else(|e| e.into_inner()) = Some(tokens.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), ApiError> {
        *self.tokens.lock().unwrap_or_else(|e| e.into_inner()) = None;
        Ok(())
    }
}

/// Tokens persisted as JSON in a single file
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<data dir>/home-economy/tokens.json`, falling back to the home directory
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir()
            .or_else(dirs::home_dir)
            .map(|dir| dir.join("home-economy").join("tokens.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, action: &str, source: std::io::Error) -> ApiError {
        ApiError::TokenStore { context: format!("Failed to {} {}", action, self.path.display()), source }
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<AuthTokens>, ApiError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error("read", e)),
        };
        Ok(Some(serde_json::from_str(&text)?))
    }

    fn save(&self, tokens: &AuthTokens) -> Result<(), ApiError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.io_error("create directory for", e))?;
        }
        let json = serde_json::to_string_pretty(tokens)?;
        fs::write(&self.path, json).map_err(|e| self.io_error("write", e))?;
        debug!("Saved tokens to {}", self.path.display());
        Ok(())
    }

    fn clear(&self) -> Result<(), ApiError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error("remove", e)),
        }
    }
}
