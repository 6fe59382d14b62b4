//! Credential cache for OAuth2 tokens.
//!
//! Tokens are stored as JSON in the platform cache directory so that a run
//! can reuse (or refresh) the previous authorization instead of prompting the
//! operator again.

use crate::handler::error::ApiError;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Seconds before expiry at which a cached access token is treated as stale.
pub const EXPIRY_MARGIN_SECONDS: i64 = 60;

/// A persisted OAuth2 credential.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct StoredCredential {
    /// Bearer token sent with every API call.
    pub access_token: String,
    /// Long-lived token used to mint new access tokens.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Unix timestamp (seconds) at which `access_token` expires.
    pub expires_at: i64,
    /// Unix timestamp (seconds) when this entry was last written.
    pub timestamp: i64,
}

impl StoredCredential {
    pub fn new(access_token: String, refresh_token: Option<String>, expires_in: i64) -> Self {
        let issued = now();
        Self {
            access_token,
            refresh_token,
            expires_at: issued + expires_in,
            timestamp: issued,
        }
    }

    /// Keeps the existing refresh token when a refresh response omits one.
    pub fn refreshed(self, access_token: String, refresh_token: Option<String>, expires_in: i64) -> Self {
        Self::new(access_token, refresh_token.or(self.refresh_token), expires_in)
    }

    /// Whether the access token is still usable.
    pub fn is_fresh(&self) -> bool {
        now() < self.expires_at - EXPIRY_MARGIN_SECONDS
    }
}

/// Reads and writes the credential cache file.
///
/// Defaults to `<cache dir>/gscquery/credentials.json`, e.g.
/// `~/.cache/gscquery/credentials.json` on Linux.
#[derive(Clone)]
pub struct CacheManager {
    cache_dir: PathBuf,
    cache_file: PathBuf,
}

impl CacheManager {
    /// Creates a manager rooted in the system cache directory.
    ///
    /// # Errors
    /// Returns [`ApiError::CacheError`] if the directory cannot be determined or created.
    pub fn new() -> Result<Self, ApiError> {
        let proj_dirs = ProjectDirs::from("com", "gscquery", "gscquery")
            .ok_or_else(|| ApiError::CacheError("Cannot determine cache directory".to_string()))?;
        let cache_dir = proj_dirs.cache_dir().to_path_buf();
        let cache_file = cache_dir.join("credentials.json");
        fs::create_dir_all(&cache_dir)
            .map_err(|e| ApiError::CacheError(format!("Failed to create cache dir: {}", e)))?;
        Ok(Self {
            cache_dir,
            cache_file,
        })
    }

    /// Creates a manager with explicit paths, mostly for tests.
    pub fn with_paths(cache_dir: PathBuf, cache_file: PathBuf) -> Self {
        Self {
            cache_dir,
            cache_file,
        }
    }

    pub fn save(&self, data: &StoredCredential) -> Result<(), ApiError> {
        fs::create_dir_all(&self.cache_dir)
            .map_err(|e| ApiError::CacheError(format!("Failed to create cache dir: {}", e)))?;
        let json = serde_json::to_string_pretty(data)?;
        fs::write(&self.cache_file, json)
            .map_err(|e| ApiError::CacheError(format!("Failed to write cache: {}", e)))
    }

    /// Returns `Ok(None)` when no credential has been cached yet.
    pub fn load(&self) -> Result<Option<StoredCredential>, ApiError> {
        if !self.cache_file.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.cache_file)
            .map_err(|e| ApiError::CacheError(format!("Failed to read cache: {}", e)))?;
        let data: StoredCredential = serde_json::from_str(&content)?;
        Ok(Some(data))
    }

    pub fn clear(&self) -> Result<(), ApiError> {
        if self.cache_file.exists() {
            fs::remove_file(&self.cache_file)
                .map_err(|e| ApiError::CacheError(format!("Failed to clear cache: {}", e)))?;
        }
        Ok(())
    }

    pub fn cache_file_path(&self) -> &Path {
        &self.cache_file
    }

    pub fn cache_dir_path(&self) -> &Path {
        &self.cache_dir
    }
}

/// Returns the current Unix timestamp in seconds.
pub(crate) fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
