//! OAuth2 client secrets as downloaded from the cloud console.

use crate::handler::error::ApiError;
use serde::Deserialize;
use std::fs;
use std::path::Path;

pub const OOB_REDIRECT_URI: &str = "urn:ietf:wg:oauth:2.0:oob";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
    pub auth_uri: String,
    pub token_uri: String,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

impl ClientSecrets {
    /// Parses a secrets document with either an `installed` or a `web` section.
    pub fn from_json(json: &str) -> Result<Self, ApiError> {
        let file: SecretsFile = serde_json::from_str(json)?;
        file.installed.or(file.web).ok_or_else(|| {
            ApiError::CredentialError(
                "client secrets must contain an \"installed\" or \"web\" section".into(),
            )
        })
    }

    pub fn load(path: &Path) -> Result<Self, ApiError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ApiError::CredentialError(format!(
                "Cannot read client secrets {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&content)
    }

    pub fn redirect_uri(&self) -> &str {
        self.redirect_uris
            .first()
            .map(String::as_str)
            .unwrap_or(OOB_REDIRECT_URI)
    }
}
