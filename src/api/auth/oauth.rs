use crate::api::auth::utils::{
    cache::{CacheManager, StoredCredential},
    secrets::ClientSecrets,
};
use crate::handler::error::ApiError;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

pub const SCOPE: &str = "https://www.googleapis.com/auth/webmasters.readonly";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const DEFAULT_EXPIRES_IN: i64 = 3600;

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// Obtains an authorization code from the operator.
pub trait AuthorizationPrompt {
    fn authorization_code(&self, auth_url: &str) -> Result<String, ApiError>;
}

/// Prints the consent URL and reads the code from the terminal.
pub struct ConsolePrompt;

impl AuthorizationPrompt for ConsolePrompt {
    fn authorization_code(&self, auth_url: &str) -> Result<String, ApiError> {
        println!("Please open the following URL in a browser:\n{}", auth_url);
        let mut editor = rustyline::DefaultEditor::new()
            .map_err(|e| ApiError::CredentialError(format!("Cannot open terminal: {}", e)))?;
        let code = editor
            .readline("Enter the authentication code: ")
            .map_err(|e| ApiError::CredentialError(format!("No authentication code: {}", e)))?;
        let code = code.trim().to_string();
        if code.is_empty() {
            return Err(ApiError::CredentialError(
                "Authentication code cannot be empty".into(),
            ));
        }
        Ok(code)
    }
}

pub struct CredentialProvider<P: AuthorizationPrompt = ConsolePrompt> {
    client: Client,
    secrets: ClientSecrets,
    cache_manager: CacheManager,
    prompt: P,
}

impl CredentialProvider<ConsolePrompt> {
    pub fn new(secrets: ClientSecrets) -> Result<Self, ApiError> {
        Self::with_cache(secrets, CacheManager::new()?, ConsolePrompt)
    }
}

impl<P: AuthorizationPrompt> CredentialProvider<P> {
    pub fn with_cache(
        secrets: ClientSecrets,
        cache_manager: CacheManager,
        prompt: P,
    ) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| {
                log::error!("Failed to build HTTP client: {}", e);
                ApiError::from(e)
            })?;
        Ok(Self {
            client,
            secrets,
            cache_manager,
            prompt,
        })
    }

    pub fn cache_manager(&self) -> &CacheManager {
        &self.cache_manager
    }

    /// Returns a usable access token: cached if fresh, refreshed if possible,
    /// otherwise obtained through the interactive consent flow.
    pub fn access_token(&self) -> Result<String, ApiError> {
        let cached = match self.cache_manager.load() {
            Ok(cached) => cached,
            Err(e) => {
                log::warn!("Ignoring unreadable credential cache: {}", e);
                None
            }
        };
        if let Some(credential) = &cached
            && credential.is_fresh()
        {
            log::debug!("Using cached access token");
            return Ok(credential.access_token.clone());
        }
        if let Some(credential) = cached
            && let Some(refresh_token) = credential.refresh_token.clone()
        {
            match self.refresh(&refresh_token) {
                Ok(token) => {
                    let updated = credential.refreshed(
                        token.access_token,
                        token.refresh_token,
                        token.expires_in.unwrap_or(DEFAULT_EXPIRES_IN),
                    );
                    self.cache_manager.save(&updated)?;
                    log::info!("Access token refreshed");
                    return Ok(updated.access_token);
                }
                Err(e) => log::warn!("Token refresh failed, re-authorizing: {}", e),
            }
        }
        let credential = self.authorize()?;
        Ok(credential.access_token)
    }

    /// Runs the consent flow unconditionally and caches the result.
    pub fn authorize(&self) -> Result<StoredCredential, ApiError> {
        let code = self.prompt.authorization_code(&self.authorization_url())?;
        let token = self.exchange_code(&code)?;
        let credential = StoredCredential::new(
            token.access_token,
            token.refresh_token,
            token.expires_in.unwrap_or(DEFAULT_EXPIRES_IN),
        );
        self.cache_manager.save(&credential)?;
        log::info!(
            "Authorization complete. Credentials cached at {:?}",
            self.cache_manager.cache_file_path()
        );
        Ok(credential)
    }

    /// Drops cached credentials so the next run re-authorizes.
    pub fn forget(&self) -> Result<(), ApiError> {
        self.cache_manager.clear()
    }

    pub fn authorization_url(&self) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&scope={}&response_type=code&access_type=offline",
            self.secrets.auth_uri,
            urlencoding::encode(&self.secrets.client_id),
            urlencoding::encode(self.secrets.redirect_uri()),
            urlencoding::encode(SCOPE)
        )
    }

    pub fn exchange_code(&self, code: &str) -> Result<TokenResponse, ApiError> {
        let mut form = HashMap::new();
        form.insert("code", code);
        form.insert("client_id", self.secrets.client_id.as_str());
        form.insert("client_secret", self.secrets.client_secret.as_str());
        form.insert("redirect_uri", self.secrets.redirect_uri());
        form.insert("grant_type", "authorization_code");
        self.post_token_form(&form)
    }

    pub fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, ApiError> {
        let mut form = HashMap::new();
        form.insert("refresh_token", refresh_token);
        form.insert("client_id", self.secrets.client_id.as_str());
        form.insert("client_secret", self.secrets.client_secret.as_str());
        form.insert("grant_type", "refresh_token");
        self.post_token_form(&form)
    }

    fn post_token_form(&self, form: &HashMap<&str, &str>) -> Result<TokenResponse, ApiError> {
        log::debug!(
            "Requesting token ({}) from {}",
            form.get("grant_type").copied().unwrap_or_default(),
            self.secrets.token_uri
        );
        let response = self
            .client
            .post(&self.secrets.token_uri)
            .form(form)
            .send()
            .map_err(|e| {
                log::error!("Network error while requesting token: {}", e);
                ApiError::from(e)
            })?;
        let status = response.status();
        let body = response.text()?;
        validate_token_response(status, &body)?;
        Ok(serde_json::from_str(&body)?)
    }
}

fn validate_token_response(status: StatusCode, body: &str) -> Result<(), ApiError> {
    if status.is_success() {
        return Ok(());
    }
    let snippet: String = body.chars().take(200).collect();
    log::error!("Token endpoint returned HTTP {}: {}", status, snippet);
    match status.as_u16() {
        400 | 401 => Err(ApiError::CredentialError(format!(
            "Token rejected (HTTP {}): {}",
            status, snippet
        ))),
        code => Err(ApiError::Status {
            code,
            message: snippet,
        }),
    }
}
