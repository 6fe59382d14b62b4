use crate::handler::env::EnvError;
use chrono::NaiveDate;
use reqwest;
use serde_json;
use thiserror::Error;
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(Box<dyn std::error::Error + Send + Sync>),

    #[error("API returned status {code}: {message}")]
    Status { code: u16, message: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Credential error: {0}")]
    CredentialError(String),

    #[error("Cache error: {0}")]
    CacheError(String),

    #[error("Invalid date range: {end} is before {start}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("Environment error: {0}")]
    EnvError(#[from] EnvError),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ApiError {
    /// Remote status code carried by this error, if the API produced one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ApiError::Status { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Whether this error must abort the run before any querying.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            ApiError::ConfigError(_) | ApiError::EnvError(_) | ApiError::InvalidDateRange { .. }
        )
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::RequestFailed(Box::new(err))
    }
}
