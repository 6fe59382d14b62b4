use crate::api::search::structs::{AggregationType, Dimension};
use crate::handler::error::ApiError;
use chrono::NaiveDate;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_API_BASE_URL: &str = "https://www.googleapis.com/webmasters/v3";
pub const DEFAULT_ROW_LIMIT: u32 = 5000;
pub const MAX_ROW_LIMIT: u32 = 25000;
pub const DEFAULT_CALLS_PER_MINUTE: u32 = 200;
pub const DEFAULT_MAX_RETRIES: u32 = 5;
pub const DEFAULT_RETRY_WAIT_SECS: u64 = 4;
pub const DEFAULT_DEVICES: [&str; 3] = ["desktop", "mobile", "tablet"];
pub const DEFAULT_LABEL: &str = "gsc";

#[derive(Debug, Error)]
pub enum EnvError {
    #[error("Environment variable {0} not found")]
    NotFound(String),
    #[error("Invalid environment variable: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub property_uri: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub output_location: PathBuf,
    pub max_rows_per_day: u32,
    pub pages_file: Option<PathBuf>,
    pub devices: Vec<String>,
    pub countries: Vec<String>,
    pub label: String,
    pub dimensions: Vec<Dimension>,
    pub aggregation_type: Option<AggregationType>,
    pub max_calls_per_minute: u32,
    pub max_retries: u32,
    pub retry_wait_secs: u64,
    pub client_secrets: PathBuf,
    pub api_base_url: String,
}

impl EnvConfig {
    pub fn load() -> Result<Self, EnvError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup instead of the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, EnvError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let property_uri = required(&lookup, "PROPERTY_URI")?;
        let start_date = parse_date("START_DATE", &required(&lookup, "START_DATE")?)?;
        let end_date = parse_date("END_DATE", &required(&lookup, "END_DATE")?)?;
        let output_location = normalize_output_location(
            &lookup("OUTPUT_LOCATION").unwrap_or_else(|| ".".to_string()),
        );
        let max_rows_per_day = parse_or("MAX_ROWS_PER_DAY", &lookup, DEFAULT_ROW_LIMIT)?;
        if max_rows_per_day == 0 || max_rows_per_day > MAX_ROW_LIMIT {
            return Err(EnvError::Invalid(format!(
                "MAX_ROWS_PER_DAY must be between 1 and {}, got {}",
                MAX_ROW_LIMIT, max_rows_per_day
            )));
        }
        let pages_file = lookup("PAGES")
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .map(PathBuf::from);
        let devices = match lookup("DEVICES") {
            Some(raw) => split_list(&raw),
            None => DEFAULT_DEVICES.iter().map(|d| d.to_string()).collect(),
        };
        let countries = lookup("COUNTRIES")
            .map(|raw| split_list(&raw))
            .unwrap_or_default();
        let label = lookup("OUTPUT_LABEL").unwrap_or_else(|| DEFAULT_LABEL.to_string());
        let dimensions = match lookup("DIMENSIONS") {
            Some(raw) => split_list(&raw)
                .iter()
                .map(|d| {
                    d.parse::<Dimension>()
                        .map_err(|e| EnvError::Invalid(format!("DIMENSIONS: {}", e)))
                })
                .collect::<Result<Vec<_>, _>>()?,
            None => vec![Dimension::Query],
        };
        if dimensions.is_empty() {
            return Err(EnvError::Invalid(
                "DIMENSIONS must name at least one dimension".into(),
            ));
        }
        let aggregation_type = match lookup("AGGREGATION_TYPE") {
            Some(raw) if !raw.trim().is_empty() => Some(
                raw.trim()
                    .parse::<AggregationType>()
                    .map_err(|e| EnvError::Invalid(format!("AGGREGATION_TYPE: {}", e)))?,
            ),
            _ => None,
        };
        Ok(Self {
            property_uri,
            start_date,
            end_date,
            output_location,
            max_rows_per_day,
            pages_file,
            devices,
            countries,
            label,
            dimensions,
            aggregation_type,
            max_calls_per_minute: parse_or(
                "MAX_CALLS_PER_MINUTE",
                &lookup,
                DEFAULT_CALLS_PER_MINUTE,
            )?,
            max_retries: parse_or("MAX_RETRIES", &lookup, DEFAULT_MAX_RETRIES)?,
            retry_wait_secs: parse_or("RETRY_WAIT_SECS", &lookup, DEFAULT_RETRY_WAIT_SECS)?,
            client_secrets: lookup("CLIENT_SECRETS")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("credentials.json")),
            api_base_url: lookup("SEARCH_CONSOLE_API_URL")
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
        })
    }

    /// Reads the page list, if one was configured.
    ///
    /// Every non-blank line must contain the property URI: the API only accepts
    /// full URLs as page filters, so a relative path aborts the run.
    pub fn load_pages(&self) -> Result<Vec<String>, ApiError> {
        match &self.pages_file {
            Some(path) => read_page_list(path, &self.property_uri),
            None => Ok(Vec::new()),
        }
    }
}

pub fn read_page_list(path: &Path, property_uri: &str) -> Result<Vec<String>, ApiError> {
    let content = fs::read_to_string(path).map_err(|e| {
        ApiError::ConfigError(format!("Cannot read page list {}: {}", path.display(), e))
    })?;
    let mut pages = Vec::new();
    for (index, line) in content.lines().enumerate() {
        let page = line.trim();
        if page.is_empty() {
            continue;
        }
        if !page.contains(property_uri) {
            log::error!(
                "Page list line {} does not contain property {}: {}",
                index + 1,
                property_uri,
                page
            );
            return Err(ApiError::ConfigError(format!(
                "Page list line {} ({}) does not contain the property URI {}; full URLs are required",
                index + 1,
                page,
                property_uri
            )));
        }
        pages.push(page.to_string());
    }
    Ok(pages)
}

pub fn normalize_output_location(raw: &str) -> PathBuf {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return PathBuf::from("./");
    }
    if trimmed.ends_with('/') || trimmed.ends_with(std::path::MAIN_SEPARATOR) {
        PathBuf::from(trimmed)
    } else {
        PathBuf::from(format!("{}/", trimmed))
    }
}

fn required<F>(lookup: &F, key: &str) -> Result<String, EnvError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| EnvError::NotFound(key.to_string()))
}

fn parse_date(key: &str, raw: &str) -> Result<NaiveDate, EnvError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|e| EnvError::Invalid(format!("{} must be YYYY-MM-DD ({}): {}", key, raw, e)))
}

fn parse_or<F, T>(key: &str, lookup: &F, default: T) -> Result<T, EnvError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| EnvError::Invalid(format!("{} is not a valid number: {}", key, raw))),
        _ => Ok(default),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
        .collect()
}
