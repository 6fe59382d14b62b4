use crate::api::auth::CredentialProvider;
use crate::api::auth::utils::ClientSecrets;
use crate::api::export::{DailyCsvWriter, ExportJob, RunReport};
use crate::api::search::{DateRange, FilterDimensions, HttpTransport, QueryExecutor, RetryPolicy};
use crate::handler::env::EnvConfig;
use crate::handler::error::ApiError;
use std::time::Duration;

pub struct SearchConsoleClient {
    config: EnvConfig,
    job: ExportJob,
    access_token: String,
}

impl SearchConsoleClient {
    pub fn new() -> Result<Self, ApiError> {
        let config = EnvConfig::load()?;
        Self::with_config(config)
    }

    /// Validates the configuration, then authorizes through the cached or
    /// interactive OAuth2 flow. Configuration errors surface before any
    /// network traffic.
    pub fn with_config(config: EnvConfig) -> Result<Self, ApiError> {
        let job = build_job(&config)?;
        let secrets = ClientSecrets::load(&config.client_secrets)?;
        let access_token = CredentialProvider::new(secrets)?.access_token()?;
        Ok(Self {
            config,
            job,
            access_token,
        })
    }

    /// Skips the credential provider and uses `access_token` as-is.
    pub fn with_access_token(
        config: EnvConfig,
        access_token: impl Into<String>,
    ) -> Result<Self, ApiError> {
        let job = build_job(&config)?;
        Ok(Self {
            config,
            job,
            access_token: access_token.into(),
        })
    }

    pub fn config(&self) -> &EnvConfig {
        &self.config
    }

    pub fn job(&self) -> &ExportJob {
        &self.job
    }

    pub fn writer(&self) -> DailyCsvWriter {
        DailyCsvWriter::new(&self.config.output_location, &self.config.label)
    }

    pub fn executor(&self) -> Result<QueryExecutor<HttpTransport>, ApiError> {
        let transport = HttpTransport::new(&self.config.api_base_url, &self.access_token)?;
        let policy = RetryPolicy::new(
            self.config.max_retries,
            Duration::from_secs(self.config.retry_wait_secs),
        );
        Ok(QueryExecutor::new(
            transport,
            self.config.max_calls_per_minute,
            policy,
        ))
    }

    pub fn run_export(&self) -> Result<RunReport, ApiError> {
        let mut executor = self.executor()?;
        self.job.run(&mut executor, &self.writer())
    }
}

pub fn build_job(config: &EnvConfig) -> Result<ExportJob, ApiError> {
    let window = DateRange::new(config.start_date, config.end_date)?;
    let pages = config.load_pages()?;
    Ok(ExportJob {
        property_uri: config.property_uri.clone(),
        window,
        filters: FilterDimensions::new(pages, config.devices.clone(), config.countries.clone()),
        dimensions: config.dimensions.clone(),
        row_limit: config.max_rows_per_day,
        aggregation_type: config.aggregation_type,
        label: config.label.clone(),
    })
}
