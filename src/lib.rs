pub mod api;
pub mod client;
pub mod handler;
pub use crate::api::auth::utils::cache::{CacheManager, StoredCredential};
pub use crate::api::auth::{AuthorizationPrompt, CredentialProvider};
pub use crate::api::export::{DailyCsvWriter, DayReport, ExportJob, OutputRow, RunReport};
pub use crate::api::search::{
    DateRange, FilterCombination, FilterDimensions, HttpTransport, QueryExecutor, QueryOutcome,
    RateLimiter, RetryPolicy,
};
pub use client::SearchConsoleClient;
pub use handler::env::EnvConfig;
pub use handler::error::ApiError;
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
pub fn name() -> &'static str {
    env!("CARGO_PKG_NAME")
}
pub fn build_info() -> BuildInfo {
    BuildInfo {
        version: version(),
        name: name(),
        authors: env!("CARGO_PKG_AUTHORS"),
        description: env!("CARGO_PKG_DESCRIPTION"),
    }
}
#[derive(Debug, Clone)]
pub struct BuildInfo {
    pub version: &'static str,
    pub name: &'static str,
    pub authors: &'static str,
    pub description: &'static str,
}
impl std::fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} v{}\n{}\nAuthors: {}",
            self.name, self.version, self.description, self.authors
        )
    }
}
