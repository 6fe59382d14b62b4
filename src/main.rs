use clap::{Parser, Subcommand};
use colored::*;
use comfy_table::{ContentArrangement, Table, presets};
use gscquery::{ApiError, CacheManager, EnvConfig, RunReport, SearchConsoleClient};
use std::collections::HashMap;
use std::path::PathBuf;
#[derive(Parser)]
#[command(name = "gscquery")]
#[command(about = "Export search analytics to one CSV per day")]
#[command(version)]
#[command(
    long_about = "Queries the search analytics API for a property, day by day, across every
page/device/country filter combination, and writes <label>_<YYYYMMDD>.csv files.
Settings come from the environment or a .env file; flags override them.
Examples:
  gscquery run --start-date 2023-01-01 --end-date 2023-01-31
  gscquery config        # Show the resolved configuration
  gscquery forget        # Drop cached credentials"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
    /// Load settings from this file instead of ./.env
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,
    #[arg(long, global = true)]
    property_uri: Option<String>,
    #[arg(long, global = true)]
    start_date: Option<String>,
    #[arg(long, global = true)]
    end_date: Option<String>,
    #[arg(long, global = true)]
    output: Option<String>,
    #[arg(long, global = true)]
    label: Option<String>,
    #[arg(long, global = true)]
    pages: Option<String>,
    /// Comma separated; pass an empty string to disable device filtering
    #[arg(long, global = true)]
    devices: Option<String>,
    #[arg(long, global = true)]
    countries: Option<String>,
    #[arg(long, global = true)]
    max_rows_per_day: Option<u32>,
}
#[derive(Subcommand)]
enum Command {
    Run,
    Config,
    Forget,
}
impl Cli {
    fn overrides(&self) -> HashMap<&'static str, String> {
        let mut map = HashMap::new();
        let pairs = [
            ("PROPERTY_URI", &self.property_uri),
            ("START_DATE", &self.start_date),
            ("END_DATE", &self.end_date),
            ("OUTPUT_LOCATION", &self.output),
            ("OUTPUT_LABEL", &self.label),
            ("PAGES", &self.pages),
            ("DEVICES", &self.devices),
            ("COUNTRIES", &self.countries),
        ];
        for (key, value) in pairs {
            if let Some(v) = value {
                map.insert(key, v.clone());
            }
        }
        if let Some(rows) = self.max_rows_per_day {
            map.insert("MAX_ROWS_PER_DAY", rows.to_string());
        }
        map
    }
    fn load_config(&self) -> Result<EnvConfig, ApiError> {
        match &self.env_file {
            Some(path) => {
                dotenv::from_path(path).map_err(|e| {
                    ApiError::ConfigError(format!("Cannot load {}: {}", path.display(), e))
                })?;
            }
            None => {
                dotenv::dotenv().ok();
            }
        }
        let overrides = self.overrides();
        Ok(EnvConfig::from_lookup(|key| {
            overrides
                .get(key)
                .cloned()
                .or_else(|| std::env::var(key).ok())
        })?)
    }
}
fn print_report(report: &RunReport) {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Day", "Rows", "Combinations", "Pages", "Failed", "File"]);
    for day in &report.days {
        table.add_row(vec![
            day.day.to_string(),
            day.rows.to_string(),
            day.combinations.to_string(),
            day.pages.to_string(),
            day.failures.len().to_string(),
            day.path.display().to_string(),
        ]);
    }
    println!("{}", table);
    for day in &report.days {
        for failed in &day.failures {
            println!(
                "  {} {} page={} device={} country={}: {}",
                "✗".red(),
                failed.day,
                failed.context.page,
                failed.context.device,
                failed.context.country,
                failed.failure.reason
            );
        }
    }
    let summary = format!(
        "{} rows over {} days, {} failed requests",
        report.total_rows(),
        report.days.len(),
        report.total_failures()
    );
    if report.total_failures() == 0 {
        println!("{}", summary.green().bold());
    } else {
        println!("{}", summary.yellow().bold());
    }
}
fn execute(cli: &Cli) -> Result<(), ApiError> {
    match cli.command.as_ref().unwrap_or(&Command::Run) {
        Command::Run => {
            let config = cli.load_config()?;
            let client = SearchConsoleClient::with_config(config)?;
            let report = client.run_export()?;
            print_report(&report);
        }
        Command::Config => {
            let config = cli.load_config()?;
            println!("{}", gscquery::build_info().to_string().bold());
            println!("{:#?}", config);
        }
        Command::Forget => {
            let cache = CacheManager::new()?;
            cache.clear()?;
            println!(
                "{} {}",
                "✓ Cleared".green(),
                cache.cache_file_path().display()
            );
        }
    }
    Ok(())
}
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    if let Err(e) = execute(&cli) {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}
