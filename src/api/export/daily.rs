use super::shape::{FilterContext, OutputRow, shape_rows};
use super::writer::DailyCsvWriter;
use crate::api::search::dates::DateRange;
use crate::api::search::fetch::SearchAnalyticsTransport;
use crate::api::search::filters::FilterDimensions;
use crate::api::search::paginate::fetch_all_pages;
use crate::api::search::ratelimit::Clock;
use crate::api::search::retry::{QueryExecutor, QueryFailure};
use crate::api::search::structs::{AggregationType, Dimension, SearchAnalyticsRequest};
use crate::handler::error::ApiError;
use chrono::NaiveDate;
use std::path::PathBuf;

/// Everything needed to export one property over a window of days.
#[derive(Debug, Clone)]
pub struct ExportJob {
    pub property_uri: String,
    pub window: DateRange,
    pub filters: FilterDimensions,
    pub dimensions: Vec<Dimension>,
    pub row_limit: u32,
    pub aggregation_type: Option<AggregationType>,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FailedRequest {
    pub day: NaiveDate,
    pub context: FilterContext,
    pub failure: QueryFailure,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DayReport {
    pub day: NaiveDate,
    pub path: PathBuf,
    pub rows: usize,
    pub combinations: usize,
    pub pages: u32,
    pub failures: Vec<FailedRequest>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    pub days: Vec<DayReport>,
}

impl RunReport {
    pub fn total_rows(&self) -> usize {
        self.days.iter().map(|d| d.rows).sum()
    }

    pub fn total_failures(&self) -> usize {
        self.days.iter().map(|d| d.failures.len()).sum()
    }
}

impl ExportJob {
    fn request_for(&self, day: NaiveDate) -> SearchAnalyticsRequest {
        SearchAnalyticsRequest::for_day(day, self.dimensions.clone(), self.row_limit)
            .with_aggregation(self.aggregation_type)
    }

    /// Runs every day in the window. Failed requests are recorded and skipped;
    /// only a failure to write a day's file aborts the run.
    pub fn run<T, C>(
        &self,
        executor: &mut QueryExecutor<T, C>,
        writer: &DailyCsvWriter,
    ) -> Result<RunReport, ApiError>
    where
        T: SearchAnalyticsTransport,
        C: Clock,
    {
        log::info!(
            "Exporting {} from {} to {} ({} days x {} filter combinations)",
            self.property_uri,
            self.window.start(),
            self.window.end(),
            self.window.len(),
            self.filters.combination_count()
        );
        let mut report = RunReport::default();
        for day in self.window.days() {
            let day_report = self.run_day(day, executor, writer)?;
            log::info!(
                "Query for {} has been run: {} rows, {} failed requests",
                day,
                day_report.rows,
                day_report.failures.len()
            );
            report.days.push(day_report);
        }
        Ok(report)
    }

    pub fn run_day<T, C>(
        &self,
        day: NaiveDate,
        executor: &mut QueryExecutor<T, C>,
        writer: &DailyCsvWriter,
    ) -> Result<DayReport, ApiError>
    where
        T: SearchAnalyticsTransport,
        C: Clock,
    {
        let template = self.request_for(day);
        let mut output: Vec<OutputRow> = Vec::new();
        let mut failures = Vec::new();
        let mut pages = 0;
        let mut combinations = 0;
        for combination in self.filters.combinations() {
            combinations += 1;
            let request = template.clone().with_filters(combination.filters().to_vec());
            let fetched = fetch_all_pages(executor, &self.property_uri, &request);
            pages += fetched.pages;
            if let Some(failure) = fetched.failure {
                log::error!(
                    "Request failed for {} [{}]: {} ({} rows kept)",
                    day,
                    combination.describe(),
                    failure.reason,
                    fetched.rows.len()
                );
                failures.push(FailedRequest {
                    day,
                    context: FilterContext::from_combination(&combination),
                    failure,
                });
            }
            output.extend(shape_rows(fetched.rows, &combination, &self.label, day));
        }
        let path = writer.write_day(day, &output)?;
        Ok(DayReport {
            day,
            path,
            rows: output.len(),
            combinations,
            pages,
            failures,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::search::ratelimit::{ManualClock, RateLimiter};
    use crate::api::search::retry::RetryPolicy;
    use crate::api::search::structs::{ResponseRow, SearchAnalyticsResponse};
    use std::fs;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 1, d).unwrap()
    }

    fn job(devices: &[&str]) -> ExportJob {
        ExportJob {
            property_uri: "https://example.com/".into(),
            window: DateRange::new(date(1), date(2)).unwrap(),
            filters: FilterDimensions::new(
                Vec::new(),
                devices.iter().map(|d| d.to_string()).collect(),
                Vec::new(),
            ),
            dimensions: vec![Dimension::Query],
            row_limit: 100,
            aggregation_type: None,
            label: "site".into(),
        }
    }

    fn executor<T: SearchAnalyticsTransport>(transport: T) -> QueryExecutor<T, ManualClock> {
        QueryExecutor::with_limiter(
            transport,
            RateLimiter::with_clock(200, ManualClock::new()),
            RetryPolicy::default(),
        )
    }

    #[test]
    fn test_failed_combination_does_not_abort_day_or_run() {
        let transport = |_: &str, request: &SearchAnalyticsRequest| {
            let device = &request.dimension_filter_groups[0].filters[0].expression;
            if device == "mobile" {
                return Err(ApiError::Status {
                    code: 403,
                    message: "forbidden".into(),
                });
            }
            Ok(SearchAnalyticsResponse {
                response_aggregation_type: None,
                rows: vec![ResponseRow {
                    keys: vec![format!("{} query", device)],
                    clicks: 1.0,
                    impressions: 1.0,
                    ctr: 1.0,
                    position: 1.0,
                }],
            })
        };
        let dir = tempfile::tempdir().unwrap();
        let writer = DailyCsvWriter::new(dir.path(), "site");
        let mut exec = executor(transport);
        let report = job(&["desktop", "mobile", "tablet"])
            .run(&mut exec, &writer)
            .unwrap();

        assert_eq!(report.days.len(), 2);
        assert_eq!(report.total_rows(), 4);
        assert_eq!(report.total_failures(), 2);
        let day = &report.days[0];
        assert_eq!(day.combinations, 3);
        assert_eq!(day.failures[0].context.device, "mobile");
        assert_eq!(day.failures[0].failure.status, Some(403));

        let text = fs::read_to_string(&day.path).unwrap();
        let lines: Vec<_> = text.trim_start_matches('\u{feff}').lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("desktop query,"));
        assert!(lines[1].starts_with("tablet query,"));
    }

    #[test]
    fn test_unfiltered_run_sends_no_filter_group() {
        let transport = |_: &str, request: &SearchAnalyticsRequest| {
            assert!(request.dimension_filter_groups.is_empty());
            assert_eq!(request.start_date, request.end_date);
            Ok::<_, ApiError>(SearchAnalyticsResponse::default())
        };
        let dir = tempfile::tempdir().unwrap();
        let writer = DailyCsvWriter::new(dir.path(), "site");
        let mut exec = executor(transport);
        let report = job(&[]).run(&mut exec, &writer).unwrap();
        assert_eq!(report.days.len(), 2);
        assert!(report.days.iter().all(|d| d.combinations == 1 && d.rows == 0));
        assert!(report.days.iter().all(|d| d.path.exists()));
    }
}
