use gscquery::{ApiError, EnvConfig, SearchConsoleClient};
use mockito::Matcher;
use serde_json::json;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

const QUERY_PATH: &str = r"^/sites/.+/searchAnalytics/query$";

fn config(server_url: &str, out: &Path, extra: &[(&str, &str)]) -> Result<EnvConfig, ApiError> {
    let mut vars: HashMap<String, String> = [
        ("PROPERTY_URI", "https://example.com/"),
        ("START_DATE", "2023-01-01"),
        ("END_DATE", "2023-01-01"),
        ("DEVICES", "desktop"),
        ("COUNTRIES", ""),
        ("OUTPUT_LABEL", "prefix"),
        ("MAX_CALLS_PER_MINUTE", "0"),
        ("RETRY_WAIT_SECS", "0"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    vars.insert("SEARCH_CONSOLE_API_URL".into(), server_url.to_string());
    vars.insert("OUTPUT_LOCATION".into(), out.display().to_string());
    for (k, v) in extra {
        vars.insert(k.to_string(), v.to_string());
    }
    Ok(EnvConfig::from_lookup(|key| vars.get(key).cloned())?)
}

fn read_records(path: &Path) -> Vec<Vec<String>> {
    let bytes = fs::read(path).unwrap();
    assert!(bytes.starts_with(b"\xEF\xBB\xBF"), "missing byte-order mark");
    csv::ReaderBuilder::new()
        .has_headers(false)
        .from_reader(&bytes[3..])
        .records()
        .map(|r| r.unwrap().iter().map(String::from).collect())
        .collect()
}

fn row(query: &str) -> serde_json::Value {
    json!({"keys": [query], "clicks": 3, "impressions": 40, "ctr": 0.075, "position": 2.5})
}

#[test]
fn test_single_day_single_device_end_to_end() -> Result<(), ApiError> {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", Matcher::Regex(QUERY_PATH.into()))
        .match_header("authorization", "Bearer test-token")
        .match_body(Matcher::PartialJson(json!({
            "startDate": "2023-01-01",
            "endDate": "2023-01-01",
            "startRow": 0,
            "rowLimit": 5000
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"rows": [row("rust csv"), row("rust retry")]}).to_string())
        .expect(1)
        .create();

    let out = tempfile::tempdir()?;
    let client = SearchConsoleClient::with_access_token(config(&server.url(), out.path(), &[])?, "test-token")?;
    let report = client.run_export()?;
    mock.assert();

    let expected = out.path().join("prefix_20230101.csv");
    assert_eq!(report.days.len(), 1);
    assert_eq!(report.days[0].path, expected);
    assert_eq!(report.total_failures(), 0);

    let files: Vec<_> = fs::read_dir(out.path())?.collect();
    assert_eq!(files.len(), 1);

    let records = read_records(&expected);
    assert_eq!(records.len(), 2);
    for record in &records {
        // query, clicks, impressions, ctr, position, page, country, device, label, day
        assert_eq!(record.len(), 10);
        assert_eq!(record[5], "gsc_property");
        assert_eq!(record[6], "worldwide");
        assert_eq!(record[7], "desktop");
        assert_eq!(record[8], "prefix");
        assert_eq!(record[9], "2023-01-01");
    }
    assert_eq!(records[0][0], "rust csv");
    assert_eq!(records[1][0], "rust retry");
    Ok(())
}

#[test]
fn test_pagination_over_http() -> Result<(), ApiError> {
    let mut server = mockito::Server::new();
    let first = server
        .mock("POST", Matcher::Regex(QUERY_PATH.into()))
        .match_body(Matcher::PartialJson(json!({"startRow": 0})))
        .with_status(200)
        .with_body(json!({"rows": [row("a"), row("b")]}).to_string())
        .expect(1)
        .create();
    let second = server
        .mock("POST", Matcher::Regex(QUERY_PATH.into()))
        .match_body(Matcher::PartialJson(json!({"startRow": 2})))
        .with_status(200)
        .with_body(json!({"rows": [row("c")]}).to_string())
        .expect(1)
        .create();

    let out = tempfile::tempdir()?;
    let config = config(&server.url(), out.path(), &[("MAX_ROWS_PER_DAY", "2")])?;
    let report = SearchConsoleClient::with_access_token(config, "t")?.run_export()?;
    first.assert();
    second.assert();

    assert_eq!(report.days[0].pages, 2);
    let queries: Vec<_> = read_records(&report.days[0].path)
        .into_iter()
        .map(|r| r[0].clone())
        .collect();
    assert_eq!(queries, vec!["a", "b", "c"]);
    Ok(())
}

#[test]
fn test_non_retryable_error_is_skipped_and_day_still_written() -> Result<(), ApiError> {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", Matcher::Regex(QUERY_PATH.into()))
        .with_status(403)
        .with_body(json!({"error": {"code": 403, "message": "User does not have sufficient permission"}}).to_string())
        .expect(1)
        .create();

    let out = tempfile::tempdir()?;
    let report = SearchConsoleClient::with_access_token(config(&server.url(), out.path(), &[])?, "t")?
        .run_export()?;
    mock.assert();

    let day = &report.days[0];
    assert_eq!(day.rows, 0);
    assert_eq!(day.failures.len(), 1);
    assert_eq!(day.failures[0].failure.status, Some(403));
    assert_eq!(day.failures[0].context.device, "desktop");
    assert!(day.path.exists());
    Ok(())
}

#[test]
fn test_retryable_error_exhausts_bounded_attempts() -> Result<(), ApiError> {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", Matcher::Regex(QUERY_PATH.into()))
        .with_status(503)
        .with_body(json!({"error": {"code": 503, "message": "Backend Error"}}).to_string())
        .expect(3)
        .create();

    let out = tempfile::tempdir()?;
    let config = config(
        &server.url(),
        out.path(),
        &[("MAX_RETRIES", "2"), ("END_DATE", "2023-01-02"), ("DEVICES", "")],
    )?;
    let client = SearchConsoleClient::with_access_token(config, "t")?;
    let day = client.job().window.start();
    let mut executor = client.executor()?;
    let report = client.job().run_day(day, &mut executor, &client.writer())?;
    mock.assert();

    assert_eq!(executor.retries(), 2);
    assert_eq!(report.failures[0].failure.attempts, 3);
    assert_eq!(report.failures[0].context.device, "all_devices");
    Ok(())
}

#[test]
fn test_relative_page_is_fatal_before_querying() {
    let out = tempfile::tempdir().unwrap();
    let pages = out.path().join("pages.txt");
    fs::write(&pages, "https://example.com/ok\n/blog/relative\n").unwrap();
    let config = config(
        "http://127.0.0.1:9",
        out.path(),
        &[("PAGES", pages.to_str().unwrap())],
    )
    .unwrap();
    let err = SearchConsoleClient::with_access_token(config, "t").err().unwrap();
    assert!(err.is_config());
}

#[test]
fn test_reversed_window_is_fatal() {
    let out = tempfile::tempdir().unwrap();
    let config = config(
        "http://127.0.0.1:9",
        out.path(),
        &[("START_DATE", "2023-02-01"), ("END_DATE", "2023-01-01")],
    )
    .unwrap();
    let err = SearchConsoleClient::with_access_token(config, "t").err().unwrap();
    assert!(matches!(err, ApiError::InvalidDateRange { .. }));
}
