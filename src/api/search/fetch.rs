use super::structs::{ApiErrorBody, SearchAnalyticsRequest, SearchAnalyticsResponse};
use crate::handler::error::ApiError;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use std::time::Duration;

const USER_AGENT_STR: &str = concat!("gscquery/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Executes one analytics query against the remote API.
pub trait SearchAnalyticsTransport {
    fn query(
        &self,
        site_url: &str,
        request: &SearchAnalyticsRequest,
    ) -> Result<SearchAnalyticsResponse, ApiError>;
}

impl<F> SearchAnalyticsTransport for F
where
    F: Fn(&str, &SearchAnalyticsRequest) -> Result<SearchAnalyticsResponse, ApiError>,
{
    fn query(
        &self,
        site_url: &str,
        request: &SearchAnalyticsRequest,
    ) -> Result<SearchAnalyticsResponse, ApiError> {
        self(site_url, request)
    }
}

pub struct HttpTransport {
    client: Client,
    base_url: String,
    access_token: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>, access_token: impl Into<String>) -> Result<Self, ApiError> {
        let client = Client::builder()
            .user_agent(USER_AGENT_STR)
            .timeout(REQUEST_TIMEOUT)
            .gzip(true)
            .build()
            .map_err(|e| {
                log::error!("Failed to build HTTP client: {}", e);
                ApiError::from(e)
            })?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        })
    }

    pub fn query_url(&self, site_url: &str) -> String {
        format!(
            "{}/sites/{}/searchAnalytics/query",
            self.base_url,
            urlencoding::encode(site_url)
        )
    }

    fn build_headers(&self) -> Result<HeaderMap, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_STR));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.access_token))
                .map_err(|e| ApiError::CredentialError(format!("Invalid access token: {}", e)))?,
        );
        Ok(headers)
    }
}

impl SearchAnalyticsTransport for HttpTransport {
    fn query(
        &self,
        site_url: &str,
        request: &SearchAnalyticsRequest,
    ) -> Result<SearchAnalyticsResponse, ApiError> {
        let url = self.query_url(site_url);
        log::debug!(
            "POST {} ({} to {}, startRow {})",
            url,
            request.start_date,
            request.end_date,
            request.start_row
        );
        let response = self
            .client
            .post(&url)
            .headers(self.build_headers()?)
            .json(request)
            .send()?;
        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            return Err(parse_error_body(status.as_u16(), &body));
        }
        Ok(serde_json::from_str(&body)?)
    }
}

/// Maps an error response to [`ApiError::Status`], preferring the code in the JSON body.
pub fn parse_error_body(http_status: u16, body: &str) -> ApiError {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) => ApiError::Status {
            code: parsed.error.code,
            message: parsed.error.message,
        },
        Err(_) => ApiError::Status {
            code: http_status,
            message: body.chars().take(200).collect(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_taken_from_body() {
        let err = parse_error_body(
            500,
            r#"{"error": {"code": 503, "message": "Backend Error"}}"#,
        );
        assert!(matches!(err, ApiError::Status { code: 503, ref message } if message == "Backend Error"));
    }

    #[test]
    fn test_unparseable_body_falls_back_to_http_status() {
        let err = parse_error_body(502, "<html>Bad Gateway</html>");
        assert_eq!(err.status_code(), Some(502));
    }

    #[test]
    fn test_site_url_is_path_encoded() {
        let transport = HttpTransport::new("http://localhost/webmasters/v3/", "t").unwrap();
        assert_eq!(
            transport.query_url("https://example.com/"),
            "http://localhost/webmasters/v3/sites/https%3A%2F%2Fexample.com%2F/searchAnalytics/query"
        );
    }
}
