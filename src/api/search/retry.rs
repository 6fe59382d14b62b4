//! Rate-limited, retrying execution of single analytics queries.
//!
//! Each query moves through a small state machine:
//!
//! ```text
//! Attempting --ok--------------------------> Succeeded
//! Attempting --retryable, budget left------> Retrying --wait--> Attempting
//! Attempting --retryable, budget spent-----> ExhaustedFailed
//! Attempting --any other error-------------> NonRetryableFailed
//! ```
//!
//! Failures never propagate as errors: the caller receives
//! [`QueryOutcome::NoResult`], which is distinct from an empty successful page.

use super::fetch::SearchAnalyticsTransport;
use super::ratelimit::{Clock, RateLimiter, SystemClock};
use super::structs::{SearchAnalyticsRequest, SearchAnalyticsResponse};
use crate::handler::error::ApiError;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub wait_interval: Duration,
    pub retryable_statuses: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            wait_interval: Duration::from_secs(4),
            retryable_statuses: vec![500, 503],
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, wait_interval: Duration) -> Self {
        Self {
            max_retries,
            wait_interval,
            ..Self::default()
        }
    }

    pub fn is_retryable(&self, error: &ApiError) -> bool {
        error
            .status_code()
            .is_some_and(|code| self.retryable_statuses.contains(&code))
    }

    /// Next state after attempt number `attempt` (1-based) produced `result`.
    pub fn next_state(
        &self,
        attempt: u32,
        result: Result<SearchAnalyticsResponse, ApiError>,
    ) -> RetryState {
        match result {
            Ok(response) => RetryState::Succeeded(response),
            Err(error) if self.is_retryable(&error) => {
                if attempt <= self.max_retries {
                    RetryState::Retrying { attempt, error }
                } else {
                    RetryState::ExhaustedFailed(QueryFailure::new(
                        FailureKind::Exhausted,
                        attempt,
                        &error,
                    ))
                }
            }
            Err(error) => RetryState::NonRetryableFailed(QueryFailure::new(
                FailureKind::NonRetryable,
                attempt,
                &error,
            )),
        }
    }
}

#[derive(Debug)]
pub enum RetryState {
    Attempting { attempt: u32 },
    Retrying { attempt: u32, error: ApiError },
    Succeeded(SearchAnalyticsResponse),
    ExhaustedFailed(QueryFailure),
    NonRetryableFailed(QueryFailure),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Exhausted,
    NonRetryable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryFailure {
    pub kind: FailureKind,
    pub attempts: u32,
    pub status: Option<u16>,
    pub reason: String,
}

impl QueryFailure {
    fn new(kind: FailureKind, attempts: u32, error: &ApiError) -> Self {
        Self {
            kind,
            attempts,
            status: error.status_code(),
            reason: error.to_string(),
        }
    }
}

#[derive(Debug)]
pub enum QueryOutcome {
    Rows(SearchAnalyticsResponse),
    NoResult(QueryFailure),
}

impl QueryOutcome {
    pub fn is_no_result(&self) -> bool {
        matches!(self, QueryOutcome::NoResult(_))
    }
}

pub struct QueryExecutor<T, C: Clock = SystemClock> {
    transport: T,
    limiter: RateLimiter<C>,
    policy: RetryPolicy,
    retries: u64,
}

impl<T: SearchAnalyticsTransport> QueryExecutor<T, SystemClock> {
    pub fn new(transport: T, max_calls_per_minute: u32, policy: RetryPolicy) -> Self {
        Self::with_limiter(transport, RateLimiter::new(max_calls_per_minute), policy)
    }
}

impl<T: SearchAnalyticsTransport, C: Clock> QueryExecutor<T, C> {
    pub fn with_limiter(transport: T, limiter: RateLimiter<C>, policy: RetryPolicy) -> Self {
        Self {
            transport,
            limiter,
            policy,
            retries: 0,
        }
    }

    pub fn limiter(&self) -> &RateLimiter<C> {
        &self.limiter
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Total retries performed over this executor's lifetime.
    pub fn retries(&self) -> u64 {
        self.retries
    }

    pub fn execute(&mut self, site_url: &str, request: &SearchAnalyticsRequest) -> QueryOutcome {
        let mut state = RetryState::Attempting { attempt: 1 };
        loop {
            state = match state {
                RetryState::Attempting { attempt } => {
                    let transport = &self.transport;
                    let result = self.limiter.call(|| transport.query(site_url, request));
                    self.policy.next_state(attempt, result)
                }
                RetryState::Retrying { attempt, error } => {
                    log::warn!(
                        "Attempt {} for {} (startRow {}) failed: {}; retrying in {:?}",
                        attempt,
                        request.start_date,
                        request.start_row,
                        error,
                        self.policy.wait_interval
                    );
                    self.limiter.clock().sleep(self.policy.wait_interval);
                    self.retries += 1;
                    RetryState::Attempting {
                        attempt: attempt + 1,
                    }
                }
                RetryState::Succeeded(response) => return QueryOutcome::Rows(response),
                RetryState::ExhaustedFailed(failure) => {
                    log::warn!(
                        "Giving up on {} after {} attempts: {}",
                        request.start_date,
                        failure.attempts,
                        failure.reason
                    );
                    return QueryOutcome::NoResult(failure);
                }
                RetryState::NonRetryableFailed(failure) => {
                    log::warn!(
                        "Non-retryable failure for {}: {}",
                        request.start_date,
                        failure.reason
                    );
                    return QueryOutcome::NoResult(failure);
                }
            };
        }
    }
}
