pub mod dates;
pub mod fetch;
pub mod filters;
pub mod paginate;
pub mod ratelimit;
pub mod retry;
pub mod structs;
pub use dates::DateRange;
pub use fetch::{HttpTransport, SearchAnalyticsTransport};
pub use filters::{FilterCombination, FilterDimensions};
pub use paginate::{Paginated, fetch_all_pages};
pub use ratelimit::{Clock, ManualClock, RateLimiter, SystemClock};
pub use retry::{FailureKind, QueryExecutor, QueryFailure, QueryOutcome, RetryPolicy};
pub use structs::{
    AggregationType, Dimension, DimensionFilter, ResponseRow, SearchAnalyticsRequest,
    SearchAnalyticsResponse,
};
