use super::fetch::SearchAnalyticsTransport;
use super::ratelimit::Clock;
use super::retry::{QueryExecutor, QueryFailure, QueryOutcome};
use super::structs::{ResponseRow, SearchAnalyticsRequest};

/// Rows gathered for one (day, filter combination) pair.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Paginated {
    pub rows: Vec<ResponseRow>,
    pub pages: u32,
    /// Set when a page came back as no result; rows fetched before it are kept.
    pub failure: Option<QueryFailure>,
}

/// Fetches successive pages of `template`, advancing `startRow` by `rowLimit`,
/// until a page holds fewer than `rowLimit` rows or a query yields no result.
pub fn fetch_all_pages<T, C>(
    executor: &mut QueryExecutor<T, C>,
    site_url: &str,
    template: &SearchAnalyticsRequest,
) -> Paginated
where
    T: SearchAnalyticsTransport,
    C: Clock,
{
    let page_size = template.row_limit;
    let mut result = Paginated::default();
    let mut offset = template.start_row;
    loop {
        let request = template.at_offset(offset);
        match executor.execute(site_url, &request) {
            QueryOutcome::Rows(response) => {
                let received = response.rows.len();
                result.pages += 1;
                result.rows.extend(response.rows);
                log::debug!(
                    "Page {} at startRow {} returned {} rows",
                    result.pages,
                    offset,
                    received
                );
                if received < page_size as usize {
                    break;
                }
                offset += page_size;
            }
            QueryOutcome::NoResult(failure) => {
                result.failure = Some(failure);
                break;
            }
        }
    }
    result
}
