use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Query,
    Page,
    Device,
    Country,
}

impl Dimension {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Query => "query",
            Dimension::Page => "page",
            Dimension::Device => "device",
            Dimension::Country => "country",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dimension {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "query" => Ok(Dimension::Query),
            "page" => Ok(Dimension::Page),
            "device" => Ok(Dimension::Device),
            "country" => Ok(Dimension::Country),
            other => Err(format!("unknown dimension '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AggregationType {
    Auto,
    ByPage,
    ByProperty,
}

impl FromStr for AggregationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(AggregationType::Auto),
            "bypage" => Ok(AggregationType::ByPage),
            "byproperty" => Ok(AggregationType::ByProperty),
            other => Err(format!("unknown aggregation type '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOperator {
    Equals,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionFilter {
    pub dimension: Dimension,
    pub operator: FilterOperator,
    pub expression: String,
}

impl DimensionFilter {
    pub fn equals(dimension: Dimension, expression: impl Into<String>) -> Self {
        Self {
            dimension,
            operator: FilterOperator::Equals,
            expression: expression.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionFilterGroup {
    pub group_type: String,
    pub filters: Vec<DimensionFilter>,
}

impl DimensionFilterGroup {
    pub fn and(filters: Vec<DimensionFilter>) -> Self {
        Self {
            group_type: "and".to_string(),
            filters,
        }
    }
}

/// Body of a single `searchAnalytics/query` call. The site URL travels in the path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchAnalyticsRequest {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub dimensions: Vec<Dimension>,
    pub row_limit: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dimension_filter_groups: Vec<DimensionFilterGroup>,
    pub start_row: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregation_type: Option<AggregationType>,
}

impl SearchAnalyticsRequest {
    pub fn for_day(day: NaiveDate, dimensions: Vec<Dimension>, row_limit: u32) -> Self {
        Self {
            start_date: day,
            end_date: day,
            dimensions,
            row_limit,
            dimension_filter_groups: Vec::new(),
            start_row: 0,
            aggregation_type: None,
        }
    }

    pub fn with_filters(mut self, filters: Vec<DimensionFilter>) -> Self {
        self.dimension_filter_groups = if filters.is_empty() {
            Vec::new()
        } else {
            vec![DimensionFilterGroup::and(filters)]
        };
        self
    }

    pub fn with_aggregation(mut self, aggregation_type: Option<AggregationType>) -> Self {
        self.aggregation_type = aggregation_type;
        self
    }

    pub fn at_offset(&self, start_row: u32) -> Self {
        Self {
            start_row,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseRow {
    #[serde(default)]
    pub keys: Vec<String>,
    #[serde(default)]
    pub clicks: f64,
    #[serde(default)]
    pub impressions: f64,
    #[serde(default)]
    pub ctr: f64,
    #[serde(default)]
    pub position: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchAnalyticsResponse {
    #[serde(default)]
    pub response_aggregation_type: Option<String>,
    #[serde(default)]
    pub rows: Vec<ResponseRow>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetail {
    pub code: u16,
    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_serializes_to_wire_shape() {
        let day = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let request = SearchAnalyticsRequest::for_day(day, vec![Dimension::Query], 5000)
            .with_filters(vec![DimensionFilter::equals(Dimension::Device, "desktop")])
            .at_offset(5000);
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "startDate": "2023-01-01",
                "endDate": "2023-01-01",
                "dimensions": ["query"],
                "rowLimit": 5000,
                "dimensionFilterGroups": [{
                    "groupType": "and",
                    "filters": [{"dimension": "device", "operator": "equals", "expression": "desktop"}]
                }],
                "startRow": 5000
            })
        );
    }

    #[test]
    fn test_unfiltered_request_omits_filter_groups() {
        let day = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let request = SearchAnalyticsRequest::for_day(day, vec![Dimension::Query], 10)
            .with_filters(Vec::new())
            .with_aggregation(Some(AggregationType::ByPage));
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("dimensionFilterGroups").is_none());
        assert_eq!(value["aggregationType"], "byPage");
    }

    #[test]
    fn test_response_without_rows_is_empty() {
        let response: SearchAnalyticsResponse =
            serde_json::from_str(r#"{"responseAggregationType": "byProperty"}"#).unwrap();
        assert!(response.rows.is_empty());
        assert_eq!(
            response.response_aggregation_type.as_deref(),
            Some("byProperty")
        );
    }

    #[test]
    fn test_dimension_parse() {
        assert_eq!("Page".parse::<Dimension>().unwrap(), Dimension::Page);
        assert!("searchAppearance".parse::<Dimension>().is_err());
    }
}
