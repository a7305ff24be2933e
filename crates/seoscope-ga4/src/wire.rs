//! Request/response shapes for the GA4 Data API `runReport` endpoint.
//!
//! The REST mapping renders int64 fields as JSON strings, so `limit` is
//! serialized as a string and every metric value arrives as a string to be
//! parsed (empty string reads as zero, as the API sends for absent values).

use seoscope_core::source::{DimensionFilter, FilterOperator};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RunReportRequest<'a> {
    pub date_ranges: [ApiDateRange; 1],
    pub dimensions: Vec<ApiName<'a>>,
    pub metrics: Vec<ApiName<'a>>,
    pub limit: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimension_filter: Option<FilterExpression>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ApiDateRange {
    pub start_date: String,
    pub end_date: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ApiName<'a> {
    pub name: &'a str,
}

/// One arm of the API's filter-expression oneof: a single string predicate
/// or an AND over several.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FilterExpression {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<ApiFilter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub and_group: Option<FilterExpressionList>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FilterExpressionList {
    pub expressions: Vec<FilterExpression>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ApiFilter {
    pub field_name: String,
    pub string_filter: StringFilter,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StringFilter {
    pub match_type: &'static str,
    pub value: String,
}

impl FilterExpression {
    pub fn from_filter(f: &DimensionFilter) -> Self {
        let match_type = match f.operator {
            FilterOperator::Equals => "EXACT",
            FilterOperator::Contains => "CONTAINS",
            FilterOperator::Regex => "FULL_REGEXP",
        };
        Self {
            filter: Some(ApiFilter {
                field_name: f.field.clone(),
                string_filter: StringFilter {
                    match_type,
                    value: f.expression.clone(),
                },
            }),
            and_group: None,
        }
    }

    /// A whole predicate set: one filter stays a plain expression, several
    /// combine under `andGroup`.
    pub fn from_filters(filters: &[DimensionFilter]) -> Option<Self> {
        match filters {
            [] => None,
            [single] => Some(Self::from_filter(single)),
            many => Some(Self {
                filter: None,
                and_group: Some(FilterExpressionList {
                    expressions: many.iter().map(Self::from_filter).collect(),
                }),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RunReportResponse {
    #[serde(default)]
    pub rows: Vec<ApiRow>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ApiRow {
    #[serde(default)]
    pub dimension_values: Vec<ApiValue>,
    #[serde(default)]
    pub metric_values: Vec<ApiValue>,
}

#[derive(Debug, Deserialize, Default)]
pub(crate) struct ApiValue {
    #[serde(default)]
    pub value: String,
}

impl ApiValue {
    pub fn as_f64(&self) -> f64 {
        self.value.parse().unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_ga4_shapes() {
        let req = RunReportRequest {
            date_ranges: [ApiDateRange {
                start_date: "2024-03-01".into(),
                end_date: "2024-03-28".into(),
            }],
            dimensions: vec![ApiName { name: "date" }],
            metrics: vec![ApiName { name: "sessions" }],
            limit: "10000".into(),
            dimension_filter: Some(FilterExpression::from_filter(&DimensionFilter::equals(
                "sessionDefaultChannelGroup",
                "Organic Search",
            ))),
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["dateRanges"][0]["startDate"], "2024-03-01");
        assert_eq!(v["dimensions"][0]["name"], "date");
        assert_eq!(v["limit"], "10000");
        let f = &v["dimensionFilter"]["filter"];
        assert_eq!(f["fieldName"], "sessionDefaultChannelGroup");
        assert_eq!(f["stringFilter"]["matchType"], "EXACT");
        assert_eq!(f["stringFilter"]["value"], "Organic Search");
    }

    #[test]
    fn filter_sets_nest_under_an_and_group() {
        assert!(FilterExpression::from_filters(&[]).is_none());

        let filters = [
            DimensionFilter::equals("sessionMedium", "organic"),
            DimensionFilter::equals("deviceCategory", "mobile"),
        ];
        let expr = FilterExpression::from_filters(&filters).unwrap();
        let v = serde_json::to_value(&expr).unwrap();
        assert!(v.get("filter").is_none());
        let members = v["andGroup"]["expressions"].as_array().unwrap();
        assert_eq!(members.len(), 2);
        assert_eq!(members[0]["filter"]["fieldName"], "sessionMedium");
        assert_eq!(members[1]["filter"]["fieldName"], "deviceCategory");
    }

    #[test]
    fn metric_values_parse_with_zero_fallback() {
        assert_eq!(ApiValue { value: "12.5".into() }.as_f64(), 12.5);
        assert_eq!(ApiValue { value: String::new() }.as_f64(), 0.0);
        assert_eq!(ApiValue { value: "n/a".into() }.as_f64(), 0.0);
    }

    #[test]
    fn response_without_rows_is_empty() {
        let resp: RunReportResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.rows.is_empty());
    }
}
