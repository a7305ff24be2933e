//! Request/response shapes for the Search Analytics query endpoint.

use seoscope_core::source::{DimensionFilter, FilterOperator};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QueryRequest<'a> {
    pub start_date: String,
    pub end_date: String,
    pub dimensions: &'a [&'a str],
    pub row_limit: usize,
    pub start_row: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimension_filter_groups: Option<Vec<FilterGroup>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct FilterGroup {
    pub filters: Vec<ApiFilter>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ApiFilter {
    pub dimension: String,
    pub operator: &'static str,
    pub expression: String,
}

impl ApiFilter {
    pub fn from_filter(f: &DimensionFilter) -> Self {
        let operator = match f.operator {
            FilterOperator::Equals => "equals",
            FilterOperator::Contains => "contains",
            FilterOperator::Regex => "includingRegex",
        };
        Self {
            dimension: f.field.clone(),
            operator,
            expression: f.expression.clone(),
        }
    }
}

/// A response without a `rows` key means zero rows, not an error.
#[derive(Debug, Deserialize)]
pub(crate) struct QueryResponse {
    #[serde(default)]
    pub rows: Vec<ApiRow>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiRow {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_camel_case_and_omits_empty_filters() {
        let req = QueryRequest {
            start_date: "2024-03-01".into(),
            end_date: "2024-03-28".into(),
            dimensions: &["query", "page"],
            row_limit: 100,
            start_row: 0,
            dimension_filter_groups: None,
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["startDate"], "2024-03-01");
        assert_eq!(v["rowLimit"], 100);
        assert_eq!(v["startRow"], 0);
        assert!(v.get("dimensionFilterGroups").is_none());
    }

    #[test]
    fn filters_map_operators_to_api_spelling() {
        let f = ApiFilter::from_filter(&DimensionFilter::contains("query", "flokzu"));
        assert_eq!(f.operator, "contains");
        let f = ApiFilter::from_filter(&DimensionFilter::equals("country", "usa"));
        assert_eq!(f.operator, "equals");
    }

    #[test]
    fn response_missing_rows_decodes_to_empty() {
        let resp: QueryResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.rows.is_empty());
    }

    #[test]
    fn row_fields_default_to_zero() {
        let row: ApiRow = serde_json::from_str(r#"{"keys":["foo"],"clicks":3}"#).unwrap();
        assert_eq!(row.clicks, 3.0);
        assert_eq!(row.impressions, 0.0);
        assert_eq!(row.ctr, 0.0);
    }
}
