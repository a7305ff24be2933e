//! GA4 source behavior against a stub Data API.

use chrono::NaiveDate;
use seoscope_core::auth::TokenProvider;
use seoscope_core::model::DateRange;
use seoscope_core::source::{DimensionFilter, MetricsSource};
use seoscope_ga4::AnalyticsSource;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const REPORT_PATH: &str = "/v1beta/properties/300886887:runReport";

fn range() -> DateRange {
    DateRange::new(
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        NaiveDate::from_ymd_opt(2024, 3, 28).unwrap(),
    )
    .unwrap()
}

fn source(server: &MockServer) -> AnalyticsSource {
    AnalyticsSource::with_token_provider("300886887", TokenProvider::fixed("test-token"))
        .with_endpoint(server.uri())
}

fn daily_body() -> serde_json::Value {
    json!({
        "rows": [
            {
                "dimensionValues": [{"value": "20240301"}],
                "metricValues": [
                    {"value": "40"}, {"value": "35"}, {"value": "12"},
                    {"value": "0.45"}, {"value": "61.5"}, {"value": "90"}
                ]
            },
            {
                "dimensionValues": [{"value": "20240302"}],
                "metricValues": [
                    {"value": "60"}, {"value": "50"}, {"value": "20"},
                    {"value": "0.35"}, {"value": "58.5"}, {"value": "110"}
                ]
            }
        ]
    })
}

#[tokio::test]
async fn run_report_decodes_and_normalizes_dates() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(REPORT_PATH))
        .and(header("authorization", "Bearer test-token"))
        .and(body_partial_json(json!({
            "dateRanges": [{"startDate": "2024-03-01", "endDate": "2024-03-28"}],
            "limit": "10000",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(daily_body()))
        .expect(1)
        .mount(&server)
        .await;

    let source = source(&server);
    let table = source
        .run_report(
            &range(),
            &["date"],
            &["sessions", "totalUsers", "newUsers", "bounceRate", "averageSessionDuration", "screenPageViews"],
            &[],
            10_000,
        )
        .await;

    assert_eq!(table.len(), 2);
    assert_eq!(table.rows[0].keys[0], "2024-03-01");
    assert_eq!(table.rows[0].values[0], 40.0);
    assert_eq!(table.rows[1].values[3], 0.35);

    // identical report served from the cache
    let again = source
        .run_report(
            &range(),
            &["date"],
            &["sessions", "totalUsers", "newUsers", "bounceRate", "averageSessionDuration", "screenPageViews"],
            &[],
            10_000,
        )
        .await;
    assert_eq!(again, table);
}

#[tokio::test]
async fn summarize_applies_sum_and_mean_reductions() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(REPORT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(daily_body()))
        .mount(&server)
        .await;

    let source = source(&server);
    let summary = source.summarize(&range()).await;
    assert_eq!(summary.get("total_sessions"), 100.0);
    assert_eq!(summary.get("total_users"), 85.0);
    assert_eq!(summary.get("new_users"), 32.0);
    assert_eq!(summary.get("total_page_views"), 200.0);
    assert_eq!(summary.get("avg_bounce_rate"), 40.0); // mean(0.45, 0.35) * 100
    assert_eq!(summary.get("avg_session_duration"), 60.0);
}

#[tokio::test]
async fn organic_filter_goes_on_the_wire() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(REPORT_PATH))
        .and(body_partial_json(json!({
            "dimensionFilter": {
                "filter": {
                    "fieldName": "sessionDefaultChannelGroup",
                    "stringFilter": {"matchType": "EXACT", "value": "Organic Search"}
                }
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(daily_body()))
        .expect(1)
        .mount(&server)
        .await;

    let source = source(&server);
    let table = source.organic_traffic(&range()).await;
    assert_eq!(table.len(), 2);
}

#[tokio::test]
async fn every_filter_predicate_reaches_the_wire() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(REPORT_PATH))
        .and(body_partial_json(json!({
            "dimensionFilter": {
                "andGroup": {
                    "expressions": [
                        {"filter": {
                            "fieldName": "sessionMedium",
                            "stringFilter": {"matchType": "EXACT", "value": "organic"}
                        }},
                        {"filter": {
                            "fieldName": "deviceCategory",
                            "stringFilter": {"matchType": "EXACT", "value": "mobile"}
                        }}
                    ]
                }
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(daily_body()))
        .expect(1)
        .mount(&server)
        .await;

    let source = source(&server);
    let filters = [
        DimensionFilter::equals("sessionMedium", "organic"),
        DimensionFilter::equals("deviceCategory", "mobile"),
    ];
    let table = source.query(&range(), &["date"], &filters, 100).await;
    assert_eq!(table.len(), 2);
    assert!(source.last_error().is_none());
}

#[tokio::test]
async fn landing_pages_sort_and_strip_origin() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(REPORT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "rows": [
                {
                    "dimensionValues": [{"value": "https://example.com/a"}],
                    "metricValues": [{"value": "5"}, {"value": "4"}, {"value": "0.2"}, {"value": "30"}]
                },
                {
                    "dimensionValues": [{"value": "https://example.com/b?utm=x"}],
                    "metricValues": [{"value": "9"}, {"value": "7"}, {"value": "0.1"}, {"value": "45"}]
                }
            ]
        })))
        .mount(&server)
        .await;

    let source = source(&server);
    let table = source.top_landing_pages(&range(), 20).await;
    assert_eq!(table.rows[0].keys[0], "/b?utm=x");
    assert_eq!(table.rows[1].keys[0], "/a");
}

#[tokio::test]
async fn forbidden_answer_records_hint_and_stays_soft() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(REPORT_PATH))
        .respond_with(ResponseTemplate::new(403).set_body_string("PERMISSION_DENIED"))
        .mount(&server)
        .await;

    let source = source(&server);
    let table = source.device_metrics(&range()).await;
    assert!(table.is_empty());

    let err = source.last_error().expect("side channel set");
    assert!(err.contains("403"), "{err}");
    assert!(err.contains("service account"), "{err}");

    let summary = source.summarize(&range()).await;
    assert_eq!(summary.len(), 6);
    assert_eq!(summary.get("total_sessions"), 0.0);
}

#[tokio::test]
async fn uninitialized_source_answers_empty_without_network() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let source =
        AnalyticsSource::uninitialized("", "GA4_PROPERTY_ID is not set").with_endpoint(server.uri());
    assert!(!source.is_ready());

    let table = source.conversions(&range()).await;
    assert!(table.is_empty());
    let summary = source.summarize(&range()).await;
    assert_eq!(summary.len(), 6);
}

#[tokio::test]
async fn zero_baseline_comparison_from_empty_previous_period() {
    let server = MockServer::start().await;
    let current = range();
    let previous = current.previous_period();

    Mock::given(method("POST"))
        .and(path(REPORT_PATH))
        .and(body_partial_json(json!({
            "dateRanges": [{"startDate": "2024-03-01", "endDate": "2024-03-28"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(daily_body()))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(REPORT_PATH))
        .and(body_partial_json(json!({
            "dateRanges": [{"startDate": "2024-02-02", "endDate": "2024-02-29"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"rows": []})))
        .mount(&server)
        .await;

    let source = source(&server);
    let report = source.compare_periods(&current, &previous).await;

    let sessions = report.get("total_sessions").unwrap();
    assert_eq!(sessions.previous, 0.0);
    assert_eq!(sessions.change, 100.0);
    assert_eq!(sessions.change_pct, 100.0); // appeared from nothing

    let bounce = report.get("avg_bounce_rate").unwrap();
    assert_eq!(bounce.change_pct, 100.0);
}
