//! Google Analytics 4 metrics source.
//!
//! Wraps the GA4 Data API (`POST /v1beta/properties/{id}:runReport`) behind
//! the `MetricsSource` contract. Unlike Search Console, GA4 reports carry a
//! caller-chosen metric list; the canned reports below mirror the dashboard
//! views (organic traffic, landing pages, devices, geography, engagement,
//! events). `date` dimension values arrive as `YYYYMMDD` and are normalized
//! to `YYYY-MM-DD`.

mod wire;

use async_trait::async_trait;
use chrono::NaiveDate;
use seoscope_core::auth::{ServiceAccountKey, TokenProvider, GA4_SCOPE};
use seoscope_core::cache::{query_key, QueryCache};
use seoscope_core::model::{round2, DateRange, MetricSummary, MetricTable};
use seoscope_core::source::{DimensionFilter, MetricsSource, SourceStatus};
use seoscope_core::SourceError;
use std::sync::Mutex;
use tracing::{debug, warn};
use wire::{ApiDateRange, ApiName, FilterExpression, RunReportRequest, RunReportResponse};

pub const DEFAULT_ENDPOINT: &str = "https://analyticsdata.googleapis.com";

/// Dimensions the canned reports use.
pub const DIMENSIONS: &[&str] = &[
    "date",
    "sessionDefaultChannelGroup",
    "deviceCategory",
    "country",
    "pagePath",
    "landingPagePlusQueryString",
    "sessionSource",
    "sessionMedium",
    "sessionSourceMedium",
    "eventName",
];

/// Metric list used when the generic `query` contract is exercised, and by
/// `summarize`.
pub const DEFAULT_METRICS: &[&str] = &[
    "sessions",
    "totalUsers",
    "newUsers",
    "bounceRate",
    "averageSessionDuration",
    "screenPageViews",
];

/// Closed key set of `summarize`.
pub const SUMMARY_METRICS: &[&str] = &[
    "total_sessions",
    "total_users",
    "new_users",
    "avg_bounce_rate",
    "avg_session_duration",
    "total_page_views",
];

const DEFAULT_LIMIT: usize = 10_000;

pub const PROPERTY_ID_VAR: &str = "GA4_PROPERTY_ID";
pub const KEY_FILE_VAR: &str = "GA4_SERVICE_ACCOUNT_FILE";
pub const KEY_BASE64_VAR: &str = "GA4_SERVICE_ACCOUNT_BASE64";

/// Remediation text for the statuses the API answers with when access or
/// addressing is wrong, mirrored into the side-channel message.
pub fn api_hint(status: u16, property_id: &str) -> Option<String> {
    match status {
        403 => Some(
            "check that the service account has access to the GA4 property \
             and that the property id is correct"
                .to_string(),
        ),
        404 => Some(format!("GA4 property '{property_id}' not found")),
        _ => None,
    }
}

/// Strip the scheme and host from a landing-page URL, keeping the path.
fn strip_origin(v: &str) -> String {
    for scheme in ["https://", "http://"] {
        if let Some(rest) = v.strip_prefix(scheme) {
            return match rest.find('/') {
                Some(i) => rest[i..].to_string(),
                None => "/".to_string(),
            };
        }
    }
    v.to_string()
}

/// GA4 sends dates as `YYYYMMDD`; unparseable values pass through untouched.
fn normalize_date(v: &str) -> String {
    NaiveDate::parse_from_str(v, "%Y%m%d")
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|_| v.to_string())
}

pub struct AnalyticsSource {
    property_id: String,
    endpoint: String,
    client: reqwest::Client,
    auth: Option<TokenProvider>,
    init_error: Option<String>,
    cache: QueryCache,
    last_error: Mutex<Option<String>>,
}

impl AnalyticsSource {
    pub fn new(property_id: impl Into<String>, key: ServiceAccountKey) -> Self {
        Self::with_token_provider(property_id, TokenProvider::service_account(key, GA4_SCOPE))
    }

    pub fn with_token_provider(property_id: impl Into<String>, auth: TokenProvider) -> Self {
        Self {
            property_id: property_id.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            client: reqwest::Client::new(),
            auth: Some(auth),
            init_error: None,
            cache: QueryCache::new(),
            last_error: Mutex::new(None),
        }
    }

    pub fn uninitialized(property_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            property_id: property_id.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            client: reqwest::Client::new(),
            auth: None,
            init_error: Some(reason.into()),
            cache: QueryCache::new(),
            last_error: Mutex::new(None),
        }
    }

    /// Resolve property id and credentials from the environment.
    pub fn from_env() -> Self {
        let property_id = match std::env::var(PROPERTY_ID_VAR) {
            Ok(v) if !v.is_empty() => v,
            _ => return Self::uninitialized("", format!("{PROPERTY_ID_VAR} is not set")),
        };

        let key = if let Ok(blob) = std::env::var(KEY_BASE64_VAR) {
            ServiceAccountKey::from_base64(&blob)
        } else if let Ok(path) = std::env::var(KEY_FILE_VAR) {
            ServiceAccountKey::from_file(path.as_ref())
        } else {
            Err(SourceError::Credentials(format!(
                "neither {KEY_BASE64_VAR} nor {KEY_FILE_VAR} is set"
            )))
        };

        match key {
            Ok(key) => Self::new(property_id, key),
            Err(e) => Self::uninitialized(property_id, e.to_string()),
        }
    }

    pub fn with_endpoint(mut self, base: impl Into<String>) -> Self {
        self.endpoint = base.into();
        self
    }

    pub fn property_id(&self) -> &str {
        &self.property_id
    }

    async fn run_report_inner(
        &self,
        range: &DateRange,
        dimensions: &[&str],
        metrics: &[&str],
        filters: &[DimensionFilter],
        limit: usize,
    ) -> Result<MetricTable, SourceError> {
        let auth = self
            .auth
            .as_ref()
            .ok_or_else(|| SourceError::Credentials("source is uninitialized".into()))?;
        let token = auth.bearer().await?;

        let body = RunReportRequest {
            date_ranges: [ApiDateRange {
                start_date: range.start_str(),
                end_date: range.end_str(),
            }],
            dimensions: dimensions.iter().map(|d| ApiName { name: d }).collect(),
            metrics: metrics.iter().map(|m| ApiName { name: m }).collect(),
            limit: limit.to_string(),
            dimension_filter: FilterExpression::from_filters(filters),
        };

        let url = format!(
            "{}/v1beta/properties/{}:runReport",
            self.endpoint, self.property_id
        );
        debug!(range = %range, ?dimensions, ?metrics, limit, "ga4 runReport");
        let resp = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(SourceError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let decoded: RunReportResponse = resp
            .json()
            .await
            .map_err(|e| SourceError::Decode(e.to_string()))?;

        let mut table = MetricTable::empty(dimensions, metrics);
        for row in decoded.rows {
            let mut keys: Vec<String> = row
                .dimension_values
                .iter()
                .map(|v| v.value.clone())
                .collect();
            keys.resize(dimensions.len(), String::new());
            if let Some(i) = dimensions.iter().position(|d| *d == "date") {
                keys[i] = normalize_date(&keys[i]);
            }
            let mut values: Vec<f64> = row.metric_values.iter().map(|v| v.as_f64()).collect();
            values.resize(metrics.len(), 0.0);
            table.push_row(keys, values);
        }
        Ok(table)
    }

    fn record_error(&self, e: &SourceError) {
        let mut message = e.to_string();
        if let Some(hint) = e.status().and_then(|s| api_hint(s, &self.property_id)) {
            message = format!("{message} ({hint})");
        }
        warn!(source = "ga4", error = %message, "query failed, returning empty table");
        *self.last_error.lock().expect("last_error lock") = Some(message);
    }

    /// Fail-soft, cached report. The building block for every canned view.
    pub async fn run_report(
        &self,
        range: &DateRange,
        dimensions: &[&str],
        metrics: &[&str],
        filters: &[DimensionFilter],
        limit: usize,
    ) -> MetricTable {
        if !self.is_ready() {
            return MetricTable::empty(dimensions, metrics);
        }

        let key = query_key(self.name(), range, dimensions, metrics, filters, limit);
        if let Some(hit) = self.cache.get(&key) {
            return (*hit).clone();
        }

        match self
            .run_report_inner(range, dimensions, metrics, filters, limit)
            .await
        {
            Ok(table) => {
                self.cache.insert(key, table.clone());
                table
            }
            Err(e) => {
                self.record_error(&e);
                MetricTable::empty(dimensions, metrics)
            }
        }
    }

    /// Daily sessions and engagement for the Organic Search channel group.
    pub async fn organic_traffic(&self, range: &DateRange) -> MetricTable {
        let filters = [DimensionFilter::equals(
            "sessionDefaultChannelGroup",
            "Organic Search",
        )];
        self.run_report(range, &["date"], DEFAULT_METRICS, &filters, DEFAULT_LIMIT)
            .await
    }

    pub async fn traffic_sources(&self, range: &DateRange) -> MetricTable {
        self.run_report(
            range,
            &["sessionSource", "sessionMedium"],
            &["sessions", "totalUsers", "bounceRate"],
            &[],
            DEFAULT_LIMIT,
        )
        .await
    }

    /// Top landing pages by sessions, origin stripped for display.
    pub async fn top_landing_pages(&self, range: &DateRange, limit: usize) -> MetricTable {
        let mut table = self
            .run_report(
                range,
                &["landingPagePlusQueryString"],
                &["sessions", "totalUsers", "bounceRate", "averageSessionDuration"],
                &[],
                limit,
            )
            .await;
        table.sort_by_metric("sessions");
        table.map_dimension("landingPagePlusQueryString", strip_origin);
        table
    }

    pub async fn device_metrics(&self, range: &DateRange) -> MetricTable {
        self.run_report(
            range,
            &["deviceCategory"],
            &["sessions", "totalUsers", "bounceRate", "screenPageViews"],
            &[],
            DEFAULT_LIMIT,
        )
        .await
    }

    pub async fn geo_metrics(&self, range: &DateRange, limit: usize) -> MetricTable {
        let mut table = self
            .run_report(
                range,
                &["country"],
                &["sessions", "totalUsers", "bounceRate"],
                &[],
                limit,
            )
            .await;
        table.sort_by_metric("sessions");
        table
    }

    pub async fn page_metrics(&self, range: &DateRange, limit: usize) -> MetricTable {
        let mut table = self
            .run_report(
                range,
                &["pagePath"],
                &["screenPageViews", "totalUsers", "averageSessionDuration", "bounceRate"],
                &[],
                limit,
            )
            .await;
        table.sort_by_metric("screenPageViews");
        table
    }

    pub async fn user_engagement(&self, range: &DateRange) -> MetricTable {
        self.run_report(
            range,
            &["date"],
            &[
                "activeUsers",
                "newUsers",
                "userEngagementDuration",
                "engagedSessions",
                "engagementRate",
            ],
            &[],
            DEFAULT_LIMIT,
        )
        .await
    }

    /// Event counts, the closest GA4 gets to a conversions table.
    pub async fn conversions(&self, range: &DateRange) -> MetricTable {
        self.run_report(
            range,
            &["eventName"],
            &["eventCount", "totalUsers"],
            &[],
            DEFAULT_LIMIT,
        )
        .await
    }

    /// Landing pages reached through organic mediums.
    pub async fn organic_keywords(&self, range: &DateRange) -> MetricTable {
        let filters = [DimensionFilter::equals("sessionMedium", "organic")];
        self.run_report(
            range,
            &["sessionSourceMedium", "landingPagePlusQueryString"],
            &["sessions", "totalUsers", "bounceRate"],
            &filters,
            DEFAULT_LIMIT,
        )
        .await
    }
}

#[async_trait]
impl MetricsSource for AnalyticsSource {
    fn name(&self) -> &'static str {
        "ga4"
    }

    fn status(&self) -> SourceStatus {
        if self.auth.is_some() {
            SourceStatus::Ready
        } else {
            SourceStatus::Uninitialized {
                reason: self.init_error.clone().unwrap_or_default(),
            }
        }
    }

    fn summary_metrics(&self) -> &'static [&'static str] {
        SUMMARY_METRICS
    }

    fn last_error(&self) -> Option<String> {
        self.last_error.lock().expect("last_error lock").clone()
    }

    fn invalidate_cache(&self) {
        self.cache.invalidate_all();
    }

    async fn query(
        &self,
        range: &DateRange,
        dimensions: &[&str],
        filters: &[DimensionFilter],
        row_limit: usize,
    ) -> MetricTable {
        self.run_report(range, dimensions, DEFAULT_METRICS, filters, row_limit)
            .await
    }

    async fn summarize(&self, range: &DateRange) -> MetricSummary {
        let table = self
            .run_report(range, &["date"], DEFAULT_METRICS, &[], DEFAULT_LIMIT)
            .await;
        if table.is_empty() {
            return MetricSummary::zeroed(SUMMARY_METRICS);
        }
        let mut summary = MetricSummary::new();
        summary.set("total_sessions", table.sum("sessions"));
        summary.set("total_users", table.sum("totalUsers"));
        summary.set("new_users", table.sum("newUsers"));
        // bounceRate arrives as a fraction; the summary reports a percentage
        summary.set("avg_bounce_rate", round2(table.mean("bounceRate") * 100.0));
        summary.set(
            "avg_session_duration",
            round2(table.mean("averageSessionDuration")),
        );
        summary.set("total_page_views", table.sum("screenPageViews"));
        summary
    }
}
