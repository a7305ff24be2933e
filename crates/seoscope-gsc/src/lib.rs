//! Google Search Console metrics source.
//!
//! Wraps the Search Analytics query endpoint
//! (`POST /webmasters/v3/sites/{siteUrl}/searchAnalytics/query`) behind the
//! `MetricsSource` contract. Every row carries the fixed metric set
//! `clicks`, `impressions`, `ctr`, `position` plus the requested dimension
//! keys.
//!
//! Failures never escape: a source that could not resolve credentials stays
//! uninitialized and answers every query with an empty table; transport and
//! API errors after that are logged, recorded in the last-error cell, and
//! converted to empty tables as well.

mod wire;

use async_trait::async_trait;
use seoscope_core::auth::{ServiceAccountKey, TokenProvider, GSC_SCOPE};
use seoscope_core::cache::{query_key, QueryCache};
use seoscope_core::model::{round1, round2, DateRange, MetricSummary, MetricTable};
use seoscope_core::source::{DimensionFilter, MetricsSource, SourceStatus};
use seoscope_core::SourceError;
use std::sync::Mutex;
use tracing::{debug, warn};
use url::Url;
use wire::{ApiFilter, FilterGroup, QueryRequest, QueryResponse};

pub const DEFAULT_ENDPOINT: &str = "https://searchconsole.googleapis.com";

/// Dimensions the API accepts.
pub const DIMENSIONS: &[&str] = &["date", "query", "page", "country", "device"];

/// Fixed metric schema of every result row.
pub const ROW_METRICS: &[&str] = &["clicks", "impressions", "ctr", "position"];

/// Closed key set of `summarize`.
pub const SUMMARY_METRICS: &[&str] = &[
    "total_clicks",
    "total_impressions",
    "avg_ctr",
    "avg_position",
];

const DEFAULT_ROW_LIMIT: usize = 25_000;

pub const PROPERTY_URL_VAR: &str = "GSC_PROPERTY_URL";
pub const KEY_FILE_VAR: &str = "GSC_SERVICE_ACCOUNT_FILE";
pub const KEY_BASE64_VAR: &str = "GSC_SERVICE_ACCOUNT_BASE64";

pub struct SearchConsoleSource {
    property_url: String,
    endpoint: String,
    client: reqwest::Client,
    auth: Option<TokenProvider>,
    init_error: Option<String>,
    cache: QueryCache,
    last_error: Mutex<Option<String>>,
}

impl SearchConsoleSource {
    pub fn new(property_url: impl Into<String>, key: ServiceAccountKey) -> Self {
        Self::with_token_provider(property_url, TokenProvider::service_account(key, GSC_SCOPE))
    }

    /// Construct with an explicit token provider (tests use
    /// `TokenProvider::fixed`).
    pub fn with_token_provider(property_url: impl Into<String>, auth: TokenProvider) -> Self {
        Self {
            property_url: property_url.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            client: reqwest::Client::new(),
            auth: Some(auth),
            init_error: None,
            cache: QueryCache::new(),
            last_error: Mutex::new(None),
        }
    }

    /// A source that failed initialization; every query answers empty
    /// without network I/O.
    pub fn uninitialized(property_url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            property_url: property_url.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            client: reqwest::Client::new(),
            auth: None,
            init_error: Some(reason.into()),
            cache: QueryCache::new(),
            last_error: Mutex::new(None),
        }
    }

    /// Resolve property URL and credentials from the environment.
    pub fn from_env() -> Self {
        let property_url = match std::env::var(PROPERTY_URL_VAR) {
            Ok(v) if !v.is_empty() => v,
            _ => {
                return Self::uninitialized("", format!("{PROPERTY_URL_VAR} is not set"));
            }
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
            Ok(key) => Self::new(property_url, key),
            Err(e) => Self::uninitialized(property_url, e.to_string()),
        }
    }

    /// Point the source at a different API base (tests).
    pub fn with_endpoint(mut self, base: impl Into<String>) -> Self {
        self.endpoint = base.into();
        self
    }

    pub fn property_url(&self) -> &str {
        &self.property_url
    }

    fn query_url(&self) -> Result<Url, SourceError> {
        let mut url = Url::parse(&self.endpoint)
            .map_err(|e| SourceError::Decode(format!("bad endpoint {}: {e}", self.endpoint)))?;
        url.path_segments_mut()
            .map_err(|_| SourceError::Decode("endpoint cannot be a base URL".into()))?
            .extend([
                "webmasters",
                "v3",
                "sites",
                &self.property_url,
                "searchAnalytics",
                "query",
            ]);
        Ok(url)
    }

    async fn run_query(
        &self,
        range: &DateRange,
        dimensions: &[&str],
        filters: &[DimensionFilter],
        row_limit: usize,
    ) -> Result<MetricTable, SourceError> {
        let auth = self
            .auth
            .as_ref()
            .ok_or_else(|| SourceError::Credentials("source is uninitialized".into()))?;
        let token = auth.bearer().await?;

        let body = QueryRequest {
            start_date: range.start_str(),
            end_date: range.end_str(),
            dimensions,
            row_limit,
            start_row: 0,
            dimension_filter_groups: if filters.is_empty() {
                None
            } else {
                Some(vec![FilterGroup {
                    filters: filters.iter().map(ApiFilter::from_filter).collect(),
                }])
            },
        };

        debug!(range = %range, ?dimensions, row_limit, "search console query");
        let resp = self
            .client
            .post(self.query_url()?)
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

        let decoded: QueryResponse = resp
            .json()
            .await
            .map_err(|e| SourceError::Decode(e.to_string()))?;

        let mut table = MetricTable::empty(dimensions, ROW_METRICS);
        for row in decoded.rows {
            let mut keys = row.keys;
            keys.resize(dimensions.len(), String::new());
            table.push_row(keys, vec![row.clicks, row.impressions, row.ctr, row.position]);
        }
        Ok(table)
    }

    fn record_error(&self, e: &SourceError) {
        warn!(source = "gsc", error = %e, "query failed, returning empty table");
        *self.last_error.lock().expect("last_error lock") = Some(e.to_string());
    }

    /// Top queries by clicks.
    pub async fn top_queries(&self, range: &DateRange, limit: usize) -> MetricTable {
        let mut table = self.query(range, &["query"], &[], limit).await;
        table.sort_by_metric("clicks");
        table
    }

    /// Top pages by clicks, with the property URL stripped for display.
    pub async fn top_pages(&self, range: &DateRange, limit: usize) -> MetricTable {
        let mut table = self.query(range, &["page"], &[], limit).await;
        table.sort_by_metric("clicks");
        let property = self.property_url.clone();
        table.map_dimension("page", |v| v.replace(&property, ""));
        table
    }

    pub async fn performance_by_device(&self, range: &DateRange) -> MetricTable {
        self.query(range, &["device"], &[], DEFAULT_ROW_LIMIT).await
    }

    pub async fn performance_by_country(&self, range: &DateRange, limit: usize) -> MetricTable {
        let mut table = self.query(range, &["country"], &[], limit).await;
        table.sort_by_metric("clicks");
        table
    }

    pub async fn daily_performance(&self, range: &DateRange) -> MetricTable {
        self.query(range, &["date"], &[], DEFAULT_ROW_LIMIT).await
    }

    /// Rows for queries containing `keyword`.
    pub async fn search_keywords(&self, keyword: &str, range: &DateRange) -> MetricTable {
        let filters = [DimensionFilter::contains("query", keyword)];
        self.query(range, &["query"], &filters, DEFAULT_ROW_LIMIT)
            .await
    }
}

#[async_trait]
impl MetricsSource for SearchConsoleSource {
    fn name(&self) -> &'static str {
        "gsc"
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
        if !self.is_ready() {
            return MetricTable::empty(dimensions, ROW_METRICS);
        }

        let key = query_key(self.name(), range, dimensions, ROW_METRICS, filters, row_limit);
        if let Some(hit) = self.cache.get(&key) {
            return (*hit).clone();
        }

        match self.run_query(range, dimensions, filters, row_limit).await {
            Ok(table) => {
                self.cache.insert(key, table.clone());
                table
            }
            Err(e) => {
                self.record_error(&e);
                MetricTable::empty(dimensions, ROW_METRICS)
            }
        }
    }

    async fn summarize(&self, range: &DateRange) -> MetricSummary {
        let table = self.query(range, &["date"], &[], DEFAULT_ROW_LIMIT).await;
        if table.is_empty() {
            return MetricSummary::zeroed(SUMMARY_METRICS);
        }
        let mut summary = MetricSummary::new();
        summary.set("total_clicks", table.sum("clicks"));
        summary.set("total_impressions", table.sum("impressions"));
        // ctr arrives as a fraction; the summary reports a percentage
        summary.set("avg_ctr", round2(table.mean("ctr") * 100.0));
        summary.set("avg_position", round1(table.mean("position")));
        summary
    }
}
