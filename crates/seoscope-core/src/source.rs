//! The contract every metrics source implements.
//!
//! A source is constructed once per session with whatever credentials it can
//! resolve; a failed initialization leaves it `Uninitialized` for its whole
//! lifetime and every query short-circuits to an empty result without
//! touching the network. Query failures after that are absorbed the same
//! way: the caller always receives a valid (possibly empty) table or a
//! zeroed summary, and the error text is available through `last_error`.

use crate::compare::{compare, ComparisonReport};
use crate::model::{DateRange, MetricSummary, MetricTable};
use async_trait::async_trait;
use serde::Serialize;

/// Predicate operators shared by both APIs. Each source maps them to its
/// wire vocabulary (Search Console: `equals`/`contains`/`includingRegex`,
/// GA4 string filters: `EXACT`/`CONTAINS`/`FULL_REGEXP`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FilterOperator {
    Equals,
    Contains,
    Regex,
}

impl FilterOperator {
    /// Canonical spelling, also used when hashing cache keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Equals => "equals",
            FilterOperator::Contains => "contains",
            FilterOperator::Regex => "regex",
        }
    }
}

/// One (field, operator, expression) predicate on a dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DimensionFilter {
    pub field: String,
    pub operator: FilterOperator,
    pub expression: String,
}

impl DimensionFilter {
    pub fn equals(field: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            operator: FilterOperator::Equals,
            expression: expression.into(),
        }
    }

    pub fn contains(field: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            operator: FilterOperator::Contains,
            expression: expression.into(),
        }
    }
}

/// Two states, decided once at construction and never retried within a
/// session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SourceStatus {
    Ready,
    Uninitialized { reason: String },
}

impl SourceStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, SourceStatus::Ready)
    }
}

#[async_trait]
pub trait MetricsSource: Send + Sync {
    /// Stable short name, used in logs, cache keys, and report headers.
    fn name(&self) -> &'static str;

    fn status(&self) -> SourceStatus;

    fn is_ready(&self) -> bool {
        self.status().is_ready()
    }

    /// The closed key set `summarize` produces.
    fn summary_metrics(&self) -> &'static [&'static str];

    /// Message from the most recent failed query, if any. An empty table is
    /// indistinguishable from a failed one without consulting this.
    fn last_error(&self) -> Option<String>;

    /// Drop all cached query results; the next queries go to the network.
    fn invalidate_cache(&self);

    /// Fetch rows grouped by `dimensions` for `range`. Fails soft: on any
    /// error this returns an empty table carrying the requested schema.
    async fn query(
        &self,
        range: &DateRange,
        dimensions: &[&str],
        filters: &[DimensionFilter],
        row_limit: usize,
    ) -> MetricTable;

    /// One aggregate value per summary metric. An empty or failed query
    /// yields a summary with every known metric zero.
    async fn summarize(&self, range: &DateRange) -> MetricSummary;

    /// Summaries for both periods fed through the comparison engine.
    async fn compare_periods(
        &self,
        current: &DateRange,
        previous: &DateRange,
    ) -> ComparisonReport {
        let cur = self.summarize(current).await;
        let prev = self.summarize(previous).await;
        compare(&cur, &prev)
    }
}
