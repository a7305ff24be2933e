//! Metric data model shared by every source: date ranges, per-range
//! summaries, and dimension/metric tables.
//!
//! Values are `f64` throughout. Count metrics (clicks, sessions) arrive as
//! whole numbers; rate and duration metrics (ctr, bounceRate,
//! averageSessionDuration) are fractional. A missing metric reads as `0.0`
//! rather than an error, which is what the comparison engine and the summary
//! reductions rely on for sparse periods.

use chrono::{Duration, Local, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Round to 2 decimal places (percentages, rates).
pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Round to 1 decimal place (average position).
pub fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// Inclusive calendar date range. Both APIs take `YYYY-MM-DD` strings, so
/// the range is normalized to that form at the source boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Constructing a range with `start > end`.
#[derive(Debug, thiserror::Error)]
#[error("invalid date range: start {start} is after end {end}")]
pub struct InvalidDateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, InvalidDateRange> {
        if start > end {
            return Err(InvalidDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// The last `days` full days, ending yesterday. `days == 0` is treated
    /// as a single day.
    pub fn last_days(days: u32) -> Self {
        let end = Local::now().date_naive() - Duration::days(1);
        let start = end - Duration::days(i64::from(days.max(1)) - 1);
        Self { start, end }
    }

    /// Number of days covered, inclusive of both endpoints.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// The equal-length period immediately preceding this one, ending the
    /// day before `start`.
    pub fn previous_period(&self) -> Self {
        let end = self.start - Duration::days(1);
        let start = end - Duration::days(self.days() - 1);
        Self { start, end }
    }

    pub fn start_str(&self) -> String {
        self.start.format("%Y-%m-%d").to_string()
    }

    pub fn end_str(&self) -> String {
        self.end.format("%Y-%m-%d").to_string()
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start_str(), self.end_str())
    }
}

/// One aggregate value per metric name for a date range.
///
/// The key set is closed per source (see each source's `SUMMARY_METRICS`);
/// `get` on a name outside that set yields `0.0`. Ordered so that reports
/// render deterministically.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricSummary(BTreeMap<String, f64>);

impl MetricSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// A summary with every listed metric present and zero. Used when a
    /// query came back empty (or failed soft).
    pub fn zeroed(names: &[&str]) -> Self {
        Self(names.iter().map(|n| ((*n).to_string(), 0.0)).collect())
    }

    pub fn set(&mut self, name: impl Into<String>, value: f64) {
        self.0.insert(name.into(), value);
    }

    /// Missing metrics read as zero.
    pub fn get(&self, name: &str) -> f64 {
        self.0.get(name).copied().unwrap_or(0.0)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl FromIterator<(String, f64)> for MetricSummary {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// One table row: dimension values positionally matching the table's
/// dimension schema, metric values positionally matching its metric schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricRow {
    pub keys: Vec<String>,
    pub values: Vec<f64>,
}

/// An ordered sequence of rows sharing one dimension schema and one metric
/// schema. Insertion order reflects source ranking unless re-sorted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricTable {
    pub dimensions: Vec<String>,
    pub metrics: Vec<String>,
    pub rows: Vec<MetricRow>,
}

impl MetricTable {
    pub fn new(dimensions: Vec<String>, metrics: Vec<String>) -> Self {
        Self {
            dimensions,
            metrics,
            rows: Vec::new(),
        }
    }

    /// Empty table carrying a schema, the fail-soft result shape.
    pub fn empty(dimensions: &[&str], metrics: &[&str]) -> Self {
        Self::new(
            dimensions.iter().map(|d| (*d).to_string()).collect(),
            metrics.iter().map(|m| (*m).to_string()).collect(),
        )
    }

    pub fn push_row(&mut self, keys: Vec<String>, values: Vec<f64>) {
        debug_assert_eq!(keys.len(), self.dimensions.len());
        debug_assert_eq!(values.len(), self.metrics.len());
        self.rows.push(MetricRow { keys, values });
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn metric_index(&self, name: &str) -> Option<usize> {
        self.metrics.iter().position(|m| m == name)
    }

    pub fn dimension_index(&self, name: &str) -> Option<usize> {
        self.dimensions.iter().position(|d| d == name)
    }

    /// Sum of a metric column. Unknown metric or empty table sums to zero.
    pub fn sum(&self, metric: &str) -> f64 {
        match self.metric_index(metric) {
            Some(i) => self.rows.iter().map(|r| r.values[i]).sum(),
            None => 0.0,
        }
    }

    /// Mean of a metric column. Unknown metric or empty table yields zero.
    pub fn mean(&self, metric: &str) -> f64 {
        match self.metric_index(metric) {
            Some(i) if !self.rows.is_empty() => {
                self.rows.iter().map(|r| r.values[i]).sum::<f64>() / self.rows.len() as f64
            }
            _ => 0.0,
        }
    }

    /// Stable descending sort by a metric column. No-op for an unknown
    /// metric.
    pub fn sort_by_metric(&mut self, metric: &str) {
        if let Some(i) = self.metric_index(metric) {
            self.rows.sort_by(|a, b| {
                b.values[i]
                    .partial_cmp(&a.values[i])
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        }
    }

    /// Drop rows whose `metric` value is below `min`.
    pub fn retain_min(&mut self, metric: &str, min: f64) {
        if let Some(i) = self.metric_index(metric) {
            self.rows.retain(|r| r.values[i] >= min);
        }
    }

    pub fn truncate(&mut self, len: usize) {
        self.rows.truncate(len);
    }

    /// Rewrite one dimension column in place (e.g. strip a URL prefix for
    /// display).
    pub fn map_dimension(&mut self, name: &str, f: impl Fn(&str) -> String) {
        if let Some(i) = self.dimension_index(name) {
            for row in &mut self.rows {
                row.keys[i] = f(&row.keys[i]);
            }
        }
    }
}
