//! Time-boxed cache for query results, keyed so that two distinct
//! (range, dimensions, metrics, filters, limit) tuples never collide.
//!
//! Caching is an optimization at the source boundary, not a correctness
//! requirement; a source works identically with a zero-capacity cache.

use crate::model::{DateRange, MetricTable};
use crate::source::DimensionFilter;
use moka::sync::Cache;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;

/// Matches the hourly refresh cadence of the upstream dashboards.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

const MAX_ENTRIES: u64 = 256;

/// Digest of everything that shapes a query's result set.
pub fn query_key(
    source: &str,
    range: &DateRange,
    dimensions: &[&str],
    metrics: &[&str],
    filters: &[DimensionFilter],
    row_limit: usize,
) -> String {
    let mut h = Sha256::new();
    h.update(source.as_bytes());
    h.update(b"\n");
    h.update(range.start_str().as_bytes());
    h.update(b"\n");
    h.update(range.end_str().as_bytes());
    h.update(b"\n");
    for d in dimensions {
        h.update(d.as_bytes());
        h.update(b"\x1f");
    }
    h.update(b"\n");
    for m in metrics {
        h.update(m.as_bytes());
        h.update(b"\x1f");
    }
    h.update(b"\n");
    for f in filters {
        h.update(f.field.as_bytes());
        h.update(b"\x1f");
        h.update(f.operator.as_str().as_bytes());
        h.update(b"\x1f");
        h.update(f.expression.as_bytes());
        h.update(b"\x1e");
    }
    h.update(b"\n");
    h.update(row_limit.to_le_bytes());
    hex::encode(h.finalize())
}

#[derive(Clone)]
pub struct QueryCache {
    inner: Cache<String, Arc<MetricTable>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(MAX_ENTRIES)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub fn get(&self, key: &str) -> Option<Arc<MetricTable>> {
        self.inner.get(key)
    }

    pub fn insert(&self, key: String, table: MetricTable) -> Arc<MetricTable> {
        let table = Arc::new(table);
        self.inner.insert(key, Arc::clone(&table));
        table
    }

    /// Explicit refresh: drop every cached entry.
    pub fn invalidate_all(&self) {
        self.inner.invalidate_all();
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new()
    }
}
