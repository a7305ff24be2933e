//! Core building blocks for seoscope: the metric data model, the
//! period-over-period comparison engine, the `MetricsSource` contract the
//! Search Console and GA4 crates implement, plus the ambient pieces they
//! share (service-account auth, query caching, report rendering).

pub mod auth;
pub mod cache;
pub mod compare;
pub mod errors;
pub mod model;
pub mod report;
pub mod source;

pub use compare::{compare, ComparisonEntry, ComparisonReport};
pub use errors::SourceError;
pub use model::{DateRange, MetricRow, MetricSummary, MetricTable};
pub use source::{DimensionFilter, FilterOperator, MetricsSource, SourceStatus};
