//! Machine-readable report artifacts for `--json` output.

use crate::compare::ComparisonReport;
use crate::model::{DateRange, MetricSummary, MetricTable};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct SummaryArtifact<'a> {
    pub source: &'a str,
    pub range: &'a DateRange,
    pub metrics: &'a MetricSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComparisonArtifact<'a> {
    pub source: &'a str,
    pub current_range: &'a DateRange,
    pub previous_range: &'a DateRange,
    pub report: &'a ComparisonReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableArtifact<'a> {
    pub source: &'a str,
    pub range: &'a DateRange,
    pub table: &'a MetricTable,
}

pub fn render<T: Serialize>(artifact: &T) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(artifact)?)
}
