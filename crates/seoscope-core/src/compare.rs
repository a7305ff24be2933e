//! Period-over-period comparison of two metric summaries.
//!
//! `compare` is pure and total: it never fails, whatever the two summaries
//! contain. The metric names in the *current* summary decide which entries
//! the report covers; a name missing from the previous summary is read as
//! zero, not an error.
//!
//! Zero-baseline policy: when the previous value is zero the percentage
//! change saturates to `100` if the current value is positive (the metric
//! appeared from nothing) and `0` otherwise. Division by zero never happens.
//!
//! The engine is metric-name agnostic. `change` is always
//! `current - previous`; for lower-is-better metrics such as average
//! position the caller negates it when framing improvement (the console
//! renderer does exactly that). Likewise CTR-style metrics that are already
//! percentages get a percentage-point `change`, which is the caller's job to
//! label correctly.

use crate::model::{round2, MetricSummary};
use serde::Serialize;
use std::collections::BTreeMap;

/// Current/previous pair for one metric, with its absolute and percentage
/// deltas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ComparisonEntry {
    pub current: f64,
    pub previous: f64,
    pub change: f64,
    pub change_pct: f64,
}

/// Per-metric comparison entries, covering exactly the metric names present
/// in the current summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ComparisonReport(BTreeMap<String, ComparisonEntry>);

impl ComparisonReport {
    pub fn get(&self, metric: &str) -> Option<&ComparisonEntry> {
        self.0.get(metric)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ComparisonEntry)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Compare a current-period summary against the previous period's.
pub fn compare(current: &MetricSummary, previous: &MetricSummary) -> ComparisonReport {
    let mut entries = BTreeMap::new();
    for (name, cur) in current.iter() {
        let prev = previous.get(name);
        let change = cur - prev;
        let change_pct = if prev > 0.0 {
            round2(change / prev * 100.0)
        } else if cur > 0.0 {
            100.0
        } else {
            0.0
        };
        entries.insert(
            name.to_string(),
            ComparisonEntry {
                current: cur,
                previous: prev,
                change,
                change_pct,
            },
        );
    }
    ComparisonReport(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(pairs: &[(&str, f64)]) -> MetricSummary {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), *v))
            .collect()
    }

    #[test]
    fn positive_baseline_yields_rounded_ratio() {
        let current = summary(&[("clicks", 150.0), ("impressions", 3000.0)]);
        let previous = summary(&[("clicks", 100.0), ("impressions", 2000.0)]);
        let report = compare(&current, &previous);

        let clicks = report.get("clicks").unwrap();
        assert_eq!(clicks.current, 150.0);
        assert_eq!(clicks.previous, 100.0);
        assert_eq!(clicks.change, 50.0);
        assert_eq!(clicks.change_pct, 50.0);

        let imps = report.get("impressions").unwrap();
        assert_eq!(imps.change, 1000.0);
        assert_eq!(imps.change_pct, 50.0);
    }

    #[test]
    fn zero_baseline_saturates_to_100() {
        let report = compare(&summary(&[("sessions", 40.0)]), &summary(&[("sessions", 0.0)]));
        let e = report.get("sessions").unwrap();
        assert_eq!(e.change, 40.0);
        assert_eq!(e.change_pct, 100.0);
    }

    #[test]
    fn zero_over_zero_is_zero_pct() {
        let report = compare(&summary(&[("sessions", 0.0)]), &summary(&[("sessions", 0.0)]));
        let e = report.get("sessions").unwrap();
        assert_eq!(e.change, 0.0);
        assert_eq!(e.change_pct, 0.0);
    }

    #[test]
    fn missing_previous_metric_reads_zero() {
        let report = compare(&summary(&[("ctr", 5.0)]), &MetricSummary::new());
        let e = report.get("ctr").unwrap();
        assert_eq!(e.previous, 0.0);
        assert_eq!(e.change, 5.0);
        assert_eq!(e.change_pct, 100.0);
    }

    #[test]
    fn report_covers_exactly_current_metric_names() {
        let current = summary(&[("clicks", 1.0)]);
        let previous = summary(&[("clicks", 2.0), ("impressions", 9.0)]);
        let report = compare(&current, &previous);
        assert_eq!(report.len(), 1);
        assert!(report.get("impressions").is_none());
    }

    #[test]
    fn change_is_exact_difference_even_when_negative() {
        let report = compare(&summary(&[("position", 8.0)]), &summary(&[("position", 10.0)]));
        let e = report.get("position").unwrap();
        assert_eq!(e.change, -2.0);
        assert_eq!(e.change_pct, -20.0);
    }

    #[test]
    fn percentage_is_rounded_to_two_places() {
        // 1/3 growth = 33.333..%
        let report = compare(&summary(&[("clicks", 4.0)]), &summary(&[("clicks", 3.0)]));
        assert_eq!(report.get("clicks").unwrap().change_pct, 33.33);
    }

    #[test]
    fn total_for_all_zero_summaries() {
        let zeros = MetricSummary::zeroed(&["a", "b", "c"]);
        let report = compare(&zeros, &zeros);
        assert_eq!(report.len(), 3);
        for (_, e) in report.iter() {
            assert_eq!(e.change, 0.0);
            assert_eq!(e.change_pct, 0.0);
        }
    }

    #[test]
    fn compare_is_idempotent() {
        let current = summary(&[("clicks", 7.0), ("ctr", 2.5)]);
        let previous = summary(&[("clicks", 5.0)]);
        assert_eq!(compare(&current, &previous), compare(&current, &previous));
    }
}
