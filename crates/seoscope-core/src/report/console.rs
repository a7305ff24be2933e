//! Fixed-width console rendering. Deterministic and unit-testable; the CLI
//! just prints the returned strings.

use crate::compare::ComparisonReport;
use crate::model::{MetricSummary, MetricTable};

const NAME_WIDTH: usize = 24;
const VALUE_WIDTH: usize = 14;

/// Whole numbers print without a fraction; everything else gets 2 places.
pub fn format_value(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{v:.0}")
    } else {
        format!("{v:.2}")
    }
}

fn signed(v: f64) -> String {
    if v >= 0.0 {
        format!("+{}", format_value(v))
    } else {
        format_value(v)
    }
}

pub fn render_summary(title: &str, summary: &MetricSummary) -> String {
    let mut out = String::new();
    out.push_str(title);
    out.push('\n');
    for (name, value) in summary.iter() {
        out.push_str(&format!(
            "  {name:<NAME_WIDTH$} {:>VALUE_WIDTH$}\n",
            format_value(value)
        ));
    }
    out
}

/// Render a comparison block. `delta` carries the improvement framing: for
/// metrics listed in `lower_is_better` (average position) the sign of the
/// displayed delta is flipped, while `change` and `change_pct` keep the raw
/// current-minus-previous convention.
pub fn render_comparison(
    title: &str,
    report: &ComparisonReport,
    lower_is_better: &[&str],
) -> String {
    let mut out = String::new();
    out.push_str(title);
    out.push('\n');
    out.push_str(&format!(
        "  {:<NAME_WIDTH$} {:>VALUE_WIDTH$} {:>VALUE_WIDTH$} {:>VALUE_WIDTH$} {:>10}\n",
        "metric", "current", "previous", "delta", "pct"
    ));
    for (name, entry) in report.iter() {
        let delta = if lower_is_better.contains(&name) {
            -entry.change
        } else {
            entry.change
        };
        out.push_str(&format!(
            "  {name:<NAME_WIDTH$} {:>VALUE_WIDTH$} {:>VALUE_WIDTH$} {:>VALUE_WIDTH$} {:>9}%\n",
            format_value(entry.current),
            format_value(entry.previous),
            signed(delta),
            signed(entry.change_pct),
        ));
    }
    out
}

pub fn render_table(title: &str, table: &MetricTable) -> String {
    let mut out = String::new();
    out.push_str(title);
    out.push('\n');
    if table.is_empty() {
        out.push_str("  (no rows)\n");
        return out;
    }

    // Column widths: wide enough for the header and every cell.
    let mut dim_widths: Vec<usize> = table.dimensions.iter().map(|d| d.len()).collect();
    for row in &table.rows {
        for (i, key) in row.keys.iter().enumerate() {
            dim_widths[i] = dim_widths[i].max(key.len());
        }
    }

    out.push_str("  ");
    for (d, w) in table.dimensions.iter().zip(dim_widths.iter().copied()) {
        out.push_str(&format!("{d:<w$}  "));
    }
    for m in &table.metrics {
        out.push_str(&format!("{m:>VALUE_WIDTH$}  "));
    }
    out.push('\n');

    for row in &table.rows {
        out.push_str("  ");
        for (key, w) in row.keys.iter().zip(dim_widths.iter().copied()) {
            out.push_str(&format!("{key:<w$}  "));
        }
        for value in &row.values {
            out.push_str(&format!("{:>VALUE_WIDTH$}  ", format_value(*value)));
        }
        out.push('\n');
    }
    out
}

/// One status line per source for the `status` command.
pub fn render_status(name: &str, status: &crate::source::SourceStatus) -> String {
    match status {
        crate::source::SourceStatus::Ready => format!("{name}: connected"),
        crate::source::SourceStatus::Uninitialized { reason } => {
            format!("{name}: not connected ({reason})")
        }
    }
}
