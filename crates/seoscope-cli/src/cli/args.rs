//! Argument surface of the `seoscope` binary.

use anyhow::{bail, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use seoscope_core::model::DateRange;

#[derive(Debug, Parser)]
#[command(
    name = "seoscope",
    version,
    about = "SEO reporting from Google Search Console and Google Analytics 4"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Reporting window. Either an explicit `--start/--end` pair or a trailing
/// window of `--days` full days ending yesterday (the dashboards' presets:
/// 7, 28, 90, 180, 365).
#[derive(Debug, Clone, Args)]
pub struct WindowArgs {
    /// Inclusive start date (YYYY-MM-DD)
    #[arg(long)]
    pub start: Option<NaiveDate>,
    /// Inclusive end date (YYYY-MM-DD)
    #[arg(long)]
    pub end: Option<NaiveDate>,
    /// Last N days ending yesterday, when --start/--end are absent
    #[arg(long, default_value_t = 28)]
    pub days: u32,
}

impl WindowArgs {
    pub fn resolve(&self) -> Result<DateRange> {
        match (self.start, self.end) {
            (Some(start), Some(end)) => Ok(DateRange::new(start, end)?),
            (None, None) => Ok(DateRange::last_days(self.days)),
            _ => bail!("--start and --end must be given together"),
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct OutputArgs {
    /// Emit JSON instead of console tables
    #[arg(long)]
    pub json: bool,
    /// Drop cached query results before running
    #[arg(long)]
    pub refresh: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Connection status of both sources
    Status,
    /// Search Console summary and top queries, optionally vs the previous period
    Overview {
        #[command(flatten)]
        window: WindowArgs,
        /// Also compare against the immediately preceding period
        #[arg(long)]
        compare: bool,
        #[command(flatten)]
        out: OutputArgs,
    },
    /// Period-over-period comparison for both sources
    Compare {
        #[command(flatten)]
        window: WindowArgs,
        #[command(flatten)]
        out: OutputArgs,
    },
    /// Top queries by clicks
    Queries {
        #[command(flatten)]
        window: WindowArgs,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[command(flatten)]
        out: OutputArgs,
    },
    /// Top pages by clicks
    Pages {
        #[command(flatten)]
        window: WindowArgs,
        #[arg(long, default_value_t = 20)]
        limit: usize,
        #[command(flatten)]
        out: OutputArgs,
    },
    /// Search performance by device
    Devices {
        #[command(flatten)]
        window: WindowArgs,
        #[command(flatten)]
        out: OutputArgs,
    },
    /// Search performance per day
    Daily {
        #[command(flatten)]
        window: WindowArgs,
        #[command(flatten)]
        out: OutputArgs,
    },
    /// Search performance by country
    Countries {
        #[command(flatten)]
        window: WindowArgs,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[command(flatten)]
        out: OutputArgs,
    },
    /// Search Console rows for queries containing TERM
    Keywords {
        term: String,
        #[command(flatten)]
        window: WindowArgs,
        /// Drop rows with fewer impressions
        #[arg(long, default_value_t = 0)]
        min_impressions: u64,
        #[command(flatten)]
        out: OutputArgs,
    },
    /// GA4 reports
    Analytics {
        #[command(subcommand)]
        report: AnalyticsReport,
    },
}

#[derive(Debug, Subcommand)]
pub enum AnalyticsReport {
    /// Aggregate GA4 metrics, optionally vs the previous period
    Summary {
        #[command(flatten)]
        window: WindowArgs,
        #[arg(long)]
        compare: bool,
        #[command(flatten)]
        out: OutputArgs,
    },
    /// Daily organic-search sessions
    Organic {
        #[command(flatten)]
        window: WindowArgs,
        #[command(flatten)]
        out: OutputArgs,
    },
    /// Sessions by channel group and medium
    Sources {
        #[command(flatten)]
        window: WindowArgs,
        #[command(flatten)]
        out: OutputArgs,
    },
    /// Sessions by device category
    Devices {
        #[command(flatten)]
        window: WindowArgs,
        #[command(flatten)]
        out: OutputArgs,
    },
    /// Top landing pages by sessions
    LandingPages {
        #[command(flatten)]
        window: WindowArgs,
        #[arg(long, default_value_t = 20)]
        limit: usize,
        #[command(flatten)]
        out: OutputArgs,
    },
    /// Page views and engagement by path
    Pages {
        #[command(flatten)]
        window: WindowArgs,
        #[arg(long, default_value_t = 20)]
        limit: usize,
        #[command(flatten)]
        out: OutputArgs,
    },
    /// Sessions by country
    Geo {
        #[command(flatten)]
        window: WindowArgs,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[command(flatten)]
        out: OutputArgs,
    },
    /// Daily engagement metrics
    Engagement {
        #[command(flatten)]
        window: WindowArgs,
        #[command(flatten)]
        out: OutputArgs,
    },
    /// Event counts
    Events {
        #[command(flatten)]
        window: WindowArgs,
        #[command(flatten)]
        out: OutputArgs,
    },
    /// Landing pages of organic-medium sessions
    Keywords {
        #[command(flatten)]
        window: WindowArgs,
        #[command(flatten)]
        out: OutputArgs,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn explicit_window_resolves() {
        let w = WindowArgs {
            start: Some("2024-03-01".parse().unwrap()),
            end: Some("2024-03-28".parse().unwrap()),
            days: 28,
        };
        let r = w.resolve().unwrap();
        assert_eq!(r.days(), 28);
        assert_eq!(r.start_str(), "2024-03-01");
    }

    #[test]
    fn half_open_window_is_rejected() {
        let w = WindowArgs {
            start: Some("2024-03-01".parse().unwrap()),
            end: None,
            days: 28,
        };
        assert!(w.resolve().is_err());
    }

    #[test]
    fn inverted_window_is_rejected() {
        let w = WindowArgs {
            start: Some("2024-03-28".parse().unwrap()),
            end: Some("2024-03-01".parse().unwrap()),
            days: 28,
        };
        assert!(w.resolve().is_err());
    }

    #[test]
    fn default_window_covers_the_requested_days() {
        let w = WindowArgs {
            start: None,
            end: None,
            days: 7,
        };
        assert_eq!(w.resolve().unwrap().days(), 7);
    }
}
