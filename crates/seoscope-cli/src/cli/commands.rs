//! Subcommand dispatch. Sources are constructed from the environment once
//! per invocation and queried sequentially; query failures surface as
//! non-blocking notices on stderr, never as process failures.

use crate::cli::args::{AnalyticsReport, Cli, Command, OutputArgs};
use crate::exit_codes;
use anyhow::Result;
use seoscope_core::model::{DateRange, MetricTable};
use seoscope_core::report::{console, json};
use seoscope_core::MetricsSource;
use seoscope_ga4::AnalyticsSource;
use seoscope_gsc::SearchConsoleSource;

const GSC_LABEL: &str = "Google Search Console";
const GA4_LABEL: &str = "Google Analytics 4";

/// Metrics where a smaller value is the improvement; the console renderer
/// flips their displayed delta.
const LOWER_IS_BETTER: &[&str] = &["avg_position"];

fn prepare(source: &dyn MetricsSource, out: &OutputArgs) {
    if out.refresh {
        source.invalidate_cache();
    }
}

/// Failed queries leave the caller with an empty table; the recorded error
/// is the only way to tell that apart from a genuinely empty period.
fn notice(source: &dyn MetricsSource) {
    if let Some(err) = source.last_error() {
        eprintln!("notice: {}: {err}", source.name());
    }
}

fn emit_table(
    source: &str,
    range: &DateRange,
    title: &str,
    table: &MetricTable,
    json_mode: bool,
) -> Result<()> {
    if json_mode {
        println!(
            "{}",
            json::render(&json::TableArtifact {
                source,
                range,
                table
            })?
        );
    } else {
        print!("{}", console::render_table(title, table));
    }
    Ok(())
}

pub async fn dispatch(cli: Cli) -> Result<i32> {
    match cli.command {
        Command::Status => {
            let gsc = SearchConsoleSource::from_env();
            let ga4 = AnalyticsSource::from_env();
            println!("{}", console::render_status(GSC_LABEL, &gsc.status()));
            if gsc.is_ready() {
                println!("  property: {}", gsc.property_url());
            }
            println!("{}", console::render_status(GA4_LABEL, &ga4.status()));
            if ga4.is_ready() {
                println!("  property id: {}", ga4.property_id());
            }
        }

        Command::Overview {
            window,
            compare,
            out,
        } => {
            let range = window.resolve()?;
            let gsc = SearchConsoleSource::from_env();
            prepare(&gsc, &out);

            let summary = gsc.summarize(&range).await;
            let report = if compare {
                let previous = range.previous_period();
                Some((previous, gsc.compare_periods(&range, &previous).await))
            } else {
                None
            };
            let top = gsc.top_queries(&range, 10).await;

            if out.json {
                let mut doc = serde_json::json!({
                    "source": gsc.name(),
                    "range": range,
                    "summary": summary,
                    "top_queries": top,
                });
                if let Some((previous, ref report)) = report {
                    doc["previous_range"] = serde_json::to_value(previous)?;
                    doc["comparison"] = serde_json::to_value(report)?;
                }
                println!("{}", serde_json::to_string_pretty(&doc)?);
            } else {
                print!(
                    "{}",
                    console::render_summary(&format!("Search summary {range}"), &summary)
                );
                if let Some((previous, report)) = report {
                    print!(
                        "{}",
                        console::render_comparison(
                            &format!("vs previous period {previous}"),
                            &report,
                            LOWER_IS_BETTER,
                        )
                    );
                }
                print!("{}", console::render_table("Top queries", &top));
            }
            notice(&gsc);
        }

        Command::Compare { window, out } => {
            let range = window.resolve()?;
            let previous = range.previous_period();
            let gsc = SearchConsoleSource::from_env();
            let ga4 = AnalyticsSource::from_env();
            prepare(&gsc, &out);
            prepare(&ga4, &out);

            let gsc_report = gsc.compare_periods(&range, &previous).await;
            let ga4_report = ga4.compare_periods(&range, &previous).await;

            if out.json {
                let doc = serde_json::json!([
                    json::ComparisonArtifact {
                        source: gsc.name(),
                        current_range: &range,
                        previous_range: &previous,
                        report: &gsc_report,
                    },
                    json::ComparisonArtifact {
                        source: ga4.name(),
                        current_range: &range,
                        previous_range: &previous,
                        report: &ga4_report,
                    },
                ]);
                println!("{}", serde_json::to_string_pretty(&doc)?);
            } else {
                print!(
                    "{}",
                    console::render_comparison(
                        &format!("{GSC_LABEL} {range} vs {previous}"),
                        &gsc_report,
                        LOWER_IS_BETTER,
                    )
                );
                print!(
                    "{}",
                    console::render_comparison(
                        &format!("{GA4_LABEL} {range} vs {previous}"),
                        &ga4_report,
                        &[],
                    )
                );
            }
            notice(&gsc);
            notice(&ga4);
        }

        Command::Queries { window, limit, out } => {
            let range = window.resolve()?;
            let gsc = SearchConsoleSource::from_env();
            prepare(&gsc, &out);
            let table = gsc.top_queries(&range, limit).await;
            emit_table(gsc.name(), &range, "Top queries", &table, out.json)?;
            notice(&gsc);
        }

        Command::Pages { window, limit, out } => {
            let range = window.resolve()?;
            let gsc = SearchConsoleSource::from_env();
            prepare(&gsc, &out);
            let table = gsc.top_pages(&range, limit).await;
            emit_table(gsc.name(), &range, "Top pages", &table, out.json)?;
            notice(&gsc);
        }

        Command::Devices { window, out } => {
            let range = window.resolve()?;
            let gsc = SearchConsoleSource::from_env();
            prepare(&gsc, &out);
            let table = gsc.performance_by_device(&range).await;
            emit_table(gsc.name(), &range, "By device", &table, out.json)?;
            notice(&gsc);
        }

        Command::Daily { window, out } => {
            let range = window.resolve()?;
            let gsc = SearchConsoleSource::from_env();
            prepare(&gsc, &out);
            let table = gsc.daily_performance(&range).await;
            emit_table(gsc.name(), &range, "Daily performance", &table, out.json)?;
            notice(&gsc);
        }

        Command::Countries { window, limit, out } => {
            let range = window.resolve()?;
            let gsc = SearchConsoleSource::from_env();
            prepare(&gsc, &out);
            let table = gsc.performance_by_country(&range, limit).await;
            emit_table(gsc.name(), &range, "By country", &table, out.json)?;
            notice(&gsc);
        }

        Command::Keywords {
            term,
            window,
            min_impressions,
            out,
        } => {
            let range = window.resolve()?;
            let gsc = SearchConsoleSource::from_env();
            prepare(&gsc, &out);
            let mut table = gsc.search_keywords(&term, &range).await;
            table.retain_min("impressions", min_impressions as f64);
            table.sort_by_metric("clicks");
            emit_table(
                gsc.name(),
                &range,
                &format!("Queries containing '{term}'"),
                &table,
                out.json,
            )?;
            notice(&gsc);
        }

        Command::Analytics { report } => return dispatch_analytics(report).await,
    }
    Ok(exit_codes::OK)
}

async fn dispatch_analytics(report: AnalyticsReport) -> Result<i32> {
    let ga4 = AnalyticsSource::from_env();
    match report {
        AnalyticsReport::Summary {
            window,
            compare,
            out,
        } => {
            let range = window.resolve()?;
            prepare(&ga4, &out);
            let summary = ga4.summarize(&range).await;
            let comparison = if compare {
                let previous = range.previous_period();
                Some((previous, ga4.compare_periods(&range, &previous).await))
            } else {
                None
            };

            if out.json {
                let mut doc = serde_json::json!({
                    "source": ga4.name(),
                    "range": range,
                    "summary": summary,
                });
                if let Some((previous, ref report)) = comparison {
                    doc["previous_range"] = serde_json::to_value(previous)?;
                    doc["comparison"] = serde_json::to_value(report)?;
                }
                println!("{}", serde_json::to_string_pretty(&doc)?);
            } else {
                print!(
                    "{}",
                    console::render_summary(&format!("Analytics summary {range}"), &summary)
                );
                if let Some((previous, report)) = comparison {
                    print!(
                        "{}",
                        console::render_comparison(
                            &format!("vs previous period {previous}"),
                            &report,
                            &[],
                        )
                    );
                }
            }
        }
        AnalyticsReport::Organic { window, out } => {
            let range = window.resolve()?;
            prepare(&ga4, &out);
            let table = ga4.organic_traffic(&range).await;
            emit_table(ga4.name(), &range, "Organic traffic", &table, out.json)?;
        }
        AnalyticsReport::Sources { window, out } => {
            let range = window.resolve()?;
            prepare(&ga4, &out);
            let table = ga4.traffic_sources(&range).await;
            emit_table(ga4.name(), &range, "Traffic sources", &table, out.json)?;
        }
        AnalyticsReport::Devices { window, out } => {
            let range = window.resolve()?;
            prepare(&ga4, &out);
            let table = ga4.device_metrics(&range).await;
            emit_table(ga4.name(), &range, "By device", &table, out.json)?;
        }
        AnalyticsReport::LandingPages { window, limit, out } => {
            let range = window.resolve()?;
            prepare(&ga4, &out);
            let table = ga4.top_landing_pages(&range, limit).await;
            emit_table(ga4.name(), &range, "Top landing pages", &table, out.json)?;
        }
        AnalyticsReport::Pages { window, limit, out } => {
            let range = window.resolve()?;
            prepare(&ga4, &out);
            let table = ga4.page_metrics(&range, limit).await;
            emit_table(ga4.name(), &range, "Pages", &table, out.json)?;
        }
        AnalyticsReport::Geo { window, limit, out } => {
            let range = window.resolve()?;
            prepare(&ga4, &out);
            let table = ga4.geo_metrics(&range, limit).await;
            emit_table(ga4.name(), &range, "By country", &table, out.json)?;
        }
        AnalyticsReport::Engagement { window, out } => {
            let range = window.resolve()?;
            prepare(&ga4, &out);
            let table = ga4.user_engagement(&range).await;
            emit_table(ga4.name(), &range, "Engagement", &table, out.json)?;
        }
        AnalyticsReport::Events { window, out } => {
            let range = window.resolve()?;
            prepare(&ga4, &out);
            let table = ga4.conversions(&range).await;
            emit_table(ga4.name(), &range, "Events", &table, out.json)?;
        }
        AnalyticsReport::Keywords { window, out } => {
            let range = window.resolve()?;
            prepare(&ga4, &out);
            let table = ga4.organic_keywords(&range).await;
            emit_table(ga4.name(), &range, "Organic landing pages", &table, out.json)?;
        }
    }
    notice(&ga4);
    Ok(exit_codes::OK)
}
