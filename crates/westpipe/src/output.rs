use std::io::IsTerminal;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use westpipe_engine::{EngineReport, RenderEvent, SeriesValue, Snapshot};

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct EventOutput<'a> {
    module: &'a str,
    #[serde(flatten)]
    snapshot: &'a Snapshot,
    timestamp: String,
}

pub fn print_event(event: &RenderEvent, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = EventOutput {
                module: &event.module_id,
                snapshot: &event.snapshot,
                timestamp: now_unix_millis(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["MODULE", "KIND", "VALUES"])
                .add_row(vec![
                    event.module_id.clone(),
                    kind(&event.snapshot).to_string(),
                    values(&event.snapshot),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "module={} kind={} {}",
                event.module_id,
                kind(&event.snapshot),
                values(&event.snapshot)
            );
        }
    }
}

#[derive(Serialize)]
struct ReportOutput<'a> {
    reason: String,
    modules: Vec<&'a str>,
    heartbeats: u64,
    stats: &'a westpipe_engine::FrameStats,
}

/// Summary printed to stderr once the host stops.
pub fn print_report(report: &EngineReport, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = ReportOutput {
                reason: report.reason.to_string(),
                modules: report.registry.ids(),
                heartbeats: report.heartbeats,
                stats: &report.stats,
            };
            eprintln!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table | OutputFormat::Pretty => {
            let stats = &report.stats;
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FIELD", "VALUE"]);
            for (field, value) in [
                ("reason", report.reason.to_string()),
                ("modules", report.registry.ids().join(", ")),
                ("heartbeats", report.heartbeats.to_string()),
                ("frames", stats.frames.to_string()),
                ("ticks", stats.ticks.to_string()),
                ("log records", stats.log_records.to_string()),
                ("dropped", stats.dropped.to_string()),
                ("ignored", stats.ignored.to_string()),
                ("rejected documents", stats.rejected_documents.to_string()),
                ("module errors", stats.module_errors.to_string()),
            ] {
                table.add_row(vec![field.to_string(), value]);
            }
            eprintln!("{table}");
        }
    }
}

fn kind(snapshot: &Snapshot) -> &'static str {
    match snapshot {
        Snapshot::LineChart { .. } => "line-chart",
        Snapshot::BarChart { .. } => "bar-chart",
        Snapshot::Odometry { .. } => "odometry",
    }
}

fn values(snapshot: &Snapshot) -> String {
    match snapshot {
        Snapshot::LineChart { frame, points, .. } => {
            format!("frame={frame} {}", series(points))
        }
        Snapshot::BarChart { bars, .. } => series(bars),
        Snapshot::Odometry { x, y, heading } => format!("x={x} y={y} heading={heading}"),
    }
}

fn series(values: &[SeriesValue]) -> String {
    values
        .iter()
        .map(|v| format!("{}={}", v.series, v.value))
        .collect::<Vec<_>>()
        .join(" ")
}

fn now_unix_millis() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
