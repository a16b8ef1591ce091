//! Output module for run reports and store statistics
//!
//! This module handles:
//! - Publishing run summaries through report sinks (JSON, Markdown)
//! - Printing store statistics

mod json;
mod markdown;
pub mod stats;
mod traits;

pub use json::{format_json_report, JsonReportSink};
pub use markdown::{format_markdown_report, generate_markdown_report, MarkdownReportSink};
pub use stats::{load_statistics, print_statistics, StoreStatistics};
pub use traits::{report_file_name, OutputError, OutputResult, ReportSink};

use crate::config::OutputConfig;

/// Builds the report sinks named in the output configuration
///
/// Unknown names are skipped with a warning; validation rejects them
/// earlier for configurations loaded from disk.
pub fn build_sinks(config: &OutputConfig) -> Vec<Box<dyn ReportSink>> {
    let mut sinks: Vec<Box<dyn ReportSink>> = Vec::new();

    for name in &config.reports {
        match name.as_str() {
            "json" => sinks.push(Box::new(JsonReportSink::new(&config.report_dir))),
            "markdown" => sinks.push(Box::new(MarkdownReportSink::new(&config.report_dir))),
            other => tracing::warn!("Unknown report sink '{}', skipping", other),
        }
    }

    sinks
}
