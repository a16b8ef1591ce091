//! JSON change report

use crate::output::traits::{report_file_name, OutputResult, ReportSink};
use crate::record::{ChangeEntry, RunSummary};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

/// Writes `change_report_<timestamp>_<run suffix>.json` into a directory
#[derive(Debug, Clone)]
pub struct JsonReportSink {
    output_dir: PathBuf,
}

impl JsonReportSink {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }
}

#[derive(Serialize)]
struct SummarySection<'a> {
    run_id: &'a str,
    started_at: String,
    completed_at: String,
    duration_seconds: f64,
    duration_minutes: f64,
    total_on_site: u64,
    total_in_store_before: u64,
    total_in_store_after: u64,
    records_added: u64,
    records_updated: u64,
    records_unchanged: u64,
    fields_changed: &'a BTreeMap<String, u64>,
    errors: u64,
}

#[derive(Serialize)]
struct Report<'a> {
    summary: SummarySection<'a>,
    changes: &'a [ChangeEntry],
}

/// Renders the report document
pub fn format_json_report(summary: &RunSummary, entries: &[ChangeEntry]) -> OutputResult<String> {
    let report = Report {
        summary: SummarySection {
            run_id: &summary.run_id,
            started_at: summary.started_at.to_rfc3339(),
            completed_at: summary.completed_at.to_rfc3339(),
            duration_seconds: summary.duration_seconds,
            duration_minutes: (summary.duration_minutes() * 100.0).round() / 100.0,
            total_on_site: summary.total_on_site,
            total_in_store_before: summary.total_in_store_before,
            total_in_store_after: summary.total_in_store_after,
            records_added: summary.records_added,
            records_updated: summary.records_updated,
            records_unchanged: summary.records_unchanged,
            fields_changed: &summary.fields_changed,
            errors: summary.errors,
        },
        changes: entries,
    };

    Ok(serde_json::to_string_pretty(&report)?)
}

impl ReportSink for JsonReportSink {
    fn name(&self) -> &str {
        "json"
    }

    fn publish(&self, summary: &RunSummary, entries: &[ChangeEntry]) -> OutputResult<PathBuf> {
        fs::create_dir_all(&self.output_dir)?;

        let path = self
            .output_dir
            .join(report_file_name(summary, "json"));
        fs::write(&path, format_json_report(summary, entries)?)?;

        Ok(path)
    }
}
