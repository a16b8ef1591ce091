//! Markdown change report
//!
//! This module renders a human-readable report of one run: run metadata,
//! outcome counts, per-field change counts and the list of changes.

use crate::output::traits::{report_file_name, OutputResult, ReportSink};
use crate::record::{ChangeEntry, ChangeKind, RunSummary};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Maximum number of change rows listed per kind
const MAX_LISTED_CHANGES: usize = 100;

/// Writes `change_report_<timestamp>_<run suffix>.md` into a directory
#[derive(Debug, Clone)]
pub struct MarkdownReportSink {
    output_dir: PathBuf,
}

impl MarkdownReportSink {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }
}

impl ReportSink for MarkdownReportSink {
    fn name(&self) -> &str {
        "markdown"
    }

    fn publish(&self, summary: &RunSummary, entries: &[ChangeEntry]) -> OutputResult<PathBuf> {
        fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(report_file_name(summary, "md"));
        generate_markdown_report(summary, entries, &path)?;
        Ok(path)
    }
}

/// Generates a markdown report for a run
///
/// # Arguments
///
/// * `summary` - The run summary
/// * `entries` - The change entries written by the run
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote the report
/// * `Err(OutputError)` - Failed to write the report
pub fn generate_markdown_report(
    summary: &RunSummary,
    entries: &[ChangeEntry],
    output_path: &Path,
) -> OutputResult<()> {
    let markdown = format_markdown_report(summary, entries);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a run summary and its changes as markdown
pub fn format_markdown_report(summary: &RunSummary, entries: &[ChangeEntry]) -> String {
    let mut md = String::new();

    md.push_str("# Catalog Change Report\n\n");

    // Run metadata
    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Run ID**: {}\n", summary.run_id));
    md.push_str(&format!("- **Started**: {}\n", summary.started_at.to_rfc3339()));
    md.push_str(&format!(
        "- **Completed**: {}\n",
        summary.completed_at.to_rfc3339()
    ));
    md.push_str(&format!(
        "- **Duration**: {:.1} seconds ({:.2} minutes)\n\n",
        summary.duration_seconds,
        summary.duration_minutes()
    ));

    // Counts
    md.push_str("## Overview\n\n");
    md.push_str("| Metric | Count |\n");
    md.push_str("|--------|-------|\n");
    md.push_str(&format!("| Records on site | {} |\n", summary.total_on_site));
    md.push_str(&format!(
        "| Records in store before | {} |\n",
        summary.total_in_store_before
    ));
    md.push_str(&format!(
        "| Records in store after | {} |\n",
        summary.total_in_store_after
    ));
    md.push_str(&format!("| Added | {} |\n", summary.records_added));
    md.push_str(&format!("| Updated | {} |\n", summary.records_updated));
    md.push_str(&format!("| Unchanged | {} |\n", summary.records_unchanged));
    md.push_str(&format!("| Errors | {} |\n\n", summary.errors));

    if !summary.fields_changed.is_empty() {
        md.push_str("## Fields Changed\n\n");
        md.push_str("| Field | Records |\n");
        md.push_str("|-------|---------|\n");
        for (field, count) in &summary.fields_changed {
            md.push_str(&format!("| {} | {} |\n", field, count));
        }
        md.push('\n');
    }

    let added: Vec<_> = entries
        .iter()
        .filter(|e| e.change_kind == ChangeKind::Added)
        .collect();
    if !added.is_empty() {
        md.push_str(&format!("## Added ({})\n\n", added.len()));
        for entry in added.iter().take(MAX_LISTED_CHANGES) {
            md.push_str(&format!("- [{}]({})\n", entry.record_name, entry.record_url));
        }
        push_overflow(&mut md, added.len());
    }

    let updated: Vec<_> = entries
        .iter()
        .filter(|e| e.change_kind == ChangeKind::Updated)
        .collect();
    if !updated.is_empty() {
        md.push_str(&format!("## Updated ({})\n\n", updated.len()));
        md.push_str("| Record | Field | Old | New |\n");
        md.push_str("|--------|-------|-----|-----|\n");
        for entry in updated.iter().take(MAX_LISTED_CHANGES) {
            for (field, change) in entry.field_changes.iter().flatten() {
                md.push_str(&format!(
                    "| [{}]({}) | {} | {} | {} |\n",
                    escape_cell(&entry.record_name),
                    entry.record_url,
                    field,
                    escape_cell(&change.old.to_string()),
                    escape_cell(&change.new.to_string())
                ));
            }
        }
        push_overflow(&mut md, updated.len());
    }

    if let Some(details) = summary.error_details.as_ref().filter(|d| !d.is_empty()) {
        md.push_str("## Errors\n\n");
        for detail in details.iter().take(MAX_LISTED_CHANGES) {
            md.push_str(&format!("- {}\n", detail));
        }
        push_overflow(&mut md, details.len());
    }

    if !summary.has_changes() {
        md.push_str("No changes detected.\n");
    }

    md
}

fn push_overflow(md: &mut String, total: usize) {
    if total > MAX_LISTED_CHANGES {
        md.push_str(&format!("\n... and {} more\n", total - MAX_LISTED_CHANGES));
    }
    md.push('\n');
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
}
