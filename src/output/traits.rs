//! Report sink traits and types
//!
//! This module defines the trait interface for report sinks and the
//! associated error types.

use crate::record::{ChangeEntry, RunSummary};
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to serialize report: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Failed to format output: {0}")]
    Format(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// A consumer of finished runs
///
/// The coordinator calls every configured sink once per completed run. A
/// sink's failure is logged by the caller and never changes the run outcome.
pub trait ReportSink: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Publishes a run summary and that run's change entries
    ///
    /// Returns the location of the written report.
    fn publish(&self, summary: &RunSummary, entries: &[ChangeEntry]) -> OutputResult<PathBuf>;
}

/// Builds the report file name for a run
///
/// The start time is followed by the random tail of the run id, e.g.
/// `change_report_2024-03-01_02-00-00_abcdef12.json`, so runs started in
/// the same second never share a file.
pub fn report_file_name(summary: &RunSummary, extension: &str) -> String {
    let suffix = summary.run_id.rsplit('_').next().unwrap_or_default();
    format!(
        "change_report_{}_{}.{}",
        summary.started_at.format("%Y-%m-%d_%H-%M-%S"),
        suffix,
        extension
    )
}
