//! Statistics generation from the record store
//!
//! This module provides functionality for extracting and displaying
//! store statistics from the storage layer.

use crate::record::{ChangeEntry, ChangeKind};
use crate::storage::{RunRecord, Storage};
use crate::SentinelError;
use std::collections::HashMap;

/// Number of recent change entries shown by `--stats`
const RECENT_CHANGES: usize = 10;

/// Store statistics summary
#[derive(Debug, Clone)]
pub struct StoreStatistics {
    /// Total number of stored records
    pub total_records: u64,

    /// Change-log entries by kind, across all runs
    pub changes_by_kind: HashMap<ChangeKind, u64>,

    /// The most recent run, if any
    pub latest_run: Option<RunRecord>,

    /// Newest change-log entries, newest first
    pub recent_changes: Vec<ChangeEntry>,
}

impl StoreStatistics {
    pub fn total_changes(&self) -> u64 {
        self.changes_by_kind.values().sum()
    }
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(StoreStatistics)` - Successfully loaded statistics
/// * `Err(SentinelError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn Storage) -> Result<StoreStatistics, SentinelError> {
    Ok(StoreStatistics {
        total_records: storage.count_records()?,
        changes_by_kind: storage.count_change_entries_by_kind(None)?,
        latest_run: storage.get_latest_run()?,
        recent_changes: storage.list_recent_change_entries(RECENT_CHANGES)?,
    })
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &StoreStatistics) {
    println!("=== Store Statistics ===\n");

    println!("Overview:");
    println!("  Records stored: {}", stats.total_records);
    println!("  Change entries: {}", stats.total_changes());
    for kind in [ChangeKind::Added, ChangeKind::Updated] {
        println!(
            "    {}: {}",
            kind,
            stats.changes_by_kind.get(&kind).copied().unwrap_or(0)
        );
    }
    println!();

    match &stats.latest_run {
        Some(run) => {
            println!("Latest Run:");
            println!("  ID: {}", run.run_id);
            println!("  Status: {}", run.status.to_db_string());
            println!("  Started: {}", run.started_at);
            if let Some(finished) = &run.finished_at {
                println!("  Finished: {}", finished);
            }
            if let Some(summary) = &run.summary {
                println!(
                    "  Outcome: {} added, {} updated, {} unchanged, {} errors",
                    summary.records_added,
                    summary.records_updated,
                    summary.records_unchanged,
                    summary.errors
                );
            }
            if let Some(error) = &run.error_message {
                println!("  Error: {}", error);
            }
        }
        None => println!("No runs recorded yet."),
    }
    println!();

    if !stats.recent_changes.is_empty() {
        println!("Recent Changes:");
        for entry in &stats.recent_changes {
            let fields = entry
                .field_changes
                .as_ref()
                .map(|changes| {
                    changes
                        .iter()
                        .map(|(field, change)| format!("{}: {} -> {}", field, change.old, change.new))
                        .collect::<Vec<_>>()
                        .join(", ")
                })
                .unwrap_or_default();
            println!(
                "  [{}] {} {} {}",
                entry.detected_at.format("%Y-%m-%d %H:%M:%S"),
                entry.change_kind,
                entry.record_name,
                fields
            );
        }
    }
}
