//! Change detection
//!
//! Pure comparison logic used by the run coordinator:
//! - Monitored-field diffs between a stored and a freshly parsed record
//! - Fingerprint pre-checks
//! - New/existing URL classification against the store's known URLs
//! - Change-entry construction and per-field statistics
//! - Run identifiers

mod diff;

pub use diff::{
    compute_field_diff, compute_field_diff_among, detect_changes, hashes_differ, MonitoredField,
    MONITORED_FIELDS,
};

use crate::record::{ChangeEntry, ChangeKind, FieldChanges};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashSet};

/// Splits site URLs into `(new, existing)` by membership in `known_urls`
///
/// Input order is preserved within each partition. Duplicates in `site_urls`
/// are kept as-is.
pub fn classify_urls(site_urls: &[String], known_urls: &HashSet<String>) -> (Vec<String>, Vec<String>) {
    let (existing, new): (Vec<String>, Vec<String>) = site_urls
        .iter()
        .cloned()
        .partition(|url| known_urls.contains(url));

    tracing::info!(
        "Classified URLs: {} new, {} existing",
        new.len(),
        existing.len()
    );

    (new, existing)
}

/// Builds a change-log entry stamped with the current time
pub fn build_change_entry(
    record_url: &str,
    record_name: &str,
    change_kind: ChangeKind,
    field_changes: Option<FieldChanges>,
    run_id: &str,
) -> ChangeEntry {
    ChangeEntry {
        record_url: record_url.to_string(),
        record_name: record_name.to_string(),
        change_kind,
        field_changes,
        detected_at: Utc::now(),
        run_id: run_id.to_string(),
    }
}

/// Counts, per field name, how many entries changed that field
pub fn field_statistics(entries: &[ChangeEntry]) -> BTreeMap<String, u64> {
    let mut stats = BTreeMap::new();

    for changes in entries.iter().filter_map(|e| e.field_changes.as_ref()) {
        for field in changes.keys() {
            *stats.entry(field.clone()).or_insert(0) += 1;
        }
    }

    stats
}

/// Generates a run identifier from the run's start time
///
/// Format: `run_YYYY-MM-DD_HH:MM:SS_xxxxxxxx`. The trailing random suffix
/// keeps runs that start within the same second distinct.
pub fn generate_run_id(started_at: DateTime<Utc>) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "run_{}_{}",
        started_at.format("%Y-%m-%d_%H:%M:%S"),
        &suffix[..8]
    )
}
