use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Aggregate statistics for one change-detection run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    // Run metadata
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_seconds: f64,

    // Catalog and store sizes
    pub total_on_site: u64,
    pub total_in_store_before: u64,
    pub total_in_store_after: u64,

    // Outcome per URL
    pub records_added: u64,
    pub records_updated: u64,
    pub records_unchanged: u64,
    pub errors: u64,

    /// Field name -> number of updated records in which it changed
    pub fields_changed: BTreeMap<String, u64>,

    pub error_details: Option<Vec<String>>,
}

impl RunSummary {
    /// Returns true if the run recorded any addition or update
    pub fn has_changes(&self) -> bool {
        self.records_added > 0 || self.records_updated > 0
    }

    /// Returns the run duration in minutes
    pub fn duration_minutes(&self) -> f64 {
        self.duration_seconds / 60.0
    }
}
