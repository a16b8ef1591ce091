//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::record::{ChangeEntry, ChangeKind, Record, RunSummary};
use crate::storage::RunRecord;
use chrono::{DateTime, Utc};
use rusqlite::ErrorCode;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Run not found: {0}")]
    RunNotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl StorageError {
    /// Returns true if the store itself is unreachable or unusable
    ///
    /// Such errors abort a run; anything else is a per-record failure that
    /// the coordinator tallies and moves past.
    pub fn is_unavailable(&self) -> bool {
        match self {
            Self::Unavailable(_) => true,
            Self::Sqlite(rusqlite::Error::SqliteFailure(err, _)) => matches!(
                err.code,
                ErrorCode::CannotOpen
                    | ErrorCode::NotADatabase
                    | ErrorCode::DatabaseCorrupt
                    | ErrorCode::SystemIoFailure
                    | ErrorCode::DiskFull
                    | ErrorCode::PermissionDenied
            ),
            _ => false,
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// This is the read/write contract the run coordinator depends on. Backends
/// must enforce uniqueness of `source_url` and make each upsert atomic.
pub trait Storage: Send {
    // ===== Health =====

    /// Verifies the store is reachable
    fn ping(&self) -> StorageResult<()>;

    // ===== Records =====

    /// Gets the stored record for a source URL
    fn find_by_source_url(&self, url: &str) -> StorageResult<Option<Record>>;

    /// Inserts the record, or overwrites the one with the same source URL
    fn upsert_by_source_url(&mut self, record: &Record) -> StorageResult<()>;

    /// Gets every stored source URL
    fn list_all_source_urls(&self) -> StorageResult<HashSet<String>>;

    /// Counts stored records
    fn count_records(&self) -> StorageResult<u64>;

    // ===== Change Log =====

    /// Appends one change entry; entries are never updated or deleted
    fn append_change_entry(&mut self, entry: &ChangeEntry) -> StorageResult<()>;

    /// Upserts a record and appends its change entry as one atomic write
    ///
    /// Either both are stored or neither is.
    fn upsert_with_change_entry(
        &mut self,
        record: &Record,
        entry: &ChangeEntry,
    ) -> StorageResult<()>;

    /// Gets all change entries written by a run, oldest first
    fn list_change_entries_by_run(&self, run_id: &str) -> StorageResult<Vec<ChangeEntry>>;

    /// Gets the most recent change entries, newest first
    fn list_recent_change_entries(&self, limit: usize) -> StorageResult<Vec<ChangeEntry>>;

    /// Counts change entries by kind, optionally restricted to one run
    fn count_change_entries_by_kind(
        &self,
        run_id: Option<&str>,
    ) -> StorageResult<HashMap<ChangeKind, u64>>;

    // ===== Run Management =====

    /// Records the start of a run
    fn create_run(
        &mut self,
        run_id: &str,
        started_at: DateTime<Utc>,
        config_hash: &str,
    ) -> StorageResult<()>;

    /// Marks a run as completed and stores its summary
    fn complete_run(&mut self, summary: &RunSummary) -> StorageResult<()>;

    /// Marks a run as failed
    fn fail_run(&mut self, run_id: &str, error: &str) -> StorageResult<()>;

    /// Gets a run by ID
    fn get_run(&self, run_id: &str) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;
}
