//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::record::{ChangeEntry, ChangeKind, FieldChanges, Record, RunSummary};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{RunRecord, RunStatus};
use crate::SentinelError;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::{HashMap, HashSet};
use std::path::Path;

const RECORD_COLUMNS: &str = "source_url, name, category, price_incl_tax, price_excl_tax,
     availability, rating, number_of_reviews, description, image_url, crawled_at,
     content_hash, raw_html_snapshot";

const CHANGE_COLUMNS: &str =
    "record_url, record_name, change_kind, field_changes, detected_at, run_id";

const RUN_COLUMNS: &str =
    "run_id, started_at, finished_at, config_hash, status, error_message, summary_json";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(SentinelError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, SentinelError> {
        let conn = Connection::open(path).map_err(StorageError::from)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            PRAGMA mmap_size = 268435456;
        ",
        )
        .map_err(StorageError::from)?;

        initialize_schema(&conn).map_err(StorageError::from)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for tests and dry runs)
    pub fn new_in_memory() -> Result<Self, SentinelError> {
        let conn = Connection::open_in_memory().map_err(StorageError::from)?;
        initialize_schema(&conn).map_err(StorageError::from)?;
        Ok(Self { conn })
    }
}

impl Storage for SqliteStorage {
    // ===== Health =====

    fn ping(&self) -> StorageResult<()> {
        self.conn
            .query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        Ok(())
    }

    // ===== Records =====

    fn find_by_source_url(&self, url: &str) -> StorageResult<Option<Record>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM records WHERE source_url = ?1",
            RECORD_COLUMNS
        ))?;

        let record = stmt.query_row(params![url], row_to_record).optional()?;

        Ok(record)
    }

    fn upsert_by_source_url(&mut self, record: &Record) -> StorageResult<()> {
        write_record(&self.conn, record)
    }

    fn upsert_with_change_entry(
        &mut self,
        record: &Record,
        entry: &ChangeEntry,
    ) -> StorageResult<()> {
        let tx = self.conn.transaction()?;
        write_record(&tx, record)?;
        write_change_entry(&tx, entry)?;
        tx.commit()?;
        Ok(())
    }

    fn list_all_source_urls(&self) -> StorageResult<HashSet<String>> {
        let mut stmt = self.conn.prepare("SELECT source_url FROM records")?;

        let urls = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<HashSet<_>, _>>()?;

        Ok(urls)
    }

    fn count_records(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    // ===== Change Log =====

    fn append_change_entry(&mut self, entry: &ChangeEntry) -> StorageResult<()> {
        write_change_entry(&self.conn, entry)
    }

    fn list_change_entries_by_run(&self, run_id: &str) -> StorageResult<Vec<ChangeEntry>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM change_entries WHERE run_id = ?1 ORDER BY id ASC",
            CHANGE_COLUMNS
        ))?;

        let entries = stmt
            .query_map(params![run_id], row_to_change_entry)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    fn list_recent_change_entries(&self, limit: usize) -> StorageResult<Vec<ChangeEntry>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM change_entries ORDER BY detected_at DESC, id DESC LIMIT ?1",
            CHANGE_COLUMNS
        ))?;

        let entries = stmt
            .query_map(params![limit as i64], row_to_change_entry)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    fn count_change_entries_by_kind(
        &self,
        run_id: Option<&str>,
    ) -> StorageResult<HashMap<ChangeKind, u64>> {
        let mut stmt = self.conn.prepare(
            "SELECT change_kind, COUNT(*) FROM change_entries
             WHERE ?1 IS NULL OR run_id = ?1
             GROUP BY change_kind",
        )?;

        let mut counts = HashMap::new();
        let rows = stmt.query_map(params![run_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        for row in rows {
            let (kind, count) = row?;
            if let Some(kind) = ChangeKind::from_db_string(&kind) {
                counts.insert(kind, count as u64);
            }
        }

        Ok(counts)
    }

    // ===== Run Management =====

    fn create_run(
        &mut self,
        run_id: &str,
        started_at: DateTime<Utc>,
        config_hash: &str,
    ) -> StorageResult<()> {
        self.conn.execute(
            "INSERT INTO runs (run_id, started_at, config_hash, status) VALUES (?1, ?2, ?3, ?4)",
            params![
                run_id,
                started_at.to_rfc3339(),
                config_hash,
                RunStatus::Running.to_db_string()
            ],
        )?;
        Ok(())
    }

    fn complete_run(&mut self, summary: &RunSummary) -> StorageResult<()> {
        let summary_json = serde_json::to_string(summary)?;
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, summary_json = ?3 WHERE run_id = ?4",
            params![
                RunStatus::Completed.to_db_string(),
                summary.completed_at.to_rfc3339(),
                summary_json,
                summary.run_id
            ],
        )?;

        if updated == 0 {
            return Err(StorageError::RunNotFound(summary.run_id.clone()));
        }
        Ok(())
    }

    fn fail_run(&mut self, run_id: &str, error: &str) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, error_message = ?3 WHERE run_id = ?4",
            params![RunStatus::Failed.to_db_string(), now, error, run_id],
        )?;
        Ok(())
    }

    fn get_run(&self, run_id: &str) -> StorageResult<RunRecord> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM runs WHERE run_id = ?1", RUN_COLUMNS))?;

        stmt.query_row(params![run_id], row_to_run)
            .optional()?
            .ok_or_else(|| StorageError::RunNotFound(run_id.to_string()))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM runs ORDER BY id DESC LIMIT 1",
            RUN_COLUMNS
        ))?;

        let run = stmt.query_row([], row_to_run).optional()?;

        Ok(run)
    }
}

/// Inserts or overwrites one record keyed by its source URL
fn write_record(conn: &Connection, record: &Record) -> StorageResult<()> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO records (source_url, name, category, price_incl_tax, price_excl_tax,
         availability, rating, number_of_reviews, description, image_url, crawled_at,
         content_hash, raw_html_snapshot, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
         ON CONFLICT(source_url) DO UPDATE SET
            name = excluded.name,
            category = excluded.category,
            price_incl_tax = excluded.price_incl_tax,
            price_excl_tax = excluded.price_excl_tax,
            availability = excluded.availability,
            rating = excluded.rating,
            number_of_reviews = excluded.number_of_reviews,
            description = excluded.description,
            image_url = excluded.image_url,
            crawled_at = excluded.crawled_at,
            content_hash = excluded.content_hash,
            raw_html_snapshot = excluded.raw_html_snapshot,
            updated_at = excluded.updated_at",
        params![
            record.source_url,
            record.name,
            record.category,
            record.price_incl_tax,
            record.price_excl_tax,
            record.availability,
            record.rating,
            record.number_of_reviews,
            record.description,
            record.image_url,
            record.crawled_at.to_rfc3339(),
            record.content_hash,
            record.raw_html_snapshot,
            now,
        ],
    )?;
    Ok(())
}

fn write_change_entry(conn: &Connection, entry: &ChangeEntry) -> StorageResult<()> {
    let field_changes = entry
        .field_changes
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    conn.execute(
        "INSERT INTO change_entries (record_url, record_name, change_kind, field_changes,
         detected_at, run_id) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            entry.record_url,
            entry.record_name,
            entry.change_kind.to_db_string(),
            field_changes,
            entry.detected_at.to_rfc3339(),
            entry.run_id,
        ],
    )?;
    Ok(())
}

/// Parses an RFC 3339 column into a UTC timestamp
fn parse_timestamp(idx: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<Record> {
    let crawled_at: String = row.get(10)?;

    Ok(Record {
        source_url: row.get(0)?,
        name: row.get(1)?,
        category: row.get(2)?,
        price_incl_tax: row.get(3)?,
        price_excl_tax: row.get(4)?,
        availability: row.get(5)?,
        rating: row.get(6)?,
        number_of_reviews: row.get(7)?,
        description: row.get(8)?,
        image_url: row.get(9)?,
        crawled_at: parse_timestamp(10, &crawled_at)?,
        content_hash: row.get(11)?,
        raw_html_snapshot: row.get(12)?,
    })
}

fn row_to_change_entry(row: &Row<'_>) -> rusqlite::Result<ChangeEntry> {
    let kind: String = row.get(2)?;
    let change_kind = ChangeKind::from_db_string(&kind).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            Type::Text,
            format!("unknown change kind '{}'", kind).into(),
        )
    })?;

    let field_changes = row
        .get::<_, Option<String>>(3)?
        .map(|json| serde_json::from_str::<FieldChanges>(&json))
        .transpose()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;

    let detected_at: String = row.get(4)?;

    Ok(ChangeEntry {
        record_url: row.get(0)?,
        record_name: row.get(1)?,
        change_kind,
        field_changes,
        detected_at: parse_timestamp(4, &detected_at)?,
        run_id: row.get(5)?,
    })
}

fn row_to_run(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    let summary = row
        .get::<_, Option<String>>(6)?
        .map(|json| serde_json::from_str::<RunSummary>(&json))
        .transpose()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(e)))?;

    Ok(RunRecord {
        run_id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?).unwrap_or(RunStatus::Failed),
        error_message: row.get(5)?,
        summary,
    })
}
