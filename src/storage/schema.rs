//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Catalog-Sentinel database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track change-detection runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id TEXT NOT NULL UNIQUE,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL,
    error_message TEXT,
    summary_json TEXT
);

-- Canonical catalog records, one per source URL
CREATE TABLE IF NOT EXISTS records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source_url TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    category TEXT NOT NULL,
    price_incl_tax REAL NOT NULL,
    price_excl_tax REAL NOT NULL,
    availability TEXT NOT NULL,
    rating INTEGER NOT NULL,
    number_of_reviews INTEGER NOT NULL DEFAULT 0,
    description TEXT,
    image_url TEXT,
    crawled_at TEXT NOT NULL,
    content_hash TEXT NOT NULL,
    raw_html_snapshot TEXT,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_records_category ON records(category);
CREATE INDEX IF NOT EXISTS idx_records_content_hash ON records(content_hash);

-- Append-only change log
CREATE TABLE IF NOT EXISTS change_entries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    record_url TEXT NOT NULL,
    record_name TEXT NOT NULL,
    change_kind TEXT NOT NULL,
    field_changes TEXT,
    detected_at TEXT NOT NULL,
    run_id TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_change_entries_run ON change_entries(run_id);
CREATE INDEX IF NOT EXISTS idx_change_entries_url ON change_entries(record_url);
CREATE INDEX IF NOT EXISTS idx_change_entries_kind ON change_entries(change_kind);
CREATE INDEX IF NOT EXISTS idx_change_entries_run_kind ON change_entries(run_id, change_kind);
CREATE INDEX IF NOT EXISTS idx_change_entries_detected ON change_entries(detected_at DESC);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
