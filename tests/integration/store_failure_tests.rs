//! Runs against a store that starts failing part way through

use crate::catalog::{mount_catalog, sample_books, test_config};
use catalog_sentinel::crawler::{Coordinator, SharedStorage};
use catalog_sentinel::output::{OutputResult, ReportSink};
use catalog_sentinel::record::{ChangeEntry, ChangeKind, Record, RunSummary};
use catalog_sentinel::storage::{
    RunRecord, RunStatus, SqliteStorage, Storage, StorageError, StorageResult,
};
use catalog_sentinel::{RunStage, SentinelError};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use wiremock::MockServer;

/// In-memory store whose record writes fail after a fixed number succeed
struct FlakyStore {
    inner: SqliteStorage,
    writes_allowed: usize,
    writes: usize,
    failure: fn() -> StorageError,
}

impl FlakyStore {
    fn new(writes_allowed: usize, failure: fn() -> StorageError) -> Self {
        Self {
            inner: SqliteStorage::new_in_memory().unwrap(),
            writes_allowed,
            writes: 0,
            failure,
        }
    }

    fn check_write(&mut self) -> StorageResult<()> {
        if self.writes >= self.writes_allowed {
            return Err((self.failure)());
        }
        self.writes += 1;
        Ok(())
    }
}

impl Storage for FlakyStore {
    fn ping(&self) -> StorageResult<()> {
        self.inner.ping()
    }

    fn find_by_source_url(&self, url: &str) -> StorageResult<Option<Record>> {
        self.inner.find_by_source_url(url)
    }

    fn upsert_by_source_url(&mut self, record: &Record) -> StorageResult<()> {
        self.check_write()?;
        self.inner.upsert_by_source_url(record)
    }

    fn list_all_source_urls(&self) -> StorageResult<HashSet<String>> {
        self.inner.list_all_source_urls()
    }

    fn count_records(&self) -> StorageResult<u64> {
        self.inner.count_records()
    }

    fn append_change_entry(&mut self, entry: &ChangeEntry) -> StorageResult<()> {
        self.inner.append_change_entry(entry)
    }

    fn upsert_with_change_entry(
        &mut self,
        record: &Record,
        entry: &ChangeEntry,
    ) -> StorageResult<()> {
        self.check_write()?;
        self.inner.upsert_with_change_entry(record, entry)
    }

    fn list_change_entries_by_run(&self, run_id: &str) -> StorageResult<Vec<ChangeEntry>> {
        self.inner.list_change_entries_by_run(run_id)
    }

    fn list_recent_change_entries(&self, limit: usize) -> StorageResult<Vec<ChangeEntry>> {
        self.inner.list_recent_change_entries(limit)
    }

    fn count_change_entries_by_kind(
        &self,
        run_id: Option<&str>,
    ) -> StorageResult<HashMap<ChangeKind, u64>> {
        self.inner.count_change_entries_by_kind(run_id)
    }

    fn create_run(
        &mut self,
        run_id: &str,
        started_at: DateTime<Utc>,
        config_hash: &str,
    ) -> StorageResult<()> {
        self.inner.create_run(run_id, started_at, config_hash)
    }

    fn complete_run(&mut self, summary: &RunSummary) -> StorageResult<()> {
        self.inner.complete_run(summary)
    }

    fn fail_run(&mut self, run_id: &str, error: &str) -> StorageResult<()> {
        self.inner.fail_run(run_id, error)
    }

    fn get_run(&self, run_id: &str) -> StorageResult<RunRecord> {
        self.inner.get_run(run_id)
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        self.inner.get_latest_run()
    }
}

/// Sink that only counts how often it was called
struct CountingSink(Arc<AtomicUsize>);

impl ReportSink for CountingSink {
    fn name(&self) -> &str {
        "counting"
    }

    fn publish(&self, _summary: &RunSummary, _entries: &[ChangeEntry]) -> OutputResult<PathBuf> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(PathBuf::from("counted"))
    }
}

async fn coordinator_with(
    server: &MockServer,
    dir: &TempDir,
    store: FlakyStore,
) -> (Coordinator, SharedStorage, Arc<AtomicUsize>) {
    mount_catalog(server, &sample_books()).await;

    let storage: SharedStorage = Arc::new(Mutex::new(store));
    let published = Arc::new(AtomicUsize::new(0));
    let config = test_config(server, dir.path());
    let coordinator = Coordinator::new(config, "test-hash", storage.clone())
        .unwrap()
        .with_sinks(vec![Box::new(CountingSink(published.clone()))]);

    (coordinator, storage, published)
}

#[tokio::test]
async fn test_store_lost_mid_run_fails_the_run() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let store = FlakyStore::new(1, || StorageError::Unavailable("disk detached".to_string()));
    let (mut coordinator, storage, published) = coordinator_with(&server, &dir, store).await;

    let result = coordinator.run().await;

    assert!(matches!(result, Err(SentinelError::StoreUnavailable(_))));
    assert_eq!(coordinator.stage(), RunStage::Failed);
    assert_eq!(published.load(Ordering::SeqCst), 0);

    let run = storage.lock().unwrap().get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Failed);
    assert!(run.summary.is_none());
}

#[tokio::test]
async fn test_ordinary_write_errors_are_counted() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let store = FlakyStore::new(1, || StorageError::Database("constraint failed".to_string()));
    let (mut coordinator, storage, published) = coordinator_with(&server, &dir, store).await;

    let summary = coordinator.run().await.unwrap();

    assert_eq!(coordinator.stage(), RunStage::Done);
    assert_eq!(summary.records_added, 1);
    assert_eq!(summary.errors, 2);
    assert_eq!(summary.total_in_store_after, 1);
    assert_eq!(published.load(Ordering::SeqCst), 1);

    let run = storage.lock().unwrap().get_run(&summary.run_id).unwrap();
    assert_eq!(run.status, RunStatus::Completed);
}
