//! End-to-end change detection runs

use crate::catalog::{
    mount_book, mount_catalog, mount_listing, open_store, request_count, sample_books,
    test_config,
};
use catalog_sentinel::crawler::{Coordinator, SharedStorage};
use catalog_sentinel::output::{OutputError, OutputResult, ReportSink};
use catalog_sentinel::record::{FieldChange, FieldValue};
use catalog_sentinel::storage::{RunStatus, Storage};
use catalog_sentinel::{ChangeEntry, ChangeKind, Config, RunStage, RunSummary};
use std::path::PathBuf;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn run_once(config: &Config, storage: &SharedStorage) -> RunSummary {
    let mut coordinator = Coordinator::new(config.clone(), "test-hash", storage.clone()).unwrap();
    let summary = coordinator.run().await.unwrap();
    assert_eq!(coordinator.stage(), RunStage::Done);
    summary
}

fn entries_for(storage: &SharedStorage, run_id: &str) -> Vec<ChangeEntry> {
    storage
        .lock()
        .unwrap()
        .list_change_entries_by_run(run_id)
        .unwrap()
}

#[tokio::test]
async fn test_first_run_adds_every_record() {
    let server = MockServer::start().await;
    let books = sample_books();
    mount_catalog(&server, &books).await;

    let dir = TempDir::new().unwrap();
    let config = test_config(&server, dir.path());
    let storage = open_store(&config);

    let summary = run_once(&config, &storage).await;

    assert_eq!(summary.total_on_site, 3);
    assert_eq!(summary.total_in_store_before, 0);
    assert_eq!(summary.total_in_store_after, 3);
    assert_eq!(summary.records_added, 3);
    assert_eq!(summary.records_updated, 0);
    assert_eq!(summary.errors, 0);
    assert!(summary.fields_changed.is_empty());

    let entries = entries_for(&storage, &summary.run_id);
    assert_eq!(entries.len(), 3);
    assert!(entries
        .iter()
        .all(|e| e.change_kind == ChangeKind::Added && e.field_changes.is_none()));

    let stored = storage
        .lock()
        .unwrap()
        .find_by_source_url(&books[0].url(&server))
        .unwrap()
        .unwrap();
    assert_eq!(stored.name, "A Light in the Attic");
    assert_eq!(stored.category, "Poetry");
    assert_eq!(stored.price_incl_tax, 51.77);
    assert!(stored.fingerprint_is_current());

    let run = storage.lock().unwrap().get_run(&summary.run_id).unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.config_hash, "test-hash");

    let reports: Vec<_> = std::fs::read_dir(dir.path().join("reports"))
        .unwrap()
        .collect();
    assert_eq!(reports.len(), 1);
}

#[tokio::test]
async fn test_price_change_emits_one_update() {
    let server = MockServer::start().await;
    let mut books = sample_books();
    mount_catalog(&server, &books).await;

    let dir = TempDir::new().unwrap();
    let config = test_config(&server, dir.path());
    let storage = open_store(&config);

    run_once(&config, &storage).await;
    let url = books[0].url(&server);
    let old_hash = storage
        .lock()
        .unwrap()
        .find_by_source_url(&url)
        .unwrap()
        .unwrap()
        .content_hash;

    server.reset().await;
    books[0].price_incl_tax = 45.00;
    mount_catalog(&server, &books).await;

    let summary = run_once(&config, &storage).await;

    assert_eq!(summary.records_added, 0);
    assert_eq!(summary.records_updated, 1);
    assert_eq!(summary.records_unchanged, 2);
    assert_eq!(summary.fields_changed.get("price_incl_tax"), Some(&1));

    let entries = entries_for(&storage, &summary.run_id);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].change_kind, ChangeKind::Updated);
    assert_eq!(entries[0].record_url, url);

    let changes = entries[0].field_changes.as_ref().unwrap();
    assert_eq!(changes.len(), 1);
    assert_eq!(
        changes.get("price_incl_tax"),
        Some(&FieldChange {
            old: FieldValue::Number(51.77),
            new: FieldValue::Number(45.0),
        })
    );

    let stored = storage
        .lock()
        .unwrap()
        .find_by_source_url(&url)
        .unwrap()
        .unwrap();
    assert_eq!(stored.price_incl_tax, 45.0);
    assert_ne!(stored.content_hash, old_hash);
}

#[tokio::test]
async fn test_review_count_change_is_detected() {
    let server = MockServer::start().await;
    let mut books = sample_books();
    mount_catalog(&server, &books).await;

    let dir = TempDir::new().unwrap();
    let config = test_config(&server, dir.path());
    let storage = open_store(&config);

    run_once(&config, &storage).await;

    server.reset().await;
    books[1].reviews = 4;
    mount_catalog(&server, &books).await;

    let summary = run_once(&config, &storage).await;

    assert_eq!(summary.records_updated, 1);
    let entries = entries_for(&storage, &summary.run_id);
    let changes = entries[0].field_changes.as_ref().unwrap();
    assert_eq!(
        changes.get("number_of_reviews"),
        Some(&FieldChange {
            old: FieldValue::Integer(0),
            new: FieldValue::Integer(4),
        })
    );
}

#[tokio::test]
async fn test_second_run_without_changes_is_idempotent() {
    let server = MockServer::start().await;
    mount_catalog(&server, &sample_books()).await;

    let dir = TempDir::new().unwrap();
    let config = test_config(&server, dir.path());
    let storage = open_store(&config);

    let first = run_once(&config, &storage).await;
    let second = run_once(&config, &storage).await;

    assert_ne!(first.run_id, second.run_id);
    assert_eq!(second.records_added, 0);
    assert_eq!(second.records_updated, 0);
    assert_eq!(second.records_unchanged, first.total_in_store_after);
    assert!(entries_for(&storage, &second.run_id).is_empty());
}

#[tokio::test]
async fn test_failed_pages_are_counted_not_fatal() {
    let server = MockServer::start().await;
    let books = sample_books();
    mount_listing(&server, &books).await;
    // Only the first two detail pages exist; the third 404s
    mount_book(&server, &books[0]).await;
    mount_book(&server, &books[1]).await;

    let dir = TempDir::new().unwrap();
    let config = test_config(&server, dir.path());
    let storage = open_store(&config);

    let summary = run_once(&config, &storage).await;

    assert_eq!(summary.records_added, 2);
    assert_eq!(summary.errors, 1);
    assert_eq!(summary.total_in_store_after, 2);
    let details = summary.error_details.unwrap();
    assert!(details[0].contains(&books[2].slug));
    assert_eq!(request_count(&server, &books[2].path()).await, 1);
}

#[tokio::test]
async fn test_unparsable_existing_page_is_excluded() {
    let server = MockServer::start().await;
    let books = sample_books();
    mount_catalog(&server, &books).await;

    let dir = TempDir::new().unwrap();
    let config = test_config(&server, dir.path());
    let storage = open_store(&config);
    run_once(&config, &storage).await;

    server.reset().await;
    mount_listing(&server, &books).await;
    mount_book(&server, &books[0]).await;
    mount_book(&server, &books[1]).await;
    Mock::given(method("GET"))
        .and(path(books[2].path()))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body>gone</body></html>"))
        .mount(&server)
        .await;

    let summary = run_once(&config, &storage).await;

    assert_eq!(summary.records_unchanged, 2);
    assert_eq!(summary.records_updated, 0);
    assert_eq!(summary.errors, 1);
    assert_eq!(summary.total_in_store_after, 3);
}

struct FailingSink;

impl ReportSink for FailingSink {
    fn name(&self) -> &str {
        "failing"
    }

    fn publish(&self, _summary: &RunSummary, _entries: &[ChangeEntry]) -> OutputResult<PathBuf> {
        Err(OutputError::Format("disk full".to_string()))
    }
}

#[tokio::test]
async fn test_sink_failure_does_not_fail_run() {
    let server = MockServer::start().await;
    mount_catalog(&server, &sample_books()).await;

    let dir = TempDir::new().unwrap();
    let config = test_config(&server, dir.path());
    let storage = open_store(&config);

    let mut coordinator = Coordinator::new(config, "test-hash", storage.clone())
        .unwrap()
        .with_sinks(vec![Box::new(FailingSink)]);
    let summary = coordinator.run().await.unwrap();

    assert_eq!(summary.records_added, 3);
    assert_eq!(coordinator.stage(), RunStage::Done);
}

#[tokio::test]
async fn test_rejected_change_entry_leaves_no_partial_record() {
    let server = MockServer::start().await;
    let books = sample_books();
    mount_catalog(&server, &books).await;

    let dir = TempDir::new().unwrap();
    let config = test_config(&server, dir.path());
    let storage = open_store(&config);

    let side_channel = rusqlite::Connection::open(&config.output.database_path).unwrap();
    side_channel
        .execute_batch(&format!(
            "CREATE TRIGGER reject_one BEFORE INSERT ON change_entries
             WHEN NEW.record_url LIKE '%{}%'
             BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
            books[2].slug
        ))
        .unwrap();

    let first = run_once(&config, &storage).await;
    assert_eq!(first.records_added, 2);
    assert_eq!(first.errors, 1);
    assert_eq!(first.total_in_store_after, 2);

    let url = books[2].url(&server);
    assert!(storage
        .lock()
        .unwrap()
        .find_by_source_url(&url)
        .unwrap()
        .is_none());

    side_channel
        .execute_batch("DROP TRIGGER reject_one;")
        .unwrap();

    let second = run_once(&config, &storage).await;
    assert_eq!(second.records_added, 1);
    assert_eq!(second.records_unchanged, 2);

    let entries = entries_for(&storage, &second.run_id);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].record_url, url);
    assert_eq!(entries[0].change_kind, ChangeKind::Added);
}
