//! Run coordinator - change-detection orchestration
//!
//! This module drives one end-to-end run:
//! - Checking the store and registering the run
//! - Discovering every record URL on the site
//! - Splitting URLs into new and existing against the store
//! - Fetching, parsing, diffing and persisting each batch
//! - Summarizing the run and publishing it to report sinks

use crate::config::Config;
use crate::crawler::discovery::discover_all_urls;
use crate::crawler::fetcher::{FetchError, Fetcher};
use crate::crawler::parser::parse_detail_page;
use crate::detect::{
    build_change_entry, classify_urls, detect_changes, field_statistics, generate_run_id,
};
use crate::output::{build_sinks, ReportSink};
use crate::record::{ChangeEntry, ChangeKind, Record, RunSummary};
use crate::state::RunStage;
use crate::storage::{Storage, StorageError, StorageResult};
use crate::SentinelError;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use url::Url;

/// Store handle shared between the coordinator and its callers
pub type SharedStorage = Arc<Mutex<dyn Storage>>;

/// Runs a storage operation under the store lock
///
/// A poisoned lock means a previous writer panicked mid-operation; the store
/// is treated as unavailable from then on.
pub(crate) fn with_store<T>(
    storage: &SharedStorage,
    op: impl FnOnce(&mut dyn Storage) -> StorageResult<T>,
) -> StorageResult<T> {
    let mut guard = storage
        .lock()
        .map_err(|_| StorageError::Unavailable("store lock poisoned".to_string()))?;
    op(&mut *guard)
}

/// Escalates an unavailable store to a run-level error
pub(crate) fn fatal_if_unavailable(error: StorageError) -> Result<StorageError, SentinelError> {
    if error.is_unavailable() {
        Err(SentinelError::StoreUnavailable(error.to_string()))
    } else {
        Ok(error)
    }
}

/// Returns `urls` with repeats removed, keeping first occurrences in order
pub(crate) fn dedupe_preserving_order(urls: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::with_capacity(urls.len());
    urls.into_iter().filter(|url| seen.insert(url.clone())).collect()
}

/// Per-URL outcome counters for one run
#[derive(Debug, Default)]
struct Tally {
    added: u64,
    updated: u64,
    unchanged: u64,
    errors: u64,
    error_details: Vec<String>,
}

impl Tally {
    fn record_error(&mut self, url: &str, message: impl std::fmt::Display) {
        tracing::warn!("{}: {}", url, message);
        self.errors += 1;
        self.error_details.push(format!("{}: {}", url, message));
    }
}

/// Main run coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    config_hash: String,
    storage: SharedStorage,
    fetcher: Fetcher,
    site_root: Url,
    sinks: Vec<Box<dyn ReportSink>>,
    stage: RunStage,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `config_hash` - Digest of the configuration, recorded with each run
    /// * `storage` - The record store
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(SentinelError)` - Invalid base URL or HTTP client setup failure
    pub fn new(
        config: Config,
        config_hash: impl Into<String>,
        storage: SharedStorage,
    ) -> Result<Self, SentinelError> {
        let site_root = Url::parse(&config.site.base_url)?;
        let fetcher = Fetcher::new(&config)?;
        let sinks = build_sinks(&config.output);

        Ok(Self {
            config: Arc::new(config),
            config_hash: config_hash.into(),
            storage,
            fetcher,
            site_root,
            sinks,
            stage: RunStage::Idle,
        })
    }

    /// Replaces the report sinks built from the configuration
    pub fn with_sinks(mut self, sinks: Vec<Box<dyn ReportSink>>) -> Self {
        self.sinks = sinks;
        self
    }

    /// Returns the stage the most recent run reached
    pub fn stage(&self) -> RunStage {
        self.stage
    }

    /// Runs one change-detection pass over the whole catalog
    ///
    /// Per-URL fetch, parse and write failures are counted in the summary.
    /// Only a discovery failure or an unavailable store aborts the run, in
    /// which case no summary is produced.
    pub async fn run(&mut self) -> Result<RunSummary, SentinelError> {
        let started_at = Utc::now();
        let run_id = generate_run_id(started_at);
        self.stage = RunStage::Idle;

        tracing::info!("Starting change-detection run {}", run_id);

        let mut registered = false;
        let result = self.execute(&run_id, started_at, &mut registered).await;

        if let Err(ref e) = result {
            tracing::error!("Run {} failed during {}: {}", run_id, self.stage, e);
            self.stage = RunStage::Failed;

            if registered {
                let message = e.to_string();
                if let Err(store_error) =
                    with_store(&self.storage, |s| s.fail_run(&run_id, &message))
                {
                    tracing::error!("Could not mark run {} failed: {}", run_id, store_error);
                }
            }
        }

        result
    }

    async fn execute(
        &mut self,
        run_id: &str,
        started_at: DateTime<Utc>,
        registered: &mut bool,
    ) -> Result<RunSummary, SentinelError> {
        let clock = Instant::now();

        with_store(&self.storage, |s| s.ping())
            .map_err(|e| SentinelError::StoreUnavailable(e.to_string()))?;
        with_store(&self.storage, |s| {
            s.create_run(run_id, started_at, &self.config_hash)
        })?;
        *registered = true;

        self.transition(RunStage::Discovering)?;
        let site_urls = dedupe_preserving_order(
            discover_all_urls(&self.fetcher, &self.site_root).await?,
        );

        self.transition(RunStage::Classifying)?;
        let (known_urls, total_before) = with_store(&self.storage, |s| {
            Ok((s.list_all_source_urls()?, s.count_records()?))
        })
        .map_err(|e| SentinelError::StoreUnavailable(e.to_string()))?;
        let (new_urls, existing_urls) = classify_urls(&site_urls, &known_urls);

        let mut tally = Tally::default();
        let mut entries = Vec::new();

        self.transition(RunStage::ProcessingNew)?;
        self.process_new(&new_urls, run_id, &mut tally, &mut entries)
            .await?;

        self.transition(RunStage::ProcessingExisting)?;
        self.process_existing(&existing_urls, run_id, &mut tally, &mut entries)
            .await?;

        self.transition(RunStage::Summarizing)?;
        let total_after = with_store(&self.storage, |s| s.count_records())
            .map_err(|e| SentinelError::StoreUnavailable(e.to_string()))?;

        let summary = RunSummary {
            run_id: run_id.to_string(),
            started_at,
            completed_at: Utc::now(),
            duration_seconds: clock.elapsed().as_secs_f64(),
            total_on_site: site_urls.len() as u64,
            total_in_store_before: total_before,
            total_in_store_after: total_after,
            records_added: tally.added,
            records_updated: tally.updated,
            records_unchanged: tally.unchanged,
            errors: tally.errors,
            fields_changed: field_statistics(&entries),
            error_details: if tally.error_details.is_empty() {
                None
            } else {
                Some(tally.error_details)
            },
        };

        if let Err(e) = with_store(&self.storage, |s| s.complete_run(&summary)) {
            let e = fatal_if_unavailable(e)?;
            tracing::warn!("Could not record summary for {}: {}", run_id, e);
        }

        tracing::info!(
            "Run {} summary: {} on site, {} added, {} updated, {} unchanged, {} errors",
            summary.run_id,
            summary.total_on_site,
            summary.records_added,
            summary.records_updated,
            summary.records_unchanged,
            summary.errors
        );

        self.transition(RunStage::Reporting)?;
        self.publish(&summary, &entries);

        self.transition(RunStage::Done)?;
        Ok(summary)
    }

    /// Fetches records absent from the store, persists them and logs additions
    async fn process_new(
        &self,
        urls: &[String],
        run_id: &str,
        tally: &mut Tally,
        entries: &mut Vec<ChangeEntry>,
    ) -> Result<(), SentinelError> {
        tracing::info!("Processing {} new URLs", urls.len());

        for chunk in urls.chunks(self.batch_size()) {
            for (url, fetched) in self.fetcher.fetch_batch(chunk).await {
                let Some(record) = self.parse_fetched(&url, fetched, tally) else {
                    continue;
                };
                self.persist_added(record, run_id, tally, entries)?;
            }
        }

        Ok(())
    }

    /// Fetches records already in the store and logs field-level updates
    async fn process_existing(
        &self,
        urls: &[String],
        run_id: &str,
        tally: &mut Tally,
        entries: &mut Vec<ChangeEntry>,
    ) -> Result<(), SentinelError> {
        tracing::info!("Checking {} existing URLs for changes", urls.len());

        for chunk in urls.chunks(self.batch_size()) {
            for (url, fetched) in self.fetcher.fetch_batch(chunk).await {
                let Some(record) = self.parse_fetched(&url, fetched, tally) else {
                    continue;
                };

                // Re-read right before diffing
                let stored = match with_store(&self.storage, |s| s.find_by_source_url(&url)) {
                    Ok(stored) => stored,
                    Err(e) => {
                        let e = fatal_if_unavailable(e)?;
                        tally.record_error(&url, e);
                        continue;
                    }
                };

                let Some(stored) = stored else {
                    tracing::debug!("{} vanished from the store; treating as new", url);
                    self.persist_added(record, run_id, tally, entries)?;
                    continue;
                };

                match detect_changes(&stored, &record) {
                    Some(changes) => {
                        let entry = build_change_entry(
                            &record.source_url,
                            &record.name,
                            ChangeKind::Updated,
                            Some(changes),
                            run_id,
                        );
                        let written = with_store(&self.storage, |s| {
                            s.upsert_with_change_entry(&record, &entry)
                        });
                        match written {
                            Ok(()) => {
                                tracing::debug!("Updated {}", url);
                                tally.updated += 1;
                                entries.push(entry);
                            }
                            Err(e) => {
                                let e = fatal_if_unavailable(e)?;
                                tally.record_error(&url, e);
                            }
                        }
                    }
                    None => tally.unchanged += 1,
                }
            }
        }

        Ok(())
    }

    fn persist_added(
        &self,
        record: Record,
        run_id: &str,
        tally: &mut Tally,
        entries: &mut Vec<ChangeEntry>,
    ) -> Result<(), SentinelError> {
        let entry = build_change_entry(
            &record.source_url,
            &record.name,
            ChangeKind::Added,
            None,
            run_id,
        );
        let written =
            with_store(&self.storage, |s| s.upsert_with_change_entry(&record, &entry));

        match written {
            Ok(()) => {
                tracing::debug!("Added {}", record.source_url);
                tally.added += 1;
                entries.push(entry);
            }
            Err(e) => {
                let e = fatal_if_unavailable(e)?;
                tally.record_error(&record.source_url, e);
            }
        }

        Ok(())
    }

    /// Turns a fetch result into a record, tallying any failure
    fn parse_fetched(
        &self,
        url: &str,
        fetched: Result<String, FetchError>,
        tally: &mut Tally,
    ) -> Option<Record> {
        let html = match fetched {
            Ok(html) => html,
            Err(e) => {
                tally.record_error(url, format!("fetch failed: {}", e));
                return None;
            }
        };

        match parse_detail_page(&html, url, &self.site_root) {
            Ok(mut record) => {
                if !self.config.crawl.keep_raw_html {
                    record.raw_html_snapshot = None;
                }
                Some(record)
            }
            Err(e) => {
                tally.record_error(url, format!("parse failed: {}", e));
                None
            }
        }
    }

    /// Hands the summary to every sink; sink failures are only logged
    fn publish(&self, summary: &RunSummary, entries: &[ChangeEntry]) {
        for sink in &self.sinks {
            match sink.publish(summary, entries) {
                Ok(path) => tracing::info!("{} report written to {}", sink.name(), path.display()),
                Err(e) => tracing::error!("{} report failed: {}", sink.name(), e),
            }
        }
    }

    fn batch_size(&self) -> usize {
        self.config.fetcher.batch_size.max(1) as usize
    }

    fn transition(&mut self, to: RunStage) -> Result<(), SentinelError> {
        if !self.stage.can_transition_to(to) {
            return Err(SentinelError::InvalidTransition {
                from: self.stage,
                to,
            });
        }
        tracing::info!("Run stage: {} -> {}", self.stage, to);
        self.stage = to;
        Ok(())
    }
}

/// Opens the configured store and runs one change-detection pass
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `config_hash` - Digest of the configuration file
///
/// # Returns
///
/// * `Ok(RunSummary)` - The run completed
/// * `Err(SentinelError)` - The run failed
pub async fn run_change_detection(
    config: Config,
    config_hash: &str,
) -> Result<RunSummary, SentinelError> {
    let storage = crate::storage::open_storage(std::path::Path::new(
        &config.output.database_path,
    ))
    .map_err(|e| SentinelError::StoreUnavailable(e.to_string()))?;
    let storage: SharedStorage = Arc::new(Mutex::new(storage));

    let mut coordinator = Coordinator::new(config, config_hash, storage)?;
    coordinator.run().await
}
