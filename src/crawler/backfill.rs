//! Crawl-only path
//!
//! Populates the store without change detection: every discovered URL is
//! fetched, parsed and upserted, optionally skipping URLs already stored.
//! No change entries are written.

use crate::config::Config;
use crate::crawler::coordinator::{dedupe_preserving_order, fatal_if_unavailable, with_store, SharedStorage};
use crate::crawler::discovery::discover_all_urls;
use crate::crawler::fetcher::Fetcher;
use crate::crawler::parser::parse_detail_page;
use crate::SentinelError;
use std::time::{Duration, Instant};
use url::Url;

/// Outcome of a crawl-only run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrawlReport {
    /// Distinct record URLs listed on the site
    pub found: usize,
    /// URLs skipped because they were already stored
    pub skipped: usize,
    /// URLs fetched this run
    pub processed: usize,
    /// URLs whose fetch or parse failed
    pub scrape_errors: usize,
    pub saved: usize,
    pub save_failures: usize,
    pub duration: Duration,
}

/// Crawls the whole catalog into the store
///
/// # Arguments
///
/// * `config` - The crawler configuration; `[crawl] skip-existing` and
///   `[fetcher] batch-size` apply
/// * `storage` - The record store
///
/// # Returns
///
/// * `Ok(CrawlReport)` - Counts for the crawl
/// * `Err(SentinelError)` - Discovery failed or the store became unavailable
pub async fn run_catalog_crawl(
    config: &Config,
    storage: SharedStorage,
) -> Result<CrawlReport, SentinelError> {
    let clock = Instant::now();
    let site_root = Url::parse(&config.site.base_url)?;
    let fetcher = Fetcher::new(config)?;

    with_store(&storage, |s| s.ping())
        .map_err(|e| SentinelError::StoreUnavailable(e.to_string()))?;

    let site_urls = dedupe_preserving_order(discover_all_urls(&fetcher, &site_root).await?);
    let mut report = CrawlReport {
        found: site_urls.len(),
        ..CrawlReport::default()
    };

    let to_crawl = if config.crawl.skip_existing {
        let known = with_store(&storage, |s| s.list_all_source_urls())
            .map_err(|e| SentinelError::StoreUnavailable(e.to_string()))?;
        let fresh: Vec<String> = site_urls
            .into_iter()
            .filter(|url| !known.contains(url))
            .collect();
        report.skipped = report.found - fresh.len();
        tracing::info!(
            "Skipping {} stored URLs, {} left to crawl",
            report.skipped,
            fresh.len()
        );
        fresh
    } else {
        site_urls
    };

    let batch_size = config.fetcher.batch_size.max(1) as usize;
    let batches = to_crawl.len().div_ceil(batch_size);

    for (index, chunk) in to_crawl.chunks(batch_size).enumerate() {
        tracing::info!(
            "Batch {}/{}: fetching {} URLs",
            index + 1,
            batches,
            chunk.len()
        );

        for (url, fetched) in fetcher.fetch_batch(chunk).await {
            report.processed += 1;

            let record = match fetched {
                Ok(html) => match parse_detail_page(&html, &url, &site_root) {
                    Ok(record) => record,
                    Err(e) => {
                        tracing::warn!("Failed to parse {}: {}", url, e);
                        report.scrape_errors += 1;
                        continue;
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to fetch {}: {}", url, e);
                    report.scrape_errors += 1;
                    continue;
                }
            };

            let mut record = record;
            if !config.crawl.keep_raw_html {
                record.raw_html_snapshot = None;
            }

            match with_store(&storage, |s| s.upsert_by_source_url(&record)) {
                Ok(()) => report.saved += 1,
                Err(e) => {
                    let e = fatal_if_unavailable(e)?;
                    tracing::warn!("Failed to save {}: {}", url, e);
                    report.save_failures += 1;
                }
            }
        }
    }

    report.duration = clock.elapsed();
    tracing::info!(
        "Crawl finished: {} found, {} skipped, {} saved, {} scrape errors, {} save failures in {:.1}s",
        report.found,
        report.skipped,
        report.saved,
        report.scrape_errors,
        report.save_failures,
        report.duration.as_secs_f64()
    );

    Ok(report)
}
