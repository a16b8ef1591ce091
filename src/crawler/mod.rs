//! Crawler module for catalog fetching and change detection runs
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with an injectable retry policy and a concurrency cap
//! - Detail, listing and pager parsing
//! - URL discovery across listing pages
//! - The change-detection run coordinator
//! - The crawl-only path and the daily scheduler

mod backfill;
mod coordinator;
mod discovery;
mod fetcher;
mod parser;
mod retry;
mod scheduler;

pub use backfill::{run_catalog_crawl, CrawlReport};
pub use coordinator::{run_change_detection, Coordinator, SharedStorage};
pub use discovery::{discover_all_urls, listing_page_urls};
pub use fetcher::{build_http_client, AttemptOutcome, BatchItem, FetchError, Fetcher};
pub use parser::{
    clean_price, parse_detail_page, parse_index_page, parse_page_count, parse_rating, ParseError,
};
pub use retry::RetryPolicy;
pub use scheduler::{next_run_after, run_daily};
