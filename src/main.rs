//! Catalog-Sentinel main entry point
//!
//! This is the command-line interface for the Catalog-Sentinel change tracker.

use anyhow::{Context, Result};
use catalog_sentinel::config::{load_config_with_hash, parse_daily_at, Config};
use catalog_sentinel::crawler::{run_catalog_crawl, run_change_detection, run_daily, SharedStorage};
use catalog_sentinel::output::{load_statistics, print_statistics};
use catalog_sentinel::storage::open_storage;
use catalog_sentinel::RunSummary;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;

/// Catalog-Sentinel: catalog crawler with field-level change history
///
/// Crawls a paginated catalog, stores every record, and logs each addition
/// and field-level update between runs.
#[derive(Parser, Debug)]
#[command(name = "catalog-sentinel")]
#[command(version = "1.0.0")]
#[command(about = "Catalog crawler with field-level change history", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Crawl the catalog into the store without change detection
    #[arg(long, conflicts_with_all = ["schedule", "stats", "dry_run"])]
    crawl: bool,

    /// Run change detection every day at the configured time
    #[arg(long, conflicts_with_all = ["crawl", "stats", "dry_run"])]
    schedule: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["crawl", "schedule", "dry_run"])]
    stats: bool,

    /// Validate config and show what would be crawled without crawling
    #[arg(long, conflicts_with_all = ["crawl", "schedule", "stats"])]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config)
    } else if cli.stats {
        handle_stats(&config)
    } else if cli.crawl {
        handle_crawl(&config).await
    } else if cli.schedule {
        run_daily(config, config_hash)
            .await
            .context("scheduler stopped")
    } else {
        handle_detect(config, &config_hash).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("catalog_sentinel=info,warn"),
            1 => EnvFilter::new("catalog_sentinel=debug,info"),
            2 => EnvFilter::new("catalog_sentinel=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) -> Result<()> {
    println!("=== Catalog-Sentinel Dry Run ===\n");

    println!("Site:");
    println!("  Base URL: {}", config.site.base_url);

    println!("\nFetcher:");
    println!(
        "  Max concurrent requests: {}",
        config.fetcher.max_concurrent_requests
    );
    println!("  Batch size: {}", config.fetcher.batch_size);
    println!("  Request timeout: {}ms", config.fetcher.request_timeout_ms);
    println!(
        "  Retries: {} attempts, backoff x{} between {}ms and {}ms",
        config.retry.max_attempts,
        config.retry.multiplier,
        config.retry.min_wait_ms,
        config.retry.max_wait_ms
    );

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nCrawl:");
    println!("  Skip existing: {}", config.crawl.skip_existing);
    println!("  Keep raw HTML: {}", config.crawl.keep_raw_html);

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    println!("  Report directory: {}", config.output.report_dir);
    println!("  Reports: {}", config.output.reports.join(", "));

    let daily_at = parse_daily_at(&config.schedule.daily_at)?;
    println!("\nSchedule:");
    println!("  Daily at: {}", daily_at.format("%H:%M"));

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would discover listing pages starting at {}",
        config.site.base_url
    );

    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let storage = open_storage(Path::new(&config.output.database_path))
        .context("failed to open the record store")?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --crawl mode: populates the store without change detection
async fn handle_crawl(config: &Config) -> Result<()> {
    let storage = open_storage(Path::new(&config.output.database_path))
        .context("failed to open the record store")?;
    let storage: SharedStorage = Arc::new(Mutex::new(storage));

    let report = run_catalog_crawl(config, storage).await?;

    println!("=== Crawl Complete ===\n");
    println!("  Found: {}", report.found);
    println!("  Skipped (already stored): {}", report.skipped);
    println!("  Processed: {}", report.processed);
    println!("  Saved: {}", report.saved);
    println!("  Scrape errors: {}", report.scrape_errors);
    println!("  Save failures: {}", report.save_failures);
    println!("  Duration: {:.1}s", report.duration.as_secs_f64());

    Ok(())
}

/// Handles the default mode: one change-detection run
async fn handle_detect(config: Config, config_hash: &str) -> Result<()> {
    match run_change_detection(config, config_hash).await {
        Ok(summary) => {
            print_summary(&summary);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Change detection failed: {}", e);
            Err(e.into())
        }
    }
}

fn print_summary(summary: &RunSummary) {
    println!("=== Run {} ===\n", summary.run_id);
    println!("  Duration: {:.2} minutes", summary.duration_minutes());
    println!("  Records on site: {}", summary.total_on_site);
    println!(
        "  Records in store: {} -> {}",
        summary.total_in_store_before, summary.total_in_store_after
    );
    println!("  Added: {}", summary.records_added);
    println!("  Updated: {}", summary.records_updated);
    println!("  Unchanged: {}", summary.records_unchanged);
    println!("  Errors: {}", summary.errors);

    if !summary.fields_changed.is_empty() {
        println!("\nFields changed:");
        for (field, count) in &summary.fields_changed {
            println!("  {}: {}", field, count);
        }
    }
}
