//! Daily run scheduler
//!
//! Sleeps until the configured local time of day, runs change detection,
//! and repeats. A failed run is logged and the scheduler waits for the
//! next slot.

use crate::config::{parse_daily_at, Config};
use crate::crawler::coordinator::run_change_detection;
use crate::SentinelError;
use chrono::{DateTime, Duration, Local, NaiveTime, TimeZone};

/// Computes the first occurrence of `daily_at` strictly after `now`
///
/// Days on which `daily_at` does not exist in `now`'s timezone (a DST gap)
/// are skipped; an ambiguous time resolves to its earlier instant.
pub fn next_run_after<Tz: TimeZone>(now: &DateTime<Tz>, daily_at: NaiveTime) -> DateTime<Tz> {
    let timezone = now.timezone();
    let mut date = now.date_naive();

    loop {
        if let Some(candidate) = timezone
            .from_local_datetime(&date.and_time(daily_at))
            .earliest()
        {
            if candidate > *now {
                return candidate;
            }
        }

        match date.succ_opt() {
            Some(next) => date = next,
            None => return now.clone() + Duration::days(1),
        }
    }
}

/// Runs change detection once a day, forever
///
/// # Arguments
///
/// * `config` - The crawler configuration; `[schedule] daily-at` sets the slot
/// * `config_hash` - Digest of the configuration file, recorded with each run
///
/// # Returns
///
/// Only returns on an invalid `daily-at` value.
pub async fn run_daily(config: Config, config_hash: String) -> Result<(), SentinelError> {
    let daily_at = parse_daily_at(&config.schedule.daily_at)?;

    tracing::info!("Scheduler started; daily run at {}", daily_at.format("%H:%M"));

    loop {
        let now = Local::now();
        let next = next_run_after(&now, daily_at);
        let wait = (next - now).to_std().unwrap_or_default();

        tracing::info!(
            "Next run at {} (in {:.1} hours)",
            next.format("%Y-%m-%d %H:%M:%S %Z"),
            wait.as_secs_f64() / 3600.0
        );
        tokio::time::sleep(wait).await;

        match run_change_detection(config.clone(), &config_hash).await {
            Ok(summary) => tracing::info!(
                "Scheduled run {} completed: {} added, {} updated, {} unchanged, {} errors",
                summary.run_id,
                summary.records_added,
                summary.records_updated,
                summary.records_unchanged,
                summary.errors
            ),
            Err(e) => tracing::error!("Scheduled run failed: {}", e),
        }
    }
}
