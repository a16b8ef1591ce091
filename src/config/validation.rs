use crate::config::types::{
    Config, FetcherConfig, OutputConfig, RetryConfig, ScheduleConfig, SiteConfig, UserAgentConfig,
};
use crate::ConfigError;
use chrono::NaiveTime;
use url::Url;

/// Report sinks the output module knows how to build
const KNOWN_REPORTS: &[&str] = &["json", "markdown"];

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_site_config(&config.site)?;
    validate_fetcher_config(&config.fetcher)?;
    validate_retry_config(&config.retry)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    validate_schedule_config(&config.schedule)?;
    Ok(())
}

/// Validates the catalog root URL
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url '{}' must use http or https",
            config.base_url
        )));
    }

    // Listing and detail paths are joined onto the root
    if !config.base_url.ends_with('/') {
        return Err(ConfigError::Validation(format!(
            "base_url must end with '/', got '{}'",
            config.base_url
        )));
    }

    Ok(())
}

/// Validates fetcher configuration
fn validate_fetcher_config(config: &FetcherConfig) -> Result<(), ConfigError> {
    if config.max_concurrent_requests < 1 || config.max_concurrent_requests > 100 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_requests must be between 1 and 100, got {}",
            config.max_concurrent_requests
        )));
    }

    if config.batch_size < 1 {
        return Err(ConfigError::Validation(format!(
            "batch_size must be >= 1, got {}",
            config.batch_size
        )));
    }

    if config.request_timeout_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "request_timeout_ms must be >= 100ms, got {}ms",
            config.request_timeout_ms
        )));
    }

    Ok(())
}

/// Validates retry configuration
fn validate_retry_config(config: &RetryConfig) -> Result<(), ConfigError> {
    if config.max_attempts < 1 || config.max_attempts > 10 {
        return Err(ConfigError::Validation(format!(
            "max_attempts must be between 1 and 10, got {}",
            config.max_attempts
        )));
    }

    if !(config.multiplier > 0.0) || !config.multiplier.is_finite() {
        return Err(ConfigError::Validation(format!(
            "multiplier must be a positive number, got {}",
            config.multiplier
        )));
    }

    if config.max_wait_ms < config.min_wait_ms {
        return Err(ConfigError::Validation(format!(
            "max_wait_ms ({}) must be >= min_wait_ms ({})",
            config.max_wait_ms, config.min_wait_ms
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    if let Some(contact_url) = &config.contact_url {
        Url::parse(contact_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if config.report_dir.is_empty() {
        return Err(ConfigError::Validation(
            "report_dir cannot be empty".to_string(),
        ));
    }

    for report in &config.reports {
        if !KNOWN_REPORTS.contains(&report.as_str()) {
            return Err(ConfigError::Validation(format!(
                "Unknown report '{}', expected one of: {}",
                report,
                KNOWN_REPORTS.join(", ")
            )));
        }
    }

    Ok(())
}

/// Validates the daily schedule
fn validate_schedule_config(config: &ScheduleConfig) -> Result<(), ConfigError> {
    parse_daily_at(&config.daily_at).map(|_| ())
}

/// Parses a `HH:MM` time of day
pub fn parse_daily_at(value: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").map_err(|_| {
        ConfigError::Validation(format!(
            "daily_at must be a time of day in HH:MM form, got '{}'",
            value
        ))
    })
}
