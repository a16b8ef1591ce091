//! Configuration module for Catalog-Sentinel
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! The resulting [`Config`] is passed explicitly into the fetcher and the run
//! coordinator; there is no process-wide settings object.
//!
//! # Example
//!
//! ```no_run
//! use catalog_sentinel::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.toml")).unwrap();
//! println!("Crawling {}", config.site.base_url);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlConfig, FetcherConfig, OutputConfig, RetryConfig, ScheduleConfig, SiteConfig,
    UserAgentConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::{parse_daily_at, validate};
