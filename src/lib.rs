//! Catalog-Sentinel: a catalog crawler with field-level change history
//!
//! This crate crawls a paginated catalog site, parses every detail page into a
//! canonical [`Record`], and compares each run against the store to produce an
//! append-only log of additions and field-level updates.

pub mod config;
pub mod crawler;
pub mod detect;
pub mod output;
pub mod record;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for Catalog-Sentinel operations
#[derive(Debug, Error)]
pub enum SentinelError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Discovery failed for {url}: {message}")]
    Discovery { url: String, message: String },

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Invalid run stage transition: {from} -> {to}")]
    InvalidTransition {
        from: state::RunStage,
        to: state::RunStage,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Catalog-Sentinel operations
pub type Result<T> = std::result::Result<T, SentinelError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use record::{ChangeEntry, ChangeKind, Record, RunSummary};
pub use state::RunStage;
