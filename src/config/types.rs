use serde::Deserialize;

/// Main configuration structure for Catalog-Sentinel
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub crawl: CrawlConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

impl Config {
    /// Builds a configuration with defaults for everything except the site
    /// root and the database location
    pub fn for_base_url(base_url: impl Into<String>, database_path: impl Into<String>) -> Self {
        Self {
            site: SiteConfig {
                base_url: base_url.into(),
            },
            fetcher: FetcherConfig::default(),
            retry: RetryConfig::default(),
            user_agent: UserAgentConfig::default(),
            crawl: CrawlConfig::default(),
            output: OutputConfig {
                database_path: database_path.into(),
                report_dir: default_report_dir(),
                reports: default_reports(),
            },
            schedule: ScheduleConfig::default(),
        }
    }
}

/// Target catalog site
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Root of the catalog; listing page 1 lives here and every relative
    /// link is resolved against it
    #[serde(rename = "base-url", default = "default_base_url")]
    pub base_url: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

/// Fetch concurrency and timeouts
#[derive(Debug, Clone, Deserialize)]
pub struct FetcherConfig {
    /// Maximum number of simultaneous in-flight requests
    #[serde(rename = "max-concurrent-requests", default = "default_max_concurrent")]
    pub max_concurrent_requests: u32,

    /// Number of URLs handed to the fetcher per chunk
    #[serde(rename = "batch-size", default = "default_batch_size")]
    pub batch_size: u32,

    /// Per-request timeout (milliseconds)
    #[serde(rename = "request-timeout-ms", default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: default_max_concurrent(),
            batch_size: default_batch_size(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

/// Retry policy for transient fetch failures
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per URL, including the first one
    #[serde(rename = "max-attempts", default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Exponential backoff multiplier
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,

    /// Lower bound on the wait between attempts (milliseconds)
    #[serde(rename = "min-wait-ms", default = "default_min_wait_ms")]
    pub min_wait_ms: u64,

    /// Upper bound on the wait between attempts (milliseconds)
    #[serde(rename = "max-wait-ms", default = "default_max_wait_ms")]
    pub max_wait_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            multiplier: default_multiplier(),
            min_wait_ms: default_min_wait_ms(),
            max_wait_ms: default_max_wait_ms(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name", default = "default_crawler_name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version", default = "default_crawler_version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url", default)]
    pub contact_url: Option<String>,
}

impl UserAgentConfig {
    /// Formats the User-Agent header value
    ///
    /// Format: `Name/Version` or `Name/Version (+ContactURL)`
    pub fn header_value(&self) -> String {
        match &self.contact_url {
            Some(url) => format!("{}/{} (+{})", self.crawler_name, self.crawler_version, url),
            None => format!("{}/{}", self.crawler_name, self.crawler_version),
        }
    }
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: default_crawler_name(),
            crawler_version: default_crawler_version(),
            contact_url: None,
        }
    }
}

/// Crawl-only path behavior
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlConfig {
    /// Skip URLs already in the store when running the crawl-only path
    #[serde(rename = "skip-existing", default = "default_true")]
    pub skip_existing: bool,

    /// Keep the raw page markup on each record
    #[serde(rename = "keep-raw-html", default = "default_true")]
    pub keep_raw_html: bool,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            skip_existing: true,
            keep_raw_html: true,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Directory that receives run reports
    #[serde(rename = "report-dir", default = "default_report_dir")]
    pub report_dir: String,

    /// Report sinks to publish to after each run
    #[serde(default = "default_reports")]
    pub reports: Vec<String>,
}

/// Daily run schedule
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    /// Local time of day (`HH:MM`) for the daily change-detection run
    #[serde(rename = "daily-at", default = "default_daily_at")]
    pub daily_at: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            daily_at: default_daily_at(),
        }
    }
}

fn default_base_url() -> String {
    "https://books.toscrape.com/".to_string()
}

fn default_max_concurrent() -> u32 {
    10
}

fn default_batch_size() -> u32 {
    50
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_max_attempts() -> u32 {
    3
}

fn default_multiplier() -> f64 {
    1.0
}

fn default_min_wait_ms() -> u64 {
    1_000
}

fn default_max_wait_ms() -> u64 {
    10_000
}

fn default_crawler_name() -> String {
    "CatalogSentinel".to_string()
}

fn default_crawler_version() -> String {
    "1.0".to_string()
}

fn default_true() -> bool {
    true
}

fn default_report_dir() -> String {
    "reports/output".to_string()
}

fn default_reports() -> Vec<String> {
    vec!["json".to_string(), "markdown".to_string()]
}

fn default_daily_at() -> String {
    "02:00".to_string()
}
