//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with proper user agent strings and timeouts
//! - Classifying each attempt as success, transient or permanent failure
//! - Retrying transient failures according to an injected [`RetryPolicy`]
//! - Fanning a batch of URLs out under a shared concurrency cap

use crate::config::{Config, FetcherConfig, UserAgentConfig};
use crate::crawler::retry::RetryPolicy;
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use url::Url;

/// Why a URL could not be fetched
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("server error: HTTP {0}")]
    ServerStatus(u16),

    #[error("client error: HTTP {0}")]
    ClientStatus(u16),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("failed to read body: {0}")]
    Body(String),

    #[error("{0}")]
    Other(String),
}

impl FetchError {
    /// Returns true for failures that may succeed on another attempt
    ///
    /// Timeouts, connection failures, interrupted bodies and 5xx responses
    /// are transient. Malformed URLs and 4xx responses are not.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Timeout | Self::Connect(_) | Self::ServerStatus(_) | Self::Body(_)
        )
    }

    fn from_reqwest(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout
        } else if error.is_connect() {
            Self::Connect(error.to_string())
        } else if error.is_builder() {
            Self::InvalidUrl(error.to_string())
        } else if error.is_body() || error.is_decode() {
            Self::Body(error.to_string())
        } else if error.is_request() {
            Self::Connect(error.to_string())
        } else {
            Self::Other(error.to_string())
        }
    }
}

/// Result of a single HTTP attempt
#[derive(Debug)]
pub enum AttemptOutcome {
    /// Page body
    Success(String),
    /// Worth retrying
    Transient(FetchError),
    /// Retrying would not help
    Permanent(FetchError),
}

impl AttemptOutcome {
    fn from_error(error: FetchError) -> Self {
        if error.is_transient() {
            Self::Transient(error)
        } else {
            Self::Permanent(error)
        }
    }
}

/// Result of fetching one URL in a batch
pub type BatchItem = (String, Result<String, FetchError>);

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `fetcher` - Timeout settings
/// * `user_agent` - The user agent configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(
    fetcher: &FetcherConfig,
    user_agent: &UserAgentConfig,
) -> Result<Client, reqwest::Error> {
    let timeout = Duration::from_millis(fetcher.request_timeout_ms);

    Client::builder()
        .user_agent(user_agent.header_value())
        .timeout(timeout)
        .connect_timeout(timeout)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Concurrent, retrying page fetcher
///
/// Clones share one client and one concurrency cap.
#[derive(Clone)]
pub struct Fetcher {
    client: Client,
    policy: RetryPolicy,
    semaphore: Arc<Semaphore>,
    max_concurrent: usize,
}

impl Fetcher {
    /// Creates a fetcher from the crawler configuration
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let client = build_http_client(&config.fetcher, &config.user_agent)?;
        Ok(Self::with_client(
            client,
            RetryPolicy::from_config(&config.retry),
            config.fetcher.max_concurrent_requests as usize,
        ))
    }

    /// Creates a fetcher around an existing client and policy
    pub fn with_client(client: Client, policy: RetryPolicy, max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            client,
            policy,
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Fetches a page body, retrying transient failures
    ///
    /// Holds one concurrency slot for the whole retry sequence, including
    /// the backoff sleeps.
    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| FetchError::Other(e.to_string()))?;

        let mut attempt = 1;
        loop {
            let outcome = self.attempt(url).await;

            if self.policy.should_retry(&outcome, attempt) {
                let delay = self.policy.delay_for(attempt);
                if let AttemptOutcome::Transient(ref error) = outcome {
                    tracing::warn!(
                        "Attempt {}/{} for {} failed: {}; retrying in {:?}",
                        attempt,
                        self.policy.max_attempts,
                        url,
                        error,
                        delay
                    );
                }
                tokio::time::sleep(delay).await;
                attempt += 1;
                continue;
            }

            return match outcome {
                AttemptOutcome::Success(body) => Ok(body),
                AttemptOutcome::Transient(error) => {
                    tracing::warn!(
                        "Giving up on {} after {} attempts: {}",
                        url,
                        attempt,
                        error
                    );
                    Err(error)
                }
                AttemptOutcome::Permanent(error) => {
                    tracing::warn!("Non-retryable error fetching {}: {}", url, error);
                    Err(error)
                }
            };
        }
    }

    /// Fetches every URL concurrently under the shared cap
    ///
    /// Returns once all URLs have resolved. Results arrive in completion
    /// order; each input URL appears exactly once.
    pub async fn fetch_batch(&self, urls: &[String]) -> Vec<BatchItem> {
        let mut tasks = JoinSet::new();

        for (index, url) in urls.iter().enumerate() {
            let fetcher = self.clone();
            let url = url.clone();
            tasks.spawn(async move {
                let result = fetcher.fetch(&url).await;
                (index, url, result)
            });
        }

        let mut resolved = vec![false; urls.len()];
        let mut results = Vec::with_capacity(urls.len());

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, url, result)) => {
                    resolved[index] = true;
                    results.push((url, result));
                }
                Err(e) => tracing::error!("Fetch task failed: {}", e),
            }
        }

        // A panicked task still owes its URL a result
        for (index, done) in resolved.iter().enumerate() {
            if !done {
                results.push((
                    urls[index].clone(),
                    Err(FetchError::Other("fetch task aborted".to_string())),
                ));
            }
        }

        results
    }

    /// Performs one GET and classifies the result
    async fn attempt(&self, url: &str) -> AttemptOutcome {
        if let Err(e) = Url::parse(url) {
            return AttemptOutcome::Permanent(FetchError::InvalidUrl(format!("{}: {}", url, e)));
        }

        tracing::debug!("GET {}", url);

        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => return AttemptOutcome::from_error(FetchError::from_reqwest(e)),
        };

        let status = response.status();
        if let Some(error) = classify_status(status) {
            return AttemptOutcome::from_error(error);
        }

        match response.text().await {
            Ok(body) => AttemptOutcome::Success(body),
            Err(e) => AttemptOutcome::from_error(FetchError::from_reqwest(e)),
        }
    }
}

/// Maps a non-success status to a fetch error
fn classify_status(status: StatusCode) -> Option<FetchError> {
    if status.is_server_error() {
        Some(FetchError::ServerStatus(status.as_u16()))
    } else if status.is_client_error() {
        Some(FetchError::ClientStatus(status.as_u16()))
    } else if status.is_success() {
        None
    } else {
        Some(FetchError::Other(format!("unexpected status {}", status)))
    }
}
