//! HTTP fetching for the crawler
//!
//! This module handles all network access:
//! - Building the shared HTTP client (user agent, timeout, no automatic redirects)
//! - Turning a response into a [`FetchedResponse`]
//! - Classifying failures as transient (retried) or fatal
//! - The bounded retry loop, gated by the crawl's [`RateLimiter`]

use crate::config::CrawlerConfig;
use crate::crawler::parser::is_parsable;
use crate::crawler::{CrawlStats, RateLimiter};
use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, LOCATION};
use reqwest::{redirect::Policy, Client};
use std::sync::RwLock;
use thiserror::Error;

/// Errors raised by a single fetch attempt
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection failures, timeouts, interrupted bodies
    #[error("Transient error fetching {url}: {message}")]
    Transient { url: String, message: String },

    /// Failures that retrying cannot fix
    #[error("Cannot fetch {url}: {message}")]
    Fatal { url: String, message: String },
}

impl FetchError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    pub fn url(&self) -> &str {
        match self {
            Self::Transient { url, .. } | Self::Fatal { url, .. } => url,
        }
    }

    fn from_reqwest(url: &str, error: &reqwest::Error) -> Self {
        let message = error.to_string();
        if error.is_builder() || error.is_redirect() {
            Self::Fatal {
                url: url.to_string(),
                message,
            }
        } else {
            Self::Transient {
                url: url.to_string(),
                message,
            }
        }
    }
}

/// What came back from one GET request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedResponse {
    /// URL the response was served for
    pub url: String,

    pub status: u16,

    /// Lower-cased mime type without parameters
    pub content_type: Option<String>,

    /// Raw `Location` header
    pub location: Option<String>,

    /// Body text, only read for 200 responses with a parsable content type
    pub body: Option<String>,
}

/// Performs one GET request without following redirects
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn get(&self, url: &str) -> Result<FetchedResponse, FetchError>;

    /// Releases network resources; later calls to `get` fail
    async fn close(&self) {}
}

/// Builds the HTTP client shared by all workers
///
/// Redirects are never followed by the client; the crawler schedules
/// redirect targets as ordinary work items.
pub fn build_http_client(config: &CrawlerConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(config.timeout())
        .redirect(Policy::none())
        .gzip(true)
        .brotli(true)
        .build()
}

/// [`PageFetcher`] backed by reqwest
pub struct HttpFetcher {
    client: RwLock<Option<Client>>,
}

impl HttpFetcher {
    pub fn new(config: &CrawlerConfig) -> Result<Self, reqwest::Error> {
        Ok(Self::with_client(build_http_client(config)?))
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            client: RwLock::new(Some(client)),
        }
    }

    fn client(&self) -> Option<Client> {
        self.client.read().ok().and_then(|client| client.clone())
    }
}

/// Reduces a Content-Type header to its lower-cased mime essence
pub fn mime_essence(header: &str) -> String {
    header
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn get(&self, url: &str) -> Result<FetchedResponse, FetchError> {
        let Some(client) = self.client() else {
            return Err(FetchError::Fatal {
                url: url.to_string(),
                message: "HTTP client is closed".to_string(),
            });
        };

        let response = client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, &e))?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let header = |name: reqwest::header::HeaderName| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let content_type = header(CONTENT_TYPE).map(|ct| mime_essence(&ct));
        let location = header(LOCATION);

        let body = if status == 200 && is_parsable(content_type.as_deref()) {
            let text = response
                .text()
                .await
                .map_err(|e| FetchError::from_reqwest(url, &e))?;
            Some(text)
        } else {
            None
        };

        Ok(FetchedResponse {
            url: final_url,
            status,
            content_type,
            location,
            body,
        })
    }

    async fn close(&self) {
        if let Ok(mut client) = self.client.write() {
            client.take();
        }
    }
}

/// Result of the bounded retry loop
#[derive(Debug)]
pub enum RetryOutcome {
    Fetched(FetchedResponse),

    /// Every attempt failed with a transient error
    Abandoned { attempts: u32, last_error: FetchError },
}

/// Fetches `url`, retrying transient failures up to `max_retries` attempts
///
/// Every attempt waits for the rate limiter first. Fatal errors end the loop
/// immediately and are returned as `Err`.
pub async fn fetch_with_retries(
    fetcher: &dyn PageFetcher,
    limiter: &RateLimiter,
    stats: &CrawlStats,
    url: &str,
    max_retries: u32,
) -> Result<RetryOutcome, FetchError> {
    let max_attempts = max_retries.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        limiter.acquire().await;
        stats.fetch_attempted();

        match fetcher.get(url).await {
            Ok(response) => return Ok(RetryOutcome::Fetched(response)),
            Err(e) if e.is_transient() => {
                tracing::info!("Attempt {}/{} for {} failed: {}", attempt, max_attempts, url, e);
                if attempt >= max_attempts {
                    return Ok(RetryOutcome::Abandoned {
                        attempts: attempt,
                        last_error: e,
                    });
                }
            }
            Err(e) => return Err(e),
        }
    }
}
