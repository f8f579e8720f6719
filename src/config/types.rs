use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Tidewalk
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    pub session: SessionConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Crawl-wide behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Number of concurrent fetch workers
    #[serde(default = "default_max_workers")]
    pub max_workers: u32,

    /// Upper bound on fetch attempts per second for the whole crawl
    #[serde(default = "default_max_rps")]
    pub max_rps: u32,

    /// Fetch attempts per URL before it is abandoned
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Number of HTML documents parsed concurrently off the async workers
    #[serde(default = "default_max_parsing_workers")]
    pub max_parsing_workers: usize,

    /// Per-attempt HTTP timeout (seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl CrawlerConfig {
    /// Returns the per-attempt timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            max_rps: default_max_rps(),
            max_retries: default_max_retries(),
            max_parsing_workers: default_max_parsing_workers(),
            request_timeout: default_request_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

/// Per-session configuration: what to crawl and how deep
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SessionConfig {
    /// URL the crawl starts from; its host becomes the crawl domain
    pub root_url: String,

    /// Maximum hop count from the root (0 = root only)
    #[serde(default)]
    pub max_depth: u32,

    /// Optional regex; matching links are never enqueued
    #[serde(default)]
    pub exclude_pattern: Option<String>,
}

impl SessionConfig {
    /// Creates a session without an exclusion pattern
    pub fn new(root_url: impl Into<String>, max_depth: u32) -> Self {
        Self {
            root_url: root_url.into(),
            max_depth,
            exclude_pattern: None,
        }
    }

    /// Sets the exclusion pattern
    pub fn with_exclude_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.exclude_pattern = Some(pattern.into());
        self
    }
}

/// Which result sink the binary wires into the crawler
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    #[default]
    Stdout,
    Sqlite,
    Elasticsearch,
}

/// Output configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    #[serde(default)]
    pub sink: SinkKind,

    /// Path to the SQLite database file (sqlite sink only)
    #[serde(default)]
    pub database_path: Option<String>,

    #[serde(default)]
    pub elasticsearch: ElasticsearchConfig,
}

/// Search index connection settings
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ElasticsearchConfig {
    #[serde(default = "default_es_host")]
    pub host: String,

    #[serde(default = "default_es_port")]
    pub port: u16,

    #[serde(default = "default_es_index")]
    pub index: String,

    #[serde(default = "default_es_doc_type")]
    pub doc_type: String,
}

impl Default for ElasticsearchConfig {
    fn default() -> Self {
        Self {
            host: default_es_host(),
            port: default_es_port(),
            index: default_es_index(),
            doc_type: default_es_doc_type(),
        }
    }
}

fn default_max_workers() -> u32 {
    3
}

fn default_max_rps() -> u32 {
    3
}

fn default_max_retries() -> u32 {
    3
}

fn default_max_parsing_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

fn default_request_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("tidewalk/{}", env!("CARGO_PKG_VERSION"))
}

fn default_es_host() -> String {
    "localhost".to_string()
}

fn default_es_port() -> u16 {
    9200
}

fn default_es_index() -> String {
    "crawler_index_v1".to_string()
}

fn default_es_doc_type() -> String {
    "sites_crawling_v1".to_string()
}
