//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with a bounded retry budget
//! - Crawl-wide rate limiting
//! - The work queue and its acknowledgement guard
//! - HTML parsing and link extraction
//! - Overall crawl coordination

mod coordinator;
mod fetcher;
mod parser;
mod queue;
mod rate_limiter;
mod stats;

pub use coordinator::{crawl, Crawler, SeenSet};
pub use fetcher::{
    build_http_client, fetch_with_retries, mime_essence, FetchError, FetchedResponse,
    HttpFetcher, PageFetcher, RetryOutcome,
};
pub use parser::{
    cleanup_text, is_parsable, is_redirect, PageParser, ParsedPage, ParserPool,
    PARSABLE_CONTENT_TYPES, REDIRECT_STATUSES,
};
pub use queue::{claim, ClaimedItem, MemoryQueue, WorkItem, WorkQueue};
pub use rate_limiter::RateLimiter;
pub use stats::{CrawlStats, StatsSnapshot};
