//! Crawl counters

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters updated by the workers while a crawl runs
#[derive(Debug, Default)]
pub struct CrawlStats {
    items_processed: AtomicU64,
    pages_parsed: AtomicU64,
    outcomes_reported: AtomicU64,
    sink_failures: AtomicU64,
    fetch_attempts: AtomicU64,
    urls_abandoned: AtomicU64,
    redirects_followed: AtomicU64,
    links_enqueued: AtomicU64,
    depth_limit_drops: AtomicU64,
    unexpected_errors: AtomicU64,
}

/// Point-in-time copy of [`CrawlStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub items_processed: u64,
    pub pages_parsed: u64,
    pub outcomes_reported: u64,
    pub sink_failures: u64,
    pub fetch_attempts: u64,
    pub urls_abandoned: u64,
    pub redirects_followed: u64,
    pub links_enqueued: u64,
    pub depth_limit_drops: u64,
    pub unexpected_errors: u64,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

impl CrawlStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn item_processed(&self) {
        bump(&self.items_processed);
    }

    pub fn page_parsed(&self) {
        bump(&self.pages_parsed);
    }

    pub fn outcome_reported(&self) {
        bump(&self.outcomes_reported);
    }

    pub fn sink_failed(&self) {
        bump(&self.sink_failures);
    }

    pub fn fetch_attempted(&self) {
        bump(&self.fetch_attempts);
    }

    pub fn url_abandoned(&self) {
        bump(&self.urls_abandoned);
    }

    pub fn redirect_followed(&self) {
        bump(&self.redirects_followed);
    }

    pub fn link_enqueued(&self) {
        bump(&self.links_enqueued);
    }

    pub fn depth_limit_dropped(&self) {
        bump(&self.depth_limit_drops);
    }

    pub fn unexpected_error(&self) {
        bump(&self.unexpected_errors);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        StatsSnapshot {
            items_processed: load(&self.items_processed),
            pages_parsed: load(&self.pages_parsed),
            outcomes_reported: load(&self.outcomes_reported),
            sink_failures: load(&self.sink_failures),
            fetch_attempts: load(&self.fetch_attempts),
            urls_abandoned: load(&self.urls_abandoned),
            redirects_followed: load(&self.redirects_followed),
            links_enqueued: load(&self.links_enqueued),
            depth_limit_drops: load(&self.depth_limit_drops),
            unexpected_errors: load(&self.unexpected_errors),
        }
    }
}
