//! Crawler coordinator - main crawl orchestration logic
//!
//! The [`Crawler`] owns everything one crawl session needs:
//! - The root URL and the domain derived from it
//! - The work queue and the set of URLs ever admitted to it
//! - The rate limiter shared by all fetches
//! - A pool of workers that fetch, parse, report and enqueue children
//!
//! A session ends when every admitted URL has been processed, or when the
//! caller shuts the crawler down.

use crate::config::{
    compile_exclude_pattern, validate_crawler_config, validate_session_config, Config,
    CrawlerConfig, SessionConfig,
};
use crate::crawler::fetcher::{
    fetch_with_retries, FetchedResponse, HttpFetcher, PageFetcher, RetryOutcome,
};
use crate::crawler::parser::{is_parsable, is_redirect, PageParser, ParserPool};
use crate::crawler::queue::{claim, MemoryQueue, WorkItem, WorkQueue};
use crate::crawler::{CrawlStats, RateLimiter, StatsSnapshot};
use crate::output::{FetchOutcome, ResultSink};
use crate::url::normalize_root;
use crate::{ConfigError, CrawlError, Result};
use futures::FutureExt;
use std::any::Any;
use std::collections::HashSet;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;
use url::Url;

/// Every URL ever admitted to the queue during one crawl
///
/// Grows monotonically. The membership check, the insert and the queue put
/// happen under one lock so two workers can never both admit the same URL.
#[derive(Debug, Default)]
pub struct SeenSet {
    urls: Mutex<HashSet<String>>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        self.urls.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn contains(&self, url: &str) -> bool {
        self.lock().contains(url)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// What happened to a discovered URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Admission {
    Enqueued,
    AlreadySeen,
    DepthLimit,
}

/// State shared between the crawler handle and its workers
struct Session {
    root_url: String,
    domain: String,
    max_depth: u32,
    max_retries: u32,
    max_workers: u32,
    limiter: RateLimiter,
    queue: Arc<dyn WorkQueue>,
    fetcher: Arc<dyn PageFetcher>,
    parser: ParserPool,
    sink: Arc<dyn ResultSink>,
    seen: SeenSet,
    stats: CrawlStats,
}

impl Session {
    /// Admits `url` as a child of an item at `parent_depth`
    fn admit(&self, url: &str, parent_depth: u32) -> Admission {
        let mut seen = self.seen.lock();
        if seen.contains(url) {
            return Admission::AlreadySeen;
        }
        if parent_depth >= self.max_depth {
            return Admission::DepthLimit;
        }
        seen.insert(url.to_string());
        self.queue.put(WorkItem::new(url, parent_depth + 1));
        Admission::Enqueued
    }

    fn admit_root(&self) {
        let mut seen = self.seen.lock();
        if seen.insert(self.root_url.clone()) {
            self.queue.put(WorkItem::new(self.root_url.clone(), 0));
        }
    }

    async fn process(&self, item: &WorkItem) -> Result<()> {
        if !self.seen.contains(&item.url) {
            tracing::debug!("Skipping {} which was never admitted", item.url);
            return Ok(());
        }

        tracing::debug!("Fetching {} at depth {}", item.url, item.depth);
        let response = match fetch_with_retries(
            self.fetcher.as_ref(),
            &self.limiter,
            &self.stats,
            &item.url,
            self.max_retries,
        )
        .await?
        {
            RetryOutcome::Fetched(response) => response,
            RetryOutcome::Abandoned {
                attempts,
                last_error,
            } => {
                self.stats.url_abandoned();
                tracing::info!(
                    "Out of attempts ({}) to reach {}, last error: {}",
                    attempts,
                    item.url,
                    last_error
                );
                return Ok(());
            }
        };

        if is_redirect(response.status) {
            return self.follow_redirect(item, &response);
        }

        let outcome = self.handle_response(item, response).await?;
        self.report(&outcome).await;
        Ok(())
    }

    fn follow_redirect(&self, item: &WorkItem, response: &FetchedResponse) -> Result<()> {
        let location = response.location.as_deref().unwrap_or("");
        let target = Url::parse(&response.url)?.join(location)?;
        tracing::debug!(
            "Redirect from {} with location {:?}",
            response.url,
            location
        );

        match self.admit(target.as_str(), item.depth) {
            Admission::Enqueued => {
                self.stats.redirect_followed();
                self.stats.link_enqueued();
                tracing::info!("Redirect to {} from {}", target, response.url);
            }
            Admission::AlreadySeen => {
                tracing::debug!("Redirect target {} is already known", target);
            }
            Admission::DepthLimit => {
                self.stats.depth_limit_dropped();
                tracing::info!(
                    "Depth limit ({}) reached on redirect to {} from {}",
                    self.max_depth,
                    target,
                    response.url
                );
            }
        }
        Ok(())
    }

    async fn handle_response(&self, item: &WorkItem, response: FetchedResponse) -> Result<FetchOutcome> {
        let status = response.status;
        if status != 200 {
            return Ok(FetchOutcome::failed(
                &self.root_url,
                response.url,
                Some(status),
                format!("status is not 200 - {}", status),
            ));
        }

        if !is_parsable(response.content_type.as_deref()) {
            return Ok(FetchOutcome::failed(
                &self.root_url,
                response.url,
                Some(status),
                format!(
                    "content is not parsable, {:?}",
                    response.content_type.as_deref().unwrap_or("")
                ),
            ));
        }

        let base_url = Url::parse(&response.url)?;
        let html = response.body.unwrap_or_default();
        let page = self
            .parser
            .parse(html, base_url, self.domain.clone())
            .await?;
        self.stats.page_parsed();

        let mut dropped = 0;
        for link in &page.links {
            match self.admit(link, item.depth) {
                Admission::Enqueued => {
                    self.stats.link_enqueued();
                    tracing::debug!("Enqueued {} at depth {}", link, item.depth + 1);
                }
                Admission::AlreadySeen => {}
                Admission::DepthLimit => {
                    self.stats.depth_limit_dropped();
                    dropped += 1;
                }
            }
        }
        if dropped > 0 {
            tracing::info!(
                "Depth limit ({}) reached on {} new urls from {}",
                self.max_depth,
                dropped,
                response.url
            );
        }

        Ok(FetchOutcome::with_text(
            &self.root_url,
            response.url,
            Some(status),
            page.text,
        ))
    }

    async fn report(&self, outcome: &FetchOutcome) {
        match self.sink.report(outcome).await {
            Ok(()) => self.stats.outcome_reported(),
            Err(e) => {
                self.stats.sink_failed();
                tracing::warn!("Failed to report outcome for {}: {}", outcome.url, e);
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}

async fn worker_loop(session: Arc<Session>, worker_id: u32) {
    tracing::debug!("Worker {} started", worker_id);
    loop {
        let item = claim(session.queue.as_ref()).await;
        tracing::debug!("Worker {} got {}", worker_id, item.url);

        match AssertUnwindSafe(session.process(&item)).catch_unwind().await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                session.stats.unexpected_error();
                tracing::error!("Unexpected error while processing {}: {}", item.url, e);
            }
            Err(payload) => {
                session.stats.unexpected_error();
                tracing::error!(
                    "Panic while processing {}: {}",
                    item.url,
                    panic_message(&*payload)
                );
            }
        }
        session.stats.item_processed();
    }
}

/// Bounded-concurrency, depth-limited crawler for a single domain
pub struct Crawler {
    session: Arc<Session>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    started: AtomicBool,
    sink_ready: AtomicBool,
    exhausted: AtomicBool,
    closed: AtomicBool,
}

impl Crawler {
    /// Creates a crawler using the HTTP fetcher and an in-memory queue
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the crawl-wide settings are out of
    /// range, the root URL is invalid, or no domain can be derived from it.
    pub fn new(
        crawler: CrawlerConfig,
        session: SessionConfig,
        sink: Arc<dyn ResultSink>,
    ) -> Result<Self> {
        validate_crawler_config(&crawler)?;
        let fetcher = HttpFetcher::new(&crawler)?;
        Self::with_parts(
            crawler,
            session,
            Arc::new(MemoryQueue::new()),
            Arc::new(fetcher),
            sink,
        )
    }

    /// Creates a crawler from explicit collaborators
    pub fn with_parts(
        crawler: CrawlerConfig,
        session: SessionConfig,
        queue: Arc<dyn WorkQueue>,
        fetcher: Arc<dyn PageFetcher>,
        sink: Arc<dyn ResultSink>,
    ) -> Result<Self> {
        validate_crawler_config(&crawler)?;
        let domain = validate_session_config(&session)?;
        let root = normalize_root(&session.root_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", session.root_url, e)))?;
        let exclude = compile_exclude_pattern(session.exclude_pattern.as_deref())?;

        let session = Session {
            root_url: root.to_string(),
            domain,
            max_depth: session.max_depth,
            max_retries: crawler.max_retries,
            max_workers: crawler.max_workers,
            limiter: RateLimiter::per_second(crawler.max_rps),
            queue,
            fetcher,
            parser: ParserPool::new(PageParser::new(exclude), crawler.max_parsing_workers),
            sink,
            seen: SeenSet::new(),
            stats: CrawlStats::new(),
        };

        Ok(Self {
            session: Arc::new(session),
            workers: Mutex::new(Vec::new()),
            started: AtomicBool::new(false),
            sink_ready: AtomicBool::new(false),
            exhausted: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        })
    }

    pub fn root_url(&self) -> &str {
        &self.session.root_url
    }

    pub fn domain(&self) -> &str {
        &self.session.domain
    }

    pub fn max_depth(&self) -> u32 {
        self.session.max_depth
    }

    /// Number of URLs admitted so far, root included
    pub fn seen_count(&self) -> usize {
        self.session.seen.len()
    }

    pub fn has_seen(&self, url: &str) -> bool {
        self.session.seen.contains(url)
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.session.stats.snapshot()
    }

    /// Initializes the sink, seeds the queue with the root URL and spawns
    /// the workers
    ///
    /// Must be called from within a tokio runtime.
    pub async fn start(&self) -> Result<()> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(CrawlError::AlreadyStarted);
        }

        self.session.sink.init().await?;
        self.sink_ready.store(true, Ordering::SeqCst);

        tracing::info!(
            "Crawling {} (domain {}, max depth {}, {} workers)",
            self.session.root_url,
            self.session.domain,
            self.session.max_depth,
            self.session.max_workers
        );
        self.session.admit_root();

        let mut workers = self.workers.lock().unwrap_or_else(PoisonError::into_inner);
        for worker_id in 0..self.session.max_workers {
            workers.push(tokio::spawn(worker_loop(Arc::clone(&self.session), worker_id)));
        }
        Ok(())
    }

    /// Waits until every admitted URL has been processed, then stops the workers
    pub async fn wait(&self) {
        self.session.queue.join().await;
        self.exhausted.store(true, Ordering::SeqCst);
        tracing::info!("Frontier exhausted, {} urls seen", self.seen_count());
        self.stop_workers().await;
    }

    async fn stop_workers(&self) {
        let workers = {
            let mut workers = self.workers.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut *workers)
        };
        for worker in &workers {
            worker.abort();
        }
        for worker in workers {
            // Cancellation is the expected outcome
            let _ = worker.await;
        }
    }

    /// Stops the workers and releases the fetcher, queue, parser pool and sink
    ///
    /// In-flight items are abandoned without a report. The sink is only closed
    /// if its `init` succeeded. Calling this more than once is a no-op.
    pub async fn shutdown(&self) -> Result<()> {
        self.stop_workers().await;
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let session = &self.session;
        let sink_ready = self.sink_ready.load(Ordering::SeqCst);
        if sink_ready && !self.exhausted.load(Ordering::SeqCst) {
            tracing::info!("Crawl of {} interrupted", session.root_url);
            session.sink.mark_interrupted();
        }

        session.fetcher.close().await;
        session.queue.purge();
        session.parser.close();
        if sink_ready {
            session.sink.close().await?;
        }

        tracing::info!("Crawler for {} shut down", session.root_url);
        Ok(())
    }

    /// Runs a whole crawl session: start, wait for the frontier to drain,
    /// shut down
    pub async fn run(&self) -> Result<StatsSnapshot> {
        self.run_until(std::future::pending()).await
    }

    /// Like [`Crawler::run`], but shuts down early once `stop` resolves
    ///
    /// An early stop leaves the sink marked as interrupted.
    pub async fn run_until<F>(&self, stop: F) -> Result<StatsSnapshot>
    where
        F: Future<Output = ()>,
    {
        if let Err(e) = self.start().await {
            if let Err(cleanup) = self.shutdown().await {
                tracing::warn!("Cleanup after failed start also failed: {}", cleanup);
            }
            return Err(e);
        }

        tokio::select! {
            biased;
            _ = stop => {
                tracing::warn!("Crawl of {} stopped early", self.session.root_url);
            }
            _ = self.wait() => {}
        }
        self.shutdown().await?;

        let stats = self.stats();
        tracing::info!(
            "Crawl finished: {} items, {} pages parsed, {} outcomes reported, {} abandoned",
            stats.items_processed,
            stats.pages_parsed,
            stats.outcomes_reported,
            stats.urls_abandoned
        );
        Ok(stats)
    }
}

impl Drop for Crawler {
    fn drop(&mut self) {
        let workers = self.workers.get_mut().unwrap_or_else(PoisonError::into_inner);
        for worker in workers.drain(..) {
            worker.abort();
        }
    }
}

/// Runs a blocking crawl described by `config`, reporting to `sink`
pub async fn crawl(config: &Config, sink: Arc<dyn ResultSink>) -> Result<StatsSnapshot> {
    let crawler = Crawler::new(config.crawler.clone(), config.session.clone(), sink)?;
    crawler.run().await
}
