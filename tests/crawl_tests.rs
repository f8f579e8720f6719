//! Integration tests for the crawler
//!
//! These tests run whole crawl sessions, either against wiremock servers or
//! against in-process fetchers that serve a fixed link graph.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tidewalk::config::{CrawlerConfig, OutputConfig, SessionConfig, SinkKind};
use tidewalk::crawler::{
    Crawler, FetchError, FetchedResponse, MemoryQueue, PageFetcher, WorkItem, WorkQueue,
};
use tidewalk::output::{build_sink, MemorySink};
use tidewalk::storage::{SessionStatus, SqliteStorage};
use tidewalk::CrawlError;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn crawler_config(max_workers: u32) -> CrawlerConfig {
    CrawlerConfig {
        max_workers,
        max_rps: 100,
        max_retries: 3,
        max_parsing_workers: 2,
        ..CrawlerConfig::default()
    }
}

fn html_page(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(
        format!("<html><body>\n{}\n</body></html>", body),
        "text/html; charset=utf-8",
    )
}

/// Mounts a two page site: / links to /b
async fn mount_two_page_site(server: &MockServer, expected_b_fetches: u64) {
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page("<p>Page A</p>\n<a href=\"/b\">to B</a>"))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(html_page("<p>Page B</p>"))
        .expect(expected_b_fetches)
        .mount(server)
        .await;
}

/// Queue that records every item put into it
#[derive(Default)]
struct RecordingQueue {
    inner: MemoryQueue,
    puts: Mutex<Vec<WorkItem>>,
}

impl RecordingQueue {
    fn puts(&self) -> Vec<WorkItem> {
        self.puts.lock().unwrap().clone()
    }
}

#[async_trait]
impl WorkQueue for RecordingQueue {
    fn put(&self, item: WorkItem) {
        self.puts.lock().unwrap().push(item.clone());
        self.inner.put(item);
    }

    async fn get(&self) -> WorkItem {
        self.inner.get().await
    }

    fn ack(&self) {
        self.inner.ack();
    }

    async fn join(&self) {
        self.inner.join().await;
    }

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn purge(&self) {
        self.inner.purge();
    }
}

/// Serves pages from an in-memory link graph
struct GraphFetcher {
    links: HashMap<String, Vec<String>>,
    fetches: Mutex<Vec<String>>,
}

impl GraphFetcher {
    fn new(links: HashMap<String, Vec<String>>) -> Self {
        Self {
            links,
            fetches: Mutex::new(Vec::new()),
        }
    }

    fn fetches(&self) -> Vec<String> {
        self.fetches.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for GraphFetcher {
    async fn get(&self, url: &str) -> Result<FetchedResponse, FetchError> {
        self.fetches.lock().unwrap().push(url.to_string());
        tokio::task::yield_now().await;

        let (status, body) = match self.links.get(url) {
            Some(links) => {
                let anchors: Vec<String> = links
                    .iter()
                    .map(|l| format!("<a href=\"{}\">{}</a>", l, l))
                    .collect();
                (200, format!("<p>{}</p>\n{}", url, anchors.join("\n")))
            }
            None => (404, String::new()),
        };
        Ok(FetchedResponse {
            url: url.to_string(),
            status,
            content_type: Some("text/html".to_string()),
            location: None,
            body: (status == 200).then_some(body),
        })
    }
}

/// Always fails with a transient error
#[derive(Default)]
struct UnreachableFetcher {
    attempts: AtomicU32,
}

#[async_trait]
impl PageFetcher for UnreachableFetcher {
    async fn get(&self, url: &str) -> Result<FetchedResponse, FetchError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(FetchError::Transient {
            url: url.to_string(),
            message: "connection refused".to_string(),
        })
    }
}

#[tokio::test]
async fn test_two_page_site_within_depth() {
    let server = MockServer::start().await;
    mount_two_page_site(&server, 1).await;
    let root = format!("{}/", server.uri());

    let sink = Arc::new(MemorySink::new());
    let crawler = Crawler::new(crawler_config(1), SessionConfig::new(&root, 1), sink.clone()).unwrap();
    crawler.run().await.unwrap();

    let outcomes = sink.outcomes();
    assert_eq!(outcomes.len(), 2);
    let urls: HashSet<&str> = outcomes.iter().map(|o| o.url.as_str()).collect();
    assert!(urls.contains(root.as_str()));
    assert!(urls.contains(format!("{}/b", server.uri()).as_str()));
    for outcome in &outcomes {
        assert_eq!(outcome.root_url, root);
        assert_eq!(outcome.status_code, Some(200));
        assert!(outcome.text().is_some_and(|t| !t.is_empty()));
        assert!(outcome.failure_reason().is_none());
    }
}

#[tokio::test]
async fn test_two_page_site_depth_zero() {
    let server = MockServer::start().await;
    mount_two_page_site(&server, 0).await;
    let root = format!("{}/", server.uri());

    let sink = Arc::new(MemorySink::new());
    let crawler = Crawler::new(crawler_config(1), SessionConfig::new(&root, 0), sink.clone()).unwrap();
    crawler.run().await.unwrap();

    let outcomes = sink.outcomes();
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].url, root);
    assert_eq!(outcomes[0].text(), Some("Page A\nto B"));
}

#[tokio::test]
async fn test_bad_content_type() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("<a href=\"/hidden\">hidden</a>", "application/octet-stream"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/hidden"))
        .respond_with(html_page("<p>hidden</p>"))
        .expect(0)
        .mount(&server)
        .await;
    let root = format!("{}/", server.uri());

    let sink = Arc::new(MemorySink::new());
    let crawler = Crawler::new(crawler_config(2), SessionConfig::new(&root, 3), sink.clone()).unwrap();
    let stats = crawler.run().await.unwrap();

    let outcomes = sink.outcomes();
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].status_code, Some(200));
    assert!(outcomes[0].text().is_none());
    assert_eq!(
        outcomes[0].failure_reason(),
        Some("content is not parsable, \"application/octet-stream\"")
    );
    assert_eq!(stats.links_enqueued, 0);
}

#[tokio::test]
async fn test_redirect_to_known_url_collapses() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page("<a href=\"/old\">old</a>\n<a href=\"/new\">new</a>"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "/new"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/new"))
        .respond_with(html_page("<p>new</p>"))
        .expect(1)
        .mount(&server)
        .await;
    let root = format!("{}/", server.uri());

    let sink = Arc::new(MemorySink::new());
    let crawler = Crawler::new(crawler_config(2), SessionConfig::new(&root, 5), sink.clone()).unwrap();
    let stats = crawler.run().await.unwrap();

    assert_eq!(stats.redirects_followed, 0);
    assert_eq!(sink.len(), 2);
    assert!(sink
        .outcomes()
        .iter()
        .all(|o| !o.url.ends_with("/old")));
}

#[tokio::test]
async fn test_redirect_to_new_url_followed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/landing"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/landing"))
        .respond_with(html_page("<p>landing</p>"))
        .expect(1)
        .mount(&server)
        .await;
    let root = format!("{}/", server.uri());

    let sink = Arc::new(MemorySink::new());
    let crawler = Crawler::new(crawler_config(1), SessionConfig::new(&root, 1), sink.clone()).unwrap();
    crawler.run().await.unwrap();

    let outcomes = sink.outcomes();
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].url, format!("{}/landing", server.uri()));
}

#[tokio::test]
async fn test_exclude_pattern_skips_links() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page("<a href=\"/logo.png\">logo</a>\n<a href=\"/about\">about</a>"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/about"))
        .respond_with(html_page("<p>about</p>"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/logo.png"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let root = format!("{}/", server.uri());

    let sink = Arc::new(MemorySink::new());
    let session = SessionConfig::new(&root, 2).with_exclude_pattern(r"\.png$");
    let crawler = Crawler::new(crawler_config(2), session, sink.clone()).unwrap();
    crawler.run().await.unwrap();

    assert_eq!(sink.len(), 2);
}

#[tokio::test]
async fn test_retry_budget_abandons_without_report() {
    let fetcher = Arc::new(UnreachableFetcher::default());
    let sink = Arc::new(MemorySink::new());
    let crawler = Crawler::with_parts(
        crawler_config(1),
        SessionConfig::new("http://unreachable.test/", 2),
        Arc::new(MemoryQueue::new()),
        fetcher.clone(),
        sink.clone(),
    )
    .unwrap();
    let stats = crawler.run().await.unwrap();

    assert_eq!(fetcher.attempts.load(Ordering::SeqCst), 3);
    assert!(sink.is_empty());
    assert_eq!(stats.urls_abandoned, 1);
}

#[tokio::test]
async fn test_each_url_enqueued_once() {
    // Every page links to every other page
    let pages: Vec<String> = (0..8)
        .map(|i| {
            if i == 0 {
                "http://graph.test/".to_string()
            } else {
                format!("http://graph.test/p{}", i)
            }
        })
        .collect();
    let links: HashMap<String, Vec<String>> = pages
        .iter()
        .map(|page| (page.clone(), pages.clone()))
        .collect();

    let fetcher = Arc::new(GraphFetcher::new(links));
    let queue = Arc::new(RecordingQueue::default());
    let sink = Arc::new(MemorySink::new());
    let crawler = Crawler::with_parts(
        crawler_config(4),
        SessionConfig::new("http://graph.test/", 5),
        queue.clone(),
        fetcher.clone(),
        sink.clone(),
    )
    .unwrap();
    crawler.run().await.unwrap();

    let puts = queue.puts();
    let distinct: HashSet<&str> = puts.iter().map(|item| item.url.as_str()).collect();
    assert_eq!(puts.len(), pages.len());
    assert_eq!(distinct.len(), pages.len());

    let fetches = fetcher.fetches();
    let distinct_fetches: HashSet<&String> = fetches.iter().collect();
    assert_eq!(fetches.len(), pages.len());
    assert_eq!(distinct_fetches.len(), pages.len());
    assert_eq!(sink.len(), pages.len());
}

#[tokio::test]
async fn test_depth_increases_by_one_and_respects_limit() {
    // A chain: / -> /1 -> /2 -> /3 -> /4
    let url = |i: u32| {
        if i == 0 {
            "http://chain.test/".to_string()
        } else {
            format!("http://chain.test/{}", i)
        }
    };
    let links: HashMap<String, Vec<String>> =
        (0..5).map(|i| (url(i), vec![url(i + 1)])).collect();

    let fetcher = Arc::new(GraphFetcher::new(links));
    let queue = Arc::new(RecordingQueue::default());
    let sink = Arc::new(MemorySink::new());
    let crawler = Crawler::with_parts(
        crawler_config(3),
        SessionConfig::new(url(0), 2),
        queue.clone(),
        fetcher.clone(),
        sink.clone(),
    )
    .unwrap();
    let stats = crawler.run().await.unwrap();

    let puts = queue.puts();
    assert_eq!(puts.len(), 3);
    for item in &puts {
        assert!(item.depth <= 2);
        assert_eq!(item.url, url(item.depth));
    }
    assert!(!fetcher.fetches().contains(&url(3)));
    assert_eq!(stats.depth_limit_drops, 1);
    assert_eq!(sink.len(), 3);
}

#[tokio::test]
async fn test_invalid_root_is_configuration_error() {
    let sink = Arc::new(MemorySink::new());
    for root in ["", "relative/path", "http://"] {
        let result = Crawler::new(
            crawler_config(1),
            SessionConfig::new(root, 1),
            sink.clone(),
        );
        assert!(
            matches!(result, Err(CrawlError::Config(_))),
            "root {:?} should be rejected",
            root
        );
    }
    assert!(!sink.is_initialized());
}

#[tokio::test]
async fn test_sqlite_sink_records_session() {
    let server = MockServer::start().await;
    mount_two_page_site(&server, 1).await;
    let root = format!("{}/", server.uri());

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("crawl.db");
    let output = OutputConfig {
        sink: SinkKind::Sqlite,
        database_path: Some(db_path.to_string_lossy().into_owned()),
        ..OutputConfig::default()
    };

    let sink = build_sink(&output, &root, "test-hash").unwrap();
    let crawler = Crawler::new(crawler_config(2), SessionConfig::new(&root, 1), sink).unwrap();
    crawler.run().await.unwrap();

    let storage = SqliteStorage::new(&db_path).unwrap();
    let session = storage.get_latest_session().unwrap().unwrap();
    assert_eq!(session.status, SessionStatus::Completed);
    assert_eq!(session.config_hash, "test-hash");
    assert_eq!(session.root_url, root);

    let counts = storage.outcome_counts(session.id).unwrap();
    assert_eq!(counts.total, 2);
    assert_eq!(counts.with_text, 2);
    assert_eq!(counts.failed, 0);
}
