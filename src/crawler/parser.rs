//! HTML parsing: visible text and same-domain links
//!
//! Parsing is CPU-bound, so the crawler hands documents to a [`ParserPool`]
//! which runs them on tokio's blocking threads instead of the workers that
//! wait on network I/O.

use crate::url::{is_url_allowed, normalize_link};
use crate::{CrawlError, Result};
use regex::Regex;
use scraper::node::Node;
use scraper::{Html, Selector};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::Semaphore;
use url::Url;

/// Content types the parser accepts
pub const PARSABLE_CONTENT_TYPES: [&str; 2] = ["text/html", "application/xml"];

/// Status codes treated as redirects
pub const REDIRECT_STATUSES: [u16; 5] = [300, 301, 302, 303, 307];

/// Elements whose text is never visible
const IGNORED_TEXT_ELEMENTS: [&str; 5] = ["style", "script", "head", "title", "meta"];

/// Returns true if `status` is one of the redirect statuses
pub fn is_redirect(status: u16) -> bool {
    REDIRECT_STATUSES.contains(&status)
}

/// Returns true if a response with this content type can be parsed
pub fn is_parsable(content_type: Option<&str>) -> bool {
    content_type.is_some_and(|ct| PARSABLE_CONTENT_TYPES.contains(&ct))
}

/// Text and links extracted from one page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedPage {
    /// Visible text, one chunk per line
    pub text: String,

    /// Absolute, fragment-free links on the crawl domain
    pub links: BTreeSet<String>,
}

/// Stateless page parser
#[derive(Debug, Clone, Default)]
pub struct PageParser {
    exclude: Option<Regex>,
}

impl PageParser {
    pub fn new(exclude: Option<Regex>) -> Self {
        Self { exclude }
    }

    /// Parses `html` fetched from `base_url`, keeping links on `domain`
    ///
    /// # Link Extraction Rules
    ///
    /// 1. Every `<a href>` is resolved against `base_url` and its fragment
    ///    removed; duplicates collapse
    /// 2. A link is kept only if it does not match the exclusion pattern,
    ///    its scheme is http or https, and its host equals `domain`
    ///
    /// # Text Extraction
    ///
    /// Text nodes directly inside style, script, head, title or meta elements
    /// are skipped, as are comments. Each line is trimmed, split on runs of
    /// two spaces, and the non-empty pieces are joined with newlines.
    pub fn parse(&self, html: &str, base_url: &Url, domain: &str) -> ParsedPage {
        let document = Html::parse_document(html);
        ParsedPage {
            text: extract_text(&document),
            links: self.extract_links(&document, base_url, domain),
        }
    }

    fn extract_links(&self, document: &Html, base_url: &Url, domain: &str) -> BTreeSet<String> {
        let mut links = BTreeSet::new();
        let Ok(selector) = Selector::parse("a[href]") else {
            return links;
        };

        for element in document.select(&selector) {
            let Some(href) = element.value().attr("href") else {
                continue;
            };
            if href.is_empty() {
                continue;
            }
            if let Some(link) = normalize_link(base_url, href) {
                if is_url_allowed(&link, domain, self.exclude.as_ref()) {
                    links.insert(link.to_string());
                }
            }
        }

        links
    }
}

fn extract_text(document: &Html) -> String {
    let mut raw = String::new();
    for node in document.tree.root().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let visible = node
            .parent()
            .and_then(|parent| parent.value().as_element().map(|e| e.name()))
            .is_some_and(|name| !IGNORED_TEXT_ELEMENTS.contains(&name));
        if visible {
            raw.push_str(text);
        }
    }
    cleanup_text(&raw)
}

/// Trims lines, splits them on double spaces, and drops empty pieces
pub fn cleanup_text(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .flat_map(|line| line.split("  "))
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Runs page parsing on blocking threads with bounded parallelism
pub struct ParserPool {
    parser: Arc<PageParser>,
    permits: Arc<Semaphore>,
    size: usize,
}

impl ParserPool {
    pub fn new(parser: PageParser, max_parsing_workers: usize) -> Self {
        let size = max_parsing_workers.max(1);
        Self {
            parser: Arc::new(parser),
            permits: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Parses a page off the async workers
    pub async fn parse(&self, html: String, base_url: Url, domain: String) -> Result<ParsedPage> {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| CrawlError::ParserClosed)?;
        let parser = Arc::clone(&self.parser);
        let url = base_url.to_string();

        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            parser.parse(&html, &base_url, &domain)
        })
        .await
        .map_err(|e| CrawlError::Parse {
            url,
            message: e.to_string(),
        })
    }

    /// Rejects further parse calls; parses already running finish
    pub fn close(&self) {
        self.permits.close();
    }

    pub fn is_closed(&self) -> bool {
        self.permits.is_closed()
    }
}
