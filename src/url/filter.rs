use crate::url::extract_domain;
use regex::Regex;
use url::Url;

/// Decides whether a normalized link belongs to the crawl
///
/// A link is kept only if:
/// 1. it does not match the optional exclusion pattern,
/// 2. its scheme is `http` or `https`,
/// 3. its lower-cased host (port stripped) equals `domain` exactly.
///
/// Subdomains are different hosts and are rejected.
pub fn is_url_allowed(url: &Url, domain: &str, exclude: Option<&Regex>) -> bool {
    if let Some(pattern) = exclude {
        if pattern.is_match(url.as_str()) {
            return false;
        }
    }

    if url.scheme() != "http" && url.scheme() != "https" {
        return false;
    }

    extract_domain(url).as_deref() == Some(domain)
}
