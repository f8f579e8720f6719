use crate::{UrlError, UrlResult};
use url::Url;

/// Resolves an href against the page it was found on and strips the fragment
///
/// Relative references are joined onto `base` the same way a browser would.
/// Returns None when the href cannot be resolved into a URL at all.
///
/// # Examples
///
/// ```
/// use tidewalk::url::normalize_link;
/// use url::Url;
///
/// let base = Url::parse("https://example.com/docs/index.html").unwrap();
/// let link = normalize_link(&base, "../about#team").unwrap();
/// assert_eq!(link.as_str(), "https://example.com/about");
/// ```
pub fn normalize_link(base: &Url, href: &str) -> Option<Url> {
    let mut resolved = base.join(href.trim()).ok()?;
    resolved.set_fragment(None);
    Some(resolved)
}

/// Normalizes the root URL of a crawl session
///
/// The root goes through the same serialization as discovered links so that a
/// page linking back to the root is recognised as already seen.
pub fn normalize_root(root_url: &str) -> UrlResult<Url> {
    let mut url = Url::parse(root_url).map_err(|e| UrlError::Parse(e.to_string()))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingDomain);
    }
    url.set_fragment(None);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_url() -> Url {
        Url::parse("https://example.com/guide/page.html").unwrap()
    }

    #[test]
    fn test_absolute_link_unchanged() {
        let link = normalize_link(&base_url(), "https://other.com/x").unwrap();
        assert_eq!(link.as_str(), "https://other.com/x");
    }

    #[test]
    fn test_relative_path_resolved() {
        let link = normalize_link(&base_url(), "next.html").unwrap();
        assert_eq!(link.as_str(), "https://example.com/guide/next.html");
    }

    #[test]
    fn test_root_relative_resolved() {
        let link = normalize_link(&base_url(), "/index").unwrap();
        assert_eq!(link.as_str(), "https://example.com/index");
    }

    #[test]
    fn test_fragment_removed() {
        let link = normalize_link(&base_url(), "/index#top").unwrap();
        assert_eq!(link.as_str(), "https://example.com/index");
    }

    #[test]
    fn test_fragment_only_collapses_to_page() {
        let link = normalize_link(&base_url(), "#section").unwrap();
        assert_eq!(link, base_url());
    }

    #[test]
    fn test_query_kept() {
        let link = normalize_link(&base_url(), "/search?q=rust").unwrap();
        assert_eq!(link.as_str(), "https://example.com/search?q=rust");
    }

    #[test]
    fn test_normalize_root_adds_path() {
        let root = normalize_root("https://example.com").unwrap();
        assert_eq!(root.as_str(), "https://example.com/");
    }

    #[test]
    fn test_normalize_root_rejects_other_schemes() {
        assert!(matches!(
            normalize_root("ftp://example.com/"),
            Err(UrlError::InvalidScheme(_))
        ));
        assert!(matches!(normalize_root("nope"), Err(UrlError::Parse(_))));
    }
}
