use url::Url;

/// Extracts the domain from a URL
///
/// This function retrieves the host portion of a URL and converts it to lowercase.
/// The port is never part of the result. If the URL has no host, it returns None.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use tidewalk::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM:8443/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str()
        .map(|h| h.to_lowercase())
        .filter(|h| !h.is_empty())
}

/// Parses a URL string and extracts its domain in one step
pub fn domain_of(url: &str) -> Option<String> {
    Url::parse(url).ok().as_ref().and_then(extract_domain)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_simple_domain() {
        let url = Url::parse("https://example.com/").unwrap();
        assert_eq!(extract_domain(&url), Some("example.com".to_string()));
    }

    #[test]
    fn test_extract_subdomain_is_kept() {
        let url = Url::parse("https://docs.example.com/post").unwrap();
        assert_eq!(extract_domain(&url), Some("docs.example.com".to_string()));
    }

    #[test]
    fn test_extract_strips_port() {
        let url = Url::parse("http://127.0.0.1:8080/").unwrap();
        assert_eq!(extract_domain(&url), Some("127.0.0.1".to_string()));
    }

    #[test]
    fn test_extract_mixed_case() {
        let url = Url::parse("https://Example.COM/").unwrap();
        assert_eq!(extract_domain(&url), Some("example.com".to_string()));
    }

    #[test]
    fn test_domain_of_unparsable() {
        assert_eq!(domain_of("not a url"), None);
        assert_eq!(domain_of("mailto:a@b.com"), None);
    }
}
