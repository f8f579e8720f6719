//! URL handling module for Tidewalk
//!
//! This module provides URL validation, domain extraction, link normalization
//! and the same-domain filter applied to every discovered link.

mod domain;
mod filter;
mod normalize;

// Re-export main functions
pub use domain::{domain_of, extract_domain};
pub use filter::is_url_allowed;
pub use normalize::{normalize_link, normalize_root};

use url::Url;

/// Checks that a URL string carries both a scheme and a network location
///
/// Anything that fails to parse, or parses without a host (`mailto:`,
/// `file:///`, `data:`), is rejected.
///
/// # Examples
///
/// ```
/// use tidewalk::url::is_url_valid;
///
/// assert!(is_url_valid("https://example.com/docs"));
/// assert!(!is_url_valid("example.com/docs"));
/// assert!(!is_url_valid("mailto:someone@example.com"));
/// ```
pub fn is_url_valid(url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => !parsed.scheme().is_empty() && parsed.host_str().is_some_and(|h| !h.is_empty()),
        Err(_) => false,
    }
}
