//! Index URL handling
//!
//! This module validates the index URL a run starts from and provides the
//! host label used in log lines.

use crate::HarvestError;
use url::Url;

/// Parses and validates the index URL of a run
///
/// Surrounding whitespace is ignored and any fragment is dropped. Only
/// `http` and `https` URLs with a host are accepted.
///
/// # Examples
///
/// ```
/// use catalog_harvest::url::parse_index_url;
///
/// let url = parse_index_url(" https://example.com/book/12/#top ").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/book/12/");
///
/// assert!(parse_index_url("ftp://example.com/").is_err());
/// ```
pub fn parse_index_url(input: &str) -> Result<Url, HarvestError> {
    let invalid = |message: String| HarvestError::InvalidIndexUrl {
        url: input.to_string(),
        message,
    };

    let mut url = Url::parse(input.trim()).map_err(|e| invalid(e.to_string()))?;

    match url.scheme() {
        "http" | "https" => {}
        other => return Err(invalid(format!("unsupported scheme '{}'", other))),
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid("missing host".to_string()));
    }

    url.set_fragment(None);
    Ok(url)
}

/// Extracts the lowercase host of a URL
///
/// Returns `None` if the URL has no host.
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}
