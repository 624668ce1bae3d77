use crate::{UrlError, UrlResult};
use url::Url;

/// Extracts the host from a URL string
///
/// The URL is parsed with the `url` crate and its host is returned in
/// lowercase. This is the routing key used by the per-host download limit.
///
/// # Arguments
///
/// * `url` - The URL to extract the host from
///
/// # Returns
///
/// * `Ok(String)` - The lowercase host
/// * `Err(UrlError::Parse)` - The string is not a well-formed URL
/// * `Err(UrlError::MissingHost)` - The URL has no host (e.g. `mailto:`)
///
/// # Examples
///
/// ```
/// use layer_crawl::url::host_of;
///
/// assert_eq!(host_of("https://example.com/path").unwrap(), "example.com");
/// assert_eq!(host_of("https://EXAMPLE.COM/path").unwrap(), "example.com");
/// assert!(host_of("not a url").is_err());
/// ```
pub fn host_of(url: &str) -> UrlResult<String> {
    let parsed = Url::parse(url).map_err(|e| UrlError::Parse(format!("{}: {}", url, e)))?;
    parsed
        .host_str()
        .map(|h| h.to_lowercase())
        .ok_or_else(|| UrlError::MissingHost(url.to_string()))
}
