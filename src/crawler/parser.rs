//! Pages and link extraction
//!
//! This module handles:
//! - The `Page` abstraction returned by downloaders
//! - HTML link extraction for pages fetched over HTTP

use crate::ExtractError;
use scraper::{Html, Selector};
use url::Url;

/// A downloaded page
///
/// Extraction may be CPU heavy; the crawler calls it on a blocking thread.
pub trait Page: Send {
    /// The URL the page was downloaded from
    fn url(&self) -> &str;

    /// Returns the outbound links of the page
    fn extract_links(&self) -> Result<Vec<String>, ExtractError>;
}

/// An HTML page fetched by the HTTP downloader
#[derive(Debug, Clone)]
pub struct HtmlPage {
    /// URL the page was requested with
    url: String,

    /// Final URL after redirects, used to resolve relative links
    base_url: String,

    /// Content-Type header value (empty if absent)
    content_type: String,

    /// Page body
    body: String,
}

impl HtmlPage {
    /// Creates a page
    ///
    /// # Arguments
    ///
    /// * `url` - The requested URL
    /// * `base_url` - The final URL after redirects
    /// * `content_type` - The Content-Type header value
    /// * `body` - The page body
    pub fn new(
        url: impl Into<String>,
        base_url: impl Into<String>,
        content_type: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            base_url: base_url.into(),
            content_type: content_type.into(),
            body: body.into(),
        }
    }

    /// The final URL after redirects
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The page body
    pub fn body(&self) -> &str {
        &self.body
    }

    /// The Content-Type header value
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    fn is_html(&self) -> bool {
        // pages without a content type (e.g. served from cache) are treated as HTML
        self.content_type.is_empty() || self.content_type.contains("text/html")
    }
}

impl Page for HtmlPage {
    fn url(&self) -> &str {
        &self.url
    }

    fn extract_links(&self) -> Result<Vec<String>, ExtractError> {
        if !self.is_html() {
            return Err(ExtractError::NotHtml {
                url: self.url.clone(),
                content_type: self.content_type.clone(),
            });
        }

        let base_url = Url::parse(&self.base_url).map_err(|e| ExtractError::Parse {
            url: self.url.clone(),
            message: format!("invalid base URL {}: {}", self.base_url, e),
        })?;

        Ok(parse_links(&self.body, &base_url))
    }
}

/// Extracts all followable links from an HTML document
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` tags
/// - `<link rel="canonical" href="...">`
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` links
/// - Data URIs and fragment-only links
/// - Anything that does not resolve to an http(s) URL
///
/// Links are returned in document order, duplicates included.
///
/// # Example
///
/// ```
/// use layer_crawl::crawler::parse_links;
/// use url::Url;
///
/// let html = r#"<html><body><a href="/page">Link</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// assert_eq!(parse_links(html, &base_url), vec!["https://example.com/page"]);
/// ```
pub fn parse_links(html: &str, base_url: &Url) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut links = Vec::new();

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            if element.value().attr("download").is_some() {
                continue;
            }

            if let Some(absolute_url) = element
                .value()
                .attr("href")
                .and_then(|href| resolve_link(href, base_url))
            {
                links.push(absolute_url);
            }
        }
    }

    if let Ok(canonical_selector) = Selector::parse("link[rel='canonical'][href]") {
        for element in document.select(&canonical_selector) {
            if let Some(absolute_url) = element
                .value()
                .attr("href")
                .and_then(|href| resolve_link(href, base_url))
            {
                links.push(absolute_url);
            }
        }
    }

    links
}

/// Resolves a link href to an absolute http(s) URL
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    let absolute_url = base_url.join(href).ok()?;
    match absolute_url.scheme() {
        "http" | "https" => Some(absolute_url.to_string()),
        _ => None,
    }
}
