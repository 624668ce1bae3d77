use crate::FetchError;
use std::collections::HashMap;

/// A single crawl invocation: start URL and number of layers to download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlRequest {
    /// The URL the crawl starts from
    pub url: String,

    /// Number of layers to download; 1 downloads only `url`
    pub depth: u32,
}

impl CrawlRequest {
    /// Creates a new crawl request
    pub fn new(url: impl Into<String>, depth: u32) -> Self {
        Self {
            url: url.into(),
            depth,
        }
    }
}

/// Outcome of a crawl
///
/// A URL is in `downloaded` exactly when it was discovered and never failed
/// to download. `downloaded` is sorted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrawlResult {
    /// URLs that were discovered and did not fail
    pub downloaded: Vec<String>,

    /// Download failures by URL
    pub errors: HashMap<String, FetchError>,
}

impl CrawlResult {
    /// Returns true if `url` is part of the downloaded set
    pub fn is_downloaded(&self, url: &str) -> bool {
        self.downloaded
            .binary_search_by(|entry| entry.as_str().cmp(url))
            .is_ok()
    }

    /// Returns the download failure recorded for `url`, if any
    pub fn error_for(&self, url: &str) -> Option<&FetchError> {
        self.errors.get(url)
    }

    /// Returns true if no URL failed
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}
