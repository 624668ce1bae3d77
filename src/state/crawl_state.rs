use crate::state::CrawlResult;
use crate::FetchError;
use dashmap::{DashMap, DashSet};
use std::sync::{Mutex, PoisonError};

/// Shared state of one crawl
///
/// The visited set is the deduplication gate: a URL joins the next layer
/// only if inserting it here succeeds. Both maps are sharded, so workers
/// recording different URLs rarely contend.
#[derive(Debug, Default)]
pub struct CrawlState {
    /// Every URL discovered so far
    visited: DashSet<String>,

    /// First download failure per URL
    errors: DashMap<String, FetchError>,
}

impl CrawlState {
    /// Creates state with `url` already marked as visited
    pub fn seeded(url: &str) -> Self {
        let state = Self::default();
        state.visited.insert(url.to_string());
        state
    }

    /// Marks `url` as visited
    ///
    /// Returns true only for the first caller to insert `url`.
    pub fn visit(&self, url: &str) -> bool {
        if self.visited.contains(url) {
            return false;
        }
        self.visited.insert(url.to_string())
    }

    /// Records a download failure; the first failure for a URL wins
    pub fn record_error(&self, url: String, error: FetchError) {
        self.errors.entry(url).or_insert(error);
    }

    /// Number of URLs discovered so far
    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    /// Number of URLs that failed to download
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Builds the crawl result: visited URLs minus failed ones
    pub fn finish(&self) -> CrawlResult {
        let errors: std::collections::HashMap<String, FetchError> = self
            .errors
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();

        let mut downloaded: Vec<String> = self
            .visited
            .iter()
            .map(|url| url.key().clone())
            .filter(|url| !errors.contains_key(url))
            .collect();
        downloaded.sort();

        CrawlResult { downloaded, errors }
    }
}

/// URLs collected for the next layer
#[derive(Debug, Default)]
pub struct NextLayer {
    urls: Mutex<Vec<String>>,
}

impl NextLayer {
    /// Appends a URL
    pub fn push(&self, url: String) {
        self.urls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(url);
    }

    /// Takes every collected URL, leaving the layer empty
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.urls.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Number of collected URLs
    pub fn len(&self) -> usize {
        self.urls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns true when nothing was collected
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
