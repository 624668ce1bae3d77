//! JSON crawl report
//!
//! Serializes the result of one crawl for consumption by other tools.

use crate::state::{CrawlRequest, CrawlResult};
use crate::CrawlError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One failed URL in the report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEntry {
    pub url: String,

    /// Short failure kind, e.g. `timeout` or `status`
    pub kind: String,

    /// Human-readable failure message
    pub message: String,
}

/// Complete report of one crawl
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlReport {
    /// Start URL
    pub url: String,

    /// Requested depth
    pub depth: u32,

    /// Downloaded URLs, sorted
    pub downloaded: Vec<String>,

    /// Failed URLs, sorted by URL
    pub errors: Vec<ErrorEntry>,
}

impl CrawlReport {
    /// Builds the report for `request` from its result
    pub fn new(request: &CrawlRequest, result: &CrawlResult) -> Self {
        let mut errors: Vec<ErrorEntry> = result
            .errors
            .iter()
            .map(|(url, error)| ErrorEntry {
                url: url.clone(),
                kind: error.kind().to_string(),
                message: error.to_string(),
            })
            .collect();
        errors.sort_by(|a, b| a.url.cmp(&b.url));

        Self {
            url: request.url.clone(),
            depth: request.depth,
            downloaded: result.downloaded.clone(),
            errors,
        }
    }
}

/// Writes `report` to `path` as pretty-printed JSON
///
/// # Returns
///
/// * `Ok(())` - Report written
/// * `Err(CrawlError)` - Serialization or file write failed
pub fn write_json_report(report: &CrawlReport, path: &Path) -> Result<(), CrawlError> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json)?;
    tracing::info!("Wrote JSON report to {}", path.display());
    Ok(())
}
