//! Statistics generation from a crawl result
//!
//! This module provides functionality for summarizing and displaying
//! the outcome of a crawl.

use crate::state::CrawlResult;
use crate::url::host_of;
use std::collections::HashMap;

/// Crawl statistics summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlStatistics {
    /// Number of pages downloaded successfully
    pub downloaded: usize,

    /// Number of URLs that failed to download
    pub failed: usize,

    /// Downloaded pages per host
    pub pages_by_host: HashMap<String, usize>,

    /// Failures per error kind (timeout, status, ...)
    pub errors_by_kind: HashMap<String, usize>,
}

impl CrawlStatistics {
    /// Summarizes a crawl result
    pub fn from_result(result: &CrawlResult) -> Self {
        let mut pages_by_host = HashMap::new();
        for url in &result.downloaded {
            if let Ok(host) = host_of(url) {
                *pages_by_host.entry(host).or_insert(0) += 1;
            }
        }

        let mut errors_by_kind = HashMap::new();
        for error in result.errors.values() {
            *errors_by_kind.entry(error.kind().to_string()).or_insert(0) += 1;
        }

        Self {
            downloaded: result.downloaded.len(),
            failed: result.errors.len(),
            pages_by_host,
            errors_by_kind,
        }
    }

    /// Number of URLs attempted
    pub fn total(&self) -> usize {
        self.downloaded + self.failed
    }

    /// Share of attempted URLs downloaded, in percent
    pub fn success_rate(&self) -> f64 {
        if self.total() > 0 {
            (self.downloaded as f64 / self.total() as f64) * 100.0
        } else {
            0.0
        }
    }
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  Pages downloaded: {}", stats.downloaded);
    println!("  Failed downloads: {}", stats.failed);
    println!("  Unique hosts: {}", stats.pages_by_host.len());
    println!();

    if !stats.pages_by_host.is_empty() {
        println!("Pages by Host:");
        // Sort hosts by count (descending), then by name
        let mut host_counts: Vec<_> = stats.pages_by_host.iter().collect();
        host_counts.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

        for (host, count) in host_counts {
            println!("  {}: {}", host, count);
        }
        println!();
    }

    if !stats.errors_by_kind.is_empty() {
        println!("Error Summary:");
        let mut error_counts: Vec<_> = stats.errors_by_kind.iter().collect();
        error_counts.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

        for (kind, count) in error_counts {
            println!("  {}: {}", kind, count);
        }
        println!();
    }

    println!(
        "Success Rate: {:.1}% ({} / {} pages successfully downloaded)",
        stats.success_rate(),
        stats.downloaded,
        stats.total()
    );
}
