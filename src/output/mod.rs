//! Output module for crawl summaries and reports
//!
//! This module handles:
//! - Computing and printing crawl statistics
//! - Exporting crawl results as JSON

mod report;
pub mod stats;

pub use report::{write_json_report, CrawlReport, ErrorEntry};
pub use stats::{print_statistics, CrawlStatistics};
