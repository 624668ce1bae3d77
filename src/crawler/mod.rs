//! Crawler module for layered page fetching and link extraction
//!
//! This module contains the core crawling logic, including:
//! - Fixed-size worker pools for downloads and extractions
//! - Per-host admission on top of the download pool
//! - The layer barrier separating breadth-first layers
//! - Default HTTP downloaders and HTML link extraction
//! - Overall crawl coordination

mod barrier;
mod coordinator;
mod extractor;
mod fetcher;
mod parser;
mod pool;
mod scheduler;

pub use barrier::{LayerBarrier, Party};
pub use coordinator::WebCrawler;
pub use extractor::ExtractionPool;
pub use fetcher::{build_http_client, CachingDownloader, Downloader, HttpDownloader};
pub use parser::{parse_links, HtmlPage, Page};
pub use pool::{Job, WorkerPool, MAX_WORKERS};
pub use scheduler::DownloadDispatcher;
