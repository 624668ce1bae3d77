//! State module for tracking crawl progress
//!
//! This module provides the shared state mutated while a crawl runs.
//!
//! # Components
//!
//! - `HostState`: per-host running counter and pending FIFO for the download limit
//! - `CrawlState`: visited set and error map shared by every worker of one crawl
//! - `NextLayer`: URLs discovered while the current layer is processed
//! - `CrawlRequest` / `CrawlResult`: the input and output of one crawl

mod crawl_state;
mod host_state;
mod result;

// Re-export main types
pub use crawl_state::{CrawlState, NextLayer};
pub use host_state::HostState;
pub use result::{CrawlRequest, CrawlResult};
