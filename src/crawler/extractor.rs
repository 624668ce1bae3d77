//! Link extraction pool
//!
//! Extraction runs on its own worker pool, separate from downloads, so a
//! burst of parsing can neither starve nor be starved by network work.

use crate::crawler::barrier::Party;
use crate::crawler::parser::Page;
use crate::crawler::pool::WorkerPool;
use futures::future::FutureExt;
use std::sync::Arc;

/// Fixed-size pool running link extraction on downloaded pages
#[derive(Clone)]
pub struct ExtractionPool {
    pool: Arc<WorkerPool>,
}

impl ExtractionPool {
    /// Creates a pool with `size` extraction workers
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(size: usize) -> Self {
        Self {
            pool: Arc::new(WorkerPool::new("extract", size)),
        }
    }

    /// Queues link extraction for `page`
    ///
    /// `on_links` receives the extracted links. A page that fails to parse
    /// (or whose extractor panics) yields no links; the failure is only
    /// logged. `party` is released once `on_links` has returned, or when the
    /// job is dropped because the pool was shut down.
    pub fn submit<F>(&self, page: Box<dyn Page>, party: Party, on_links: F)
    where
        F: FnOnce(Vec<String>) + Send + 'static,
    {
        let job = async move {
            let _party = party;
            let url = page.url().to_string();

            // parsing is CPU bound, keep it off the runtime threads
            let links = match tokio::task::spawn_blocking(move || page.extract_links()).await {
                Ok(Ok(links)) => links,
                Ok(Err(e)) => {
                    tracing::debug!("No links extracted from {}: {}", url, e);
                    Vec::new()
                }
                Err(e) => {
                    tracing::debug!("Link extraction for {} did not finish: {}", url, e);
                    Vec::new()
                }
            };

            tracing::trace!("Extracted {} links from {}", links.len(), url);
            on_links(links);
        }
        .boxed();

        if self.pool.execute(job).is_err() {
            tracing::debug!("Extraction pool is shut down, dropping extraction");
        }
    }

    /// Stops the pool; queued extractions are dropped
    pub fn shutdown(&self) {
        self.pool.shutdown();
    }

    /// Returns true once the pool was shut down
    pub fn is_shut_down(&self) -> bool {
        self.pool.is_shut_down()
    }

    /// Number of extraction workers
    pub fn size(&self) -> usize {
        self.pool.size()
    }
}
