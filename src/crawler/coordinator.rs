//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the layered breadth-first traversal:
//! - Seeding the visited set with the start URL
//! - Dispatching every URL of a layer to the download pool
//! - Handing downloaded pages to the extraction pool
//! - Waiting on the layer barrier before the next layer starts
//! - Building the final result from the visited set and error map

use crate::config::{validate_crawler_config, CrawlerConfig};
use crate::crawler::barrier::{LayerBarrier, Party};
use crate::crawler::extractor::ExtractionPool;
use crate::crawler::fetcher::Downloader;
use crate::crawler::pool::Job;
use crate::crawler::scheduler::DownloadDispatcher;
use crate::state::{CrawlRequest, CrawlResult, CrawlState, NextLayer};
use crate::CrawlError;
use futures::future::FutureExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Layered breadth-first web crawler
///
/// Owns a download pool (with per-host admission) and an extraction pool,
/// both sized at construction. One crawler can run any number of crawls,
/// sequentially or concurrently, until it is closed.
pub struct WebCrawler {
    downloader: Arc<dyn Downloader>,
    dispatcher: DownloadDispatcher,
    extractors: ExtractionPool,
    config: CrawlerConfig,
    closed: AtomicBool,
}

impl WebCrawler {
    /// Creates a crawler
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Arguments
    ///
    /// * `downloader` - Fetches pages
    /// * `config` - Pool sizes and per-host limit (`depth` is ignored here)
    ///
    /// # Returns
    ///
    /// * `Ok(WebCrawler)` - Pools are running
    /// * `Err(CrawlError::Config)` - A pool size or the per-host limit is zero
    pub fn new(
        downloader: Arc<dyn Downloader>,
        config: &CrawlerConfig,
    ) -> Result<Self, CrawlError> {
        validate_crawler_config(config)?;

        tracing::debug!(
            "Creating crawler: {} downloaders, {} extractors, {} per host",
            config.downloaders,
            config.extractors,
            config.per_host
        );

        Ok(Self {
            downloader,
            dispatcher: DownloadDispatcher::new(config.downloaders, config.per_host),
            extractors: ExtractionPool::new(config.extractors),
            config: config.clone(),
            closed: AtomicBool::new(false),
        })
    }

    /// Crawls from `url`, downloading `depth` layers
    ///
    /// Depth 1 downloads only `url`; depth 2 adds the pages it links to,
    /// and so on. Depth 0 downloads nothing; the result reports only `url`,
    /// which is visited as the seed.
    pub async fn download(&self, url: &str, depth: u32) -> Result<CrawlResult, CrawlError> {
        self.crawl(CrawlRequest::new(url, depth)).await
    }

    /// Runs a crawl
    ///
    /// Download failures are recorded per URL in the result and never abort
    /// the crawl. The only error is `CrawlError::Closed`, returned when the
    /// crawler is closed before or during the crawl.
    pub async fn crawl(&self, request: CrawlRequest) -> Result<CrawlResult, CrawlError> {
        if self.is_closed() {
            return Err(CrawlError::Closed);
        }

        let started = Instant::now();
        let state = Arc::new(CrawlState::seeded(&request.url));
        let mut layer = vec![request.url.clone()];
        let mut remaining = request.depth;
        let mut index = 0;

        tracing::info!("Starting crawl of {} (depth {})", request.url, request.depth);

        while remaining > 0 && !layer.is_empty() {
            index += 1;
            let layer_started = Instant::now();
            let size = layer.len();
            tracing::info!("Layer {}: {} URLs", index, size);

            layer = self.download_layer(layer, remaining > 1, &state).await;

            if self.is_closed() {
                tracing::warn!("Crawler closed during layer {}", index);
                return Err(CrawlError::Closed);
            }

            tracing::info!(
                "Layer {} done in {:.2?}: {} new URLs discovered, {} visited, {} errors",
                index,
                layer_started.elapsed(),
                layer.len(),
                state.visited_count(),
                state.error_count()
            );
            remaining -= 1;
        }

        let result = state.finish();
        tracing::info!(
            "Crawl of {} finished in {:.2?}: {} downloaded, {} errors",
            request.url,
            started.elapsed(),
            result.downloaded.len(),
            result.errors.len()
        );

        Ok(result)
    }

    /// Downloads one layer and returns the next
    ///
    /// Returns only after every download of the layer and every extraction
    /// those downloads spawned have finished.
    async fn download_layer(
        &self,
        layer: Vec<String>,
        extract: bool,
        state: &Arc<CrawlState>,
    ) -> Vec<String> {
        let barrier = LayerBarrier::new();
        let next = Arc::new(NextLayer::default());

        for url in layer {
            let job = self.download_job(url.clone(), extract, barrier.register(), state, &next);
            self.dispatcher.submit(&url, job);
        }

        barrier.arrive_and_wait().await;
        next.take()
    }

    /// Builds the download job for one URL
    ///
    /// The job holds the URL's barrier party; a successful download that
    /// needs extraction registers the extraction's party before releasing
    /// its own.
    fn download_job(
        &self,
        url: String,
        extract: bool,
        party: Party,
        state: &Arc<CrawlState>,
        next: &Arc<NextLayer>,
    ) -> Job {
        let downloader = Arc::clone(&self.downloader);
        let extractors = self.extractors.clone();
        let state = Arc::clone(state);
        let next = Arc::clone(next);

        async move {
            let outcome = downloader.download(&url).await;
            match outcome {
                Ok(page) => {
                    tracing::debug!("Downloaded {}", url);
                    if extract {
                        extractors.submit(page, party.register(), move |links| {
                            for link in links {
                                if state.visit(&link) {
                                    next.push(link);
                                }
                            }
                        });
                    }
                }
                Err(e) => {
                    tracing::warn!("Failed to download {}: {}", url, e);
                    state.record_error(url, e);
                }
            }
            drop(party);
        }
        .boxed()
    }

    /// Shuts down both pools
    ///
    /// Queued work is dropped and running work is abandoned; a crawl in
    /// progress returns `CrawlError::Closed`. Calling this more than once
    /// has no further effect.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        self.extractors.shutdown();
        self.dispatcher.shutdown();
        tracing::debug!("Crawler closed");
    }

    /// Returns true once `close` was called
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// The pool configuration this crawler was built with
    pub fn config(&self) -> &CrawlerConfig {
        &self.config
    }
}

impl Drop for WebCrawler {
    fn drop(&mut self) {
        self.close();
    }
}
