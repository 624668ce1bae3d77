//! Downloaders
//!
//! This module handles fetching pages for the crawler, including:
//! - The `Downloader` abstraction the crawler is generic over
//! - Building HTTP clients with the configured user agent and timeouts
//! - GET requests and error classification
//! - An on-disk page cache keyed by URL hash

use crate::config::HttpConfig;
use crate::crawler::parser::{HtmlPage, Page};
use crate::FetchError;
use futures::future::{BoxFuture, FutureExt};
use reqwest::{redirect::Policy, Client};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Fetches pages for the crawler
///
/// Implementations must be shareable across the download workers. Every
/// failure is reported as a `FetchError` for that URL only.
pub trait Downloader: Send + Sync {
    /// Downloads `url`
    fn download<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Box<dyn Page>, FetchError>>;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The HTTP configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use layer_crawl::config::HttpConfig;
/// use layer_crawl::crawler::build_http_client;
///
/// let client = build_http_client(&HttpConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &HttpConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .redirect(Policy::limited(config.max_redirects))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Downloads pages over HTTP(S)
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    client: Client,
}

impl HttpDownloader {
    /// Creates a downloader with a client built from `config`
    ///
    /// # Returns
    ///
    /// * `Ok(HttpDownloader)` - Client built
    /// * `Err(CrawlError::Client)` - The client could not be built
    pub fn new(config: &HttpConfig) -> crate::Result<Self> {
        Ok(Self {
            client: build_http_client(config)?,
        })
    }

    /// Creates a downloader around an existing client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Fetches a URL
    ///
    /// # Error Mapping
    ///
    /// | Condition | Result |
    /// |-----------|--------|
    /// | Non-2xx status | `FetchError::Status` |
    /// | Timeout | `FetchError::Timeout` |
    /// | Connection refused, DNS, TLS | `FetchError::Connect` |
    /// | Anything else (bad URL, body read) | `FetchError::Network` |
    ///
    /// Redirects are followed up to the configured limit. No retries.
    pub async fn fetch(&self, url: &str) -> Result<HtmlPage, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| classify_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let body = response
            .text()
            .await
            .map_err(|e| classify_error(url, e))?;

        tracing::trace!("Fetched {} ({} bytes, {})", url, body.len(), content_type);

        Ok(HtmlPage::new(url, final_url, content_type, body))
    }
}

impl Downloader for HttpDownloader {
    fn download<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Box<dyn Page>, FetchError>> {
        async move {
            let page = self.fetch(url).await?;
            Ok(Box::new(page) as Box<dyn Page>)
        }
        .boxed()
    }
}

/// Maps a reqwest error to the failure recorded for `url`
fn classify_error(url: &str, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else if error.is_connect() {
        FetchError::Connect {
            url: url.to_string(),
            message: error.to_string(),
        }
    } else {
        FetchError::Network {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}

/// Page as stored in the cache directory
#[derive(Debug, Serialize, Deserialize)]
struct CachedPage {
    url: String,
    final_url: String,
    content_type: String,
    body: String,
}

/// HTTP downloader that keeps every fetched page on disk
///
/// Each page is stored as JSON under `<dir>/<sha256(url)>.json`. A cached
/// URL is served from disk without a request. Failures are never cached.
#[derive(Debug, Clone)]
pub struct CachingDownloader {
    inner: HttpDownloader,
    dir: PathBuf,
}

impl CachingDownloader {
    /// Creates a caching downloader, creating `dir` if needed
    pub fn new(inner: HttpDownloader, dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { inner, dir })
    }

    /// The cache directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Cache file path for `url`
    pub fn cache_path(&self, url: &str) -> PathBuf {
        let digest = Sha256::digest(url.as_bytes());
        self.dir.join(format!("{}.json", hex::encode(digest)))
    }

    async fn load(&self, url: &str) -> Result<Option<HtmlPage>, FetchError> {
        let path = self.cache_path(url);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(FetchError::Cache {
                    url: url.to_string(),
                    message: format!("{}: {}", path.display(), e),
                })
            }
        };

        match serde_json::from_str::<CachedPage>(&raw) {
            Ok(cached) if cached.url == url => Ok(Some(HtmlPage::new(
                cached.url,
                cached.final_url,
                cached.content_type,
                cached.body,
            ))),
            Ok(_) => Ok(None),
            Err(e) => {
                tracing::warn!("Ignoring corrupt cache entry {}: {}", path.display(), e);
                Ok(None)
            }
        }
    }

    async fn store(&self, url: &str, page: &HtmlPage) {
        let path = self.cache_path(url);
        let cached = CachedPage {
            url: url.to_string(),
            final_url: page.base_url().to_string(),
            content_type: page.content_type().to_string(),
            body: page.body().to_string(),
        };

        let result = match serde_json::to_string(&cached) {
            Ok(json) => tokio::fs::write(&path, json).await.map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };

        if let Err(e) = result {
            tracing::warn!("Failed to cache {} at {}: {}", url, path.display(), e);
        }
    }
}

impl Downloader for CachingDownloader {
    fn download<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Box<dyn Page>, FetchError>> {
        async move {
            if let Some(page) = self.load(url).await? {
                tracing::trace!("Serving {} from cache", url);
                return Ok(Box::new(page) as Box<dyn Page>);
            }

            let page = self.inner.fetch(url).await?;
            self.store(url, &page).await;
            Ok(Box::new(page) as Box<dyn Page>)
        }
        .boxed()
    }
}
