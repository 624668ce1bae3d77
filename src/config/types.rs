use serde::Deserialize;
use std::path::PathBuf;

/// Main configuration structure for Layer-Crawl
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

/// Crawl depth and concurrency configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Number of layers to download (1 = only the start page)
    pub depth: u32,

    /// Size of the download worker pool
    pub downloaders: usize,

    /// Size of the link extraction worker pool
    pub extractors: usize,

    /// Maximum concurrent downloads to a single host
    #[serde(rename = "per-host")]
    pub per_host: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            depth: 1,
            downloaders: 16,
            extractors: 8,
            per_host: 4,
        }
    }
}

/// HTTP client configuration for the default downloader
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// User agent sent with every request
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Total request timeout (seconds)
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    /// Connection timeout (seconds)
    #[serde(rename = "connect-timeout-secs")]
    pub connect_timeout_secs: u64,

    /// Maximum number of redirects to follow
    #[serde(rename = "max-redirects")]
    pub max_redirects: usize,

    /// Directory for cached page bodies; no caching when unset
    #[serde(rename = "cache-dir")]
    pub cache_dir: Option<PathBuf>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("layer-crawl/{}", env!("CARGO_PKG_VERSION")),
            timeout_secs: 30,
            connect_timeout_secs: 10,
            max_redirects: 10,
            cache_dir: None,
        }
    }
}
