//! Layer-Crawl main entry point
//!
//! This is the command-line interface for the layered web crawler.

use anyhow::Context;
use clap::Parser;
use layer_crawl::config::{load_config, validate, Config};
use layer_crawl::crawler::{CachingDownloader, Downloader, HttpDownloader, WebCrawler};
use layer_crawl::output::{print_statistics, write_json_report, CrawlReport, CrawlStatistics};
use layer_crawl::state::CrawlRequest;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Layer-Crawl: a layered breadth-first web crawler
///
/// Downloads URL, then the pages it links to, layer by layer, up to DEPTH
/// layers. Downloads are bounded globally and per host.
#[derive(Parser, Debug)]
#[command(name = "layer-crawl")]
#[command(version)]
#[command(about = "A layered breadth-first web crawler", long_about = None)]
struct Cli {
    /// URL to start crawling from
    #[arg(value_name = "URL")]
    url: String,

    /// Number of layers to download (1 = only URL)
    #[arg(value_name = "DEPTH")]
    depth: Option<u32>,

    /// Size of the download pool
    #[arg(value_name = "DOWNLOADERS")]
    downloaders: Option<usize>,

    /// Size of the link extraction pool
    #[arg(value_name = "EXTRACTORS")]
    extractors: Option<usize>,

    /// Maximum concurrent downloads per host
    #[arg(value_name = "PER_HOST")]
    per_host: Option<usize>,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Cache downloaded pages in this directory
    #[arg(long, value_name = "DIR")]
    cache_dir: Option<PathBuf>,

    /// Write a JSON report of the crawl to this file
    #[arg(long, value_name = "FILE")]
    json: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = resolve_config(&cli)?;
    let downloader = build_downloader(&config)?;

    let crawler = WebCrawler::new(downloader, &config.crawler)?;
    let request = CrawlRequest::new(cli.url.clone(), config.crawler.depth);

    let result = crawler
        .crawl(request.clone())
        .await
        .with_context(|| format!("Crawl of {} failed", request.url))?;
    crawler.close();

    if !cli.quiet {
        print_statistics(&CrawlStatistics::from_result(&result));
    }

    if !result.is_clean() {
        tracing::warn!("{} URLs failed to download", result.errors.len());
    }

    if let Some(path) = &cli.json {
        let report = CrawlReport::new(&request, &result);
        write_json_report(&report, path)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("layer_crawl=info,warn"),
            1 => EnvFilter::new("layer_crawl=debug,info"),
            2 => EnvFilter::new("layer_crawl=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Loads the config file (if any) and applies command-line overrides
fn resolve_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_config(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?
        }
        None => Config::default(),
    };

    if let Some(depth) = cli.depth {
        config.crawler.depth = depth;
    }
    if let Some(downloaders) = cli.downloaders {
        config.crawler.downloaders = downloaders;
    }
    if let Some(extractors) = cli.extractors {
        config.crawler.extractors = extractors;
    }
    if let Some(per_host) = cli.per_host {
        config.crawler.per_host = per_host;
    }
    if let Some(dir) = &cli.cache_dir {
        config.http.cache_dir = Some(dir.clone());
    }

    validate(&config).context("Invalid crawl settings")?;

    tracing::debug!(
        "Depth {}, {} downloaders, {} extractors, {} per host",
        config.crawler.depth,
        config.crawler.downloaders,
        config.crawler.extractors,
        config.crawler.per_host
    );

    Ok(config)
}

/// Builds the HTTP downloader, wrapped in the page cache when configured
fn build_downloader(config: &Config) -> anyhow::Result<Arc<dyn Downloader>> {
    let http = HttpDownloader::new(&config.http).context("Failed to build HTTP client")?;

    match &config.http.cache_dir {
        Some(dir) => {
            tracing::info!("Caching pages in {}", dir.display());
            let cached = CachingDownloader::new(http, dir.clone())
                .with_context(|| format!("Failed to create cache directory {}", dir.display()))?;
            Ok(Arc::new(cached))
        }
        None => Ok(Arc::new(http)),
    }
}
