//! Integration tests for the crawler
//!
//! These tests drive `WebCrawler` with an in-memory downloader that serves
//! a fixed link graph, counts every call and records the peak number of
//! concurrent downloads, globally and per host.

use futures::future::{BoxFuture, FutureExt};
use layer_crawl::config::CrawlerConfig;
use layer_crawl::crawler::{Downloader, Page, WebCrawler};
use layer_crawl::{host_of, CrawlError, ExtractError, FetchError};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

struct MockPage {
    url: String,
    links: Option<Vec<String>>,
    extractions: Arc<AtomicUsize>,
}

impl Page for MockPage {
    fn url(&self) -> &str {
        &self.url
    }

    fn extract_links(&self) -> Result<Vec<String>, ExtractError> {
        self.extractions.fetch_add(1, Ordering::SeqCst);
        self.links.clone().ok_or_else(|| ExtractError::Parse {
            url: self.url.clone(),
            message: "malformed page".to_string(),
        })
    }
}

/// Serves a fixed link graph; URLs outside the graph time out
#[derive(Default)]
struct MockDownloader {
    pages: HashMap<String, Option<Vec<String>>>,
    panicking: HashSet<String>,
    delay: Duration,
    calls: Mutex<HashMap<String, usize>>,
    active: AtomicUsize,
    peak: AtomicUsize,
    active_by_host: Mutex<HashMap<String, usize>>,
    peak_per_host: AtomicUsize,
    extractions: Arc<AtomicUsize>,
}

impl MockDownloader {
    fn new() -> Self {
        Self::default()
    }

    fn page(mut self, url: &str, links: &[&str]) -> Self {
        self.pages.insert(
            url.to_string(),
            Some(links.iter().map(|l| l.to_string()).collect()),
        );
        self
    }

    /// A page that downloads fine but cannot be parsed
    fn broken_page(mut self, url: &str) -> Self {
        self.pages.insert(url.to_string(), None);
        self
    }

    /// A URL whose download panics
    fn panicking_page(mut self, url: &str) -> Self {
        self.panicking.insert(url.to_string());
        self
    }

    fn delay(mut self, millis: u64) -> Self {
        self.delay = Duration::from_millis(millis);
        self
    }

    fn calls(&self, url: &str) -> usize {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn peak_per_host(&self) -> usize {
        self.peak_per_host.load(Ordering::SeqCst)
    }

    fn extractions(&self) -> usize {
        self.extractions.load(Ordering::SeqCst)
    }

    fn enter(&self, host: &str) {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let mut by_host = self.active_by_host.lock().unwrap();
        let count = by_host.entry(host.to_string()).or_insert(0);
        *count += 1;
        self.peak_per_host.fetch_max(*count, Ordering::SeqCst);
    }

    fn leave(&self, host: &str) {
        self.active.fetch_sub(1, Ordering::SeqCst);
        if let Some(count) = self.active_by_host.lock().unwrap().get_mut(host) {
            *count -= 1;
        }
    }
}

impl Downloader for MockDownloader {
    fn download<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Box<dyn Page>, FetchError>> {
        async move {
            *self
                .calls
                .lock()
                .unwrap()
                .entry(url.to_string())
                .or_insert(0) += 1;

            if self.panicking.contains(url) {
                panic!("downloader crashed on {}", url);
            }

            let host = host_of(url).expect("crawler must only dispatch routable URLs");
            self.enter(&host);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.leave(&host);

            match self.pages.get(url) {
                Some(links) => Ok(Box::new(MockPage {
                    url: url.to_string(),
                    links: links.clone(),
                    extractions: Arc::clone(&self.extractions),
                }) as Box<dyn Page>),
                None => Err(FetchError::Timeout {
                    url: url.to_string(),
                }),
            }
        }
        .boxed()
    }
}

fn config(downloaders: usize, extractors: usize, per_host: usize) -> CrawlerConfig {
    CrawlerConfig {
        depth: 1,
        downloaders,
        extractors,
        per_host,
    }
}

fn crawler(mock: &Arc<MockDownloader>, config: CrawlerConfig) -> WebCrawler {
    WebCrawler::new(mock.clone(), &config).expect("valid configuration")
}

#[tokio::test]
async fn test_two_layer_crawl() {
    let mock = Arc::new(
        MockDownloader::new()
            .page("https://a.test/", &["https://a.test/b", "https://c.test/"])
            .page("https://a.test/b", &[])
            .page("https://c.test/", &[]),
    );
    let crawler = crawler(&mock, config(4, 2, 2));

    let result = crawler.download("https://a.test/", 2).await.unwrap();

    assert_eq!(
        result.downloaded,
        vec!["https://a.test/", "https://a.test/b", "https://c.test/"]
    );
    assert!(result.errors.is_empty());
}

#[tokio::test]
async fn test_failed_start_url() {
    let mock = Arc::new(MockDownloader::new());
    let crawler = crawler(&mock, config(2, 2, 2));

    let result = crawler.download("https://x.test/", 1).await.unwrap();

    assert!(result.downloaded.is_empty());
    assert_eq!(result.errors.len(), 1);
    assert_eq!(
        result.error_for("https://x.test/"),
        Some(&FetchError::Timeout {
            url: "https://x.test/".to_string()
        })
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_shared_link_downloaded_once() {
    let mock = Arc::new(
        MockDownloader::new()
            .page("https://a.test/", &["https://b.test/", "https://c.test/"])
            .page("https://b.test/", &["https://d.test/", "https://a.test/"])
            .page("https://c.test/", &["https://d.test/", "https://b.test/"])
            .page("https://d.test/", &["https://a.test/"])
            .delay(5),
    );
    let crawler = crawler(&mock, config(8, 4, 2));

    let result = crawler.download("https://a.test/", 5).await.unwrap();

    assert_eq!(result.downloaded.len(), 4);
    for url in ["https://a.test/", "https://b.test/", "https://c.test/", "https://d.test/"] {
        assert_eq!(mock.calls(url), 1, "{} downloaded more than once", url);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_per_host_limit_of_one_serializes_host() {
    let links: Vec<String> = (0..5).map(|i| format!("https://s.test/{}", i)).collect();
    let link_refs: Vec<&str> = links.iter().map(String::as_str).collect();

    let mut mock = MockDownloader::new().page("https://s.test/", &link_refs).delay(20);
    for link in &links {
        mock = mock.page(link, &[]);
    }
    let mock = Arc::new(mock);
    let crawler = crawler(&mock, config(8, 2, 1));

    let result = crawler.download("https://s.test/", 2).await.unwrap();

    assert_eq!(result.downloaded.len(), 6);
    assert_eq!(mock.peak_per_host(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_per_host_limit_allows_parallel_downloads() {
    let links: Vec<String> = (0..8).map(|i| format!("https://p.test/{}", i)).collect();
    let link_refs: Vec<&str> = links.iter().map(String::as_str).collect();

    let mut mock = MockDownloader::new().page("https://p.test/", &link_refs).delay(30);
    for link in &links {
        mock = mock.page(link, &[]);
    }
    let mock = Arc::new(mock);
    let crawler = crawler(&mock, config(16, 2, 3));

    let result = crawler.download("https://p.test/", 2).await.unwrap();

    assert_eq!(result.downloaded.len(), 9);
    assert!(mock.peak_per_host() <= 3);
    assert!(mock.peak_per_host() >= 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_download_pool_caps_all_hosts() {
    let links: Vec<String> = (0..10).map(|i| format!("https://h{}.test/", i)).collect();
    let link_refs: Vec<&str> = links.iter().map(String::as_str).collect();

    let mut mock = MockDownloader::new().page("https://root.test/", &link_refs).delay(20);
    for link in &links {
        mock = mock.page(link, &[]);
    }
    let mock = Arc::new(mock);
    let crawler = crawler(&mock, config(2, 2, 4));

    let result = crawler.download("https://root.test/", 2).await.unwrap();

    assert_eq!(result.downloaded.len(), 11);
    assert!(mock.peak() <= 2);
    assert_eq!(mock.peak_per_host(), 1);
}

#[tokio::test]
async fn test_depth_one_never_extracts() {
    let mock = Arc::new(MockDownloader::new().page("https://a.test/", &["https://a.test/b"]));
    let crawler = crawler(&mock, config(2, 2, 2));

    let result = crawler.download("https://a.test/", 1).await.unwrap();

    assert_eq!(result.downloaded, vec!["https://a.test/"]);
    assert_eq!(mock.extractions(), 0);
    assert_eq!(mock.calls("https://a.test/b"), 0);
}

#[tokio::test]
async fn test_last_layer_is_not_extracted() {
    let mock = Arc::new(
        MockDownloader::new()
            .page("https://a.test/", &["https://a.test/b"])
            .page("https://a.test/b", &["https://a.test/c"]),
    );
    let crawler = crawler(&mock, config(2, 2, 2));

    let result = crawler.download("https://a.test/", 2).await.unwrap();

    assert_eq!(result.downloaded, vec!["https://a.test/", "https://a.test/b"]);
    assert_eq!(mock.extractions(), 1);
}

#[tokio::test]
async fn test_failed_extraction_yields_no_links() {
    let mock = Arc::new(MockDownloader::new().broken_page("https://a.test/"));
    let crawler = crawler(&mock, config(2, 2, 2));

    let result = crawler.download("https://a.test/", 3).await.unwrap();

    assert_eq!(result.downloaded, vec!["https://a.test/"]);
    assert!(result.errors.is_empty());
    assert_eq!(mock.extractions(), 1);
}

#[tokio::test]
async fn test_unroutable_link_is_never_fetched() {
    let mock = Arc::new(
        MockDownloader::new()
            .page("https://a.test/", &["not a url", "https://a.test/b"])
            .page("https://a.test/b", &[]),
    );
    let crawler = crawler(&mock, config(2, 2, 2));

    let result = crawler.download("https://a.test/", 2).await.unwrap();

    assert_eq!(mock.calls("not a url"), 0);
    assert!(result.error_for("not a url").is_none());
    // discovered links stay visited even when they cannot be routed
    assert!(result.is_downloaded("not a url"));
    assert!(result.is_downloaded("https://a.test/b"));
}

#[tokio::test]
async fn test_depth_zero_reports_start_url_only() {
    let mock = Arc::new(MockDownloader::new().page("https://a.test/", &[]));
    let crawler = crawler(&mock, config(2, 2, 2));

    let result = crawler.download("https://a.test/", 0).await.unwrap();

    // the start URL is reported without being fetched
    assert_eq!(result.downloaded, vec!["https://a.test/"]);
    assert!(result.errors.is_empty());
    assert_eq!(mock.total_calls(), 0);
}

#[tokio::test]
async fn test_every_download_failing_still_returns_result() {
    let mock = Arc::new(MockDownloader::new());
    let crawler = crawler(&mock, config(2, 2, 2));

    let result = crawler.download("https://down.test/", 5).await.unwrap();

    assert!(result.downloaded.is_empty());
    assert!(result.error_for("https://down.test/").is_some());
    assert_eq!(mock.total_calls(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_results_and_errors_are_disjoint() {
    let mut mock = MockDownloader::new().delay(2);
    for host in 0..3 {
        for page in 0..10 {
            let url = format!("https://h{}.test/{}", host, page);
            let links: Vec<String> = (1..4)
                .map(|step| format!("https://h{}.test/{}", (host + step) % 3, (page + step) % 12))
                .collect();
            let refs: Vec<&str> = links.iter().map(String::as_str).collect();
            mock = mock.page(&url, &refs);
        }
    }
    // pages 10 and 11 of every host are missing and fail
    let mock = Arc::new(mock);
    let crawler = crawler(&mock, config(6, 3, 2));

    let result = crawler.download("https://h0.test/0", 6).await.unwrap();

    let downloaded: HashSet<&String> = result.downloaded.iter().collect();
    for url in result.errors.keys() {
        assert!(!downloaded.contains(url));
    }
    for url in &result.downloaded {
        assert_eq!(mock.calls(url), 1);
    }
    assert!(mock.peak() <= 6);
    assert!(mock.peak_per_host() <= 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_crawls_share_pools() {
    let mock = Arc::new(
        MockDownloader::new()
            .page("https://a.test/", &["https://a.test/1"])
            .page("https://a.test/1", &[])
            .page("https://b.test/", &["https://b.test/1"])
            .page("https://b.test/1", &[])
            .delay(10),
    );
    let crawler = crawler(&mock, config(2, 1, 1));

    let (a, b) = tokio::join!(
        crawler.download("https://a.test/", 2),
        crawler.download("https://b.test/", 2)
    );

    assert_eq!(a.unwrap().downloaded, vec!["https://a.test/", "https://a.test/1"]);
    assert_eq!(b.unwrap().downloaded, vec!["https://b.test/", "https://b.test/1"]);
    assert!(mock.peak() <= 2);
}

#[tokio::test]
async fn test_invalid_configuration_is_rejected() {
    let mock = Arc::new(MockDownloader::new());

    for bad in [config(0, 1, 1), config(1, 0, 1), config(1, 1, 0)] {
        assert!(matches!(
            WebCrawler::new(mock.clone(), &bad),
            Err(CrawlError::Config(_))
        ));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_panicking_download_frees_host_slot() {
    let mock = Arc::new(
        MockDownloader::new()
            .panicking_page("https://a.test/boom")
            .page("https://a.test/ok", &[]),
    );
    let crawler = crawler(&mock, config(2, 1, 1));

    let result = crawler.download("https://a.test/boom", 1).await.unwrap();
    assert!(result.error_for("https://a.test/boom").is_none());

    let result = tokio::time::timeout(
        Duration::from_secs(3),
        crawler.download("https://a.test/ok", 1),
    )
    .await
    .expect("host slot must be free after a panicking download")
    .unwrap();

    assert_eq!(result.downloaded, vec!["https://a.test/ok"]);
    assert_eq!(mock.calls("https://a.test/ok"), 1);
}

#[tokio::test]
async fn test_large_pool_sizes_are_accepted() {
    let mock = Arc::new(
        MockDownloader::new()
            .page("https://a.test/", &["https://a.test/b"])
            .page("https://a.test/b", &[]),
    );
    let crawler = crawler(&mock, config(5000, 2000, 5000));

    let result = crawler.download("https://a.test/", 2).await.unwrap();

    assert_eq!(result.downloaded, vec!["https://a.test/", "https://a.test/b"]);
}

#[tokio::test]
async fn test_closed_crawler_rejects_downloads() {
    let mock = Arc::new(MockDownloader::new().page("https://a.test/", &[]));
    let crawler = crawler(&mock, config(1, 1, 1));

    crawler.close();

    assert!(matches!(
        crawler.download("https://a.test/", 1).await,
        Err(CrawlError::Closed)
    ));
    assert_eq!(mock.total_calls(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_close_during_crawl_returns() {
    let links: Vec<String> = (0..6).map(|i| format!("https://slow.test/{}", i)).collect();
    let link_refs: Vec<&str> = links.iter().map(String::as_str).collect();
    let mut mock = MockDownloader::new().page("https://slow.test/", &link_refs).delay(100);
    for link in &links {
        mock = mock.page(link, &[]);
    }
    let mock = Arc::new(mock);
    let crawler = Arc::new(crawler(&mock, config(1, 1, 1)));

    let running = {
        let crawler = Arc::clone(&crawler);
        tokio::spawn(async move { crawler.download("https://slow.test/", 3).await })
    };

    tokio::time::sleep(Duration::from_millis(150)).await;
    crawler.close();

    let outcome = tokio::time::timeout(Duration::from_secs(5), running)
        .await
        .expect("crawl must return after close")
        .unwrap();
    assert!(matches!(outcome, Err(CrawlError::Closed)));
}
