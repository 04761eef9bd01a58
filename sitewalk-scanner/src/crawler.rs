use crate::error::{Result, ScanError, SkipReason};
use crate::fetch::{Fetcher, HttpFetcher, default_headers};
use crate::normalize::{
    domain_of, ensure_scheme, has_http_scheme, is_non_content_link, normalize_domain,
    normalize_url, resolve_link,
};
use crate::page::PageRecord;
use crate::parse::parse_html;
use crate::stats::CrawlStatistics;
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};

/// Invoked once per stored page, from the orchestrating task.
pub type PageCallback = Arc<dyn Fn(&PageRecord) + Send + Sync>;

pub const DEFAULT_WORKERS: usize = 10;
pub const DEFAULT_STALL_THRESHOLD: usize = 3;
pub const DEFAULT_POLITENESS_DELAY: Duration = Duration::from_millis(100);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_MIN_BODY_BYTES: usize = 100;

#[derive(Debug, Clone)]
pub struct CrawlerConfig {
    /// Size of the per-level worker pool.
    pub workers: usize,
    /// Consecutive depth levels without a stored page before giving up.
    pub max_consecutive_empty_levels: usize,
    pub politeness_delay: Duration,
    pub request_timeout: Duration,
    /// Bodies shorter than this are treated as error/placeholder pages.
    pub min_body_bytes: usize,
    pub headers: HeaderMap,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            max_consecutive_empty_levels: DEFAULT_STALL_THRESHOLD,
            politeness_delay: DEFAULT_POLITENESS_DELAY,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            min_body_bytes: DEFAULT_MIN_BODY_BYTES,
            headers: default_headers(),
        }
    }
}

/// Why a crawl stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CrawlOutcome {
    MaxDepthReached,
    FrontierExhausted,
    Cancelled,
    /// `max_consecutive_empty_levels` levels in a row stored no page.
    ///
    /// A level that stores nothing also leaves no links behind, so with a
    /// non-zero threshold the crawl ends as `FrontierExhausted` before the
    /// counter can trip. A threshold of 0 stalls before the first level.
    Stalled,
}

#[derive(Debug, Clone)]
pub struct CrawlReport {
    /// Pages in completion order.
    pub pages: Vec<PageRecord>,
    pub outcome: CrawlOutcome,
}

#[derive(Debug, Default)]
struct CrawlState {
    visited: HashSet<String>,
    domain_page_counts: HashMap<String, usize>,
    start_domain: Option<String>,
    results: Vec<PageRecord>,
    last_outcome: Option<CrawlOutcome>,
}

/// Breadth-first crawler. Cloning is cheap and every clone shares the same
/// crawl state, which is how workers and `stop_scraping` callers reach it.
///
/// Only one `crawl` may be in flight per crawler at a time.
#[derive(Clone)]
pub struct Crawler {
    fetcher: Arc<dyn Fetcher>,
    config: Arc<CrawlerConfig>,
    state: Arc<Mutex<CrawlState>>,
    cancel_requested: Arc<AtomicBool>,
}

impl Crawler {
    pub fn new() -> Result<Self> {
        Ok(Self::with_fetcher(Arc::new(HttpFetcher::new()?)))
    }

    pub fn with_fetcher(fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            fetcher,
            config: Arc::new(CrawlerConfig::default()),
            state: Arc::new(Mutex::new(CrawlState::default())),
            cancel_requested: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_config(mut self, config: CrawlerConfig) -> Self {
        self.config = Arc::new(config);
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        Arc::make_mut(&mut self.config).workers = workers;
        self
    }

    pub fn with_politeness_delay(mut self, delay: Duration) -> Self {
        Arc::make_mut(&mut self.config).politeness_delay = delay;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        Arc::make_mut(&mut self.config).request_timeout = timeout;
        self
    }

    pub fn with_stall_threshold(mut self, levels: usize) -> Self {
        Arc::make_mut(&mut self.config).max_consecutive_empty_levels = levels;
        self
    }

    pub fn config(&self) -> &CrawlerConfig {
        &self.config
    }

    pub async fn crawl(
        &self,
        start_url: &str,
        max_depth: usize,
        on_page: Option<PageCallback>,
    ) -> Vec<PageRecord> {
        self.crawl_report(start_url, max_depth, on_page).await.pages
    }

    /// Crawls level by level from `start_url` down to `max_depth` (inclusive).
    ///
    /// Never fails: unreachable or unsuitable pages simply produce no record.
    pub async fn crawl_report(
        &self,
        start_url: &str,
        max_depth: usize,
        on_page: Option<PageCallback>,
    ) -> CrawlReport {
        self.reset().await;

        let start_url = ensure_scheme(start_url);
        let start_domain = domain_of(&start_url);
        {
            let mut state = self.state.lock().await;
            state.start_domain = (!start_domain.is_empty()).then(|| start_domain.clone());
        }

        info!(
            "Starting crawl of {} (domain {}, max depth {}, {} workers)",
            start_url, start_domain, max_depth, self.config.workers
        );

        let mut frontier = vec![(start_url, 0usize)];
        let mut empty_levels = 0;
        let mut outcome = CrawlOutcome::MaxDepthReached;

        for current_depth in 0..=max_depth {
            if self.is_cancelled() {
                outcome = CrawlOutcome::Cancelled;
                break;
            }
            if frontier.is_empty() {
                info!("Stopping at depth {}: no more URLs", current_depth);
                outcome = CrawlOutcome::FrontierExhausted;
                break;
            }
            if empty_levels >= self.config.max_consecutive_empty_levels {
                info!(
                    "Stopping at depth {}: {} consecutive empty levels",
                    current_depth, empty_levels
                );
                outcome = CrawlOutcome::Stalled;
                break;
            }

            info!("Crawling depth {} with {} URLs", current_depth, frontier.len());
            let (produced, next) = self
                .crawl_level(frontier, current_depth, max_depth, on_page.as_ref())
                .await;

            if produced == 0 {
                empty_levels += 1;
            } else {
                empty_levels = 0;
            }
            frontier = next;

            if self.is_cancelled() {
                info!("Crawl cancelled after depth {}", current_depth);
                outcome = CrawlOutcome::Cancelled;
                break;
            }
            debug!(
                "Depth {} complete: {} pages, next frontier {}",
                current_depth,
                produced,
                frontier.len()
            );
        }

        let mut state = self.state.lock().await;
        state.last_outcome = Some(outcome);
        info!(
            "Crawl complete ({:?}). {} pages, {} URLs visited",
            outcome,
            state.results.len(),
            state.visited.len()
        );

        CrawlReport {
            pages: state.results.clone(),
            outcome,
        }
    }

    /// Runs one BFS level through the worker pool and returns the number of
    /// stored pages plus the next frontier.
    async fn crawl_level(
        &self,
        frontier: Vec<(String, usize)>,
        current_depth: usize,
        max_depth: usize,
        on_page: Option<&PageCallback>,
    ) -> (usize, Vec<(String, usize)>) {
        let workers = self.config.workers.max(1).min(frontier.len());
        let queue = Arc::new(Mutex::new(VecDeque::from(frontier)));
        let (tx, mut rx) = mpsc::unbounded_channel::<PageRecord>();

        let mut worker_handles = Vec::with_capacity(workers);
        for worker_id in 0..workers {
            let crawler = self.clone();
            let queue = queue.clone();
            let tx = tx.clone();

            worker_handles.push(tokio::spawn(async move {
                debug!("Worker {} started", worker_id);
                loop {
                    if crawler.is_cancelled() {
                        break;
                    }
                    let Some((url, depth)) = queue.lock().await.pop_front() else {
                        break;
                    };
                    if let Some(page) = crawler.fetch_one(&url, depth).await
                        && tx.send(page).is_err()
                    {
                        break;
                    }
                }
                debug!("Worker {} finished", worker_id);
            }));
        }
        drop(tx);

        let mut produced = 0;
        let mut next = Vec::new();
        while let Some(page) = rx.recv().await {
            produced += 1;
            self.state.lock().await.results.push(page.clone());

            if let Some(callback) = on_page
                && catch_unwind(AssertUnwindSafe(|| callback(&page))).is_err()
            {
                warn!("Page callback panicked for {}", page.url);
            }

            if current_depth < max_depth && !self.is_cancelled() {
                let state = self.state.lock().await;
                next.extend(
                    page.links
                        .iter()
                        .filter(|link| skip_reason(&state.visited, link).is_none())
                        .map(|link| (link.clone(), current_depth + 1)),
                );
            }
        }

        for handle in worker_handles {
            if let Err(e) = handle.await {
                warn!("{}", ScanError::from(e));
            }
        }

        (produced, next)
    }

    /// Fetches and parses a single URL. Every failure is logged and turned
    /// into `None`.
    pub async fn fetch_one(&self, url: &str, depth: usize) -> Option<PageRecord> {
        if self.is_cancelled() {
            return None;
        }
        if let Some(reason) = self.should_skip(url, depth).await {
            info!("Skipping {}: {}", url, reason);
            return None;
        }

        let normalized = normalize_url(url);
        {
            let mut state = self.state.lock().await;
            if !state.visited.insert(normalized.clone()) {
                info!("Skipping {}: {}", url, SkipReason::AlreadyVisited);
                return None;
            }
            *state
                .domain_page_counts
                .entry(domain_of(&normalized))
                .or_insert(0) += 1;
        }

        tokio::time::sleep(self.config.politeness_delay).await;
        if self.is_cancelled() {
            return None;
        }

        match self.fetch_and_parse(&normalized, depth).await {
            Ok(page) => Some(page),
            Err(ScanError::Rejected(reason)) => {
                info!("Skipping {}: {}", url, reason);
                None
            }
            Err(e) => {
                warn!("Error crawling {}: {}", url, e);
                None
            }
        }
    }

    async fn fetch_and_parse(&self, url: &str, depth: usize) -> Result<PageRecord> {
        let start = Instant::now();
        let response = self
            .fetcher
            .fetch(url, &self.config.headers, self.config.request_timeout)
            .await?;
        let elapsed = start.elapsed();

        if !response.is_html() {
            return Err(ScanError::Rejected(SkipReason::NotHtml(
                response.content_type.clone(),
            )));
        }
        if response.body.len() < self.config.min_body_bytes {
            return Err(ScanError::Rejected(SkipReason::TooSmall(response.body.len())));
        }

        let content = String::from_utf8_lossy(&response.body).into_owned();
        let parsed = parse_html(&content);

        let mut seen = HashSet::new();
        let mut links = Vec::new();
        {
            let state = self.state.lock().await;
            for href in &parsed.links {
                let Some(absolute) = resolve_link(url, href) else {
                    continue;
                };
                let link = normalize_url(&absolute);
                if !seen.insert(link.clone()) {
                    continue;
                }
                if let Some(reason) = skip_reason(&state.visited, &link) {
                    debug!("  dropping link {}: {}", link, reason);
                    continue;
                }
                if is_non_content_link(&link) {
                    debug!("  dropping link {}: non-content", link);
                    continue;
                }
                links.push(link);
            }
        }

        debug!("Parsed {} ({} links kept of {})", url, links.len(), parsed.links.len());
        Ok(
            PageRecord::new(parsed.title, url, content, depth, links, Some(elapsed))
                .with_text(parsed.text),
        )
    }

    /// Checks whether `url` is worth dispatching. `depth` is accepted for
    /// symmetry with the frontier but imposes no limit of its own.
    pub async fn should_skip(&self, url: &str, _depth: usize) -> Option<SkipReason> {
        let state = self.state.lock().await;
        skip_reason(&state.visited, url)
    }

    pub fn stop_scraping(&self) {
        self.cancel_requested.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_requested.load(Ordering::SeqCst)
    }

    pub async fn reset(&self) {
        *self.state.lock().await = CrawlState::default();
        self.cancel_requested.store(false, Ordering::SeqCst);
    }

    pub async fn get_statistics(&self) -> CrawlStatistics {
        let state = self.state.lock().await;
        CrawlStatistics::compute(
            &state.results,
            state.visited.len(),
            &state.domain_page_counts,
            state.start_domain.clone(),
        )
    }

    pub async fn filter_by_domain(&self, domain: &str) -> Vec<PageRecord> {
        let wanted = normalize_domain(domain);
        self.state
            .lock()
            .await
            .results
            .iter()
            .filter(|page| page.normalized_domain() == wanted)
            .cloned()
            .collect()
    }

    pub async fn search_websites(&self, query: &str) -> Vec<PageRecord> {
        self.state
            .lock()
            .await
            .results
            .iter()
            .filter(|page| page.matches(query))
            .cloned()
            .collect()
    }

    pub async fn get_results(&self) -> Vec<PageRecord> {
        self.state.lock().await.results.clone()
    }

    pub async fn get_visited_count(&self) -> usize {
        self.state.lock().await.visited.len()
    }

    pub async fn last_outcome(&self) -> Option<CrawlOutcome> {
        self.state.lock().await.last_outcome
    }
}

fn skip_reason(visited: &HashSet<String>, url: &str) -> Option<SkipReason> {
    let normalized = normalize_url(url);
    if visited.contains(&normalized) {
        return Some(SkipReason::AlreadyVisited);
    }
    if !has_http_scheme(&normalized) {
        return Some(SkipReason::NotHttp);
    }
    if domain_of(&normalized).is_empty() {
        return Some(SkipReason::InvalidDomain);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::FetchedPage;
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::AtomicUsize;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    const FILLER: &str = "<p>Lorem ipsum dolor sit amet, consectetur adipiscing elit, \
                          sed do eiusmod tempor incididunt ut labore et dolore magna aliqua.</p>";

    fn html_page(title: &str, hrefs: &[&str]) -> String {
        let anchors: String = hrefs
            .iter()
            .map(|href| format!(r#"<a href="{}">link</a>"#, href))
            .collect();
        format!(
            "<html><head><title>{}</title></head><body>{}{}</body></html>",
            title, FILLER, anchors
        )
    }

    async fn mount_html(server: &MockServer, route: &str, body: String) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html; charset=utf-8")
                    .set_body_string(body),
            )
            .mount(server)
            .await;
    }

    fn http_crawler() -> Crawler {
        Crawler::new()
            .unwrap()
            .with_politeness_delay(Duration::ZERO)
            .with_request_timeout(Duration::from_secs(5))
    }

    /// Serves pages from memory and counts requests per URL.
    #[derive(Default)]
    struct StubFetcher {
        pages: HashMap<String, (String, String)>,
        delay: Duration,
        hits: StdMutex<HashMap<String, usize>>,
        total: AtomicUsize,
    }

    impl StubFetcher {
        fn page(mut self, url: &str, body: String) -> Self {
            self.pages
                .insert(url.to_string(), ("text/html".to_string(), body));
            self
        }

        fn hits(&self, url: &str) -> usize {
            self.hits.lock().unwrap().get(url).copied().unwrap_or(0)
        }
    }

    #[async_trait]
    impl Fetcher for StubFetcher {
        async fn fetch(
            &self,
            url: &str,
            _headers: &HeaderMap,
            _timeout: Duration,
        ) -> Result<FetchedPage> {
            self.total.fetch_add(1, Ordering::SeqCst);
            *self
                .hits
                .lock()
                .unwrap()
                .entry(url.to_string())
                .or_insert(0) += 1;
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            match self.pages.get(url) {
                Some((content_type, body)) => Ok(FetchedPage {
                    status: 200,
                    content_type: content_type.clone(),
                    body: body.clone().into_bytes(),
                }),
                None => Err(ScanError::Status(404)),
            }
        }
    }

    /// Every page links to five fresh children, so the site never runs out.
    struct EndlessFetcher {
        delay: Duration,
    }

    #[async_trait]
    impl Fetcher for EndlessFetcher {
        async fn fetch(
            &self,
            url: &str,
            _headers: &HeaderMap,
            _timeout: Duration,
        ) -> Result<FetchedPage> {
            tokio::time::sleep(self.delay).await;
            let children: Vec<String> = (0..5).map(|i| format!("{}/{}", url, i)).collect();
            let hrefs: Vec<&str> = children.iter().map(String::as_str).collect();
            Ok(FetchedPage {
                status: 200,
                content_type: "text/html".to_string(),
                body: html_page("node", &hrefs).into_bytes(),
            })
        }
    }

    #[test]
    fn test_skip_reason() {
        let mut visited = HashSet::new();
        visited.insert("https://example.com/a".to_string());

        assert_eq!(
            skip_reason(&visited, "https://www.example.com/a/#x"),
            Some(SkipReason::AlreadyVisited)
        );
        assert_eq!(
            skip_reason(&visited, "ftp://example.com/file"),
            Some(SkipReason::NotHttp)
        );
        assert_eq!(
            skip_reason(&visited, "mailto:x@y.com"),
            Some(SkipReason::NotHttp)
        );
        assert_eq!(
            skip_reason(&visited, "http://"),
            Some(SkipReason::InvalidDomain)
        );
        assert_eq!(skip_reason(&visited, "https://example.com/b"), None);
    }

    #[tokio::test]
    async fn test_single_page_without_links() {
        let mock_server = MockServer::start().await;
        mount_html(&mock_server, "/", html_page("Home", &[])).await;

        let crawler = http_crawler();
        let report = crawler.crawl_report(&mock_server.uri(), 0, None).await;

        assert_eq!(report.pages.len(), 1);
        let page = &report.pages[0];
        assert_eq!(page.title, "Home");
        assert_eq!(page.depth, 0);
        assert!(page.links.is_empty());
        assert_eq!(page.url, mock_server.uri());
        assert!(page.fetch_duration.is_some());
        assert_eq!(report.outcome, CrawlOutcome::MaxDepthReached);
    }

    #[tokio::test]
    async fn test_linear_chain_respects_max_depth() {
        let mock_server = MockServer::start().await;
        mount_html(&mock_server, "/", html_page("A", &["/b"])).await;
        mount_html(&mock_server, "/b", html_page("B", &["/c"])).await;
        mount_html(&mock_server, "/c", html_page("C", &["/d"])).await;
        Mock::given(method("GET"))
            .and(path("/d"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let crawler = http_crawler();
        let results = crawler.crawl(&mock_server.uri(), 2, None).await;

        let mut found: Vec<(String, usize)> =
            results.iter().map(|p| (p.title.clone(), p.depth)).collect();
        found.sort();
        assert_eq!(
            found,
            vec![("A".to_string(), 0), ("B".to_string(), 1), ("C".to_string(), 2)]
        );
        assert!(results.iter().all(|p| p.depth <= 2));

        let c = results.iter().find(|p| p.title == "C").unwrap();
        assert_eq!(c.links, vec![format!("{}/d", mock_server.uri())]);
        assert_eq!(crawler.last_outcome().await, Some(CrawlOutcome::MaxDepthReached));
    }

    #[tokio::test]
    async fn test_self_loop_fetched_once() {
        let mock_server = MockServer::start().await;
        let root = mock_server.uri();
        let self_links = [
            root.clone(),
            format!("{}/", root),
            format!("{}/#top", root),
            "/".to_string(),
        ];
        let hrefs: Vec<&str> = self_links.iter().map(String::as_str).collect();
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_string(html_page("A", &hrefs)),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let crawler = http_crawler();
        let report = crawler.crawl_report(&root, 5, None).await;

        assert_eq!(report.pages.len(), 1);
        assert!(report.pages[0].links.is_empty());
        assert_eq!(report.outcome, CrawlOutcome::FrontierExhausted);
    }

    #[tokio::test]
    async fn test_mixed_link_types() {
        let mock_server = MockServer::start().await;
        mount_html(
            &mock_server,
            "/",
            html_page(
                "Mixed",
                &[
                    "mailto:x@y.com",
                    "tel:123",
                    "/doc.pdf",
                    "javascript:void(0)",
                    "/styles/site.CSS",
                    "https://good.com/page",
                    "https://www.good.com/page/#frag",
                ],
            ),
        )
        .await;

        let crawler = http_crawler();
        let results = crawler.crawl(&mock_server.uri(), 0, None).await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].links, vec!["https://good.com/page".to_string()]);
    }

    #[tokio::test]
    async fn test_non_html_and_small_pages_rejected() {
        let mock_server = MockServer::start().await;
        mount_html(
            &mock_server,
            "/",
            html_page("Root", &["/data", "/tiny", "/missing", "/ok"]),
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/data"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/json")
                    .set_body_string(format!(
                        r#"{{"html": "{}", "padding": "{}"}}"#,
                        html_page("Json", &["/from-json"]).replace('"', "'"),
                        "x".repeat(200)
                    )),
            )
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/from-json"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;
        mount_html(&mock_server, "/tiny", "<html>hi</html>".to_string()).await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;
        mount_html(&mock_server, "/ok", html_page("Ok", &[])).await;

        let crawler = http_crawler();
        let results = crawler.crawl(&mock_server.uri(), 3, None).await;

        let mut titles: Vec<&str> = results.iter().map(|p| p.title.as_str()).collect();
        titles.sort();
        assert_eq!(titles, vec!["Ok", "Root"]);

        let stats = crawler.get_statistics().await;
        assert_eq!(stats.total_pages, 2);
        assert_eq!(stats.visited_urls_count, 5);
        let domain = domain_of(&mock_server.uri());
        assert_eq!(stats.domain_page_counts.get(&domain), Some(&5));
        assert_eq!(stats.domains.get(&domain), Some(&2));
    }

    #[tokio::test]
    async fn test_shared_children_fetched_once() {
        let mock_server = MockServer::start().await;
        mount_html(&mock_server, "/", html_page("Root", &["/a", "/b"])).await;
        mount_html(&mock_server, "/a", html_page("A", &["/c", "/a"])).await;
        mount_html(&mock_server, "/b", html_page("B", &["/c", "/"])).await;
        Mock::given(method("GET"))
            .and(path("/c"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_string(html_page("C", &["/a", "/b"])),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let crawler = http_crawler().with_workers(4);
        let results = crawler.crawl(&mock_server.uri(), 4, None).await;

        let urls: HashSet<&str> = results.iter().map(|p| p.url.as_str()).collect();
        assert_eq!(urls.len(), results.len());
        assert_eq!(results.len(), 4);
    }

    #[tokio::test]
    async fn test_concurrent_fetch_of_same_url_dispatches_once() {
        let fetcher = Arc::new(
            StubFetcher {
                delay: Duration::from_millis(20),
                ..Default::default()
            }
            .page("https://example.com/x", html_page("X", &[])),
        );
        let crawler = Crawler::with_fetcher(fetcher.clone()).with_politeness_delay(Duration::ZERO);

        let (first, second) = tokio::join!(
            crawler.fetch_one("https://example.com/x", 0),
            crawler.fetch_one("https://www.example.com/x/", 0)
        );

        assert_eq!(first.is_some() as u8 + second.is_some() as u8, 1);
        assert_eq!(fetcher.hits("https://example.com/x"), 1);
        assert_eq!(fetcher.total.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_start_url_gets_scheme_and_domain() {
        let fetcher = Arc::new(
            StubFetcher::default()
                .page("https://example.com", html_page("Home", &["/about"]))
                .page("https://example.com/about", html_page("About", &[])),
        );
        let crawler = Crawler::with_fetcher(fetcher.clone()).with_politeness_delay(Duration::ZERO);

        let results = crawler.crawl("www.example.com", 1, None).await;

        assert_eq!(results.len(), 2);
        assert_eq!(fetcher.hits("https://example.com"), 1);
        let stats = crawler.get_statistics().await;
        assert_eq!(stats.start_domain.as_deref(), Some("example.com"));
        assert_eq!(stats.max_depth_reached, 1);
        assert_eq!(stats.total_links, 1);
    }

    #[tokio::test]
    async fn test_filter_and_search() {
        let fetcher = Arc::new(
            StubFetcher::default()
                .page(
                    "https://example.com",
                    html_page("Home", &["https://www.other.org/rust", "/team"]),
                )
                .page("https://example.com/team", html_page("Team", &[]))
                .page(
                    "https://other.org/rust",
                    html_page("Ferris", &[]).replace("Lorem", "Ferris the Crab says Lorem"),
                ),
        );
        let crawler = Crawler::with_fetcher(fetcher).with_politeness_delay(Duration::ZERO);
        crawler.crawl("https://www.example.com", 2, None).await;

        assert_eq!(crawler.filter_by_domain("www.example.com").await.len(), 2);
        assert_eq!(crawler.filter_by_domain("example.com").await.len(), 2);
        assert_eq!(crawler.filter_by_domain("https://other.org/").await.len(), 1);
        assert!(crawler.filter_by_domain("nowhere.net").await.is_empty());

        let hits = crawler.search_websites("FERRIS THE CRAB").await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].url, "https://other.org/rust");
        assert_eq!(crawler.search_websites("lorem").await.len(), 3);
        assert!(crawler.search_websites("").await.is_empty());
    }

    #[tokio::test]
    async fn test_callbacks_arrive_level_by_level() {
        let fetcher = Arc::new(EndlessFetcher {
            delay: Duration::from_millis(1),
        });
        let crawler = Crawler::with_fetcher(fetcher).with_politeness_delay(Duration::ZERO);

        let depths = Arc::new(StdMutex::new(Vec::new()));
        let depths_clone = depths.clone();
        let callback: PageCallback = Arc::new(move |page: &PageRecord| {
            depths_clone.lock().unwrap().push(page.depth);
        });

        let results = crawler.crawl("https://tree.test", 2, Some(callback)).await;

        let depths = depths.lock().unwrap();
        assert_eq!(results.len(), 1 + 5 + 25);
        assert_eq!(depths.len(), results.len());
        assert!(depths.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test]
    async fn test_panicking_callback_does_not_abort() {
        let fetcher = Arc::new(
            StubFetcher::default()
                .page("https://example.com", html_page("Home", &["/a"]))
                .page("https://example.com/a", html_page("A", &[])),
        );
        let crawler = Crawler::with_fetcher(fetcher).with_politeness_delay(Duration::ZERO);
        let callback: PageCallback = Arc::new(|_page: &PageRecord| panic!("boom"));

        let results = crawler.crawl("https://example.com", 1, Some(callback)).await;

        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn test_zero_stall_threshold_stalls_immediately() {
        let fetcher = Arc::new(
            StubFetcher::default().page("https://example.com", html_page("Home", &[])),
        );
        let crawler = Crawler::with_fetcher(fetcher.clone())
            .with_politeness_delay(Duration::ZERO)
            .with_stall_threshold(0);

        let report = crawler.crawl_report("https://example.com", 3, None).await;

        assert_eq!(report.outcome, CrawlOutcome::Stalled);
        assert!(report.pages.is_empty());
        assert_eq!(fetcher.total.load(Ordering::SeqCst), 0);
        assert_eq!(crawler.last_outcome().await, Some(CrawlOutcome::Stalled));
    }

    #[tokio::test]
    async fn test_mixed_case_start_url_fetched_once() {
        let fetcher = Arc::new(
            StubFetcher::default()
                .page("https://example.com", html_page("Home", &["/about"]))
                .page(
                    "https://example.com/about",
                    html_page("About", &["https://EXAMPLE.com/", "HTTPS://www.example.com"]),
                ),
        );
        let crawler = Crawler::with_fetcher(fetcher.clone()).with_politeness_delay(Duration::ZERO);

        let results = crawler.crawl("HTTPS://WWW.Example.com", 2, None).await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].url, "https://example.com");
        assert_eq!(fetcher.hits("https://example.com"), 1);
        assert!(results[1].links.is_empty());
        assert_eq!(fetcher.total.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_scraping_ends_crawl() {
        let fetcher = Arc::new(EndlessFetcher {
            delay: Duration::from_millis(50),
        });
        let crawler = Crawler::with_fetcher(fetcher).with_politeness_delay(Duration::ZERO);

        let stopper = crawler.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            stopper.stop_scraping();
        });

        let started = tokio::time::Instant::now();
        let report = crawler.crawl_report("https://tree.test", 50, None).await;

        assert_eq!(report.outcome, CrawlOutcome::Cancelled);
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(!report.pages.is_empty());
        assert!(report.pages.len() < 1 + 5 + 25 + 125);
        assert!(crawler.is_cancelled());
    }

    #[tokio::test]
    async fn test_fetch_one_after_cancel_is_noop() {
        let fetcher = Arc::new(
            StubFetcher::default().page("https://example.com", html_page("Home", &[])),
        );
        let crawler = Crawler::with_fetcher(fetcher.clone()).with_politeness_delay(Duration::ZERO);
        crawler.stop_scraping();

        assert!(crawler.fetch_one("https://example.com", 0).await.is_none());
        assert_eq!(crawler.get_visited_count().await, 0);
        assert_eq!(fetcher.total.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_reset_clears_state() {
        let fetcher = Arc::new(
            StubFetcher::default().page("https://example.com", html_page("Home", &[])),
        );
        let crawler = Crawler::with_fetcher(fetcher.clone()).with_politeness_delay(Duration::ZERO);
        crawler.crawl("https://example.com", 0, None).await;
        assert_eq!(crawler.get_results().await.len(), 1);

        crawler.stop_scraping();
        crawler.reset().await;

        assert!(!crawler.is_cancelled());
        assert!(crawler.get_results().await.is_empty());
        assert_eq!(crawler.get_visited_count().await, 0);
        assert_eq!(crawler.get_statistics().await, CrawlStatistics::default());
        assert_eq!(crawler.last_outcome().await, None);

        // a second crawl starts from scratch and refetches
        crawler.crawl("https://example.com", 0, None).await;
        assert_eq!(fetcher.hits("https://example.com"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_politeness_delay_applied() {
        let fetcher = Arc::new(
            StubFetcher::default().page("https://example.com", html_page("Home", &[])),
        );
        let crawler = Crawler::with_fetcher(fetcher);
        assert_eq!(crawler.config().politeness_delay, DEFAULT_POLITENESS_DELAY);

        let started = tokio::time::Instant::now();
        let page = crawler.fetch_one("https://example.com", 0).await;

        assert!(page.is_some());
        assert!(started.elapsed() >= DEFAULT_POLITENESS_DELAY);
        assert!(started.elapsed() < DEFAULT_POLITENESS_DELAY * 2);
    }
}
