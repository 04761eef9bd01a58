use indicatif::{ProgressBar, ProgressStyle};
use sitewalk_scanner::crawler::{
    CrawlOutcome, Crawler, DEFAULT_REQUEST_TIMEOUT, DEFAULT_WORKERS, PageCallback,
};
use sitewalk_scanner::{CrawlStatistics, PageRecord, ScanError};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::info;
use url::Url;

/// Options for configuring a crawl operation
pub struct CrawlOptions {
    pub url: String,
    pub max_depth: usize,
    pub workers: usize,
    pub timeout_secs: u64,
    pub show_progress_bars: bool,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_depth: 3,
            workers: DEFAULT_WORKERS,
            timeout_secs: DEFAULT_REQUEST_TIMEOUT.as_secs(),
            show_progress_bars: false,
        }
    }
}

/// Callback for reporting crawl progress
pub type CrawlProgressCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Everything a front-end needs once a crawl has stopped.
#[derive(Debug, Clone)]
pub struct CrawlRun {
    pub pages: Vec<PageRecord>,
    pub stats: CrawlStatistics,
    pub outcome: CrawlOutcome,
}

/// Extract the path component from a URL
pub fn extract_url_path(url: &str) -> String {
    Url::parse(url)
        .ok()
        .map(|u| {
            let path = u.path().to_string();
            if path.is_empty() || path == "/" {
                "/".to_string()
            } else {
                path
            }
        })
        .unwrap_or_else(|| url.to_string())
}

/// Builds an HTTP-backed crawler configured from the options.
pub fn build_crawler(options: &CrawlOptions) -> Result<Crawler, ScanError> {
    Ok(Crawler::new()?
        .with_workers(options.workers)
        .with_request_timeout(Duration::from_secs(options.timeout_secs)))
}

pub fn outcome_description(outcome: CrawlOutcome) -> &'static str {
    match outcome {
        CrawlOutcome::MaxDepthReached => "maximum depth reached",
        CrawlOutcome::FrontierExhausted => "no more pages to visit",
        CrawlOutcome::Cancelled => "stopped by user",
        CrawlOutcome::Stalled => "stalled (no new pages for several levels)",
    }
}

/// Execute a crawl with the given options on `crawler`.
///
/// The crawler is borrowed so the caller can keep a clone around to call
/// `stop_scraping` (e.g. from a Ctrl-C handler).
pub async fn execute_crawl(
    crawler: &Crawler,
    options: &CrawlOptions,
    progress_callback: Option<CrawlProgressCallback>,
) -> CrawlRun {
    // Set up single progress bar for overall crawl progress (only if enabled)
    let progress_bar = if options.show_progress_bars {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_message("Starting crawl...");
        Some(Arc::new(pb))
    } else {
        None
    };

    let processed_count = Arc::new(AtomicUsize::new(0));
    let pb_clone = progress_bar.clone();
    let count_clone = processed_count.clone();
    let on_page: PageCallback = Arc::new(move |page: &PageRecord| {
        let count = count_clone.fetch_add(1, Ordering::Relaxed) + 1;
        if let Some(ref pb) = pb_clone {
            pb.set_message(format!(
                "Crawling... {} pages (depth {}: {})",
                count,
                page.depth,
                extract_url_path(&page.url)
            ));
        }
        if let Some(ref callback) = progress_callback {
            callback(format!("Scraped: {} (depth {})", page.title, page.depth));
        }
    });

    let report = crawler
        .crawl_report(&options.url, options.max_depth, Some(on_page))
        .await;
    let stats = crawler.get_statistics().await;
    info!(
        "Crawl of {} finished: {} pages, {}",
        options.url,
        report.pages.len(),
        outcome_description(report.outcome)
    );

    if let Some(ref pb) = progress_bar {
        pb.finish_with_message(format!(
            "Crawl complete! {} pages ({})",
            processed_count.load(Ordering::Relaxed),
            outcome_description(report.outcome)
        ));
    }

    CrawlRun {
        pages: report.pages,
        stats,
        outcome: report.outcome,
    }
}
