pub mod crawler;
pub mod error;
pub mod fetch;
pub mod normalize;
pub mod page;
pub mod parse;
pub mod stats;

pub use crawler::{CrawlOutcome, CrawlReport, Crawler, CrawlerConfig, PageCallback};
pub use error::{ScanError, SkipReason};
pub use fetch::{FetchedPage, Fetcher, HttpFetcher};
pub use page::PageRecord;
pub use stats::CrawlStatistics;
