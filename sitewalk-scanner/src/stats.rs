use crate::page::PageRecord;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Point-in-time summary of a crawl.
///
/// `domains` counts stored results per normalized domain; `domain_page_counts`
/// counts fetch attempts, including pages later rejected as non-HTML or too small.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrawlStatistics {
    pub total_pages: usize,
    pub total_links: usize,
    pub total_words: usize,
    /// Mean fetch time in seconds over pages that recorded one.
    pub avg_load_time: f64,
    pub max_depth_reached: usize,
    pub domains: BTreeMap<String, usize>,
    pub visited_urls_count: usize,
    pub domain_page_counts: BTreeMap<String, usize>,
    pub start_domain: Option<String>,
}

impl CrawlStatistics {
    pub fn compute(
        results: &[PageRecord],
        visited_urls_count: usize,
        domain_page_counts: &HashMap<String, usize>,
        start_domain: Option<String>,
    ) -> Self {
        let load_times: Vec<f64> = results
            .iter()
            .filter_map(PageRecord::fetch_duration_secs)
            .collect();
        let avg_load_time = if load_times.is_empty() {
            0.0
        } else {
            load_times.iter().sum::<f64>() / load_times.len() as f64
        };

        let mut domains = BTreeMap::new();
        for page in results {
            *domains.entry(page.normalized_domain()).or_insert(0) += 1;
        }

        Self {
            total_pages: results.len(),
            total_links: results.iter().map(|p| p.links.len()).sum(),
            total_words: results.iter().map(PageRecord::word_count).sum(),
            avg_load_time,
            max_depth_reached: results.iter().map(|p| p.depth).max().unwrap_or(0),
            domains,
            visited_urls_count,
            domain_page_counts: domain_page_counts
                .iter()
                .map(|(k, v)| (k.clone(), *v))
                .collect(),
            start_domain,
        }
    }
}
