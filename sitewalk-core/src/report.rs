// Report and export generation from crawl results

use crate::crawl::{CrawlRun, extract_url_path, outcome_description};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sitewalk_scanner::{CrawlStatistics, PageRecord};
use sitewalk_scanner::crawler::CrawlOutcome;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs::File;
use std::io::Write;
use std::path::Path;

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    Text,
    Json,
    Sitemap,
    Tree,
    TreeJson,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            "sitemap" | "xml" => Some(ReportFormat::Sitemap),
            "tree" => Some(ReportFormat::Tree),
            "tree-json" => Some(ReportFormat::TreeJson),
            _ => None,
        }
    }
}

/// Flattened page shape used by the JSON export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageExport {
    pub title: String,
    pub url: String,
    pub depth: usize,
    pub links: Vec<String>,
    pub word_count: usize,
    pub load_time: Option<f64>,
    pub domain: String,
    pub normalized_domain: String,
    pub timestamp: DateTime<Utc>,
}

impl From<&PageRecord> for PageExport {
    fn from(page: &PageRecord) -> Self {
        Self {
            title: page.title.clone(),
            url: page.url.clone(),
            depth: page.depth,
            links: page.links.clone(),
            word_count: page.word_count(),
            load_time: page.fetch_duration_secs(),
            domain: page.domain(),
            normalized_domain: page.normalized_domain(),
            timestamp: page.fetched_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SitemapNode {
    pub title: String,
    pub url: String,
    pub children: Vec<SitemapNode>,
}

pub fn pages_to_json(pages: &[PageRecord]) -> Result<String, serde_json::Error> {
    let export: Vec<PageExport> = pages.iter().map(PageExport::from).collect();
    serde_json::to_string_pretty(&export)
}

/// sitemaps.org `urlset` listing every crawled page in result order.
pub fn sitemap_xml(pages: &[PageRecord]) -> String {
    let mut xml = String::new();
    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str("<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n");
    for page in pages {
        xml.push_str("  <url>\n");
        xml.push_str(&format!("    <loc>{}</loc>\n", escape_xml(&page.url)));
        xml.push_str("  </url>\n");
    }
    xml.push_str("</urlset>\n");
    xml
}

fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Link hierarchy rooted at the first result.
///
/// A page's children are the links that were themselves crawled. Each URL is
/// placed once, under the first parent that reaches it depth-first.
pub fn build_sitemap_tree(pages: &[PageRecord]) -> Option<SitemapNode> {
    let root = pages.first()?;
    let by_url: HashMap<&str, &PageRecord> = pages.iter().map(|p| (p.url.as_str(), p)).collect();

    let mut placed = HashSet::new();
    placed.insert(root.url.as_str());
    Some(tree_node(root, &by_url, &mut placed))
}

fn tree_node<'a>(
    page: &'a PageRecord,
    by_url: &HashMap<&'a str, &'a PageRecord>,
    placed: &mut HashSet<&'a str>,
) -> SitemapNode {
    let mut children = Vec::new();
    for link in &page.links {
        let Some(&child) = by_url.get(link.as_str()) else {
            continue;
        };
        if placed.insert(child.url.as_str()) {
            children.push(tree_node(child, by_url, placed));
        }
    }

    SitemapNode {
        title: page.title.clone(),
        url: page.url.clone(),
        children,
    }
}

pub fn sitemap_tree_json(pages: &[PageRecord]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&build_sitemap_tree(pages))
}

/// Renders the sitemap hierarchy with box-drawing connectors.
pub fn render_sitemap_tree(root: &SitemapNode) -> String {
    let mut out = format!("{} ({})\n", root.title, root.url);
    render_children(&root.children, "", &mut out);
    out
}

fn render_children(children: &[SitemapNode], indent: &str, out: &mut String) {
    for (i, child) in children.iter().enumerate() {
        let is_last = i == children.len() - 1;
        let prefix = if is_last { "└── " } else { "├── " };
        out.push_str(&format!(
            "{}{}{} ({})\n",
            indent,
            prefix,
            child.title,
            extract_url_path(&child.url)
        ));
        let next_indent = format!("{}{}", indent, if is_last { "    " } else { "│   " });
        render_children(&child.children, &next_indent, out);
    }
}

/// Generate a human-readable crawl summary
pub fn generate_crawl_report(
    pages: &[PageRecord],
    stats: &CrawlStatistics,
    outcome: CrawlOutcome,
) -> String {
    let mut report = String::new();
    report.push_str(RULE);
    report.push_str("\n\n# Summary:\n");
    if let Some(ref domain) = stats.start_domain {
        report.push_str(&format!("  Start domain: {}\n", domain));
    }
    report.push_str(&format!("  Stopped: {}\n", outcome_description(outcome)));
    report.push_str(&format!("  Pages crawled: {}\n", stats.total_pages));
    report.push_str(&format!("  URLs visited: {}\n", stats.visited_urls_count));
    report.push_str(&format!("  Total links found: {}\n", stats.total_links));
    report.push_str(&format!("  Total words: {}\n", stats.total_words));
    report.push_str(&format!("  Average load time: {:.2}s\n", stats.avg_load_time));
    report.push_str(&format!("  Max depth reached: {}\n", stats.max_depth_reached));

    if !stats.domain_page_counts.is_empty() {
        report.push_str("\n# Requests per domain:\n");
        for (domain, count) in &stats.domain_page_counts {
            let stored = stats.domains.get(domain).copied().unwrap_or(0);
            report.push_str(&format!("  {}: {} requested, {} stored\n", domain, count, stored));
        }
    }

    report.push('\n');
    report.push_str(RULE);
    report.push_str("\n\n");

    // Group pages by domain, keeping result order within each group
    let mut by_domain: BTreeMap<String, Vec<&PageRecord>> = BTreeMap::new();
    for page in pages {
        by_domain
            .entry(page.normalized_domain())
            .or_default()
            .push(page);
    }

    for (domain, domain_pages) in &by_domain {
        report.push_str(&format!("## {}\n", domain));
        report.push_str(&format!("  {} pages found\n\n", domain_pages.len()));
        for page in domain_pages {
            report.push_str(&format!(
                "  [{}] {} - {}\n",
                page.depth,
                extract_url_path(&page.url),
                page.title
            ));
        }
        report.push('\n');
    }

    report
}

/// Renders a finished crawl in the requested format.
pub fn render_report(run: &CrawlRun, format: ReportFormat) -> Result<String, serde_json::Error> {
    match format {
        ReportFormat::Text => Ok(generate_crawl_report(&run.pages, &run.stats, run.outcome)),
        ReportFormat::Json => pages_to_json(&run.pages),
        ReportFormat::Sitemap => Ok(sitemap_xml(&run.pages)),
        ReportFormat::Tree => Ok(build_sitemap_tree(&run.pages)
            .map(|root| render_sitemap_tree(&root))
            .unwrap_or_else(|| "  (empty)\n".to_string())),
        ReportFormat::TreeJson => sitemap_tree_json(&run.pages),
    }
}

pub fn save_report(content: &str, path: &Path) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}
