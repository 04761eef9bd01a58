use crate::normalize::domain_of;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use std::time::Duration;
use url::Url;

/// Title used when a page has no (or an empty) `<title>`.
pub const UNTITLED: &str = "No Title";

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));
static SPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// One successfully fetched and parsed page. Built once per fetch and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRecord {
    pub title: String,
    pub url: String,
    /// Raw HTML as served.
    pub content: String,
    /// Readable body text extracted from `content`.
    #[serde(default)]
    pub text: String,
    pub depth: usize,
    pub links: Vec<String>,
    pub fetch_duration: Option<Duration>,
    pub fetched_at: DateTime<Utc>,
}

impl PageRecord {
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        content: impl Into<String>,
        depth: usize,
        links: Vec<String>,
        fetch_duration: Option<Duration>,
    ) -> Self {
        let title = title.into();
        let title = if title.trim().is_empty() {
            UNTITLED.to_string()
        } else {
            title.trim().to_string()
        };

        Self {
            title,
            url: url.into(),
            content: content.into(),
            text: String::new(),
            depth,
            links,
            fetch_duration,
            fetched_at: Utc::now(),
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn fetch_duration_secs(&self) -> Option<f64> {
        self.fetch_duration.map(|d| d.as_secs_f64())
    }

    /// Number of whitespace-separated words once markup is stripped.
    pub fn word_count(&self) -> usize {
        if self.content.is_empty() {
            return 0;
        }
        TAG_RE.replace_all(&self.content, " ").split_whitespace().count()
    }

    /// Host (and explicit port) exactly as fetched.
    pub fn domain(&self) -> String {
        Url::parse(&self.url)
            .ok()
            .and_then(|u| {
                u.host_str().map(|host| match u.port() {
                    Some(port) => format!("{}:{}", host, port),
                    None => host.to_string(),
                })
            })
            .unwrap_or_default()
    }

    pub fn normalized_domain(&self) -> String {
        domain_of(&self.url)
    }

    /// Case-insensitive substring search over the page content. An empty
    /// query matches nothing.
    pub fn matches(&self, query: &str) -> bool {
        if query.is_empty() || self.content.is_empty() {
            return false;
        }
        self.content.to_lowercase().contains(&query.to_lowercase())
    }

    pub fn text_preview(&self, max_chars: usize) -> String {
        if self.content.is_empty() {
            return "No content available".to_string();
        }
        let stripped = TAG_RE.replace_all(&self.content, " ");
        let collapsed = SPACE_RE.replace_all(stripped.trim(), " ");

        if collapsed.chars().count() > max_chars {
            let cut: String = collapsed.chars().take(max_chars).collect();
            format!("{}...", cut)
        } else {
            collapsed.into_owned()
        }
    }
}
