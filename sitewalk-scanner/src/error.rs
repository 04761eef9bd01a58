use std::fmt;
use thiserror::Error;

/// Benign reasons for not producing a page. Logged, never surfaced as failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    AlreadyVisited,
    NotHttp,
    InvalidDomain,
    NotHtml(String),
    TooSmall(usize),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::AlreadyVisited => write!(f, "Already visited"),
            SkipReason::NotHttp => write!(f, "Not HTTP/HTTPS URL"),
            SkipReason::InvalidDomain => write!(f, "Invalid domain"),
            SkipReason::NotHtml(content_type) => write!(f, "Not HTML content ({})", content_type),
            SkipReason::TooSmall(len) => write!(f, "Content too small ({} bytes)", len),
        }
    }
}

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Skipped: {0}")]
    Rejected(SkipReason),

    #[error("Task join error: {0}")]
    JoinError(#[from] tokio::task::JoinError),
}

impl ScanError {
    /// Sorts a reqwest failure into timeout, connection, or generic HTTP error.
    pub fn from_request(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ScanError::Timeout(url.to_string())
        } else if err.is_connect() {
            ScanError::Connect(format!("{}: {}", url, err))
        } else if let Some(status) = err.status() {
            ScanError::Status(status.as_u16())
        } else {
            ScanError::HttpError(err)
        }
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;
