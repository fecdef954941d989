//! Crawler module: the Fetch Adapter capability and its backends
//!
//! This module contains:
//! - The `FetchAdapter` trait every crawler backend implements
//! - HTTP fetching with retry and failure classification
//! - HTML/markdown link and text extraction
//! - Per-host politeness delays for local crawlers
//! - The registry mapping crawler ids to adapters

mod backends;
mod fetcher;
mod parser;
mod registry;
mod scheduler;
mod site;

pub use backends::{
    FirecrawlSource, HtmlSource, JinaSource, ScraperApiSource, ScrapingBeeSource,
};
pub use fetcher::{build_http_client, classify_request_error, classify_status, RetryPolicy};
pub use parser::{extract_html_links, extract_markdown_links, html_to_text};
pub use registry::FetchRegistry;
pub use scheduler::HostThrottle;
pub use site::{PageSource, SiteCrawler, SourcePage};

use crate::url::Domain;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Content fetched from one URL of a domain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub url: String,

    /// Short label: `homepage` or the URL path
    pub name: String,

    /// Text or markdown handed to extractors
    pub content: String,

    /// Same-site links discovered on this page, first-seen order
    #[serde(default)]
    pub links: Vec<String>,
}

/// Link counts observed on the homepage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkStats {
    pub internal: usize,
    pub external: usize,
    pub total: usize,
    /// Internal links selected for crawling
    pub crawled: usize,
}

/// A sub-page that could not be fetched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageError {
    pub url: String,
    pub message: String,
}

/// Everything one crawler produced for one domain
///
/// Pages start with the homepage, followed by discovered same-site pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSet {
    pub domain: Domain,
    pub crawler: String,
    pub pages: Vec<Page>,
    #[serde(default)]
    pub link_stats: LinkStats,
    #[serde(default)]
    pub errors: Vec<PageError>,
    pub fetched_at: DateTime<Utc>,
    #[serde(default)]
    pub duration_ms: u64,
}

impl PageSet {
    pub fn new(domain: Domain, crawler: &str) -> Self {
        Self {
            domain,
            crawler: crawler.to_string(),
            pages: Vec::new(),
            link_stats: LinkStats::default(),
            errors: Vec::new(),
            fetched_at: Utc::now(),
            duration_ms: 0,
        }
    }

    /// True when the crawl succeeded but produced no usable content
    pub fn is_empty(&self) -> bool {
        self.pages.iter().all(|p| p.content.trim().is_empty())
    }

    pub fn total_chars(&self) -> usize {
        self.pages.iter().map(|p| p.content.len()).sum()
    }

    /// Hex SHA-256 over page URLs and content
    ///
    /// Extraction artifacts record the digest of the pages they were produced
    /// from, so a re-crawl with different content invalidates them.
    pub fn content_digest(&self) -> String {
        let mut hasher = Sha256::new();
        for page in &self.pages {
            hasher.update(page.url.as_bytes());
            hasher.update([0u8]);
            hasher.update(page.content.as_bytes());
            hasher.update([1u8]);
        }
        hex::encode(hasher.finalize())
    }
}

/// Page budget for one fetch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchBudget {
    /// Maximum number of sub-pages after the homepage
    pub max_pages: usize,

    /// Preferred page paths
    pub pages: Vec<String>,
}

impl FetchBudget {
    pub fn new(max_pages: usize) -> Self {
        Self {
            max_pages,
            pages: Vec::new(),
        }
    }
}

/// Why a fetch failed
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("timed out fetching {url}")]
    Timeout { url: String },

    #[error("connection failed for {url}: {message}")]
    Connection { url: String, message: String },

    #[error("blocked with HTTP {status} at {url}")]
    Blocked { url: String, status: u16 },

    #[error("HTTP {status} at {url}")]
    Http { url: String, status: u16 },

    #[error("invalid response from {url}: {message}")]
    InvalidResponse { url: String, message: String },

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("fetch cancelled")]
    Cancelled,
}

impl FetchError {
    /// Short failure kind recorded in reports
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "timeout",
            Self::Connection { .. } => "connection",
            Self::Blocked { .. } => "blocked",
            Self::Http { .. } => "http",
            Self::InvalidResponse { .. } => "invalid_response",
            Self::InvalidUrl(_) => "invalid_url",
            Self::Cancelled => "cancelled",
        }
    }

    /// Rate limiting, forbidden and unavailable responses are retried with backoff
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Blocked { status, .. } | Self::Http { status, .. } => {
                matches!(status, 403 | 429 | 503)
            }
            _ => false,
        }
    }
}

impl From<crate::UrlError> for FetchError {
    fn from(e: crate::UrlError) -> Self {
        Self::InvalidUrl(e.to_string())
    }
}

/// Capability every crawler backend provides
///
/// Implementations return a failure kind rather than an empty page set when
/// the homepage cannot be fetched.
#[async_trait]
pub trait FetchAdapter: Send + Sync {
    /// Identifier the adapter is registered under
    fn id(&self) -> &str;

    /// Fetches the homepage and up to `budget.max_pages` same-site pages
    async fn fetch(&self, domain: &Domain, budget: &FetchBudget) -> Result<PageSet, FetchError>;
}
