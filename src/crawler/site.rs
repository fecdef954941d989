//! Homepage-first site crawl shared by every backend
//!
//! A backend only knows how to fetch one URL (`PageSource`). `SiteCrawler`
//! turns that into the full Fetch Adapter behavior: homepage first, link
//! discovery, then discovered pages up to the budget.

use super::fetcher::RetryPolicy;
use super::parser::{extract_html_links, extract_markdown_links};
use super::scheduler::HostThrottle;
use super::{FetchAdapter, FetchBudget, FetchError, LinkStats, Page, PageError, PageSet};
use crate::url::{filter_links, is_same_site, page_name, prioritize_links, Domain};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use url::Url;

/// Result of fetching one URL through a backend
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourcePage {
    /// Text or markdown for extractors
    pub content: String,

    /// Raw HTML, when the backend sees it
    pub html: Option<String>,
}

/// Single-URL fetch capability of a crawler backend
#[async_trait]
pub trait PageSource: Send + Sync {
    fn id(&self) -> &str;

    /// Local sources hit sites from our own IP and are throttled per host
    fn is_local(&self) -> bool {
        false
    }

    async fn fetch_page(&self, url: &Url) -> Result<SourcePage, FetchError>;
}

/// Fetch Adapter built from a `PageSource`
pub struct SiteCrawler<S> {
    source: S,
    retry: RetryPolicy,
    throttle: Option<Arc<HostThrottle>>,
    scheme: String,
}

impl<S: PageSource> SiteCrawler<S> {
    pub fn new(source: S, retry: RetryPolicy) -> Self {
        Self {
            source,
            retry,
            throttle: None,
            scheme: "https".to_string(),
        }
    }

    /// Applies a shared per-host throttle; only local sources use it
    pub fn with_throttle(mut self, throttle: Arc<HostThrottle>) -> Self {
        if self.source.is_local() {
            self.throttle = Some(throttle);
        }
        self
    }

    /// Scheme used to build the homepage URL (default `https`)
    pub fn with_scheme(mut self, scheme: &str) -> Self {
        self.scheme = scheme.to_string();
        self
    }

    async fn fetch_with_retries(&self, url: &Url) -> Result<SourcePage, FetchError> {
        self.retry
            .run(|| async {
                if let Some(throttle) = &self.throttle {
                    throttle.wait_turn(url.host_str().unwrap_or_default()).await;
                }
                self.source.fetch_page(url).await
            })
            .await
    }
}

/// Raw link targets of a fetched page, preferring its HTML
fn raw_links(page: &SourcePage) -> Vec<String> {
    match &page.html {
        Some(html) => extract_html_links(html),
        None => extract_markdown_links(&page.content),
    }
}

/// Same-site links of a page, resolved against the page URL
fn same_site_links(page: &SourcePage, url: &Url, base_host: &str) -> Vec<String> {
    let raw = raw_links(page);
    filter_links(raw.iter().map(String::as_str), url)
        .internal
        .into_iter()
        .filter(|u| is_same_site(u.host_str().unwrap_or_default(), base_host))
        .map(|u| u.to_string())
        .collect()
}

#[async_trait]
impl<S: PageSource> FetchAdapter for SiteCrawler<S> {
    fn id(&self) -> &str {
        self.source.id()
    }

    async fn fetch(&self, domain: &Domain, budget: &FetchBudget) -> Result<PageSet, FetchError> {
        let start = Instant::now();
        let base = domain.base_url(&self.scheme)?;
        let base_host = base.host_str().unwrap_or_default().to_string();
        let mut set = PageSet::new(domain.clone(), self.source.id());

        // Homepage failure fails the whole fetch
        let homepage = self.fetch_with_retries(&base).await?;

        let raw = raw_links(&homepage);
        let discovered = filter_links(raw.iter().map(String::as_str), &base);
        let targets = prioritize_links(&discovered.internal, &budget.pages, budget.max_pages);

        set.link_stats = LinkStats {
            internal: discovered.internal.len(),
            external: discovered.external.len(),
            total: discovered.internal.len() + discovered.external.len(),
            crawled: targets.len(),
        };

        tracing::debug!(
            "{} [{}]: {} internal, {} external links, crawling {}",
            domain,
            self.source.id(),
            set.link_stats.internal,
            set.link_stats.external,
            targets.len()
        );

        if !homepage.content.trim().is_empty() {
            set.pages.push(Page {
                url: base.to_string(),
                name: page_name(&base),
                content: homepage.content,
                links: discovered.internal.iter().map(|u| u.to_string()).collect(),
            });
        }

        for url in targets {
            let name = page_name(&url);
            if set.pages.iter().any(|p| p.name == name) {
                continue;
            }

            match self.fetch_with_retries(&url).await {
                Ok(page) => {
                    if page.content.trim().is_empty() {
                        continue;
                    }
                    let links = same_site_links(&page, &url, &base_host);
                    set.pages.push(Page {
                        url: url.to_string(),
                        name,
                        content: page.content,
                        links,
                    });
                }
                Err(e) => {
                    tracing::debug!("{} [{}]: {}", domain, self.source.id(), e);
                    set.errors.push(PageError {
                        url: url.to_string(),
                        message: e.to_string(),
                    });
                }
            }
        }

        set.duration_ms = start.elapsed().as_millis() as u64;
        Ok(set)
    }
}
