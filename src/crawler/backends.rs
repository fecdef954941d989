//! Page sources for each crawler backend
//!
//! | Id | Source | Raw HTML |
//! |----|--------|----------|
//! | `custom_html` | direct GET | yes |
//! | `jina` | Jina Reader, markdown | no |
//! | `firecrawl` | Firecrawl scrape API, markdown | no |
//! | `scrapingbee` | ScrapingBee proxy | yes |
//! | `scraperapi` | ScraperAPI proxy | yes |

use super::fetcher::send_for_text;
use super::parser::html_to_text;
use super::site::{PageSource, SourcePage};
use super::FetchError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use url::Url;

fn html_page(body: String) -> SourcePage {
    SourcePage {
        content: html_to_text(&body),
        html: Some(body),
    }
}

/// Direct HTTP fetch from our own IP
pub struct HtmlSource {
    client: Client,
}

impl HtmlSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageSource for HtmlSource {
    fn id(&self) -> &str {
        "custom_html"
    }

    fn is_local(&self) -> bool {
        true
    }

    async fn fetch_page(&self, url: &Url) -> Result<SourcePage, FetchError> {
        let body = send_for_text(url.as_str(), self.client.get(url.clone())).await?;
        Ok(html_page(body))
    }
}

/// Jina Reader: `GET <base>/<url>` returning markdown
pub struct JinaSource {
    client: Client,
    base_url: String,
    api_key: String,
}

impl JinaSource {
    pub fn new(client: Client, base_url: &str, api_key: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl PageSource for JinaSource {
    fn id(&self) -> &str {
        "jina"
    }

    async fn fetch_page(&self, url: &Url) -> Result<SourcePage, FetchError> {
        let reader_url = format!("{}/{}", self.base_url, url);
        let request = self
            .client
            .get(&reader_url)
            .bearer_auth(&self.api_key)
            .header("Accept", "text/markdown")
            .header("X-Return-Format", "markdown");

        let content = send_for_text(url.as_str(), request).await?;
        Ok(SourcePage {
            content,
            html: None,
        })
    }
}

/// Firecrawl: `POST <base>/v1/scrape`, markdown in `data.markdown`
pub struct FirecrawlSource {
    client: Client,
    base_url: String,
    api_key: String,
}

impl FirecrawlSource {
    pub fn new(client: Client, base_url: &str, api_key: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl PageSource for FirecrawlSource {
    fn id(&self) -> &str {
        "firecrawl"
    }

    async fn fetch_page(&self, url: &Url) -> Result<SourcePage, FetchError> {
        let request = self
            .client
            .post(format!("{}/v1/scrape", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&json!({
                "url": url.as_str(),
                "formats": ["markdown"],
                "excludeTags": ["img"],
                "removeBase64Images": true,
            }));

        let body = send_for_text(url.as_str(), request).await?;
        let invalid = |message: String| FetchError::InvalidResponse {
            url: url.to_string(),
            message,
        };

        let data: Value = serde_json::from_str(&body).map_err(|e| invalid(e.to_string()))?;
        if data.get("success").and_then(Value::as_bool) == Some(false) {
            let reason = data
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("scrape reported failure");
            return Err(invalid(reason.to_string()));
        }

        let content = data
            .pointer("/data/markdown")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid("missing data.markdown".to_string()))?;

        Ok(SourcePage {
            content: content.to_string(),
            html: None,
        })
    }
}

/// ScrapingBee: `GET <base>/api/v1?api_key&url&render_js=false`
pub struct ScrapingBeeSource {
    client: Client,
    base_url: String,
    api_key: String,
}

impl ScrapingBeeSource {
    pub fn new(client: Client, base_url: &str, api_key: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl PageSource for ScrapingBeeSource {
    fn id(&self) -> &str {
        "scrapingbee"
    }

    async fn fetch_page(&self, url: &Url) -> Result<SourcePage, FetchError> {
        let request = self
            .client
            .get(format!("{}/api/v1", self.base_url))
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("url", url.as_str()),
                ("render_js", "false"),
            ]);

        let body = send_for_text(url.as_str(), request).await?;
        Ok(html_page(body))
    }
}

/// ScraperAPI: `GET <base>/?api_key&url`
pub struct ScraperApiSource {
    client: Client,
    base_url: String,
    api_key: String,
}

impl ScraperApiSource {
    pub fn new(client: Client, base_url: &str, api_key: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl PageSource for ScraperApiSource {
    fn id(&self) -> &str {
        "scraperapi"
    }

    async fn fetch_page(&self, url: &Url) -> Result<SourcePage, FetchError> {
        let request = self
            .client
            .get(format!("{}/", self.base_url))
            .query(&[("api_key", self.api_key.as_str()), ("url", url.as_str())]);

        let body = send_for_text(url.as_str(), request).await?;
        Ok(html_page(body))
    }
}
