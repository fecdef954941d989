use super::backends::{FirecrawlSource, HtmlSource, JinaSource, ScraperApiSource, ScrapingBeeSource};
use super::fetcher::{build_http_client, RetryPolicy};
use super::scheduler::HostThrottle;
use super::site::SiteCrawler;
use super::FetchAdapter;
use crate::config::{Config, Credentials, Provider};
use crate::{BenchError, ConfigError};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Maps crawler ids to Fetch Adapter implementations
#[derive(Clone, Default)]
pub struct FetchRegistry {
    adapters: BTreeMap<String, Arc<dyn FetchAdapter>>,
}

impl FetchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `adapter` under its own id, replacing any previous entry
    pub fn register(&mut self, adapter: Arc<dyn FetchAdapter>) {
        self.adapters.insert(adapter.id().to_string(), adapter);
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn FetchAdapter>> {
        self.adapters.get(id).cloned()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.adapters.keys().map(String::as_str).collect()
    }

    /// Builds adapters for every crawler selected in `config`
    pub fn from_config(config: &Config, credentials: &Credentials) -> Result<Self, BenchError> {
        let client = build_http_client(&config.http)?;
        let retry = RetryPolicy::from(&config.http);
        let throttle = Arc::new(HostThrottle::new(Duration::from_millis(config.http.min_delay_ms)));
        let endpoints = &config.endpoints;
        let key = |provider: Provider| credentials.key(provider);

        let mut registry = Self::new();
        for id in &config.run.crawlers {
            let adapter: Arc<dyn FetchAdapter> = match id.as_str() {
                "custom_html" => Arc::new(
                    SiteCrawler::new(HtmlSource::new(client.clone()), retry)
                        .with_throttle(Arc::clone(&throttle)),
                ),
                "jina" => Arc::new(SiteCrawler::new(
                    JinaSource::new(client.clone(), &endpoints.jina, &key(Provider::Jina)),
                    retry,
                )),
                "firecrawl" => Arc::new(SiteCrawler::new(
                    FirecrawlSource::new(
                        client.clone(),
                        &endpoints.firecrawl,
                        &key(Provider::Firecrawl),
                    ),
                    retry,
                )),
                "scrapingbee" => Arc::new(SiteCrawler::new(
                    ScrapingBeeSource::new(
                        client.clone(),
                        &endpoints.scrapingbee,
                        &key(Provider::ScrapingBee),
                    ),
                    retry,
                )),
                "scraperapi" => Arc::new(SiteCrawler::new(
                    ScraperApiSource::new(
                        client.clone(),
                        &endpoints.scraperapi,
                        &key(Provider::ScraperApi),
                    ),
                    retry,
                )),
                other => {
                    return Err(ConfigError::UnknownBackend {
                        kind: "crawler",
                        id: other.to_string(),
                    }
                    .into())
                }
            };
            registry.register(adapter);
        }

        Ok(registry)
    }
}

impl std::fmt::Debug for FetchRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchRegistry")
            .field("ids", &self.ids())
            .finish()
    }
}
