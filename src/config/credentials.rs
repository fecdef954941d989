use crate::config::types::{Config, CredentialsConfig};
use crate::{ConfigError, ConfigResult};
use std::collections::HashMap;

/// Crawler backends known to the fetch registry
pub const CRAWLER_IDS: &[&str] = &[
    "custom_html",
    "jina",
    "firecrawl",
    "scrapingbee",
    "scraperapi",
];

/// Extractor backends known to the extractor registry
pub const EXTRACTOR_IDS: &[&str] = &["openai", "claude", "haiku"];

/// Judges known to the escalation registry
pub const JUDGE_IDS: &[&str] = &["openai", "claude"];

/// A remote service that needs an API key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    Firecrawl,
    Jina,
    ScrapingBee,
    ScraperApi,
    OpenAi,
    Anthropic,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Firecrawl => "firecrawl",
            Self::Jina => "jina",
            Self::ScrapingBee => "scrapingbee",
            Self::ScraperApi => "scraperapi",
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
        }
    }

    /// Name of the environment variable configured for this provider
    pub fn env_var<'a>(&self, config: &'a CredentialsConfig) -> &'a str {
        match self {
            Self::Firecrawl => &config.firecrawl,
            Self::Jina => &config.jina,
            Self::ScrapingBee => &config.scrapingbee,
            Self::ScraperApi => &config.scraperapi,
            Self::OpenAi => &config.openai,
            Self::Anthropic => &config.anthropic,
        }
    }
}

/// Provider a crawler needs, `None` for local crawlers
pub fn crawler_provider(id: &str) -> ConfigResult<Option<Provider>> {
    match id {
        "custom_html" => Ok(None),
        "jina" => Ok(Some(Provider::Jina)),
        "firecrawl" => Ok(Some(Provider::Firecrawl)),
        "scrapingbee" => Ok(Some(Provider::ScrapingBee)),
        "scraperapi" => Ok(Some(Provider::ScraperApi)),
        _ => Err(ConfigError::UnknownBackend {
            kind: "crawler",
            id: id.to_string(),
        }),
    }
}

pub fn extractor_provider(id: &str) -> ConfigResult<Provider> {
    match id {
        "openai" => Ok(Provider::OpenAi),
        "claude" | "haiku" => Ok(Provider::Anthropic),
        _ => Err(ConfigError::UnknownBackend {
            kind: "extractor",
            id: id.to_string(),
        }),
    }
}

pub fn judge_provider(id: &str) -> ConfigResult<Provider> {
    match id {
        "openai" => Ok(Provider::OpenAi),
        "claude" => Ok(Provider::Anthropic),
        _ => Err(ConfigError::UnknownBackend {
            kind: "judge",
            id: id.to_string(),
        }),
    }
}

/// Resolved API keys
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    keys: HashMap<Provider, String>,
}

impl Credentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, provider: Provider, key: impl Into<String>) -> Self {
        self.keys.insert(provider, key.into());
        self
    }

    pub fn get(&self, provider: Provider) -> Option<&str> {
        self.keys.get(&provider).map(String::as_str)
    }

    /// Returns the key, or an empty string for providers that were not required
    pub fn key(&self, provider: Provider) -> String {
        self.get(provider).unwrap_or_default().to_string()
    }
}

/// Resolves the keys of every selected backend from the process environment
pub fn resolve_credentials(config: &Config) -> ConfigResult<Credentials> {
    resolve_credentials_with(config, |var| std::env::var(var).ok())
}

/// Resolves keys through `lookup`; a selected backend with no key is fatal
pub fn resolve_credentials_with<F>(config: &Config, lookup: F) -> ConfigResult<Credentials>
where
    F: Fn(&str) -> Option<String>,
{
    let mut needed: Vec<(String, Provider)> = Vec::new();

    for id in &config.run.crawlers {
        if let Some(provider) = crawler_provider(id)? {
            needed.push((format!("crawler '{}'", id), provider));
        }
    }
    for id in &config.run.extractors {
        needed.push((format!("extractor '{}'", id), extractor_provider(id)?));
    }
    if config.escalation.enabled {
        for id in &config.escalation.judges {
            needed.push((format!("judge '{}'", id), judge_provider(id)?));
        }
    }

    let mut credentials = Credentials::new();
    for (backend, provider) in needed {
        if credentials.get(provider).is_some() {
            continue;
        }
        let var = provider.env_var(&config.credentials);
        match lookup(var).filter(|v| !v.trim().is_empty()) {
            Some(key) => credentials = credentials.with(provider, key),
            None => {
                return Err(ConfigError::MissingCredential {
                    backend,
                    var: var.to_string(),
                })
            }
        }
    }

    Ok(credentials)
}
