use crate::schema::{company_schema, FieldSpec, Schema};
use serde::Deserialize;
use std::path::PathBuf;

/// Main configuration structure for Scrape-Bench
///
/// Every section is optional in the TOML file and falls back to its defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub run: RunConfig,
    pub concurrency: ConcurrencyConfig,
    pub http: HttpConfig,
    pub escalation: EscalationConfig,
    pub paths: PathsConfig,
    pub models: ModelsConfig,
    pub endpoints: EndpointsConfig,
    pub credentials: CredentialsConfig,
    pub schema: SchemaConfig,
}

impl Config {
    /// The schema fields are configured with, or the built-in company schema
    pub fn schema(&self) -> Schema {
        if self.schema.field.is_empty() {
            company_schema()
        } else {
            Schema::new(self.schema.field.clone())
        }
    }
}

/// What to run: backend allowlists and the page budget
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Maximum number of sub-pages crawled per domain after the homepage
    #[serde(rename = "max-pages")]
    pub max_pages: usize,

    /// Preferred page paths (e.g. "pricing"); empty means any discovered page
    pub pages: Vec<String>,

    /// Crawler ids to run
    pub crawlers: Vec<String>,

    /// Extractor ids to run
    pub extractors: Vec<String>,

    /// Persist artifacts at every stage boundary
    #[serde(rename = "save-intermediate")]
    pub save_intermediate: bool,

    /// Run-level timeout in seconds
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: Option<u64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_pages: 10,
            pages: Vec::new(),
            crawlers: vec!["custom_html".to_string()],
            extractors: vec!["openai".to_string()],
            save_intermediate: true,
            timeout_secs: None,
        }
    }
}

/// Worker pool sizes
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConcurrencyConfig {
    /// Simultaneous fetches allowed per crawler backend
    #[serde(rename = "fetch-per-crawler")]
    pub fetch_per_crawler: usize,

    /// Simultaneous extraction and judge calls across the run
    pub extract: usize,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            fetch_per_crawler: 2,
            extract: 4,
        }
    }
}

/// HTTP behavior shared by every backend client
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Total request timeout (seconds)
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    /// Connection establishment timeout (seconds)
    #[serde(rename = "connect-timeout-secs")]
    pub connect_timeout_secs: u64,

    /// Attempts per page, including the first one
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Minimum delay between requests to the same host for local crawlers (milliseconds)
    #[serde(rename = "min-delay-ms")]
    pub min_delay_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("scrape-bench/{}", env!("CARGO_PKG_VERSION")),
            timeout_secs: 60,
            connect_timeout_secs: 10,
            max_retries: 3,
            min_delay_ms: 1000,
        }
    }
}

/// Value-compare escalation settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EscalationConfig {
    pub enabled: bool,

    /// Judge ids consulted for ambiguous fields
    pub judges: Vec<String>,

    /// Re-invoke judges even when a cached vote exists
    pub force: bool,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            judges: vec!["openai".to_string()],
            force: false,
        }
    }
}

/// Filesystem locations
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    #[serde(rename = "artifact-root")]
    pub artifact_root: PathBuf,

    #[serde(rename = "output-dir")]
    pub output_dir: PathBuf,

    /// Ground-truth JSON Lines file
    #[serde(rename = "ground-truth")]
    pub ground_truth: Option<PathBuf>,

    /// Domain list CSV
    pub domains: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            artifact_root: PathBuf::from("results/intermediate"),
            output_dir: PathBuf::from("results"),
            ground_truth: None,
            domains: None,
        }
    }
}

/// Model names per extractor and judge id
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    pub openai: String,
    pub claude: String,
    pub haiku: String,

    #[serde(rename = "openai-judge")]
    pub openai_judge: String,

    #[serde(rename = "claude-judge")]
    pub claude_judge: String,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            openai: "gpt-4o-mini".to_string(),
            claude: "claude-sonnet-4-20250514".to_string(),
            haiku: "claude-3-5-haiku-20241022".to_string(),
            openai_judge: "gpt-4o".to_string(),
            claude_judge: "claude-sonnet-4-20250514".to_string(),
        }
    }
}

/// Base URLs of the remote services
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EndpointsConfig {
    pub openai: String,
    pub anthropic: String,
    pub jina: String,
    pub firecrawl: String,
    pub scrapingbee: String,
    pub scraperapi: String,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            openai: "https://api.openai.com".to_string(),
            anthropic: "https://api.anthropic.com".to_string(),
            jina: "https://r.jina.ai".to_string(),
            firecrawl: "https://api.firecrawl.dev".to_string(),
            scrapingbee: "https://app.scrapingbee.com".to_string(),
            scraperapi: "https://api.scraperapi.com".to_string(),
        }
    }
}

/// Names of the environment variables holding API keys
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    pub firecrawl: String,
    pub jina: String,
    pub scrapingbee: String,
    pub scraperapi: String,
    pub openai: String,
    pub anthropic: String,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            firecrawl: "FIRECRAWL_API_KEY".to_string(),
            jina: "JINA_API_KEY".to_string(),
            scrapingbee: "SCRAPINGBEE_API_KEY".to_string(),
            scraperapi: "SCRAPERAPI_API_KEY".to_string(),
            openai: "OPENAI_API_KEY".to_string(),
            anthropic: "ANTHROPIC_API_KEY".to_string(),
        }
    }
}

/// Optional replacement of the built-in schema
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    pub field: Vec<FieldSpec>,
}
