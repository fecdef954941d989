use super::llm_extractor::LlmExtractor;
use super::Extractor;
use crate::config::{Config, Credentials, Provider};
use crate::llm::{build_llm_client, AnthropicClient, ChatModel, OpenAiClient};
use crate::{BenchError, ConfigError};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Maps extractor ids to Extractor Adapter implementations
#[derive(Clone, Default)]
pub struct ExtractorRegistry {
    extractors: BTreeMap<String, Arc<dyn Extractor>>,
}

impl ExtractorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `extractor` under its own id, replacing any previous entry
    pub fn register(&mut self, extractor: Arc<dyn Extractor>) {
        let id = extractor.id().to_string();
        self.extractors.insert(id, extractor);
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn Extractor>> {
        self.extractors.get(id).cloned()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.extractors.keys().map(String::as_str).collect()
    }

    /// Builds extractors for every id selected in `config`
    pub fn from_config(config: &Config, credentials: &Credentials) -> Result<Self, BenchError> {
        let client = build_llm_client(&config.http)?;
        let endpoints = &config.endpoints;
        let models = &config.models;

        let mut registry = Self::new();
        for id in &config.run.extractors {
            let model: Arc<dyn ChatModel> = match id.as_str() {
                "openai" => Arc::new(OpenAiClient::new(
                    client.clone(),
                    &endpoints.openai,
                    &credentials.key(Provider::OpenAi),
                    &models.openai,
                )),
                "claude" => Arc::new(AnthropicClient::new(
                    client.clone(),
                    &endpoints.anthropic,
                    &credentials.key(Provider::Anthropic),
                    &models.claude,
                )),
                "haiku" => Arc::new(AnthropicClient::new(
                    client.clone(),
                    &endpoints.anthropic,
                    &credentials.key(Provider::Anthropic),
                    &models.haiku,
                )),
                other => {
                    return Err(ConfigError::UnknownBackend {
                        kind: "extractor",
                        id: other.to_string(),
                    }
                    .into())
                }
            };
            registry.register(Arc::new(LlmExtractor::new(id, model)));
        }

        Ok(registry)
    }
}

impl std::fmt::Debug for ExtractorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractorRegistry")
            .field("ids", &self.ids())
            .finish()
    }
}
