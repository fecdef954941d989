use super::judge::LlmJudge;
use super::Judge;
use crate::config::{Config, Credentials, Provider};
use crate::llm::{build_llm_client, AnthropicClient, ChatModel, OpenAiClient};
use crate::{BenchError, ConfigError};
use std::sync::Arc;

/// Ordered panel of judges consulted for escalation
#[derive(Clone, Default)]
pub struct JudgeRegistry {
    judges: Vec<Arc<dyn Judge>>,
}

impl JudgeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `judge`, replacing an earlier judge with the same id in place
    pub fn register(&mut self, judge: Arc<dyn Judge>) {
        match self.judges.iter_mut().find(|j| j.id() == judge.id()) {
            Some(slot) => *slot = judge,
            None => self.judges.push(judge),
        }
    }

    pub fn judges(&self) -> &[Arc<dyn Judge>] {
        &self.judges
    }

    pub fn ids(&self) -> Vec<&str> {
        self.judges.iter().map(|j| j.id()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.judges.is_empty()
    }

    /// Builds the configured judges; empty when escalation is disabled
    pub fn from_config(config: &Config, credentials: &Credentials) -> Result<Self, BenchError> {
        let mut registry = Self::new();
        if !config.escalation.enabled {
            return Ok(registry);
        }

        let client = build_llm_client(&config.http)?;
        for id in &config.escalation.judges {
            let model: Arc<dyn ChatModel> = match id.as_str() {
                "openai" => Arc::new(OpenAiClient::new(
                    client.clone(),
                    &config.endpoints.openai,
                    &credentials.key(Provider::OpenAi),
                    &config.models.openai_judge,
                )),
                "claude" => Arc::new(AnthropicClient::new(
                    client.clone(),
                    &config.endpoints.anthropic,
                    &credentials.key(Provider::Anthropic),
                    &config.models.claude_judge,
                )),
                other => {
                    return Err(ConfigError::UnknownBackend {
                        kind: "judge",
                        id: other.to_string(),
                    }
                    .into())
                }
            };
            registry.register(Arc::new(LlmJudge::new(id, model)));
        }

        Ok(registry)
    }
}

impl std::fmt::Debug for JudgeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JudgeRegistry")
            .field("ids", &self.ids())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_escalation_builds_nothing() {
        let registry = JudgeRegistry::from_config(&Config::default(), &Credentials::new()).unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_from_config_keeps_order() {
        let mut config = Config::default();
        config.escalation.enabled = true;
        config.escalation.judges = vec!["claude".to_string(), "openai".to_string()];
        let credentials = Credentials::new()
            .with(Provider::OpenAi, "sk")
            .with(Provider::Anthropic, "ak");

        let registry = JudgeRegistry::from_config(&config, &credentials).unwrap();
        assert_eq!(registry.ids(), vec!["claude", "openai"]);
    }
}
