//! Chat-model clients shared by extractors and judges
//!
//! Both providers are reached over plain HTTP with `reqwest`. Callers only see
//! the [`ChatModel`] trait: a system prompt and a user prompt in, raw text out.

mod anthropic;
mod openai;

pub use anthropic::AnthropicClient;
pub use openai::OpenAiClient;

use crate::config::HttpConfig;
use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde_json::{Map, Value};
use std::sync::LazyLock;
use std::time::Duration;
use thiserror::Error;

/// Errors returned by chat-model calls
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LlmError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("Server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Request(format!("timed out: {}", e))
        } else if e.is_decode() {
            Self::InvalidResponse(e.to_string())
        } else {
            Self::Request(e.to_string())
        }
    }
}

/// A single-turn chat completion capability
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Model name sent to the provider
    fn model(&self) -> &str;

    async fn complete(&self, system: &str, user: &str) -> Result<String, LlmError>;
}

/// Upper bound on the number of tokens a completion may produce
pub const MAX_COMPLETION_TOKENS: u32 = 8000;

/// Long completions take minutes, unlike page fetches
const COMPLETION_TIMEOUT: Duration = Duration::from_secs(300);

/// Builds the HTTP client used for model calls
pub fn build_llm_client(config: &HttpConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(&config.user_agent)
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .timeout(COMPLETION_TIMEOUT.max(Duration::from_secs(config.timeout_secs)))
        .build()
}

static FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:json)?\s*\n?(.*?)\n?```").expect("Invalid fenced block regex")
});

/// Pulls a JSON object out of model output
///
/// Tries the whole text, then a fenced code block, then the span from the first
/// `{` to the last `}`.
pub fn parse_json_object(text: &str) -> Option<Map<String, Value>> {
    let as_object = |candidate: &str| match serde_json::from_str::<Value>(candidate.trim()) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    };

    if let Some(map) = as_object(text) {
        return Some(map);
    }

    if let Some(map) = FENCED_BLOCK
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| as_object(m.as_str()))
    {
        return Some(map);
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    as_object(&text[start..=end])
}

/// Truncates text for log and error messages
pub(crate) fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
