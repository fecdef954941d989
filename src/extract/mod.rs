//! Extractor module: the Extractor Adapter capability and its LLM backends
//!
//! This module contains:
//! - The `Extractor` trait every extraction backend implements
//! - Page content preparation and prompt construction
//! - Normalization of model output into schema-shaped values
//! - The registry mapping extractor ids to adapters

mod content;
mod llm_extractor;
mod normalize;
mod prompt;
mod registry;

pub use content::{
    clean_page, prepare_content, truncate_chars, MAX_CHARS_PER_PAGE, MAX_TOTAL_CHARS,
    TRUNCATION_MARKER,
};
pub use llm_extractor::LlmExtractor;
pub use normalize::{normalize_fields, normalize_value};
pub use prompt::{build_prompt, SYSTEM_PROMPT};
pub use registry::ExtractorRegistry;

use crate::crawler::PageSet;
use crate::schema::Schema;
use crate::url::Domain;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// Field values produced by one extractor call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedFields {
    /// One entry per schema field, `null` when absent
    pub fields: BTreeMap<String, Value>,
    pub raw_response: String,
}

/// Extracted field values for one (domain, crawler, extractor) unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionRecord {
    pub domain: Domain,
    pub crawler: String,
    pub extractor: String,
    pub fields: BTreeMap<String, Value>,
    #[serde(default)]
    pub raw_response: String,
    pub extracted_at: DateTime<Utc>,
}

impl ExtractionRecord {
    pub fn new(
        domain: &Domain,
        crawler: &str,
        extractor: &str,
        extracted: ExtractedFields,
    ) -> Self {
        Self {
            domain: domain.clone(),
            crawler: crawler.to_string(),
            extractor: extractor.to_string(),
            fields: extracted.fields,
            raw_response: extracted.raw_response,
            extracted_at: Utc::now(),
        }
    }

    /// Record with every schema field absent, used for empty page sets
    pub fn all_absent(domain: &Domain, crawler: &str, extractor: &str, schema: &Schema) -> Self {
        let fields = schema
            .fields()
            .iter()
            .map(|f| (f.name.clone(), Value::Null))
            .collect();
        Self::new(
            domain,
            crawler,
            extractor,
            ExtractedFields {
                fields,
                raw_response: String::new(),
            },
        )
    }

    /// Value for `field`; a missing key reads as `null`
    pub fn value(&self, field: &str) -> &Value {
        self.fields.get(field).unwrap_or(&Value::Null)
    }
}

/// Why an extraction failed
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ExtractError {
    #[error("Extractor backend error: {0}")]
    Backend(String),

    #[error("Malformed extractor response: {0}")]
    MalformedResponse(String),

    #[error("Extraction cancelled")]
    Cancelled,
}

impl ExtractError {
    /// Short failure label used in reports
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Backend(_) => "backend",
            Self::MalformedResponse(_) => "malformed_response",
            Self::Cancelled => "cancelled",
        }
    }
}

impl From<crate::llm::LlmError> for ExtractError {
    fn from(e: crate::llm::LlmError) -> Self {
        Self::Backend(e.to_string())
    }
}

/// Extractor Adapter: turns page content into schema field values
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Registry identifier, e.g. `openai`
    fn id(&self) -> &str;

    async fn extract(
        &self,
        pages: &PageSet,
        schema: &Schema,
    ) -> Result<ExtractedFields, ExtractError>;
}
