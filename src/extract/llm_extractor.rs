use super::content::prepare_content;
use super::normalize::normalize_fields;
use super::prompt::{build_prompt, SYSTEM_PROMPT};
use super::{ExtractError, ExtractedFields, Extractor};
use crate::crawler::PageSet;
use crate::llm::{parse_json_object, preview, ChatModel};
use crate::schema::Schema;
use async_trait::async_trait;
use std::sync::Arc;

/// Extractor backed by a chat model
pub struct LlmExtractor {
    id: String,
    model: Arc<dyn ChatModel>,
}

impl LlmExtractor {
    pub fn new(id: &str, model: Arc<dyn ChatModel>) -> Self {
        Self {
            id: id.to_string(),
            model,
        }
    }
}

#[async_trait]
impl Extractor for LlmExtractor {
    fn id(&self) -> &str {
        &self.id
    }

    async fn extract(
        &self,
        pages: &PageSet,
        schema: &Schema,
    ) -> Result<ExtractedFields, ExtractError> {
        let content = prepare_content(pages);
        let user = format!("{}\n\n{}", build_prompt(schema), content);

        tracing::debug!(
            "Extracting {} with {} ({}, {} chars)",
            pages.domain,
            self.id,
            self.model.model(),
            content.len()
        );

        let raw = self.model.complete(SYSTEM_PROMPT, &user).await?;
        let object = parse_json_object(&raw).ok_or_else(|| {
            ExtractError::MalformedResponse(format!("no JSON object in: {}", preview(&raw, 200)))
        })?;

        Ok(ExtractedFields {
            fields: normalize_fields(&object, schema),
            raw_response: raw,
        })
    }
}

impl std::fmt::Debug for LlmExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmExtractor")
            .field("id", &self.id)
            .field("model", &self.model.model())
            .finish()
    }
}
