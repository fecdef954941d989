use super::{Judge, JudgeDecision, JudgeError, JudgeRequest, JudgeVote};
use crate::llm::{parse_json_object, preview, ChatModel};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

pub const JUDGE_SYSTEM_PROMPT: &str =
    "You are a precise evaluator. Return only a valid JSON object.";

/// Similarity at or above which a judge without an explicit verdict votes match
pub const MATCH_SIMILARITY: f64 = 0.5;

/// User prompt for one field comparison
pub fn build_judge_prompt(request: &JudgeRequest<'_>) -> String {
    let mut prompt = format!(
        "Compare an extracted value to the ground truth value for the field \"{}\" ({}) \
         of the company website {}.\n",
        request.field.name, request.field.kind, request.domain
    );
    if !request.field.description.is_empty() {
        prompt.push_str(&format!("Field meaning: {}\n", request.field.description));
    }
    prompt.push_str(
        "Decide whether they express the same information. Use partial credit for \
         overlapping items and fuzzy matches.\n\
         Respond with a JSON object: \
         {\"match\": true|false, \"similarity\": 0.0-1.0, \"rationale\": \"short reason\"}.\n\n",
    );
    prompt.push_str(&format!(
        "EXTRACTED:\n{}\n\nGROUND_TRUTH:\n{}\n",
        request.extracted, request.expected
    ));
    prompt
}

/// Reads a judge response object into a decision
fn parse_decision(raw: &str) -> Result<JudgeDecision, JudgeError> {
    let object = parse_json_object(raw).ok_or_else(|| {
        JudgeError::MalformedResponse(format!("no JSON object in: {}", preview(raw, 200)))
    })?;

    let similarity = object
        .get("similarity")
        .and_then(Value::as_f64)
        .map(|s| s.clamp(0.0, 1.0));
    let explicit = object.get("match").and_then(Value::as_bool);

    let vote = match (explicit, similarity) {
        (Some(true), _) => JudgeVote::Match,
        (Some(false), _) => JudgeVote::NoMatch,
        (None, Some(s)) if s >= MATCH_SIMILARITY => JudgeVote::Match,
        (None, Some(_)) => JudgeVote::NoMatch,
        (None, None) => {
            return Err(JudgeError::MalformedResponse(
                "response has neither match nor similarity".to_string(),
            ))
        }
    };

    Ok(JudgeDecision {
        vote,
        similarity,
        rationale: object
            .get("rationale")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    })
}

/// Judge backed by a chat model
pub struct LlmJudge {
    id: String,
    model: Arc<dyn ChatModel>,
}

impl LlmJudge {
    pub fn new(id: &str, model: Arc<dyn ChatModel>) -> Self {
        Self {
            id: id.to_string(),
            model,
        }
    }
}

#[async_trait]
impl Judge for LlmJudge {
    fn id(&self) -> &str {
        &self.id
    }

    async fn judge(&self, request: &JudgeRequest<'_>) -> Result<JudgeDecision, JudgeError> {
        let raw = self
            .model
            .complete(JUDGE_SYSTEM_PROMPT, &build_judge_prompt(request))
            .await?;
        parse_decision(&raw)
    }
}

impl std::fmt::Debug for LlmJudge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmJudge")
            .field("id", &self.id)
            .field("model", &self.model.model())
            .finish()
    }
}
