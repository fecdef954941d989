//! Value-compare escalation: judge votes on ambiguous fields
//!
//! Fields the comparator could not settle are put to one or more judges. Each
//! judge votes match or no-match, or abstains when it fails. The majority
//! decides; a tie or a fully abstaining panel keeps the field
//! `present-incorrect`.

mod escalator;
mod judge;
mod registry;

pub use escalator::{Escalator, JudgePolicy};
pub use judge::{build_judge_prompt, LlmJudge, JUDGE_SYSTEM_PROMPT, MATCH_SIMILARITY};
pub use registry::JudgeRegistry;

use crate::schema::FieldSpec;
use crate::url::Domain;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// One judge's opinion on one field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JudgeVote {
    Match,
    NoMatch,
    Abstain,
}

/// A judge's answer, persisted per (unit, field, judge)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgeDecision {
    pub vote: JudgeVote,
    #[serde(default)]
    pub similarity: Option<f64>,
    #[serde(default)]
    pub rationale: String,
}

impl JudgeDecision {
    pub fn new(vote: JudgeVote) -> Self {
        Self {
            vote,
            similarity: None,
            rationale: String::new(),
        }
    }
}

/// The question put to a judge
#[derive(Debug, Clone, Copy)]
pub struct JudgeRequest<'a> {
    pub domain: &'a Domain,
    pub field: &'a FieldSpec,
    pub extracted: &'a Value,
    pub expected: &'a Value,
}

/// Why a judge could not vote; always downgraded to an abstain
#[derive(Debug, Clone, Error, PartialEq)]
pub enum JudgeError {
    #[error("Judge backend error: {0}")]
    Backend(String),

    #[error("Malformed judge response: {0}")]
    MalformedResponse(String),
}

impl From<crate::llm::LlmError> for JudgeError {
    fn from(e: crate::llm::LlmError) -> Self {
        Self::Backend(e.to_string())
    }
}

/// Judge capability: decides whether an extracted value matches ground truth
#[async_trait]
pub trait Judge: Send + Sync {
    /// Registry identifier, e.g. `openai`
    fn id(&self) -> &str;

    async fn judge(&self, request: &JudgeRequest<'_>) -> Result<JudgeDecision, JudgeError>;
}

/// Outcome of combining the votes for one field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    Match,
    NoMatch,
    Tie,
    AllAbstained,
}

impl Resolution {
    /// Only a strict majority of match votes accepts the value
    pub fn is_match(&self) -> bool {
        matches!(self, Self::Match)
    }
}

/// Majority vote over non-abstaining judges
pub fn resolve_votes(votes: &[JudgeVote]) -> Resolution {
    let matches = votes.iter().filter(|v| **v == JudgeVote::Match).count();
    let no_matches = votes.iter().filter(|v| **v == JudgeVote::NoMatch).count();

    match (matches, no_matches) {
        (0, 0) => Resolution::AllAbstained,
        (m, n) if m > n => Resolution::Match,
        (m, n) if n > m => Resolution::NoMatch,
        _ => Resolution::Tie,
    }
}
