//! Test doubles shared by the integration tests

use async_trait::async_trait;
use scrape_bench::compare::{GroundTruth, GroundTruthRecord, GroundTruthValue};
use scrape_bench::crawler::{FetchAdapter, FetchBudget, FetchError, Page, PageSet};
use scrape_bench::extract::{ExtractorRegistry, LlmExtractor};
use scrape_bench::llm::{ChatModel, LlmError};
use scrape_bench::schema::{FieldKind, FieldSpec, Schema};
use scrape_bench::url::Domain;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Chat model that always answers with the same text
pub struct ScriptedModel {
    reply: String,
    calls: AtomicUsize,
}

impl ScriptedModel {
    pub fn new(reply: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.into(),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    fn model(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, _system: &str, _user: &str) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.reply.clone())
    }
}

/// Fetch adapter serving one homepage per domain, or failing every fetch
pub struct FakeFetcher {
    id: &'static str,
    content: Option<&'static str>,
    calls: AtomicUsize,
}

impl FakeFetcher {
    pub fn serving(id: &'static str, content: &'static str) -> Arc<Self> {
        Arc::new(Self {
            id,
            content: Some(content),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing(id: &'static str) -> Arc<Self> {
        Arc::new(Self {
            id,
            content: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FetchAdapter for FakeFetcher {
    fn id(&self) -> &str {
        self.id
    }

    async fn fetch(&self, domain: &Domain, _budget: &FetchBudget) -> Result<PageSet, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let url = format!("https://{}/", domain);
        let Some(content) = self.content else {
            return Err(FetchError::Blocked { url, status: 403 });
        };

        let mut set = PageSet::new(domain.clone(), self.id);
        set.pages.push(Page {
            url,
            name: "homepage".to_string(),
            content: content.to_string(),
            links: Vec::new(),
        });
        Ok(set)
    }
}

pub fn domain(raw: &str) -> Domain {
    Domain::parse(raw).unwrap()
}

/// Phone, email and a free-text headquarters field
pub fn schema() -> Schema {
    Schema::new(vec![
        FieldSpec::new("phone", FieldKind::Phone, "Main phone number"),
        FieldSpec::new("email", FieldKind::Email, "Contact email"),
        FieldSpec::new("headquarters", FieldKind::Text, "Headquarters location"),
    ])
}

/// Acme has a phone and a headquarters but publishes no email
pub fn acme_truth(domain: &Domain) -> GroundTruthRecord {
    GroundTruthRecord::new(domain.clone())
        .with_field("phone", GroundTruthValue::new(json!("(555) 123-4567")))
        .with_field("email", GroundTruthValue::new(Value::Null))
        .with_field(
            "headquarters",
            GroundTruthValue::new(json!("San Francisco, California")),
        )
}

pub fn ground_truth(domains: &[&Domain]) -> GroundTruth {
    GroundTruth::from_records(domains.iter().map(|d| acme_truth(d)))
}

/// Extractor `openai` answering with a fixed JSON object
pub fn extractor(reply: Value) -> (ExtractorRegistry, Arc<ScriptedModel>) {
    let model = ScriptedModel::new(reply.to_string());
    let mut registry = ExtractorRegistry::new();
    registry.register(Arc::new(LlmExtractor::new("openai", model.clone())));
    (registry, model)
}

/// Reply matching the Acme ground truth on every field
pub fn correct_reply() -> Value {
    json!({
        "phone": "555.123.4567",
        "email": null,
        "headquarters": "San Francisco, California"
    })
}
