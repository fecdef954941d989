//! Typed cache lookups over an [`ArtifactStore`] and artifact fingerprints

use super::traits::{Artifact, ArtifactKey, ArtifactStore, Stage, StorageResult};
use crate::crawler::FetchBudget;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Outcome of looking up a cached stage output
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup<T> {
    /// Valid artifact for the requested key and fingerprint
    Hit(T),
    /// Nothing stored
    Miss,
    /// Stored for different inputs
    Stale { found: String, expected: String },
    /// Undecodable, or stored under a different key
    Corrupt { reason: String },
}

impl<T> CacheLookup<T> {
    pub fn is_hit(&self) -> bool {
        matches!(self, Self::Hit(_))
    }

    pub fn into_hit(self) -> Option<T> {
        match self {
            Self::Hit(value) => Some(value),
            _ => None,
        }
    }

    /// Short label for logs and failure reasons
    pub fn label(&self) -> &'static str {
        match self {
            Self::Hit(_) => "hit",
            Self::Miss => "miss",
            Self::Stale { .. } => "stale",
            Self::Corrupt { .. } => "corrupt",
        }
    }
}

/// Loads and validates the artifact for (stage, key)
///
/// When `expected` is `None` the fingerprint is not checked. Corrupt artifacts
/// are logged at warn level; the caller treats them as a miss.
pub fn lookup<T: DeserializeOwned>(
    store: &dyn ArtifactStore,
    stage: Stage,
    key: &ArtifactKey,
    expected: Option<&str>,
) -> CacheLookup<T> {
    let artifact = match store.load(stage, key) {
        Ok(Some(artifact)) => artifact,
        Ok(None) => {
            tracing::debug!("Cache miss: {} {}", stage, key);
            return CacheLookup::Miss;
        }
        Err(e) => return corrupt(stage, key, e.to_string()),
    };

    if artifact.stage != stage || &artifact.key != key {
        return corrupt(
            stage,
            key,
            format!("stored under {} {}", artifact.stage, artifact.key),
        );
    }

    if let Some(expected) = expected {
        if artifact.fingerprint != expected {
            tracing::debug!("Stale artifact: {} {}", stage, key);
            return CacheLookup::Stale {
                found: artifact.fingerprint,
                expected: expected.to_string(),
            };
        }
    }

    match serde_json::from_value(artifact.payload) {
        Ok(value) => {
            tracing::debug!("Cache hit: {} {}", stage, key);
            CacheLookup::Hit(value)
        }
        Err(e) => corrupt(stage, key, format!("payload does not decode: {}", e)),
    }
}

fn corrupt<T>(stage: Stage, key: &ArtifactKey, reason: String) -> CacheLookup<T> {
    tracing::warn!("Corrupt {} artifact for {}: {}", stage, key, reason);
    CacheLookup::Corrupt { reason }
}

/// Wraps `payload` in an envelope and saves it
pub fn store<T: Serialize>(
    store: &dyn ArtifactStore,
    stage: Stage,
    key: &ArtifactKey,
    fingerprint: &str,
    payload: &T,
) -> StorageResult<()> {
    let artifact = Artifact {
        stage,
        key: key.clone(),
        fingerprint: fingerprint.to_string(),
        saved_at: Utc::now(),
        payload: serde_json::to_value(payload)?,
    };
    store.save(&artifact)
}

fn digest(parts: &[&[u8]]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update((part.len() as u64).to_le_bytes());
        hasher.update(part);
    }
    hex::encode(hasher.finalize())
}

/// Fingerprint of the fetch inputs: the page budget and preferred pages
pub fn fetch_fingerprint(budget: &FetchBudget) -> String {
    let max_pages = budget.max_pages.to_string();
    let pages = budget.pages.join("\n");
    digest(&[b"fetch", max_pages.as_bytes(), pages.as_bytes()])
}

/// Fingerprint of the extract inputs: the schema and the fetched content
pub fn extract_fingerprint(schema_fingerprint: &str, content_digest: &str) -> String {
    digest(&[
        b"extract",
        schema_fingerprint.as_bytes(),
        content_digest.as_bytes(),
    ])
}

/// Fingerprint of one judge question
pub fn judge_fingerprint(
    field: &str,
    extracted: &serde_json::Value,
    expected: &serde_json::Value,
) -> String {
    let extracted = extracted.to_string();
    let expected = expected.to_string();
    digest(&[
        b"judge",
        field.as_bytes(),
        extracted.as_bytes(),
        expected.as_bytes(),
    ])
}
