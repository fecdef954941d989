//! Artifact store trait, artifact envelope and error types
//!
//! Every persisted artifact is an [`Artifact`] envelope: the stage and key it
//! was written for, a fingerprint of the inputs that produced it, and the
//! stage payload as JSON. The envelope alone is enough to replay a stage.

use crate::url::Domain;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Corrupt artifact at {path}: {message}")]
    Corrupt { path: PathBuf, message: String },
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Pipeline stage an artifact belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Page set from a fetch adapter
    Fetch,
    /// Extraction record from an extractor
    Extract,
    /// Scored unit entry
    Compare,
    /// One judge's vote on one field
    Judge,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fetch => "fetch",
            Self::Extract => "extract",
            Self::Compare => "compare",
            Self::Judge => "judge",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of an artifact within its stage
///
/// Fetch artifacts use (domain, crawler); extract and compare artifacts add
/// the extractor; judge artifacts add the field and the judge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArtifactKey {
    pub domain: Domain,
    pub crawler: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extractor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub judge: Option<String>,
}

impl ArtifactKey {
    pub fn fetch(domain: &Domain, crawler: &str) -> Self {
        Self {
            domain: domain.clone(),
            crawler: crawler.to_string(),
            extractor: None,
            field: None,
            judge: None,
        }
    }

    pub fn extract(domain: &Domain, crawler: &str, extractor: &str) -> Self {
        Self {
            extractor: Some(extractor.to_string()),
            ..Self::fetch(domain, crawler)
        }
    }

    pub fn judge(
        domain: &Domain,
        crawler: &str,
        extractor: &str,
        field: &str,
        judge: &str,
    ) -> Self {
        Self {
            field: Some(field.to_string()),
            judge: Some(judge.to_string()),
            ..Self::extract(domain, crawler, extractor)
        }
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.domain, self.crawler)?;
        for part in [&self.extractor, &self.field, &self.judge].into_iter().flatten() {
            write!(f, "/{}", part)?;
        }
        Ok(())
    }
}

/// A persisted stage output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub stage: Stage,
    pub key: ArtifactKey,
    /// Hash of the inputs the payload was produced from
    pub fingerprint: String,
    pub saved_at: DateTime<Utc>,
    pub payload: serde_json::Value,
}

/// Trait for artifact store implementations
///
/// Implementations must be safe to share between tasks. A `save` replaces the
/// previous artifact atomically: a concurrent `load` of the same key sees
/// either the old or the new artifact, never a partial one.
pub trait ArtifactStore: Send + Sync {
    // ===== Core Operations =====

    /// Loads the artifact stored for (stage, key)
    ///
    /// A missing artifact is `Ok(None)`. An artifact that cannot be decoded is
    /// `Err(StorageError::Corrupt)`.
    fn load(&self, stage: Stage, key: &ArtifactKey) -> StorageResult<Option<Artifact>>;

    /// Stores `artifact` under its own stage and key, replacing any previous one
    fn save(&self, artifact: &Artifact) -> StorageResult<()>;

    /// Checks whether an artifact is stored for (stage, key)
    fn exists(&self, stage: Stage, key: &ArtifactKey) -> bool;

    // ===== Enumeration =====

    /// Lists the keys of every decodable artifact of `stage`, sorted
    fn list_keys(&self, stage: Stage) -> StorageResult<Vec<ArtifactKey>>;
}
