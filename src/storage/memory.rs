//! In-memory artifact store
//!
//! Artifacts are held as serialized JSON so loads go through the same decode
//! path as the filesystem store. Used by tests and dry runs.

use super::traits::{Artifact, ArtifactKey, ArtifactStore, Stage, StorageError, StorageResult};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

#[derive(Debug, Default)]
pub struct MemoryArtifactStore {
    entries: RwLock<HashMap<(Stage, ArtifactKey), String>>,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores raw text for (stage, key), bypassing serialization
    pub fn insert_raw(&self, stage: Stage, key: ArtifactKey, raw: impl Into<String>) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert((stage, key), raw.into());
        }
    }

    /// Number of stored artifacts across all stages
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> StorageError {
    StorageError::Io(std::io::Error::other("artifact store lock poisoned"))
}

impl ArtifactStore for MemoryArtifactStore {
    fn load(&self, stage: Stage, key: &ArtifactKey) -> StorageResult<Option<Artifact>> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        let Some(raw) = entries.get(&(stage, key.clone())) else {
            return Ok(None);
        };

        serde_json::from_str(raw)
            .map(Some)
            .map_err(|e| StorageError::Corrupt {
                path: PathBuf::from(format!("memory://{}/{}", stage, key)),
                message: e.to_string(),
            })
    }

    fn save(&self, artifact: &Artifact) -> StorageResult<()> {
        let raw = serde_json::to_string(artifact)?;
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        entries.insert((artifact.stage, artifact.key.clone()), raw);
        Ok(())
    }

    fn exists(&self, stage: Stage, key: &ArtifactKey) -> bool {
        self.entries
            .read()
            .map(|e| e.contains_key(&(stage, key.clone())))
            .unwrap_or(false)
    }

    fn list_keys(&self, stage: Stage) -> StorageResult<Vec<ArtifactKey>> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        let mut keys: Vec<ArtifactKey> = entries
            .keys()
            .filter(|(s, _)| *s == stage)
            .map(|(_, k)| k.clone())
            .collect();
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::url::Domain;
    use chrono::Utc;

    #[test]
    fn test_roundtrip_and_list() {
        let store = MemoryArtifactStore::new();
        let d = Domain::parse("example.com").unwrap();
        let key = ArtifactKey::extract(&d, "jina", "openai");
        let artifact = Artifact {
            stage: Stage::Extract,
            key: key.clone(),
            fingerprint: "abc".to_string(),
            saved_at: Utc::now(),
            payload: serde_json::json!({"phone": "555"}),
        };

        store.save(&artifact).unwrap();
        assert!(store.exists(Stage::Extract, &key));
        assert!(!store.exists(Stage::Compare, &key));
        assert_eq!(store.load(Stage::Extract, &key).unwrap(), Some(artifact));
        assert_eq!(store.list_keys(Stage::Extract).unwrap(), vec![key]);
        assert!(store.list_keys(Stage::Fetch).unwrap().is_empty());
    }

    #[test]
    fn test_raw_garbage_is_corrupt() {
        let store = MemoryArtifactStore::new();
        let key = ArtifactKey::fetch(&Domain::parse("example.com").unwrap(), "jina");
        store.insert_raw(Stage::Fetch, key.clone(), "garbage");
        assert!(matches!(
            store.load(Stage::Fetch, &key),
            Err(StorageError::Corrupt { .. })
        ));
    }
}
