//! Filesystem artifact store
//!
//! Layout under the root directory:
//!
//! ```text
//! <domain>/<crawler>/fetch.json
//! <domain>/<crawler>/<extractor>.json
//! <domain>/<crawler>/<extractor>.compare.json
//! <domain>/<crawler>/judge/<extractor>/<judge>/<field>.json
//! ```
//!
//! Each path component is slugified. Files hold the JSON [`Artifact`] envelope.

use super::traits::{Artifact, ArtifactKey, ArtifactStore, Stage, StorageError, StorageResult};
use crate::url::slugify;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

const FETCH_FILE: &str = "fetch.json";
const COMPARE_SUFFIX: &str = ".compare.json";
const JUDGE_DIR: &str = "judge";

/// Distinguishes temp files of concurrent writers within this process
static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Artifact store backed by a directory tree
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File path an artifact of (stage, key) lives at
    pub fn path_for(&self, stage: Stage, key: &ArtifactKey) -> PathBuf {
        let dir = self.root
            .join(key.domain.slug())
            .join(slugify(&key.crawler));
        let extractor = slugify(key.extractor.as_deref().unwrap_or_default());

        match stage {
            Stage::Fetch => dir.join(FETCH_FILE),
            Stage::Extract => dir.join(format!("{}.json", extractor)),
            Stage::Compare => dir.join(format!("{}{}", extractor, COMPARE_SUFFIX)),
            Stage::Judge => dir
                .join(JUDGE_DIR)
                .join(extractor)
                .join(slugify(key.judge.as_deref().unwrap_or_default()))
                .join(format!("{}.json", slugify(key.field.as_deref().unwrap_or_default()))),
        }
    }

    fn read_artifact(path: &Path) -> StorageResult<Option<Artifact>> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| StorageError::Corrupt {
                path: path.to_path_buf(),
                message: e.to_string(),
            })
    }

    /// Candidate files for a stage, before envelope checks
    fn stage_files(&self, stage: Stage) -> StorageResult<Vec<PathBuf>> {
        let mut files = Vec::new();

        let domain_dirs = subdirs(&self.root)?;
        let crawler_dirs = domain_dirs
            .iter()
            .flat_map(|d| subdirs(d).unwrap_or_default());

        for crawler_dir in crawler_dirs {
            match stage {
                Stage::Fetch => {
                    let path = crawler_dir.join(FETCH_FILE);
                    if path.is_file() {
                        files.push(path);
                    }
                }
                Stage::Extract | Stage::Compare => {
                    for path in json_files(&crawler_dir)? {
                        let name = file_name(&path);
                        let is_compare = name.ends_with(COMPARE_SUFFIX);
                        if name == FETCH_FILE || is_compare != (stage == Stage::Compare) {
                            continue;
                        }
                        files.push(path);
                    }
                }
                Stage::Judge => {
                    let judge_root = crawler_dir.join(JUDGE_DIR);
                    for extractor_dir in subdirs(&judge_root)? {
                        for judge_dir in subdirs(&extractor_dir)? {
                            files.extend(json_files(&judge_dir)?);
                        }
                    }
                }
            }
        }

        Ok(files)
    }
}

impl ArtifactStore for FsArtifactStore {
    fn load(&self, stage: Stage, key: &ArtifactKey) -> StorageResult<Option<Artifact>> {
        Self::read_artifact(&self.path_for(stage, key))
    }

    fn save(&self, artifact: &Artifact) -> StorageResult<()> {
        let path = self.path_for(artifact.stage, &artifact.key);
        let content = serde_json::to_vec_pretty(artifact)?;
        atomic_write(&path, &content)?;
        Ok(())
    }

    fn exists(&self, stage: Stage, key: &ArtifactKey) -> bool {
        self.path_for(stage, key).is_file()
    }

    fn list_keys(&self, stage: Stage) -> StorageResult<Vec<ArtifactKey>> {
        let mut keys = Vec::new();

        for path in self.stage_files(stage)? {
            match Self::read_artifact(&path) {
                Ok(Some(artifact)) if artifact.stage == stage => keys.push(artifact.key),
                Ok(_) => {}
                Err(e) => tracing::warn!("Skipping unreadable artifact: {}", e),
            }
        }

        keys.sort();
        keys.dedup();
        Ok(keys)
    }
}

/// Writes `content` to a temp file beside `path`, then renames it into place
///
/// Readers see either the previous file or the complete new one.
fn atomic_write(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let parent = path.parent().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "Cannot determine parent directory",
        )
    })?;
    fs::create_dir_all(parent)?;

    let temp_path = parent.join(format!(
        ".{}.tmp.{}.{}",
        file_name(path),
        std::process::id(),
        TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));

    let result = write_synced(&temp_path, content).and_then(|_| fs::rename(&temp_path, path));
    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

fn write_synced(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(content)?;
    file.sync_all()
}

fn file_name(path: &Path) -> &str {
    path.file_name().and_then(|n| n.to_str()).unwrap_or("file")
}

/// Immediate subdirectories; a missing directory has none
fn subdirs(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut dirs = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Visible `.json` files directly inside `dir`
fn json_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let name = file_name(&path);
        if path.is_file() && !name.starts_with('.') && name.ends_with(".json") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
