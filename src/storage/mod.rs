//! Artifact store: persisted stage outputs for cached replay
//!
//! This module handles:
//! - The `ArtifactStore` trait and artifact envelope
//! - A filesystem store with atomic writes
//! - An in-memory store for tests
//! - Typed, fingerprint-checked cache lookups

mod cache;
mod fs;
mod memory;
mod traits;

pub use cache::{
    extract_fingerprint, fetch_fingerprint, judge_fingerprint, lookup, store, CacheLookup,
};
pub use fs::FsArtifactStore;
pub use memory::MemoryArtifactStore;
pub use traits::{Artifact, ArtifactKey, ArtifactStore, Stage, StorageError, StorageResult};
