//! Scrape-Bench: a benchmark harness for web-scraping extraction pipelines
//!
//! This crate crawls company domains with interchangeable fetch backends,
//! extracts structured fields with LLM extractors, and scores the result
//! against curated ground truth. Every stage boundary is persisted so a later
//! run can replay from cached artifacts without touching the network.

pub mod compare;
pub mod config;
pub mod crawler;
pub mod escalation;
pub mod extract;
pub mod llm;
pub mod output;
pub mod pipeline;
pub mod schema;
pub mod state;
pub mod storage;
pub mod url;

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Scrape-Bench operations
///
/// Only precondition failures surface as a `BenchError`. Per-unit failures are
/// recorded in the run report instead.
#[derive(Debug, Error)]
pub enum BenchError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Ground truth error: {0}")]
    GroundTruth(#[from] compare::GroundTruthError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::UnitState,
        to: state::UnitState,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
///
/// Every variant is fatal: it aborts the run before any unit starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unknown {kind} '{id}'")]
    UnknownBackend { kind: &'static str, id: String },

    #[error("Missing credential for {backend}: environment variable {var} is not set")]
    MissingCredential { backend: String, var: String },

    #[error("Ground truth file not found: {0}")]
    MissingGroundTruth(PathBuf),

    #[error("Invalid domain list: {0}")]
    DomainList(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,
}

/// Result type alias for Scrape-Bench operations
pub type Result<T> = std::result::Result<T, BenchError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use compare::{compare, Score, Verdict};
pub use config::Config;
pub use pipeline::{RunMode, Runner};
pub use state::UnitState;
pub use url::{canonical_url, Domain};
