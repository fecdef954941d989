//! Configuration module for Scrape-Bench
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files, and resolving backend API keys from the environment.
//!
//! # Example
//!
//! ```no_run
//! use scrape_bench::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("bench.toml")).unwrap();
//! println!("Crawlers: {:?}", config.run.crawlers);
//! ```

mod credentials;
mod parser;
mod types;
mod validation;

pub use credentials::{
    crawler_provider, extractor_provider, judge_provider, resolve_credentials,
    resolve_credentials_with, Credentials, Provider, CRAWLER_IDS, EXTRACTOR_IDS, JUDGE_IDS,
};
pub use types::{
    ConcurrencyConfig, Config, CredentialsConfig, EndpointsConfig, EscalationConfig, HttpConfig,
    ModelsConfig, PathsConfig, RunConfig, SchemaConfig,
};
pub use validation::{validate, validate_ground_truth_path};

pub use parser::{compute_run_fingerprint, load_config, parse_config};
