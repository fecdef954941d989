use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use scrape_bench::config::load_config;
///
/// let config = load_config(Path::new("bench.toml")).unwrap();
/// println!("Max pages: {}", config.run.max_pages);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration from a TOML string
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Hashes the settings that shape a run's results
///
/// Two runs with the same fingerprint asked the same question of the same
/// backends. CLI overrides must be applied before calling this.
pub fn compute_run_fingerprint(config: &Config) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("max-pages={}\n", config.run.max_pages));
    hasher.update(format!("pages={}\n", config.run.pages.join(",")));
    hasher.update(format!("crawlers={}\n", config.run.crawlers.join(",")));
    hasher.update(format!("extractors={}\n", config.run.extractors.join(",")));
    hasher.update(format!("schema={}\n", config.schema().fingerprint()));
    if config.escalation.enabled {
        hasher.update(format!("judges={}\n", config.escalation.judges.join(",")));
    }
    hex::encode(hasher.finalize())
}
