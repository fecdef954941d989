use crate::config::credentials::{crawler_provider, extractor_provider, judge_provider};
use crate::config::types::{
    ConcurrencyConfig, Config, EscalationConfig, HttpConfig, PathsConfig, RunConfig,
};
use crate::schema::{FieldKind, FieldSpec};
use crate::ConfigError;
use std::collections::HashSet;
use std::path::Path;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_run_config(&config.run)?;
    validate_concurrency_config(&config.concurrency)?;
    validate_http_config(&config.http)?;
    validate_escalation_config(&config.escalation)?;
    validate_paths_config(&config.paths)?;
    validate_schema_fields(&config.schema.field)?;
    Ok(())
}

/// Validates backend selection and the page budget
fn validate_run_config(config: &RunConfig) -> Result<(), ConfigError> {
    if config.crawlers.is_empty() {
        return Err(ConfigError::Validation(
            "at least one crawler must be selected".to_string(),
        ));
    }

    if config.extractors.is_empty() {
        return Err(ConfigError::Validation(
            "at least one extractor must be selected".to_string(),
        ));
    }

    for id in &config.crawlers {
        crawler_provider(id)?;
    }
    for id in &config.extractors {
        extractor_provider(id)?;
    }

    check_unique("crawler", &config.crawlers)?;
    check_unique("extractor", &config.extractors)?;

    if config.max_pages > 100 {
        return Err(ConfigError::Validation(format!(
            "max_pages must be <= 100, got {}",
            config.max_pages
        )));
    }

    if config.timeout_secs == Some(0) {
        return Err(ConfigError::Validation(
            "timeout_secs must be >= 1 when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates worker pool sizes
fn validate_concurrency_config(config: &ConcurrencyConfig) -> Result<(), ConfigError> {
    if config.fetch_per_crawler < 1 || config.fetch_per_crawler > 64 {
        return Err(ConfigError::Validation(format!(
            "fetch_per_crawler must be between 1 and 64, got {}",
            config.fetch_per_crawler
        )));
    }

    if config.extract < 1 || config.extract > 256 {
        return Err(ConfigError::Validation(format!(
            "extract concurrency must be between 1 and 256, got {}",
            config.extract
        )));
    }

    Ok(())
}

/// Validates HTTP client settings
fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout_secs must be >= 1, got {}",
            config.timeout_secs
        )));
    }

    if config.max_retries < 1 || config.max_retries > 10 {
        return Err(ConfigError::Validation(format!(
            "max_retries must be between 1 and 10, got {}",
            config.max_retries
        )));
    }

    Ok(())
}

/// Validates the judge list when escalation is on
fn validate_escalation_config(config: &EscalationConfig) -> Result<(), ConfigError> {
    if !config.enabled {
        return Ok(());
    }

    if config.judges.is_empty() {
        return Err(ConfigError::Validation(
            "escalation is enabled but no judges are configured".to_string(),
        ));
    }

    for id in &config.judges {
        judge_provider(id)?;
    }
    check_unique("judge", &config.judges)
}

fn validate_paths_config(config: &PathsConfig) -> Result<(), ConfigError> {
    if config.artifact_root.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "artifact_root cannot be empty".to_string(),
        ));
    }

    if config.output_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "output_dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates a schema override
fn validate_schema_fields(fields: &[FieldSpec]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for field in fields {
        if field.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "schema field name cannot be empty".to_string(),
            ));
        }

        if !seen.insert(field.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate schema field '{}'",
                field.name
            )));
        }

        if field.kind == FieldKind::Enum && field.allowed.is_empty() {
            return Err(ConfigError::Validation(format!(
                "enum field '{}' must list its allowed values",
                field.name
            )));
        }
    }

    Ok(())
}

fn check_unique(kind: &str, ids: &[String]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id.as_str()) {
            return Err(ConfigError::Validation(format!(
                "{} '{}' is listed twice",
                kind, id
            )));
        }
    }
    Ok(())
}

/// Checks that the ground-truth file is configured and present
pub fn validate_ground_truth_path(config: &Config) -> Result<&Path, ConfigError> {
    match &config.paths.ground_truth {
        Some(path) if path.is_file() => Ok(path.as_path()),
        Some(path) => Err(ConfigError::MissingGroundTruth(path.clone())),
        None => Err(ConfigError::Validation(
            "paths.ground-truth must be set".to_string(),
        )),
    }
}
