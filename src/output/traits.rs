//! Report writer trait, output formats and errors

use crate::output::report::RunReport;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur while writing reports
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("Failed to format output: {0}")]
    Format(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite export error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Report file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Sqlite,
    Markdown,
    Csv,
    All,
}

impl OutputFormat {
    /// Concrete formats this selection expands to
    pub fn expand(self) -> Vec<OutputFormat> {
        match self {
            Self::All => vec![Self::Json, Self::Sqlite, Self::Markdown, Self::Csv],
            other => vec![other],
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "sqlite" => Ok(Self::Sqlite),
            "markdown" | "md" => Ok(Self::Markdown),
            "csv" => Ok(Self::Csv),
            "all" => Ok(Self::All),
            other => Err(format!(
                "unknown output format '{}' (expected json, sqlite, markdown, csv or all)",
                other
            )),
        }
    }
}

/// Writes a finished run report into an output directory
///
/// Implementations name their file after [`RunReport::file_stem`] and return
/// the path they wrote.
pub trait ReportWriter {
    fn write(&self, report: &RunReport, dir: &Path) -> OutputResult<PathBuf>;
}
