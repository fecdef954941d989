//! Output module for run reports
//!
//! This module handles:
//! - Building the run report from a finished run
//! - Writing it as JSON, SQLite, markdown and CSV
//! - Printing the console summary

mod csv_output;
mod json_output;
mod markdown;
mod report;
mod sqlite_output;
pub mod stats;
mod traits;

pub use csv_output::{format_csv_report, CsvWriter};
pub use json_output::JsonWriter;
pub use markdown::{format_markdown_report, percent, MarkdownWriter};
pub use report::{combo_key, GroupSummary, RunMetadata, RunParameters, RunReport, RunSummary};
pub use sqlite_output::{export_report, initialize_schema, SqliteWriter, SCHEMA_SQL};
pub use stats::{format_domain_table, format_summary_table, print_summary};
pub use traits::{OutputError, OutputFormat, OutputResult, ReportWriter};

use std::path::{Path, PathBuf};

/// Writes `report` into `dir` in every requested format
///
/// The directory is created when missing. Returns the written paths in
/// format order.
pub fn write_report(
    report: &RunReport,
    dir: &Path,
    format: OutputFormat,
) -> OutputResult<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;

    let mut written = Vec::new();
    for format in format.expand() {
        let writer: Box<dyn ReportWriter> = match format {
            OutputFormat::Json => Box::new(JsonWriter),
            OutputFormat::Sqlite => Box::new(SqliteWriter),
            OutputFormat::Markdown => Box::new(MarkdownWriter),
            OutputFormat::Csv => Box::new(CsvWriter),
            OutputFormat::All => continue,
        };
        let path = writer.write(report, dir)?;
        tracing::info!("Wrote {}", path.display());
        written.push(path);
    }
    Ok(written)
}
