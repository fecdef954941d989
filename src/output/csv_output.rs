//! Flat CSV export of a run report
//!
//! One row per unit. Fixed columns come first, then a `<field>_score` and a
//! `<field>_extracted` column for every schema field.

use crate::output::report::RunReport;
use crate::output::traits::{OutputResult, ReportWriter};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

const FIXED_COLUMNS: &[&str] = &[
    "domain",
    "crawler",
    "extractor",
    "state",
    "accuracy",
    "fields_correct",
    "fields_verifiable",
    "presence_accuracy",
    "pages",
    "internal_links",
    "internal_links_crawled",
    "external_links",
    "total_links",
    "failure_reason",
];

/// Writes `benchmark_<timestamp>.csv`
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvWriter;

impl ReportWriter for CsvWriter {
    fn write(&self, report: &RunReport, dir: &Path) -> OutputResult<PathBuf> {
        let path = dir.join(format!("{}.csv", report.file_stem()));
        let mut writer = BufWriter::new(File::create(&path)?);
        writer.write_all(format_csv_report(report).as_bytes())?;
        writer.flush()?;
        Ok(path)
    }
}

/// Field columns in schema order, or every scored field when the run
/// parameters do not list the schema
fn field_names(report: &RunReport) -> Vec<String> {
    let listed = &report.metadata.parameters.schema_fields;
    if !listed.is_empty() {
        return listed.clone();
    }
    report
        .entries
        .values()
        .filter_map(|e| e.score())
        .flat_map(|s| s.fields.iter().map(|f| f.field.clone()))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Formats a run report as CSV
pub fn format_csv_report(report: &RunReport) -> String {
    let fields = field_names(report);
    let mut out = String::new();

    let mut header: Vec<String> = FIXED_COLUMNS.iter().map(|c| c.to_string()).collect();
    header.extend(fields.iter().map(|f| format!("{}_score", f)));
    header.extend(fields.iter().map(|f| format!("{}_extracted", f)));
    push_row(&mut out, &header);

    for entry in report.entries.values() {
        let score = entry.score();
        let ratio = |value: Option<f64>| value.map(|v| format!("{:.4}", v)).unwrap_or_default();

        let mut row = vec![
            entry.key.domain.to_string(),
            entry.key.crawler.clone(),
            entry.key.extractor.clone(),
            entry.state.as_str().to_string(),
            ratio(score.and_then(|s| s.accuracy)),
            score
                .map(|s| (s.correct + s.absent_correct).to_string())
                .unwrap_or_default(),
            score.map(|s| s.verifiable.to_string()).unwrap_or_default(),
            ratio(score.and_then(|s| s.presence_accuracy)),
            entry.pages.to_string(),
            entry.link_stats.internal.to_string(),
            entry.link_stats.crawled.to_string(),
            entry.link_stats.external.to_string(),
            entry.link_stats.total.to_string(),
            entry.failure_reason().unwrap_or_default().to_string(),
        ];

        let scored = |name: &str| score.and_then(|s| s.field(name));
        row.extend(fields.iter().map(|name| {
            scored(name)
                .map(|f| format!("{:.2}", f.similarity))
                .unwrap_or_default()
        }));
        row.extend(
            fields
                .iter()
                .map(|name| scored(name).map(|f| plain(&f.extracted)).unwrap_or_default()),
        );

        push_row(&mut out, &row);
    }
    out
}

/// Strings bare, `null` empty, anything else as JSON
fn plain(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn push_row(out: &mut String, cells: &[String]) {
    let quoted: Vec<String> = cells.iter().map(|c| quote(c)).collect();
    out.push_str(&quoted.join(","));
    out.push('\n');
}

/// Quotes a cell when it holds a comma, quote or line break
fn quote(cell: &str) -> String {
    if cell.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}
