//! Markdown summary generation
//!
//! This module renders a human-readable summary of a run: metadata, grouped
//! accuracy tables, and the list of failed units.

use crate::output::report::{GroupSummary, RunReport};
use crate::output::traits::{OutputResult, ReportWriter};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Writes `benchmark_<timestamp>.md`
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownWriter;

impl ReportWriter for MarkdownWriter {
    fn write(&self, report: &RunReport, dir: &Path) -> OutputResult<PathBuf> {
        let path = dir.join(format!("{}.md", report.file_stem()));
        let mut file = File::create(&path)?;
        file.write_all(format_markdown_report(report).as_bytes())?;
        Ok(path)
    }
}

/// Formats an accuracy ratio as a percentage, `-` when undefined
pub fn percent(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.1}%", v * 100.0),
        None => "-".to_string(),
    }
}

/// Formats a run report as markdown
pub fn format_markdown_report(report: &RunReport) -> String {
    let meta = &report.metadata;
    let mut md = String::new();

    md.push_str("# Scrape-Bench Report\n\n");

    // Run metadata
    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Mode**: {}\n", meta.mode.as_str()));
    md.push_str(&format!("- **Started**: {}\n", meta.started_at.to_rfc3339()));
    md.push_str(&format!("- **Finished**: {}\n", meta.finished_at.to_rfc3339()));
    md.push_str(&format!("- **Duration**: {:.1} seconds\n", meta.duration_secs));
    md.push_str(&format!("- **Fingerprint**: {}\n", meta.fingerprint));
    md.push_str(&format!("- **Domains**: {}\n", meta.total_domains));
    md.push_str(&format!("- **Units**: {}\n", meta.total_units));
    md.push_str(&format!(
        "- **Crawlers**: {}\n",
        meta.parameters.crawlers.join(", ")
    ));
    md.push_str(&format!(
        "- **Extractors**: {}\n",
        meta.parameters.extractors.join(", ")
    ));
    md.push_str(&format!("- **Max Pages**: {}\n", meta.parameters.max_pages));
    if meta.parameters.escalate {
        md.push_str(&format!(
            "- **Judges**: {}\n",
            meta.parameters.judges.join(", ")
        ));
    }
    if meta.cancelled {
        md.push_str("- **Cancelled**: yes\n");
    }
    md.push('\n');

    // Overall
    let overall = &report.summary.overall;
    md.push_str("## Overall\n\n");
    md.push_str(&format!("- **Done**: {}\n", overall.done));
    md.push_str(&format!("- **Failed**: {}\n", overall.failed));
    md.push_str(&format!("- **Accuracy**: {}\n", percent(overall.accuracy)));
    md.push_str(&format!(
        "- **Presence Accuracy**: {}\n\n",
        percent(overall.presence_accuracy)
    ));

    let summary = &report.summary;
    push_group_table(&mut md, "By Crawler", "Crawler", &summary.by_crawler);
    push_group_table(&mut md, "By Extractor", "Extractor", &summary.by_extractor);
    push_group_table(&mut md, "By Combination", "Combination", &summary.by_combo);
    push_group_table(&mut md, "By Domain", "Domain", &summary.by_domain);

    // Failed units
    let failed: Vec<_> = report.failed_entries().collect();
    if !failed.is_empty() {
        md.push_str("## Failed Units\n\n");
        md.push_str("| Unit | Reason |\n");
        md.push_str("|------|--------|\n");
        for entry in failed {
            md.push_str(&format!(
                "| {} | {} |\n",
                entry.key,
                entry
                    .failure_reason()
                    .unwrap_or_default()
                    .replace('|', "\\|")
            ));
        }
        md.push('\n');
    }

    md
}

fn push_group_table(
    md: &mut String,
    title: &str,
    label: &str,
    groups: &BTreeMap<String, GroupSummary>,
) {
    if groups.is_empty() {
        return;
    }

    md.push_str(&format!("## {}\n\n", title));
    md.push_str(&format!(
        "| {} | Units | Done | Failed | Accuracy | Presence |\n",
        label
    ));
    md.push_str("|---|---|---|---|---|---|\n");
    for (name, group) in groups {
        md.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} |\n",
            name,
            group.units,
            group.done,
            group.failed,
            percent(group.accuracy),
            percent(group.presence_accuracy)
        ));
    }
    md.push('\n');
}
