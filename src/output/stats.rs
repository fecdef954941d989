//! Console summary of a finished run

use crate::output::markdown::percent;
use crate::output::report::{GroupSummary, RunReport};
use std::collections::BTreeMap;

/// Formats the per-combination table printed after a run
pub fn format_summary_table(report: &RunReport) -> String {
    format_group_table("Combination", &report.summary.by_combo)
}

/// Formats the per-domain table printed after a run
pub fn format_domain_table(report: &RunReport) -> String {
    format_group_table("Domain", &report.summary.by_domain)
}

fn format_group_table(label: &str, rows: &BTreeMap<String, GroupSummary>) -> String {
    let width = rows
        .keys()
        .map(String::len)
        .chain(std::iter::once(label.len()))
        .max()
        .unwrap_or_default();

    let mut out = String::new();
    out.push_str(&format!(
        "{:<width$}  {:>5}  {:>6}  {:>9}  {:>9}\n",
        label,
        "Done",
        "Failed",
        "Accuracy",
        "Presence",
        width = width
    ));
    out.push_str(&format!("{}\n", "-".repeat(width + 39)));
    push_rows(&mut out, rows, width);
    out
}

fn push_rows(out: &mut String, rows: &BTreeMap<String, GroupSummary>, width: usize) {
    for (name, group) in rows {
        out.push_str(&format!(
            "{:<width$}  {:>5}  {:>6}  {:>9}  {:>9}\n",
            name,
            group.done,
            group.failed,
            percent(group.accuracy),
            percent(group.presence_accuracy),
            width = width
        ));
    }
}

/// Prints the run summary to stdout
pub fn print_summary(report: &RunReport) {
    let meta = &report.metadata;
    let overall = &report.summary.overall;

    println!("=== Benchmark Summary ({}) ===\n", meta.mode.as_str());
    println!("Overview:");
    println!("  Domains: {}", meta.total_domains);
    println!(
        "  Units: {} ({} done, {} failed)",
        meta.total_units, overall.done, overall.failed
    );
    println!("  Accuracy: {}", percent(overall.accuracy));
    println!(
        "  Presence accuracy: {}",
        percent(overall.presence_accuracy)
    );
    println!("  Duration: {:.1}s", meta.duration_secs);
    if meta.cancelled {
        println!("  Run was cancelled before every unit finished");
    }
    println!();

    print!("{}", format_summary_table(report));
    println!();
    print!("{}", format_domain_table(report));

    let failed: Vec<_> = report.failed_entries().collect();
    if !failed.is_empty() {
        println!("\nFailed units ({}):", failed.len());
        for entry in failed {
            println!(
                "  - {}: {}",
                entry.key,
                entry.failure_reason().unwrap_or_default()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::report::tests::sample_report;

    #[test]
    fn test_summary_table_rows() {
        let table = format_summary_table(&sample_report());
        let lines: Vec<&str> = table.lines().collect();

        assert!(lines[0].starts_with("Combination"));
        assert_eq!(lines.len(), 4);
        assert!(lines[2].starts_with("custom_html+openai"));
        assert!(lines[3].contains("75.0%"));
    }

    #[test]
    fn test_domain_table_rows() {
        let table = format_domain_table(&sample_report());
        let lines: Vec<&str> = table.lines().collect();

        assert!(lines[0].starts_with("Domain"));
        assert_eq!(lines.len(), 4);
        assert!(lines[2].starts_with("a.com"));
        assert!(lines[2].contains("50.0%"));
        assert!(lines[3].starts_with("b.com"));
    }
}
