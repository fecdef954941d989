//! Run report: metadata, per-unit entries and grouped summaries

use crate::config::Config;
use crate::pipeline::{RunMode, RunOptions, RunOutcome, UnitEntry};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Settings that shaped the run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunParameters {
    pub crawlers: Vec<String>,
    pub extractors: Vec<String>,
    pub judges: Vec<String>,
    pub max_pages: usize,
    pub pages: Vec<String>,
    pub save_intermediate: bool,
    pub escalate: bool,
    pub force_judges: bool,
    pub schema_fields: Vec<String>,
}

impl RunParameters {
    pub fn new(config: &Config, options: &RunOptions) -> Self {
        Self {
            crawlers: config.run.crawlers.clone(),
            extractors: config.run.extractors.clone(),
            judges: if options.escalate {
                config.escalation.judges.clone()
            } else {
                Vec::new()
            },
            max_pages: options.budget.max_pages,
            pages: options.budget.pages.clone(),
            save_intermediate: options.save_intermediate,
            escalate: options.escalate,
            force_judges: options.force_judges,
            schema_fields: config
                .schema()
                .fields()
                .iter()
                .map(|f| f.name.clone())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_secs: f64,
    pub mode: RunMode,
    /// Hash of the run-shaping settings
    pub fingerprint: String,
    pub cancelled: bool,
    pub total_domains: usize,
    pub total_units: usize,
    pub parameters: RunParameters,
}

/// Aggregate over a group of units
///
/// Accuracies are means over done units that have one; `None` when no unit
/// in the group was scored on verifiable fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub units: usize,
    pub done: usize,
    pub failed: usize,
    pub accuracy: Option<f64>,
    pub presence_accuracy: Option<f64>,
}

impl GroupSummary {
    fn from_entries<'a>(entries: impl IntoIterator<Item = &'a UnitEntry>) -> Self {
        let mut summary = Self::default();
        let mut accuracies = Vec::new();
        let mut presence = Vec::new();

        for entry in entries {
            summary.units += 1;
            match entry.score() {
                Some(score) => {
                    summary.done += 1;
                    accuracies.extend(score.accuracy);
                    presence.extend(score.presence_accuracy);
                }
                None => summary.failed += 1,
            }
        }

        summary.accuracy = mean(&accuracies);
        summary.presence_accuracy = mean(&presence);
        summary
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub overall: GroupSummary,
    pub by_domain: BTreeMap<String, GroupSummary>,
    pub by_crawler: BTreeMap<String, GroupSummary>,
    pub by_extractor: BTreeMap<String, GroupSummary>,
    /// Keyed `crawler+extractor`
    pub by_combo: BTreeMap<String, GroupSummary>,
}

impl RunSummary {
    pub fn from_entries(entries: &BTreeMap<String, UnitEntry>) -> Self {
        let mut domains: BTreeMap<String, Vec<&UnitEntry>> = BTreeMap::new();
        let mut crawlers: BTreeMap<String, Vec<&UnitEntry>> = BTreeMap::new();
        let mut extractors: BTreeMap<String, Vec<&UnitEntry>> = BTreeMap::new();
        let mut combos: BTreeMap<String, Vec<&UnitEntry>> = BTreeMap::new();

        for entry in entries.values() {
            domains
                .entry(entry.key.domain.to_string())
                .or_default()
                .push(entry);
            crawlers
                .entry(entry.key.crawler.clone())
                .or_default()
                .push(entry);
            extractors
                .entry(entry.key.extractor.clone())
                .or_default()
                .push(entry);
            combos
                .entry(combo_key(&entry.key.crawler, &entry.key.extractor))
                .or_default()
                .push(entry);
        }

        let summarize = |groups: BTreeMap<String, Vec<&UnitEntry>>| {
            groups
                .into_iter()
                .map(|(k, v)| (k, GroupSummary::from_entries(v)))
                .collect()
        };

        Self {
            overall: GroupSummary::from_entries(entries.values()),
            by_domain: summarize(domains),
            by_crawler: summarize(crawlers),
            by_extractor: summarize(extractors),
            by_combo: summarize(combos),
        }
    }
}

pub fn combo_key(crawler: &str, extractor: &str) -> String {
    format!("{}+{}", crawler, extractor)
}

/// The single structured document written per run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub metadata: RunMetadata,
    pub summary: RunSummary,
    /// Keyed `domain|crawler|extractor`
    pub entries: BTreeMap<String, UnitEntry>,
}

impl RunReport {
    pub fn from_outcome(
        outcome: &RunOutcome,
        parameters: RunParameters,
        fingerprint: &str,
    ) -> Self {
        let entries: BTreeMap<String, UnitEntry> = outcome
            .entries
            .iter()
            .map(|(key, entry)| (key.report_key(), entry.clone()))
            .collect();
        let domains: BTreeSet<_> = outcome.entries.keys().map(|k| &k.domain).collect();
        let duration = outcome.finished_at - outcome.started_at;

        Self {
            metadata: RunMetadata {
                started_at: outcome.started_at,
                finished_at: outcome.finished_at,
                duration_secs: duration.num_milliseconds() as f64 / 1000.0,
                mode: outcome.mode,
                fingerprint: fingerprint.to_string(),
                cancelled: outcome.cancelled,
                total_domains: domains.len(),
                total_units: entries.len(),
                parameters,
            },
            summary: RunSummary::from_entries(&entries),
            entries,
        }
    }

    /// `benchmark_<YYYYmmdd_HHMMSS>` stem shared by every output file of the run
    pub fn file_stem(&self) -> String {
        format!(
            "benchmark_{}",
            self.metadata.started_at.format("%Y%m%d_%H%M%S")
        )
    }

    pub fn failed_entries(&self) -> impl Iterator<Item = &UnitEntry> {
        self.entries.values().filter(|e| !e.is_done())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::compare::{FieldScore, MatchMethod, Score, Verdict};
    use crate::crawler::LinkStats;
    use crate::pipeline::{FailureStage, UnitKey, UnitStatus};
    use crate::state::UnitState;
    use crate::url::Domain;
    use chrono::TimeZone;
    use serde_json::{json, Value};

    fn field(name: &str, verdict: Verdict) -> FieldScore {
        FieldScore {
            field: name.to_string(),
            verdict,
            similarity: if verdict.is_correct() { 1.0 } else { 0.0 },
            method: MatchMethod::Exact,
            extracted: json!("x"),
            expected: Value::Null,
            extracted_present: true,
            expected_present: verdict != Verdict::AbsentExpectedAbsent,
            escalation_candidate: false,
        }
    }

    pub(crate) fn done(
        domain: &str,
        crawler: &str,
        extractor: &str,
        verdicts: &[Verdict],
    ) -> UnitEntry {
        let fields = verdicts
            .iter()
            .enumerate()
            .map(|(i, v)| field(&format!("f{}", i), *v))
            .collect();
        UnitEntry {
            key: UnitKey::new(&Domain::parse(domain).unwrap(), crawler, extractor),
            state: UnitState::Done,
            status: UnitStatus::Done {
                score: Score::from_fields(fields),
            },
            pages: 2,
            link_stats: LinkStats::default(),
            fetch_cached: false,
            extract_cached: false,
            escalated: 0,
            completed_at: Utc::now(),
        }
    }

    pub(crate) fn failed(domain: &str, crawler: &str, extractor: &str) -> UnitEntry {
        UnitEntry {
            key: UnitKey::new(&Domain::parse(domain).unwrap(), crawler, extractor),
            state: UnitState::Failed,
            status: UnitStatus::Failed {
                stage: FailureStage::Fetch,
                kind: "timeout".to_string(),
                reason: "timed out fetching https://a.com/".to_string(),
            },
            pages: 0,
            link_stats: LinkStats::default(),
            fetch_cached: false,
            extract_cached: false,
            escalated: 0,
            completed_at: Utc::now(),
        }
    }

    pub(crate) fn sample_report() -> RunReport {
        let entries = vec![
            done(
                "a.com",
                "jina",
                "openai",
                &[Verdict::PresentCorrect, Verdict::PresentIncorrect],
            ),
            done(
                "b.com",
                "jina",
                "openai",
                &[Verdict::PresentCorrect, Verdict::PresentCorrect],
            ),
            failed("a.com", "custom_html", "openai"),
        ];
        let started_at = Utc.with_ymd_and_hms(2024, 5, 17, 9, 30, 5).unwrap();
        let outcome = RunOutcome {
            mode: RunMode::Live,
            started_at,
            finished_at: started_at + chrono::Duration::seconds(42),
            entries: entries.into_iter().map(|e| (e.key.clone(), e)).collect(),
            cancelled: false,
        };
        RunReport::from_outcome(&outcome, RunParameters::default(), "abc123")
    }

    #[test]
    fn test_entries_keyed_by_report_key() {
        let report = sample_report();
        assert!(report.entries.contains_key("a.com|jina|openai"));
        assert!(report.entries.contains_key("a.com|custom_html|openai"));
        assert_eq!(report.metadata.total_units, 3);
        assert_eq!(report.metadata.total_domains, 2);
        assert_eq!(report.metadata.duration_secs, 42.0);
    }

    #[test]
    fn test_group_summaries() {
        let report = sample_report();
        let overall = &report.summary.overall;
        assert_eq!((overall.units, overall.done, overall.failed), (3, 2, 1));
        assert_eq!(overall.accuracy, Some(0.75));

        let jina = &report.summary.by_crawler["jina"];
        assert_eq!(jina.accuracy, Some(0.75));
        let custom = &report.summary.by_crawler["custom_html"];
        assert_eq!(custom.failed, 1);
        assert_eq!(custom.accuracy, None);

        let a = &report.summary.by_domain["a.com"];
        assert_eq!((a.units, a.done, a.failed), (2, 1, 1));
        assert_eq!(a.accuracy, Some(0.5));
        assert_eq!(report.summary.by_domain["b.com"].accuracy, Some(1.0));

        assert!(report.summary.by_combo.contains_key("jina+openai"));
        assert_eq!(report.summary.by_extractor["openai"].units, 3);
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(sample_report().file_stem(), "benchmark_20240517_093005");
    }

    #[test]
    fn test_failed_entries_listed() {
        let report = sample_report();
        let failed: Vec<_> = report.failed_entries().collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].key.crawler, "custom_html");
    }

    #[test]
    fn test_report_json_round_trip() {
        let report = sample_report();
        let json = serde_json::to_string(&report).unwrap();
        let back: RunReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, report);
    }
}
