//! SQLite tabular export of a run report
//!
//! One row per unit in `units` and one row per scored field in
//! `field_scores`, so results can be sliced with plain SQL.

use crate::output::report::RunReport;
use crate::output::traits::{OutputResult, ReportWriter};
use crate::pipeline::UnitStatus;
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};

/// SQL schema for the export database
pub const SCHEMA_SQL: &str = r#"
-- Run metadata
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT NOT NULL,
    mode TEXT NOT NULL,
    fingerprint TEXT NOT NULL,
    cancelled INTEGER NOT NULL
);

-- One row per (domain, crawler, extractor)
CREATE TABLE IF NOT EXISTS units (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id INTEGER NOT NULL REFERENCES runs(id),
    domain TEXT NOT NULL,
    crawler TEXT NOT NULL,
    extractor TEXT NOT NULL,
    state TEXT NOT NULL,
    failure_stage TEXT,
    failure_kind TEXT,
    failure_reason TEXT,
    accuracy REAL,
    presence_accuracy REAL,
    correct INTEGER,
    verifiable INTEGER,
    pages INTEGER NOT NULL,
    internal_links INTEGER NOT NULL,
    external_links INTEGER NOT NULL,
    fetch_cached INTEGER NOT NULL,
    extract_cached INTEGER NOT NULL,
    escalated INTEGER NOT NULL,
    UNIQUE(run_id, domain, crawler, extractor)
);

CREATE INDEX IF NOT EXISTS idx_units_crawler ON units(crawler);
CREATE INDEX IF NOT EXISTS idx_units_extractor ON units(extractor);

-- Per-field verdicts of done units
CREATE TABLE IF NOT EXISTS field_scores (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    unit_id INTEGER NOT NULL REFERENCES units(id),
    field TEXT NOT NULL,
    verdict TEXT NOT NULL,
    method TEXT NOT NULL,
    similarity REAL NOT NULL,
    extracted TEXT,
    expected TEXT
);

CREATE INDEX IF NOT EXISTS idx_field_scores_unit ON field_scores(unit_id);
CREATE INDEX IF NOT EXISTS idx_field_scores_field ON field_scores(field);
"#;

/// Creates the export tables
pub fn initialize_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)
}

/// Writes `benchmark_<timestamp>.sqlite`
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteWriter;

impl ReportWriter for SqliteWriter {
    fn write(&self, report: &RunReport, dir: &Path) -> OutputResult<PathBuf> {
        let path = dir.join(format!("{}.sqlite", report.file_stem()));
        let mut conn = Connection::open(&path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        export_report(&mut conn, report)?;
        Ok(path)
    }
}

/// Inserts a report in one transaction and returns its run id
pub fn export_report(conn: &mut Connection, report: &RunReport) -> OutputResult<i64> {
    let tx = conn.transaction()?;
    let meta = &report.metadata;

    tx.execute(
        "INSERT INTO runs (started_at, finished_at, mode, fingerprint, cancelled)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            meta.started_at.to_rfc3339(),
            meta.finished_at.to_rfc3339(),
            meta.mode.as_str(),
            meta.fingerprint,
            meta.cancelled
        ],
    )?;
    let run_id = tx.last_insert_rowid();

    for entry in report.entries.values() {
        let (failure_stage, failure_kind, failure_reason) = match &entry.status {
            UnitStatus::Failed { stage, kind, reason } => {
                (Some(stage.as_str()), Some(kind.as_str()), Some(reason.as_str()))
            }
            UnitStatus::Done { .. } => (None, None, None),
        };
        let score = entry.score();

        tx.execute(
            "INSERT INTO units (run_id, domain, crawler, extractor, state, failure_stage,
                failure_kind, failure_reason, accuracy, presence_accuracy, correct, verifiable,
                pages, internal_links, external_links, fetch_cached, extract_cached, escalated)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
            params![
                run_id,
                entry.key.domain.as_str(),
                entry.key.crawler,
                entry.key.extractor,
                entry.state.as_str(),
                failure_stage,
                failure_kind,
                failure_reason,
                score.and_then(|s| s.accuracy),
                score.and_then(|s| s.presence_accuracy),
                score.map(|s| (s.correct + s.absent_correct) as i64),
                score.map(|s| s.verifiable as i64),
                entry.pages as i64,
                entry.link_stats.internal as i64,
                entry.link_stats.external as i64,
                entry.fetch_cached,
                entry.extract_cached,
                entry.escalated as i64,
            ],
        )?;
        let unit_id = tx.last_insert_rowid();

        let Some(score) = score else {
            continue;
        };
        let mut stmt = tx.prepare_cached(
            "INSERT INTO field_scores (unit_id, field, verdict, method, similarity, extracted, expected)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        for field in &score.fields {
            stmt.execute(params![
                unit_id,
                field.field,
                field.verdict.as_str(),
                field.method.as_str(),
                field.similarity,
                cell(&field.extracted),
                cell(&field.expected),
            ])?;
        }
    }

    tx.commit()?;
    Ok(run_id)
}

/// Strings are stored bare, other values as JSON, `null` as SQL NULL
fn cell(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::report::tests::sample_report;

    fn memory_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        initialize_schema(&conn).unwrap();
        conn
    }

    #[test]
    fn test_schema_is_idempotent() {
        let conn = memory_db();
        initialize_schema(&conn).unwrap();
    }

    #[test]
    fn test_export_units_and_fields() {
        let mut conn = memory_db();
        let run_id = export_report(&mut conn, &sample_report()).unwrap();

        let units: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM units WHERE run_id = ?1",
                params![run_id],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(units, 3);

        let fields: i64 = conn
            .query_row("SELECT COUNT(*) FROM field_scores", [], |r| r.get(0))
            .unwrap();
        assert_eq!(fields, 4);

        let (kind, accuracy): (String, Option<f64>) = conn
            .query_row(
                "SELECT failure_kind, accuracy FROM units WHERE crawler = 'custom_html'",
                [],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .unwrap();
        assert_eq!(kind, "timeout");
        assert_eq!(accuracy, None);
    }

    #[test]
    fn test_verdicts_stored_as_strings() {
        let mut conn = memory_db();
        export_report(&mut conn, &sample_report()).unwrap();

        let incorrect: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM field_scores WHERE verdict = 'present-incorrect'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(incorrect, 1);
    }

    #[test]
    fn test_writer_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = SqliteWriter.write(&sample_report(), dir.path()).unwrap();
        assert_eq!(
            path.file_name().unwrap(),
            "benchmark_20240517_093005.sqlite"
        );
        assert!(path.exists());
    }
}
