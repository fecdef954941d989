//! JSON report file

use crate::output::report::RunReport;
use crate::output::traits::{OutputResult, ReportWriter};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Writes `benchmark_<timestamp>.json`
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonWriter;

impl ReportWriter for JsonWriter {
    fn write(&self, report: &RunReport, dir: &Path) -> OutputResult<PathBuf> {
        let path = dir.join(format!("{}.json", report.file_stem()));
        let mut writer = BufWriter::new(File::create(&path)?);
        serde_json::to_writer_pretty(&mut writer, report)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(path)
    }
}
