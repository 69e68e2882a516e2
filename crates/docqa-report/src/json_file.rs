//! JSON file report sink.
//!
//! Writes the full `RunReport` as pretty-printed JSON. The document is
//! written to a sibling temporary file first and renamed into place, so a
//! reader never sees a half-written report.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use docqa_contracts::{
    error::{DqError, DqResult},
    report::RunReport,
};
use docqa_core::traits::ReportSink;

#[derive(Debug, Clone)]
pub struct JsonFileReportSink {
    path: PathBuf,
}

impl JsonFileReportSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, report: &RunReport) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut staging = self.path.clone().into_os_string();
        staging.push(".tmp");
        let staging = PathBuf::from(staging);

        let mut writer = BufWriter::new(File::create(&staging)?);
        serde_json::to_writer_pretty(&mut writer, report)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        drop(writer);

        fs::rename(&staging, &self.path)
    }
}

impl ReportSink for JsonFileReportSink {
    fn publish(&self, report: &RunReport) -> DqResult<()> {
        self.write(report).map_err(|e| DqError::Report {
            reason: format!("failed to write report to '{}': {e}", self.path.display()),
        })?;
        info!(path = %self.path.display(), run_id = %report.run_id, "run report written");
        Ok(())
    }
}
