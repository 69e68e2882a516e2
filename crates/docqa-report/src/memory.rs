//! In-memory implementation of `ReportSink`.
//!
//! Published reports are kept in a `Vec` behind `Arc<Mutex<_>>`. Clones of
//! the sink share the same storage, so a test can hand one clone to the
//! runner and inspect the other afterwards.

use std::sync::{Arc, Mutex};

use tracing::info;

use docqa_contracts::{
    error::{DqError, DqResult},
    report::RunReport,
};
use docqa_core::traits::ReportSink;

#[derive(Debug, Clone, Default)]
pub struct InMemoryReportSink {
    reports: Arc<Mutex<Vec<RunReport>>>,
}

impl InMemoryReportSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All reports published so far, in publication order.
    pub fn reports(&self) -> Vec<RunReport> {
        match self.reports.lock() {
            Ok(reports) => reports.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn last(&self) -> Option<RunReport> {
        self.reports().pop()
    }
}

impl ReportSink for InMemoryReportSink {
    fn publish(&self, report: &RunReport) -> DqResult<()> {
        let mut reports = self.reports.lock().map_err(|e| DqError::Report {
            reason: format!("report store lock poisoned: {e}"),
        })?;
        reports.push(report.clone());
        info!(run_id = %report.run_id, stored = reports.len(), "run report stored");
        Ok(())
    }
}
