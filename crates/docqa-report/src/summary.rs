//! Plain-text run summaries.

use std::fmt;
use std::io::Write;
use std::sync::Mutex;

use docqa_contracts::{
    error::{DqError, DqResult},
    report::{AggregateResult, CollectionReport, RunReport, ScanStatus},
};
use docqa_core::traits::ReportSink;

/// Render `report` as an operator-facing text summary.
pub fn render_summary(report: &RunReport) -> String {
    Summary(report).to_string()
}

struct Summary<'r>(&'r RunReport);

impl fmt::Display for Summary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.0;
        let digest = report.config_digest.get(..12).unwrap_or(&report.config_digest);
        writeln!(f, "run {} (rules {digest})", report.run_id)?;

        for collection in &report.collections {
            render_collection(f, collection)?;
        }

        writeln!(f, "total violations: {}", report.total_violations())
    }
}

fn status_text(status: &ScanStatus) -> String {
    match status {
        ScanStatus::Complete => "complete".to_string(),
        ScanStatus::Incomplete { reason } => format!("incomplete ({reason})"),
        ScanStatus::Missing => "missing".to_string(),
        ScanStatus::Unreachable { reason } => format!("unreachable ({reason})"),
        ScanStatus::ConfigInvalid { reason } => format!("invalid rules ({reason})"),
        ScanStatus::Aborted { reason } => format!("aborted ({reason})"),
        ScanStatus::Cancelled => "cancelled".to_string(),
    }
}

/// Whether the collection was counted and a scan was started.
fn scan_started(status: &ScanStatus) -> bool {
    matches!(
        status,
        ScanStatus::Complete | ScanStatus::Incomplete { .. } | ScanStatus::Aborted { .. }
    )
}

fn render_collection(f: &mut fmt::Formatter<'_>, c: &CollectionReport) -> fmt::Result {
    write!(f, "{}: {}", c.collection_name, status_text(&c.status))?;
    let scanned = scan_started(&c.status);
    if scanned {
        write!(
            f,
            ", {} documents scanned, {} failed",
            c.documents_scanned, c.documents_failed
        )?;
    }
    writeln!(f)?;

    if let Some(finding) = c.count_finding {
        let verdict = if finding.satisfied { "ok" } else { "SHORT" };
        writeln!(
            f,
            "  count: expected at least {}, actual {} ({verdict})",
            finding.expected, finding.actual
        )?;
    } else if let (Some(expected), true) = (c.expected_count, scanned) {
        writeln!(f, "  count: expected at least {expected}, actual unknown")?;
    }

    for rule in &c.rule_results {
        render_rule(f, rule)?;
    }
    Ok(())
}

fn render_rule(f: &mut fmt::Formatter<'_>, r: &AggregateResult) -> fmt::Result {
    write!(
        f,
        "  [{}] evaluated {}, passed {}, failed {}",
        r.rule_id, r.evaluated, r.passed, r.failed
    )?;
    if !r.fail_by_kind.is_empty() {
        let kinds: Vec<String> = r
            .fail_by_kind
            .iter()
            .map(|(verdict, n)| format!("{verdict} {n}"))
            .collect();
        write!(f, " ({})", kinds.join(", "))?;
    }
    writeln!(f)?;

    for s in &r.samples {
        let value = s.value.as_ref().map_or("<absent>".to_string(), |v| v.to_string());
        write!(f, "    {} {} = {value} {}", s.document_id, s.location, s.verdict)?;
        if let Some(detail) = &s.detail {
            write!(f, ": {detail}")?;
        }
        writeln!(f)?;
    }
    Ok(())
}

/// Writes `render_summary` output to a writer (stdout in the CLI).
pub struct SummarySink<W> {
    writer: Mutex<W>,
}

impl<W: Write + Send> SummarySink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        match self.writer.into_inner() {
            Ok(w) => w,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<W: Write + Send> ReportSink for SummarySink<W> {
    fn publish(&self, report: &RunReport) -> DqResult<()> {
        let text = render_summary(report);
        let mut writer = self.writer.lock().map_err(|e| DqError::Report {
            reason: format!("summary writer lock poisoned: {e}"),
        })?;
        writer
            .write_all(text.as_bytes())
            .and_then(|_| writer.flush())
            .map_err(|e| DqError::Report {
                reason: format!("failed to write summary: {e}"),
            })
    }
}
