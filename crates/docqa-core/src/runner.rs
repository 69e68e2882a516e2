//! The run driver.
//!
//! A run is: compile every collection's plan up front, then check the
//! collections strictly one after another, then hand the assembled report to
//! the sink. The `Runner` and `RunPlan` together are the run context; there
//! is no process-wide state, so a run is created, executed, and dropped.
//!
//! Per collection:
//!
//!   plan compiled? → exists? → count vs expected → scan → CollectionReport
//!
//! A failure at any step is confined to that collection's report. Only a
//! sink failure makes `run` return an error.

use chrono::Utc;
use tracing::{debug, error, info, warn};

use docqa_contracts::{
    error::{DqError, DqResult},
    report::{CollectionReport, CountFinding, RunReport, ScanStatus},
    rule::CollectionRules,
};

use crate::{
    plan::{compile, ValidationPlan},
    report::{config_digest, ReportBuilder},
    scanner::{CancelToken, ScanSettings, Scanner},
    traits::{DocumentSource, ReportSink, RuleBinder},
};

/// One collection's compiled plan (or the reason it did not compile) and
/// its scan expectations.
#[derive(Debug)]
pub struct PlannedCollection {
    pub name: String,
    pub expected_count: Option<u64>,
    pub max_documents: Option<u64>,
    pub plan: DqResult<ValidationPlan>,
}

/// Every configured collection, compiled once for the run.
#[derive(Debug)]
pub struct RunPlan {
    collections: Vec<PlannedCollection>,
    digest: String,
}

impl RunPlan {
    /// Compile all collections. Compile failures are kept per collection
    /// rather than aborting the whole plan.
    pub fn compile(config: &[CollectionRules], binder: &dyn RuleBinder) -> Self {
        let collections = config
            .iter()
            .map(|c| {
                let plan = compile(&c.name, &c.rules, binder);
                if let Err(e) = &plan {
                    warn!(collection = %c.name, error = %e, "rule set failed to compile");
                }
                PlannedCollection {
                    name: c.name.clone(),
                    expected_count: c.expected_count,
                    max_documents: c.max_documents,
                    plan,
                }
            })
            .collect();

        Self {
            collections,
            digest: config_digest(config),
        }
    }

    pub fn collections(&self) -> &[PlannedCollection] {
        &self.collections
    }

    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// Compile errors, in collection order.
    pub fn config_errors(&self) -> impl Iterator<Item = &DqError> {
        self.collections.iter().filter_map(|c| c.plan.as_ref().err())
    }
}

/// Executes a `RunPlan` against a source and publishes the result.
pub struct Runner {
    source: Box<dyn DocumentSource>,
    sink: Box<dyn ReportSink>,
    settings: ScanSettings,
    cancel: CancelToken,
}

impl Runner {
    pub fn new(
        source: Box<dyn DocumentSource>,
        sink: Box<dyn ReportSink>,
        settings: ScanSettings,
    ) -> Self {
        Self {
            source,
            sink,
            settings,
            cancel: CancelToken::new(),
        }
    }

    /// Use an externally owned cancel token (e.g. one wired to Ctrl-C).
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Check every collection in order, publish the report, and return it.
    pub fn run(&self, plan: &RunPlan) -> DqResult<RunReport> {
        let mut builder = ReportBuilder::new(plan.digest());
        info!(
            run_id = %builder.run_id(),
            collections = plan.collections().len(),
            workers = self.settings.workers,
            "run starting"
        );

        for planned in plan.collections() {
            let report = self.check_collection(planned);
            info!(
                collection = %report.collection_name,
                status = ?report.status,
                documents = report.documents_scanned,
                violations = report.violations(),
                "collection checked"
            );
            builder.push(report);
        }

        let report = builder.finish();
        self.sink.publish(&report)?;
        info!(
            run_id = %report.run_id,
            violations = report.total_violations(),
            "run finished"
        );
        Ok(report)
    }

    /// Check one collection. Never fails: every outcome is a report.
    pub fn check_collection(&self, planned: &PlannedCollection) -> CollectionReport {
        let started_at = Utc::now();
        let name = planned.name.as_str();
        let skipped = |exists: bool, status: ScanStatus| {
            CollectionReport::skipped(name, exists, status, planned.expected_count, started_at)
        };
        // Existence for collections that are reported but not scanned.
        let exists_or_false = || match self.source.collection_exists(name) {
            Ok(exists) => exists,
            Err(e) => {
                warn!(collection = name, error = %e, "collection existence unknown");
                false
            }
        };

        let plan = match &planned.plan {
            Ok(plan) => plan,
            Err(e) => {
                return skipped(
                    exists_or_false(),
                    ScanStatus::ConfigInvalid {
                        reason: e.to_string(),
                    },
                )
            }
        };

        if self.cancel.is_cancelled() {
            return skipped(exists_or_false(), ScanStatus::Cancelled);
        }

        match self.source.collection_exists(name) {
            Ok(true) => {}
            Ok(false) => {
                let e = DqError::CollectionMissing { collection: name.to_string() };
                warn!(error = %e, "collection skipped");
                return skipped(false, ScanStatus::Missing);
            }
            Err(e) => {
                error!(collection = name, error = %e, "collection unreachable");
                return skipped(false, ScanStatus::Unreachable { reason: e.to_string() });
            }
        }

        let actual_count = match self.source.count(name) {
            Ok(n) => Some(n),
            Err(e) => {
                warn!(collection = name, error = %e, "document count unavailable");
                None
            }
        };
        let count_finding = planned
            .expected_count
            .zip(actual_count)
            .map(|(expected, actual)| CountFinding::new(expected, actual));
        if let Some(finding) = count_finding.filter(|f| !f.satisfied) {
            warn!(
                collection = name,
                expected = finding.expected,
                actual = finding.actual,
                "collection holds fewer documents than expected"
            );
        }

        debug!(collection = name, rules = plan.len(), "scanning collection");
        let scanner = Scanner::new(plan, self.source.as_ref(), &self.settings, &self.cancel);

        let (status, documents_scanned, documents_failed, rule_results) =
            match scanner.scan(planned.max_documents) {
                Ok(outcome) => {
                    let status = match outcome.interrupted {
                        Some(e) => ScanStatus::Incomplete {
                            reason: DqError::DataAccess {
                                collection: name.to_string(),
                                reason: e.to_string(),
                            }
                            .to_string(),
                        },
                        None => ScanStatus::Complete,
                    };
                    let aggregate = outcome.aggregate;
                    (
                        status,
                        aggregate.documents(),
                        aggregate.documents_failed(),
                        aggregate.finalize(plan),
                    )
                }
                Err(DqError::Cancelled { .. }) => {
                    warn!(collection = name, "scan cancelled; partial results discarded");
                    (ScanStatus::Cancelled, 0, 0, Vec::new())
                }
                Err(e) => {
                    error!(collection = name, error = %e, "scan aborted");
                    (
                        ScanStatus::Aborted {
                            reason: e.to_string(),
                        },
                        0,
                        0,
                        Vec::new(),
                    )
                }
            };

        CollectionReport {
            collection_name: name.to_string(),
            exists: true,
            status,
            expected_count: planned.expected_count,
            actual_count,
            count_finding,
            documents_scanned,
            documents_failed,
            rule_results,
            started_at,
            finished_at: Utc::now(),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
