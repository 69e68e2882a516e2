//! The result model handed to the reporting collaborator.
//!
//! A `RunReport` holds one `CollectionReport` per configured collection, in
//! the order the collections were declared. Each collection report carries
//! one `AggregateResult` per compiled rule.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::rule::Verdict;

/// Unique identifier for one engine run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub uuid::Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// One retained failure, kept for diagnosis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureSample {
    pub document_id: String,
    /// Concrete location of the failing value, e.g. `"items[1].category"`.
    pub location: String,
    /// The failing value; `None` when the path was absent.
    pub value: Option<Value>,
    pub verdict: Verdict,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Accumulated outcome of one rule over a collection scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult {
    /// Position of the rule in the collection's plan.
    pub rule_index: usize,
    /// The rule's report label (its id, or `"<kind>:<path>"`).
    pub rule_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub path: String,
    pub kind: String,
    /// Number of verdicts produced (one per path match).
    pub evaluated: u64,
    pub passed: u64,
    pub failed: u64,
    /// Failure counts keyed by verdict. Never contains `PASS`.
    pub fail_by_kind: BTreeMap<Verdict, u64>,
    /// The first failures seen, up to the configured sample capacity.
    pub samples: Vec<FailureSample>,
}

impl AggregateResult {
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

/// Expected-versus-actual document count for a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountFinding {
    pub expected: u64,
    pub actual: u64,
    /// True when the collection holds at least `expected` documents.
    pub satisfied: bool,
}

impl CountFinding {
    pub fn new(expected: u64, actual: u64) -> Self {
        Self {
            expected,
            actual,
            satisfied: actual >= expected,
        }
    }
}

/// How far the check of one collection got.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ScanStatus {
    /// Every document (or the configured maximum) was evaluated.
    Complete,
    /// The source failed mid-scan; rule results cover what was read.
    Incomplete { reason: String },
    /// The collection does not exist.
    Missing,
    /// The source could not be queried at all.
    Unreachable { reason: String },
    /// The collection's rules failed to compile; nothing was scanned.
    ConfigInvalid { reason: String },
    /// An engine defect stopped the scan; partial results were discarded.
    Aborted { reason: String },
    /// The run was cancelled before this collection finished.
    Cancelled,
}

impl ScanStatus {
    /// True when the collection could not be accessed at all.
    pub fn is_inaccessible(&self) -> bool {
        matches!(self, ScanStatus::Missing | ScanStatus::Unreachable { .. })
    }
}

/// The checked state of one collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionReport {
    pub collection_name: String,
    pub exists: bool,
    pub status: ScanStatus,
    pub expected_count: Option<u64>,
    /// The count reported by the source, when it could be obtained.
    pub actual_count: Option<u64>,
    pub count_finding: Option<CountFinding>,
    pub documents_scanned: u64,
    /// Documents with at least one failing verdict.
    pub documents_failed: u64,
    pub rule_results: Vec<AggregateResult>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl CollectionReport {
    /// A report carrying no scan results, for collections that were skipped.
    pub fn skipped(
        collection_name: impl Into<String>,
        exists: bool,
        status: ScanStatus,
        expected_count: Option<u64>,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            collection_name: collection_name.into(),
            exists,
            status,
            expected_count,
            actual_count: None,
            count_finding: None,
            documents_scanned: 0,
            documents_failed: 0,
            rule_results: Vec::new(),
            started_at,
            finished_at: Utc::now(),
        }
    }

    /// Total failing verdicts across all rules.
    pub fn violations(&self) -> u64 {
        self.rule_results.iter().map(|r| r.failed).sum()
    }

    /// True when nothing in this collection needs attention.
    pub fn is_clean(&self) -> bool {
        self.status == ScanStatus::Complete
            && self.violations() == 0
            && self.count_finding.map_or(true, |c| c.satisfied)
    }
}

/// The full output of one run, in declared collection order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: RunId,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// SHA-256 (hex) of the compiled rule specifications.
    pub config_digest: String,
    pub collections: Vec<CollectionReport>,
}

impl RunReport {
    /// True if any collection was missing or unreachable.
    pub fn has_inaccessible_collection(&self) -> bool {
        self.collections.iter().any(|c| c.status.is_inaccessible())
    }

    /// True if any collection's rules failed to compile.
    pub fn has_invalid_config(&self) -> bool {
        self.collections
            .iter()
            .any(|c| matches!(c.status, ScanStatus::ConfigInvalid { .. }))
    }

    /// Failing verdicts plus unmet count expectations, across all collections.
    pub fn total_violations(&self) -> u64 {
        self.collections
            .iter()
            .map(|c| {
                let count_miss = c.count_finding.map_or(0, |f| u64::from(!f.satisfied));
                c.violations() + count_miss
            })
            .sum()
    }
}
