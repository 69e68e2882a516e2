//! Trait seams of the docqa engine.
//!
//! - `Evaluator`     : one bound rule check, pure and total
//! - `RuleBinder`    : turns a rule kind name and its params into an `Evaluator`
//! - `DocumentSource`: the database collaborator (existence, count, cursor)
//! - `ReportSink`    : the reporting collaborator
//!
//! The engine owns none of the I/O: sources and sinks are supplied by the
//! hosting application, evaluators by a registry.

use serde_json::{Map, Value};

use docqa_contracts::{
    document::{ScannedDocument, SourceResult},
    error::DqResult,
    report::RunReport,
    rule::{Evaluation, Verdict},
};

use crate::path::Matched;

/// A rule check with its parameters already bound.
///
/// Implementations only see present, non-null values through `check`. The
/// provided `evaluate` handles absence and null uniformly, so every kind
/// reports `FAIL_MISSING` and `FAIL_NULL` the same way.
pub trait Evaluator: Send + Sync {
    /// Judge a present, non-null value. Must not panic.
    fn check(&self, value: &Value) -> Evaluation;

    /// Judge one path match.
    fn evaluate(&self, matched: &Matched<'_>) -> Evaluation {
        match matched {
            Matched::Absent => Evaluation::fail(Verdict::FailMissing, "field is absent"),
            Matched::Null => Evaluation::fail(Verdict::FailNull, "field is null"),
            Matched::Value(value) => self.check(value),
        }
    }
}

/// Builds evaluators from rule kind names.
///
/// Returns `Err(reason)` for unknown kinds or malformed parameters; the plan
/// compiler adds the collection and rule context.
pub trait RuleBinder: Send + Sync {
    fn bind(&self, kind: &str, params: &Map<String, Value>) -> Result<Box<dyn Evaluator>, String>;
}

/// A lazy, single-pass document cursor.
pub type DocumentStream<'a> = Box<dyn Iterator<Item = SourceResult<ScannedDocument>> + 'a>;

/// The database collaborator.
///
/// Cursor paging, connection handling and retries are the source's concern.
/// A stream that yields `Err` is treated as exhausted: the scanner stops
/// reading and reports the collection as incomplete.
pub trait DocumentSource: Send + Sync {
    fn collection_exists(&self, name: &str) -> SourceResult<bool>;

    /// Number of documents in the collection.
    fn count(&self, name: &str) -> SourceResult<u64>;

    /// Open a cursor over the collection. With `resume_from = Some(b)` the
    /// cursor starts after the document whose bookmark is `b`.
    fn scan(&self, name: &str, resume_from: Option<u64>) -> SourceResult<DocumentStream<'_>>;
}

/// The reporting collaborator: receives the full run's result model.
pub trait ReportSink: Send + Sync {
    fn publish(&self, report: &RunReport) -> DqResult<()>;
}
