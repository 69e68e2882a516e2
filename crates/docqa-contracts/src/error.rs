//! Error types for the docqa engine.
//!
//! Rule verdict failures (`FAIL_*`) are never errors: they are recorded in
//! aggregates. The variants here describe conditions that stop a plan from
//! being built or a collection scan from completing.

use thiserror::Error;

/// The unified error type for the docqa crates.
#[derive(Debug, Error)]
pub enum DqError {
    /// A rule specification or configuration file is malformed.
    ///
    /// Fatal for the named collection's plan only; other collections run.
    #[error("configuration error in '{collection}': {reason}")]
    ConfigError { collection: String, reason: String },

    /// The collection does not exist in the source.
    #[error("collection '{collection}' does not exist")]
    CollectionMissing { collection: String },

    /// The source failed while the collection was being read and its own
    /// retry policy gave up.
    #[error("data access failed for '{collection}': {reason}")]
    DataAccess { collection: String, reason: String },

    /// An evaluator or the path resolver panicked. This is a bug in the
    /// engine, not a data-quality finding.
    #[error("engine defect in '{collection}' (document {document_id}, rule {rule}): {reason}")]
    EngineDefect {
        collection: String,
        document_id: String,
        rule: String,
        reason: String,
    },

    /// The operator aborted the run while this collection was in progress.
    #[error("scan of '{collection}' was cancelled")]
    Cancelled { collection: String },

    /// The report collaborator could not accept the run report.
    #[error("report publication failed: {reason}")]
    Report { reason: String },
}

impl DqError {
    /// Shorthand for a `ConfigError` scoped to one collection.
    pub fn config(collection: impl Into<String>, reason: impl Into<String>) -> Self {
        DqError::ConfigError {
            collection: collection.into(),
            reason: reason.into(),
        }
    }
}

/// Convenience alias used throughout the docqa crates.
pub type DqResult<T> = Result<T, DqError>;
