//! Documents as delivered by a source, and the source's failure type.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// The identifier recorded in samples when a document carries no `_id`.
pub const UNKNOWN_DOCUMENT_ID: &str = "Unknown";

/// One document read from a collection cursor.
///
/// `body` is an arbitrary JSON tree. The engine only borrows it; a document
/// is dropped once every rule has been evaluated against it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScannedDocument {
    /// Identifier used in failure samples (the document's `_id`).
    pub id: String,
    /// Source position of this document. A scan restarted with
    /// `resume_from = Some(bookmark)` continues after this document.
    pub bookmark: u64,
    /// The document tree.
    pub body: Value,
}

impl ScannedDocument {
    /// Wrap `body`, deriving the identifier from its `_id` field.
    ///
    /// String ids are used verbatim; any other non-null id is rendered as
    /// compact JSON (so `{"$oid": "..."}` stays readable).
    pub fn new(bookmark: u64, body: Value) -> Self {
        let id = document_id(&body);
        Self { id, bookmark, body }
    }
}

/// Extract the display identifier of a document.
pub fn document_id(body: &Value) -> String {
    match body.get("_id") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => UNKNOWN_DOCUMENT_ID.to_string(),
        Some(other) => other.to_string(),
    }
}

/// A failure reported by a document source.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{reason}{}", transient_suffix(.transient))]
pub struct SourceError {
    /// Human-readable cause.
    pub reason: String,
    /// True when retrying the same operation may succeed (timeouts, dropped
    /// connections). Non-transient errors are never retried.
    pub transient: bool,
}

impl SourceError {
    pub fn transient(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            transient: true,
        }
    }

    pub fn fatal(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            transient: false,
        }
    }
}

fn transient_suffix(transient: &bool) -> &'static str {
    if *transient {
        " (transient)"
    } else {
        ""
    }
}

/// Result alias for source operations.
pub type SourceResult<T> = Result<T, SourceError>;
