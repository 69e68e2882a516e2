//! Report model assembly.
//!
//! `ReportBuilder` collects collection reports in scan order and seals them
//! into a `RunReport`. The configuration digest lets two runs over the same
//! rule set be recognised as comparable.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use docqa_contracts::{
    report::{CollectionReport, RunId, RunReport},
    rule::CollectionRules,
};

/// SHA-256 (lowercase hex) of the canonical JSON of `collections`.
///
/// Rule parameters are stored in sorted maps, so the same configuration
/// always produces the same digest.
pub fn config_digest(collections: &[CollectionRules]) -> String {
    let mut hasher = Sha256::new();
    for collection in collections {
        // Serializing plain data structs cannot fail.
        let bytes = serde_json::to_vec(collection).unwrap_or_default();
        hasher.update((bytes.len() as u64).to_le_bytes());
        hasher.update(&bytes);
    }
    hex::encode(hasher.finalize())
}

/// Accumulates collection reports for one run.
#[derive(Debug)]
pub struct ReportBuilder {
    run_id: RunId,
    started_at: DateTime<Utc>,
    config_digest: String,
    collections: Vec<CollectionReport>,
}

impl ReportBuilder {
    pub fn new(config_digest: impl Into<String>) -> Self {
        Self {
            run_id: RunId::new(),
            started_at: Utc::now(),
            config_digest: config_digest.into(),
            collections: Vec::new(),
        }
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    pub fn push(&mut self, report: CollectionReport) {
        self.collections.push(report);
    }

    pub fn finish(self) -> RunReport {
        RunReport {
            run_id: self.run_id,
            started_at: self.started_at,
            finished_at: Utc::now(),
            config_digest: self.config_digest,
            collections: self.collections,
        }
    }
}
