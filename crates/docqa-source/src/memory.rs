//! In-memory document collections.
//!
//! Stands in for a real database in tests and demos. The bookmark of each
//! document is its position in the collection.

use std::collections::BTreeMap;

use serde_json::Value;

use docqa_contracts::document::{ScannedDocument, SourceResult};
use docqa_core::traits::{DocumentSource, DocumentStream};

#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    collections: BTreeMap<String, Vec<Value>>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a collection.
    pub fn with_collection(mut self, name: impl Into<String>, documents: Vec<Value>) -> Self {
        self.insert(name, documents);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, documents: Vec<Value>) {
        self.collections.insert(name.into(), documents);
    }
}

impl DocumentSource for InMemorySource {
    fn collection_exists(&self, name: &str) -> SourceResult<bool> {
        Ok(self.collections.contains_key(name))
    }

    fn count(&self, name: &str) -> SourceResult<u64> {
        Ok(self.collections.get(name).map_or(0, |docs| docs.len() as u64))
    }

    fn scan(&self, name: &str, resume_from: Option<u64>) -> SourceResult<DocumentStream<'_>> {
        let docs = self.collections.get(name).map(Vec::as_slice).unwrap_or_default();
        let skip = resume_from.map_or(0, |b| b as usize + 1);
        Ok(Box::new(
            docs.iter()
                .enumerate()
                .skip(skip)
                .map(|(i, body)| Ok(ScannedDocument::new(i as u64, body.clone()))),
        ))
    }
}
