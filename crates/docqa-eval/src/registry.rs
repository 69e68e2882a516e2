//! The evaluator registry.
//!
//! `EvaluatorRegistry` implements the `RuleBinder` trait from `docqa-core`:
//! it maps a rule kind name to a binder function that validates the rule's
//! params and builds the evaluator. The six built-in kinds are registered by
//! `standard()`; hosting applications add their own with `register`.

use std::collections::HashMap;

use serde_json::{Map, Value};
use tracing::debug;

use docqa_core::traits::{Evaluator, RuleBinder};

use crate::kinds::{Categorical, Keywords, Present, Range, TypeCheck};

/// Builds an evaluator for one kind from a rule's params.
///
/// Receives the kind name it was registered under (for error messages) and
/// the params. Returns `Err(reason)` when the params are missing or invalid.
pub type BinderFn =
    Box<dyn Fn(&str, &Map<String, Value>) -> Result<Box<dyn Evaluator>, String> + Send + Sync>;

/// Rule kinds known to the engine.
pub struct EvaluatorRegistry {
    binders: HashMap<String, BinderFn>,
}

impl EvaluatorRegistry {
    /// A registry with no kinds registered.
    pub fn empty() -> Self {
        Self {
            binders: HashMap::new(),
        }
    }

    /// A registry holding the built-in kinds: `exists`, `not_null`, `type`,
    /// `categorical`, `range` and `keywords`.
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register("exists", Box::new(Present::bind));
        registry.register("not_null", Box::new(Present::bind));
        registry.register("type", Box::new(TypeCheck::bind));
        registry.register("categorical", Box::new(Categorical::bind));
        registry.register("range", Box::new(Range::bind));
        registry.register("keywords", Box::new(Keywords::bind));
        registry
    }

    /// Register `binder` under `kind`. Registering an existing name replaces
    /// the previous binder, built-ins included.
    pub fn register(&mut self, kind: impl Into<String>, binder: BinderFn) {
        self.binders.insert(kind.into(), binder);
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.binders.contains_key(kind)
    }

    /// Registered kind names, sorted.
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.binders.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }
}

impl Default for EvaluatorRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl RuleBinder for EvaluatorRegistry {
    fn bind(&self, kind: &str, params: &Map<String, Value>) -> Result<Box<dyn Evaluator>, String> {
        let binder = self.binders.get(kind).ok_or_else(|| {
            format!(
                "unknown rule kind '{kind}' (known: {})",
                self.kinds().join(", ")
            )
        })?;
        debug!(kind, params = params.len(), "binding evaluator");
        binder(kind, params)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
