//! Rule specifications and the verdicts they produce.
//!
//! A `FieldRuleSpec` is the parsed, not yet validated form of one entry in
//! the rule configuration. The plan compiler turns a list of them into an
//! executable plan; the `kind` stays a plain string until then so an unknown
//! kind surfaces as a configuration error rather than a parse error.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One declarative field rule, as supplied by the configuration loader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRuleSpec {
    /// Optional stable identifier used in reports and logs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Optional human-readable explanation shown next to the rule's results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Dotted field path pattern, e.g. `"items[].category"`.
    pub path: String,

    /// Evaluator kind name, e.g. `"categorical"`.
    pub kind: String,

    /// Kind-specific parameters.
    #[serde(default)]
    pub params: Map<String, Value>,
}

impl FieldRuleSpec {
    /// A rule with no parameters.
    pub fn new(path: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: None,
            description: None,
            path: path.into(),
            kind: kind.into(),
            params: Map::new(),
        }
    }

    /// Builder-style parameter setter.
    pub fn with_param(mut self, name: impl Into<String>, value: Value) -> Self {
        self.params.insert(name.into(), value);
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// The name this rule is reported under: its `id`, or `"<kind>:<path>"`.
    pub fn label(&self) -> String {
        match &self.id {
            Some(id) => id.clone(),
            None => format!("{}:{}", self.kind, self.path),
        }
    }
}

/// The categorized outcome of one rule against one matched value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Pass,
    /// The path does not exist in the document.
    FailMissing,
    /// The path exists but holds `null`.
    FailNull,
    /// The value has the wrong runtime type for the rule.
    FailType,
    /// The value is not in the allowed category set.
    FailValue,
    /// The numeric value is outside the declared bounds.
    FailRange,
    /// A required keyword or marker is missing from the string.
    FailPattern,
}

impl Verdict {
    pub fn is_pass(self) -> bool {
        self == Verdict::Pass
    }

    /// The wire name, e.g. `"FAIL_RANGE"`.
    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Pass => "PASS",
            Verdict::FailMissing => "FAIL_MISSING",
            Verdict::FailNull => "FAIL_NULL",
            Verdict::FailType => "FAIL_TYPE",
            Verdict::FailValue => "FAIL_VALUE",
            Verdict::FailRange => "FAIL_RANGE",
            Verdict::FailPattern => "FAIL_PATTERN",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A verdict plus the evaluator's diagnostic detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    pub verdict: Verdict,
    /// Explanation for failures, e.g. `"150 is outside [0, 100]"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl Evaluation {
    pub fn pass() -> Self {
        Self {
            verdict: Verdict::Pass,
            detail: None,
        }
    }

    pub fn fail(verdict: Verdict, detail: impl Into<String>) -> Self {
        Self {
            verdict,
            detail: Some(detail.into()),
        }
    }
}

/// Everything configured for one collection: count expectation, scan cap,
/// and the ordered rule list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionRules {
    pub name: String,
    /// Minimum number of documents the collection should hold.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_count: Option<u64>,
    /// Stop after evaluating this many documents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_documents: Option<u64>,
    #[serde(default)]
    pub rules: Vec<FieldRuleSpec>,
}

impl CollectionRules {
    pub fn new(name: impl Into<String>, rules: Vec<FieldRuleSpec>) -> Self {
        Self {
            name: name.into(),
            expected_count: None,
            max_documents: None,
            rules,
        }
    }
}
