//! Rule file schema.
//!
//! These types mirror the TOML layout one to one. Each collection may list
//! explicit rule tables, shorthand sections, or both:
//!
//! ```toml
//! [settings]
//! workers = 4
//!
//! [source]
//! directory = "data"
//!
//! [[collections]]
//! name = "orders"
//! expected_count = 1000
//! required_fields = ["order_id", "customer.email"]
//!
//! [collections.data_types]
//! order_total = "float"
//!
//! [collections.categories]
//! "items[].category" = ["A", "B"]
//!
//! [collections.numeric_ranges]
//! order_total = { min = 0, max = 10000 }
//!
//! [collections.keywords]
//! currency_amt = ["$"]
//!
//! [[collections.rules]]
//! id = "status-known"
//! path = "status"
//! kind = "categorical"
//! allowed = ["active", "inactive"]
//! case_sensitive = false
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The whole rule file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RulesFile {
    #[serde(default)]
    pub settings: SettingsSection,
    #[serde(default)]
    pub source: SourceSection,
    #[serde(default)]
    pub collections: Vec<CollectionSection>,
}

/// `[settings]`: scan tuning. Unset fields keep the engine defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SettingsSection {
    pub batch_size: Option<usize>,
    pub workers: Option<usize>,
    pub queue_depth: Option<usize>,
    pub sample_capacity: Option<usize>,
}

/// `[source]`: where documents come from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceSection {
    /// Directory of `<collection>.jsonl` files. Relative paths are resolved
    /// against the rule file's directory.
    pub directory: Option<PathBuf>,
    /// Retries for transient source failures.
    pub max_retries: Option<u32>,
}

/// One `[[collections]]` entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CollectionSection {
    pub name: String,
    pub expected_count: Option<u64>,
    pub max_documents: Option<u64>,

    #[serde(default)]
    pub rules: Vec<RuleTable>,

    /// Paths that must exist.
    #[serde(default)]
    pub required_fields: Vec<String>,
    /// Path → type name.
    #[serde(default)]
    pub data_types: BTreeMap<String, String>,
    /// Path → allowed values.
    #[serde(default)]
    pub categories: BTreeMap<String, Vec<Value>>,
    /// Path → range params (`min`, `max`, ...).
    #[serde(default)]
    pub numeric_ranges: BTreeMap<String, Map<String, Value>>,
    /// Path → required markers.
    #[serde(default)]
    pub keywords: BTreeMap<String, Vec<String>>,
}

/// One `[[collections.rules]]` table. Keys other than the four named here
/// are the rule's parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleTable {
    pub id: Option<String>,
    pub description: Option<String>,
    pub path: String,
    pub kind: String,
    #[serde(flatten)]
    pub params: Map<String, Value>,
}
