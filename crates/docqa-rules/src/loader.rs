//! Loading and expanding rule files.
//!
//! `RulesConfig` parses a `RulesFile`, expands each collection's shorthand
//! sections into `FieldRuleSpec`s and checks file-level consistency. Rule
//! semantics (kinds, params, paths) are not checked here; the plan compiler
//! does that per collection so one bad collection does not block the others.
//!
//! Expansion order within a collection:
//!
//! 1. explicit `[[collections.rules]]`, in declaration order
//! 2. `required_fields` → `exists`
//! 3. `data_types` → `type`
//! 4. `categories` → `categorical`
//! 5. `numeric_ranges` → `range`
//! 6. `keywords` → `keywords`
//!
//! Map-valued sections expand in key order.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde_json::{json, Value};
use tracing::{debug, warn};

use docqa_contracts::{
    error::{DqError, DqResult},
    rule::{CollectionRules, FieldRuleSpec},
};
use docqa_core::scanner::ScanSettings;

use crate::schema::{CollectionSection, RulesFile};

/// Scope name used for errors that concern the file rather than one
/// collection.
pub const FILE_SCOPE: &str = "rules file";

/// A loaded rule file.
#[derive(Debug, Clone)]
pub struct RulesConfig {
    file: RulesFile,
    collections: Vec<CollectionRules>,
    base_dir: Option<PathBuf>,
}

impl RulesConfig {
    /// Parse `s` as a TOML rule file.
    ///
    /// Returns `DqError::ConfigError` if the TOML is malformed, does not
    /// match the schema, or declares the same collection twice.
    pub fn from_toml_str(s: &str) -> DqResult<Self> {
        let file: RulesFile = toml::from_str(s)
            .map_err(|e| DqError::config(FILE_SCOPE, format!("failed to parse rules TOML: {e}")))?;
        Self::from_rules_file(file)
    }

    /// Read and parse the rule file at `path`. Relative paths inside the
    /// file are resolved against the file's directory.
    pub fn from_file(path: &Path) -> DqResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            DqError::config(
                FILE_SCOPE,
                format!("failed to read rules file '{}': {e}", path.display()),
            )
        })?;
        let mut config = Self::from_toml_str(&contents)?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    pub fn from_rules_file(file: RulesFile) -> DqResult<Self> {
        validate_settings(&file)?;

        let mut seen = HashSet::new();
        for collection in &file.collections {
            if collection.name.trim().is_empty() {
                return Err(DqError::config(FILE_SCOPE, "collection name must not be empty"));
            }
            if !seen.insert(collection.name.as_str()) {
                return Err(DqError::config(
                    collection.name.as_str(),
                    "collection is declared more than once",
                ));
            }
        }

        let collections: Vec<CollectionRules> = file.collections.iter().map(expand).collect();
        for c in &collections {
            if c.rules.is_empty() {
                warn!(
                    collection = %c.name,
                    "collection has no rules; only existence and count are checked"
                );
            }
            debug!(collection = %c.name, rules = c.rules.len(), "collection rules loaded");
        }

        Ok(Self {
            file,
            collections,
            base_dir: None,
        })
    }

    /// Every collection's expanded rules, in declaration order.
    pub fn collections(&self) -> &[CollectionRules] {
        &self.collections
    }

    /// Scan settings from `[settings]` over the engine defaults.
    pub fn scan_settings(&self) -> ScanSettings {
        let s = &self.file.settings;
        let defaults = ScanSettings::default();
        ScanSettings {
            batch_size: s.batch_size.unwrap_or(defaults.batch_size),
            workers: s.workers.unwrap_or(defaults.workers),
            queue_depth: s.queue_depth.unwrap_or(defaults.queue_depth),
            sample_capacity: s.sample_capacity.unwrap_or(defaults.sample_capacity),
        }
    }

    /// The data directory from `[source]`, resolved against the rule file's
    /// directory when relative.
    pub fn data_directory(&self) -> Option<PathBuf> {
        let dir = self.file.source.directory.as_ref()?;
        match &self.base_dir {
            Some(base) if dir.is_relative() => Some(base.join(dir)),
            _ => Some(dir.clone()),
        }
    }

    pub fn max_retries(&self) -> Option<u32> {
        self.file.source.max_retries
    }
}

fn validate_settings(file: &RulesFile) -> DqResult<()> {
    let s = &file.settings;
    if s.batch_size == Some(0) {
        return Err(DqError::config(FILE_SCOPE, "settings.batch_size must be at least 1"));
    }
    if s.workers == Some(0) {
        return Err(DqError::config(FILE_SCOPE, "settings.workers must be at least 1"));
    }
    Ok(())
}

/// Expand one collection section into its ordered rule list.
fn expand(section: &CollectionSection) -> CollectionRules {
    let mut rules: Vec<FieldRuleSpec> = section
        .rules
        .iter()
        .map(|t| FieldRuleSpec {
            id: t.id.clone(),
            description: t.description.clone(),
            path: t.path.clone(),
            kind: t.kind.clone(),
            params: t.params.clone(),
        })
        .collect();

    rules.extend(
        section
            .required_fields
            .iter()
            .map(|path| FieldRuleSpec::new(path.as_str(), "exists")),
    );
    rules.extend(section.data_types.iter().map(|(path, ty)| {
        FieldRuleSpec::new(path.as_str(), "type").with_param("expected", json!(ty))
    }));
    rules.extend(section.categories.iter().map(|(path, allowed)| {
        FieldRuleSpec::new(path.as_str(), "categorical")
            .with_param("allowed", Value::Array(allowed.clone()))
    }));
    rules.extend(section.numeric_ranges.iter().map(|(path, bounds)| {
        let mut spec = FieldRuleSpec::new(path.as_str(), "range");
        spec.params = bounds.clone();
        spec
    }));
    rules.extend(section.keywords.iter().map(|(path, markers)| {
        FieldRuleSpec::new(path.as_str(), "keywords").with_param("required", json!(markers))
    }));

    CollectionRules {
        name: section.name.clone(),
        expected_count: section.expected_count,
        max_documents: section.max_documents,
        rules,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use serde_json::json;
    use tempfile::TempDir;

    use docqa_contracts::error::DqError;
    use docqa_core::{compile, scanner::ScanSettings};
    use docqa_eval::EvaluatorRegistry;

    use super::RulesConfig;

    const SAMPLE: &str = r#"
        [settings]
        workers = 4
        sample_capacity = 5

        [source]
        directory = "data"

        [[collections]]
        name = "orders"
        expected_count = 1000
        max_documents = 5000
        required_fields = ["order_id", "customer.email"]

        [collections.data_types]
        order_total = "float"

        [collections.categories]
        "items[].category" = ["A", "B"]

        [collections.numeric_ranges]
        order_total = { min = 0, max = 10000 }

        [collections.keywords]
        currency_amt = ["$"]

        [[collections.rules]]
        id = "status-known"
        description = "status must be a known state"
        path = "status"
        kind = "categorical"
        allowed = ["active", "inactive"]
        case_sensitive = false

        [[collections]]
        name = "users"
    "#;

    fn load(toml: &str) -> RulesConfig {
        RulesConfig::from_toml_str(toml).unwrap()
    }

    #[test]
    fn explicit_rules_come_before_expanded_shorthand() {
        let config = load(SAMPLE);
        let orders = &config.collections()[0];

        let summary: Vec<(&str, &str)> = orders
            .rules
            .iter()
            .map(|r| (r.path.as_str(), r.kind.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("status", "categorical"),
                ("order_id", "exists"),
                ("customer.email", "exists"),
                ("order_total", "type"),
                ("items[].category", "categorical"),
                ("order_total", "range"),
                ("currency_amt", "keywords"),
            ]
        );
        assert_eq!(orders.expected_count, Some(1000));
        assert_eq!(orders.max_documents, Some(5000));
    }

    #[test]
    fn extra_rule_keys_become_params() {
        let config = load(SAMPLE);
        let rule = &config.collections()[0].rules[0];

        assert_eq!(rule.id.as_deref(), Some("status-known"));
        assert_eq!(rule.params.get("allowed"), Some(&json!(["active", "inactive"])));
        assert_eq!(rule.params.get("case_sensitive"), Some(&json!(false)));
        assert!(!rule.params.contains_key("path"));
    }

    #[test]
    fn loaded_rules_compile_with_the_standard_registry() {
        let config = load(SAMPLE);
        let registry = EvaluatorRegistry::standard();
        for collection in config.collections() {
            let plan = compile(&collection.name, &collection.rules, &registry).unwrap();
            assert_eq!(plan.len(), collection.rules.len());
        }
    }

    #[test]
    fn nan_range_bound_fails_to_compile() {
        let config = load(
            r#"
            [[collections]]
            name = "metrics"

            [collections.numeric_ranges]
            x = { min = nan, max = 100 }
            "#,
        );
        let collection = &config.collections()[0];
        let err = compile(
            &collection.name,
            &collection.rules,
            &EvaluatorRegistry::standard(),
        )
        .err()
        .unwrap();
        assert!(
            err.to_string().contains("null"),
            "expected a rejected bound, got {err}"
        );
    }

    #[test]
    fn settings_override_defaults() {
        let settings = load(SAMPLE).scan_settings();
        let defaults = ScanSettings::default();
        assert_eq!(settings.workers, 4);
        assert_eq!(settings.sample_capacity, 5);
        assert_eq!(settings.batch_size, defaults.batch_size);
    }

    #[test]
    fn empty_file_has_no_collections() {
        let config = load("");
        assert!(config.collections().is_empty());
        assert_eq!(config.scan_settings(), ScanSettings::default());
        assert_eq!(config.data_directory(), None);
    }

    #[test]
    fn duplicate_collection_is_rejected() {
        let err = RulesConfig::from_toml_str(
            "[[collections]]\nname = \"a\"\n[[collections]]\nname = \"a\"\n",
        )
        .unwrap_err();
        match err {
            DqError::ConfigError { collection, reason } => {
                assert_eq!(collection, "a");
                assert!(reason.contains("more than once"));
            }
            other => panic!("expected ConfigError, got {:?}", other),
        }
    }

    #[test]
    fn malformed_toml_and_unknown_sections_are_rejected() {
        for bad in [
            "[[collections]\nname = 1",
            "[settings]\nthreads = 2\n",
            "[settings]\nworkers = 0\n",
            "[[collections]]\nname = \"a\"\n[[collections.rules]]\nkind = \"exists\"\n",
        ] {
            match RulesConfig::from_toml_str(bad) {
                Err(DqError::ConfigError { .. }) => {}
                other => panic!("expected ConfigError for {bad:?}, got {:?}", other),
            }
        }
    }

    #[test]
    fn relative_data_directory_follows_the_rules_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rules.toml");
        fs::write(&path, SAMPLE).unwrap();

        let config = RulesConfig::from_file(&path).unwrap();
        assert_eq!(config.data_directory(), Some(dir.path().join("data")));
    }

    #[test]
    fn unreadable_file_is_a_config_error() {
        match RulesConfig::from_file(Path::new("/no/such/rules.toml")) {
            Err(DqError::ConfigError { reason, .. }) => assert!(reason.contains("failed to read")),
            other => panic!("expected ConfigError, got {:?}", other),
        }
    }
}
