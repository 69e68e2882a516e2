//! # docqa-rules
//!
//! TOML rule configuration for the docqa engine.
//!
//! A rule file declares, per collection, the expected document count and an
//! ordered list of field rules. Non-engineers extend coverage by editing the
//! file; no code changes are needed. See [`schema`] for the layout.
//!
//! ```rust,ignore
//! use docqa_rules::RulesConfig;
//!
//! let config = RulesConfig::from_file(Path::new("rules.toml"))?;
//! let plan = RunPlan::compile(config.collections(), &EvaluatorRegistry::standard());
//! ```

pub mod loader;
pub mod schema;

pub use loader::RulesConfig;
