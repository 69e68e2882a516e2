//! # docqa-core
//!
//! The rule evaluation engine for document collections.
//!
//! This crate provides:
//! - The collaborator traits (`Evaluator`, `RuleBinder`, `DocumentSource`, `ReportSink`)
//! - Path pattern parsing and resolution against arbitrary JSON documents
//! - Plan compilation, batched scanning with an optional worker pool, and
//!   per-rule aggregation
//! - The `Runner` that checks collections in order and publishes a `RunReport`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use docqa_core::{RunPlan, Runner, ScanSettings};
//!
//! let plan = RunPlan::compile(&collections, &registry);
//! let report = Runner::new(source, sink, ScanSettings::default()).run(&plan)?;
//! ```

pub mod aggregate;
pub mod path;
pub mod plan;
pub mod report;
pub mod runner;
pub mod scanner;
pub mod traits;

pub use path::{resolve, PathPattern};
pub use plan::{compile, ValidationPlan};
pub use runner::{RunPlan, Runner};
pub use scanner::{CancelToken, ScanSettings};
