//! # docqa-eval
//!
//! Rule kinds for the docqa engine.
//!
//! This crate provides [`registry::EvaluatorRegistry`], which implements the
//! [`docqa_core::traits::RuleBinder`] trait, and the built-in kinds in
//! [`kinds`]:
//!
//! | kind          | params                                                   |
//! |---------------|----------------------------------------------------------|
//! | `exists`      | none                                                     |
//! | `not_null`    | none                                                     |
//! | `type`        | `expected`                                               |
//! | `categorical` | `allowed`, `case_sensitive`                              |
//! | `range`       | `min`, `max`, `min_inclusive`, `max_inclusive`           |
//! | `keywords`    | `required`, `case_sensitive`                             |
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use docqa_eval::EvaluatorRegistry;
//!
//! let mut registry = EvaluatorRegistry::standard();
//! registry.register("even", Box::new(|_kind, _params| Ok(Box::new(Even))));
//! let plan = docqa_core::compile("orders", &specs, &registry)?;
//! ```

pub mod kinds;
pub mod registry;

pub use registry::{BinderFn, EvaluatorRegistry};
