//! # docqa-contracts
//!
//! Shared types, verdicts, and report contracts for the docqa rule engine.
//!
//! All crates in the workspace import from here. No business logic lives in
//! this crate: only data definitions and error types.

pub mod document;
pub mod error;
pub mod report;
pub mod rule;
