//! # docqa-source
//!
//! `DocumentSource` implementations for the docqa engine.
//!
//! - [`memory::InMemorySource`]: fixed collections held in memory
//! - [`jsonl::JsonLinesSource`]: one `<collection>.jsonl` file per collection
//!   in a data directory
//! - [`resuming::ResumingSource`]: wraps any source and restarts failed
//!   scans from the last delivered bookmark

pub mod jsonl;
pub mod memory;
pub mod resuming;

pub use jsonl::JsonLinesSource;
pub use memory::InMemorySource;
pub use resuming::ResumingSource;
