//! # docvault core
//!
//! Pure logic shared by the `docvault` crate: the error taxonomy, the data
//! model returned to callers, path normalization, content masking, query
//! tokenization and relevance scoring, rule extraction from prose standards,
//! unified-diff parsing, and rule matching.
//!
//! Nothing in this crate touches the filesystem. Everything that reads or
//! writes under the repository root lives in the `docvault` crate and feeds
//! text into the functions here.
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`error`] | [`Error`] taxonomy, exit codes, suggestions |
//! | [`budget`] | Soft deadlines for long traversals |
//! | [`path`] | Lexical normalization of root-relative paths |
//! | [`models`] | Serializable results (entries, reads, hits, rules, findings) |
//! | [`mask`] | Ordered redaction rules |
//! | [`query`] | Term extraction for keyword and free-text search |
//! | [`scoring`] | Relevance scoring, snippets, bounded top-K |
//! | [`rules`] | Rule extraction from standards documents |
//! | [`diff`] | Unified-diff parsing into added-line units |
//! | [`review`] | Trigger matching and finding synthesis |

pub mod budget;
pub mod diff;
pub mod error;
pub mod mask;
pub mod models;
pub mod path;
pub mod query;
pub mod review;
pub mod rules;
pub mod scoring;

pub use error::{Error, ErrorKind, Result};
