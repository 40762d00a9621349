//! # docvault
//!
//! A sandboxed document repository with ranked search and standards-driven
//! code review.
//!
//! Every filesystem access goes through a [`guard::PathGuard`] bound to a
//! single repository root. On top of it, the [`store::DocumentStore`] lists,
//! reads (bounded and masked), and writes (atomically, with a conflict
//! policy); the [`search::SearchEngine`] ranks files by name and content;
//! and the [`review::Reviewer`] turns prose standards found in the same
//! repository into rules and matches them against submitted code.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌──────────────┐
//! │ dv (CLI) │──▶│ DocumentStore│──▶│  PathGuard   │──▶ repository root
//! └────┬─────┘   └──────▲───────┘   └──────────────┘
//!      │                │
//!      ├──▶ SearchEngine┤
//!      │                │
//!      └──▶ Reviewer ───┴─ standards ─▶ rules ─▶ match ─▶ report
//! ```
//!
//! Pure logic (path normalization, masking, scoring, rule extraction, diff
//! parsing, matching) lives in the `docvault-core` crate; this crate adds
//! configuration and filesystem access.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`guard`] | Root-bound path resolution |
//! | [`store`] | List, read, and write documents |
//! | [`search`] | Name and content search |
//! | [`standards`] | Standards corpus loading |
//! | [`review`] | Code review against the standards |
//! | [`output`] | JSON envelopes and human rendering |

pub mod config;
pub mod guard;
pub mod output;
pub mod review;
pub mod search;
pub mod standards;
pub mod store;

pub use docvault_core::{Error, ErrorKind, Result};
