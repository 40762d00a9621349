//! Data types returned by docvault operations.
//!
//! Every type here is a snapshot: produced once per invocation, serialized
//! for the caller, and never written back to the repository.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

// ============ Documents ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    File,
    Directory,
}

/// One filesystem node under the repository root.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentEntry {
    pub name: String,
    /// Root-relative, `/`-separated.
    pub path: String,
    pub kind: EntryKind,
    /// `None` for directories.
    pub size_bytes: Option<u64>,
    /// ISO 8601 modification time.
    pub modified: Option<String>,
}

impl DocumentEntry {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Listing {
    pub path: String,
    pub entries: Vec<DocumentEntry>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Warning>,
}

/// Result of a bounded read. `truncated` is always set explicitly; hitting a
/// bound is not an error.
#[derive(Debug, Clone, Serialize)]
pub struct ReadResult {
    pub path: String,
    pub content: String,
    pub truncated: bool,
    pub read_bytes: u64,
    pub read_lines: usize,
    pub total_bytes: u64,
    pub total_lines: usize,
    /// 1-based number of the first returned line.
    pub start_line: usize,
    /// Line offset to pass to the next read, when lines remain.
    pub next_offset: Option<usize>,
    pub modified: Option<String>,
    /// Number of spans replaced by the masker.
    pub redactions: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    Overwrite,
    #[default]
    Rename,
}

impl ConflictPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            ConflictPolicy::Overwrite => "overwrite",
            ConflictPolicy::Rename => "rename",
        }
    }
}

impl fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConflictPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "overwrite" => Ok(ConflictPolicy::Overwrite),
            "rename" => Ok(ConflictPolicy::Rename),
            other => Err(Error::InvalidInput(format!(
                "unknown conflict policy '{}': expected overwrite or rename",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WriteReceipt {
    /// Final root-relative path, which differs from `requested` after a rename.
    pub path: String,
    pub requested: String,
    pub policy: ConflictPolicy,
    pub renamed: bool,
    pub size_bytes: u64,
    pub sha256: String,
    pub modified: Option<String>,
}

// ============ Search ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Name,
    Content,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    Keyword,
    FreeText,
    /// No usable terms; nothing is searched.
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snippet {
    /// 1-based line of the match.
    pub line: usize,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub path: String,
    pub name: String,
    pub match_kind: MatchKind,
    pub score: u32,
    pub depth: usize,
    pub size_bytes: Option<u64>,
    pub modified: Option<String>,
    pub matched_terms: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub snippets: Vec<Snippet>,
    pub content_searched: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,
}

// ============ Standards and rules ============

/// A standards document with its full decoded text.
#[derive(Debug, Clone, Serialize)]
pub struct StandardDocument {
    pub entry: DocumentEntry,
    #[serde(skip_serializing)]
    pub text: String,
    /// Set when the generous standards cap was still hit.
    pub truncated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    /// Something the code must not (or should not) contain.
    Prohibition,
    /// Something the code must do.
    Obligation,
    /// A softer positive preference.
    Recommendation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Citation {
    pub document: String,
    /// 1-based line where the rule text starts.
    pub line: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
}

impl fmt::Display for Citation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.document, self.line)?;
        if let Some(section) = &self.section {
            write!(f, " ({})", section)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    /// Quoted text, matched case-insensitively as a plain substring.
    Literal,
    /// Code identifier, matched case-sensitively at identifier boundaries.
    Identifier,
    /// Plain word, matched case-insensitively at identifier boundaries.
    Word,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Trigger {
    pub text: String,
    pub kind: TriggerKind,
    /// Only match when followed by `(`.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub call: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Rule {
    pub id: String,
    pub citation: Citation,
    pub statement: String,
    pub kind: RuleKind,
    pub severity: Severity,
    pub category: String,
    pub triggers: Vec<Trigger>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alternative: Option<String>,
}

// ============ Code input and findings ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitOrigin {
    File,
    Snippet,
    Diff,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeLine {
    pub number: usize,
    pub text: String,
    pub hunk: Option<String>,
}

/// Normalized code input: a label plus numbered lines offered to matching.
#[derive(Debug, Clone)]
pub struct CodeUnit {
    pub label: String,
    pub origin: UnitOrigin,
    pub lines: Vec<CodeLine>,
}

impl CodeUnit {
    /// Number every line of `text`, starting after `line_offset`.
    pub fn from_text(label: impl Into<String>, origin: UnitOrigin, text: &str, line_offset: usize) -> Self {
        let lines = text
            .lines()
            .enumerate()
            .map(|(i, line)| CodeLine {
                number: line_offset + i + 1,
                text: line.to_string(),
                hunk: None,
            })
            .collect();
        Self {
            label: label.into(),
            origin,
            lines,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Location {
    pub file: String,
    pub line: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hunk: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub rule_id: String,
    pub severity: Severity,
    pub category: String,
    pub citation: Citation,
    pub statement: String,
    pub location: Location,
    pub excerpt: String,
    pub matched: String,
    pub suggestion: String,
}

// ============ Warnings and reports ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    List,
    Search,
    Load,
    Extract,
    Normalize,
    Match,
}

/// A per-item skip recorded instead of aborting a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    pub stage: Stage,
    pub subject: String,
    pub message: String,
}

impl Warning {
    pub fn new(stage: Stage, subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            stage,
            subject: subject.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    IssuesFound,
    NoIssuesFound,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReviewSummary {
    pub units_reviewed: usize,
    pub lines_reviewed: usize,
    pub findings: usize,
    pub errors: usize,
    pub warnings: usize,
    pub infos: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StandardsUsed {
    pub documents: Vec<String>,
    pub rules: usize,
    pub rules_with_triggers: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewReport {
    pub status: ReviewStatus,
    pub summary: ReviewSummary,
    pub findings: Vec<Finding>,
    pub warnings: Vec<Warning>,
    pub standards: StandardsUsed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_policy_parses() {
        assert_eq!("overwrite".parse::<ConflictPolicy>().unwrap(), ConflictPolicy::Overwrite);
        assert_eq!(" Rename ".parse::<ConflictPolicy>().unwrap(), ConflictPolicy::Rename);
        assert!("replace".parse::<ConflictPolicy>().is_err());
    }

    #[test]
    fn code_unit_numbers_from_offset() {
        let unit = CodeUnit::from_text("snippet", UnitOrigin::Snippet, "a\nb\n", 10);
        let numbers: Vec<usize> = unit.lines.iter().map(|l| l.number).collect();
        assert_eq!(numbers, vec![11, 12]);
    }

    #[test]
    fn citation_display() {
        let c = Citation {
            document: "Standards/rust.md".into(),
            line: 7,
            section: Some("Errors".into()),
        };
        assert_eq!(c.to_string(), "Standards/rust.md:7 (Errors)");
    }

    #[test]
    fn trigger_omits_call_when_false() {
        let t = Trigger {
            text: "eval".into(),
            kind: TriggerKind::Identifier,
            call: false,
        };
        let json = serde_json::to_value(&t).unwrap();
        assert!(json.get("call").is_none());
        assert_eq!(json["kind"], "identifier");
    }
}
