//! Rendering for the `dv` binary.
//!
//! With `--json` every invocation prints exactly one envelope:
//!
//! ```json
//! { "schema_version": "1.0", "tool": "docvault.search", "ok": true, "data": { ... } }
//! { "schema_version": "1.0", "tool": "docvault.read", "ok": false,
//!   "error": { "kind": "not_found", "message": "...", "suggestions": ["..."] } }
//! ```
//!
//! Without it, results are rendered as plain text, and review reports as
//! Markdown.

use std::fmt::Write;

use serde::Serialize;

use docvault_core::models::{
    Listing, ReadResult, ReviewReport, ReviewStatus, Severity, Warning, WriteReceipt,
};
use docvault_core::rules::Checklist;
use docvault_core::Error;

use crate::search::SearchResponse;

pub const SCHEMA_VERSION: &str = "1.0";

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub kind: String,
    pub message: String,
    pub suggestions: Vec<String>,
}

impl ErrorBody {
    pub fn from_error(err: &anyhow::Error) -> Self {
        match err.downcast_ref::<Error>() {
            Some(e) => Self {
                kind: e.kind().as_str().to_string(),
                message: e.to_string(),
                suggestions: e.suggestions(),
            },
            None => Self {
                kind: "invalid_input".to_string(),
                message: format!("{:#}", err),
                suggestions: Vec::new(),
            },
        }
    }
}

#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    schema_version: &'static str,
    tool: String,
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorBody>,
}

pub fn success_json<T: Serialize>(command: &str, data: &T) -> anyhow::Result<String> {
    let envelope = Envelope {
        schema_version: SCHEMA_VERSION,
        tool: tool_name(command),
        ok: true,
        data: Some(data),
        error: None,
    };
    Ok(serde_json::to_string_pretty(&envelope)?)
}

pub fn failure_json(command: &str, err: &anyhow::Error) -> String {
    let envelope: Envelope<'_, ()> = Envelope {
        schema_version: SCHEMA_VERSION,
        tool: tool_name(command),
        ok: false,
        data: None,
        error: Some(ErrorBody::from_error(err)),
    };
    serde_json::to_string_pretty(&envelope).unwrap_or_else(|_| {
        format!(
            "{{\"schema_version\":\"{}\",\"ok\":false}}",
            SCHEMA_VERSION
        )
    })
}

/// Process exit code for a failed invocation. Failures outside the error
/// taxonomy (config parsing, local files) count as invalid input.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<Error>().map_or(2, Error::exit_code)
}

/// Human-readable failure, with suggestions on following lines.
pub fn render_error(err: &anyhow::Error) -> String {
    let body = ErrorBody::from_error(err);
    let mut out = format!("Error: {}\n", body.message);
    for hint in &body.suggestions {
        let _ = writeln!(out, "  hint: {}", hint);
    }
    out
}

fn tool_name(command: &str) -> String {
    format!("docvault.{}", command)
}

pub fn render_listing(listing: &Listing) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}/ ({} entries)", listing.path, listing.entries.len());
    for entry in &listing.entries {
        let size = entry
            .size_bytes
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string());
        let suffix = if entry.is_dir() { "/" } else { "" };
        let _ = writeln!(
            out,
            "  {:>10}  {:<20}  {}{}",
            size,
            entry.modified.as_deref().unwrap_or("-"),
            entry.name,
            suffix
        );
    }
    render_warnings(&mut out, &listing.warnings);
    out
}

pub fn render_read(result: &ReadResult) -> String {
    let mut out = String::new();
    let last_line = result.start_line + result.read_lines.saturating_sub(1);
    let _ = writeln!(out, "path:       {}", result.path);
    let _ = writeln!(
        out,
        "lines:      {}-{} of {}",
        result.start_line, last_line, result.total_lines
    );
    let _ = writeln!(out, "bytes:      {} of {}", result.read_bytes, result.total_bytes);
    let _ = writeln!(
        out,
        "modified:   {}",
        result.modified.as_deref().unwrap_or("-")
    );
    match result.next_offset {
        Some(next) if result.truncated => {
            let _ = writeln!(out, "truncated:  yes (continue with --offset {})", next);
        }
        _ if result.truncated => {
            let _ = writeln!(out, "truncated:  yes");
        }
        _ => {}
    }
    if result.redactions > 0 {
        let _ = writeln!(out, "redactions: {}", result.redactions);
    }
    out.push_str("---\n");
    out.push_str(&result.content);
    if !result.content.is_empty() && !result.content.ends_with('\n') {
        out.push('\n');
    }
    out
}

pub fn render_receipt(receipt: &WriteReceipt) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "stored:     {}", receipt.path);
    if receipt.renamed {
        let _ = writeln!(out, "requested:  {} (already existed)", receipt.requested);
    }
    let _ = writeln!(out, "policy:     {}", receipt.policy);
    let _ = writeln!(out, "size:       {} bytes", receipt.size_bytes);
    let _ = writeln!(out, "sha256:     {}", receipt.sha256);
    if let Some(modified) = &receipt.modified {
        let _ = writeln!(out, "modified:   {}", modified);
    }
    out
}

pub fn render_search(resp: &SearchResponse) -> String {
    let mut out = String::new();
    if resp.hits.is_empty() {
        let _ = writeln!(out, "No results in {}/.", resp.dir);
    } else {
        let _ = writeln!(
            out,
            "{} match(es) in {}/, showing {}:",
            resp.total_found,
            resp.dir,
            resp.hits.len()
        );
    }
    for (i, hit) in resp.hits.iter().enumerate() {
        let kind = match hit.match_kind {
            docvault_core::models::MatchKind::Name => "name",
            docvault_core::models::MatchKind::Content => "content",
            docvault_core::models::MatchKind::Both => "name+content",
        };
        let _ = writeln!(out);
        let _ = writeln!(out, "{}. [{:>3}] {}  ({})", i + 1, hit.score, hit.path, kind);
        if let Some(reason) = &hit.skip_reason {
            let _ = writeln!(out, "   content not searched: {}", reason);
        }
        for snippet in &hit.snippets {
            let _ = writeln!(out, "   L{}:", snippet.line);
            for line in snippet.text.lines() {
                let _ = writeln!(out, "   | {}", line);
            }
        }
    }
    if !resp.suggestions.is_empty() {
        let _ = writeln!(out);
        for s in &resp.suggestions {
            let _ = writeln!(out, "  hint: {}", s);
        }
    }
    render_warnings(&mut out, &resp.warnings);
    out
}

fn severity_label(severity: Severity) -> &'static str {
    match severity {
        Severity::Error => "ERROR",
        Severity::Warning => "WARNING",
        Severity::Info => "INFO",
    }
}

/// Markdown report, one section per reviewed file.
pub fn render_review(report: &ReviewReport) -> String {
    let mut out = String::from("# Code Review Report\n\n");
    let status = match report.status {
        ReviewStatus::IssuesFound => "issues found",
        ReviewStatus::NoIssuesFound => "no issues found",
    };
    let s = &report.summary;
    let _ = writeln!(out, "**Status**: {}", status);
    let _ = writeln!(
        out,
        "**Reviewed**: {} unit(s), {} line(s)",
        s.units_reviewed, s.lines_reviewed
    );
    let _ = writeln!(
        out,
        "**Findings**: {} error(s), {} warning(s), {} info",
        s.errors, s.warnings, s.infos
    );
    let _ = writeln!(
        out,
        "**Standards**: {} rule(s) from {}",
        report.standards.rules,
        report.standards.documents.join(", ")
    );

    let mut current: Option<&str> = None;
    for finding in &report.findings {
        let file = finding.location.file.as_str();
        if current != Some(file) {
            let _ = writeln!(out, "\n## {}\n", file);
            current = Some(file);
        }
        let _ = writeln!(
            out,
            "### [{}] {} at line {}\n",
            severity_label(finding.severity),
            finding.rule_id,
            finding.location.line
        );
        if let Some(hunk) = &finding.location.hunk {
            let _ = writeln!(out, "**Hunk**: `{}`", hunk);
        }
        let _ = writeln!(out, "**Rule**: {}", finding.statement);
        let _ = writeln!(out, "**Category**: {}", finding.category);
        let _ = writeln!(out, "\n```\n{}\n```\n", finding.excerpt);
        let _ = writeln!(out, "**Suggestion**: {}", finding.suggestion);
        let _ = writeln!(out, "**Source**: {}\n", finding.citation);
    }
    if report.findings.is_empty() {
        out.push_str("\nNo issues found.\n");
    }

    if !report.warnings.is_empty() {
        out.push_str("\n## Warnings\n\n");
        for w in &report.warnings {
            let _ = writeln!(out, "- {}: {}", w.subject, w.message);
        }
    }
    out
}

pub fn render_checklist(checklist: &Checklist) -> String {
    let mut out = String::from("# Standards Checklist\n\n");
    let _ = writeln!(out, "**Documents**: {}", checklist.documents.join(", "));
    let severities: Vec<String> = checklist
        .by_severity
        .iter()
        .map(|(k, v)| format!("{} {}", v, k))
        .collect();
    let _ = writeln!(
        out,
        "**Rules**: {} ({})",
        checklist.rules.len(),
        severities.join(", ")
    );

    for category in checklist.by_category.keys() {
        let _ = writeln!(out, "\n## {}\n", category);
        for rule in checklist.rules.iter().filter(|r| &r.category == category) {
            let _ = writeln!(
                out,
                "- [ ] **{}** [{}] {} ({})",
                rule.id,
                rule.severity.as_str(),
                rule.statement,
                rule.citation
            );
        }
    }
    if !checklist.warnings.is_empty() {
        out.push_str("\n## Warnings\n\n");
        for w in &checklist.warnings {
            let _ = writeln!(out, "- {}: {}", w.subject, w.message);
        }
    }
    out
}

fn render_warnings(out: &mut String, warnings: &[Warning]) {
    for w in warnings {
        let _ = writeln!(out, "warning: {}: {}", w.subject, w.message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docvault_core::models::{ReviewSummary, StandardsUsed};

    #[test]
    fn failure_envelope_carries_kind_and_hints() {
        let err = anyhow::Error::new(Error::not_found("docs/x.md", Some("docs".into())));
        let json: serde_json::Value = serde_json::from_str(&failure_json("read", &err)).unwrap();
        assert_eq!(json["schema_version"], "1.0");
        assert_eq!(json["tool"], "docvault.read");
        assert_eq!(json["ok"], false);
        assert_eq!(json["error"]["kind"], "not_found");
        assert!(json.get("data").is_none());
        assert!(!json["error"]["suggestions"].as_array().unwrap().is_empty());
        assert_eq!(exit_code(&err), 3);
    }

    #[test]
    fn foreign_errors_are_invalid_input() {
        let err = anyhow::anyhow!("Failed to read config file");
        let body = ErrorBody::from_error(&err);
        assert_eq!(body.kind, "invalid_input");
        assert_eq!(exit_code(&err), 2);
    }

    #[test]
    fn success_envelope_wraps_data() {
        let json: serde_json::Value =
            serde_json::from_str(&success_json("list", &vec!["a"]).unwrap()).unwrap();
        assert_eq!(json["ok"], true);
        assert_eq!(json["data"][0], "a");
        assert!(json.get("error").is_none());
    }

    #[test]
    fn empty_review_says_no_issues() {
        let report = ReviewReport {
            status: ReviewStatus::NoIssuesFound,
            summary: ReviewSummary::default(),
            findings: vec![],
            warnings: vec![],
            standards: StandardsUsed {
                documents: vec!["Standards/a.md".into()],
                rules: 3,
                rules_with_triggers: 2,
            },
        };
        let md = render_review(&report);
        assert!(md.contains("**Status**: no issues found"));
        assert!(md.contains("No issues found."));
    }
}
