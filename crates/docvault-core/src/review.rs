//! Trigger matching and report assembly.
//!
//! Every rule is tested against every normalized line. A hit yields one
//! [`Finding`] per (rule, file, line); findings are ordered by file, line,
//! then rule id, so identical inputs always produce identical reports.
//!
//! | Trigger kind | Match |
//! |--------------|-------|
//! | identifier | case-sensitive, identifier boundaries, `(` required for calls |
//! | word | ASCII case-insensitive, identifier boundaries |
//! | literal | case-insensitive substring |

use std::collections::BTreeSet;

use crate::models::{
    CodeUnit, Finding, Location, ReviewReport, ReviewStatus, ReviewSummary, Rule, RuleKind,
    Severity, StandardsUsed, Trigger, TriggerKind, Warning,
};

const MAX_EXCERPT_CHARS: usize = 200;

/// Match every rule against every unit.
pub fn match_units(rules: &[Rule], units: &[CodeUnit]) -> Vec<Finding> {
    let mut seen: BTreeSet<(String, usize, String)> = BTreeSet::new();
    let mut findings = Vec::new();

    for unit in units {
        for line in &unit.lines {
            for rule in rules {
                let Some(matched) = rule.triggers.iter().find_map(|t| find_trigger(t, &line.text))
                else {
                    continue;
                };
                let key = (unit.label.clone(), line.number, rule.id.clone());
                if !seen.insert(key) {
                    continue;
                }
                findings.push(Finding {
                    rule_id: rule.id.clone(),
                    severity: rule.severity,
                    category: rule.category.clone(),
                    citation: rule.citation.clone(),
                    statement: rule.statement.clone(),
                    location: Location {
                        file: unit.label.clone(),
                        line: line.number,
                        hunk: line.hunk.clone(),
                    },
                    excerpt: excerpt(&line.text),
                    suggestion: suggestion(rule, &matched),
                    matched,
                });
            }
        }
    }

    findings.sort_by(|a, b| {
        a.location
            .file
            .cmp(&b.location.file)
            .then(a.location.line.cmp(&b.location.line))
            .then_with(|| a.rule_id.cmp(&b.rule_id))
    });
    findings
}

/// The matched text when `trigger` occurs in `line`.
pub fn find_trigger(trigger: &Trigger, line: &str) -> Option<String> {
    match trigger.kind {
        TriggerKind::Literal => {
            let needle = trigger.text.to_lowercase();
            line.to_lowercase()
                .contains(&needle)
                .then(|| trigger.text.clone())
        }
        TriggerKind::Identifier => {
            find_bounded(line, &trigger.text, trigger.call).map(|(s, e)| line[s..e].to_string())
        }
        TriggerKind::Word => {
            // ASCII lowering keeps byte offsets, so the range maps back onto `line`.
            let hay = line.to_ascii_lowercase();
            let needle = trigger.text.to_ascii_lowercase();
            find_bounded(&hay, &needle, trigger.call).map(|(s, e)| line[s..e].to_string())
        }
    }
}

/// Byte range of the first occurrence of `needle` that sits on identifier
/// boundaries (and precedes `(` for calls).
fn find_bounded(hay: &str, needle: &str, call: bool) -> Option<(usize, usize)> {
    if needle.is_empty() {
        return None;
    }
    for (start, m) in hay.match_indices(needle) {
        let end = start + m.len();
        let before_ok = hay[..start].chars().next_back().map_or(true, |c| !is_ident(c))
            || !needle.starts_with(is_ident);
        let after_ok = hay[end..].chars().next().map_or(true, |c| !is_ident(c))
            || !needle.ends_with(is_ident);
        let call_ok = !call || hay[end..].trim_start().starts_with('(');
        if before_ok && after_ok && call_ok {
            return Some((start, end));
        }
    }
    None
}

fn is_ident(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn excerpt(line: &str) -> String {
    let trimmed = line.trim();
    if trimmed.chars().count() <= MAX_EXCERPT_CHARS {
        return trimmed.to_string();
    }
    let mut clipped: String = trimmed.chars().take(MAX_EXCERPT_CHARS).collect();
    clipped.push_str("...");
    clipped
}

/// Phrase the rule as an instruction about the matched text.
pub fn suggestion(rule: &Rule, matched: &str) -> String {
    let alt = rule.alternative.as_deref().map(|a| {
        if a.contains(char::is_whitespace) || a.contains('`') {
            a.to_string()
        } else {
            format!("`{}`", a)
        }
    });
    let action = match (rule.kind, alt) {
        (RuleKind::Prohibition, Some(alt)) => format!("Replace `{}` with {}", matched, alt),
        (RuleKind::Prohibition, None) => format!("Remove `{}`: {}", matched, rule.statement),
        (_, Some(alt)) => format!("Use {} instead of `{}`", alt, matched),
        (_, None) => format!("Rework `{}`: {}", matched, rule.statement),
    };
    format!("{} (see {})", action, rule.citation)
}

/// Assemble the final report. `documents` lists every standards document
/// consulted, including those that produced no rules.
pub fn build_report(
    findings: Vec<Finding>,
    warnings: Vec<Warning>,
    units: &[CodeUnit],
    documents: Vec<String>,
    rules: &[Rule],
) -> ReviewReport {
    let mut summary = ReviewSummary {
        units_reviewed: units.len(),
        lines_reviewed: units.iter().map(|u| u.lines.len()).sum(),
        findings: findings.len(),
        ..ReviewSummary::default()
    };
    for f in &findings {
        match f.severity {
            Severity::Error => summary.errors += 1,
            Severity::Warning => summary.warnings += 1,
            Severity::Info => summary.infos += 1,
        }
    }
    ReviewReport {
        status: if findings.is_empty() {
            ReviewStatus::NoIssuesFound
        } else {
            ReviewStatus::IssuesFound
        },
        summary,
        findings,
        warnings,
        standards: StandardsUsed {
            documents,
            rules: rules.len(),
            rules_with_triggers: rules.iter().filter(|r| !r.triggers.is_empty()).count(),
        },
    }
}
