//! Rule extraction from free-text standards documents.
//!
//! Extraction is a best-effort classifier, not a grammar:
//!
//! ```text
//! document text
//!   │  headings set the section, fenced code is skipped
//!   ▼
//! units: list items (with continuation lines), table rows,
//!        paragraph sentences
//!   │  marker scan (English word-bounded, CJK substring)
//!   ▼
//! rule-bearing unit ──▶ kind + severity
//!   │  trigger derivation
//!   ▼
//! Rule { id, citation, statement, triggers, alternative, category }
//! ```
//!
//! ## Markers
//!
//! | Kind | Severity | Examples |
//! |------|----------|----------|
//! | prohibition | error | must not, never, forbidden, do not, 禁止, 不得 |
//! | prohibition | warning | should not, avoid, 避免, 不要 |
//! | obligation | error | must, shall, required, always, 必须 |
//! | recommendation | warning | should, prefer, recommended, 建议 |
//! | recommendation | info | consider, optional, 可选 |
//!
//! ## Triggers
//!
//! Only the prohibited part of a statement yields triggers. For a
//! prohibition that is the text before any replacement cue
//! (`; use X instead`, `改用`), and the text after the cue becomes the
//! suggested alternative. Positive statements only yield triggers through
//! "instead of X" / "rather than X" / "而不是 X"; without such a clause they
//! are citable but never fire.
//!
//! Candidates, in priority order: backticked spans, quoted spans, code-like
//! tokens (`a::b`, `a.b`, `f()`, camelCase, snake_case), the object of
//! use/call/使用/调用, and finally the word right after the marker.

use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

use crate::models::{
    Citation, Rule, RuleKind, Severity, StandardDocument, Stage, Trigger, TriggerKind, Warning,
};

pub const MAX_TRIGGERS: usize = 6;
const MIN_STATEMENT_CHARS: usize = 6;

struct Marker {
    kind: RuleKind,
    severity: Severity,
    english: &'static str,
    cjk: &'static [&'static str],
}

const MARKERS: &[Marker] = &[
    Marker {
        kind: RuleKind::Prohibition,
        severity: Severity::Error,
        english: r"must\s+not|mustn't|mustn’t|shall\s+not|never|forbidden|prohibited|do\s+not|don't|don’t|not\s+allowed|not\s+permitted|disallowed|banned",
        cjk: &["禁止", "严禁", "不得", "不允许", "不准", "不能"],
    },
    Marker {
        kind: RuleKind::Prohibition,
        severity: Severity::Warning,
        english: r"should\s+not|shouldn't|shouldn’t|avoid|discouraged|not\s+recommended",
        cjk: &["避免", "不要", "不应", "不建议", "尽量不"],
    },
    Marker {
        kind: RuleKind::Obligation,
        severity: Severity::Error,
        english: r"must|shall|required|always|mandatory",
        cjk: &["必须", "务必", "强制", "一律"],
    },
    Marker {
        kind: RuleKind::Recommendation,
        severity: Severity::Warning,
        english: r"should|recommended|prefer|preferred",
        cjk: &["应该", "应当", "建议", "推荐", "优先"],
    },
    Marker {
        kind: RuleKind::Recommendation,
        severity: Severity::Info,
        english: r"consider|optional|optionally",
        cjk: &["可选", "可考虑"],
    },
];

const STOPWORDS: &[&str] = &[
    "a", "all", "an", "and", "any", "are", "as", "be", "by", "call", "code", "data", "directly",
    "each", "ever", "file", "files", "for", "function", "functions", "global", "in", "into", "is",
    "it", "its", "method", "methods", "more", "new", "not", "of", "on", "or", "other", "our",
    "same", "such", "than", "that", "the", "their", "them", "these", "this", "those", "to", "use",
    "used", "using", "value", "values", "variable", "variables", "was", "were", "when", "with",
    "your",
];

const CATEGORIES: &[(&str, &[&str])] = &[
    ("naming", &["naming", "命名", "name", "标识符", "identifier"]),
    ("formatting", &["format", "格式", "style", "样式", "缩进", "indent", "whitespace", "空格"]),
    ("documentation", &["comment", "注释", "文档", "doc"]),
    ("architecture", &["architecture", "架构", "设计", "design", "pattern", "模式"]),
    ("error-handling", &["error", "错误", "异常", "exception", "panic"]),
    ("performance", &["performance", "性能", "优化", "optimiz", "效率"]),
    ("security", &["security", "安全", "权限", "permission", "auth", "secret", "password"]),
    ("testing", &["test", "测试", "单元", "coverage"]),
    ("version-control", &["git", "commit", "branch", "版本"]),
    ("api", &["api", "接口", "interface", "rest", "http"]),
    ("database", &["database", "数据库", "sql", "table"]),
    ("logging", &["log", "日志", "trace"]),
];

struct Patterns {
    heading: Regex,
    list_item: Regex,
    markers: Vec<Regex>,
    alt_after: Regex,
    bad_after: Regex,
    backtick: Regex,
    quoted: Regex,
    code_token: Regex,
    code_exact: Regex,
    verb_object: Regex,
    leading_word: Regex,
}

fn literal(pattern: &str) -> Regex {
    Regex::new(pattern).expect("literal pattern compiles")
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        const IDENT: &str = r"[A-Za-z_][A-Za-z0-9_]*(?:(?:::|\.|->)[A-Za-z_][A-Za-z0-9_]*)*";
        Patterns {
            heading: literal(r"^\s{0,3}#{1,6}\s+(.+?)\s*#*\s*$"),
            list_item: literal(r"^\s*(?:[-*+]|\d{1,3}[.)])\s+(.*\S)\s*$"),
            markers: MARKERS
                .iter()
                .map(|m| literal(&format!(r"(?i)\b(?:{})\b", m.english)))
                .collect(),
            alt_after: literal(
                r"(?i)\bin\s+favou?r\s+of\b|\binstead\b|[;,]\s*(?:use|prefer|call)\b|改用|应使用|请使用|应改为|而应|替换为|换成|而是",
            ),
            bad_after: literal(r"(?i)\binstead\s+of\b|\brather\s+than\b|而不是"),
            backtick: literal(r"`([^`]+)`"),
            quoted: literal(r#""([^"]{2,60})"|“([^”]{2,60})”|「([^」]{2,60})」|『([^』]{2,60})』"#),
            code_token: literal(&format!(r"{}(?:\(\))?", IDENT)),
            code_exact: literal(&format!(r"^{}$", IDENT)),
            verb_object: literal(&format!(
                r"(?i)(?:\b(?:use|uses|using|call|calls|calling|invoke|invoking|import|importing)\b|使用|调用|引入|用)\s*(?:(?:the|a|an|any)\s+)?({}(?:\(\))?)",
                IDENT
            )),
            leading_word: literal(r"^[\s:：,，]*([A-Za-z_][A-Za-z0-9_]*)"),
        }
    })
}

/// Rules extracted from a corpus plus per-document notes.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Extraction {
    pub rules: Vec<Rule>,
    pub warnings: Vec<Warning>,
}

/// Extract rules from every document, assigning corpus-unique IDs.
pub fn extract_corpus(documents: &[StandardDocument]) -> Extraction {
    let mut used: HashMap<String, usize> = HashMap::new();
    let mut out = Extraction::default();
    for doc in documents {
        let prefix = unique_prefix(&mut used, &doc.entry.name);
        if doc.truncated {
            out.warnings.push(Warning::new(
                Stage::Extract,
                doc.entry.path.clone(),
                "document exceeds the standards size cap; rules past the cap were not extracted",
            ));
        }
        out.rules
            .extend(extract_document(&doc.entry.path, &doc.text, &prefix));
    }
    out
}

/// Extract rules from one document. IDs are `<prefix>-NNN`, numbered from 1.
pub fn extract_document(path: &str, text: &str, prefix: &str) -> Vec<Rule> {
    let p = patterns();
    let file_name = path.rsplit('/').next().unwrap_or(path);
    let mut rules = Vec::new();
    for unit in split_units(p, text) {
        let statement = clean(&unit.text);
        if statement.chars().count() < MIN_STATEMENT_CHARS {
            continue;
        }
        let Some((kind, severity, marker_end)) = classify(p, &statement) else {
            continue;
        };
        let (triggers, alternative) = derive_triggers(p, &statement, kind, marker_end);
        rules.push(Rule {
            id: format!("{}-{:03}", prefix, rules.len() + 1),
            citation: Citation {
                document: path.to_string(),
                line: unit.line,
                section: unit.section.clone(),
            },
            category: infer_category(file_name, unit.section.as_deref()).to_string(),
            statement,
            kind,
            severity,
            triggers,
            alternative,
        });
    }
    rules
}

/// Category from the file name and section title; `general` otherwise.
pub fn infer_category(file_name: &str, section: Option<&str>) -> &'static str {
    let combined = format!("{} {}", file_name, section.unwrap_or("")).to_lowercase();
    CATEGORIES
        .iter()
        .find(|(_, keys)| keys.iter().any(|k| combined.contains(k)))
        .map(|(name, _)| *name)
        .unwrap_or("general")
}

/// Upper-case alphanumeric stem of a file name, at most 10 characters.
pub fn id_prefix(file_name: &str) -> String {
    let stem = match file_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => file_name,
    };
    let prefix: String = stem
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_uppercase())
        .take(10)
        .collect();
    if prefix.is_empty() {
        "RULE".to_string()
    } else {
        prefix
    }
}

fn unique_prefix(used: &mut HashMap<String, usize>, file_name: &str) -> String {
    let base = id_prefix(file_name);
    let count = used.entry(base.clone()).or_insert(0);
    *count += 1;
    if *count == 1 {
        base
    } else {
        format!("{}{}", base, count)
    }
}

// ============ Units ============

#[derive(Debug, Clone, PartialEq, Eq)]
struct Unit {
    line: usize,
    text: String,
    section: Option<String>,
}

struct Block {
    line: usize,
    text: String,
    list: bool,
}

fn split_units(p: &Patterns, text: &str) -> Vec<Unit> {
    let mut units = Vec::new();
    let mut section: Option<String> = None;
    let mut fence: Option<&str> = None;
    let mut block: Option<Block> = None;

    for (i, line) in text.lines().enumerate() {
        let number = i + 1;
        let trimmed = line.trim_start();

        if let Some(marker) = fence {
            if trimmed.starts_with(marker) {
                fence = None;
            }
            continue;
        }
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            flush(&mut block, &section, &mut units);
            fence = Some(&trimmed[..3]);
            continue;
        }
        if let Some(caps) = p.heading.captures(line) {
            flush(&mut block, &section, &mut units);
            section = Some(caps[1].trim().to_string());
            continue;
        }
        if trimmed.is_empty() {
            flush(&mut block, &section, &mut units);
            continue;
        }
        if trimmed.starts_with('|') {
            flush(&mut block, &section, &mut units);
            if !trimmed.chars().all(|c| matches!(c, '|' | '-' | ':' | ' ')) {
                let row = trimmed
                    .split('|')
                    .map(str::trim)
                    .filter(|cell| !cell.is_empty())
                    .collect::<Vec<_>>()
                    .join(" ");
                units.push(Unit {
                    line: number,
                    text: row,
                    section: section.clone(),
                });
            }
            continue;
        }

        let body = if trimmed.starts_with('>') {
            trimmed.trim_start_matches('>').trim_start()
        } else {
            line
        };
        if let Some(caps) = p.list_item.captures(body) {
            flush(&mut block, &section, &mut units);
            block = Some(Block {
                line: number,
                text: caps[1].to_string(),
                list: true,
            });
            continue;
        }
        match block.as_mut() {
            Some(b) if b.list => {
                b.text.push(' ');
                b.text.push_str(body.trim());
            }
            Some(b) => {
                b.text.push('\n');
                b.text.push_str(body.trim());
            }
            None => {
                block = Some(Block {
                    line: number,
                    text: body.trim().to_string(),
                    list: false,
                })
            }
        }
    }
    flush(&mut block, &section, &mut units);
    units
}

fn flush(block: &mut Option<Block>, section: &Option<String>, units: &mut Vec<Unit>) {
    let Some(b) = block.take() else { return };
    if b.list {
        units.push(Unit {
            line: b.line,
            text: b.text,
            section: section.clone(),
        });
        return;
    }
    for (line, text) in split_sentences(&b.text, b.line) {
        units.push(Unit {
            line,
            text,
            section: section.clone(),
        });
    }
}

/// Split a paragraph (lines joined by `\n`) into sentences, each tagged
/// with the line it starts on. Terminators inside backticks are ignored.
fn split_sentences(text: &str, first_line: usize) -> Vec<(usize, String)> {
    let chars: Vec<char> = text.chars().collect();
    let mut out = Vec::new();
    let mut buf = String::new();
    let mut line = first_line;
    let mut buf_line = first_line;
    let mut in_code = false;

    for (i, &c) in chars.iter().enumerate() {
        if c == '\n' {
            line += 1;
            buf.push(' ');
            continue;
        }
        if buf.trim().is_empty() && !c.is_whitespace() {
            buf_line = line;
        }
        buf.push(c);
        if c == '`' {
            in_code = !in_code;
            continue;
        }
        if in_code {
            continue;
        }
        let ends = match c {
            '。' | '！' | '？' => true,
            '.' | '!' | '?' => {
                chars.get(i + 1).map_or(true, |n| n.is_whitespace()) && !is_abbreviation(&buf)
            }
            _ => false,
        };
        if ends {
            push_sentence(&mut out, buf_line, &mut buf);
        }
    }
    push_sentence(&mut out, buf_line, &mut buf);
    out
}

fn push_sentence(out: &mut Vec<(usize, String)>, line: usize, buf: &mut String) {
    let s = buf.trim();
    if !s.is_empty() {
        out.push((line, s.to_string()));
    }
    buf.clear();
}

fn is_abbreviation(buf: &str) -> bool {
    let lower = buf.to_lowercase();
    ["e.g.", "i.e.", "etc.", "vs.", "cf."]
        .iter()
        .any(|a| lower.ends_with(a))
}

fn clean(text: &str) -> String {
    text.replace("**", "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

// ============ Classification and triggers ============

/// Highest-priority marker class present, with the byte offset just past
/// the first occurrence of that marker.
fn classify(p: &Patterns, statement: &str) -> Option<(RuleKind, Severity, usize)> {
    for (marker, re) in MARKERS.iter().zip(&p.markers) {
        let english = re.find(statement).map(|m| (m.start(), m.end()));
        let cjk = marker
            .cjk
            .iter()
            .filter_map(|k| statement.find(k).map(|s| (s, s + k.len())))
            .min();
        let first = match (english, cjk) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        if let Some((_, end)) = first {
            return Some((marker.kind, marker.severity, end));
        }
    }
    None
}

fn derive_triggers(
    p: &Patterns,
    statement: &str,
    kind: RuleKind,
    marker_end: usize,
) -> (Vec<Trigger>, Option<String>) {
    let alt = p.alt_after.find(statement);
    let bad = p.bad_after.find(statement);
    let first_cue = match (alt, bad) {
        (Some(a), Some(b)) if b.start() <= a.start() => Some((b, true)),
        (Some(a), _) => Some((a, false)),
        (None, Some(b)) => Some((b, true)),
        (None, None) => None,
    };

    match kind {
        RuleKind::Prohibition => {
            let (clause, alternative) = match first_cue {
                Some((cue, false)) => (
                    &statement[..cue.start()],
                    tidy_alternative(p, &statement[cue.end()..]),
                ),
                Some((cue, true)) => (&statement[..cue.start()], None),
                None => (statement, None),
            };
            let mut triggers = collect(p, clause);
            if triggers.is_empty() && marker_end <= clause.len() {
                if let Some(caps) = p.leading_word.captures(&clause[marker_end..]) {
                    push_word(&mut triggers, &caps[1]);
                }
            }
            triggers.truncate(MAX_TRIGGERS);
            (triggers, alternative)
        }
        RuleKind::Obligation | RuleKind::Recommendation => match first_cue {
            Some((cue, true)) => {
                let rest = &statement[cue.end()..];
                let mut triggers = collect(p, rest);
                if triggers.is_empty() {
                    if let Some(caps) = p.leading_word.captures(rest) {
                        push_word(&mut triggers, &caps[1]);
                    }
                }
                triggers.truncate(MAX_TRIGGERS);
                let alternative = first_code_span(p, &statement[..cue.start()]);
                (triggers, alternative)
            }
            _ => (Vec::new(), None),
        },
    }
}

fn collect(p: &Patterns, clause: &str) -> Vec<Trigger> {
    let mut triggers = Vec::new();
    let mut blanked = clause.to_string();

    for caps in p.backtick.captures_iter(clause) {
        push(&mut triggers, code_trigger(p, caps[1].trim()));
    }
    for caps in p.quoted.captures_iter(clause) {
        if let Some(m) = (1..=4).find_map(|i| caps.get(i)) {
            push(
                &mut triggers,
                Some(Trigger {
                    text: m.as_str().trim().to_string(),
                    kind: TriggerKind::Literal,
                    call: false,
                }),
            );
        }
    }
    for re in [&p.backtick, &p.quoted] {
        blanked = re
            .replace_all(&blanked, |caps: &regex::Captures| " ".repeat(caps[0].len()))
            .into_owned();
    }

    for m in p.code_token.find_iter(&blanked) {
        if is_code_like(m.as_str()) {
            push(&mut triggers, code_trigger(p, m.as_str()));
        }
    }
    for caps in p.verb_object.captures_iter(&blanked) {
        let token = &caps[1];
        if is_code_like(token) {
            push(&mut triggers, code_trigger(p, token));
        } else {
            push_word(&mut triggers, token);
        }
    }
    triggers
}

fn code_trigger(p: &Patterns, token: &str) -> Option<Trigger> {
    let token = token.trim();
    let base = token
        .strip_suffix("()")
        .or_else(|| token.strip_suffix('('))
        .unwrap_or(token);
    let call = base.len() != token.len();
    if base.is_empty() {
        return None;
    }
    if p.code_exact.is_match(base) {
        Some(Trigger {
            text: base.to_string(),
            kind: TriggerKind::Identifier,
            call,
        })
    } else {
        Some(Trigger {
            text: token.to_string(),
            kind: TriggerKind::Literal,
            call: false,
        })
    }
}

fn is_code_like(token: &str) -> bool {
    if let Some(base) = token.strip_suffix("()") {
        return base.len() >= 2;
    }
    if token.contains("::") || token.contains("->") {
        return true;
    }
    if token.contains('.') {
        return token.split('.').all(|seg| seg.len() >= 2);
    }
    if token.contains('_') {
        return token.trim_matches('_').len() >= 2;
    }
    let chars: Vec<char> = token.chars().collect();
    chars
        .windows(2)
        .any(|w| w[0].is_ascii_lowercase() && w[1].is_ascii_uppercase())
}

fn push_word(triggers: &mut Vec<Trigger>, word: &str) {
    let lower = word.to_lowercase();
    if word.len() < 2 || STOPWORDS.contains(&lower.as_str()) {
        return;
    }
    push(
        triggers,
        Some(Trigger {
            text: word.to_string(),
            kind: TriggerKind::Word,
            call: false,
        }),
    );
}

fn push(triggers: &mut Vec<Trigger>, trigger: Option<Trigger>) {
    if let Some(t) = trigger {
        if !t.text.is_empty() && !triggers.iter().any(|e| e.text == t.text) {
            triggers.push(t);
        }
    }
}

fn first_code_span(p: &Patterns, text: &str) -> Option<String> {
    if let Some(caps) = p.backtick.captures(text) {
        return Some(caps[1].trim().to_string());
    }
    p.code_token
        .find_iter(text)
        .map(|m| m.as_str())
        .find(|t| is_code_like(t))
        .map(str::to_string)
}

fn tidy_alternative(p: &Patterns, text: &str) -> Option<String> {
    if let Some(span) = first_code_span(p, text) {
        return Some(span);
    }
    let trim_chars: &[char] = &[
        ' ', ',', '.', ';', ':', '!', '?', '，', '。', '；', '：', '！', '？', '(', ')',
    ];
    let mut s = text.trim_matches(trim_chars);
    loop {
        let lower = s.to_lowercase();
        let before = s.len();
        for word in ["use ", "call ", "prefer ", "the ", "a "] {
            if lower.starts_with(word) {
                s = s[word.len()..].trim_start();
                break;
            }
        }
        if s.len() == before {
            break;
        }
    }
    let lower = s.to_lowercase();
    if lower.ends_with(" instead") {
        s = s[..s.len() - " instead".len()].trim_end();
    }
    let s = s.trim_matches(trim_chars);
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

// ============ Checklist ============

/// Rules grouped for display, with per-severity and per-category counts.
#[derive(Debug, Clone, Serialize)]
pub struct Checklist {
    pub documents: Vec<String>,
    pub rules: Vec<Rule>,
    pub by_severity: BTreeMap<&'static str, usize>,
    pub by_category: BTreeMap<String, usize>,
    pub warnings: Vec<Warning>,
}

impl Checklist {
    pub fn new(documents: &[StandardDocument], extraction: Extraction) -> Self {
        let mut by_severity = BTreeMap::new();
        let mut by_category = BTreeMap::new();
        for rule in &extraction.rules {
            *by_severity.entry(rule.severity.as_str()).or_insert(0) += 1;
            *by_category.entry(rule.category.clone()).or_insert(0) += 1;
        }
        Self {
            documents: documents.iter().map(|d| d.entry.path.clone()).collect(),
            rules: extraction.rules,
            by_severity,
            by_category,
            warnings: extraction.warnings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DocumentEntry, EntryKind};

    fn rules(text: &str) -> Vec<Rule> {
        extract_document("Standards/python.md", text, "PYTHON")
    }

    fn trigger_texts(rule: &Rule) -> Vec<&str> {
        rule.triggers.iter().map(|t| t.text.as_str()).collect()
    }

    fn doc(path: &str, text: &str) -> StandardDocument {
        StandardDocument {
            entry: DocumentEntry {
                name: path.rsplit('/').next().unwrap().into(),
                path: path.into(),
                kind: EntryKind::File,
                size_bytes: Some(text.len() as u64),
                modified: None,
            },
            text: text.into(),
            truncated: false,
        }
    }

    #[test]
    fn prohibition_with_alternative() {
        let r = rules("# Security\n\n- Never use `eval()`; use `ast.literal_eval` instead.\n");
        assert_eq!(r.len(), 1);
        let rule = &r[0];
        assert_eq!(rule.id, "PYTHON-001");
        assert_eq!(rule.kind, RuleKind::Prohibition);
        assert_eq!(rule.severity, Severity::Error);
        assert_eq!(rule.category, "security");
        assert_eq!(rule.citation.line, 3);
        assert_eq!(rule.citation.section.as_deref(), Some("Security"));
        assert_eq!(
            rule.triggers,
            vec![Trigger {
                text: "eval".into(),
                kind: TriggerKind::Identifier,
                call: true
            }]
        );
        assert_eq!(rule.alternative.as_deref(), Some("ast.literal_eval"));
    }

    #[test]
    fn object_of_use_becomes_word_trigger() {
        let r = rules("Do not use print for diagnostics, use the logging module instead.");
        assert_eq!(trigger_texts(&r[0]), vec!["print"]);
        assert_eq!(r[0].alternative.as_deref(), Some("logging module"));
    }

    #[test]
    fn cjk_prohibition() {
        let r = rules("## 安全\n\n1. 禁止使用 os.system 执行命令，应使用 subprocess.run。\n");
        assert_eq!(r.len(), 1);
        assert_eq!(r[0].severity, Severity::Error);
        assert_eq!(trigger_texts(&r[0]), vec!["os.system"]);
        assert_eq!(r[0].alternative.as_deref(), Some("subprocess.run"));
    }

    #[test]
    fn obligation_without_instead_has_no_triggers() {
        let r = rules("- All public functions must have docstrings.\n");
        assert_eq!(r[0].kind, RuleKind::Obligation);
        assert!(r[0].triggers.is_empty());
    }

    #[test]
    fn obligation_with_instead_of_triggers_on_the_rejected_part() {
        let r = rules("- Always use `logger.info` instead of `print()`.\n");
        assert_eq!(r[0].kind, RuleKind::Obligation);
        assert_eq!(trigger_texts(&r[0]), vec!["print"]);
        assert!(r[0].triggers[0].call);
        assert_eq!(r[0].alternative.as_deref(), Some("logger.info"));
    }

    #[test]
    fn soft_prohibition_is_warning() {
        let r = rules("You should avoid `SELECT *` in queries.");
        assert_eq!(r[0].kind, RuleKind::Prohibition);
        assert_eq!(r[0].severity, Severity::Warning);
        assert_eq!(r[0].triggers[0].kind, TriggerKind::Literal);
        assert_eq!(r[0].triggers[0].text, "SELECT *");
    }

    #[test]
    fn code_fences_are_skipped() {
        let text = "# Rules\n\n```python\n# never do this\neval(x)\n```\n\nPlain text here.\n";
        assert!(rules(text).is_empty());
    }

    #[test]
    fn paragraph_sentences_cite_their_own_line() {
        let text = "Intro line without markers.\nSecond sentence\nspans lines. Never call\n`exit()` in libraries.\n";
        let r = rules(text);
        assert_eq!(r.len(), 1);
        assert_eq!(r[0].citation.line, 3);
        assert_eq!(trigger_texts(&r[0]), vec!["exit"]);
    }

    #[test]
    fn list_continuation_lines_join() {
        let text = "- Never hardcode credentials\n  such as `API_KEY` values.\n- short\n";
        let r = rules(text);
        assert_eq!(r.len(), 1);
        assert!(r[0].statement.contains("such as `API_KEY` values"));
        assert_eq!(trigger_texts(&r[0]), vec!["API_KEY"]);
    }

    #[test]
    fn word_after_marker_is_fallback_trigger() {
        let r = rules("- 禁止 goto 语句\n");
        assert_eq!(trigger_texts(&r[0]), vec!["goto"]);
        assert_eq!(r[0].triggers[0].kind, TriggerKind::Word);
    }

    #[test]
    fn unmarked_text_yields_nothing() {
        assert!(rules("# Title\n\nThis document describes our layout.\n").is_empty());
    }

    #[test]
    fn prefixes_are_unique_across_corpus() {
        let docs = vec![
            doc("Standards/a/rust.md", "- Never use `unsafe` blocks.\n"),
            doc("Standards/b/rust.md", "- Never use `transmute`.\n"),
            doc("Standards/规范.md", "- 禁止使用 `goto`。\n"),
        ];
        let ex = extract_corpus(&docs);
        let ids: Vec<&str> = ex.rules.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["RUST-001", "RUST2-001", "RULE-001"]);
    }

    #[test]
    fn category_uses_file_name_and_section() {
        assert_eq!(infer_category("naming.md", None), "naming");
        assert_eq!(infer_category("guide.md", Some("日志")), "logging");
        assert_eq!(infer_category("guide.md", Some("Misc")), "general");
    }

    #[test]
    fn checklist_counts() {
        let docs = vec![doc(
            "Standards/py.md",
            "- Never use `eval()`.\n- You should prefer f-strings.\n",
        )];
        let checklist = Checklist::new(&docs, extract_corpus(&docs));
        assert_eq!(checklist.rules.len(), 2);
        assert_eq!(checklist.by_severity.get("error"), Some(&1));
        assert_eq!(checklist.by_severity.get("warning"), Some(&1));
    }

    #[test]
    fn abbreviations_do_not_split() {
        let r = rules("Never use globals, e.g. `GLOBAL_STATE` in handlers.");
        assert_eq!(r.len(), 1);
        assert_eq!(trigger_texts(&r[0]), vec!["GLOBAL_STATE", "globals"]);
    }
}
