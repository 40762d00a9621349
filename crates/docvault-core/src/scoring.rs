//! Relevance scoring, snippet extraction, and bounded top-K selection.
//!
//! # Scoring
//!
//! Each distinct term contributes once, taking the best of:
//!
//! | Where the term occurs | Points |
//! |-----------------------|--------|
//! | file name | [`NAME_POINTS`] |
//! | a parent directory name | [`DIR_POINTS`] |
//! | file content | [`CONTENT_POINTS`] |
//!
//! On top of that, a whole-query bonus applies when the compacted query
//! (or one keyword) equals the compacted file stem ([`EXACT_NAME_BONUS`])
//! or appears inside the compacted file name ([`PARTIAL_NAME_BONUS`]).
//!
//! Repeating a term in a document never adds points, and with equal term
//! coverage a name match always beats a content-only match.
//!
//! # Ordering
//!
//! Score descending, then shallower path first, then path ascending.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::models::{MatchKind, SearchHit, Snippet};
use crate::query::{compact, Terms};

pub const NAME_POINTS: u32 = 40;
pub const DIR_POINTS: u32 = 20;
pub const CONTENT_POINTS: u32 = 10;
pub const PARTIAL_NAME_BONUS: u32 = 60;
pub const EXACT_NAME_BONUS: u32 = 100;

/// Characters of context kept on each side of a match.
pub const SNIPPET_CONTEXT: usize = 80;
pub const MAX_SNIPPETS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scored {
    pub score: u32,
    pub match_kind: MatchKind,
    pub matched_terms: Vec<String>,
    pub snippets: Vec<Snippet>,
}

/// Score one file. `rel_path` is root-relative and `/`-separated;
/// `content` is `None` when the content was not searched.
pub fn score_file(terms: &Terms, rel_path: &str, content: Option<&str>) -> Option<Scored> {
    if terms.is_empty() {
        return None;
    }
    let (dirs, name) = match rel_path.rsplit_once('/') {
        Some((dirs, name)) => (dirs.to_lowercase(), name),
        None => (String::new(), rel_path),
    };
    let name_lower = name.to_lowercase();
    let content_lower = content.map(str::to_lowercase);

    let mut score = 0;
    let mut name_hit = false;
    let mut content_hit = false;
    let mut matched_terms = Vec::new();
    let mut content_terms = Vec::new();

    for term in &terms.terms {
        let points = if name_lower.contains(term.as_str()) {
            name_hit = true;
            NAME_POINTS
        } else if !dirs.is_empty() && dirs.split('/').any(|d| d.contains(term.as_str())) {
            name_hit = true;
            DIR_POINTS
        } else if content_lower
            .as_deref()
            .is_some_and(|c| c.contains(term.as_str()))
        {
            content_hit = true;
            content_terms.push(term.as_str());
            CONTENT_POINTS
        } else {
            continue;
        };
        score += points;
        matched_terms.push(term.clone());
    }

    let bonus = name_bonus(terms, name);
    if bonus > 0 {
        name_hit = true;
        score += bonus;
    }

    if matched_terms.is_empty() && score == 0 {
        return None;
    }

    // A name hit may still have content matches worth showing.
    if let Some(text) = content {
        for term in &terms.terms {
            if !content_terms.contains(&term.as_str())
                && content_lower
                    .as_deref()
                    .is_some_and(|c| c.contains(term.as_str()))
            {
                content_hit = true;
                content_terms.push(term.as_str());
            }
        }
        let snippets = snippets(text, &content_terms);
        let match_kind = kind_of(name_hit, content_hit);
        return Some(Scored {
            score,
            match_kind,
            matched_terms,
            snippets,
        });
    }

    Some(Scored {
        score,
        match_kind: MatchKind::Name,
        matched_terms,
        snippets: Vec::new(),
    })
}

fn kind_of(name: bool, content: bool) -> MatchKind {
    match (name, content) {
        (true, true) => MatchKind::Both,
        (false, true) => MatchKind::Content,
        _ => MatchKind::Name,
    }
}

fn name_bonus(terms: &Terms, name: &str) -> u32 {
    let stem = match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    };
    let stem = compact(stem);
    let name = compact(name);
    terms
        .phrases
        .iter()
        .map(|p| {
            if *p == stem {
                EXACT_NAME_BONUS
            } else if name.contains(p.as_str()) {
                PARTIAL_NAME_BONUS
            } else {
                0
            }
        })
        .max()
        .unwrap_or(0)
}

/// Up to [`MAX_SNIPPETS`] excerpts, one per term, each centred on the first
/// line containing that term.
pub fn snippets(text: &str, terms: &[&str]) -> Vec<Snippet> {
    let lines: Vec<&str> = text.lines().collect();
    let mut out: Vec<Snippet> = Vec::new();
    for term in terms {
        if out.len() >= MAX_SNIPPETS {
            break;
        }
        let found = lines.iter().enumerate().find_map(|(i, line)| {
            let lower = line.to_lowercase();
            lower
                .find(term)
                .map(|byte| (i, lower[..byte].chars().count()))
        });
        let Some((idx, col)) = found else { continue };
        if out.iter().any(|s| s.line == idx + 1) {
            continue;
        }
        out.push(Snippet {
            line: idx + 1,
            text: excerpt(&lines, idx, col, term.chars().count()),
        });
    }
    out.sort_by_key(|s| s.line);
    out
}

/// The matched line clipped to the context window, plus neighbouring lines
/// when they fit inside the window.
fn excerpt(lines: &[&str], idx: usize, col: usize, term_len: usize) -> String {
    let line: Vec<char> = lines[idx].chars().collect();
    let start = col.saturating_sub(SNIPPET_CONTEXT);
    let end = (col + term_len + SNIPPET_CONTEXT).min(line.len());
    let mut body: String = line[start.min(end)..end].iter().collect();
    if start > 0 {
        body.insert_str(0, "...");
    }
    if end < line.len() {
        body.push_str("...");
    }

    let mut parts = Vec::with_capacity(3);
    if start == 0 && idx > 0 && lines[idx - 1].chars().count() <= SNIPPET_CONTEXT {
        parts.push(lines[idx - 1].trim_end().to_string());
    }
    parts.push(body.trim_end().to_string());
    if end == line.len() {
        if let Some(next) = lines.get(idx + 1) {
            if next.chars().count() <= SNIPPET_CONTEXT {
                parts.push(next.trim_end().to_string());
            }
        }
    }
    parts.join("\n")
}

/// Ordering for hits: `Less` means `a` ranks ahead of `b`.
pub fn rank_order(a: &SearchHit, b: &SearchHit) -> Ordering {
    b.score
        .cmp(&a.score)
        .then(a.depth.cmp(&b.depth))
        .then_with(|| a.path.cmp(&b.path))
}

struct Ranked(SearchHit);

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        rank_order(&self.0, &other.0) == Ordering::Equal
    }
}

impl Eq for Ranked {}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ranked {
    // Worst hit at the top of the max-heap.
    fn cmp(&self, other: &Self) -> Ordering {
        rank_order(&self.0, &other.0)
    }
}

/// Keeps the best `k` hits seen so far in O(k) memory while counting every
/// offered hit.
pub struct TopK {
    k: usize,
    heap: BinaryHeap<Ranked>,
    seen: usize,
}

impl TopK {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            heap: BinaryHeap::with_capacity(k.saturating_add(1).min(1024)),
            seen: 0,
        }
    }

    pub fn push(&mut self, hit: SearchHit) {
        self.seen += 1;
        if self.k == 0 {
            return;
        }
        if self.heap.len() == self.k {
            if let Some(worst) = self.heap.peek() {
                if rank_order(&hit, &worst.0) != Ordering::Less {
                    return;
                }
            }
            self.heap.pop();
        }
        self.heap.push(Ranked(hit));
    }

    pub fn seen(&self) -> usize {
        self.seen
    }

    /// Best first.
    pub fn into_sorted(self) -> Vec<SearchHit> {
        self.heap.into_sorted_vec().into_iter().map(|r| r.0).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms(q: &str) -> Terms {
        Terms::from_request(&[], Some(q))
    }

    fn hit(path: &str, score: u32) -> SearchHit {
        SearchHit {
            path: path.into(),
            name: path.rsplit('/').next().unwrap().into(),
            match_kind: MatchKind::Name,
            score,
            depth: path.matches('/').count(),
            size_bytes: None,
            modified: None,
            matched_terms: vec![],
            snippets: vec![],
            content_searched: true,
            skip_reason: None,
        }
    }

    #[test]
    fn name_match_outranks_content_match() {
        let t = terms("tag");
        let by_name = score_file(&t, "spec-tag.md", Some("nothing here")).unwrap();
        let by_content = score_file(&t, "other.md", Some("a tag once")).unwrap();
        assert!(by_name.score > by_content.score);
        assert_eq!(by_name.match_kind, MatchKind::Name);
        assert_eq!(by_content.match_kind, MatchKind::Content);
    }

    #[test]
    fn repetition_does_not_add_points() {
        let t = terms("tag");
        let once = score_file(&t, "a.md", Some("tag")).unwrap();
        let many = score_file(&t, "b.md", Some("tag tag tag tag tag")).unwrap();
        assert_eq!(once.score, many.score);
    }

    #[test]
    fn distinct_terms_scale_content_score() {
        let t = terms("alpha beta");
        let one = score_file(&t, "a.md", Some("alpha")).unwrap();
        let two = score_file(&t, "b.md", Some("alpha and beta")).unwrap();
        assert_eq!(two.score, one.score * 2);
    }

    #[test]
    fn exact_stem_beats_partial_name() {
        let t = terms("tag");
        let exact = score_file(&t, "docs/tag.md", None).unwrap();
        let partial = score_file(&t, "docs/spec-tag.md", None).unwrap();
        assert!(exact.score > partial.score);
    }

    #[test]
    fn directory_match_counts_as_name() {
        let t = terms("guides");
        let s = score_file(&t, "guides/intro.md", None).unwrap();
        assert_eq!(s.score, DIR_POINTS);
        assert_eq!(s.match_kind, MatchKind::Name);
    }

    #[test]
    fn no_match_is_none() {
        assert!(score_file(&terms("zebra"), "a.md", Some("nothing")).is_none());
    }

    #[test]
    fn both_kind_when_name_and_content_match() {
        let s = score_file(&terms("tag"), "tag.md", Some("# tag\n")).unwrap();
        assert_eq!(s.match_kind, MatchKind::Both);
        assert_eq!(s.snippets[0].line, 1);
    }

    #[test]
    fn snippet_is_clipped_with_ellipsis() {
        let long = format!("{}needle{}", "x".repeat(200), "y".repeat(200));
        let s = snippets(&long, &["needle"]);
        assert_eq!(s.len(), 1);
        assert!(s[0].text.starts_with("..."));
        assert!(s[0].text.ends_with("..."));
        assert!(s[0].text.contains("needle"));
    }

    #[test]
    fn snippet_includes_short_neighbours() {
        let s = snippets("before\nthe needle\nafter", &["needle"]);
        assert_eq!(s[0].line, 2);
        assert_eq!(s[0].text, "before\nthe needle\nafter");
    }

    #[test]
    fn top_k_keeps_best_in_order() {
        let mut top = TopK::new(2);
        top.push(hit("c.md", 10));
        top.push(hit("a/b.md", 50));
        top.push(hit("b.md", 50));
        top.push(hit("d.md", 5));
        assert_eq!(top.seen(), 4);
        let paths: Vec<String> = top.into_sorted().into_iter().map(|h| h.path).collect();
        assert_eq!(paths, vec!["b.md", "a/b.md"]);
    }
}
