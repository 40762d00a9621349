//! Term extraction for search.
//!
//! Keyword mode uses the caller's terms as given. Free-text mode splits
//! the query on non-alphanumeric boundaries. Runs of CJK characters carry
//! no word boundaries, so a run longer than two characters is indexed as
//! overlapping bigrams (`代码规范` -> `代码`, `码规`, `规范`).

use crate::models::SearchMode;

/// Terms derived from one search request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Terms {
    pub mode: SearchMode,
    /// Lowercased, deduplicated terms in first-seen order.
    pub terms: Vec<String>,
    /// Compacted whole-query forms used for the full-name bonus.
    pub phrases: Vec<String>,
}

impl Terms {
    /// Keywords take precedence over the free-text query when both are given.
    pub fn from_request(keywords: &[String], query: Option<&str>) -> Self {
        let keywords: Vec<&str> = keywords
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .collect();
        if !keywords.is_empty() {
            let mut terms = Vec::new();
            for k in &keywords {
                push_unique(&mut terms, k.to_lowercase());
            }
            let phrases = dedup_compact(keywords.iter().copied());
            return Self {
                mode: SearchMode::Keyword,
                terms,
                phrases,
            };
        }

        let query = query.map(str::trim).unwrap_or("");
        if query.is_empty() {
            return Self {
                mode: SearchMode::Empty,
                terms: Vec::new(),
                phrases: Vec::new(),
            };
        }
        let mut terms = tokenize(query);
        if terms.is_empty() {
            terms.push(query.to_lowercase());
        }
        Self {
            mode: SearchMode::FreeText,
            terms,
            phrases: dedup_compact(std::iter::once(query)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

/// Split free text into lowercase terms of at least two characters.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut word = String::new();
    let mut cjk: Vec<char> = Vec::new();

    for c in text.chars() {
        if is_cjk(c) {
            flush_word(&mut word, &mut out);
            cjk.push(c);
        } else if c.is_alphanumeric() {
            flush_cjk(&mut cjk, &mut out);
            word.extend(c.to_lowercase());
        } else {
            flush_word(&mut word, &mut out);
            flush_cjk(&mut cjk, &mut out);
        }
    }
    flush_word(&mut word, &mut out);
    flush_cjk(&mut cjk, &mut out);
    out
}

/// Lowercase and keep only alphanumerics, so `Spec Tag` and `spec-tag`
/// compare equal.
pub fn compact(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

pub fn is_cjk(c: char) -> bool {
    matches!(c as u32,
        0x3040..=0x30FF     // hiragana, katakana
        | 0x3400..=0x4DBF   // CJK extension A
        | 0x4E00..=0x9FFF   // CJK unified ideographs
        | 0xAC00..=0xD7AF   // hangul syllables
        | 0xF900..=0xFAFF   // CJK compatibility ideographs
    )
}

fn flush_word(word: &mut String, out: &mut Vec<String>) {
    if word.chars().count() >= 2 {
        push_unique(out, std::mem::take(word));
    } else {
        word.clear();
    }
}

fn flush_cjk(run: &mut Vec<char>, out: &mut Vec<String>) {
    match run.len() {
        0 | 1 => {}
        2 => push_unique(out, run.iter().collect()),
        _ => {
            for pair in run.windows(2) {
                push_unique(out, pair.iter().collect());
            }
        }
    }
    run.clear();
}

fn push_unique(out: &mut Vec<String>, term: String) {
    if !out.contains(&term) {
        out.push(term);
    }
}

fn dedup_compact<'a>(items: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut out = Vec::new();
    for item in items {
        let c = compact(item);
        if !c.is_empty() {
            push_unique(&mut out, c);
        }
    }
    out
}
