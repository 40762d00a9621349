//! Content masking applied to every read and every search snippet.
//!
//! Rules are applied in order. A match is replaced by the rule's
//! placeholder followed by one `\n` per newline the match spanned, so line
//! numbers computed on masked text stay valid for citations.

use regex::{Captures, Regex};
use std::borrow::Cow;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MaskPattern {
    /// A regular expression, used as written.
    Regex(String),
    /// A literal keyword, matched case-insensitively.
    Keyword(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskRule {
    pub pattern: MaskPattern,
    pub placeholder: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Masked<'a> {
    pub text: Cow<'a, str>,
    pub redactions: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Masker {
    rules: Vec<(Regex, String)>,
}

impl Masker {
    pub fn new(rules: &[MaskRule]) -> Result<Self> {
        let mut compiled = Vec::with_capacity(rules.len());
        for rule in rules {
            let source = match &rule.pattern {
                MaskPattern::Regex(p) => p.clone(),
                MaskPattern::Keyword(k) if k.is_empty() => continue,
                MaskPattern::Keyword(k) => format!("(?i){}", regex::escape(k)),
            };
            let re = Regex::new(&source).map_err(|e| {
                Error::InvalidInput(format!("invalid mask pattern '{}': {}", source, e))
            })?;
            compiled.push((re, rule.placeholder.clone()));
        }
        Ok(Self { rules: compiled })
    }

    /// A masker that leaves text untouched.
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Whether `text` carries one of the placeholders this masker writes.
    pub fn leaves_placeholder(&self, text: &str) -> bool {
        self.rules
            .iter()
            .any(|(_, placeholder)| !placeholder.is_empty() && text.contains(placeholder.as_str()))
    }

    pub fn apply<'a>(&self, text: &'a str) -> Masked<'a> {
        let mut current: Cow<'a, str> = Cow::Borrowed(text);
        let mut redactions = 0;
        for (re, placeholder) in &self.rules {
            let mut hits = 0;
            let replaced = re.replace_all(&current, |caps: &Captures| {
                hits += 1;
                let newlines = caps[0].matches('\n').count();
                let mut out = String::with_capacity(placeholder.len() + newlines);
                out.push_str(placeholder);
                out.extend(std::iter::repeat('\n').take(newlines));
                out
            });
            if hits > 0 {
                let owned = replaced.into_owned();
                redactions += hits;
                current = Cow::Owned(owned);
            }
        }
        Masked {
            text: current,
            redactions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kw(k: &str) -> MaskRule {
        MaskRule {
            pattern: MaskPattern::Keyword(k.into()),
            placeholder: "***".into(),
        }
    }

    #[test]
    fn disabled_borrows() {
        let m = Masker::disabled().apply("secret");
        assert!(matches!(m.text, Cow::Borrowed(_)));
        assert_eq!(m.redactions, 0);
    }

    #[test]
    fn keyword_is_case_insensitive_and_literal() {
        let masker = Masker::new(&[kw("api.key")]).unwrap();
        let m = masker.apply("API.KEY=1 apiXkey=2");
        assert_eq!(m.text, "***=1 apiXkey=2");
        assert_eq!(m.redactions, 1);
    }

    #[test]
    fn regex_rules_apply_in_order() {
        let rules = vec![
            MaskRule {
                pattern: MaskPattern::Regex(r"\d{3}-\d{4}".into()),
                placeholder: "[PHONE]".into(),
            },
            kw("phone"),
        ];
        let m = Masker::new(&rules).unwrap().apply("phone: 555-1234");
        assert_eq!(m.text, "***: [PHONE]");
        assert_eq!(m.redactions, 2);
    }

    #[test]
    fn placeholders_are_recognized() {
        let masker = Masker::new(&[kw("password")]).unwrap();
        assert!(masker.leaves_placeholder("***"));
        assert!(masker.leaves_placeholder("get_***()"));
        assert!(!masker.leaves_placeholder("os.system"));
        assert!(!Masker::disabled().leaves_placeholder("***"));
    }

    #[test]
    fn multiline_match_keeps_line_count() {
        let rules = vec![MaskRule {
            pattern: MaskPattern::Regex(r"(?s)BEGIN KEY.*?END KEY".into()),
            placeholder: "[KEY]".into(),
        }];
        let input = "a\nBEGIN KEY\nxxx\nEND KEY\nb\n";
        let m = Masker::new(&rules).unwrap().apply(input);
        assert_eq!(m.text.lines().count(), input.lines().count());
        assert_eq!(m.text.lines().last(), Some("b"));
    }

    #[test]
    fn bad_regex_is_invalid_input() {
        let rules = vec![MaskRule {
            pattern: MaskPattern::Regex("(".into()),
            placeholder: "x".into(),
        }];
        assert!(Masker::new(&rules).is_err());
    }
}
