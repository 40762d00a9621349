//! Lexical normalization of caller-supplied, root-relative paths.
//!
//! Both `/` and `\` are separators. `.` segments vanish, `..` pops one
//! component, and popping past the root is a [`Error::PathViolation`].
//! Absolute inputs (`/etc`, `\\server\share`) and drive-qualified inputs
//! (`C:foo`, `C:\foo`) are rejected outright; callers that want to accept
//! an absolute path inside the root strip the root prefix first.
//!
//! The result is a list of plain components that can be joined onto the
//! root without further checks. Symlink escapes are a filesystem concern
//! and are handled by the guard in the `docvault` crate.

use crate::error::{Error, Result};

/// Normalize `input` into root-relative components. An empty result means
/// the root itself.
pub fn normalize_relative(input: &str) -> Result<Vec<String>> {
    if input.contains('\0') {
        return Err(Error::violation(display(input), "contains a NUL byte"));
    }

    let unified = input.trim().replace('\\', "/");
    if unified.starts_with('/') {
        return Err(Error::violation(
            display(input),
            "is absolute; pass a path relative to the repository root",
        ));
    }
    if has_drive_prefix(&unified) {
        return Err(Error::violation(
            display(input),
            "carries a drive specifier; pass a path relative to the repository root",
        ));
    }

    let mut parts: Vec<String> = Vec::new();
    for segment in unified.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if parts.pop().is_none() {
                    return Err(Error::violation(
                        display(input),
                        "escapes the repository root",
                    ));
                }
            }
            other => parts.push(other.to_string()),
        }
    }
    Ok(parts)
}

/// Join normalized components back into the `/`-separated display form,
/// `"."` for the root.
pub fn join(parts: &[String]) -> String {
    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join("/")
    }
}

/// Normalize and re-join in one step.
pub fn normalize_display(input: &str) -> Result<String> {
    normalize_relative(input).map(|parts| join(&parts))
}

fn has_drive_prefix(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

fn display(input: &str) -> String {
    input.replace('\0', "\\0")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn collapses_dots() {
        assert_eq!(normalize_display("a/./b/../c").unwrap(), "a/c");
        assert_eq!(normalize_display("").unwrap(), ".");
        assert_eq!(normalize_display(".").unwrap(), ".");
        assert_eq!(normalize_display("a/..").unwrap(), ".");
    }

    #[test]
    fn backslash_is_a_separator() {
        assert_eq!(normalize_display("docs\\guide\\a.md").unwrap(), "docs/guide/a.md");
        let err = normalize_relative("docs\\..\\..\\secret").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PathViolation);
    }

    #[test]
    fn escapes_are_rejected_at_any_depth() {
        for input in ["..", "../x", "a/../../x", "a/b/c/../../../../etc/passwd", "./.."] {
            let err = normalize_relative(input).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::PathViolation, "{input}");
        }
    }

    #[test]
    fn deep_paths_that_stay_inside_succeed() {
        let deep = "a/b/c/d/e/f/g/../../h/i/j.md";
        assert_eq!(normalize_display(deep).unwrap(), "a/b/c/d/e/h/i/j.md");
    }

    #[test]
    fn absolute_and_drive_inputs_are_rejected() {
        for input in ["/etc/passwd", "\\\\server\\share", "C:\\Windows", "c:foo", "D:/x"] {
            let err = normalize_relative(input).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::PathViolation, "{input}");
        }
    }

    #[test]
    fn nul_is_rejected() {
        let err = normalize_relative("a\0b").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PathViolation);
        assert!(err.to_string().contains("a\\0b"));
    }

    #[test]
    fn dotted_names_are_kept() {
        assert_eq!(normalize_display("..hidden/...").unwrap(), "..hidden/...");
    }
}
