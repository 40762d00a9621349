//! Unified-diff parsing.
//!
//! Only added lines are offered to matching, each carrying its post-change
//! line number and the header of the hunk it came from. Hunk line counts
//! are tracked so an added line that happens to start with `++` is still
//! read as content. Deleted files (`+++ /dev/null`) produce no unit.

use crate::models::{CodeLine, CodeUnit, UnitOrigin};

#[derive(Default)]
struct FileState {
    path: Option<String>,
    deleted: bool,
    lines: Vec<CodeLine>,
}

/// Parse `diff` into one unit per changed file, in diff order.
pub fn parse_unified(diff: &str) -> Vec<CodeUnit> {
    let mut units = Vec::new();
    let mut current: Option<FileState> = None;
    let mut old_left: usize = 0;
    let mut new_left: usize = 0;
    let mut next_line: usize = 0;
    let mut hunk: Option<String> = None;

    for raw in diff.lines() {
        if old_left > 0 || new_left > 0 {
            match raw.chars().next() {
                Some('+') => {
                    let file = current.get_or_insert_with(FileState::default);
                    file.lines.push(CodeLine {
                        number: next_line,
                        text: raw[1..].to_string(),
                        hunk: hunk.clone(),
                    });
                    next_line += 1;
                    new_left = new_left.saturating_sub(1);
                    continue;
                }
                Some('-') => {
                    old_left = old_left.saturating_sub(1);
                    continue;
                }
                Some(' ') | None => {
                    old_left = old_left.saturating_sub(1);
                    new_left = new_left.saturating_sub(1);
                    next_line += 1;
                    continue;
                }
                Some('\\') => continue,
                // Truncated hunk; fall through to header handling.
                _ => {
                    old_left = 0;
                    new_left = 0;
                }
            }
        }

        if let Some(rest) = raw.strip_prefix("diff --git ") {
            finish(&mut current, &mut units);
            current = Some(FileState {
                path: git_header_path(rest),
                ..FileState::default()
            });
        } else if let Some(rest) = raw.strip_prefix("+++ ") {
            let file = current.get_or_insert_with(FileState::default);
            match header_path(rest) {
                Some(path) => file.path = Some(path),
                None => file.deleted = true,
            }
        } else if raw.starts_with("--- ") {
            // A `---` header after lines were collected starts a new file
            // in diffs without `diff --git` lines.
            if current.as_ref().is_some_and(|f| !f.lines.is_empty()) {
                finish(&mut current, &mut units);
            }
        } else if raw.starts_with("@@") {
            if let Some((old, new, start, header)) = parse_hunk_header(raw) {
                old_left = old;
                new_left = new;
                next_line = start;
                hunk = Some(header);
                current.get_or_insert_with(FileState::default);
            }
        } else if raw.starts_with('\\') {
            continue;
        }
    }
    finish(&mut current, &mut units);
    units
}

fn finish(current: &mut Option<FileState>, units: &mut Vec<CodeUnit>) {
    let Some(file) = current.take() else { return };
    if file.deleted {
        return;
    }
    units.push(CodeUnit {
        label: file.path.unwrap_or_else(|| "diff".to_string()),
        origin: UnitOrigin::Diff,
        lines: file.lines,
    });
}

fn git_header_path(rest: &str) -> Option<String> {
    rest.rsplit_once(" b/").map(|(_, b)| b.trim().to_string())
}

/// Path from a `+++` header, `None` for `/dev/null`.
fn header_path(rest: &str) -> Option<String> {
    let path = rest.split('\t').next().unwrap_or(rest).trim();
    if path == "/dev/null" {
        return None;
    }
    Some(path.strip_prefix("b/").unwrap_or(path).to_string())
}

/// `@@ -a[,b] +c[,d] @@ ...` -> (b, d, c, "@@ -a,b +c,d @@").
fn parse_hunk_header(line: &str) -> Option<(usize, usize, usize, String)> {
    let body = line.strip_prefix("@@ ")?;
    let end = body.find(" @@")?;
    let ranges = &body[..end];
    let mut parts = ranges.split_whitespace();
    let old = parts.next()?.strip_prefix('-')?;
    let new = parts.next()?.strip_prefix('+')?;
    let (_, old_count) = parse_range(old)?;
    let (new_start, new_count) = parse_range(new)?;
    Some((old_count, new_count, new_start, format!("@@ {} @@", ranges)))
}

fn parse_range(range: &str) -> Option<(usize, usize)> {
    match range.split_once(',') {
        Some((start, count)) => Some((start.parse().ok()?, count.parse().ok()?)),
        None => Some((range.parse().ok()?, 1)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GIT_DIFF: &str = "\
diff --git a/src/app.py b/src/app.py
index 1111111..2222222 100644
--- a/src/app.py
+++ b/src/app.py
@@ -1,3 +1,4 @@ def main():
 import os
-x = 1
+x = eval(data)
+y = 2
 print(x)
@@ -10,2 +11,3 @@
 a = 1
+++counter
 b = 2
diff --git a/old.py b/old.py
deleted file mode 100644
--- a/old.py
+++ /dev/null
@@ -1,1 +0,0 @@
-gone()
";

    #[test]
    fn added_lines_carry_post_change_numbers() {
        let units = parse_unified(GIT_DIFF);
        assert_eq!(units.len(), 1);
        let unit = &units[0];
        assert_eq!(unit.label, "src/app.py");
        let got: Vec<(usize, &str)> = unit.lines.iter().map(|l| (l.number, l.text.as_str())).collect();
        assert_eq!(got, vec![(2, "x = eval(data)"), (3, "y = 2"), (12, "++counter")]);
        assert_eq!(unit.lines[0].hunk.as_deref(), Some("@@ -1,3 +1,4 @@"));
        assert_eq!(unit.lines[2].hunk.as_deref(), Some("@@ -10,2 +11,3 @@"));
    }

    #[test]
    fn plain_unified_diff_without_git_header() {
        let diff = "--- a.txt\t2024-01-01\n+++ b.txt\t2024-01-02\n@@ -0,0 +1 @@\n+hello\n";
        let units = parse_unified(diff);
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].label, "b.txt");
        assert_eq!(units[0].lines[0].number, 1);
    }

    #[test]
    fn no_newline_marker_is_ignored() {
        let diff = "--- a/x\n+++ b/x\n@@ -1 +1 @@\n-old\n\\ No newline at end of file\n+new\n\\ No newline at end of file\n";
        let units = parse_unified(diff);
        assert_eq!(units[0].lines.len(), 1);
        assert_eq!(units[0].lines[0].text, "new");
    }

    #[test]
    fn headerless_hunk_gets_generic_label() {
        let units = parse_unified("@@ -1,0 +1,1 @@\n+value\n");
        assert_eq!(units[0].label, "diff");
    }

    #[test]
    fn garbage_yields_nothing() {
        assert!(parse_unified("not a diff at all").is_empty());
    }
}
