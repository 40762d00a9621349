use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tempfile::TempDir;

fn dv_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("dv");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let base = tmp.path().to_path_buf();

    let config_dir = base.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let share = base.join("share");
    fs::create_dir_all(share.join("docs")).unwrap();
    fs::create_dir_all(share.join("Standards")).unwrap();
    fs::create_dir_all(share.join("src")).unwrap();
    fs::write(
        share.join("docs/spec-tag.md"),
        "# Tagging\n\nHow releases are named.\n",
    )
    .unwrap();
    fs::write(
        share.join("docs/other.md"),
        "# Other\n\nWe mention the tag once.\n",
    )
    .unwrap();
    fs::write(share.join("readme.txt"), "line 1\nline 2\nline 3\nline 4\n").unwrap();
    fs::write(
        share.join("Standards/python.md"),
        "# Security\n\n- Never use `eval()`; use `ast.literal_eval` instead.\n- Do not call `os.system`.\n\n# Notes\n\nThe team reviews weekly.\n",
    )
    .unwrap();
    fs::write(
        share.join("src/app.py"),
        "import os\nx = eval(data)\nos.system('ls')\n",
    )
    .unwrap();

    let config_content = format!(
        r#"[repository]
root = "{}"

[read]
max_bytes = 4096
max_lines = 100

[upload]
max_bytes = 1024
conflict = "rename"
"#,
        share.display()
    );

    let config_path = config_dir.join("dv.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_dv(config_path: &Path, args: &[&str]) -> (String, String, i32) {
    let binary = dv_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run dv binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.code().unwrap_or(-1))
}

fn run_json(config_path: &Path, args: &[&str]) -> (serde_json::Value, i32) {
    let mut full = vec!["--json"];
    full.extend_from_slice(args);
    let (stdout, stderr, code) = run_dv(config_path, &full);
    let value = serde_json::from_str(&stdout)
        .unwrap_or_else(|e| panic!("stdout is not one JSON envelope ({}): {}\n{}", e, stdout, stderr));
    (value, code)
}

#[test]
fn test_list_puts_directories_first() {
    let (_tmp, config_path) = setup_test_env();
    let (json, code) = run_json(&config_path, &["list"]);
    assert_eq!(code, 0);
    assert_eq!(json["tool"], "docvault.list");
    let names: Vec<&str> = json["data"]["entries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Standards", "docs", "src", "readme.txt"]);
}

#[test]
fn test_read_reports_truncation() {
    let (_tmp, config_path) = setup_test_env();
    let (json, code) = run_json(&config_path, &["read", "readme.txt", "--max-lines", "2"]);
    assert_eq!(code, 0);
    let data = &json["data"];
    assert_eq!(data["content"], "line 1\nline 2\n");
    assert_eq!(data["truncated"], true);
    assert_eq!(data["next_offset"], 2);

    let (stdout, _, code) = run_dv(&config_path, &["read", "readme.txt", "--offset", "3"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("lines:      4-4 of 4"));
    assert!(stdout.ends_with("line 4\n"));
}

#[test]
fn test_escape_is_a_path_violation() {
    let (_tmp, config_path) = setup_test_env();
    let (json, code) = run_json(&config_path, &["read", "../config/dv.toml"]);
    assert_eq!(code, 4);
    assert_eq!(json["ok"], false);
    assert_eq!(json["error"]["kind"], "path_violation");
    assert!(json.get("data").is_none());
}

#[test]
fn test_missing_file_suggests_parent() {
    let (_tmp, config_path) = setup_test_env();
    let (_, stderr, code) = run_dv(&config_path, &["read", "docs/nope/missing.md"]);
    assert_eq!(code, 3);
    assert!(stderr.contains("not found"));
    assert!(stderr.contains("'docs'"));
}

#[test]
fn test_upload_rename_keeps_every_version() {
    let (tmp, config_path) = setup_test_env();
    let local = tmp.path().join("note.md");
    let mut stored = Vec::new();
    for body in ["one", "two", "three"] {
        fs::write(&local, body).unwrap();
        let (json, code) = run_json(
            &config_path,
            &["upload", "inbox/a.md", "--from", local.to_str().unwrap()],
        );
        assert_eq!(code, 0);
        stored.push(json["data"]["path"].as_str().unwrap().to_string());
    }
    assert_eq!(stored, vec!["inbox/a.md", "inbox/a (1).md", "inbox/a (2).md"]);
    let share = tmp.path().join("share/inbox");
    assert_eq!(fs::read_to_string(share.join("a.md")).unwrap(), "one");
    assert_eq!(fs::read_to_string(share.join("a (2).md")).unwrap(), "three");
}

#[test]
fn test_upload_too_large_is_rejected() {
    let (tmp, config_path) = setup_test_env();
    let local = tmp.path().join("big.bin");
    fs::write(&local, vec![b'x'; 2048]).unwrap();
    let (json, code) = run_json(
        &config_path,
        &["upload", "big.txt", "--from", local.to_str().unwrap()],
    );
    assert_eq!(code, 5);
    assert_eq!(json["error"]["kind"], "payload_too_large");
    assert!(!tmp.path().join("share/big.txt").exists());
}

#[test]
fn test_search_ranks_name_match_first() {
    let (_tmp, config_path) = setup_test_env();
    let (json, code) = run_json(&config_path, &["search", "tag", "--dir", "docs"]);
    assert_eq!(code, 0);
    let hits = json["data"]["hits"].as_array().unwrap();
    assert_eq!(hits[0]["path"], "docs/spec-tag.md");
    assert_eq!(hits[1]["path"], "docs/other.md");
    assert_eq!(hits[1]["match_kind"], "content");
}

#[test]
fn test_search_without_hits_prints_hints() {
    let (_tmp, config_path) = setup_test_env();
    let (stdout, _, code) = run_dv(&config_path, &["search", "--keywords", "zebra,okapi"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("No results"));
    assert!(stdout.contains("hint:"));
}

#[test]
fn test_review_file_reports_findings() {
    let (_tmp, config_path) = setup_test_env();
    let (json, code) = run_json(&config_path, &["review", "--file", "src/app.py"]);
    assert_eq!(code, 0);
    let data = &json["data"];
    assert_eq!(data["status"], "issues_found");
    let findings = data["findings"].as_array().unwrap();
    assert_eq!(findings.len(), 2);
    assert_eq!(findings[0]["location"]["line"], 2);
    assert_eq!(findings[0]["citation"]["document"], "Standards/python.md");

    let (_, _, code) = run_dv(
        &config_path,
        &["review", "--file", "src/app.py", "--fail-on-findings"],
    );
    assert_eq!(code, 1);
}

#[test]
fn test_review_markdown_for_clean_snippet() {
    let (_tmp, config_path) = setup_test_env();
    let (stdout, _, code) = run_dv(&config_path, &["review", "--snippet", "print('ok')"]);
    assert_eq!(code, 0);
    assert!(stdout.starts_with("# Code Review Report"));
    assert!(stdout.contains("no issues found"));
}

#[test]
fn test_review_diff_from_stdin() {
    let (_tmp, config_path) = setup_test_env();
    let mut child = Command::new(dv_binary())
        .args(["--config", config_path.to_str().unwrap(), "--json"])
        .args(["review", "--diff-file", "-"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"--- a/x.py\n+++ b/x.py\n@@ -1,1 +1,2 @@\n a = 1\n+b = eval(a)\n")
        .unwrap();
    let output = child.wait_with_output().unwrap();
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let findings = json["data"]["findings"].as_array().unwrap();
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0]["location"]["file"], "x.py");
    assert_eq!(findings[0]["location"]["line"], 2);
}

#[test]
fn test_review_requires_exactly_one_input() {
    let (_tmp, config_path) = setup_test_env();
    let (json, code) = run_json(
        &config_path,
        &["review", "--snippet", "x", "--file", "src/app.py"],
    );
    assert_eq!(code, 2);
    assert_eq!(json["error"]["kind"], "invalid_input");
}

#[test]
fn test_review_without_standards_is_unavailable() {
    let (_tmp, config_path) = setup_test_env();
    let (json, code) = run_json(
        &config_path,
        &["review", "--snippet", "eval(x)", "--standards", "NoSuchDir"],
    );
    assert_eq!(code, 6);
    assert_eq!(json["error"]["kind"], "standards_unavailable");
}

#[test]
fn test_standards_checklist() {
    let (_tmp, config_path) = setup_test_env();
    let (stdout, _, code) = run_dv(&config_path, &["standards"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("# Standards Checklist"));
    assert!(stdout.contains("PYTHON-001"));
    assert!(stdout.contains("## security"));
}

#[test]
fn test_config_set_root_and_show() {
    let (tmp, config_path) = setup_test_env();
    let new_root = tmp.path().join("elsewhere");
    let (_, _, code) = run_dv(
        &config_path,
        &["config", "set-root", "--path", new_root.to_str().unwrap()],
    );
    assert_eq!(code, 0);
    assert!(new_root.is_dir());

    let (json, code) = run_json(&config_path, &["config", "show"]);
    assert_eq!(code, 0);
    let root = json["data"]["repository"]["root"].as_str().unwrap();
    assert!(root.ends_with("elsewhere"));
    assert_eq!(json["data"]["upload"]["max_bytes"], 1024);
}

#[test]
fn test_bad_config_is_invalid_input() {
    let (tmp, _) = setup_test_env();
    let bad = tmp.path().join("config/bad.toml");
    fs::write(&bad, "[repository]\nroot = \"/tmp\"\n[read]\nmax_lines = 0\n").unwrap();
    let (json, code) = run_json(&bad, &["list"]);
    assert_eq!(code, 2);
    assert!(json["error"]["message"]
        .as_str()
        .unwrap()
        .contains("read.max_lines"));
}
