//! Standards-driven code review.
//!
//! A review runs load, extract, normalize, and match in that order. Loading
//! failures end the review; an unreadable code file in a multi-file review
//! only adds a warning. The same corpus and input always give the same
//! ordered findings.

use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, warn};

use docvault_core::budget::Deadline;
use docvault_core::diff::parse_unified;
use docvault_core::mask::Masker;
use docvault_core::models::{CodeUnit, ReviewReport, Rule, Stage, UnitOrigin, Warning};
use docvault_core::review::{build_report, match_units};
use docvault_core::rules::{extract_corpus, Checklist};
use docvault_core::{Error, ErrorKind, Result};

use crate::config::Config;
use crate::guard::PathGuard;
use crate::standards::{load_standards, StandardsOptions};
use crate::store::{DocumentStore, ReadOptions};

/// Code submitted for review.
#[derive(Debug, Clone)]
pub enum CodeInput {
    /// One workspace-relative file; any failure to read it is fatal.
    File(String),
    /// Several files; unreadable ones are skipped with a warning.
    Files(Vec<String>),
    Snippet { label: Option<String>, text: String },
    /// Unified diff text; only added lines are reviewed.
    Diff(String),
}

impl CodeInput {
    pub fn describe(&self) -> &'static str {
        match self {
            CodeInput::File(_) => "file",
            CodeInput::Files(_) => "files",
            CodeInput::Snippet { .. } => "snippet",
            CodeInput::Diff(_) => "diff",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReviewRequest {
    pub input: CodeInput,
    /// Overrides the configured workspace root for file inputs.
    pub workspace_root: Option<PathBuf>,
    /// Overrides the configured standards locations.
    pub standards: Vec<String>,
}

impl ReviewRequest {
    pub fn new(input: CodeInput) -> Self {
        Self {
            input,
            workspace_root: None,
            standards: Vec::new(),
        }
    }
}

pub struct Reviewer<'a> {
    store: &'a DocumentStore,
    standards: StandardsOptions,
    workspace_root: PathBuf,
    max_code_bytes: u64,
    deadline: Option<Duration>,
}

impl<'a> Reviewer<'a> {
    pub fn new(store: &'a DocumentStore, config: &Config) -> Result<Self> {
        Ok(Self {
            store,
            standards: StandardsOptions::from_config(config)?,
            workspace_root: config.workspace_root().to_path_buf(),
            max_code_bytes: config.review.max_code_bytes,
            deadline: config.review_deadline(),
        })
    }

    pub fn review(&self, req: &ReviewRequest) -> Result<ReviewReport> {
        let deadline = Deadline::new("review", self.deadline);
        debug!(input = req.input.describe(), "starting review");

        let corpus = load_standards(
            self.store,
            &self.standards,
            &req.standards,
            &deadline.for_stage("load"),
        )?;
        let mut extraction = extract_corpus(&corpus.documents);
        drop_masked_triggers(&mut extraction.rules, self.store.masker());
        if extraction.rules.is_empty() {
            return Err(Error::StandardsUnavailable {
                location: corpus.searched.join(", "),
                reason: "no checkable rules could be extracted from the standards documents"
                    .into(),
            });
        }
        debug!(
            documents = corpus.documents.len(),
            rules = extraction.rules.len(),
            "extracted rules"
        );

        let mut warnings = corpus.warnings;
        warnings.extend(extraction.warnings);

        deadline.for_stage("normalize").check()?;
        let units = self.normalize(req, &mut warnings)?;

        let findings = match_units(&extraction.rules, &units);
        deadline.for_stage("match").check()?;

        let documents = corpus
            .documents
            .iter()
            .map(|d| d.entry.path.clone())
            .collect();
        Ok(build_report(
            findings,
            warnings,
            &units,
            documents,
            &extraction.rules,
        ))
    }

    /// Rules extracted from the standards corpus, without reviewing code.
    pub fn checklist(&self, overrides: &[String]) -> Result<Checklist> {
        let deadline = Deadline::new("load", self.deadline);
        let corpus = load_standards(self.store, &self.standards, overrides, &deadline)?;
        let mut extraction = extract_corpus(&corpus.documents);
        drop_masked_triggers(&mut extraction.rules, self.store.masker());
        let mut checklist = Checklist::new(&corpus.documents, extraction);
        checklist.warnings.extend(corpus.warnings);
        Ok(checklist)
    }

    fn normalize(&self, req: &ReviewRequest, warnings: &mut Vec<Warning>) -> Result<Vec<CodeUnit>> {
        match &req.input {
            CodeInput::Snippet { label, text } => {
                if text.trim().is_empty() {
                    return Err(Error::InvalidInput("the snippet is empty".into()));
                }
                let label = label.as_deref().unwrap_or("snippet");
                Ok(vec![CodeUnit::from_text(label, UnitOrigin::Snippet, text, 0)])
            }
            CodeInput::Diff(text) => {
                let units = parse_unified(text);
                if units.is_empty() {
                    return Err(Error::InvalidInput(
                        "the diff contains no added lines to review".into(),
                    ));
                }
                Ok(units)
            }
            CodeInput::File(path) => {
                let workspace = self.workspace(req)?;
                Ok(vec![self.load_code(&workspace, path)?])
            }
            CodeInput::Files(paths) => {
                if paths.is_empty() {
                    return Err(Error::InvalidInput("no files to review".into()));
                }
                let workspace = self.workspace(req)?;
                let mut units = Vec::with_capacity(paths.len());
                for path in paths {
                    match self.load_code(&workspace, path) {
                        Ok(unit) => units.push(unit),
                        Err(e) if e.kind() == ErrorKind::PathViolation => return Err(e),
                        Err(e) => {
                            warn!(path = %path, error = %e, "skipping code file");
                            warnings.push(Warning::new(Stage::Normalize, path.clone(), e.to_string()));
                        }
                    }
                }
                if units.is_empty() {
                    return Err(Error::InvalidInput(format!(
                        "none of the {} listed files could be read",
                        paths.len()
                    )));
                }
                Ok(units)
            }
        }
    }

    /// Unmasked store over the workspace; code is matched as written.
    fn workspace(&self, req: &ReviewRequest) -> Result<DocumentStore> {
        let root = req
            .workspace_root
            .as_deref()
            .unwrap_or(self.workspace_root.as_path());
        Ok(DocumentStore::new(
            PathGuard::new(root)?,
            Masker::disabled(),
            ReadOptions {
                max_bytes: self.max_code_bytes,
                max_lines: usize::MAX,
                offset: 0,
            },
            0,
        ))
    }

    fn load_code(&self, workspace: &DocumentStore, path: &str) -> Result<CodeUnit> {
        let entry = workspace.entry(path)?;
        if entry.is_dir() {
            return Err(Error::IsADirectory { path: entry.path });
        }
        let size = entry.size_bytes.unwrap_or(0);
        if size > self.max_code_bytes {
            return Err(Error::PayloadTooLarge {
                size,
                limit: self.max_code_bytes,
            });
        }
        let (text, _) = workspace.read_full(&entry.path, self.max_code_bytes)?;
        Ok(CodeUnit::from_text(entry.path, UnitOrigin::File, &text, 0))
    }
}

/// Standards are read masked; a trigger cut from a redacted span would
/// match the placeholder instead of the construct the rule names.
fn drop_masked_triggers(rules: &mut [Rule], masker: &Masker) {
    if masker.is_empty() {
        return;
    }
    for rule in rules {
        rule.triggers.retain(|t| !masker.leaves_placeholder(&t.text));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docvault_core::models::ReviewStatus;
    use std::fs;
    use tempfile::TempDir;

    const STANDARD: &str = "# Security\n\n- Never use `eval()`; use `ast.literal_eval` instead.\n- Do not call `os.system`.\n";

    fn setup() -> (TempDir, Config) {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("Standards")).unwrap();
        fs::write(tmp.path().join("Standards/python.md"), STANDARD).unwrap();
        fs::create_dir_all(tmp.path().join("src")).unwrap();
        fs::write(tmp.path().join("src/app.py"), "import os\nx = eval(data)\nos.system('ls')\n").unwrap();
        fs::write(tmp.path().join("src/ok.py"), "print('fine')\n").unwrap();
        let config = Config::for_root(tmp.path());
        (tmp, config)
    }

    #[test]
    fn file_review_cites_standards() {
        let (_tmp, config) = setup();
        let store = DocumentStore::from_config(&config).unwrap();
        let reviewer = Reviewer::new(&store, &config).unwrap();
        let report = reviewer
            .review(&ReviewRequest::new(CodeInput::File("src/app.py".into())))
            .unwrap();
        assert_eq!(report.status, ReviewStatus::IssuesFound);
        let lines: Vec<usize> = report.findings.iter().map(|f| f.location.line).collect();
        assert_eq!(lines, vec![2, 3]);
        assert_eq!(report.findings[0].citation.document, "Standards/python.md");
        assert!(report.findings[0].suggestion.contains("ast.literal_eval"));
    }

    #[test]
    fn clean_snippet_reports_no_issues() {
        let (_tmp, config) = setup();
        let store = DocumentStore::from_config(&config).unwrap();
        let reviewer = Reviewer::new(&store, &config).unwrap();
        let report = reviewer
            .review(&ReviewRequest::new(CodeInput::Snippet {
                label: None,
                text: "value = literal(data)\n".into(),
            }))
            .unwrap();
        assert_eq!(report.status, ReviewStatus::NoIssuesFound);
        assert_eq!(report.summary.units_reviewed, 1);
    }

    #[test]
    fn missing_file_among_many_is_a_warning() {
        let (_tmp, config) = setup();
        let store = DocumentStore::from_config(&config).unwrap();
        let reviewer = Reviewer::new(&store, &config).unwrap();
        let req = ReviewRequest::new(CodeInput::Files(vec![
            "src/gone.py".into(),
            "src/app.py".into(),
        ]));
        let report = reviewer.review(&req).unwrap();
        assert_eq!(report.findings.len(), 2);
        assert!(report
            .warnings
            .iter()
            .any(|w| w.stage == Stage::Normalize && w.subject == "src/gone.py"));
    }

    #[test]
    fn single_missing_file_is_fatal() {
        let (_tmp, config) = setup();
        let store = DocumentStore::from_config(&config).unwrap();
        let reviewer = Reviewer::new(&store, &config).unwrap();
        let err = reviewer
            .review(&ReviewRequest::new(CodeInput::File("src/gone.py".into())))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn standards_without_rules_are_unavailable() {
        let (tmp, config) = setup();
        fs::write(tmp.path().join("Standards/python.md"), "# Notes\n\nJust prose.\n").unwrap();
        let store = DocumentStore::from_config(&config).unwrap();
        let reviewer = Reviewer::new(&store, &config).unwrap();
        let err = reviewer
            .review(&ReviewRequest::new(CodeInput::Snippet {
                label: None,
                text: "eval(x)".into(),
            }))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StandardsUnavailable);
    }

    #[test]
    fn diff_review_uses_post_change_lines() {
        let (_tmp, config) = setup();
        let store = DocumentStore::from_config(&config).unwrap();
        let reviewer = Reviewer::new(&store, &config).unwrap();
        let diff = "--- a/x.py\n+++ b/x.py\n@@ -4,1 +4,2 @@\n keep = 1\n+y = eval(z)\n";
        let report = reviewer
            .review(&ReviewRequest::new(CodeInput::Diff(diff.into())))
            .unwrap();
        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.findings[0].location.file, "x.py");
        assert_eq!(report.findings[0].location.line, 5);
    }

    #[test]
    fn masked_standards_do_not_trigger_on_placeholders() {
        let (tmp, mut config) = setup();
        fs::write(
            tmp.path().join("Standards/secrets.md"),
            "# Secrets\n\n- Never hardcode `password` in source.\n",
        )
        .unwrap();
        config.mask.enabled = true;
        config.mask.keywords = vec!["password".into()];
        let store = DocumentStore::from_config(&config).unwrap();
        let reviewer = Reviewer::new(&store, &config).unwrap();

        let checklist = reviewer.checklist(&[]).unwrap();
        assert!(checklist
            .rules
            .iter()
            .flat_map(|r| r.triggers.iter())
            .all(|t| !t.text.contains("***")));

        let report = reviewer
            .review(&ReviewRequest::new(CodeInput::Snippet {
                label: None,
                text: "print('***')\n".into(),
            }))
            .unwrap();
        assert_eq!(report.status, ReviewStatus::NoIssuesFound);
    }

    #[test]
    fn checklist_lists_rules() {
        let (_tmp, config) = setup();
        let store = DocumentStore::from_config(&config).unwrap();
        let reviewer = Reviewer::new(&store, &config).unwrap();
        let checklist = reviewer.checklist(&[]).unwrap();
        assert_eq!(checklist.rules.len(), 2);
        assert_eq!(checklist.documents, vec!["Standards/python.md"]);
        assert_eq!(checklist.by_severity.get("error"), Some(&2));
    }
}
