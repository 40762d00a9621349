//! On-demand search over names and content.
//!
//! No index is kept between invocations. Each search walks the requested
//! subtree, scores every file with [`docvault_core::scoring::score_file`],
//! and keeps the best `top_k` in a bounded heap. Binary, oversize, or
//! unreadable files still take part in name matching; their hits say why
//! the content was not searched.

use std::fs;

use globset::GlobSet;
use serde::Serialize;
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use docvault_core::budget::Deadline;
use docvault_core::models::{SearchHit, SearchMode, Stage, Warning};
use docvault_core::query::Terms;
use docvault_core::scoring::{score_file, TopK};
use docvault_core::{Error, Result};

use crate::config::Config;
use crate::store::{format_modified, looks_binary, DocumentStore};

#[derive(Debug, Clone, Default)]
pub struct SearchRequest {
    pub query: Option<String>,
    pub keywords: Vec<String>,
    /// Root-relative directory; the repository root when `None`.
    pub dir: Option<String>,
    pub top_k: Option<usize>,
    pub name_only: bool,
}

#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub top_k: usize,
    pub max_file_bytes: u64,
    pub exclude: GlobSet,
    pub deadline: Option<std::time::Duration>,
}

impl SearchOptions {
    pub fn from_config(config: &Config) -> Result<Self> {
        let exclude = config
            .exclude_set()
            .map_err(|e| Error::InvalidInput(format!("{:#}", e)))?;
        Ok(Self {
            top_k: config.search.top_k,
            max_file_bytes: config.search.max_file_bytes,
            exclude,
            deadline: config.search_deadline(),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub dir: String,
    pub mode: SearchMode,
    pub terms: Vec<String>,
    /// Matches found before the `top_k` cut.
    pub total_found: usize,
    pub hits: Vec<SearchHit>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Warning>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

pub struct SearchEngine<'a> {
    store: &'a DocumentStore,
    options: SearchOptions,
}

impl<'a> SearchEngine<'a> {
    pub fn new(store: &'a DocumentStore, options: SearchOptions) -> Self {
        Self { store, options }
    }

    pub fn search(&self, req: &SearchRequest) -> Result<SearchResponse> {
        let top_k = req.top_k.unwrap_or(self.options.top_k);
        if top_k == 0 {
            return Err(Error::InvalidInput("top_k must be at least 1".into()));
        }
        let dir = self.store.entry(req.dir.as_deref().unwrap_or("."))?;
        if !dir.is_dir() {
            return Err(Error::NotADirectory { path: dir.path });
        }

        let terms = Terms::from_request(&req.keywords, req.query.as_deref());
        let mut response = SearchResponse {
            dir: dir.path.clone(),
            mode: terms.mode,
            terms: terms.terms.clone(),
            total_found: 0,
            hits: Vec::new(),
            warnings: Vec::new(),
            suggestions: Vec::new(),
        };
        if terms.is_empty() {
            response
                .suggestions
                .push("Provide a query or --keywords to search for".into());
            return Ok(response);
        }

        let deadline = Deadline::new("search", self.options.deadline);
        let mut top = TopK::new(top_k);
        let guard = self.store.guard();
        let mut base = guard.root().to_path_buf();
        if dir.path != "." {
            base.extend(dir.path.split('/'));
        }

        let walker = WalkDir::new(&base)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !self.excluded(e));

        for entry in walker {
            deadline.check()?;
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let subject = e
                        .path()
                        .and_then(|p| guard.relative(p))
                        .unwrap_or_else(|| dir.path.clone());
                    warn!(path = %subject, error = %e, "search skipped an unreadable node");
                    response
                        .warnings
                        .push(Warning::new(Stage::Search, subject, e.to_string()));
                    continue;
                }
            };
            if entry.file_type().is_dir() {
                continue;
            }
            let Some(rel) = guard.relative(entry.path()) else {
                continue;
            };
            if entry.path_is_symlink() && guard.resolve(&rel).is_err() {
                response.warnings.push(Warning::new(
                    Stage::Search,
                    rel,
                    "symbolic link points outside the repository root; skipped",
                ));
                continue;
            }
            let meta = match fs::metadata(entry.path()) {
                Ok(meta) => meta,
                Err(e) => {
                    response
                        .warnings
                        .push(Warning::new(Stage::Search, rel, e.to_string()));
                    continue;
                }
            };
            if !meta.is_file() {
                continue;
            }

            let (content, skip_reason) = if req.name_only {
                (None, None)
            } else {
                self.load_content(&entry, meta.len())
            };
            let Some(scored) = score_file(&terms, &rel, content.as_deref()) else {
                continue;
            };
            top.push(SearchHit {
                name: entry.file_name().to_string_lossy().into_owned(),
                depth: rel.matches('/').count(),
                match_kind: scored.match_kind,
                score: scored.score,
                size_bytes: Some(meta.len()),
                modified: format_modified(&meta),
                matched_terms: scored.matched_terms,
                snippets: scored.snippets,
                content_searched: content.is_some(),
                skip_reason,
                path: rel,
            });
        }

        response.total_found = top.seen();
        response.hits = top.into_sorted();
        if response.hits.is_empty() {
            response.suggestions = no_result_suggestions(req);
        }
        debug!(
            dir = %response.dir,
            found = response.total_found,
            returned = response.hits.len(),
            elapsed_ms = deadline.elapsed().as_millis() as u64,
            "search finished"
        );
        Ok(response)
    }

    fn excluded(&self, entry: &DirEntry) -> bool {
        self.store
            .guard()
            .relative(entry.path())
            .is_some_and(|rel| self.options.exclude.is_match(&rel))
    }

    /// Masked text, or the reason content search was skipped.
    fn load_content(&self, entry: &DirEntry, size: u64) -> (Option<String>, Option<String>) {
        if size > self.options.max_file_bytes {
            return (
                None,
                Some(format!(
                    "larger than {} bytes; matched by name only",
                    self.options.max_file_bytes
                )),
            );
        }
        let bytes = match fs::read(entry.path()) {
            Ok(bytes) => bytes,
            Err(e) => return (None, Some(format!("unreadable: {}", e))),
        };
        if looks_binary(&bytes[..bytes.len().min(8 * 1024)]) {
            return (None, Some("binary content".into()));
        }
        let text = String::from_utf8_lossy(&bytes);
        let masked = self.store.masker().apply(&text).text.into_owned();
        (Some(masked), None)
    }
}

fn no_result_suggestions(req: &SearchRequest) -> Vec<String> {
    let mut out = vec![
        "Try more general keywords".to_string(),
        "Check the spelling of the search terms".to_string(),
    ];
    if req.dir.is_some() {
        out.push("Search from the repository root instead of a subdirectory".into());
    } else {
        out.push("Narrow or change the directory with --dir".into());
    }
    if req.name_only {
        out.push("Drop --name-only to search file contents too".into());
    }
    out
}
