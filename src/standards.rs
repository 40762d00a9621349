//! Locating and loading the standards corpus.
//!
//! Each configured location is walked with an explicit stack over
//! [`DocumentStore::list`], so one unreadable subtree only costs a warning.
//! Documents are read whole up to a generous cap. A corpus with no
//! readable documents is [`Error::StandardsUnavailable`].

use std::collections::BTreeSet;
use std::path::Path;

use globset::GlobSet;
use serde::Serialize;
use tracing::{debug, warn};

use docvault_core::budget::Deadline;
use docvault_core::models::{DocumentEntry, Stage, StandardDocument, Warning};
use docvault_core::{Error, ErrorKind, Result};

use crate::config::Config;
use crate::search::{SearchEngine, SearchOptions, SearchRequest};
use crate::store::DocumentStore;

#[derive(Debug, Clone)]
pub struct StandardsOptions {
    pub paths: Vec<String>,
    pub keywords: Vec<String>,
    pub locate_by_keywords: bool,
    /// Lowercase extensions without the dot; empty accepts every file.
    pub extensions: Vec<String>,
    pub max_document_bytes: u64,
    pub max_documents: usize,
    pub exclude: GlobSet,
}

impl StandardsOptions {
    pub fn from_config(config: &Config) -> Result<Self> {
        let exclude = config
            .exclude_set()
            .map_err(|e| Error::InvalidInput(format!("{:#}", e)))?;
        Ok(Self {
            paths: config.standards.paths.clone(),
            keywords: config.standards.keywords.clone(),
            locate_by_keywords: config.standards.locate_by_keywords,
            extensions: config
                .standards
                .extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
            max_document_bytes: config.standards.max_document_bytes,
            max_documents: config.standards.max_documents,
            exclude,
        })
    }

    fn accepts(&self, name: &str) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        Path::new(name)
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .is_some_and(|e| self.extensions.contains(&e))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StandardsCorpus {
    pub documents: Vec<StandardDocument>,
    /// Locations that existed and were walked.
    pub searched: Vec<String>,
    /// Locations that did not exist.
    pub missing: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Warning>,
}

/// Load every standards document. `overrides`, when non-empty, replaces the
/// configured locations.
pub fn load_standards(
    store: &DocumentStore,
    opts: &StandardsOptions,
    overrides: &[String],
    deadline: &Deadline,
) -> Result<StandardsCorpus> {
    let locations: Vec<String> = if overrides.is_empty() {
        opts.paths.clone()
    } else {
        overrides.to_vec()
    };
    let mut corpus = StandardsCorpus {
        documents: Vec::new(),
        searched: Vec::new(),
        missing: Vec::new(),
        warnings: Vec::new(),
    };
    let mut candidates: Vec<DocumentEntry> = Vec::new();
    let mut seen = BTreeSet::new();

    for location in &locations {
        let root = match store.entry(location) {
            Ok(entry) => entry,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                corpus.missing.push(location.clone());
                continue;
            }
            Err(e @ Error::PathViolation { .. }) => return Err(e),
            Err(e) => {
                corpus
                    .warnings
                    .push(Warning::new(Stage::Load, location.clone(), e.to_string()));
                continue;
            }
        };
        corpus.searched.push(root.path.clone());
        if !root.is_dir() {
            if seen.insert(root.path.clone()) {
                candidates.push(root);
            }
            continue;
        }

        let mut stack = vec![root.path];
        while let Some(dir) = stack.pop() {
            deadline.check()?;
            let listing = match store.list(&dir) {
                Ok(listing) => listing,
                Err(e) => {
                    warn!(path = %dir, error = %e, "skipping unreadable standards directory");
                    corpus
                        .warnings
                        .push(Warning::new(Stage::Load, dir, e.to_string()));
                    continue;
                }
            };
            corpus.warnings.extend(listing.warnings);
            let mut subdirs = Vec::new();
            for entry in listing.entries {
                if opts.exclude.is_match(&entry.path) {
                    continue;
                }
                if entry.is_dir() {
                    subdirs.push(entry.path);
                } else if opts.accepts(&entry.name) && seen.insert(entry.path.clone()) {
                    candidates.push(entry);
                }
            }
            stack.extend(subdirs.into_iter().rev());
        }
    }

    if candidates.is_empty() && overrides.is_empty() && opts.locate_by_keywords {
        candidates = locate_by_keywords(store, opts, &mut corpus)?;
    }

    if candidates.len() > opts.max_documents {
        corpus.warnings.push(Warning::new(
            Stage::Load,
            locations.join(", "),
            format!(
                "{} standards documents found; only the first {} were loaded",
                candidates.len(),
                opts.max_documents
            ),
        ));
        candidates.truncate(opts.max_documents);
    }

    for entry in candidates {
        deadline.check()?;
        match store.read_full(&entry.path, opts.max_document_bytes) {
            Ok((text, truncated)) => corpus.documents.push(StandardDocument {
                entry,
                text,
                truncated,
            }),
            Err(e) => {
                warn!(path = %entry.path, error = %e, "skipping unreadable standards document");
                corpus
                    .warnings
                    .push(Warning::new(Stage::Load, entry.path, e.to_string()));
            }
        }
    }

    if corpus.documents.is_empty() {
        let reason = if corpus.searched.is_empty() {
            "no such location in the repository"
        } else {
            "no readable standards documents found"
        };
        return Err(Error::StandardsUnavailable {
            location: locations.join(", "),
            reason: reason.into(),
        });
    }
    debug!(
        documents = corpus.documents.len(),
        searched = ?corpus.searched,
        "loaded standards corpus"
    );
    Ok(corpus)
}

/// Name-only search for the keyword hints across the whole repository.
fn locate_by_keywords(
    store: &DocumentStore,
    opts: &StandardsOptions,
    corpus: &mut StandardsCorpus,
) -> Result<Vec<DocumentEntry>> {
    let search = SearchOptions {
        top_k: opts.max_documents.max(1),
        max_file_bytes: 0,
        exclude: opts.exclude.clone(),
        deadline: None,
    };
    let req = SearchRequest {
        keywords: opts.keywords.clone(),
        name_only: true,
        ..SearchRequest::default()
    };
    let response = SearchEngine::new(store, search).search(&req)?;
    corpus.searched.push(format!("keywords: {}", opts.keywords.join(", ")));
    corpus.warnings.extend(response.warnings);

    let mut out = Vec::new();
    for hit in response.hits.into_iter().filter(|h| opts.accepts(&h.name)) {
        match store.entry(&hit.path) {
            Ok(entry) => out.push(entry),
            Err(e) => corpus
                .warnings
                .push(Warning::new(Stage::Load, hit.path, e.to_string())),
        }
    }
    // Search order is by relevance; the corpus is in path order.
    out.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(out)
}
