//! TOML configuration.
//!
//! A [`Config`] is an immutable snapshot: it is loaded once per invocation
//! and handed to each component's constructor. Nothing in the crate keeps
//! configuration in global state, so tests can build several independent
//! sandboxes in one process with [`Config::for_root`].
//!
//! ```toml
//! [repository]
//! root = "/srv/shared"
//!
//! [read]
//! max_bytes = 262144
//! max_lines = 4000
//!
//! [upload]
//! max_bytes = 10485760
//! conflict = "rename"
//!
//! [mask]
//! enabled = true
//! keywords = ["internal-only"]
//!
//! [[mask.rules]]
//! pattern = "(?i)password\\s*=\\s*\\S+"
//! placeholder = "password=***"
//!
//! [search]
//! top_k = 10
//! exclude_globs = ["**/node_modules/**"]
//!
//! [standards]
//! paths = ["Standards"]
//!
//! [review]
//! deadline_secs = 60
//! ```

use anyhow::{bail, Context, Result};
use docvault_core::mask::{MaskPattern, MaskRule, Masker};
use docvault_core::models::ConflictPolicy;
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub repository: RepositoryConfig,
    #[serde(default)]
    pub read: ReadConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub mask: MaskConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub standards: StandardsConfig,
    #[serde(default)]
    pub review: ReviewConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryConfig {
    pub root: PathBuf,
    /// Accept absolute paths that already point inside the root.
    #[serde(default)]
    pub accept_absolute_inside_root: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadConfig {
    #[serde(default = "default_read_max_bytes")]
    pub max_bytes: u64,
    #[serde(default = "default_read_max_lines")]
    pub max_lines: usize,
}

impl Default for ReadConfig {
    fn default() -> Self {
        Self {
            max_bytes: default_read_max_bytes(),
            max_lines: default_read_max_lines(),
        }
    }
}

fn default_read_max_bytes() -> u64 {
    256 * 1024
}
fn default_read_max_lines() -> usize {
    4000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    #[serde(default = "default_upload_max_bytes")]
    pub max_bytes: u64,
    #[serde(default)]
    pub conflict: ConflictPolicy,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_bytes: default_upload_max_bytes(),
            conflict: ConflictPolicy::default(),
        }
    }
}

fn default_upload_max_bytes() -> u64 {
    10 * 1024 * 1024
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaskConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_placeholder")]
    pub placeholder: String,
    /// Literal, case-insensitive keywords applied after `rules`.
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub rules: Vec<MaskRuleConfig>,
}

impl Default for MaskConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            placeholder: default_placeholder(),
            keywords: Vec::new(),
            rules: Vec::new(),
        }
    }
}

fn default_placeholder() -> String {
    "***".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaskRuleConfig {
    pub pattern: String,
    #[serde(default)]
    pub placeholder: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Files above this size are matched by name only.
    #[serde(default = "default_search_max_file_bytes")]
    pub max_file_bytes: u64,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default = "default_search_deadline")]
    pub deadline_secs: Option<u64>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            max_file_bytes: default_search_max_file_bytes(),
            exclude_globs: Vec::new(),
            deadline_secs: default_search_deadline(),
        }
    }
}

fn default_top_k() -> usize {
    10
}
fn default_search_max_file_bytes() -> u64 {
    1024 * 1024
}
fn default_search_deadline() -> Option<u64> {
    Some(30)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardsConfig {
    /// Root-relative locations searched recursively, in order.
    #[serde(default = "default_standards_paths")]
    pub paths: Vec<String>,
    /// Name hints used when `locate_by_keywords` is set.
    #[serde(default = "default_standards_keywords")]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub locate_by_keywords: bool,
    #[serde(default = "default_standards_extensions")]
    pub extensions: Vec<String>,
    #[serde(default = "default_standards_max_document_bytes")]
    pub max_document_bytes: u64,
    #[serde(default = "default_standards_max_documents")]
    pub max_documents: usize,
}

impl Default for StandardsConfig {
    fn default() -> Self {
        Self {
            paths: default_standards_paths(),
            keywords: default_standards_keywords(),
            locate_by_keywords: false,
            extensions: default_standards_extensions(),
            max_document_bytes: default_standards_max_document_bytes(),
            max_documents: default_standards_max_documents(),
        }
    }
}

fn default_standards_paths() -> Vec<String> {
    ["规范", "规范文档", "Standards", "Guidelines", "Docs/Standards"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_standards_keywords() -> Vec<String> {
    ["Standard", "Guideline", "Convention", "规范"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_standards_extensions() -> Vec<String> {
    ["md", "markdown", "txt", "rst"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_standards_max_document_bytes() -> u64 {
    512 * 1024
}
fn default_standards_max_documents() -> usize {
    200
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewConfig {
    /// Root for code file inputs; defaults to the repository root.
    #[serde(default)]
    pub workspace_root: Option<PathBuf>,
    #[serde(default = "default_review_max_code_bytes")]
    pub max_code_bytes: u64,
    #[serde(default = "default_review_deadline")]
    pub deadline_secs: Option<u64>,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            workspace_root: None,
            max_code_bytes: default_review_max_code_bytes(),
            deadline_secs: default_review_deadline(),
        }
    }
}

fn default_review_max_code_bytes() -> u64 {
    1024 * 1024
}
fn default_review_deadline() -> Option<u64> {
    Some(60)
}

impl Config {
    /// A default snapshot for `root`.
    pub fn for_root(root: impl Into<PathBuf>) -> Self {
        Self {
            repository: RepositoryConfig {
                root: root.into(),
                accept_absolute_inside_root: false,
            },
            read: ReadConfig::default(),
            upload: UploadConfig::default(),
            mask: MaskConfig::default(),
            search: SearchConfig::default(),
            standards: StandardsConfig::default(),
            review: ReviewConfig::default(),
        }
    }

    /// Ordered mask rules: regex rules first, then keywords.
    pub fn mask_rules(&self) -> Vec<MaskRule> {
        if !self.mask.enabled {
            return Vec::new();
        }
        let regexes = self.mask.rules.iter().map(|r| MaskRule {
            pattern: MaskPattern::Regex(r.pattern.clone()),
            placeholder: r
                .placeholder
                .clone()
                .unwrap_or_else(|| self.mask.placeholder.clone()),
        });
        let keywords = self.mask.keywords.iter().map(|k| MaskRule {
            pattern: MaskPattern::Keyword(k.clone()),
            placeholder: self.mask.placeholder.clone(),
        });
        regexes.chain(keywords).collect()
    }

    pub fn masker(&self) -> docvault_core::Result<Masker> {
        Masker::new(&self.mask_rules())
    }

    pub fn exclude_set(&self) -> Result<GlobSet> {
        let mut patterns = vec!["**/.git".to_string(), "**/.git/**".to_string()];
        patterns.extend(self.search.exclude_globs.iter().cloned());
        build_globset(&patterns)
    }

    pub fn search_deadline(&self) -> Option<Duration> {
        self.search.deadline_secs.map(Duration::from_secs)
    }

    pub fn review_deadline(&self) -> Option<Duration> {
        self.review.deadline_secs.map(Duration::from_secs)
    }

    /// Workspace for code file inputs.
    pub fn workspace_root(&self) -> &Path {
        self.review
            .workspace_root
            .as_deref()
            .unwrap_or(&self.repository.root)
    }
}

pub fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern).with_context(|| format!("Invalid glob: {}", pattern))?);
    }
    Ok(builder.build()?)
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    if config.repository.root.as_os_str().is_empty() {
        bail!("repository.root must be set");
    }
    if config.read.max_bytes == 0 {
        bail!("read.max_bytes must be > 0");
    }
    if config.read.max_lines == 0 {
        bail!("read.max_lines must be > 0");
    }
    if config.upload.max_bytes == 0 {
        bail!("upload.max_bytes must be > 0");
    }
    if config.search.top_k == 0 {
        bail!("search.top_k must be >= 1");
    }
    if config.standards.max_document_bytes == 0 {
        bail!("standards.max_document_bytes must be > 0");
    }
    if config.standards.max_documents == 0 {
        bail!("standards.max_documents must be >= 1");
    }
    if config.review.max_code_bytes == 0 {
        bail!("review.max_code_bytes must be > 0");
    }
    config.exclude_set()?;
    config
        .masker()
        .with_context(|| "Invalid mask configuration")?;
    Ok(())
}

/// Write `config` back to `path`, creating parent directories.
pub fn save_config(path: &Path, config: &Config) -> Result<()> {
    let body = toml::to_string_pretty(config).with_context(|| "Failed to serialize config")?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, body)
        .with_context(|| format!("Failed to write config file: {}", path.display()))
}

/// Re-set the repository root in the config file at `path`. Other settings
/// are kept; a missing file is created with defaults. The root directory is
/// created when absent.
pub fn set_root(path: &Path, root: &Path) -> Result<Config> {
    let mut config = if path.exists() {
        load_config(path)?
    } else {
        Config::for_root(root)
    };
    std::fs::create_dir_all(root)
        .with_context(|| format!("Failed to create repository root: {}", root.display()))?;
    config.repository.root = root
        .canonicalize()
        .with_context(|| format!("Failed to resolve repository root: {}", root.display()))?;
    save_config(path, &config)?;
    Ok(config)
}
