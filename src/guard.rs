//! Sandbox boundary for every filesystem access.
//!
//! Lexical checks (`..` escapes, absolute inputs, drive prefixes) happen in
//! [`docvault_core::path`]. This module adds the filesystem half: the
//! deepest existing ancestor of a resolved path is canonicalized, so a
//! symbolic link inside the root cannot lead outside it.

use std::path::{Component, Path, PathBuf};

use docvault_core::path::{join, normalize_relative};
use docvault_core::{Error, Result};

/// A request path after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// Root-relative, `/`-separated, `"."` for the root.
    pub rel: String,
    pub abs: PathBuf,
}

#[derive(Debug, Clone)]
pub struct PathGuard {
    root: PathBuf,
    root_real: PathBuf,
    accept_absolute: bool,
}

impl PathGuard {
    /// Guard `root`, which must be an existing directory.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = absolutize(root.as_ref());
        let root_real = root.canonicalize().map_err(|_| {
            Error::InvalidInput("repository root does not exist or cannot be resolved".into())
        })?;
        if !root_real.is_dir() {
            return Err(Error::InvalidInput(
                "repository root is not a directory".into(),
            ));
        }
        Ok(Self {
            root,
            root_real,
            accept_absolute: false,
        })
    }

    /// Accept absolute inputs that already point inside the root.
    pub fn with_absolute_inside_root(mut self, accept: bool) -> Self {
        self.accept_absolute = accept;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root_real
    }

    pub fn resolve(&self, input: &str) -> Result<Resolved> {
        let relative = self.strip_absolute(input);
        let parts = normalize_relative(relative.as_deref().unwrap_or(input))?;
        let rel = join(&parts);
        let mut abs = self.root_real.clone();
        abs.extend(&parts);

        let anchor = abs
            .ancestors()
            .find(|p| p.exists())
            .unwrap_or(self.root_real.as_path());
        let real = anchor
            .canonicalize()
            .map_err(|e| Error::from_io(rel.clone(), e))?;
        if !starts_with_root(&real, &self.root_real) {
            return Err(Error::violation(
                rel,
                "resolves outside the repository root through a symbolic link",
            ));
        }
        Ok(Resolved { rel, abs })
    }

    /// Root-relative form of an absolute path under the root.
    pub fn relative(&self, abs: &Path) -> Option<String> {
        let rest = abs
            .strip_prefix(&self.root_real)
            .or_else(|_| abs.strip_prefix(&self.root))
            .ok()?;
        let parts: Vec<String> = rest
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        Some(join(&parts))
    }

    /// The deepest existing directory on the way to `input`, for hints.
    pub fn nearest_existing_parent(&self, input: &str) -> Option<String> {
        let mut parts = normalize_relative(input).ok()?;
        while parts.pop().is_some() {
            let mut candidate = self.root_real.clone();
            candidate.extend(&parts);
            if candidate.is_dir() {
                return Some(join(&parts));
            }
        }
        None
    }

    fn strip_absolute(&self, input: &str) -> Option<String> {
        if !self.accept_absolute {
            return None;
        }
        let path = Path::new(input.trim());
        if !path.is_absolute() {
            return None;
        }
        self.relative(path)
    }
}

fn absolutize(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(_) => path.to_path_buf(),
    }
}

#[cfg(windows)]
fn starts_with_root(path: &Path, root: &Path) -> bool {
    let path = path.to_string_lossy().to_lowercase();
    let root = root.to_string_lossy().to_lowercase();
    let root = root.trim_end_matches('\\');
    path == root || path.starts_with(&format!("{}\\", root))
}

#[cfg(not(windows))]
fn starts_with_root(path: &Path, root: &Path) -> bool {
    path.starts_with(root)
}
