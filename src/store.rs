//! List, read, and write primitives over the sandboxed root.
//!
//! Every entry point resolves its path through the [`PathGuard`] first.
//! Reads are bounded and masked; hitting a bound sets `truncated` instead
//! of failing. Writes land in a temporary file next to the destination and
//! are moved into place with a single rename, so a reader never sees a
//! partial document under the destination name.

use std::fs::{self, File, Metadata};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::DateTime;
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use docvault_core::mask::Masker;
use docvault_core::models::{
    ConflictPolicy, DocumentEntry, EntryKind, Listing, ReadResult, Stage, Warning, WriteReceipt,
};
use docvault_core::{Error, Result};

use crate::config::Config;
use crate::guard::{PathGuard, Resolved};

/// Bytes sampled for NUL detection.
const BINARY_SNIFF_BYTES: usize = 8 * 1024;
/// Upper bound on `name (n).ext` probes before giving up.
const MAX_RENAME_ATTEMPTS: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOptions {
    pub max_bytes: u64,
    pub max_lines: usize,
    /// Lines to skip before reading; 0 reads from the top.
    pub offset: usize,
}

#[derive(Debug, Clone)]
pub struct DocumentStore {
    guard: PathGuard,
    masker: Masker,
    read_defaults: ReadOptions,
    upload_max_bytes: u64,
}

impl DocumentStore {
    pub fn new(
        guard: PathGuard,
        masker: Masker,
        read_defaults: ReadOptions,
        upload_max_bytes: u64,
    ) -> Self {
        Self {
            guard,
            masker,
            read_defaults,
            upload_max_bytes,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let guard = PathGuard::new(&config.repository.root)?
            .with_absolute_inside_root(config.repository.accept_absolute_inside_root);
        Ok(Self::new(
            guard,
            config.masker()?,
            ReadOptions {
                max_bytes: config.read.max_bytes,
                max_lines: config.read.max_lines,
                offset: 0,
            },
            config.upload.max_bytes,
        ))
    }

    pub fn guard(&self) -> &PathGuard {
        &self.guard
    }

    pub fn masker(&self) -> &Masker {
        &self.masker
    }

    pub fn read_defaults(&self) -> ReadOptions {
        self.read_defaults
    }

    pub fn upload_max_bytes(&self) -> u64 {
        self.upload_max_bytes
    }

    /// Metadata for one node.
    pub fn entry(&self, rel: &str) -> Result<DocumentEntry> {
        let resolved = self.guard.resolve(rel)?;
        let meta = fs::metadata(&resolved.abs).map_err(|e| self.io_error(&resolved.rel, e))?;
        Ok(entry_from(&resolved.rel, &meta))
    }

    /// Directories first, then files, each group in byte order of the name.
    pub fn list(&self, rel_dir: &str) -> Result<Listing> {
        let resolved = self.guard.resolve(rel_dir)?;
        let meta = fs::metadata(&resolved.abs).map_err(|e| self.io_error(&resolved.rel, e))?;
        if !meta.is_dir() {
            return Err(Error::NotADirectory { path: resolved.rel });
        }

        let read_dir = fs::read_dir(&resolved.abs).map_err(|e| self.io_error(&resolved.rel, e))?;
        let mut entries = Vec::new();
        let mut warnings = Vec::new();
        for item in read_dir {
            let item = match item {
                Ok(item) => item,
                Err(e) => {
                    warnings.push(Warning::new(Stage::List, resolved.rel.clone(), e.to_string()));
                    continue;
                }
            };
            let name = item.file_name().to_string_lossy().into_owned();
            let child = child_path(&resolved.rel, &name);

            let is_link = item.file_type().map(|t| t.is_symlink()).unwrap_or(false);
            if is_link && self.guard.resolve(&child).is_err() {
                warn!(path = %child, "skipping symbolic link that leaves the repository root");
                warnings.push(Warning::new(
                    Stage::List,
                    child,
                    "symbolic link points outside the repository root; skipped",
                ));
                continue;
            }

            match fs::metadata(item.path()) {
                Ok(meta) => entries.push(entry_from(&child, &meta)),
                Err(e) => warnings.push(Warning::new(Stage::List, child, e.to_string())),
            }
        }

        entries.sort_by(|a, b| {
            b.is_dir()
                .cmp(&a.is_dir())
                .then_with(|| a.name.as_bytes().cmp(b.name.as_bytes()))
        });
        debug!(path = %resolved.rel, entries = entries.len(), "listed directory");
        Ok(Listing {
            path: resolved.rel,
            entries,
            warnings,
        })
    }

    /// Bounded, masked read. The whole document is masked before the
    /// window is cut, so a match never straddles a bound or a page.
    /// `content` never exceeds `opts.max_bytes`.
    pub fn read(&self, rel: &str, opts: ReadOptions) -> Result<ReadResult> {
        let (resolved, meta, mut file) = self.open_text(rel)?;
        let rel = resolved.rel;

        let mut bytes = Vec::with_capacity(meta.len() as usize);
        file.read_to_end(&mut bytes)
            .map_err(|e| Error::from_io(rel.clone(), e))?;
        let text = String::from_utf8_lossy(&bytes);
        let masked = self.masker.apply(&text);

        let mut out = String::new();
        let mut total_lines = 0;
        let mut full_lines = 0;
        let mut read_lines = 0;
        let mut truncated = false;

        for line in masked.text.split_inclusive('\n') {
            total_lines += 1;
            if total_lines <= opts.offset || truncated {
                continue;
            }
            if read_lines >= opts.max_lines {
                truncated = true;
                continue;
            }
            let room = opts.max_bytes.saturating_sub(out.len() as u64) as usize;
            if line.len() > room {
                let cut = str_floor(line, room);
                if cut > 0 {
                    out.push_str(&line[..cut]);
                    read_lines += 1;
                }
                truncated = true;
                continue;
            }
            out.push_str(line);
            read_lines += 1;
            full_lines += 1;
        }

        // Always advance by at least one line.
        let resumed_at = opts.offset + full_lines.max(1);
        let next_offset = (truncated && resumed_at < total_lines).then_some(resumed_at);
        debug!(path = %rel, bytes = out.len(), truncated, "read document");
        Ok(ReadResult {
            read_bytes: out.len() as u64,
            content: out,
            truncated,
            read_lines,
            total_bytes: meta.len(),
            total_lines,
            start_line: opts.offset + 1,
            next_offset,
            modified: format_modified(&meta),
            redactions: masked.redactions,
            path: rel,
        })
    }

    /// Whole-document read up to `cap` bytes, masked. Returns the text and
    /// whether the cap was hit.
    pub fn read_full(&self, rel: &str, cap: u64) -> Result<(String, bool)> {
        let (resolved, meta, file) = self.open_text(rel)?;
        let mut bytes = Vec::with_capacity(meta.len().min(cap) as usize);
        file.take(cap)
            .read_to_end(&mut bytes)
            .map_err(|e| Error::from_io(resolved.rel.clone(), e))?;
        let truncated = meta.len() > cap;
        if let Err(e) = std::str::from_utf8(&bytes) {
            // Drop a multi-byte sequence split by the cap.
            if truncated && e.error_len().is_none() {
                bytes.truncate(e.valid_up_to());
            }
        }
        let text = String::from_utf8_lossy(&bytes);
        let masked = self.masker.apply(&text).text.into_owned();
        Ok((masked, truncated))
    }

    /// Store `bytes` at `rel`. Size and path checks run before anything
    /// touches the disk.
    pub fn write(&self, rel: &str, bytes: &[u8], policy: ConflictPolicy) -> Result<WriteReceipt> {
        let size = bytes.len() as u64;
        if size > self.upload_max_bytes {
            return Err(Error::PayloadTooLarge {
                size,
                limit: self.upload_max_bytes,
            });
        }
        let resolved = self.guard.resolve(rel)?;
        if resolved.rel == "." || resolved.abs.is_dir() {
            return Err(Error::IsADirectory { path: resolved.rel });
        }
        let parent = resolved
            .abs
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.guard.root().to_path_buf());
        let parent_rel = parent_rel(&resolved.rel);
        let storage = |e: std::io::Error| Error::Storage {
            path: resolved.rel.clone(),
            source: e,
        };

        fs::create_dir_all(&parent).map_err(storage)?;
        let mut tmp = NamedTempFile::new_in(&parent).map_err(storage)?;
        tmp.write_all(bytes).map_err(storage)?;
        tmp.as_file().sync_all().map_err(storage)?;

        let (final_abs, renamed) = match policy {
            ConflictPolicy::Overwrite => {
                tmp.persist(&resolved.abs).map_err(|e| storage(e.error))?;
                (resolved.abs.clone(), false)
            }
            ConflictPolicy::Rename => persist_renamed(tmp, &resolved).map_err(storage)?,
        };

        let name = final_abs
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let path = child_path(&parent_rel, &name);
        let modified = fs::metadata(&final_abs)
            .ok()
            .and_then(|m| format_modified(&m));
        info!(path = %path, bytes = size, %policy, renamed, "document written");
        Ok(WriteReceipt {
            path,
            requested: resolved.rel,
            policy,
            renamed,
            size_bytes: size,
            sha256: hex::encode(Sha256::digest(bytes)),
            modified,
        })
    }

    /// Upload a local file. The source is stat'ed first so an oversize
    /// payload is rejected without being read.
    pub fn upload_file(
        &self,
        rel: &str,
        source: &Path,
        policy: ConflictPolicy,
    ) -> Result<WriteReceipt> {
        let label = source.display().to_string();
        let meta = fs::metadata(source).map_err(|e| Error::from_io(label.clone(), e))?;
        if meta.is_dir() {
            return Err(Error::IsADirectory { path: label });
        }
        if meta.len() > self.upload_max_bytes {
            return Err(Error::PayloadTooLarge {
                size: meta.len(),
                limit: self.upload_max_bytes,
            });
        }
        let bytes = fs::read(source).map_err(|e| Error::from_io(label, e))?;
        self.write(rel, &bytes, policy)
    }

    /// Resolve, stat, and open a text file, rejecting directories and
    /// binary content.
    fn open_text(&self, rel: &str) -> Result<(Resolved, Metadata, File)> {
        let resolved = self.guard.resolve(rel)?;
        let meta = fs::metadata(&resolved.abs).map_err(|e| self.io_error(&resolved.rel, e))?;
        if meta.is_dir() {
            return Err(Error::IsADirectory { path: resolved.rel });
        }
        let mut file = File::open(&resolved.abs).map_err(|e| self.io_error(&resolved.rel, e))?;

        let mut head = Vec::with_capacity(BINARY_SNIFF_BYTES);
        (&mut file)
            .take(BINARY_SNIFF_BYTES as u64)
            .read_to_end(&mut head)
            .map_err(|e| Error::from_io(resolved.rel.clone(), e))?;
        if looks_binary(&head) {
            return Err(Error::UnsupportedContent {
                path: resolved.rel,
                reason: "binary content (NUL bytes in the first 8 KiB)".into(),
            });
        }
        file.seek(SeekFrom::Start(0))
            .map_err(|e| Error::from_io(resolved.rel.clone(), e))?;
        Ok((resolved, meta, file))
    }

    fn io_error(&self, rel: &str, e: std::io::Error) -> Error {
        match Error::from_io(rel, e) {
            Error::NotFound { path, .. } => {
                let hint = self.guard.nearest_existing_parent(&path);
                Error::not_found(path, hint)
            }
            other => other,
        }
    }
}

/// Move `tmp` to the first free name among `rel`, `stem (1).ext`, ...
fn persist_renamed(
    mut tmp: NamedTempFile,
    resolved: &Resolved,
) -> std::io::Result<(PathBuf, bool)> {
    let name = resolved
        .abs
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut candidate = resolved.abs.clone();
    for n in 0..MAX_RENAME_ATTEMPTS {
        if n > 0 {
            candidate.set_file_name(numbered_name(&name, n));
        }
        match tmp.persist_noclobber(&candidate) {
            Ok(_) => return Ok((candidate, n > 0)),
            Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => tmp = e.file,
            Err(e) => return Err(e.error),
        }
    }
    Err(std::io::Error::new(
        std::io::ErrorKind::AlreadyExists,
        "no free name left for the renamed document",
    ))
}

/// `report.md` -> `report (2).md`; names without an extension get the
/// suffix at the end.
pub fn numbered_name(name: &str, n: usize) -> String {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{} ({}).{}", stem, n, ext),
        _ => format!("{} ({})", name, n),
    }
}

pub(crate) fn looks_binary(sample: &[u8]) -> bool {
    sample.contains(&0)
}

pub(crate) fn entry_from(rel: &str, meta: &Metadata) -> DocumentEntry {
    let name = rel.rsplit('/').next().unwrap_or(rel).to_string();
    let kind = if meta.is_dir() {
        EntryKind::Directory
    } else {
        EntryKind::File
    };
    DocumentEntry {
        name,
        path: rel.to_string(),
        kind,
        size_bytes: (kind == EntryKind::File).then(|| meta.len()),
        modified: format_modified(meta),
    }
}

pub(crate) fn child_path(parent: &str, name: &str) -> String {
    if parent == "." || parent.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", parent, name)
    }
}

fn parent_rel(rel: &str) -> String {
    match rel.rsplit_once('/') {
        Some((parent, _)) => parent.to_string(),
        None => ".".to_string(),
    }
}

pub(crate) fn format_modified(meta: &Metadata) -> Option<String> {
    let secs = meta
        .modified()
        .ok()?
        .duration_since(SystemTime::UNIX_EPOCH)
        .ok()?
        .as_secs() as i64;
    DateTime::from_timestamp(secs, 0).map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
}

/// Largest index `<= max` on a char boundary of `s`.
fn str_floor(s: &str, max: usize) -> usize {
    let mut cut = max.min(s.len());
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    cut
}
