//! Error taxonomy shared by every docvault operation.
//!
//! Every message carries root-relative paths only; the absolute layout of
//! the machine never leaks through an error.

use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for docvault operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("path violation: '{path}' {reason}")]
    PathViolation { path: String, reason: String },

    #[error("not found: '{path}'")]
    NotFound {
        path: String,
        /// Nearest existing ancestor, when one could be determined.
        suggestion: Option<String>,
    },

    #[error("not a directory: '{path}'")]
    NotADirectory { path: String },

    #[error("is a directory: '{path}'")]
    IsADirectory { path: String },

    #[error("unsupported content in '{path}': {reason}")]
    UnsupportedContent { path: String, reason: String },

    #[error("payload too large: {size} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge { size: u64, limit: u64 },

    #[error("standards unavailable at '{location}': {reason}")]
    StandardsUnavailable { location: String, reason: String },

    #[error("timed out during {stage} after {elapsed_ms} ms")]
    Timeout { stage: String, elapsed_ms: u64 },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("storage error at '{path}': {source}")]
    Storage {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Machine-readable failure kind, stable across releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    PathViolation,
    NotFound,
    NotADirectory,
    IsADirectory,
    UnsupportedContent,
    PayloadTooLarge,
    StandardsUnavailable,
    Timeout,
    InvalidInput,
    StorageError,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::PathViolation => "path_violation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::NotADirectory => "not_a_directory",
            ErrorKind::IsADirectory => "is_a_directory",
            ErrorKind::UnsupportedContent => "unsupported_content",
            ErrorKind::PayloadTooLarge => "payload_too_large",
            ErrorKind::StandardsUnavailable => "standards_unavailable",
            ErrorKind::Timeout => "timeout",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::StorageError => "storage_error",
        }
    }
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::PathViolation { .. } => ErrorKind::PathViolation,
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::NotADirectory { .. } => ErrorKind::NotADirectory,
            Error::IsADirectory { .. } => ErrorKind::IsADirectory,
            Error::UnsupportedContent { .. } => ErrorKind::UnsupportedContent,
            Error::PayloadTooLarge { .. } => ErrorKind::PayloadTooLarge,
            Error::StandardsUnavailable { .. } => ErrorKind::StandardsUnavailable,
            Error::Timeout { .. } => ErrorKind::Timeout,
            Error::InvalidInput(_) => ErrorKind::InvalidInput,
            Error::Storage { .. } => ErrorKind::StorageError,
        }
    }

    /// Get the exit code for the CLI.
    pub fn exit_code(&self) -> i32 {
        match self.kind() {
            ErrorKind::InvalidInput => 2,
            ErrorKind::NotFound | ErrorKind::NotADirectory | ErrorKind::IsADirectory => 3,
            ErrorKind::PathViolation => 4,
            ErrorKind::UnsupportedContent | ErrorKind::PayloadTooLarge => 5,
            ErrorKind::StandardsUnavailable => 6,
            ErrorKind::Timeout => 7,
            ErrorKind::StorageError => 8,
        }
    }

    /// Get actionable suggestions for fixing the error.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Error::PathViolation { .. } => {
                vec!["Pass a path relative to the repository root without '..' escapes".into()]
            }
            Error::NotFound { suggestion, .. } => {
                let mut out = Vec::new();
                if let Some(parent) = suggestion {
                    out.push(format!("Nearest existing directory: '{}'", parent));
                    out.push(format!("Run 'dv list {}' to see what is there", parent));
                }
                out
            }
            Error::NotADirectory { path } => vec![format!("Run 'dv read {}' instead", path)],
            Error::IsADirectory { path } => vec![format!("Run 'dv list {}' instead", path)],
            Error::PayloadTooLarge { .. } => {
                vec!["Raise upload.max_bytes in the config or split the document".into()]
            }
            Error::StandardsUnavailable { .. } => vec![
                "Add standards documents under one of the configured standards paths".into(),
                "Or pass --standards <path> to point at another location".into(),
            ],
            Error::Timeout { .. } => {
                vec!["Narrow the directory or raise the deadline in the config".into()]
            }
            _ => vec![],
        }
    }

    /// Classify an I/O error observed on a root-relative path.
    pub fn from_io(path: impl Into<String>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => Error::NotFound {
                path,
                suggestion: None,
            },
            _ => Error::Storage { path, source },
        }
    }

    pub fn not_found(path: impl Into<String>, suggestion: Option<String>) -> Self {
        Error::NotFound {
            path: path.into(),
            suggestion,
        }
    }

    pub fn violation(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::PathViolation {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_serializes_snake_case() {
        let err = Error::StandardsUnavailable {
            location: "Standards".into(),
            reason: "no documents".into(),
        };
        let json = serde_json::to_string(&err.kind()).unwrap();
        assert_eq!(json, "\"standards_unavailable\"");
        assert_eq!(err.kind().as_str(), "standards_unavailable");
    }

    #[test]
    fn io_not_found_maps_to_not_found() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = Error::from_io("docs/a.md", io);
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn not_found_suggests_parent() {
        let err = Error::not_found("docs/missing.md", Some("docs".into()));
        let hints = err.suggestions();
        assert!(hints.iter().any(|h| h.contains("'docs'")));
    }

    #[test]
    fn messages_use_given_relative_path() {
        let err = Error::violation("../etc/passwd", "escapes the repository root");
        assert_eq!(
            err.to_string(),
            "path violation: '../etc/passwd' escapes the repository root"
        );
    }
}
