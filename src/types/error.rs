//! Unified Error Type System
//!
//! Centralized error type for the whole engine. Only errors that abort a run
//! live here; per-document and per-file problems are collected as
//! [`Issue`](super::Issue)s instead so one bad item never blocks the report.
//!
//! ## Error Categories
//!
//! - **Specification**: malformed TOC (duplicate/missing ids, bad patterns), whole-run fatal
//! - **ChangeSet**: git could not resolve a reference or failed, whole-run fatal
//! - **Diff**: a unified diff violated its own hunk headers
//! - **Config**: invalid configuration values
//! - **System**: IO and serialization failures

use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Error Categories
// =============================================================================

/// Error categories used to decide whether a failure aborts the run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// TOC specification is invalid
    Specification,
    /// Version control could not supply the change-set
    ChangeSet,
    /// A unified diff could not be parsed
    Diff,
    /// Configuration is invalid
    Config,
    /// IO / serialization
    System,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Specification => write!(f, "SPECIFICATION"),
            Self::ChangeSet => write!(f, "CHANGE_SET"),
            Self::Diff => write!(f, "DIFF"),
            Self::Config => write!(f, "CONFIG"),
            Self::System => write!(f, "SYSTEM"),
        }
    }
}

impl ErrorCategory {
    /// Specification and change-set failures invalidate every result of the run
    pub fn is_whole_run_fatal(&self) -> bool {
        matches!(self, Self::Specification | Self::ChangeSet)
    }
}

// =============================================================================
// Application Error
// =============================================================================

#[derive(Debug, Error)]
pub enum SyncError {
    // -------------------------------------------------------------------------
    // System Errors (auto From impl)
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Config error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Specification Errors
    // -------------------------------------------------------------------------
    #[error("TOC file not found: {0}")]
    TocNotFound(String),

    #[error("Missing identifier: {context}")]
    MissingIdentifier { context: String },

    #[error("Duplicate page id '{id}'")]
    DuplicatePage { id: String },

    #[error("Duplicate section id '{id}' (first in page '{first_page}', again in page '{second_page}')")]
    DuplicateSection {
        id: String,
        first_page: String,
        second_page: String,
    },

    #[error("Invalid source pattern '{pattern}' in '{owner}': {reason}")]
    InvalidPattern {
        owner: String,
        pattern: String,
        reason: String,
    },

    // -------------------------------------------------------------------------
    // Change-Set Errors
    // -------------------------------------------------------------------------
    #[error("Git command failed (git {command}): {message}")]
    Git { command: String, message: String },

    #[error("Timeout after {duration:?}: {operation}")]
    Timeout {
        operation: String,
        duration: Duration,
    },

    // -------------------------------------------------------------------------
    // Diff Errors
    // -------------------------------------------------------------------------
    #[error("Diff parse error at line {line}: {message}")]
    DiffParse { line: usize, message: String },
}

pub type Result<T> = std::result::Result<T, SyncError>;

// =============================================================================
// Helper Functions
// =============================================================================

impl SyncError {
    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a git error
    pub fn git(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Git {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Create a diff parse error
    pub fn diff_parse(line: usize, message: impl Into<String>) -> Self {
        Self::DiffParse {
            line,
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::TocNotFound(_)
            | Self::MissingIdentifier { .. }
            | Self::DuplicatePage { .. }
            | Self::DuplicateSection { .. }
            | Self::InvalidPattern { .. }
            | Self::Yaml(_) => ErrorCategory::Specification,
            Self::Git { .. } | Self::Timeout { .. } => ErrorCategory::ChangeSet,
            Self::DiffParse { .. } => ErrorCategory::Diff,
            Self::Config(_) => ErrorCategory::Config,
            Self::Io(_) | Self::Json(_) => ErrorCategory::System,
        }
    }

    /// Whether this error must abort the whole run
    pub fn is_whole_run_fatal(&self) -> bool {
        self.category().is_whole_run_fatal()
    }
}

/// Context extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn with_context<C: Into<String>>(self, context: C) -> Result<T>;

    /// Add context using a closure (lazy evaluation)
    fn with_context_fn<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>;
}

impl<T, E: std::error::Error + Send + Sync + 'static> ResultExt<T> for std::result::Result<T, E> {
    fn with_context<C: Into<String>>(self, context: C) -> Result<T> {
        self.map_err(|e| SyncError::Io(std::io::Error::other(format!("{}: {}", context.into(), e))))
    }

    fn with_context_fn<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>,
    {
        self.map_err(|e| SyncError::Io(std::io::Error::other(format!("{}: {}", f().into(), e))))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category_display() {
        assert_eq!(ErrorCategory::Specification.to_string(), "SPECIFICATION");
        assert_eq!(ErrorCategory::ChangeSet.to_string(), "CHANGE_SET");
        assert_eq!(ErrorCategory::Diff.to_string(), "DIFF");
    }

    #[test]
    fn test_whole_run_fatal_categories() {
        assert!(ErrorCategory::Specification.is_whole_run_fatal());
        assert!(ErrorCategory::ChangeSet.is_whole_run_fatal());
        assert!(!ErrorCategory::Config.is_whole_run_fatal());
        assert!(!ErrorCategory::Diff.is_whole_run_fatal());
    }

    #[test]
    fn test_error_classification() {
        let dup = SyncError::DuplicateSection {
            id: "s1".to_string(),
            first_page: "p1".to_string(),
            second_page: "p2".to_string(),
        };
        assert_eq!(dup.category(), ErrorCategory::Specification);
        assert!(dup.to_string().contains("'s1'"));

        let git = SyncError::git("rev-parse nope", "unknown revision");
        assert!(git.is_whole_run_fatal());

        let timeout = SyncError::timeout("git diff", Duration::from_secs(5));
        assert_eq!(timeout.category(), ErrorCategory::ChangeSet);

        let parse = SyncError::diff_parse(7, "hunk ended early");
        assert!(!parse.is_whole_run_fatal());
        assert_eq!(parse.to_string(), "Diff parse error at line 7: hunk ended early");
    }

    #[test]
    fn test_result_ext_context() {
        let failed: std::result::Result<(), std::io::Error> =
            Err(std::io::Error::other("disk gone"));
        let err = failed.with_context("reading report").unwrap_err();
        assert_eq!(err.to_string(), "IO error: reading report: disk gone");
    }
}
