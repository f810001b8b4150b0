//! Configuration Types
//!
//! All configuration structures with sensible defaults.
//! Supports global (~/.config/tocsync/) and project (.tocsync/) level configuration.

use serde::{Deserialize, Serialize};

use crate::constants::{diff, docs, git};
use crate::types::{Result, SyncError};

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Git backend settings
    pub git: GitConfig,

    /// Patch evidence settings
    pub diff: DiffConfig,

    /// Default commit references
    pub refs: RefsConfig,

    /// Generated documentation settings
    pub docs: DocsConfig,
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `SyncError::Config` on validation failure.
    pub fn validate(&self) -> Result<()> {
        if self.git.timeout_secs == 0 {
            return Err(SyncError::Config(
                "git.timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.git.binary.trim().is_empty() {
            return Err(SyncError::Config("git.binary must not be empty".to_string()));
        }

        if self.diff.max_concurrency == 0 {
            return Err(SyncError::Config(
                "diff.max_concurrency must be greater than 0".to_string(),
            ));
        }

        if let Err(e) = glob::Pattern::new(&self.docs.glob) {
            return Err(SyncError::Config(format!(
                "docs.glob '{}' is not a valid glob: {}",
                self.docs.glob, e
            )));
        }

        Ok(())
    }
}

// =============================================================================
// Git
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GitConfig {
    /// Git executable
    pub binary: String,
    /// Timeout for a single git invocation
    pub timeout_secs: u64,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            binary: "git".to_string(),
            timeout_secs: git::DEFAULT_TIMEOUT_SECS,
        }
    }
}

// =============================================================================
// Diff
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DiffConfig {
    /// Context lines for `update` and `section-diff`
    pub context_lines: u32,
    /// Context lines for `git-diff`
    pub git_diff_context_lines: u32,
    /// Prefix every patch line with its line number
    pub line_numbers: bool,
    /// Files diffed concurrently
    pub max_concurrency: usize,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            context_lines: diff::DEFAULT_CONTEXT_LINES,
            git_diff_context_lines: diff::DEFAULT_GIT_DIFF_CONTEXT_LINES,
            line_numbers: true,
            max_concurrency: diff::DEFAULT_MAX_CONCURRENCY,
        }
    }
}

// =============================================================================
// Refs
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RefsConfig {
    /// Base reference for `git-diff`
    pub base: String,
    /// Target reference for every command
    pub target: String,
}

impl Default for RefsConfig {
    fn default() -> Self {
        Self {
            base: git::DEFAULT_BASE_REF.to_string(),
            target: git::DEFAULT_TARGET_REF.to_string(),
        }
    }
}

// =============================================================================
// Docs
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DocsConfig {
    /// File-name glob for generated documents inside the doc directory
    pub glob: String,
    /// Leading lines searched for PAGE_ID by the validator
    pub page_id_scan_lines: usize,
    /// Pages smaller than this produce a validator warning
    pub min_page_bytes: usize,
}

impl Default for DocsConfig {
    fn default() -> Self {
        Self {
            glob: docs::DEFAULT_GLOB.to_string(),
            page_id_scan_lines: docs::PAGE_ID_SCAN_LINES,
            min_page_bytes: docs::MIN_PAGE_BYTES,
        }
    }
}
