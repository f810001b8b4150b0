//! tocsync - Incremental Sync Engine for TOC-Driven Documentation
//!
//! Decides what a documentation generator must regenerate. Given a TOC
//! (pages, nested sections and the source files each covers), the markdown
//! documents generated from it and a git commit range, tocsync classifies
//! every page and section and attaches line-numbered patch evidence for the
//! source changes that affect them.
//!
//! ## Quick Start
//!
//! ```ignore
//! use tocsync::{Config, GitCli, UpdateRequest, UpdateRunner};
//!
//! let config = Config::default();
//! let git = GitCli::new(".", &config.git);
//! let report = UpdateRunner::new(&config, &git)
//!     .update(&UpdateRequest {
//!         toc_file: "toc.yaml".into(),
//!         doc_dir: "docs".into(),
//!         include_diff: true,
//!         ..Default::default()
//!     })
//!     .await?;
//! ```
//!
//! ## Modules
//!
//! - [`toc`]: TOC model, loading, flattening and source patterns
//! - [`docs`]: document markers, scanning and structure validation
//! - [`git`]: change-set provider trait and the git CLI backend
//! - [`diff`]: unified diff parsing and line-numbered annotation
//! - [`sync`]: the reconciliation engine and command orchestration

pub mod cli;
pub mod config;
pub mod constants;
pub mod diff;
pub mod docs;
pub mod git;
pub mod sync;
pub mod toc;
pub mod types;

// =============================================================================
// Core Re-exports
// =============================================================================

pub use config::{Config, ConfigLoader};
pub use types::{ErrorCategory, Issue, IssueLog, Result, ResultExt, SyncError};

pub use diff::{annotate_patch, parse_unified_diff};
pub use docs::{DocumentSet, Validator, scan_documents};
pub use git::{ChangeSet, ChangeSetProvider, CommitRange, FileChange, FileStatus, GitCli};
pub use sync::{ChangeInput, Reconciler, SyncReport, UpdateRequest, UpdateRunner};
pub use toc::{SectionRegistry, Toc, TocLoader};
