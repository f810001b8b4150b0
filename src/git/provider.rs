//! Change-Set Provider Abstraction
//!
//! Everything the engine needs from version control goes through
//! [`ChangeSetProvider`]. All methods must be deterministic for a fixed pair
//! of commit hashes; the working-tree method is the only exception.

use async_trait::async_trait;
use tracing::{debug, warn};

use super::types::{CommitRange, FileChange};
use crate::types::{Issue, IssueCategory, IssueLog, Result, SyncError};

#[async_trait]
pub trait ChangeSetProvider: Send + Sync {
    /// Resolve a reference to a full commit hash
    async fn resolve(&self, reference: &str) -> Result<String>;

    async fn merge_base(&self, a: &str, b: &str) -> Result<String>;

    /// Changed files between two commits, optionally restricted to `paths`
    async fn changed_files(
        &self,
        base: &str,
        target: &str,
        paths: &[String],
    ) -> Result<Vec<FileChange>>;

    /// Raw unified diff between two commits for `paths`
    async fn patch(
        &self,
        base: &str,
        target: &str,
        paths: &[String],
        context_lines: u32,
    ) -> Result<String>;

    /// Blob size in bytes, `None` when the path does not exist at that commit
    async fn file_size_at(&self, commit: &str, path: &str) -> Result<Option<u64>>;

    /// Uncommitted changes: index vs HEAD when `staged`, otherwise worktree vs index
    async fn working_tree_patch(
        &self,
        paths: &[String],
        context_lines: u32,
        staged: bool,
    ) -> Result<String>;
}

/// Resolve `base..target` and its merge-base.
///
/// Unresolvable references are fatal. A failed merge-base computation falls
/// back to the literal base, sets the fallback flag and records a warning;
/// a timeout is never downgraded.
pub async fn resolve_range(
    provider: &dyn ChangeSetProvider,
    base_ref: &str,
    target_ref: &str,
    issues: &mut IssueLog,
) -> Result<CommitRange> {
    let target = provider.resolve(target_ref).await?;

    match provider.merge_base(base_ref, &target).await {
        Ok(merge_base) => {
            let base = provider.resolve(base_ref).await?;
            debug!("Merge-base of {} and {}: {}", base_ref, target_ref, merge_base);
            Ok(CommitRange {
                base,
                target,
                merge_base,
                merge_base_fallback: false,
            })
        }
        Err(e @ SyncError::Timeout { .. }) => Err(e),
        Err(e) => {
            warn!("merge-base failed, falling back to '{}': {}", base_ref, e);
            let base = provider
                .resolve(base_ref)
                .await
                .unwrap_or_else(|_| base_ref.to_string());
            issues.push(
                Issue::warning(
                    IssueCategory::ChangeSet,
                    format!(
                        "Could not compute merge-base of '{}' and '{}'; diffing from '{}' directly",
                        base_ref, target_ref, base_ref
                    ),
                )
                .with_hint("History may have been rewritten (rebase or force-push) since the documentation was generated"),
            );
            Ok(CommitRange {
                merge_base: base.clone(),
                base,
                target,
                merge_base_fallback: true,
            })
        }
    }
}
