//! Patch Evidence Collection
//!
//! Turns a list of changed files into per-file annotated patches with sizes.
//! Files are processed with bounded parallelism but results keep input
//! order, and a failure on one file is recorded on that file only.

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, warn};

use super::annotate::annotate_patch;
use crate::config::DiffConfig;
use crate::git::{ChangeSetProvider, CommitRange, FileChange, FileStatus};
use crate::types::{Issue, IssueCategory, IssueLog, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvidenceOptions {
    pub context_lines: u32,
    pub line_numbers: bool,
    /// Append staged and unstaged working tree changes to each patch
    pub include_uncommitted: bool,
    pub max_concurrency: usize,
}

impl EvidenceOptions {
    pub fn from_config(config: &DiffConfig, context_lines: u32) -> Self {
        Self {
            context_lines,
            line_numbers: config.line_numbers,
            include_uncommitted: false,
            max_concurrency: config.max_concurrency,
        }
    }

    pub fn with_line_numbers(mut self, enabled: bool) -> Self {
        self.line_numbers = enabled;
        self
    }

    pub fn with_uncommitted(mut self, enabled: bool) -> Self {
        self.include_uncommitted = enabled;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEvidence {
    pub filename: String,
    pub status: FileStatus,
    pub formatted_patch: String,
    pub original_size: u64,
    pub new_size: u64,
    pub is_deleted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileEvidence {
    fn failed(change: &FileChange, error: String) -> Self {
        Self {
            filename: change.path.clone(),
            status: change.status,
            formatted_patch: format!("## File: '{}'\n[Error: {}]", change.path, error),
            original_size: 0,
            new_size: 0,
            is_deleted: false,
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EvidenceSet {
    /// One entry per input file, in input order; files with empty patches are omitted
    pub files: Vec<FileEvidence>,
    pub issues: IssueLog,
}

impl EvidenceSet {
    pub fn get(&self, path: &str) -> Option<&FileEvidence> {
        self.files.iter().find(|f| f.filename == path)
    }

    pub fn error_count(&self) -> usize {
        self.files.iter().filter(|f| f.error.is_some()).count()
    }
}

/// Collect evidence for every change in `changes` over `range`
pub async fn collect_evidence(
    provider: &dyn ChangeSetProvider,
    range: &CommitRange,
    changes: &[FileChange],
    options: &EvidenceOptions,
) -> EvidenceSet {
    let results: Vec<(&FileChange, Result<Option<FileEvidence>>)> = stream::iter(changes)
        .map(|change| async move { (change, collect_one(provider, range, change, options).await) })
        .buffered(options.max_concurrency.max(1))
        .collect()
        .await;

    let mut set = EvidenceSet::default();
    for (change, result) in results {
        match result {
            Ok(Some(evidence)) => set.files.push(evidence),
            Ok(None) => debug!("No patch content for {}, skipped", change.path),
            Err(e) => {
                warn!("Failed to collect diff for {}: {}", change.path, e);
                set.issues.push(
                    Issue::error(IssueCategory::Diff, e.to_string())
                        .in_file(&change.path)
                        .with_hint("The affected sections stay scheduled without this evidence"),
                );
                set.files.push(FileEvidence::failed(change, e.to_string()));
            }
        }
    }
    set
}

async fn collect_one(
    provider: &dyn ChangeSetProvider,
    range: &CommitRange,
    change: &FileChange,
    options: &EvidenceOptions,
) -> Result<Option<FileEvidence>> {
    let paths: Vec<String> = change.paths().map(str::to_string).collect();
    let mut patch = provider
        .patch(&range.merge_base, &range.target, &paths, options.context_lines)
        .await?;

    if options.include_uncommitted {
        for staged in [true, false] {
            let extra = provider
                .working_tree_patch(&paths, options.context_lines, staged)
                .await?;
            if extra.trim().is_empty() {
                continue;
            }
            if !patch.trim().is_empty() && !patch.ends_with('\n') {
                patch.push('\n');
            }
            patch.push_str(&extra);
        }
    }

    let is_deleted = change.status.is_deleted();
    if patch.trim().is_empty() && !is_deleted {
        return Ok(None);
    }

    let formatted_patch = if options.line_numbers {
        annotate_patch(&patch, &change.path, change.status)?
    } else {
        patch
    };

    let original_path = change.old_path.as_deref().unwrap_or(&change.path);
    let original_size = provider
        .file_size_at(&range.merge_base, original_path)
        .await?
        .unwrap_or(0);
    let new_size = if is_deleted {
        0
    } else {
        provider
            .file_size_at(&range.target, &change.path)
            .await?
            .unwrap_or(0)
    };

    Ok(Some(FileEvidence {
        filename: change.path.clone(),
        status: change.status,
        formatted_patch,
        original_size,
        new_size,
        is_deleted,
        error: None,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::FakeProvider;

    fn range() -> CommitRange {
        CommitRange {
            base: "base".to_string(),
            target: "head".to_string(),
            merge_base: "mb".to_string(),
            merge_base_fallback: false,
        }
    }

    fn options() -> EvidenceOptions {
        EvidenceOptions::from_config(&DiffConfig::default(), 0)
    }

    #[tokio::test]
    async fn test_collects_in_input_order_with_sizes() {
        let mut fake = FakeProvider::default()
            .with_patch("b.rs", "@@ -1 +1 @@\n-x\n+y\n")
            .with_patch("a.rs", "@@ -0,0 +1 @@\n+new\n");
        fake.sizes.insert(("mb".to_string(), "b.rs".to_string()), 2);
        fake.sizes.insert(("head".to_string(), "b.rs".to_string()), 3);
        fake.sizes.insert(("head".to_string(), "a.rs".to_string()), 4);

        let changes = vec![
            FileChange::new("b.rs", FileStatus::Modified),
            FileChange::new("a.rs", FileStatus::Added),
        ];
        let set = collect_evidence(&fake, &range(), &changes, &options()).await;

        let names: Vec<&str> = set.files.iter().map(|f| f.filename.as_str()).collect();
        assert_eq!(names, vec!["b.rs", "a.rs"]);

        let b = set.get("b.rs").unwrap();
        assert_eq!((b.original_size, b.new_size), (2, 3));
        assert_eq!(b.formatted_patch, "## File: 'b.rs'\n\n@@ -1 +1 @@\n-1 x\n+1 y");

        let a = set.get("a.rs").unwrap();
        assert_eq!((a.original_size, a.new_size), (0, 4));
        assert!(set.issues.is_empty());
    }

    #[tokio::test]
    async fn test_deleted_and_empty_patches() {
        let mut fake = FakeProvider::default();
        fake.sizes.insert(("mb".to_string(), "gone.rs".to_string()), 10);

        let changes = vec![
            FileChange::new("gone.rs", FileStatus::Deleted),
            FileChange::new("mode-only.sh", FileStatus::Modified),
        ];
        let set = collect_evidence(&fake, &range(), &changes, &options()).await;

        assert_eq!(set.files.len(), 1);
        let gone = &set.files[0];
        assert!(gone.is_deleted);
        assert_eq!((gone.original_size, gone.new_size), (10, 0));
        assert_eq!(gone.formatted_patch, "## File 'gone.rs' was deleted");
    }

    #[tokio::test]
    async fn test_per_file_errors_do_not_block_others() {
        let mut fake = FakeProvider::default()
            .with_patch("ok.rs", "@@ -1 +1 @@\n-a\n+b\n")
            .with_patch("broken.rs", "@@ -1,5 +1,5 @@\n a\n");
        fake.failing_paths.push("missing.rs".to_string());

        let changes = vec![
            FileChange::new("missing.rs", FileStatus::Modified),
            FileChange::new("broken.rs", FileStatus::Modified),
            FileChange::new("ok.rs", FileStatus::Modified),
        ];
        let set = collect_evidence(&fake, &range(), &changes, &options()).await;

        assert_eq!(set.files.len(), 3);
        assert_eq!(set.error_count(), 2);
        assert_eq!(set.issues.error_count(), 2);
        assert!(set.get("broken.rs").unwrap().error.as_deref().unwrap().contains("Diff parse error"));
        assert!(set.get("ok.rs").unwrap().error.is_none());
    }

    #[tokio::test]
    async fn test_raw_patch_without_line_numbers() {
        let raw = "diff --git a/a b/a\n@@ -1 +1 @@\n-a\n+b\n";
        let fake = FakeProvider::default().with_patch("a", raw);
        let changes = vec![FileChange::new("a", FileStatus::Modified)];

        let set = collect_evidence(
            &fake,
            &range(),
            &changes,
            &options().with_line_numbers(false),
        )
        .await;
        assert_eq!(set.files[0].formatted_patch, raw);
    }

    #[tokio::test]
    async fn test_uncommitted_changes_are_appended() {
        let mut fake = FakeProvider::default().with_patch("a", "@@ -1 +1 @@\n-a\n+b\n");
        fake.staged
            .insert("a".to_string(), "@@ -5 +5 @@\n-s\n+t\n".to_string());
        fake.unstaged
            .insert("a".to_string(), "@@ -9,0 +10 @@\n+u\n".to_string());
        let changes = vec![FileChange::new("a", FileStatus::Modified)];

        let set = collect_evidence(&fake, &range(), &changes, &options().with_uncommitted(true)).await;
        let patch = &set.files[0].formatted_patch;
        assert!(patch.contains("+1 b"));
        assert!(patch.contains("+5 t"));
        assert!(patch.contains("+10 u"));
    }

    #[tokio::test]
    async fn test_result_is_independent_of_concurrency() {
        let mut fake = FakeProvider::default();
        let mut changes = Vec::new();
        for i in 0..20 {
            let path = format!("f{i}.rs");
            fake.patches
                .insert(path.clone(), format!("@@ -{i} +{i} @@\n-a\n+b\n"));
            changes.push(FileChange::new(path, FileStatus::Modified));
        }

        let serial = collect_evidence(&fake, &range(), &changes, &EvidenceOptions { max_concurrency: 1, ..options() }).await;
        let parallel = collect_evidence(&fake, &range(), &changes, &EvidenceOptions { max_concurrency: 16, ..options() }).await;
        assert_eq!(serial.files, parallel.files);
    }
}
