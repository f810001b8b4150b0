//! Sync Orchestration
//!
//! Glue between the loaders, the change-set provider, the pure engine and
//! the evidence collector. Each public method backs one CLI command.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::engine::{ChangeInput, Reconciler};
use super::report::{DiffReport, PageClassification, SyncReport};
use crate::config::Config;
use crate::diff::{EvidenceOptions, EvidenceSet, collect_evidence};
use crate::docs::scan_documents;
use crate::git::{ChangeSet, ChangeSetProvider, CommitRange, FileChange, resolve_range};
use crate::toc::{SectionRegistry, TocLoader, normalize_path};
use crate::types::{Issue, IssueCategory, IssueLog, Result};

// =============================================================================
// Requests
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct UpdateRequest {
    pub toc_file: PathBuf,
    pub doc_dir: PathBuf,
    /// Overrides the TOC's `ref_commit_hash`
    pub base_commit: Option<String>,
    pub target_commit: Option<String>,
    /// Attach annotated patches to scheduled sections
    pub include_diff: bool,
    pub context_lines: Option<u32>,
    pub line_numbers: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct SectionDiffRequest {
    pub base_commit: String,
    pub target_commit: String,
    pub files: Vec<String>,
    pub context_lines: Option<u32>,
    pub line_numbers: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct GitDiffRequest {
    pub base_ref: Option<String>,
    pub head_ref: Option<String>,
    pub include_uncommitted: bool,
    pub context_lines: Option<u32>,
    pub line_numbers: Option<bool>,
}

// =============================================================================
// Runner
// =============================================================================

pub struct UpdateRunner<'a> {
    config: &'a Config,
    provider: &'a dyn ChangeSetProvider,
}

impl<'a> UpdateRunner<'a> {
    pub fn new(config: &'a Config, provider: &'a dyn ChangeSetProvider) -> Self {
        Self { config, provider }
    }

    /// Full reconciliation against the change-set since the TOC's reference commit
    pub async fn update(&self, request: &UpdateRequest) -> Result<SyncReport> {
        let toc = TocLoader::load(&request.toc_file)?;
        let registry = SectionRegistry::build(&toc)?;
        let documents = scan_documents(&request.doc_dir, &self.config.docs)?;
        info!(
            "Loaded {} pages, {} sections, {} documents",
            registry.pages().len(),
            registry.sections().len(),
            documents.len()
        );

        let target_ref = request
            .target_commit
            .as_deref()
            .unwrap_or(self.config.refs.target.as_str());
        let base_ref = request
            .base_commit
            .clone()
            .or_else(|| toc.project.ref_commit_hash.clone());

        let mut issues = IssueLog::new();
        let reconciler = Reconciler::new(&registry, &documents);

        let Some(base_ref) = base_ref else {
            info!("No reference commit in TOC, planning full generation");
            let target_commit = match self.provider.resolve(target_ref).await {
                Ok(hash) => Some(hash),
                Err(e) => {
                    warn!("Could not resolve '{}': {}", target_ref, e);
                    issues.push(
                        Issue::warning(IssueCategory::ChangeSet, e.to_string())
                            .with_hint("The report carries no target commit to record in the TOC"),
                    );
                    None
                }
            };

            let mut reconciliation = reconciler.reconcile(ChangeInput::Full);
            reconciliation.issues.extend(issues.iter().cloned());
            return Ok(SyncReport::new(
                toc.project.clone(),
                display(&request.toc_file),
                display(&request.doc_dir),
                documents.len(),
                None,
                target_commit,
                reconciliation,
            ));
        };

        let range = resolve_range(self.provider, &base_ref, target_ref, &mut issues).await?;
        let files = self
            .provider
            .changed_files(&range.merge_base, &range.target, &[])
            .await?;
        info!("{} files changed in {}", files.len(), range.short());

        let change_set = ChangeSet { range, files };
        let mut reconciliation = reconciler.reconcile(ChangeInput::Incremental(&change_set));
        reconciliation.issues.extend(issues.iter().cloned());

        if request.include_diff {
            let changes = affecting_changes(&reconciliation.pages);
            let options = self.evidence_options(
                request.context_lines.unwrap_or(self.config.diff.context_lines),
                request.line_numbers,
            );
            let evidence =
                collect_evidence(self.provider, &change_set.range, &changes, &options).await;
            debug!(
                "Collected evidence for {} of {} affecting files",
                evidence.files.len(),
                changes.len()
            );
            attach_evidence(&mut reconciliation.pages, &evidence);
            reconciliation.issues.extend(evidence.issues.iter().cloned());
        }

        Ok(SyncReport::new(
            toc.project.clone(),
            display(&request.toc_file),
            display(&request.doc_dir),
            documents.len(),
            Some(&change_set),
            Some(change_set.range.target.clone()),
            reconciliation,
        ))
    }

    /// Evidence for specific files between two commits (diffed from their merge-base)
    pub async fn section_diff(&self, request: &SectionDiffRequest) -> Result<DiffReport> {
        let mut issues = IssueLog::new();
        let range = resolve_range(
            self.provider,
            &request.base_commit,
            &request.target_commit,
            &mut issues,
        )
        .await?;

        let wanted: Vec<String> = request.files.iter().map(|f| normalize_path(f)).collect();
        let mut changes = self
            .provider
            .changed_files(&range.merge_base, &range.target, &wanted)
            .await?;
        changes.sort_by_key(|c| {
            wanted
                .iter()
                .position(|w| c.paths().any(|p| p == w.as_str()))
                .unwrap_or(usize::MAX)
        });

        for file in &wanted {
            if !changes.iter().any(|c| c.paths().any(|p| p == file.as_str())) {
                issues.push(
                    Issue::warning(IssueCategory::Diff, "File has no changes in the range")
                        .in_file(file),
                );
            }
        }

        let options = self.evidence_options(
            request.context_lines.unwrap_or(self.config.diff.context_lines),
            request.line_numbers,
        );
        let evidence = collect_evidence(self.provider, &range, &changes, &options).await;

        Ok(diff_report(
            &request.base_commit,
            &request.target_commit,
            range,
            changes,
            evidence,
            &options,
            issues,
        ))
    }

    /// Evidence for every file changed on a branch relative to its base
    pub async fn git_diff(&self, request: &GitDiffRequest) -> Result<DiffReport> {
        let base_ref = request
            .base_ref
            .as_deref()
            .unwrap_or(self.config.refs.base.as_str());
        let head_ref = request
            .head_ref
            .as_deref()
            .unwrap_or(self.config.refs.target.as_str());

        let mut issues = IssueLog::new();
        let range = resolve_range(self.provider, base_ref, head_ref, &mut issues).await?;
        let changes = self
            .provider
            .changed_files(&range.merge_base, &range.target, &[])
            .await?;
        info!("{} files changed in {}", changes.len(), range.short());

        let options = self
            .evidence_options(
                request
                    .context_lines
                    .unwrap_or(self.config.diff.git_diff_context_lines),
                request.line_numbers,
            )
            .with_uncommitted(request.include_uncommitted);
        let evidence = collect_evidence(self.provider, &range, &changes, &options).await;

        Ok(diff_report(
            base_ref, head_ref, range, changes, evidence, &options, issues,
        ))
    }

    fn evidence_options(&self, context_lines: u32, line_numbers: Option<bool>) -> EvidenceOptions {
        let options = EvidenceOptions::from_config(&self.config.diff, context_lines);
        match line_numbers {
            Some(enabled) => options.with_line_numbers(enabled),
            None => options,
        }
    }
}

/// Structural reconciliation: markers only, no version control
pub fn sync_structure(config: &Config, toc_file: &Path, doc_dir: &Path) -> Result<SyncReport> {
    let toc = TocLoader::load(toc_file)?;
    let registry = SectionRegistry::build(&toc)?;
    let documents = scan_documents(doc_dir, &config.docs)?;

    let reconciliation = Reconciler::new(&registry, &documents).reconcile(ChangeInput::Structural);
    Ok(SyncReport::new(
        toc.project.clone(),
        display(toc_file),
        display(doc_dir),
        documents.len(),
        None,
        None,
        reconciliation,
    ))
}

// =============================================================================
// Helpers
// =============================================================================

fn display(path: &Path) -> String {
    path.display().to_string()
}

/// Distinct changes referenced by any scheduled section, sorted by path
fn affecting_changes(pages: &PageClassification) -> Vec<FileChange> {
    let mut changes: Vec<FileChange> = pages
        .all()
        .flat_map(|p| p.scheduled_sections.iter())
        .flat_map(|s| s.change_details.iter())
        .map(|d| d.change.clone())
        .collect();
    changes.sort();
    changes.dedup();
    changes
}

fn attach_evidence(pages: &mut PageClassification, evidence: &EvidenceSet) {
    let plans = pages
        .new
        .iter_mut()
        .chain(pages.to_update.iter_mut())
        .chain(pages.unchanged.iter_mut());
    for plan in plans {
        for section in &mut plan.scheduled_sections {
            for detail in &mut section.change_details {
                detail.evidence = evidence.get(&detail.change.path).cloned();
            }
        }
    }
}

fn diff_report(
    base_ref: &str,
    head_ref: &str,
    range: CommitRange,
    changed_files: Vec<FileChange>,
    evidence: EvidenceSet,
    options: &EvidenceOptions,
    mut issues: IssueLog,
) -> DiffReport {
    issues.extend(evidence.issues.iter().cloned());
    DiffReport {
        base_ref: base_ref.to_string(),
        head_ref: head_ref.to_string(),
        range: range.short(),
        commit_range: range,
        changed_files,
        files_processed: evidence.files.len(),
        files_with_errors: evidence.error_count(),
        total_size: evidence.files.iter().map(|f| f.formatted_patch.len()).sum(),
        files: evidence.files,
        context_lines: options.context_lines,
        line_numbers: options.line_numbers,
        include_uncommitted: options.include_uncommitted,
        issues,
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::git::{FakeProvider, FileStatus};
    use crate::sync::report::{ScheduleReason, SyncMode};

    const TOC: &str = r#"
project:
  name: demo
  ref_commit_hash: v1
pages:
  - id: P1
    title: Core
    filename: core.md
    sections:
      - id: S1
        source_files: [lib/core.go]
      - id: S2
        source_files: [docs/]
"#;

    fn workspace(toc: &str) -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("toc.yaml"), toc).unwrap();
        fs::create_dir(dir.path().join("docs")).unwrap();
        fs::write(
            dir.path().join("docs/core.md"),
            "<!-- PAGE_ID: P1 -->\n# Core\n\
             <!-- BEGIN:AUTOGEN S1 -->\nabout core\n<!-- END:AUTOGEN S1 -->\n\
             <!-- BEGIN:AUTOGEN S2 -->\nabout docs\n<!-- END:AUTOGEN S2 -->\n",
        )
        .unwrap();
        dir
    }

    fn request(dir: &Path) -> UpdateRequest {
        UpdateRequest {
            toc_file: dir.join("toc.yaml"),
            doc_dir: dir.join("docs"),
            ..Default::default()
        }
    }

    fn provider() -> FakeProvider {
        let mut fake = FakeProvider::default()
            .with_ref("v1", "1111111111")
            .with_ref("HEAD", "2222222222")
            .with_ref("origin/main", "3333333333")
            .with_change(FileChange::new("lib/core.go", FileStatus::Modified))
            .with_change(FileChange::new("tools/gen.py", FileStatus::Added))
            .with_patch("lib/core.go", "@@ -1 +1 @@\n-old\n+new\n")
            .with_patch("tools/gen.py", "@@ -0,0 +1 @@\n+print()\n");
        fake.merge_base = Some("1111111111".to_string());
        fake
    }

    #[tokio::test]
    async fn test_update_incremental_with_evidence() {
        let dir = workspace(TOC);
        let config = Config::default();
        let fake = provider();

        let report = UpdateRunner::new(&config, &fake)
            .update(&UpdateRequest {
                include_diff: true,
                ..request(dir.path())
            })
            .await
            .unwrap();

        assert_eq!(report.mode, SyncMode::Incremental);
        assert_eq!(report.range.as_deref(), Some("1111111..2222222"));
        assert_eq!(report.target_commit.as_deref(), Some("2222222222"));
        assert_eq!(report.summary.changed_files, 2);
        assert_eq!(report.summary.added_files, 1);
        assert_eq!(report.needing_toc_update.len(), 1);

        let s1 = report.pages.to_update[0].scheduled("S1").unwrap();
        assert_eq!(s1.reasons, vec![ScheduleReason::SourcesChanged]);
        let evidence = s1.change_details[0].evidence.as_ref().unwrap();
        assert_eq!(evidence.formatted_patch, "## File: 'lib/core.go'\n\n@@ -1 +1 @@\n-1 old\n+1 new");
    }

    #[tokio::test]
    async fn test_update_without_diff_skips_patches() {
        let dir = workspace(TOC);
        let config = Config::default();
        let fake = provider();

        let report = UpdateRunner::new(&config, &fake)
            .update(&request(dir.path()))
            .await
            .unwrap();

        let s1 = report.pages.to_update[0].scheduled("S1").unwrap();
        assert!(s1.change_details[0].evidence.is_none());
        assert_eq!(fake.patch_calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_update_without_reference_commit_is_full() {
        let dir = workspace(&TOC.replace("  ref_commit_hash: v1\n", ""));
        let config = Config::default();
        let fake = provider();

        let report = UpdateRunner::new(&config, &fake)
            .update(&request(dir.path()))
            .await
            .unwrap();

        assert_eq!(report.mode, SyncMode::Full);
        assert!(report.summary.requires_full_generation);
        assert_eq!(report.summary.sections_scheduled, 2);
        assert!(report.commit_range.is_none());
        assert_eq!(report.target_commit.as_deref(), Some("2222222222"));
    }

    #[tokio::test]
    async fn test_base_override_and_unknown_ref_is_fatal() {
        let dir = workspace(TOC);
        let config = Config::default();
        let fake = provider();

        let err = UpdateRunner::new(&config, &fake)
            .update(&UpdateRequest {
                base_commit: Some("missing".to_string()),
                target_commit: Some("also-missing".to_string()),
                ..request(dir.path())
            })
            .await
            .unwrap_err();
        assert!(err.is_whole_run_fatal());
    }

    #[tokio::test]
    async fn test_missing_toc_is_fatal() {
        let dir = TempDir::new().unwrap();
        let config = Config::default();
        let fake = provider();

        let err = UpdateRunner::new(&config, &fake)
            .update(&request(dir.path()))
            .await
            .unwrap_err();
        assert!(err.is_whole_run_fatal());
    }

    #[test]
    fn test_sync_structure_needs_no_git() {
        let dir = workspace(TOC);
        let report = sync_structure(
            &Config::default(),
            &dir.path().join("toc.yaml"),
            &dir.path().join("docs"),
        )
        .unwrap();

        assert_eq!(report.mode, SyncMode::Structural);
        assert_eq!(report.pages.unchanged.len(), 1);
        assert_eq!(report.summary.documents_scanned, 1);
        assert!(report.range.is_none());
    }

    #[tokio::test]
    async fn test_section_diff_keeps_requested_order() {
        let config = Config::default();
        let mut fake = provider();
        fake.changes
            .push(FileChange::new("z.rs", FileStatus::Modified));
        fake.patches
            .insert("z.rs".to_string(), "@@ -3 +3 @@\n-a\n+b\n".to_string());

        let report = UpdateRunner::new(&config, &fake)
            .section_diff(&SectionDiffRequest {
                base_commit: "v1".to_string(),
                target_commit: "HEAD".to_string(),
                files: vec!["./z.rs".to_string(), "lib/core.go".to_string(), "nope.rs".to_string()],
                ..Default::default()
            })
            .await
            .unwrap();

        let names: Vec<&str> = report.files.iter().map(|f| f.filename.as_str()).collect();
        assert_eq!(names, vec!["z.rs", "lib/core.go"]);
        assert_eq!(report.files_processed, 2);
        assert_eq!(report.context_lines, 0);
        assert_eq!(report.issues.warning_count(), 1);
        assert_eq!(
            report.total_size,
            report.files.iter().map(|f| f.formatted_patch.len()).sum::<usize>()
        );
    }

    #[tokio::test]
    async fn test_git_diff_defaults_to_configured_refs() {
        let config = Config::default();
        let fake = provider();

        let report = UpdateRunner::new(&config, &fake)
            .git_diff(&GitDiffRequest::default())
            .await
            .unwrap();

        assert_eq!(report.base_ref, "origin/main");
        assert_eq!(report.head_ref, "HEAD");
        assert_eq!(report.context_lines, 3);
        assert_eq!(report.files.len(), 2);
        assert_eq!(report.files_with_errors, 0);
    }
}
