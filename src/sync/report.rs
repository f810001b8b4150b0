//! Report types
//!
//! Everything here is plain data built once and serialized. Field order and
//! list order are fixed so identical inputs give byte-identical JSON.

use serde::Serialize;

use crate::diff::FileEvidence;
use crate::git::{ChangeSet, CommitRange, FileChange, FileStatus};
use crate::toc::{PatternSet, TocProject};
use crate::types::IssueLog;

// =============================================================================
// Classification
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// No reference commit: everything is generated
    Full,
    /// Reference commit known: staleness plus change attribution
    Incremental,
    /// Markers only, no version control
    Structural,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleReason {
    /// Section is missing from its document or empty
    Stale,
    /// A matched source file was added, modified or renamed
    SourcesChanged,
    /// A matched source file was deleted
    SourcesDeleted,
    /// Full generation run
    FullGeneration,
}

/// A changed file that affects a section, with evidence when requested
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeDetail {
    #[serde(flatten)]
    pub change: FileChange,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence: Option<FileEvidence>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScheduledSection {
    pub section_id: String,
    pub title: String,
    pub description: String,
    pub depth: usize,
    pub autogen: bool,
    pub diagrams_needed: bool,
    pub diagram_types: Vec<String>,
    pub source_patterns: PatternSet,
    pub reasons: Vec<ScheduleReason>,
    /// Changed paths matching the section's patterns, sorted
    pub matched_files: Vec<String>,
    pub change_details: Vec<ChangeDetail>,
    /// Current inner text when the document already has the section
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_content: Option<String>,
}

impl ScheduledSection {
    pub fn has_reason(&self, reason: ScheduleReason) -> bool {
        self.reasons.contains(&reason)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PagePlan {
    pub page_id: String,
    pub title: String,
    pub filename: String,
    /// File name of the existing document, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<String>,
    /// Document markers are broken; regenerate the whole page
    pub requires_full_regeneration: bool,
    /// TOC sections absent from the document or empty, in TOC order
    pub stale_sections: Vec<String>,
    /// TOC sections present with content, in TOC order
    pub present_sections: Vec<String>,
    /// Document sections no longer in the TOC, sorted
    pub deleted_sections: Vec<String>,
    pub scheduled_sections: Vec<ScheduledSection>,
    pub related_pages: Vec<String>,
}

impl PagePlan {
    pub fn scheduled(&self, section_id: &str) -> Option<&ScheduledSection> {
        self.scheduled_sections
            .iter()
            .find(|s| s.section_id == section_id)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PageClassification {
    pub new: Vec<PagePlan>,
    pub to_update: Vec<PagePlan>,
    pub unchanged: Vec<PagePlan>,
}

impl PageClassification {
    pub fn all(&self) -> impl Iterator<Item = &PagePlan> {
        self.new
            .iter()
            .chain(self.to_update.iter())
            .chain(self.unchanged.iter())
    }

    pub fn find(&self, page_id: &str) -> Option<&PagePlan> {
        self.all().find(|p| p.page_id == page_id)
    }
}

/// Added file not covered by any TOC pattern
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UncoveredFile {
    pub path: String,
    pub status: FileStatus,
}

/// Deleted file and every section that referenced it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletedSource {
    pub path: String,
    pub affected_sections: Vec<String>,
}

/// Document whose PAGE_ID is not a TOC page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrphanedDocument {
    pub page_id: String,
    pub filename: String,
}

/// Output of the reconciliation engine
#[derive(Debug, Clone, Serialize)]
pub struct Reconciliation {
    pub mode: SyncMode,
    pub pages: PageClassification,
    pub needing_toc_update: Vec<UncoveredFile>,
    pub deleted_source_files: Vec<DeletedSource>,
    pub orphaned_documents: Vec<OrphanedDocument>,
    #[serde(skip)]
    pub issues: IssueLog,
}

// =============================================================================
// Sync Report
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct SyncSummary {
    pub total_pages: usize,
    pub new_pages: usize,
    pub pages_to_update: usize,
    pub unchanged_pages: usize,
    pub stale_sections: usize,
    pub deleted_sections: usize,
    pub sections_scheduled: usize,
    pub changed_files: usize,
    pub added_files: usize,
    pub modified_files: usize,
    pub deleted_files: usize,
    pub renamed_files: usize,
    pub needing_toc_update: usize,
    pub deleted_source_files: usize,
    pub documents_scanned: usize,
    pub requires_full_generation: bool,
}

/// Report for `update` and `sync`
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub mode: SyncMode,
    pub project: TocProject,
    pub toc_file: String,
    pub doc_dir: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_commit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_range: Option<CommitRange>,
    /// `merge_base..target` with short hashes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<String>,
    pub changed_files: Vec<FileChange>,
    pub pages: PageClassification,
    pub needing_toc_update: Vec<UncoveredFile>,
    pub deleted_source_files: Vec<DeletedSource>,
    pub orphaned_documents: Vec<OrphanedDocument>,
    pub summary: SyncSummary,
    pub issues: IssueLog,
}

impl SyncReport {
    pub fn new(
        project: TocProject,
        toc_file: String,
        doc_dir: String,
        documents_scanned: usize,
        change_set: Option<&ChangeSet>,
        target_commit: Option<String>,
        reconciliation: Reconciliation,
    ) -> Self {
        let pages = &reconciliation.pages;
        let plans: Vec<&PagePlan> = pages.all().collect();

        let mut summary = SyncSummary {
            total_pages: plans.len(),
            new_pages: pages.new.len(),
            pages_to_update: pages.to_update.len(),
            unchanged_pages: pages.unchanged.len(),
            stale_sections: plans.iter().map(|p| p.stale_sections.len()).sum(),
            deleted_sections: plans.iter().map(|p| p.deleted_sections.len()).sum(),
            sections_scheduled: plans.iter().map(|p| p.scheduled_sections.len()).sum(),
            needing_toc_update: reconciliation.needing_toc_update.len(),
            deleted_source_files: reconciliation.deleted_source_files.len(),
            documents_scanned,
            requires_full_generation: reconciliation.mode == SyncMode::Full,
            ..Default::default()
        };

        if let Some(change_set) = change_set {
            summary.changed_files = change_set.files.len();
            summary.added_files = change_set.count(FileStatus::Added);
            summary.modified_files = change_set.count(FileStatus::Modified);
            summary.deleted_files = change_set.count(FileStatus::Deleted);
            summary.renamed_files = change_set.count(FileStatus::Renamed);
        }

        Self {
            mode: reconciliation.mode,
            project,
            toc_file,
            doc_dir,
            target_commit,
            range: change_set.map(|c| c.range.short()),
            commit_range: change_set.map(|c| c.range.clone()),
            changed_files: change_set.map(|c| c.files.clone()).unwrap_or_default(),
            pages: reconciliation.pages,
            needing_toc_update: reconciliation.needing_toc_update,
            deleted_source_files: reconciliation.deleted_source_files,
            orphaned_documents: reconciliation.orphaned_documents,
            summary,
            issues: reconciliation.issues,
        }
    }

    pub fn has_errors(&self) -> bool {
        self.issues.has_errors()
    }
}

// =============================================================================
// Evidence Reports
// =============================================================================

/// Report for `section-diff` and `git-diff`
#[derive(Debug, Clone, Serialize)]
pub struct DiffReport {
    pub base_ref: String,
    pub head_ref: String,
    pub commit_range: CommitRange,
    pub range: String,
    pub changed_files: Vec<FileChange>,
    pub files: Vec<FileEvidence>,
    pub files_processed: usize,
    pub files_with_errors: usize,
    /// Bytes of all formatted patches
    pub total_size: usize,
    pub context_lines: u32,
    pub line_numbers: bool,
    pub include_uncommitted: bool,
    pub issues: IssueLog,
}
