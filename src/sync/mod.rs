//! Incremental sync: reconciliation engine, orchestration and reports

mod engine;
mod report;
mod update;

pub use engine::{ChangeInput, Reconciler};
pub use report::{
    ChangeDetail, DeletedSource, DiffReport, OrphanedDocument, PageClassification, PagePlan,
    Reconciliation, ScheduleReason, ScheduledSection, SyncMode, SyncReport, SyncSummary,
    UncoveredFile,
};
pub use update::{GitDiffRequest, SectionDiffRequest, UpdateRequest, UpdateRunner, sync_structure};
