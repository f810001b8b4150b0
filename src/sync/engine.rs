//! Reconciliation Engine
//!
//! A pure function of three inputs: the flattened TOC, the scanned documents
//! and (optionally) a change-set. It never touches the filesystem or git, so
//! the same inputs always produce the same [`Reconciliation`].
//!
//! Per page:
//! - no document: the page is new and every section is scheduled
//! - broken markers: the whole page is regenerated
//! - otherwise: stale = TOC sections - filled document sections,
//!   deleted = document sections - TOC sections, and in incremental mode
//!   every autogen section whose patterns match a changed file is scheduled

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use super::report::{
    ChangeDetail, DeletedSource, OrphanedDocument, PageClassification, PagePlan, Reconciliation,
    ScheduleReason, ScheduledSection, SyncMode, UncoveredFile,
};
use crate::docs::{DocumentRecord, DocumentSet};
use crate::git::{ChangeSet, FileChange, FileStatus};
use crate::toc::{PageInfo, SectionInfo, SectionRegistry};
use crate::types::{Issue, IssueCategory, IssueLog};

/// What the engine knows about source changes
#[derive(Debug, Clone, Copy)]
pub enum ChangeInput<'a> {
    /// No reference commit: regenerate everything
    Full,
    /// Markers only
    Structural,
    Incremental(&'a ChangeSet),
}

impl ChangeInput<'_> {
    pub fn mode(&self) -> SyncMode {
        match self {
            Self::Full => SyncMode::Full,
            Self::Structural => SyncMode::Structural,
            Self::Incremental(_) => SyncMode::Incremental,
        }
    }

    fn changes(&self) -> &[FileChange] {
        match self {
            Self::Incremental(change_set) => change_set.files.as_slice(),
            _ => &[],
        }
    }
}

pub struct Reconciler<'a> {
    registry: &'a SectionRegistry,
    documents: &'a DocumentSet,
}

impl<'a> Reconciler<'a> {
    pub fn new(registry: &'a SectionRegistry, documents: &'a DocumentSet) -> Self {
        Self {
            registry,
            documents,
        }
    }

    pub fn reconcile(&self, input: ChangeInput<'_>) -> Reconciliation {
        let mode = input.mode();
        let mut pages = PageClassification::default();

        for page in self.registry.pages() {
            let document = self.documents.get(&page.page_id);
            let plan = self.plan_page(page, document, &input);

            match document {
                None => pages.new.push(plan),
                Some(_) if mode == SyncMode::Full => pages.to_update.push(plan),
                Some(_) if needs_update(&plan) => pages.to_update.push(plan),
                Some(_) => pages.unchanged.push(plan),
            }
        }

        debug!(
            "Reconciled {} pages ({:?}): {} new, {} to update, {} unchanged",
            self.registry.pages().len(),
            mode,
            pages.new.len(),
            pages.to_update.len(),
            pages.unchanged.len()
        );

        let mut issues = IssueLog::new();
        issues.extend(self.registry.issues().iter().cloned());
        issues.extend(self.documents.issues().iter().cloned());

        let orphaned_documents = self.orphaned_documents();
        for orphan in &orphaned_documents {
            issues.push(
                Issue::warning(
                    IssueCategory::PageId,
                    format!("Document has PAGE_ID '{}' which is not in the TOC", orphan.page_id),
                )
                .in_file(&orphan.filename)
                .with_hint("Remove the file or add the page back to the TOC"),
            );
        }

        let (needing_toc_update, deleted_source_files) = match input {
            ChangeInput::Incremental(change_set) => (
                self.uncovered_files(change_set),
                self.deleted_sources(change_set),
            ),
            _ => (Vec::new(), Vec::new()),
        };

        Reconciliation {
            mode,
            pages,
            needing_toc_update,
            deleted_source_files,
            orphaned_documents,
            issues,
        }
    }

    fn plan_page(
        &self,
        page: &PageInfo,
        document: Option<&DocumentRecord>,
        input: &ChangeInput<'_>,
    ) -> PagePlan {
        let sections: Vec<&SectionInfo> = self.registry.sections_of(page).collect();
        let requires_full_regeneration = document.is_some_and(|d| !d.structurally_valid);

        let mut stale_sections = Vec::new();
        let mut present_sections = Vec::new();
        for section in &sections {
            let filled = document.is_some_and(|d| {
                d.structurally_valid && d.filled_sections().any(|id| *id == section.section_id)
            });
            if filled {
                present_sections.push(section.section_id.clone());
            } else {
                stale_sections.push(section.section_id.clone());
            }
        }

        let toc_ids: BTreeSet<&str> = sections.iter().map(|s| s.section_id.as_str()).collect();
        let deleted_sections: Vec<String> = document
            .map(|d| {
                d.sections
                    .iter()
                    .filter(|id| !toc_ids.contains(id.as_str()))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        let scheduled_sections = sections
            .iter()
            .filter_map(|section| {
                let stale = stale_sections.contains(&section.section_id);
                schedule_section(section, stale, document, input)
            })
            .collect();

        PagePlan {
            page_id: page.page_id.clone(),
            title: page.title.clone(),
            filename: page.filename.clone(),
            document: document.map(|d| d.filename.clone()),
            requires_full_regeneration,
            stale_sections,
            present_sections,
            deleted_sections,
            scheduled_sections,
            related_pages: page.related_pages.clone(),
        }
    }

    fn orphaned_documents(&self) -> Vec<OrphanedDocument> {
        self.documents
            .iter()
            .filter(|d| self.registry.page(&d.page_id).is_none())
            .map(|d| OrphanedDocument {
                page_id: d.page_id.clone(),
                filename: d.filename.clone(),
            })
            .collect()
    }

    fn uncovered_files(&self, change_set: &ChangeSet) -> Vec<UncoveredFile> {
        let mut uncovered: Vec<UncoveredFile> = change_set
            .with_status(FileStatus::Added)
            .filter(|change| !self.registry.covers(&change.path))
            .map(|change| UncoveredFile {
                path: change.path.clone(),
                status: change.status,
            })
            .collect();
        uncovered.sort_by(|a, b| a.path.cmp(&b.path));
        uncovered.dedup();
        uncovered
    }

    fn deleted_sources(&self, change_set: &ChangeSet) -> Vec<DeletedSource> {
        let mut deleted: BTreeMap<&str, Vec<String>> = BTreeMap::new();
        for change in change_set.with_status(FileStatus::Deleted) {
            let affected = self
                .registry
                .sections()
                .iter()
                .filter(|s| s.source_patterns.matches(&change.path))
                .map(|s| s.section_id.clone())
                .collect::<Vec<_>>();
            if !affected.is_empty() {
                deleted.insert(&change.path, affected);
            }
        }

        deleted
            .into_iter()
            .map(|(path, affected_sections)| DeletedSource {
                path: path.to_string(),
                affected_sections,
            })
            .collect()
    }
}

fn needs_update(plan: &PagePlan) -> bool {
    plan.requires_full_regeneration
        || !plan.stale_sections.is_empty()
        || !plan.deleted_sections.is_empty()
        || !plan.scheduled_sections.is_empty()
}

fn schedule_section(
    section: &SectionInfo,
    stale: bool,
    document: Option<&DocumentRecord>,
    input: &ChangeInput<'_>,
) -> Option<ScheduledSection> {
    let mut reasons = BTreeSet::new();
    if stale {
        reasons.insert(ScheduleReason::Stale);
    }

    let matched = match input {
        ChangeInput::Incremental(_) => attribute(section, input.changes()),
        _ => Vec::new(),
    };
    for change in &matched {
        if change.status.is_deleted() {
            reasons.insert(ScheduleReason::SourcesDeleted);
        } else {
            reasons.insert(ScheduleReason::SourcesChanged);
        }
    }

    if matches!(input, ChangeInput::Full) {
        reasons.insert(ScheduleReason::FullGeneration);
    }

    if reasons.is_empty() {
        return None;
    }

    let mut matched_files: Vec<String> = matched.iter().map(|c| c.path.clone()).collect();
    matched_files.dedup();

    Some(ScheduledSection {
        section_id: section.section_id.clone(),
        title: section.title.clone(),
        description: section.description.clone(),
        depth: section.depth,
        autogen: section.autogen,
        diagrams_needed: section.diagrams_needed,
        diagram_types: section.diagram_types.clone(),
        source_patterns: section.source_patterns.clone(),
        reasons: reasons.into_iter().collect(),
        matched_files,
        change_details: matched
            .into_iter()
            .map(|change| ChangeDetail {
                change,
                evidence: None,
            })
            .collect(),
        current_content: document
            .and_then(|d| d.section_content(&section.section_id))
            .map(str::to_string),
    })
}

/// Changes touching an autogen section's patterns, sorted by path.
/// A rename matches on either side.
fn attribute(section: &SectionInfo, changes: &[FileChange]) -> Vec<FileChange> {
    if !section.autogen || section.source_patterns.is_empty() {
        return Vec::new();
    }

    let mut matched: Vec<FileChange> = changes
        .iter()
        .filter(|change| change.paths().any(|p| section.source_patterns.matches(p)))
        .cloned()
        .collect();
    matched.sort();
    matched.dedup();
    matched
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use proptest::prelude::*;

    use super::*;
    use crate::git::CommitRange;
    use crate::toc::TocLoader;

    const TOC: &str = r#"
project:
  name: demo
  ref_commit_hash: abc1234
pages:
  - id: P1
    title: Core
    filename: core.md
    sections:
      - id: S1
        source_files: [lib/core.go]
      - id: S2
        source_files: [docs/]
  - id: P2
    title: Guide
    filename: guide.md
    sections:
      - id: G1
        autogen: false
        source_files: ["*.md"]
"#;

    fn registry(yaml: &str) -> SectionRegistry {
        SectionRegistry::build(&TocLoader::parse(yaml).unwrap()).unwrap()
    }

    fn doc(filename: &str, content: &str) -> DocumentRecord {
        DocumentRecord::from_content(Path::new(filename), content).unwrap()
    }

    fn section(id: &str, body: &str) -> String {
        format!("<!-- BEGIN:AUTOGEN {id} -->\n{body}\n<!-- END:AUTOGEN {id} -->\n")
    }

    fn page(id: &str, sections: &[(&str, &str)]) -> String {
        let mut content = format!("<!-- PAGE_ID: {id} -->\n# Title\n\n");
        for (section_id, body) in sections {
            content.push_str(&section(section_id, body));
        }
        content
    }

    fn documents(records: Vec<DocumentRecord>) -> DocumentSet {
        let mut set = DocumentSet::new();
        for record in records {
            set.insert(record);
        }
        set
    }

    fn change_set(files: Vec<FileChange>) -> ChangeSet {
        ChangeSet {
            range: CommitRange {
                base: "abc1234".to_string(),
                target: "def5678".to_string(),
                merge_base: "abc1234".to_string(),
                merge_base_fallback: false,
            },
            files,
        }
    }

    fn synced_docs() -> DocumentSet {
        documents(vec![
            doc("core.md", &page("P1", &[("S1", "core text"), ("S2", "docs text")])),
            doc("guide.md", &page("P2", &[("G1", "guide text")])),
        ])
    }

    #[test]
    fn test_modified_source_schedules_section() {
        let registry = registry(TOC);
        let docs = synced_docs();
        let changes = change_set(vec![FileChange::new("lib/core.go", FileStatus::Modified)]);

        let result = Reconciler::new(&registry, &docs).reconcile(ChangeInput::Incremental(&changes));

        assert_eq!(result.mode, SyncMode::Incremental);
        assert_eq!(result.pages.to_update.len(), 1);
        let p1 = &result.pages.to_update[0];
        assert_eq!(p1.page_id, "P1");
        assert!(p1.stale_sections.is_empty());

        let s1 = p1.scheduled("S1").unwrap();
        assert_eq!(s1.matched_files, vec!["lib/core.go"]);
        assert_eq!(s1.reasons, vec![ScheduleReason::SourcesChanged]);
        assert_eq!(s1.current_content.as_deref(), Some("core text\n"));
        assert!(p1.scheduled("S2").is_none());

        assert_eq!(result.pages.unchanged.len(), 1);
        assert_eq!(result.pages.unchanged[0].page_id, "P2");
    }

    #[test]
    fn test_horizontal_rule_only_section_is_stale() {
        let registry = registry(TOC);
        let docs = documents(vec![
            doc("core.md", &page("P1", &[("S1", "  \n---\n\n---"), ("S2", "docs text")])),
            doc("guide.md", &page("P2", &[("G1", "guide text")])),
        ]);

        for changes in [vec![], vec![FileChange::new("lib/core.go", FileStatus::Modified)]] {
            let changes = change_set(changes);
            let result =
                Reconciler::new(&registry, &docs).reconcile(ChangeInput::Incremental(&changes));
            let p1 = result.pages.find("P1").unwrap();
            assert_eq!(p1.stale_sections, vec!["S1"]);
            assert_eq!(p1.present_sections, vec!["S2"]);
            assert!(p1.scheduled("S1").unwrap().has_reason(ScheduleReason::Stale));
        }
    }

    #[test]
    fn test_deleted_only_source_keeps_section_scheduled() {
        let registry = registry(TOC);
        let docs = synced_docs();
        let changes = change_set(vec![FileChange::new("lib/core.go", FileStatus::Deleted)]);

        let result = Reconciler::new(&registry, &docs).reconcile(ChangeInput::Incremental(&changes));
        let p1 = result.pages.find("P1").unwrap();
        let s1 = p1.scheduled("S1").unwrap();

        assert_eq!(s1.reasons, vec![ScheduleReason::SourcesDeleted]);
        assert_eq!(s1.matched_files, vec!["lib/core.go"]);
        assert!(p1.stale_sections.is_empty());
        assert!(p1.scheduled("S2").is_none());

        assert_eq!(
            result.deleted_source_files,
            vec![DeletedSource {
                path: "lib/core.go".to_string(),
                affected_sections: vec!["S1".to_string()],
            }]
        );
    }

    #[test]
    fn test_unreferenced_deleted_file_is_not_reported() {
        let registry = registry(TOC);
        let docs = synced_docs();
        let changes = change_set(vec![
            FileChange::new("scripts/old.sh", FileStatus::Deleted),
            FileChange::new("docs/intro.txt", FileStatus::Deleted),
        ]);

        let result = Reconciler::new(&registry, &docs).reconcile(ChangeInput::Incremental(&changes));

        assert_eq!(
            result.deleted_source_files,
            vec![DeletedSource {
                path: "docs/intro.txt".to_string(),
                affected_sections: vec!["S2".to_string()],
            }]
        );
        let report = crate::sync::SyncReport::new(
            Default::default(),
            "toc.yaml".to_string(),
            "docs".to_string(),
            docs.len(),
            Some(&changes),
            None,
            result,
        );
        assert_eq!(report.summary.deleted_files, 2);
        assert_eq!(report.summary.deleted_source_files, 1);
    }

    #[test]
    fn test_page_patterns_without_sections_do_not_cover_added_files() {
        let registry = registry(
            "pages:\n  - id: P1\n    filename: p1.md\n    source_files: [tools/]\n",
        );
        let docs = DocumentSet::new();
        let changes = change_set(vec![FileChange::new("tools/gen.sh", FileStatus::Added)]);

        let result = Reconciler::new(&registry, &docs).reconcile(ChangeInput::Incremental(&changes));

        assert_eq!(result.needing_toc_update.len(), 1);
        assert_eq!(result.needing_toc_update[0].path, "tools/gen.sh");
    }

    #[test]
    fn test_new_page_and_deleted_sections() {
        let registry = registry(TOC);
        let docs = documents(vec![doc(
            "core.md",
            &page("P1", &[("S1", "x"), ("S2", "y"), ("OLD", "z")]),
        )]);

        let result = Reconciler::new(&registry, &docs).reconcile(ChangeInput::Structural);

        assert_eq!(result.pages.new.len(), 1);
        let p2 = &result.pages.new[0];
        assert_eq!(p2.stale_sections, vec!["G1"]);
        assert_eq!(p2.scheduled_sections.len(), 1);
        assert!(p2.document.is_none());

        let p1 = &result.pages.to_update[0];
        assert_eq!(p1.deleted_sections, vec!["OLD"]);
        assert!(p1.scheduled_sections.is_empty());
    }

    #[test]
    fn test_non_autogen_and_uncovered_files() {
        let registry = registry(TOC);
        let docs = synced_docs();
        let changes = change_set(vec![
            FileChange::new("README.md", FileStatus::Modified),
            FileChange::new("tools/new.py", FileStatus::Added),
            FileChange::new("docs/intro.txt", FileStatus::Added),
        ]);

        let result = Reconciler::new(&registry, &docs).reconcile(ChangeInput::Incremental(&changes));

        // G1 is not autogen, so README.md does not schedule it
        assert!(result.pages.find("P2").unwrap().scheduled_sections.is_empty());
        assert_eq!(
            result.needing_toc_update,
            vec![UncoveredFile {
                path: "tools/new.py".to_string(),
                status: FileStatus::Added,
            }]
        );
        let s2 = result.pages.find("P1").unwrap().scheduled("S2").unwrap();
        assert_eq!(s2.matched_files, vec!["docs/intro.txt"]);
    }

    #[test]
    fn test_rename_matches_old_path() {
        let registry = registry(TOC);
        let docs = synced_docs();
        let changes = change_set(vec![FileChange::renamed("lib/core.go", "lib/engine.go")]);

        let result = Reconciler::new(&registry, &docs).reconcile(ChangeInput::Incremental(&changes));
        let s1 = result.pages.find("P1").unwrap().scheduled("S1").unwrap();
        assert_eq!(s1.matched_files, vec!["lib/engine.go"]);
        assert_eq!(s1.reasons, vec![ScheduleReason::SourcesChanged]);
    }

    #[test]
    fn test_broken_markers_require_full_regeneration() {
        let registry = registry(TOC);
        let broken = "<!-- PAGE_ID: P1 -->\n<!-- BEGIN:AUTOGEN S1 -->\ntext\n";
        let docs = documents(vec![
            doc("core.md", broken),
            doc("guide.md", &page("P2", &[("G1", "guide text")])),
        ]);

        let result = Reconciler::new(&registry, &docs).reconcile(ChangeInput::Structural);
        let p1 = &result.pages.to_update[0];

        assert!(p1.requires_full_regeneration);
        assert_eq!(p1.stale_sections, vec!["S1", "S2"]);
        assert!(p1.present_sections.is_empty());
        assert!(result.issues.has_errors());
    }

    #[test]
    fn test_full_mode_schedules_everything() {
        let registry = registry(TOC);
        let docs = documents(vec![doc("core.md", &page("P1", &[("S1", "x"), ("S2", "y")]))]);

        let result = Reconciler::new(&registry, &docs).reconcile(ChangeInput::Full);

        assert_eq!(result.mode, SyncMode::Full);
        assert_eq!(result.pages.to_update.len(), 1);
        assert_eq!(result.pages.new.len(), 1);
        assert!(result.pages.unchanged.is_empty());
        for plan in result.pages.all() {
            for section in &plan.scheduled_sections {
                assert!(section.has_reason(ScheduleReason::FullGeneration));
            }
        }
        assert_eq!(result.pages.to_update[0].scheduled_sections.len(), 2);
        assert!(result.needing_toc_update.is_empty());
    }

    #[test]
    fn test_orphaned_documents_are_reported() {
        let registry = registry(TOC);
        let mut records = vec![doc("stray.md", &page("GONE", &[("X", "x")]))];
        records.push(doc("core.md", &page("P1", &[("S1", "x"), ("S2", "y")])));
        let docs = documents(records);

        let result = Reconciler::new(&registry, &docs).reconcile(ChangeInput::Structural);
        assert_eq!(
            result.orphaned_documents,
            vec![OrphanedDocument {
                page_id: "GONE".to_string(),
                filename: "stray.md".to_string(),
            }]
        );
        assert_eq!(result.issues.warning_count(), 1);
    }

    #[test]
    fn test_report_is_byte_identical_on_rerun() {
        let registry = registry(TOC);
        let docs = synced_docs();
        let changes = change_set(vec![
            FileChange::new("lib/core.go", FileStatus::Modified),
            FileChange::new("docs/a.md", FileStatus::Deleted),
            FileChange::new("x/y.rs", FileStatus::Added),
        ]);

        let reconciler = Reconciler::new(&registry, &docs);
        let first = serde_json::to_string(&reconciler.reconcile(ChangeInput::Incremental(&changes))).unwrap();
        let second = serde_json::to_string(&reconciler.reconcile(ChangeInput::Incremental(&changes))).unwrap();
        assert_eq!(first, second);
    }

    fn status() -> impl Strategy<Value = FileStatus> {
        prop_oneof![
            Just(FileStatus::Added),
            Just(FileStatus::Modified),
            Just(FileStatus::Deleted),
        ]
    }

    proptest! {
        #[test]
        fn prop_every_toc_section_in_exactly_one_bucket(
            present in proptest::collection::btree_set(prop_oneof![Just("S1"), Just("S2"), Just("OLD")], 0..3),
            empty_s1 in any::<bool>(),
            files in proptest::collection::vec(
                (prop_oneof![Just("lib/core.go"), Just("docs/a.md"), Just("misc/b.rs")], status()),
                0..4,
            ),
        ) {
            let registry = registry(TOC);
            let sections: Vec<(&str, &str)> = present
                .iter()
                .map(|id| (*id, if *id == "S1" && empty_s1 { "---" } else { "body" }))
                .collect();
            let docs = documents(vec![doc("core.md", &page("P1", &sections))]);
            let changes = change_set(
                files.into_iter().map(|(p, s)| FileChange::new(p, s)).collect(),
            );

            let result = Reconciler::new(&registry, &docs).reconcile(ChangeInput::Incremental(&changes));
            let p1 = result.pages.find("P1").unwrap();

            for id in ["S1", "S2"] {
                let in_stale = p1.stale_sections.iter().any(|s| s == id);
                let in_present = p1.present_sections.iter().any(|s| s == id);
                prop_assert!(in_stale != in_present);
                prop_assert!(!p1.deleted_sections.iter().any(|s| s == id));
            }
            for deleted in &p1.deleted_sections {
                prop_assert!(!p1.stale_sections.contains(deleted));
                prop_assert!(!p1.present_sections.contains(deleted));
            }
            for stale in &p1.stale_sections {
                prop_assert!(p1.scheduled(stale).is_some());
            }
        }
    }
}
