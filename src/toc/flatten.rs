//! TOC Flattener
//!
//! One depth-first, document-order walk over the TOC builds a
//! [`SectionRegistry`]: every section keyed by id with its effective
//! (inherited) source patterns already compiled. The walk itself is
//! separated from what is collected through [`TocVisitor`], so other
//! consumers (the structure validator) reuse the exact same traversal and
//! inheritance rule.

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use super::model::{Page, Section, Toc, TocProject};
use super::pattern::PatternSet;
use crate::types::{Issue, IssueCategory, IssueLog, Result, SyncError};

// =============================================================================
// Visitor
// =============================================================================

/// Position of a section in the tree handed to visitors
pub struct SectionVisit<'a> {
    pub page: &'a Page,
    pub section: &'a Section,
    /// page patterns ++ ancestor section patterns ++ own patterns
    pub effective_patterns: &'a [String],
    /// 0 for a page's top-level sections
    pub depth: usize,
    /// 1-based page position in the TOC
    pub page_index: usize,
}

pub trait TocVisitor {
    fn visit_page(&mut self, page: &Page, page_index: usize) -> Result<()>;

    fn visit_section(&mut self, visit: &SectionVisit<'_>) -> Result<()>;
}

/// Drive a visitor over the TOC in document order, accumulating patterns.
/// The first visitor error stops the walk.
pub fn walk<V: TocVisitor>(toc: &Toc, visitor: &mut V) -> Result<()> {
    for (index, page) in toc.pages.iter().enumerate() {
        visitor.visit_page(page, index + 1)?;
        walk_sections(page, index + 1, &page.sections, &page.source_files, 0, visitor)?;
    }
    Ok(())
}

fn walk_sections<V: TocVisitor>(
    page: &Page,
    page_index: usize,
    sections: &[Section],
    inherited: &[String],
    depth: usize,
    visitor: &mut V,
) -> Result<()> {
    for section in sections {
        let mut effective = inherited.to_vec();
        effective.extend(section.source_files.iter().cloned());

        visitor.visit_section(&SectionVisit {
            page,
            section,
            effective_patterns: &effective,
            depth,
            page_index,
        })?;

        walk_sections(
            page,
            page_index,
            &section.sections,
            &effective,
            depth + 1,
            visitor,
        )?;
    }
    Ok(())
}

// =============================================================================
// Registry
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct PageInfo {
    pub page_id: String,
    pub title: String,
    pub filename: String,
    pub source_patterns: PatternSet,
    pub related_pages: Vec<String>,
    /// Section ids in document order, nested sections included
    pub section_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionInfo {
    pub page_id: String,
    pub page_file: String,
    pub section_id: String,
    pub title: String,
    pub description: String,
    pub autogen: bool,
    pub source_patterns: PatternSet,
    pub diagrams_needed: bool,
    pub diagram_types: Vec<String>,
    pub depth: usize,
}

/// Flat, ordered view of the TOC
#[derive(Debug, Clone, Default)]
pub struct SectionRegistry {
    project: TocProject,
    pages: Vec<PageInfo>,
    page_index: HashMap<String, usize>,
    sections: Vec<SectionInfo>,
    section_index: HashMap<String, usize>,
    issues: IssueLog,
}

impl SectionRegistry {
    /// Flatten a TOC. Duplicate or missing page ids, duplicate section ids and
    /// invalid patterns are fatal; sections without an id are skipped with a warning.
    pub fn build(toc: &Toc) -> Result<Self> {
        let mut registry = Self {
            project: toc.project.clone(),
            ..Default::default()
        };

        if !toc.project.updated_at_is_valid() {
            registry.issues.push(
                Issue::warning(
                    IssueCategory::Toc,
                    format!(
                        "project.updated_at '{}' is not an RFC 3339 timestamp or YYYY-MM-DD date",
                        toc.project.updated_at.as_deref().unwrap_or_default()
                    ),
                )
                .with_hint("the value is kept verbatim"),
            );
        }

        walk(toc, &mut registry)?;

        debug!(
            "Flattened TOC: {} pages, {} sections",
            registry.pages.len(),
            registry.sections.len()
        );
        Ok(registry)
    }

    pub fn project(&self) -> &TocProject {
        &self.project
    }

    /// Pages in TOC order
    pub fn pages(&self) -> &[PageInfo] {
        &self.pages
    }

    pub fn page(&self, page_id: &str) -> Option<&PageInfo> {
        self.page_index.get(page_id).map(|&i| &self.pages[i])
    }

    /// All sections in document order
    pub fn sections(&self) -> &[SectionInfo] {
        &self.sections
    }

    pub fn section(&self, section_id: &str) -> Option<&SectionInfo> {
        self.section_index.get(section_id).map(|&i| &self.sections[i])
    }

    /// Sections of one page in document order
    pub fn sections_of<'a>(&'a self, page: &'a PageInfo) -> impl Iterator<Item = &'a SectionInfo> {
        page.section_ids.iter().filter_map(|id| self.section(id))
    }

    /// Is the path matched by any section's effective patterns?
    ///
    /// Page patterns count only through the sections that inherit them.
    pub fn covers(&self, path: &str) -> bool {
        self.sections.iter().any(|s| s.source_patterns.matches(path))
    }

    /// Warnings produced while flattening
    pub fn issues(&self) -> &IssueLog {
        &self.issues
    }
}

impl TocVisitor for SectionRegistry {
    fn visit_page(&mut self, page: &Page, page_index: usize) -> Result<()> {
        let page_id = page.id.clone().ok_or_else(|| SyncError::MissingIdentifier {
            context: if page.title.is_empty() {
                format!("page #{} has no id", page_index)
            } else {
                format!("page #{} ('{}') has no id", page_index, page.title)
            },
        })?;

        if self.page_index.contains_key(&page_id) {
            return Err(SyncError::DuplicatePage { id: page_id });
        }

        let source_patterns = PatternSet::compile(&page_id, &page.source_files)?;
        self.page_index.insert(page_id.clone(), self.pages.len());
        self.pages.push(PageInfo {
            page_id,
            title: page.title.clone(),
            filename: page.filename.clone(),
            source_patterns,
            related_pages: page.related_pages.clone(),
            section_ids: Vec::new(),
        });
        Ok(())
    }

    fn visit_section(&mut self, visit: &SectionVisit<'_>) -> Result<()> {
        // visit_page already rejected pages without an id
        let page_slot = self.pages.len() - 1;
        let page_id = self.pages[page_slot].page_id.clone();

        let Some(section_id) = visit.section.id.clone() else {
            let label = if visit.section.title.is_empty() {
                "untitled section".to_string()
            } else {
                format!("section '{}'", visit.section.title)
            };
            self.issues.push(
                Issue::warning(
                    IssueCategory::Toc,
                    format!("{} in page '{}' has no id and is skipped", label, page_id),
                )
                .with_hint("nested sections still inherit its source_files"),
            );
            return Ok(());
        };

        if let Some(&existing) = self.section_index.get(&section_id) {
            return Err(SyncError::DuplicateSection {
                id: section_id,
                first_page: self.sections[existing].page_id.clone(),
                second_page: page_id,
            });
        }

        let source_patterns = PatternSet::compile(&section_id, visit.effective_patterns)?;

        self.section_index
            .insert(section_id.clone(), self.sections.len());
        self.pages[page_slot].section_ids.push(section_id.clone());
        self.sections.push(SectionInfo {
            page_id,
            page_file: visit.page.filename.clone(),
            section_id,
            title: visit.section.title.clone(),
            description: visit.section.description.clone(),
            autogen: visit.section.autogen,
            source_patterns,
            diagrams_needed: visit.section.diagrams_needed,
            diagram_types: visit.section.diagram_types.clone(),
            depth: visit.depth,
        });
        Ok(())
    }
}
