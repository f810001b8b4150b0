//! Documentation Structure Validator
//!
//! Checks generated documents against the TOC: identity markers, AUTOGEN
//! coverage and pairing, internal links, headings and size. Problems are
//! reported, never fixed.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use glob::Pattern;
use regex::Regex;
use serde::Serialize;
use tracing::debug;

use super::markers::{find_page_id, scan_markers};
use super::scanner::list_documents;
use crate::config::DocsConfig;
use crate::toc::{Page, SectionVisit, Toc, TocVisitor, normalize_path, walk};
use crate::types::{Issue, IssueCategory, IssueLog, Result, SyncError};

static MD_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[([^\]]+)\]\(([^)]+\.md[^)]*)\)").expect("link pattern is valid")
});

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ValidationSummary {
    pub pages_validated: usize,
    pub pages_missing: usize,
    pub sections_validated: usize,
    pub sections_missing: usize,
    pub total_errors: usize,
    pub total_warnings: usize,
    pub is_valid: bool,
}

/// Serialized as `{ summary, errors, warnings }`
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub summary: ValidationSummary,
    #[serde(flatten)]
    pub issues: IssueLog,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.summary.is_valid
    }
}

/// Expected AUTOGEN section ids per page, in TOC order
#[derive(Default)]
struct ExpectedSections {
    pages: Vec<(Option<String>, Vec<String>)>,
}

impl TocVisitor for ExpectedSections {
    fn visit_page(&mut self, page: &Page, _page_index: usize) -> Result<()> {
        self.pages.push((page.id.clone(), Vec::new()));
        Ok(())
    }

    fn visit_section(&mut self, visit: &SectionVisit<'_>) -> Result<()> {
        if let (true, Some(id), Some((_, ids))) =
            (visit.section.autogen, &visit.section.id, self.pages.last_mut())
        {
            ids.push(id.clone());
        }
        Ok(())
    }
}

pub struct Validator<'a> {
    config: &'a DocsConfig,
    errors_only: bool,
}

impl<'a> Validator<'a> {
    pub fn new(config: &'a DocsConfig) -> Self {
        Self {
            config,
            errors_only: false,
        }
    }

    pub fn errors_only(mut self, errors_only: bool) -> Self {
        self.errors_only = errors_only;
        self
    }

    pub fn validate(&self, toc: &Toc, doc_dir: &Path) -> Result<ValidationReport> {
        let mut expected = ExpectedSections::default();
        walk(toc, &mut expected)?;

        let toc_files: BTreeSet<String> = toc
            .pages
            .iter()
            .filter(|p| !p.filename.is_empty())
            .map(|p| p.filename.clone())
            .collect();

        let mut summary = ValidationSummary::default();
        let mut issues = IssueLog::new();

        for (page, (page_id, sections)) in toc.pages.iter().zip(&expected.pages) {
            if page.filename.is_empty() {
                continue;
            }

            let path = doc_dir.join(&page.filename);
            if !path.is_file() {
                summary.pages_missing += 1;
                issues.push(
                    Issue::error(IssueCategory::Toc, "Page defined in TOC but file not found")
                        .in_file(&page.filename)
                        .with_hint("Generate the missing page or remove it from the TOC"),
                );
                continue;
            }

            summary.pages_validated += 1;
            let found = self.validate_page(
                &path,
                &page.filename,
                page_id.as_deref(),
                sections,
                &toc_files,
                doc_dir,
                &mut issues,
            );
            summary.sections_validated += found;
            summary.sections_missing += sections.len() - found;
        }

        self.check_extra_files(doc_dir, &toc_files, &mut issues)?;

        if self.errors_only {
            issues.retain_errors();
        }

        summary.total_errors = issues.error_count();
        summary.total_warnings = issues.warning_count();
        summary.is_valid = summary.total_errors == 0;

        debug!(
            "Validated {} pages: {} errors, {} warnings",
            summary.pages_validated, summary.total_errors, summary.total_warnings
        );
        Ok(ValidationReport { summary, issues })
    }

    /// Returns how many expected sections were found correctly paired
    #[allow(clippy::too_many_arguments)]
    fn validate_page(
        &self,
        path: &Path,
        filename: &str,
        page_id: Option<&str>,
        expected: &[String],
        toc_files: &BTreeSet<String>,
        doc_dir: &Path,
        issues: &mut IssueLog,
    ) -> usize {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                issues.push(
                    Issue::error(IssueCategory::Structure, format!("Cannot read file: {}", e))
                        .in_file(filename),
                );
                return 0;
            }
        };

        let expected_id = page_id.unwrap_or_default();
        match find_page_id(&content, Some(self.config.page_id_scan_lines)) {
            None => issues.push(
                Issue::error(IssueCategory::PageId, "Missing PAGE_ID marker")
                    .in_file(filename)
                    .at_line(1)
                    .with_hint(format!(
                        "Add <!-- PAGE_ID: {} --> at the start of the file",
                        expected_id
                    )),
            ),
            Some((found, line)) if found != expected_id => issues.push(
                Issue::error(
                    IssueCategory::PageId,
                    format!("PAGE_ID mismatch: found '{}', expected '{}'", found, expected_id),
                )
                .in_file(filename)
                .at_line(line)
                .with_hint(format!("Change PAGE_ID to: <!-- PAGE_ID: {} -->", expected_id)),
            ),
            Some(_) => {}
        }

        let scan = scan_markers(&content);
        issues.extend(scan.problems.iter().map(|p| p.to_issue(filename)));

        let paired: BTreeSet<&str> = scan.blocks.iter().map(|b| b.id.as_str()).collect();
        let mut found = 0;
        for id in expected {
            if paired.contains(id.as_str()) {
                found += 1;
            } else {
                issues.push(
                    Issue::error(
                        IssueCategory::Autogen,
                        format!("Missing AUTOGEN section '{}' defined in TOC", id),
                    )
                    .in_file(filename)
                    .with_hint(format!(
                        "Wrap the section in BEGIN:AUTOGEN {0} / END:AUTOGEN {0} markers",
                        id
                    )),
                );
            }
        }

        let expected_set: BTreeSet<&str> = expected.iter().map(String::as_str).collect();
        for extra in paired.difference(&expected_set) {
            issues.push(
                Issue::warning(
                    IssueCategory::Autogen,
                    format!("AUTOGEN section '{}' not defined in TOC", extra),
                )
                .in_file(filename)
                .with_hint("Remove the markers or add the section to the TOC"),
            );
        }

        check_links(&content, filename, toc_files, doc_dir, issues);
        self.check_structure(&content, filename, issues);
        found
    }

    fn check_structure(&self, content: &str, filename: &str, issues: &mut IssueLog) {
        let mut in_fence = false;
        let mut h1_lines = Vec::new();
        for (i, line) in content.lines().enumerate() {
            if line.trim_start().starts_with("```") {
                in_fence = !in_fence;
                continue;
            }
            if !in_fence && line.starts_with("# ") {
                h1_lines.push(i + 1);
            }
        }

        if h1_lines.is_empty() {
            issues.push(
                Issue::error(IssueCategory::Structure, "Missing H1 heading")
                    .in_file(filename)
                    .with_hint("Add a single H1 heading (# Title) at the start of the page"),
            );
        }
        for line in h1_lines.iter().skip(1) {
            issues.push(
                Issue::warning(IssueCategory::Structure, "Multiple H1 headings found")
                    .in_file(filename)
                    .at_line(*line)
                    .with_hint("Use H2 (##) for sections, keep H1 for the page title"),
            );
        }

        if content.len() < self.config.min_page_bytes {
            issues.push(
                Issue::warning(
                    IssueCategory::Structure,
                    format!("Very small file ({} bytes)", content.len()),
                )
                .in_file(filename)
                .with_hint("Check that generation completed"),
            );
        }
    }

    fn check_extra_files(
        &self,
        doc_dir: &Path,
        toc_files: &BTreeSet<String>,
        issues: &mut IssueLog,
    ) -> Result<()> {
        if !doc_dir.is_dir() {
            return Ok(());
        }

        let pattern = Pattern::new(&self.config.glob)
            .map_err(|e| SyncError::Config(format!("docs.glob '{}': {}", self.config.glob, e)))?;

        for path in list_documents(doc_dir, &pattern)? {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            if !toc_files.contains(&name) {
                issues.push(
                    Issue::warning(IssueCategory::Toc, "File exists but is not defined in TOC")
                        .in_file(name)
                        .with_hint("Add it to the TOC or remove the file"),
                );
            }
        }
        Ok(())
    }
}

fn check_links(
    content: &str,
    filename: &str,
    toc_files: &BTreeSet<String>,
    doc_dir: &Path,
    issues: &mut IssueLog,
) {
    // a page linking the same target many times is checked against disk once
    let mut exists_cache: HashMap<String, bool> = HashMap::new();

    for (i, line) in content.lines().enumerate() {
        for caps in MD_LINK_RE.captures_iter(line) {
            let target = &caps[2];
            if target.starts_with("http://") || target.starts_with("https://") {
                continue;
            }

            let target_file = normalize_path(target.split('#').next().unwrap_or(target));
            if !toc_files.contains(&target_file) {
                issues.push(
                    Issue::warning(
                        IssueCategory::Link,
                        format!("Link to '{}' not defined in TOC", target_file),
                    )
                    .in_file(filename)
                    .at_line(i + 1)
                    .with_hint("Verify the target or update the link"),
                );
                continue;
            }

            let exists = *exists_cache
                .entry(target_file.clone())
                .or_insert_with(|| doc_dir.join(&target_file).is_file());
            if !exists {
                issues.push(
                    Issue::error(
                        IssueCategory::Link,
                        format!("Broken link: '{}' does not exist", target_file),
                    )
                    .in_file(filename)
                    .at_line(i + 1)
                    .with_hint("Generate the missing page or remove the link"),
                );
            }
        }
    }
}
