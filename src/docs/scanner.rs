//! Artifact Scanner
//!
//! Reads previously generated documents and records, per PAGE_ID, which
//! AUTOGEN sections exist and which of them are empty.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use glob::Pattern;
use serde::Serialize;
use tracing::{debug, warn};

use super::markers::{find_page_id, is_content_empty, scan_markers};
use crate::config::DocsConfig;
use crate::types::{Issue, IssueCategory, IssueLog, Result, SyncError};

/// What one generated document currently contains
#[derive(Debug, Clone, Serialize)]
pub struct DocumentRecord {
    pub page_id: String,
    pub file_path: PathBuf,
    pub filename: String,
    /// Sections with a correctly paired BEGIN/END
    pub sections: BTreeSet<String>,
    /// Subset of `sections` with no real content
    pub empty_sections: BTreeSet<String>,
    /// Marker problems found in this document
    pub issues: Vec<Issue>,
    pub structurally_valid: bool,
    #[serde(skip)]
    pub section_contents: BTreeMap<String, String>,
}

impl DocumentRecord {
    /// Build a record from document text; `None` when it carries no PAGE_ID
    pub fn from_content(file_path: &Path, content: &str) -> Option<Self> {
        let (page_id, _) = find_page_id(content, None)?;
        let filename = file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let scan = scan_markers(content);
        let issues: Vec<Issue> = scan
            .problems
            .iter()
            .map(|p| p.to_issue(&filename))
            .collect();

        let mut sections = BTreeSet::new();
        let mut empty_sections = BTreeSet::new();
        let mut section_contents = BTreeMap::new();
        for block in scan.blocks {
            if is_content_empty(&block.content) {
                empty_sections.insert(block.id.clone());
            }
            sections.insert(block.id.clone());
            section_contents.insert(block.id, block.content);
        }

        Some(Self {
            page_id,
            file_path: file_path.to_path_buf(),
            filename,
            sections,
            empty_sections,
            structurally_valid: issues.is_empty(),
            issues,
            section_contents,
        })
    }

    /// Sections that exist and have content
    pub fn filled_sections(&self) -> impl Iterator<Item = &String> {
        self.sections.difference(&self.empty_sections)
    }

    pub fn section_content(&self, section_id: &str) -> Option<&str> {
        self.section_contents.get(section_id).map(String::as_str)
    }
}

/// Scanned documents keyed by PAGE_ID
#[derive(Debug, Clone, Default)]
pub struct DocumentSet {
    documents: BTreeMap<String, DocumentRecord>,
    issues: IssueLog,
}

impl DocumentSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record. A second document claiming an existing PAGE_ID is
    /// reported and ignored.
    pub fn insert(&mut self, record: DocumentRecord) {
        if let Some(existing) = self.documents.get(&record.page_id) {
            self.issues.push(
                Issue::error(
                    IssueCategory::PageId,
                    format!(
                        "PAGE_ID '{}' is also claimed by '{}'; this file is ignored",
                        record.page_id, existing.filename
                    ),
                )
                .in_file(&record.filename)
                .with_hint("Each page must be generated into exactly one file"),
            );
            return;
        }

        self.issues.extend(record.issues.iter().cloned());
        self.documents.insert(record.page_id.clone(), record);
    }

    pub fn get(&self, page_id: &str) -> Option<&DocumentRecord> {
        self.documents.get(page_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DocumentRecord> {
        self.documents.values()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Scanner findings plus every document's marker problems
    pub fn issues(&self) -> &IssueLog {
        &self.issues
    }
}

/// Scan the documentation directory (non-recursive, sorted by file name).
/// A missing directory yields an empty set.
pub fn scan_documents(doc_dir: &Path, config: &DocsConfig) -> Result<DocumentSet> {
    let mut set = DocumentSet::new();

    if !doc_dir.is_dir() {
        debug!("Documentation directory {} does not exist", doc_dir.display());
        return Ok(set);
    }

    let pattern = Pattern::new(&config.glob)
        .map_err(|e| SyncError::Config(format!("docs.glob '{}': {}", config.glob, e)))?;

    for path in list_documents(doc_dir, &pattern)? {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let content = match fs::read(&path) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => {
                warn!("Cannot read {}: {}", path.display(), e);
                set.issues.push(
                    Issue::error(IssueCategory::Structure, format!("Cannot read file: {}", e))
                        .in_file(&filename),
                );
                continue;
            }
        };

        match DocumentRecord::from_content(&path, &content) {
            Some(record) => set.insert(record),
            None => set.issues.push(
                Issue::warning(IssueCategory::PageId, "No PAGE_ID marker; document skipped")
                    .in_file(&filename)
                    .with_hint("Add <!-- PAGE_ID: <page-id> --> at the start of the file"),
            ),
        }
    }

    debug!(
        "Scanned {}: {} documents, {} issues",
        doc_dir.display(),
        set.len(),
        set.issues.len()
    );
    Ok(set)
}

/// Regular files directly under `dir` whose name matches `pattern`, sorted
pub fn list_documents(dir: &Path, pattern: &Pattern) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if pattern.matches(&entry.file_name().to_string_lossy()) {
            paths.push(entry.path());
        }
    }
    paths.sort();
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn test_scan_classifies_sections() {
        let temp_dir = TempDir::new().unwrap();
        write(
            temp_dir.path(),
            "p1.md",
            "<!-- PAGE_ID: p1 -->\n# P1\n<!-- BEGIN:AUTOGEN s1 -->\nbody\n<!-- END:AUTOGEN s1 -->\n<!-- BEGIN:AUTOGEN s2 -->\n---\n<!-- END:AUTOGEN s2 -->\n",
        );
        write(temp_dir.path(), "notes.txt", "<!-- PAGE_ID: ignored -->");

        let set = scan_documents(temp_dir.path(), &DocsConfig::default()).unwrap();
        assert_eq!(set.len(), 1);

        let doc = set.get("p1").unwrap();
        assert_eq!(doc.filename, "p1.md");
        assert!(doc.structurally_valid);
        assert_eq!(doc.sections.len(), 2);
        assert!(doc.empty_sections.contains("s2"));
        assert_eq!(doc.filled_sections().collect::<Vec<_>>(), vec!["s1"]);
        assert_eq!(doc.section_content("s1"), Some("body\n"));
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let set = scan_documents(&temp_dir.path().join("missing"), &DocsConfig::default()).unwrap();
        assert!(set.is_empty());
        assert!(set.issues().is_empty());
    }

    #[test]
    fn test_document_without_page_id_is_warning() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), "loose.md", "# Loose\n");

        let set = scan_documents(temp_dir.path(), &DocsConfig::default()).unwrap();
        assert!(set.is_empty());
        assert_eq!(set.issues().warning_count(), 1);
    }

    #[test]
    fn test_duplicate_page_id_first_file_wins() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), "a.md", "<!-- PAGE_ID: p1 -->\n");
        write(temp_dir.path(), "b.md", "<!-- PAGE_ID: p1 -->\n");

        let set = scan_documents(temp_dir.path(), &DocsConfig::default()).unwrap();
        assert_eq!(set.get("p1").unwrap().filename, "a.md");
        assert_eq!(set.issues().error_count(), 1);
    }

    #[test]
    fn test_structural_problems_are_reported() {
        let temp_dir = TempDir::new().unwrap();
        write(
            temp_dir.path(),
            "p1.md",
            "<!-- PAGE_ID: p1 -->\n<!-- BEGIN:AUTOGEN s1 -->\nunterminated\n",
        );

        let set = scan_documents(temp_dir.path(), &DocsConfig::default()).unwrap();
        let doc = set.get("p1").unwrap();
        assert!(!doc.structurally_valid);
        assert!(doc.sections.is_empty());
        assert_eq!(set.issues().error_count(), 1);
    }
}
