//! Non-fatal findings collected during a run.
//!
//! Artifact structure problems, per-file diff failures and specification
//! warnings never abort reconciliation; they are recorded here and emitted
//! with the report, partitioned by severity.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum IssueCategory {
    /// TOC content that is suspicious but not fatal
    Toc,
    /// PAGE_ID identity marker
    PageId,
    /// BEGIN/END AUTOGEN markers
    Autogen,
    /// Document layout (headings, size)
    Structure,
    /// Internal markdown links
    Link,
    /// Commit range resolution
    ChangeSet,
    /// Per-file patch collection
    Diff,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Issue {
    pub severity: IssueSeverity,
    pub category: IssueCategory,
    pub file: Option<String>,
    pub line: Option<usize>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl Issue {
    pub fn error(category: IssueCategory, message: impl Into<String>) -> Self {
        Self::new(IssueSeverity::Error, category, message)
    }

    pub fn warning(category: IssueCategory, message: impl Into<String>) -> Self {
        Self::new(IssueSeverity::Warning, category, message)
    }

    fn new(severity: IssueSeverity, category: IssueCategory, message: impl Into<String>) -> Self {
        Self {
            severity,
            category,
            file: None,
            line: None,
            message: message.into(),
            hint: None,
        }
    }

    pub fn in_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == IssueSeverity::Error
    }
}

/// Ordered collection of issues, serialized as `{ errors, warnings }`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueLog {
    issues: Vec<Issue>,
}

impl IssueLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, issue: Issue) {
        match issue.severity {
            IssueSeverity::Error => tracing::debug!("issue (error): {}", issue.message),
            IssueSeverity::Warning => tracing::debug!("issue (warning): {}", issue.message),
        }
        self.issues.push(issue);
    }

    pub fn extend(&mut self, issues: impl IntoIterator<Item = Issue>) {
        for issue in issues {
            self.push(issue);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(|i| i.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(|i| !i.is_error())
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }

    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(Issue::is_error)
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    /// Drop every warning, keeping errors in order
    pub fn retain_errors(&mut self) {
        self.issues.retain(Issue::is_error);
    }
}

#[derive(Serialize, Deserialize)]
struct PartitionedIssues {
    errors: Vec<Issue>,
    warnings: Vec<Issue>,
}

impl Serialize for IssueLog {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        PartitionedIssues {
            errors: self.errors().cloned().collect(),
            warnings: self.warnings().cloned().collect(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for IssueLog {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let parts = PartitionedIssues::deserialize(deserializer)?;
        let mut issues = parts.errors;
        issues.extend(parts.warnings);
        Ok(Self { issues })
    }
}
