//! Change-set types

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::git::SHORT_HASH_LEN;
use crate::types::{Result, SyncError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FileStatus {
    #[serde(rename = "A")]
    Added,
    #[serde(rename = "M")]
    Modified,
    #[serde(rename = "D")]
    Deleted,
    #[serde(rename = "R")]
    Renamed,
}

impl FileStatus {
    /// Map a `git diff --name-status` letter. Copies count as additions and
    /// type changes as modifications.
    pub fn from_git(status: &str) -> Self {
        match status.chars().next() {
            Some('A') | Some('C') => Self::Added,
            Some('M') | Some('T') => Self::Modified,
            Some('D') => Self::Deleted,
            Some('R') => Self::Renamed,
            _ => {
                debug!("Unknown git status '{}', treating as modified", status);
                Self::Modified
            }
        }
    }

    pub fn letter(self) -> char {
        match self {
            Self::Added => 'A',
            Self::Modified => 'M',
            Self::Deleted => 'D',
            Self::Renamed => 'R',
        }
    }

    pub fn is_deleted(self) -> bool {
        self == Self::Deleted
    }
}

impl std::fmt::Display for FileStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.letter())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileChange {
    pub path: String,
    pub status: FileStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_path: Option<String>,
}

impl FileChange {
    pub fn new(path: impl Into<String>, status: FileStatus) -> Self {
        Self {
            path: path.into(),
            status,
            old_path: None,
        }
    }

    pub fn renamed(old_path: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            status: FileStatus::Renamed,
            old_path: Some(old_path.into()),
        }
    }

    /// Paths a pattern may match: the new path, and the old one for renames and copies
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.path.as_str()).chain(self.old_path.as_deref())
    }
}

/// Resolved commits. The merge-base is always the diff origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRange {
    pub base: String,
    pub target: String,
    pub merge_base: String,
    /// The merge-base could not be computed and the literal base is used instead
    pub merge_base_fallback: bool,
}

impl CommitRange {
    /// `abc1234..def5678` (merge-base..target)
    pub fn short(&self) -> String {
        format!(
            "{}..{}",
            short_hash(&self.merge_base),
            short_hash(&self.target)
        )
    }
}

/// Files changed over a resolved range
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub range: CommitRange,
    pub files: Vec<FileChange>,
}

impl ChangeSet {
    pub fn with_status(&self, status: FileStatus) -> impl Iterator<Item = &FileChange> {
        self.files.iter().filter(move |f| f.status == status)
    }

    pub fn count(&self, status: FileStatus) -> usize {
        self.with_status(status).count()
    }
}

pub fn short_hash(hash: &str) -> &str {
    hash.get(..SHORT_HASH_LEN).unwrap_or(hash)
}

/// Parse `git diff --name-status -z` output.
///
/// Records are NUL separated: `<status>\0<path>\0`, or for renames and copies
/// `<status><score>\0<old>\0<new>\0`.
pub fn parse_name_status(output: &str) -> Result<Vec<FileChange>> {
    let mut tokens = output.split('\0').filter(|t| !t.is_empty());
    let mut changes = Vec::new();

    while let Some(status) = tokens.next() {
        let status = status.trim();
        let first = tokens.next().ok_or_else(|| {
            SyncError::git("diff --name-status", format!("status '{}' without a path", status))
        })?;

        let change = if status.starts_with('R') || status.starts_with('C') {
            let new = tokens.next().ok_or_else(|| {
                SyncError::git(
                    "diff --name-status",
                    format!("'{}' entry for '{}' without a new path", status, first),
                )
            })?;
            FileChange {
                path: new.to_string(),
                status: FileStatus::from_git(status),
                old_path: Some(first.to_string()),
            }
        } else {
            FileChange::new(first, FileStatus::from_git(status))
        };
        changes.push(change);
    }

    Ok(changes)
}
