//! Source Pattern Matching
//!
//! TOC authors associate sections with source files at whatever granularity
//! is convenient, so one pattern string can mean four different things:
//!
//! | Form | Example | Matches |
//! |------|---------|---------|
//! | Directory | `src/`, `**/src/` | every path strictly under the directory |
//! | Glob | `*.md`, `lib/*.go` | full path or basename |
//! | File name | `Cargo.toml` | basename equality, or a top-level directory |
//! | Literal path | `lib/core.go` | exact path, or a path below it |
//!
//! Matching over a [`PatternSet`] is existential. An empty set never matches.

use glob::{MatchOptions, Pattern};
use serde::{Serialize, Serializer};

use crate::types::{Result, SyncError};

const GLOB_CHARS: [char; 3] = ['*', '?', '['];

/// fnmatch-compatible options: `*` crosses directory separators
const FNMATCH: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// Directory globs are matched one ancestor at a time, so `*` stays inside a component
const PATH_COMPONENT: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Normalize a repository path or pattern: POSIX separators, no leading `./` or `/`
pub fn normalize_path(path: &str) -> String {
    let mut normalized = path.trim().replace('\\', "/");
    loop {
        if let Some(rest) = normalized.strip_prefix("./") {
            normalized = rest.to_string();
        } else if let Some(rest) = normalized.strip_prefix('/') {
            normalized = rest.to_string();
        } else {
            break;
        }
    }
    normalized
}

fn has_glob_chars(s: &str) -> bool {
    s.contains(GLOB_CHARS)
}

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Literal prefix at a component boundary: `lib/core` covers `lib/core/x.go`, never `lib/core2.go`
fn is_path_or_below(path: &str, prefix: &str) -> bool {
    path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}

// =============================================================================
// Single Pattern
// =============================================================================

#[derive(Debug, Clone)]
enum Matcher {
    DirectoryPrefix(String),
    DirectoryGlob(Pattern),
    Glob(Pattern),
    FileName(String),
    LiteralPath(String),
}

/// One compiled source pattern
#[derive(Debug, Clone)]
pub struct SourcePattern {
    raw: String,
    matcher: Matcher,
}

impl SourcePattern {
    /// Compile a pattern. Patterns that are empty or that would cover the whole
    /// repository through a bare `/` are rejected.
    pub fn compile(raw: &str) -> std::result::Result<Self, String> {
        let normalized = normalize_path(raw);
        if normalized.is_empty() {
            return Err("pattern is empty".to_string());
        }

        let matcher = if let Some(dir) = normalized.strip_suffix('/') {
            let dir = dir.trim_end_matches('/');
            if dir.is_empty() {
                return Err("directory pattern names the repository root".to_string());
            }
            if has_glob_chars(dir) {
                let pattern = Pattern::new(dir).map_err(|e| e.msg.to_string())?;
                Matcher::DirectoryGlob(pattern)
            } else {
                Matcher::DirectoryPrefix(dir.to_string())
            }
        } else if has_glob_chars(&normalized) {
            Matcher::Glob(Pattern::new(&normalized).map_err(|e| e.msg.to_string())?)
        } else if !normalized.contains('/') {
            Matcher::FileName(normalized)
        } else {
            Matcher::LiteralPath(normalized)
        };

        Ok(Self {
            raw: raw.to_string(),
            matcher,
        })
    }

    /// Pattern text as authored in the TOC
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Does this pattern cover a repository-relative path?
    pub fn matches(&self, path: &str) -> bool {
        let path = normalize_path(path);
        if path.is_empty() {
            return false;
        }

        match &self.matcher {
            Matcher::DirectoryPrefix(dir) => path
                .strip_prefix(dir.as_str())
                .is_some_and(|rest| rest.len() > 1 && rest.starts_with('/')),
            Matcher::DirectoryGlob(pattern) => {
                // every proper ancestor directory of the path
                let mut end = 0;
                while let Some(offset) = path[end..].find('/') {
                    end += offset;
                    if pattern.matches_with(&path[..end], PATH_COMPONENT) {
                        return true;
                    }
                    end += 1;
                }
                false
            }
            Matcher::Glob(pattern) => {
                pattern.matches_with(&path, FNMATCH)
                    || pattern.matches_with(basename(&path), FNMATCH)
            }
            Matcher::FileName(name) => basename(&path) == name || is_path_or_below(&path, name),
            Matcher::LiteralPath(literal) => is_path_or_below(&path, literal),
        }
    }
}

impl Serialize for SourcePattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

// =============================================================================
// Pattern Set
// =============================================================================

/// Ordered list of compiled patterns; declaration order is kept for display only
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct PatternSet {
    patterns: Vec<SourcePattern>,
}

impl PatternSet {
    /// Compile every pattern, naming `owner` (a page or section id) on failure
    pub fn compile<S: AsRef<str>>(owner: &str, raw: &[S]) -> Result<Self> {
        let patterns = raw
            .iter()
            .map(|p| {
                SourcePattern::compile(p.as_ref()).map_err(|reason| SyncError::InvalidPattern {
                    owner: owner.to_string(),
                    pattern: p.as_ref().to_string(),
                    reason,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { patterns })
    }

    pub fn matches(&self, path: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(path))
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SourcePattern> {
        self.patterns.iter()
    }
}
