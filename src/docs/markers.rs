//! Identity and AUTOGEN section markers
//!
//! ```text
//! <!-- PAGE_ID: overview -->
//! <!-- BEGIN:AUTOGEN overview-core -->
//! ...section content...
//! <!-- END:AUTOGEN overview-core -->
//! ```
//!
//! Whitespace inside the comments is flexible. Marker pairing is strict:
//! any unbalanced, nested, mismatched or repeated marker is reported as a
//! [`MarkerProblem`] instead of being guessed around.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::constants::markers;
use crate::types::{Issue, IssueCategory};

static PAGE_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"<!--\s*{}:\s*(\S+?)\s*-->", markers::PAGE_ID))
        .expect("PAGE_ID pattern is valid")
});

static AUTOGEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<!--\s*(BEGIN|END):AUTOGEN\s+(\S+?)\s*-->").expect("AUTOGEN pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    Begin,
    End,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    pub kind: MarkerKind,
    pub id: String,
    /// 1-based line of the marker
    pub line: usize,
    /// Byte range of the whole comment
    pub start: usize,
    pub end: usize,
}

/// Byte offset → 1-based line lookup
struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    fn new(content: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(content.match_indices('\n').map(|(i, _)| i + 1));
        Self { starts }
    }

    fn line_of(&self, offset: usize) -> usize {
        match self.starts.binary_search(&offset) {
            Ok(i) => i + 1,
            Err(i) => i,
        }
    }
}

/// Find the PAGE_ID marker and its 1-based line.
///
/// With `max_lines` only the leading lines are searched; otherwise the first
/// marker anywhere in the document wins.
pub fn find_page_id(content: &str, max_lines: Option<usize>) -> Option<(String, usize)> {
    match max_lines {
        Some(limit) => content.lines().take(limit).enumerate().find_map(|(i, line)| {
            PAGE_ID_RE
                .captures(line)
                .map(|caps| (caps[1].to_string(), i + 1))
        }),
        None => PAGE_ID_RE.captures(content).and_then(|caps| {
            let whole = caps.get(0)?;
            let line = content[..whole.start()].matches('\n').count() + 1;
            Some((caps[1].to_string(), line))
        }),
    }
}

/// All AUTOGEN markers in document order
pub fn find_markers(content: &str) -> Vec<Marker> {
    let lines = LineIndex::new(content);
    AUTOGEN_RE
        .captures_iter(content)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let kind = if &caps[1] == "BEGIN" {
                MarkerKind::Begin
            } else {
                MarkerKind::End
            };
            Some(Marker {
                kind,
                id: caps[2].to_string(),
                line: lines.line_of(whole.start()),
                start: whole.start(),
                end: whole.end(),
            })
        })
        .collect()
}

// =============================================================================
// Pairing
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerProblem {
    EndWithoutBegin {
        id: String,
        line: usize,
    },
    Unclosed {
        id: String,
        line: usize,
    },
    Nested {
        inner: String,
        outer: String,
        outer_line: usize,
        line: usize,
    },
    Mismatched {
        begin: String,
        begin_line: usize,
        end: String,
        line: usize,
    },
    Repeated {
        id: String,
        first_line: usize,
        line: usize,
    },
}

impl MarkerProblem {
    pub fn line(&self) -> usize {
        match self {
            Self::EndWithoutBegin { line, .. }
            | Self::Unclosed { line, .. }
            | Self::Nested { line, .. }
            | Self::Mismatched { line, .. }
            | Self::Repeated { line, .. } => *line,
        }
    }

    pub fn to_issue(&self, file: &str) -> Issue {
        let (message, hint) = match self {
            Self::EndWithoutBegin { id, .. } => (
                format!("{} '{}' without matching BEGIN", markers::END_AUTOGEN, id),
                format!("Add <!-- {} {} --> before the content, or remove the END marker", markers::BEGIN_AUTOGEN, id),
            ),
            Self::Unclosed { id, .. } => (
                format!("{} '{}' without matching END", markers::BEGIN_AUTOGEN, id),
                format!("Add <!-- {} {} --> after the section content", markers::END_AUTOGEN, id),
            ),
            Self::Nested {
                inner,
                outer,
                outer_line,
                ..
            } => (
                format!(
                    "Nested AUTOGEN marker '{}' inside '{}' (opened at line {})",
                    inner, outer, outer_line
                ),
                "Close the outer AUTOGEN section before starting a new one".to_string(),
            ),
            Self::Mismatched {
                begin,
                begin_line,
                end,
                ..
            } => (
                format!(
                    "Mismatched AUTOGEN markers: BEGIN '{}' (line {}) vs END '{}'",
                    begin, begin_line, end
                ),
                format!("Change the END marker to: <!-- {} {} -->", markers::END_AUTOGEN, begin),
            ),
            Self::Repeated { id, first_line, .. } => (
                format!(
                    "AUTOGEN section '{}' is delimited twice (first at line {})",
                    id, first_line
                ),
                "Keep a single BEGIN/END pair per section".to_string(),
            ),
        };

        Issue::error(IssueCategory::Autogen, message)
            .in_file(file)
            .at_line(self.line())
            .with_hint(hint)
    }
}

/// A correctly paired section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionBlock {
    pub id: String,
    pub begin_line: usize,
    pub end_line: usize,
    /// Raw inner text; the line break right after BEGIN is not included
    pub content: String,
}

#[derive(Debug, Clone, Default)]
pub struct MarkerScan {
    /// Paired sections in document order, first pair wins for repeated ids
    pub blocks: Vec<SectionBlock>,
    pub problems: Vec<MarkerProblem>,
}

impl MarkerScan {
    pub fn is_valid(&self) -> bool {
        self.problems.is_empty()
    }

    pub fn block(&self, id: &str) -> Option<&SectionBlock> {
        self.blocks.iter().find(|b| b.id == id)
    }
}

/// Pair BEGIN/END markers with a stack and record every structural problem
pub fn scan_markers(content: &str) -> MarkerScan {
    let mut scan = MarkerScan::default();
    let mut open: Vec<Marker> = Vec::new();

    for marker in find_markers(content) {
        match marker.kind {
            MarkerKind::Begin => {
                if let Some(outer) = open.last() {
                    scan.problems.push(MarkerProblem::Nested {
                        inner: marker.id.clone(),
                        outer: outer.id.clone(),
                        outer_line: outer.line,
                        line: marker.line,
                    });
                }
                open.push(marker);
            }
            MarkerKind::End => {
                let Some(begin) = open.pop() else {
                    scan.problems.push(MarkerProblem::EndWithoutBegin {
                        id: marker.id,
                        line: marker.line,
                    });
                    continue;
                };

                if begin.id != marker.id {
                    scan.problems.push(MarkerProblem::Mismatched {
                        begin: begin.id,
                        begin_line: begin.line,
                        end: marker.id,
                        line: marker.line,
                    });
                    continue;
                }

                if let Some(first) = scan.block(&begin.id) {
                    scan.problems.push(MarkerProblem::Repeated {
                        id: begin.id,
                        first_line: first.begin_line,
                        line: begin.line,
                    });
                    continue;
                }

                let inner = &content[begin.end..marker.start];
                let inner = inner
                    .strip_prefix("\r\n")
                    .or_else(|| inner.strip_prefix('\n'))
                    .unwrap_or(inner);

                scan.blocks.push(SectionBlock {
                    id: begin.id,
                    begin_line: begin.line,
                    end_line: marker.line,
                    content: inner.to_string(),
                });
            }
        }
    }

    scan.problems
        .extend(open.into_iter().map(|m| MarkerProblem::Unclosed {
            id: m.id,
            line: m.line,
        }));
    scan.problems.sort_by_key(MarkerProblem::line);
    scan
}

/// Inner text of every correctly paired section
pub fn extract_section_contents(content: &str) -> BTreeMap<String, String> {
    scan_markers(content)
        .blocks
        .into_iter()
        .map(|b| (b.id, b.content))
        .collect()
}

/// Blank lines and horizontal rules are not content
pub fn is_content_empty(text: &str) -> bool {
    text.lines()
        .map(str::trim)
        .all(|line| line.is_empty() || line == markers::HORIZONTAL_RULE)
}
