//! Unified diff parsing
//!
//! Line numbers come only from hunk headers. Every hunk must contain exactly
//! the number of old/new lines its header declares; anything else is a
//! [`SyncError::DiffParse`] carrying the 1-based line of the raw diff.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::types::{Result, SyncError};

static HUNK_HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@ ?(.*)$")
        .expect("hunk header pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LineKind {
    Context,
    Removed,
    Added,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffLine {
    pub kind: LineKind,
    /// Old-file line for context and removed lines
    pub old_line: Option<usize>,
    /// New-file line for context and added lines
    pub new_line: Option<usize>,
    /// Line text without the leading marker
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Hunk {
    pub old_start: usize,
    pub old_count: usize,
    pub new_start: usize,
    pub new_count: usize,
    /// Header line verbatim, e.g. `@@ -10,3 +10,4 @@ fn foo`
    pub header: String,
    pub lines: Vec<DiffLine>,
}

impl Hunk {
    pub fn added(&self) -> usize {
        self.count(LineKind::Added)
    }

    pub fn removed(&self) -> usize {
        self.count(LineKind::Removed)
    }

    fn count(&self, kind: LineKind) -> usize {
        self.lines.iter().filter(|l| l.kind == kind).count()
    }
}

/// Parse `@@ -a[,b] +c[,d] @@ [section]`; omitted counts are 1
pub fn parse_hunk_header(line: &str) -> Option<(usize, usize, usize, usize)> {
    let caps = HUNK_HEADER_RE.captures(line)?;
    let number = |i: usize, default: usize| -> Option<usize> {
        match caps.get(i) {
            Some(m) => m.as_str().parse().ok(),
            None => Some(default),
        }
    };
    Some((number(1, 0)?, number(2, 1)?, number(3, 0)?, number(4, 1)?))
}

/// Hunk being filled, with the counts still owed by its header
struct OpenHunk {
    hunk: Hunk,
    old_left: usize,
    new_left: usize,
    next_old: usize,
    next_new: usize,
}

impl OpenHunk {
    fn is_complete(&self) -> bool {
        self.old_left == 0 && self.new_left == 0
    }

    fn push(&mut self, kind: LineKind, text: &str, line_no: usize) -> Result<()> {
        let (takes_old, takes_new) = match kind {
            LineKind::Context => (true, true),
            LineKind::Removed => (true, false),
            LineKind::Added => (false, true),
        };

        if (takes_old && self.old_left == 0) || (takes_new && self.new_left == 0) {
            return Err(SyncError::diff_parse(
                line_no,
                format!(
                    "{:?} line exceeds the counts declared by '{}'",
                    kind, self.hunk.header
                ),
            ));
        }

        let old_line = takes_old.then(|| {
            self.old_left -= 1;
            self.next_old += 1;
            self.next_old - 1
        });
        let new_line = takes_new.then(|| {
            self.new_left -= 1;
            self.next_new += 1;
            self.next_new - 1
        });

        self.hunk.lines.push(DiffLine {
            kind,
            old_line,
            new_line,
            text: text.to_string(),
        });
        Ok(())
    }
}

/// Parse one or more files' unified diff into hunks.
///
/// File headers and any text before the first hunk are skipped, as are
/// `\ No newline at end of file` markers. A blank line inside a hunk is an
/// empty context line.
pub fn parse_unified_diff(raw: &str) -> Result<Vec<Hunk>> {
    let mut hunks = Vec::new();
    let mut open: Option<OpenHunk> = None;
    let mut last_line = 0;

    for (index, line) in raw.lines().enumerate() {
        let line_no = index + 1;
        last_line = line_no;

        if line.starts_with('\\') {
            continue;
        }

        if let Some(current) = open.as_mut() {
            let (kind, text) = match line.as_bytes().first() {
                None => (LineKind::Context, ""),
                Some(b' ') => (LineKind::Context, &line[1..]),
                Some(b'-') => (LineKind::Removed, &line[1..]),
                Some(b'+') => (LineKind::Added, &line[1..]),
                Some(_) => {
                    return Err(SyncError::diff_parse(
                        line_no,
                        format!(
                            "hunk '{}' ended early: {} old and {} new lines missing",
                            current.hunk.header, current.old_left, current.new_left
                        ),
                    ));
                }
            };
            current.push(kind, text, line_no)?;

            if current.is_complete()
                && let Some(done) = open.take()
            {
                hunks.push(done.hunk);
            }
            continue;
        }

        if line.starts_with("@@") {
            let (old_start, old_count, new_start, new_count) = parse_hunk_header(line)
                .ok_or_else(|| {
                    SyncError::diff_parse(line_no, format!("malformed hunk header '{}'", line))
                })?;

            let started = OpenHunk {
                hunk: Hunk {
                    old_start,
                    old_count,
                    new_start,
                    new_count,
                    header: line.to_string(),
                    lines: Vec::new(),
                },
                old_left: old_count,
                new_left: new_count,
                next_old: old_start,
                next_new: new_start,
            };
            if started.is_complete() {
                hunks.push(started.hunk);
            } else {
                open = Some(started);
            }
            continue;
        }

        // Between hunks only file headers may appear
        let is_body_line = (line.starts_with('+') && !line.starts_with("+++"))
            || (line.starts_with('-') && !line.starts_with("---"))
            || line.starts_with(' ');
        if is_body_line && !hunks.is_empty() {
            return Err(SyncError::diff_parse(
                line_no,
                "line outside of any hunk; the previous hunk header declared fewer lines",
            ));
        }
    }

    if let Some(current) = open {
        return Err(SyncError::diff_parse(
            last_line + 1,
            format!(
                "hunk '{}' ended early: {} old and {} new lines missing",
                current.hunk.header, current.old_left, current.new_left
            ),
        ));
    }

    Ok(hunks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const PATCH: &str = "\
diff --git a/src/lib.rs b/src/lib.rs
index 83db48f..bf269f4 100644
--- a/src/lib.rs
+++ b/src/lib.rs
@@ -10,3 +10,4 @@ fn foo
 context one
-removed
+added one
+added two
 context two
";

    #[test]
    fn test_header_defaults() {
        assert_eq!(parse_hunk_header("@@ -10,3 +10,4 @@ fn foo"), Some((10, 3, 10, 4)));
        assert_eq!(parse_hunk_header("@@ -3,0 +4 @@"), Some((3, 0, 4, 1)));
        assert_eq!(parse_hunk_header("@@ -1 +1 @@"), Some((1, 1, 1, 1)));
        assert_eq!(parse_hunk_header("@@ garbage @@"), None);
    }

    #[test]
    fn test_line_numbers_follow_header() {
        let hunks = parse_unified_diff(PATCH).unwrap();
        assert_eq!(hunks.len(), 1);

        let hunk = &hunks[0];
        assert_eq!(hunk.header, "@@ -10,3 +10,4 @@ fn foo");
        let numbered: Vec<(LineKind, Option<usize>, Option<usize>)> = hunk
            .lines
            .iter()
            .map(|l| (l.kind, l.old_line, l.new_line))
            .collect();
        assert_eq!(
            numbered,
            vec![
                (LineKind::Context, Some(10), Some(10)),
                (LineKind::Removed, Some(11), None),
                (LineKind::Added, None, Some(11)),
                (LineKind::Added, None, Some(12)),
                (LineKind::Context, Some(12), Some(13)),
            ]
        );
        assert_eq!(hunk.lines[0].text, "context one");
    }

    #[test]
    fn test_counters_reset_per_hunk() {
        let patch = "@@ -1,2 +1,2 @@\n-a\n+b\n c\n@@ -40 +40,2 @@\n x\n+y\n";
        let hunks = parse_unified_diff(patch).unwrap();
        assert_eq!(hunks.len(), 2);
        assert_eq!(hunks[1].lines[0].new_line, Some(40));
        assert_eq!(hunks[1].lines[1].new_line, Some(41));
    }

    #[test]
    fn test_skips_no_newline_marker_and_keeps_blank_context() {
        let patch = "@@ -1,3 +1,3 @@\n a\n\n-b\n\\ No newline at end of file\n+c\n\\ No newline at end of file\n";
        let hunks = parse_unified_diff(patch).unwrap();
        assert_eq!(hunks[0].lines.len(), 4);
        assert_eq!(hunks[0].lines[1].text, "");
        assert_eq!(hunks[0].lines[1].kind, LineKind::Context);
    }

    #[test]
    fn test_hunk_ending_early_is_error() {
        let err = parse_unified_diff("@@ -1,3 +1,3 @@\n a\n").unwrap_err();
        match err {
            SyncError::DiffParse { line, message } => {
                assert_eq!(line, 3);
                assert!(message.contains("ended early"));
            }
            other => panic!("unexpected error: {other}"),
        }

        let err = parse_unified_diff("@@ -1,2 +1,2 @@\n a\ndiff --git a/x b/x\n").unwrap_err();
        assert!(matches!(err, SyncError::DiffParse { line: 3, .. }));
    }

    #[test]
    fn test_too_many_lines_is_error() {
        let err = parse_unified_diff("@@ -1 +1 @@\n-a\n+b\n+c\n").unwrap_err();
        assert!(matches!(err, SyncError::DiffParse { line: 4, .. }));

        let err = parse_unified_diff("@@ -1,0 +1 @@\n-a\n").unwrap_err();
        assert!(matches!(err, SyncError::DiffParse { line: 2, .. }));
    }

    #[test]
    fn test_concatenated_file_diffs() {
        let two = format!("{PATCH}diff --git a/b.rs b/b.rs\n--- a/b.rs\n+++ b/b.rs\n@@ -1 +1 @@\n-x\n+y\n");
        assert_eq!(parse_unified_diff(&two).unwrap().len(), 2);
    }

    #[test]
    fn test_empty_and_binary_diffs_have_no_hunks() {
        assert!(parse_unified_diff("").unwrap().is_empty());
        let binary = "diff --git a/x.png b/x.png\nindex 1..2 100644\nBinary files a/x.png and b/x.png differ\n";
        assert!(parse_unified_diff(binary).unwrap().is_empty());
    }

    fn kinds() -> impl Strategy<Value = Vec<LineKind>> {
        prop::collection::vec(
            prop_oneof![
                Just(LineKind::Context),
                Just(LineKind::Removed),
                Just(LineKind::Added)
            ],
            1..40,
        )
    }

    proptest! {
        #[test]
        fn prop_counters_follow_header(start in 1usize..5000, kinds in kinds()) {
            let old_count = kinds.iter().filter(|k| **k != LineKind::Added).count();
            let new_count = kinds.iter().filter(|k| **k != LineKind::Removed).count();
            let mut raw = format!("@@ -{start},{old_count} +{start},{new_count} @@\n");
            for (i, kind) in kinds.iter().enumerate() {
                let marker = match kind {
                    LineKind::Context => ' ',
                    LineKind::Removed => '-',
                    LineKind::Added => '+',
                };
                raw.push_str(&format!("{marker}line {i}\n"));
            }

            let hunks = parse_unified_diff(&raw).unwrap();
            prop_assert_eq!(hunks.len(), 1);
            let hunk = &hunks[0];

            let mut old = start;
            let mut new = start;
            for line in &hunk.lines {
                if let Some(n) = line.old_line {
                    prop_assert_eq!(n, old);
                    old += 1;
                }
                if let Some(n) = line.new_line {
                    prop_assert_eq!(n, new);
                    new += 1;
                }
            }
            prop_assert_eq!(
                new as isize - old as isize,
                hunk.added() as isize - hunk.removed() as isize
            );
        }
    }
}
