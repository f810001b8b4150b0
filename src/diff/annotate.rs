//! Line-numbered patch rendering
//!
//! The single annotator used by `update`, `section-diff` and `git-diff`:
//!
//! ```text
//! ## File: 'src/lib.rs'
//!
//! @@ -10,3 +10,4 @@ fn foo
//! 10 context one
//! -11 removed
//! +11 added one
//! ```
//!
//! Context lines carry the new-file number, removed lines the old-file number
//! and added lines the new-file number.

use std::fmt::Write;

use super::hunk::{Hunk, LineKind, parse_unified_diff};
use crate::git::FileStatus;
use crate::types::Result;

/// Notice used instead of a patch for deleted files
pub fn deleted_notice(path: &str) -> String {
    format!("## File '{}' was deleted", path)
}

/// Render parsed hunks under a file heading
pub fn render_hunks(path: &str, hunks: &[Hunk]) -> String {
    let mut out = format!("## File: '{}'\n", path);

    for hunk in hunks {
        // writing into a String cannot fail
        let _ = write!(out, "\n{}\n", hunk.header);
        for line in &hunk.lines {
            let _ = match line.kind {
                LineKind::Context => {
                    writeln!(out, "{} {}", line.new_line.unwrap_or_default(), line.text)
                }
                LineKind::Removed => {
                    writeln!(out, "-{} {}", line.old_line.unwrap_or_default(), line.text)
                }
                LineKind::Added => {
                    writeln!(out, "+{} {}", line.new_line.unwrap_or_default(), line.text)
                }
            };
        }
    }

    out.trim_end().to_string()
}

/// Annotate one file's raw unified diff. Deleted files short-circuit to a
/// fixed notice without parsing the body.
pub fn annotate_patch(raw: &str, path: &str, status: FileStatus) -> Result<String> {
    if status.is_deleted() {
        return Ok(deleted_notice(path));
    }
    Ok(render_hunks(path, &parse_unified_diff(raw)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SyncError;

    #[test]
    fn test_annotate_example_hunk() {
        let raw = "diff --git a/src/lib.rs b/src/lib.rs\n--- a/src/lib.rs\n+++ b/src/lib.rs\n@@ -10,3 +10,4 @@ fn foo\n context\n-old\n+new one\n+new two\n tail\n";
        let annotated = annotate_patch(raw, "src/lib.rs", FileStatus::Modified).unwrap();

        assert_eq!(
            annotated,
            "## File: 'src/lib.rs'\n\n@@ -10,3 +10,4 @@ fn foo\n10 context\n-11 old\n+11 new one\n+12 new two\n13 tail"
        );
    }

    #[test]
    fn test_multiple_hunks() {
        let raw = "@@ -1 +1 @@\n-a\n+b\n@@ -20,0 +21,2 @@\n+x\n+y\n";
        let annotated = annotate_patch(raw, "f.txt", FileStatus::Modified).unwrap();
        assert_eq!(
            annotated,
            "## File: 'f.txt'\n\n@@ -1 +1 @@\n-1 a\n+1 b\n\n@@ -20,0 +21,2 @@\n+21 x\n+22 y"
        );
    }

    #[test]
    fn test_deleted_file_short_circuits() {
        let annotated = annotate_patch("not a diff at all", "gone.rs", FileStatus::Deleted).unwrap();
        assert_eq!(annotated, "## File 'gone.rs' was deleted");
    }

    #[test]
    fn test_parse_errors_propagate() {
        let err = annotate_patch("@@ -1,2 +1,2 @@\n a\n", "f", FileStatus::Added).unwrap_err();
        assert!(matches!(err, SyncError::DiffParse { .. }));
    }

    #[test]
    fn test_annotation_is_independent_of_commit_pair() {
        let a = "diff --git a/x b/x\nindex 1111111..2222222 100644\n--- a/x\n+++ b/x\n@@ -5 +5 @@\n-p\n+q\n";
        let b = "diff --git a/x b/x\nindex 3333333..4444444 100644\n--- a/x\n+++ b/x\n@@ -5 +5 @@\n-p\n+q\n";
        assert_eq!(
            annotate_patch(a, "x", FileStatus::Modified).unwrap(),
            annotate_patch(b, "x", FileStatus::Modified).unwrap()
        );
    }
}
