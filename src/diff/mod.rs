//! Unified diff parsing, line-numbered annotation and per-file evidence

mod annotate;
mod evidence;
mod hunk;

pub use annotate::{annotate_patch, deleted_notice, render_hunks};
pub use evidence::{EvidenceOptions, EvidenceSet, FileEvidence, collect_evidence};
pub use hunk::{DiffLine, Hunk, LineKind, parse_hunk_header, parse_unified_diff};
