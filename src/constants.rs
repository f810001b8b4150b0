//! Global Constants
//!
//! Centralized constants for markers, defaults and tuning.
//! All magic numbers should be defined here with documentation.

/// Markers embedded in generated documents
pub mod markers {
    /// Identity marker name: `<!-- PAGE_ID: <id> -->`
    pub const PAGE_ID: &str = "PAGE_ID";

    /// Section start marker name: `<!-- BEGIN:AUTOGEN <id> -->`
    pub const BEGIN_AUTOGEN: &str = "BEGIN:AUTOGEN";

    /// Section end marker name: `<!-- END:AUTOGEN <id> -->`
    pub const END_AUTOGEN: &str = "END:AUTOGEN";

    /// A line consisting only of this token does not count as section content
    pub const HORIZONTAL_RULE: &str = "---";
}

/// Git backend constants
pub mod git {
    /// Default timeout for a single git invocation (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

    /// Length of abbreviated hashes in commit ranges
    pub const SHORT_HASH_LEN: usize = 7;

    /// Default target reference
    pub const DEFAULT_TARGET_REF: &str = "HEAD";

    /// Default base reference for branch diffs
    pub const DEFAULT_BASE_REF: &str = "origin/main";
}

/// Diff evidence constants
pub mod diff {
    /// Context lines for section update evidence
    pub const DEFAULT_CONTEXT_LINES: u32 = 0;

    /// Context lines for branch-wide diffs
    pub const DEFAULT_GIT_DIFF_CONTEXT_LINES: u32 = 3;

    /// Maximum files diffed concurrently
    pub const DEFAULT_MAX_CONCURRENCY: usize = 8;
}

/// Generated document constants
pub mod docs {
    /// Documents considered by the artifact scanner
    pub const DEFAULT_GLOB: &str = "*.md";

    /// PAGE_ID must appear within this many leading lines for the validator
    pub const PAGE_ID_SCAN_LINES: usize = 5;

    /// Pages smaller than this are flagged by the validator (bytes)
    pub const MIN_PAGE_BYTES: usize = 500;
}
