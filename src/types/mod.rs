pub mod error;
pub mod issue;

pub use error::{ErrorCategory, Result, ResultExt, SyncError};
pub use issue::{Issue, IssueCategory, IssueLog, IssueSeverity};
