//! Version control access: change-set types, provider trait and git CLI backend

mod cli;
mod provider;
mod types;

pub use cli::GitCli;
pub use provider::{ChangeSetProvider, resolve_range};
pub use types::{ChangeSet, CommitRange, FileChange, FileStatus, parse_name_status, short_hash};

#[cfg(test)]
pub(crate) use provider::fake::FakeProvider;
