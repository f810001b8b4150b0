//! Sync Command
//!
//! Structural reconciliation from markers alone. Never touches git.

use std::path::PathBuf;

use super::update::print_summary;
use crate::cli::util::{CommandContext, write_report};
use crate::sync::sync_structure;
use crate::types::Result;

#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    pub repo_path: PathBuf,
    pub toc_file: PathBuf,
    pub doc_dir: PathBuf,
    pub output: Option<PathBuf>,
}

pub fn run(options: SyncOptions) -> Result<()> {
    let ctx = CommandContext::load(&options.repo_path)?;
    let report = sync_structure(
        &ctx.config,
        &ctx.resolve(&options.toc_file),
        &ctx.resolve(&options.doc_dir),
    )?;

    print_summary(&report);
    write_report(&report, options.output.as_deref())
}
