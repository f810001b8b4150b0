//! Update Command
//!
//! Incremental reconciliation against the change-set since the TOC's
//! reference commit.
//!
//! Usage:
//!   tocsync update --repo-path . --toc-file toc.yaml --doc-dir docs [--include-diff]

use std::path::PathBuf;

use tokio::runtime::Runtime;

use crate::cli::ui::Output;
use crate::cli::util::{CommandContext, write_report};
use crate::sync::{SyncMode, SyncReport, UpdateRequest, UpdateRunner};
use crate::types::Result;

#[derive(Debug, Clone, Default)]
pub struct UpdateOptions {
    pub repo_path: PathBuf,
    pub toc_file: PathBuf,
    pub doc_dir: PathBuf,
    pub base_commit: Option<String>,
    pub target_commit: Option<String>,
    pub include_diff: bool,
    pub diff_context: Option<u32>,
    pub no_line_numbers: bool,
    pub output: Option<PathBuf>,
}

pub fn run(options: UpdateOptions) -> Result<()> {
    let ctx = CommandContext::load(&options.repo_path)?;
    ctx.require_repo()?;

    let request = UpdateRequest {
        toc_file: ctx.resolve(&options.toc_file),
        doc_dir: ctx.resolve(&options.doc_dir),
        base_commit: options.base_commit,
        target_commit: options.target_commit,
        include_diff: options.include_diff,
        context_lines: options.diff_context,
        line_numbers: options.no_line_numbers.then_some(false),
    };

    let git = ctx.git();
    let runner = UpdateRunner::new(&ctx.config, &git);
    let rt = Runtime::new()?;
    let report = rt.block_on(runner.update(&request))?;

    print_summary(&report);
    write_report(&report, options.output.as_deref())
}

pub(super) fn print_summary(report: &SyncReport) {
    let output = Output::new();
    let summary = &report.summary;

    output.issues(&report.issues);
    match report.mode {
        SyncMode::Full => output.info(&format!(
            "Full generation: {} pages, {} sections",
            summary.total_pages, summary.sections_scheduled
        )),
        _ => output.info(&format!(
            "{} new, {} to update, {} unchanged; {} sections scheduled",
            summary.new_pages,
            summary.pages_to_update,
            summary.unchanged_pages,
            summary.sections_scheduled
        )),
    }
    if let Some(range) = &report.range {
        output.info(&format!("Range {} ({} files changed)", range, summary.changed_files));
    }
    if summary.needing_toc_update > 0 {
        output.warning(&format!(
            "{} added files are not covered by the TOC",
            summary.needing_toc_update
        ));
    }
}
