//! Diff Commands
//!
//! Annotated patch evidence outside of a full update.
//!
//! Usage:
//!   tocsync section-diff --base-commit A --target-commit B --file src/x.rs
//!   tocsync git-diff [--base-ref origin/main] [--head-ref HEAD] [--include-uncommitted]

use std::path::PathBuf;

use tokio::runtime::Runtime;

use crate::cli::ui::Output;
use crate::cli::util::{CommandContext, write_report};
use crate::sync::{DiffReport, GitDiffRequest, SectionDiffRequest, UpdateRunner};
use crate::types::Result;

#[derive(Debug, Clone, Default)]
pub struct SectionDiffOptions {
    pub repo_path: PathBuf,
    pub base_commit: String,
    pub target_commit: String,
    pub files: Vec<String>,
    pub context: Option<u32>,
    pub no_line_numbers: bool,
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct GitDiffOptions {
    pub repo_path: PathBuf,
    pub base_ref: Option<String>,
    pub head_ref: Option<String>,
    pub include_uncommitted: bool,
    pub context: Option<u32>,
    pub no_line_numbers: bool,
    pub output: Option<PathBuf>,
}

pub fn section_diff(options: SectionDiffOptions) -> Result<()> {
    let ctx = CommandContext::load(&options.repo_path)?;
    ctx.require_repo()?;

    let request = SectionDiffRequest {
        base_commit: options.base_commit,
        target_commit: options.target_commit,
        files: options.files,
        context_lines: options.context,
        line_numbers: options.no_line_numbers.then_some(false),
    };

    let git = ctx.git();
    let rt = Runtime::new()?;
    let report = rt.block_on(UpdateRunner::new(&ctx.config, &git).section_diff(&request))?;

    print_summary(&report);
    write_report(&report, options.output.as_deref())
}

pub fn git_diff(options: GitDiffOptions) -> Result<()> {
    let ctx = CommandContext::load(&options.repo_path)?;
    ctx.require_repo()?;

    let request = GitDiffRequest {
        base_ref: options.base_ref,
        head_ref: options.head_ref,
        include_uncommitted: options.include_uncommitted,
        context_lines: options.context,
        line_numbers: options.no_line_numbers.then_some(false),
    };

    let git = ctx.git();
    let rt = Runtime::new()?;
    let report = rt.block_on(UpdateRunner::new(&ctx.config, &git).git_diff(&request))?;

    print_summary(&report);
    write_report(&report, options.output.as_deref())
}

fn print_summary(report: &DiffReport) {
    let output = Output::new();
    output.issues(&report.issues);
    output.info(&format!(
        "{}: {} files, {} bytes of patches",
        report.range, report.files_processed, report.total_size
    ));
    if report.files_with_errors > 0 {
        output.warning(&format!("{} files failed", report.files_with_errors));
    }
}
