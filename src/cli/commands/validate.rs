//! Validate Command
//!
//! Checks generated documents against the TOC and prints a JSON report.

use std::path::PathBuf;

use crate::cli::ui::Output;
use crate::cli::util::{CommandContext, write_report};
use crate::docs::Validator;
use crate::toc::TocLoader;
use crate::types::Result;

#[derive(Debug, Clone, Default)]
pub struct ValidateOptions {
    pub repo_path: PathBuf,
    pub toc_file: PathBuf,
    pub doc_dir: PathBuf,
    pub errors_only: bool,
    pub output: Option<PathBuf>,
}

/// Returns whether the documents passed
pub fn run(options: ValidateOptions) -> Result<bool> {
    let ctx = CommandContext::load(&options.repo_path)?;
    let toc = TocLoader::load(&ctx.resolve(&options.toc_file))?;
    let doc_dir = ctx.resolve(&options.doc_dir);

    let report = Validator::new(&ctx.config.docs)
        .errors_only(options.errors_only)
        .validate(&toc, &doc_dir)?;

    let output = Output::new();
    let summary = &report.summary;
    output.issues(&report.issues);
    if report.is_valid() {
        output.success(&format!(
            "{} pages, {} sections valid",
            summary.pages_validated, summary.sections_validated
        ));
    } else {
        output.error(&format!(
            "Validation failed: {} errors, {} warnings",
            summary.total_errors, summary.total_warnings
        ));
    }

    write_report(&report, options.output.as_deref())?;
    Ok(report.is_valid())
}
