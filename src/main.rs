use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tocsync::SyncError;
use tocsync::cli::commands::{config, diff, sync, update, validate};

#[derive(Parser)]
#[command(name = "tocsync")]
#[command(
    version,
    about = "Decide which TOC-driven documentation pages and sections need regenerating"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true)]
    verbose: bool,

    #[arg(long, short, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile the TOC and documents against changes since the reference commit
    Update {
        #[arg(long, help = "Repository root; relative paths resolve against it")]
        repo_path: PathBuf,
        #[arg(long, help = "TOC YAML file")]
        toc_file: PathBuf,
        #[arg(long, help = "Directory of generated documents")]
        doc_dir: PathBuf,
        #[arg(long, help = "Base commit (default: the TOC's ref_commit_hash)")]
        base_commit: Option<String>,
        #[arg(long, help = "Target commit (default: HEAD)")]
        target_commit: Option<String>,
        #[arg(long, help = "Attach annotated patches to scheduled sections")]
        include_diff: bool,
        #[arg(long, help = "Context lines around each change")]
        diff_context: Option<u32>,
        #[arg(long, help = "Emit raw patches without line numbers")]
        no_line_numbers: bool,
        #[arg(long, short, help = "Write the JSON report to this file")]
        output: Option<PathBuf>,
    },

    /// Reconcile the TOC and documents from markers only (no git)
    Sync {
        #[arg(long)]
        repo_path: PathBuf,
        #[arg(long)]
        toc_file: PathBuf,
        #[arg(long)]
        doc_dir: PathBuf,
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Annotated patches for specific files between two commits
    SectionDiff {
        #[arg(long)]
        repo_path: PathBuf,
        #[arg(long)]
        base_commit: String,
        #[arg(long)]
        target_commit: String,
        #[arg(long = "file", required = true, help = "Source file (repeatable)")]
        files: Vec<String>,
        #[arg(long)]
        context: Option<u32>,
        #[arg(long)]
        no_line_numbers: bool,
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Annotated patches for every file changed on a branch
    GitDiff {
        #[arg(long)]
        repo_path: PathBuf,
        #[arg(long, help = "Base ref (default: origin/main)")]
        base_ref: Option<String>,
        #[arg(long, help = "Head ref (default: HEAD)")]
        head_ref: Option<String>,
        #[arg(long, help = "Append staged and unstaged changes")]
        include_uncommitted: bool,
        #[arg(long, help = "Context lines (default: 3)")]
        context: Option<u32>,
        #[arg(long)]
        no_line_numbers: bool,
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Validate generated documents against the TOC
    Validate {
        #[arg(long)]
        repo_path: PathBuf,
        #[arg(long)]
        toc_file: PathBuf,
        #[arg(long)]
        doc_dir: PathBuf,
        #[arg(long, help = "Report errors only")]
        errors_only: bool,
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration (merged from all sources)
    Show {
        #[arg(
            short = 'f',
            long,
            default_value = "text",
            help = "Output format: text, json"
        )]
        format: String,
    },
    /// Show configuration file paths
    Path,
    /// Write a default configuration file
    Init {
        #[arg(long, short, help = "Initialize global config")]
        global: bool,
        #[arg(long, help = "Overwrite existing config")]
        force: bool,
    },
}

/// Set up panic handler for graceful error reporting
fn setup_panic_handler() {
    let default_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        eprintln!("\n\x1b[1;31m━━━ PANIC ━━━\x1b[0m");
        eprintln!("\x1b[31mtocsync encountered an unexpected error:\x1b[0m");
        eprintln!("  {}", message);

        if let Some(location) = panic_info.location() {
            eprintln!(
                "\x1b[90mLocation: {}:{}:{}\x1b[0m",
                location.file(),
                location.line(),
                location.column()
            );
        }
        eprintln!();

        // Default hook prints the backtrace when RUST_BACKTRACE=1
        default_hook(panic_info);
    }));
}

fn main() -> ExitCode {
    setup_panic_handler();

    match run_cli() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            report_error(&e);
            ExitCode::FAILURE
        }
    }
}

fn report_error(error: &anyhow::Error) {
    let Some(sync_error) = error.downcast_ref::<SyncError>() else {
        eprintln!("\x1b[31mError:\x1b[0m {}", error);
        return;
    };

    eprintln!(
        "\x1b[31mError [{}]:\x1b[0m {}",
        sync_error.category(),
        sync_error
    );
    if sync_error.is_whole_run_fatal() {
        eprintln!("\x1b[90mNo report was produced; fix the TOC or repository state and rerun.\x1b[0m");
    }
}

/// Returns `Ok(false)` when the command ran but its findings should fail the process
fn run_cli() -> anyhow::Result<bool> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Update {
            repo_path,
            toc_file,
            doc_dir,
            base_commit,
            target_commit,
            include_diff,
            diff_context,
            no_line_numbers,
            output,
        } => {
            update::run(update::UpdateOptions {
                repo_path,
                toc_file,
                doc_dir,
                base_commit,
                target_commit,
                include_diff,
                diff_context,
                no_line_numbers,
                output,
            })?;
        }
        Commands::Sync {
            repo_path,
            toc_file,
            doc_dir,
            output,
        } => {
            sync::run(sync::SyncOptions {
                repo_path,
                toc_file,
                doc_dir,
                output,
            })?;
        }
        Commands::SectionDiff {
            repo_path,
            base_commit,
            target_commit,
            files,
            context,
            no_line_numbers,
            output,
        } => {
            diff::section_diff(diff::SectionDiffOptions {
                repo_path,
                base_commit,
                target_commit,
                files,
                context,
                no_line_numbers,
                output,
            })?;
        }
        Commands::GitDiff {
            repo_path,
            base_ref,
            head_ref,
            include_uncommitted,
            context,
            no_line_numbers,
            output,
        } => {
            diff::git_diff(diff::GitDiffOptions {
                repo_path,
                base_ref,
                head_ref,
                include_uncommitted,
                context,
                no_line_numbers,
                output,
            })?;
        }
        Commands::Validate {
            repo_path,
            toc_file,
            doc_dir,
            errors_only,
            output,
        } => {
            return Ok(validate::run(validate::ValidateOptions {
                repo_path,
                toc_file,
                doc_dir,
                errors_only,
                output,
            })?);
        }
        Commands::Config { action } => match action {
            ConfigAction::Show { format } => config::show(&format)?,
            ConfigAction::Path => config::path()?,
            ConfigAction::Init { global, force } => config::init(global, force)?,
        },
    }

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_repo_path_is_required() {
        for args in [
            vec!["tocsync", "update", "--toc-file", "toc.yaml", "--doc-dir", "docs"],
            vec!["tocsync", "sync", "--toc-file", "toc.yaml", "--doc-dir", "docs"],
        ] {
            let err = Cli::try_parse_from(args).err().unwrap();
            assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
        }

        let cli = Cli::try_parse_from([
            "tocsync", "sync", "--repo-path", "/repo", "--toc-file", "toc.yaml", "--doc-dir", "docs",
        ])
        .unwrap();
        match cli.command {
            Commands::Sync { repo_path, .. } => assert_eq!(repo_path, PathBuf::from("/repo")),
            _ => panic!("expected sync"),
        }
    }
}
