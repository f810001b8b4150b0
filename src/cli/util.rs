//! CLI Common Utilities
//!
//! Shared context and report output for command handlers.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::cli::ui::Output;
use crate::config::{Config, ConfigLoader};
use crate::git::GitCli;
use crate::types::{Result, ResultExt, SyncError};

/// Command execution context
///
/// Loaded configuration plus the repository every relative path is
/// resolved against.
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub config: Config,
    pub repo_path: PathBuf,
}

impl CommandContext {
    pub fn load(repo_path: &Path) -> Result<Self> {
        let config = ConfigLoader::load()?;
        Ok(Self::with_config(config, repo_path))
    }

    pub fn with_config(config: Config, repo_path: &Path) -> Self {
        Self {
            config,
            repo_path: repo_path.to_path_buf(),
        }
    }

    /// Resolve a user-supplied path against the repository
    pub fn resolve(&self, path: &Path) -> PathBuf {
        resolve_path(&self.repo_path, path)
    }

    pub fn git(&self) -> GitCli {
        GitCli::new(&self.repo_path, &self.config.git)
    }

    pub fn require_repo(&self) -> Result<()> {
        if self.repo_path.is_dir() {
            Ok(())
        } else {
            Err(SyncError::Config(format!(
                "Repository path '{}' is not a directory",
                self.repo_path.display()
            )))
        }
    }
}

pub fn resolve_path(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Print a report as pretty JSON, to stdout or to `output`
pub fn write_report<T: Serialize>(report: &T, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;

    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .with_context(format!("Failed to create {}", parent.display()))?;
            }
            fs::write(path, format!("{}\n", json))
                .with_context(format!("Failed to write {}", path.display()))?;
            Output::new().success(&format!("Report written to {}", path.display()));
        }
        None => println!("{}", json),
    }
    Ok(())
}
