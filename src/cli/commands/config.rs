//! Config Command
//!
//! Usage:
//!   tocsync config show [--format json]
//!   tocsync config path
//!   tocsync config init [--global] [--force]

use crate::cli::ui::Output;
use crate::config::ConfigLoader;
use crate::types::{Result, SyncError};

pub fn show(format: &str) -> Result<()> {
    match format {
        "json" => ConfigLoader::show_config(true),
        "text" | "toml" => ConfigLoader::show_config(false),
        other => Err(SyncError::Config(format!(
            "Unknown format '{}'. Valid values: text, json",
            other
        ))),
    }
}

pub fn path() -> Result<()> {
    ConfigLoader::show_path();
    Ok(())
}

pub fn init(global: bool, force: bool) -> Result<()> {
    let path = if global {
        ConfigLoader::init_global(force)?
    } else {
        ConfigLoader::init_project(force)?
    };
    Output::new().success(&format!("Wrote {}", path.display()));
    Ok(())
}
