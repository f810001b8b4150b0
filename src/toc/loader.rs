//! TOC file loading

use std::fs;
use std::path::Path;

use tracing::debug;

use super::model::Toc;
use crate::types::{Result, ResultExt, SyncError};

pub struct TocLoader;

impl TocLoader {
    /// Read and parse a TOC YAML file. An empty file is an empty TOC.
    pub fn load(path: &Path) -> Result<Toc> {
        if !path.is_file() {
            return Err(SyncError::TocNotFound(path.display().to_string()));
        }

        let content =
            fs::read_to_string(path).with_context_fn(|| format!("reading {}", path.display()))?;
        let toc = Self::parse(&content)?;

        debug!(
            "Loaded TOC '{}' with {} pages from {}",
            toc.project.name,
            toc.pages.len(),
            path.display()
        );
        Ok(toc)
    }

    pub fn parse(content: &str) -> Result<Toc> {
        if content.trim().is_empty() {
            return Ok(Toc::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }
}
