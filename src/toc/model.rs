//! TOC specification tree
//!
//! Strongly typed mirror of the authored YAML:
//!
//! ```yaml
//! project:
//!   name: my-service
//!   ref_commit_hash: 3f2a9c1
//!   updated_at: 2025-01-10
//! pages:
//!   - id: overview
//!     filename: overview.md
//!     source_files: [src/]
//!     sections:
//!       - id: overview-core
//!         source_files: [lib/core.go]
//!         sections: [...]
//! ```

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Toc {
    #[serde(default)]
    pub project: TocProject,
    #[serde(default)]
    pub pages: Vec<Page>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TocProject {
    #[serde(default, deserialize_with = "scalar::string")]
    pub name: String,
    /// Commit the documentation was last derived from; absent on first run
    #[serde(default, deserialize_with = "scalar::optional")]
    pub ref_commit_hash: Option<String>,
    #[serde(default, deserialize_with = "scalar::optional")]
    pub updated_at: Option<String>,
}

impl TocProject {
    /// `updated_at` is kept verbatim; this only reports whether it is a recognizable date
    pub fn updated_at_is_valid(&self) -> bool {
        match self.updated_at.as_deref() {
            None => true,
            Some(value) => {
                DateTime::parse_from_rfc3339(value).is_ok()
                    || NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
            }
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Page {
    #[serde(default, deserialize_with = "scalar::optional")]
    pub id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub source_files: Vec<String>,
    #[serde(default)]
    pub sections: Vec<Section>,
    #[serde(default)]
    pub related_pages: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    #[serde(default, deserialize_with = "scalar::optional")]
    pub id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_autogen")]
    pub autogen: bool,
    #[serde(default)]
    pub source_files: Vec<String>,
    #[serde(default)]
    pub diagrams_needed: bool,
    #[serde(default)]
    pub diagram_types: Vec<String>,
    #[serde(default)]
    pub sections: Vec<Section>,
}

fn default_autogen() -> bool {
    true
}

impl Default for Section {
    fn default() -> Self {
        Self {
            id: None,
            title: String::new(),
            description: String::new(),
            autogen: true,
            source_files: Vec::new(),
            diagrams_needed: false,
            diagram_types: Vec::new(),
            sections: Vec::new(),
        }
    }
}

/// YAML scalars that are identifiers even when they look like numbers
/// (`ref_commit_hash: 1234567`, `id: 42`)
mod scalar {
    use super::*;
    use serde::de::Error;
    use serde_yaml::Value;

    pub fn optional<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
        let value = Option::<Value>::deserialize(deserializer)?;
        let text = match value {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s),
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(Value::Bool(b)) => Some(b.to_string()),
            Some(other) => {
                return Err(D::Error::custom(format!(
                    "expected a scalar, found {:?}",
                    other
                )));
            }
        };
        Ok(text.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()))
    }

    pub fn string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        Ok(optional(deserializer)?.unwrap_or_default())
    }
}
