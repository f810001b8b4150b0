//! TOC specification: model, loading, flattening and source pattern matching

mod flatten;
mod loader;
mod model;
mod pattern;

pub use flatten::{PageInfo, SectionInfo, SectionRegistry, SectionVisit, TocVisitor, walk};
pub use loader::TocLoader;
pub use model::{Page, Section, Toc, TocProject};
pub use pattern::{PatternSet, SourcePattern, normalize_path};
