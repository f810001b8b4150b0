//! Generated documentation: markers, artifact scanning and structure validation

mod markers;
mod scanner;
mod validate;

pub use markers::{
    Marker, MarkerKind, MarkerProblem, MarkerScan, SectionBlock, extract_section_contents,
    find_markers, find_page_id, is_content_empty, scan_markers,
};
pub use scanner::{DocumentRecord, DocumentSet, list_documents, scan_documents};
pub use validate::{ValidationReport, ValidationSummary, Validator};
