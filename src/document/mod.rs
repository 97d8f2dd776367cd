//! Document parsing and data structures module
//!
//! This module reads Microsoft Word (.docx) packages into per-paragraph
//! content blocks and segments them into question records.

pub(crate) mod cleanup;
pub mod error;
pub mod io;
pub mod loader;
pub mod models;
pub mod parsing;
pub mod segment;

// Re-export the models and the main entry points
pub use cleanup::normalize_text_blocks;
pub use error::DocumentError;
pub use io::{validate_docx, validate_docx_file};
pub use loader::{extract_paragraphs, parse_questions};
pub use models::*;
pub use segment::{Segmenter, SegmentState, segment_questions};
