//! quizdocx: math exam questions out of, and back into, .docx files
//!
//! This library reads Word documents into structured question records with
//! LaTeX math, recovers formulas stored as legacy metafile images, and
//! renders question records back into a Word document with native equations.

pub mod config;
pub mod document;
pub mod equation;
pub mod export;
pub mod legacy;
pub mod pipeline;

// Re-export commonly used types
pub use config::Config;
pub use document::{ContentBlock, ConversionStats, ParsedQuestion, QuestionType, parse_questions};
pub use equation::{latex_to_omml, mathml_str_to_omml};
pub use export::{ExportMode, export_questions};
pub use legacy::sanitize_latex;
pub use pipeline::{ProcessOptions, ProcessResult, process_document, process_file};
