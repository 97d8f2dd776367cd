//! Error types for package reading

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("not a Word package: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("malformed XML: {0}")]
    Malformed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrong file extension
    #[error("Expected .docx file, got .{extension} (only Word .docx files are supported)")]
    NotDocx { extension: String },

    /// A spreadsheet package renamed or passed by mistake
    #[error("This appears to be an Excel file (.xlsx); only Word documents (.docx) are supported")]
    Spreadsheet,

    #[error("Invalid .docx file: missing {0}")]
    PartNotFound(&'static str),
}
