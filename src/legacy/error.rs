use std::path::PathBuf;

use thiserror::Error;

/// Failures of one legacy asset; none of them abort the batch
#[derive(Debug, Error)]
pub enum LegacyError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("{tool} is not installed")]
    ToolMissing { tool: String },

    #[error("{tool} timed out after {secs}s")]
    Timeout { tool: String, secs: u64 },

    #[error("{tool} failed: {detail}")]
    ToolFailed { tool: String, detail: String },

    #[error("{tool} produced no output at {}", path.display())]
    NoOutput { tool: String, path: PathBuf },
}
