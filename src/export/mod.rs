//! Word export
//!
//! Writes question records back into a new `.docx`. Images are fetched up
//! front ([`assets`]); rendering the document tree ([`render`]) is pure and
//! the package writer ([`package`]) only serializes.

pub mod assets;
pub mod package;
pub mod render;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ExportConfig;
use crate::document::{DocumentError, ParsedQuestion};

pub use assets::{AssetStore, FetchedImage};
pub use package::write_package;
pub use render::{RenderedDocument, render_document};

/// Which parts of each question are exported, and where
#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportMode {
    /// Each question followed by its answer, analysis and solution
    #[default]
    Teacher,
    /// Question bodies only
    Student,
    /// Question bodies, then all answers after a page break
    Normal,
}

impl ExportMode {
    pub fn subtitle(&self) -> &'static str {
        match self {
            ExportMode::Teacher => "（教师版 — 含答案解析）",
            ExportMode::Student => "（学生版）",
            ExportMode::Normal => "（答案附后）",
        }
    }
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("XML error: {0}")]
    Xml(#[from] DocumentError),

    #[error("package error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Fetch the referenced images, render and package the questions
pub async fn export_questions(
    questions: &[ParsedQuestion],
    mode: ExportMode,
    asset_base_url: Option<&str>,
    config: &ExportConfig,
) -> Result<Vec<u8>, ExportError> {
    let assets = AssetStore::fetch(questions, asset_base_url, config).await;
    let rendered = render_document(questions, mode, &assets, config);
    write_package(&rendered, config)
}
