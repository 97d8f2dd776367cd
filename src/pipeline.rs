//! Document processing pipeline
//!
//! Runs one upload start to finish: the package is read and segmented into
//! questions, metafile formulas are rasterized and their blocks rewritten,
//! and, when requested, the formula bitmaps are recognized back into LaTeX.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::config::Config;
use crate::document::parsing::ASSET_DIR_NAME;
use crate::document::{ConversionStats, ParsedQuestion, parse_questions};
use crate::legacy::{
    self, CommandRecognizer, FormulaRecognizer, Rasterizer, ToolProbe, rasterizer_chain,
};

pub const SOURCE_FILE_NAME: &str = "source.docx";

/// How a document is processed
pub struct ProcessOptions {
    /// Recognize metafile formulas as LaTeX instead of keeping bitmaps
    pub use_latex: bool,
    /// Base URL that relative asset URLs are served under; defaults to the
    /// work directory
    pub asset_base_url: Option<String>,
    pub config: Config,
    /// Rasterizer backends in priority order; probed from the system when unset
    pub rasterizers: Option<Vec<Box<dyn Rasterizer>>>,
    /// Formula recognizer; built from the configured OCR command when unset
    pub recognizer: Option<Box<dyn FormulaRecognizer>>,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            use_latex: true,
            asset_base_url: None,
            config: Config::default(),
            rasterizers: None,
            recognizer: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessStats {
    pub question_count: usize,
    pub rasterize: ConversionStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ocr: Option<ConversionStats>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub questions: Vec<ParsedQuestion>,
    pub asset_dir: PathBuf,
    pub asset_base_url: String,
    pub stats: ProcessStats,
}

/// Twelve hex characters from a random UUID
pub fn new_session_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(12);
    id
}

/// Process a package held in memory, using `work_dir` for the source copy
/// and the extracted assets
pub async fn process_document(
    bytes: &[u8],
    work_dir: &Path,
    options: &ProcessOptions,
) -> Result<ProcessResult> {
    tokio::fs::create_dir_all(work_dir)
        .await
        .with_context(|| format!("Failed to create work directory {}", work_dir.display()))?;
    tokio::fs::write(work_dir.join(SOURCE_FILE_NAME), bytes)
        .await
        .context("Failed to store the source document")?;

    let asset_dir = work_dir.join(ASSET_DIR_NAME);
    let mut questions = parse_questions(bytes, &asset_dir, &options.config.extraction)?;

    let legacy_config = &options.config.legacy;
    let probed;
    let chain: &[Box<dyn Rasterizer>] = match &options.rasterizers {
        Some(chain) => chain,
        None => {
            let probe =
                ToolProbe::cached(Duration::from_secs(legacy_config.probe_timeout_secs)).await;
            probed = rasterizer_chain(probe, legacy_config);
            &probed
        }
    };
    let report =
        legacy::rasterize_metafiles(&asset_dir, chain, options.use_latex, legacy_config).await;
    legacy::rewrite_metafile_urls(&mut questions, &report.sizes);

    let ocr = if options.use_latex {
        let configured;
        let recognizer: Option<&dyn FormulaRecognizer> = match &options.recognizer {
            Some(recognizer) => Some(recognizer.as_ref()),
            None => {
                configured = CommandRecognizer::from_config(legacy_config);
                configured.as_ref().map(|r| r as &dyn FormulaRecognizer)
            }
        };
        Some(legacy::recognize_formulas(&mut questions, &asset_dir, recognizer, legacy_config).await)
    } else {
        None
    };

    let asset_base_url = options
        .asset_base_url
        .clone()
        .unwrap_or_else(|| format!("{}/", work_dir.display()));

    log::info!("Processed document into {} questions", questions.len());
    Ok(ProcessResult {
        session_id: None,
        stats: ProcessStats {
            question_count: questions.len(),
            rasterize: report.stats,
            ocr,
        },
        questions,
        asset_dir,
        asset_base_url,
    })
}

/// Process a `.docx` on disk.
///
/// With `work_dir` unset, a fresh session directory is allocated under the
/// system temporary directory and its id is reported in the result.
pub async fn process_file(
    path: &Path,
    work_dir: Option<&Path>,
    options: &ProcessOptions,
) -> Result<ProcessResult> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let (work_dir, session_id) = match work_dir {
        Some(dir) => (dir.to_path_buf(), None),
        None => {
            let id = new_session_id();
            (std::env::temp_dir().join("quizdocx").join(&id), Some(id))
        }
    };

    let mut result = process_document(&bytes, &work_dir, options).await?;
    result.session_id = session_id;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_shape() {
        let id = new_session_id();
        assert_eq!(id.len(), 12);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(id, new_session_id());
    }

    #[tokio::test]
    async fn test_non_zip_input_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let options = ProcessOptions {
            rasterizers: Some(Vec::new()),
            ..ProcessOptions::default()
        };
        assert!(process_document(b"not a zip", dir.path(), &options).await.is_err());
    }
}
