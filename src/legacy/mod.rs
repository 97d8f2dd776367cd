//! Legacy formula pipeline
//!
//! Older exam papers embed formulas as Windows/Enhanced Metafile images
//! rather than native math. This module rasterizes those metafiles next to
//! the extracted media, trims them, points image blocks at the bitmaps and,
//! when requested, recovers LaTeX from them by OCR.
//!
//! Every stage degrades per file: a failed conversion is counted in the
//! returned [`ConversionStats`] and the batch carries on.

pub mod error;
pub mod imaging;
pub mod ocr;
pub mod probe;
pub mod rasterize;
pub mod sanitize;
pub mod wmf;

pub use error::LegacyError;
pub use ocr::{CommandRecognizer, FormulaRecognizer};
pub use probe::ToolProbe;
pub use rasterize::{RasterMethod, Rasterizer, rasterizer_chain};
pub use sanitize::sanitize_latex;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use crate::config::LegacyConfig;
use crate::document::{ContentBlock, ConversionStats, ParsedQuestion};

const METAFILE_EXTENSIONS: &[&str] = &["wmf", "emf"];

/// Outcome of [`rasterize_metafiles`]
#[derive(Debug, Clone, Default)]
pub struct RasterReport {
    pub stats: ConversionStats,
    /// Display size from the metafile header, by PNG file name
    pub sizes: BTreeMap<String, (u32, u32)>,
}

fn is_metafile(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| METAFILE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

/// The metafile a bitmap was converted from, if it is still there
fn source_metafile(png: &Path) -> Option<PathBuf> {
    METAFILE_EXTENSIONS
        .iter()
        .map(|ext| png.with_extension(ext))
        .find(|path| path.is_file())
}

fn is_up_to_date(png: &Path, source: &Path) -> bool {
    let modified = |path: &Path| path.metadata().and_then(|m| m.modified()).ok();
    match (modified(png), modified(source)) {
        (Some(png), Some(source)) => png >= source,
        _ => false,
    }
}

async fn list_metafiles(asset_dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let Ok(mut entries) = tokio::fs::read_dir(asset_dir).await else {
        return files;
    };
    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        if is_metafile(&path) {
            files.push(path);
        }
    }
    files.sort();
    files
}

/// Convert every metafile in `asset_dir` to a sibling PNG, then trim (and
/// for OCR, enhance) each converted bitmap.
///
/// The first backend of `chain` that converts the first pending file is
/// kept for the rest of the run.
pub async fn rasterize_metafiles(
    asset_dir: &Path,
    chain: &[Box<dyn Rasterizer>],
    for_latex: bool,
    config: &LegacyConfig,
) -> RasterReport {
    let mut report = RasterReport::default();
    let metafiles = list_metafiles(asset_dir).await;
    report.stats.total = metafiles.len();
    if metafiles.is_empty() {
        return report;
    }

    let mut selected: Option<&dyn Rasterizer> = None;
    let mut selection_failed = false;
    for source in &metafiles {
        let png = source.with_extension("png");
        if is_up_to_date(&png, source) {
            report.stats.success += 1;
            continue;
        }
        if selection_failed {
            report.stats.failed += 1;
            continue;
        }

        let converted = match selected {
            Some(rasterizer) => match rasterizer.rasterize(source, &png).await {
                Ok(()) => true,
                Err(e) => {
                    log::warn!("Could not rasterize {}: {e}", source.display());
                    false
                }
            },
            None => {
                for candidate in chain {
                    match candidate.rasterize(source, &png).await {
                        Ok(()) => {
                            log::info!("Rasterizing metafiles with {}", candidate.method().as_str());
                            selected = Some(candidate.as_ref());
                            break;
                        }
                        Err(e) => log::debug!("{} unusable: {e}", candidate.method().as_str()),
                    }
                }
                if selected.is_none() {
                    log::warn!("No converter could rasterize metafile formulas");
                    selection_failed = true;
                }
                selected.is_some()
            }
        };
        if converted {
            report.stats.success += 1;
        } else {
            report.stats.failed += 1;
        }
    }
    report.stats.method = selected.map(|r| r.method().as_str().to_string());

    let padding = if for_latex {
        config.ocr_padding
    } else {
        config.image_padding
    };
    for source in &metafiles {
        let png = source.with_extension("png");
        if !png.is_file() {
            continue;
        }
        match imaging::trim_whitespace(&png, padding, config.white_threshold) {
            Ok(true) => report.stats.trimmed += 1,
            Ok(false) => {}
            Err(e) => log::warn!("Could not trim {}: {e}", png.display()),
        }
        if for_latex {
            if let Err(e) = imaging::enhance_for_ocr(&png, config.contrast, config.sharpness) {
                log::warn!("Could not enhance {}: {e}", png.display());
            }
        }
        if let (Some(size), Some(name)) = (wmf::metafile_size(source), png.file_name()) {
            report.sizes.insert(name.to_string_lossy().into_owned(), size);
        }
    }

    log::info!(
        "Rasterized {}/{} metafiles ({} trimmed)",
        report.stats.success,
        report.stats.total,
        report.stats.trimmed
    );
    report
}

/// Replace the extension of a `.wmf`/`.emf` URL with `.png`
fn png_url(url: &str) -> Option<String> {
    let (stem, ext) = url.rsplit_once('.')?;
    if ext.contains('/') || !METAFILE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()) {
        return None;
    }
    Some(format!("{stem}.png"))
}

fn file_name(url: &str) -> &str {
    url.rsplit(['/', '\\']).next().unwrap_or(url)
}

/// Point image blocks at the converted bitmaps; the header size, when
/// known, replaces the stored width and height
pub fn rewrite_metafile_urls(questions: &mut [ParsedQuestion], sizes: &BTreeMap<String, (u32, u32)>) {
    for block in questions.iter_mut().flat_map(ParsedQuestion::blocks_mut) {
        let (ContentBlock::Image { url, width, height } | ContentBlock::Svg { url, width, height }) =
            block
        else {
            continue;
        };
        let Some(new_url) = png_url(url) else {
            continue;
        };
        if let Some((w, h)) = sizes.get(file_name(&new_url)) {
            *width = Some(*w).filter(|w| *w >= 1);
            *height = Some(*h).filter(|h| *h >= 1);
        }
        *url = new_url;
    }
}

fn is_remote(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Relative `.png` URLs whose bitmap was converted from a metafile
fn formula_candidates(questions: &[ParsedQuestion], asset_dir: &Path) -> BTreeSet<String> {
    questions
        .iter()
        .flat_map(ParsedQuestion::blocks)
        .filter_map(ContentBlock::url)
        .map(|url| url.replace('\\', "/"))
        .filter(|url| !is_remote(url) && url.to_ascii_lowercase().ends_with(".png"))
        .filter(|url| source_metafile(&asset_dir.join(file_name(url))).is_some())
        .collect()
}

/// Recognize converted formula bitmaps and turn their blocks into LaTeX.
///
/// With no recognizer, or one that is unavailable, every candidate counts as
/// failed and the blocks stay images.
pub async fn recognize_formulas(
    questions: &mut [ParsedQuestion],
    asset_dir: &Path,
    recognizer: Option<&dyn FormulaRecognizer>,
    config: &LegacyConfig,
) -> ConversionStats {
    let candidates = formula_candidates(questions, asset_dir);
    let mut stats = ConversionStats {
        total: candidates.len(),
        ..ConversionStats::default()
    };
    if candidates.is_empty() {
        return stats;
    }

    let recognizer = match recognizer {
        Some(recognizer) if recognizer.available().await => recognizer,
        _ => {
            log::warn!("Formula recognizer unavailable; keeping {} formula images", stats.total);
            stats.failed = stats.total;
            return stats;
        }
    };

    let mut recognized: HashMap<String, String> = HashMap::new();
    for url in &candidates {
        match recognize_one(recognizer, &asset_dir.join(file_name(url)), config).await {
            Ok(Some(latex)) => {
                recognized.insert(url.clone(), latex);
            }
            Ok(None) => stats.failed += 1,
            Err(e) => {
                log::warn!("Recognition failed for {url}: {e}");
                stats.failed += 1;
            }
        }
    }
    stats.success = recognized.len();

    for block in questions.iter_mut().flat_map(ParsedQuestion::blocks_mut) {
        let latex = block
            .url()
            .map(|url| url.replace('\\', "/"))
            .and_then(|url| recognized.get(&url));
        if let Some(latex) = latex {
            *block = ContentBlock::latex(latex.clone());
        }
    }

    log::info!("Recognized {}/{} formula images", stats.success, stats.total);
    stats
}

async fn recognize_one(
    recognizer: &dyn FormulaRecognizer,
    png: &Path,
    config: &LegacyConfig,
) -> Result<Option<String>, LegacyError> {
    let prepared = imaging::prepare_for_ocr(
        image::open(png)?,
        config.ocr_min_dimension,
        config.ocr_border,
    );
    let input = png.with_extension("ocr.png");
    prepared.save(&input)?;
    let result = recognizer.recognize(&input).await;
    if let Err(e) = tokio::fs::remove_file(&input).await {
        log::debug!("Could not remove {}: {e}", input.display());
    }
    Ok(result?
        .map(|latex| sanitize_latex(latex.trim()))
        .filter(|latex| !latex.is_empty()))
}
