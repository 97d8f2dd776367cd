//! Package I/O and validation
//!
//! This module handles file validation, reading XML parts out of the ZIP
//! container and copying referenced media into the asset directory.

use std::io::{Cursor, Read};
use std::path::Path;
use zip::ZipArchive;

use super::error::DocumentError;
use super::parsing::paragraph::MediaIndex;

pub(crate) type Package<'a> = ZipArchive<Cursor<&'a [u8]>>;

pub(crate) const DOCUMENT_PART: &str = "word/document.xml";
const WORKBOOK_PART: &str = "xl/workbook.xml";

/// Check the extension, then that the package carries a main document part
pub fn validate_docx_file(file_path: &Path) -> Result<(), DocumentError> {
    let extension = file_path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("");
    if !extension.eq_ignore_ascii_case("docx") {
        return Err(DocumentError::NotDocx {
            extension: extension.to_string(),
        });
    }

    let bytes = std::fs::read(file_path)?;
    validate_docx(&bytes)
}

/// Package-level half of [`validate_docx_file`]
pub fn validate_docx(bytes: &[u8]) -> Result<(), DocumentError> {
    let package = open_package(bytes)?;
    if package.index_for_name(DOCUMENT_PART).is_some() {
        return Ok(());
    }
    if package.index_for_name(WORKBOOK_PART).is_some() {
        return Err(DocumentError::Spreadsheet);
    }
    Err(DocumentError::PartNotFound(DOCUMENT_PART))
}

/// Open package bytes; the only hard failure of the reader
pub(crate) fn open_package(bytes: &[u8]) -> Result<Package<'_>, DocumentError> {
    Ok(ZipArchive::new(Cursor::new(bytes))?)
}

/// Read an XML part as text. Absent or unreadable parts are `None`.
pub(crate) fn read_part(package: &mut Package<'_>, name: &str) -> Option<String> {
    let mut entry = match package.by_name(name) {
        Ok(entry) => entry,
        Err(_) => {
            log::warn!("Package has no {name} part");
            return None;
        }
    };
    let mut bytes = Vec::new();
    if let Err(e) = entry.read_to_end(&mut bytes) {
        log::warn!("Could not read {name}: {e}");
        return None;
    }
    Some(String::from_utf8_lossy(&bytes).into_owned())
}

/// Copy every registered media part into `asset_dir`; returns the count written
pub(crate) fn extract_media(
    package: &mut Package<'_>,
    media: &MediaIndex,
    asset_dir: &Path,
) -> Result<usize, DocumentError> {
    if media.len() == 0 {
        return Ok(0);
    }
    std::fs::create_dir_all(asset_dir)?;

    let mut written = 0;
    for (part, file_name) in media.entries() {
        let mut bytes = Vec::new();
        let read = package
            .by_name(part)
            .map_err(DocumentError::from)
            .and_then(|mut entry| Ok(entry.read_to_end(&mut bytes)?));
        if let Err(e) = read {
            log::warn!("Could not extract {part}: {e}");
            continue;
        }
        match std::fs::write(asset_dir.join(&file_name), &bytes) {
            Ok(()) => written += 1,
            Err(e) => log::warn!("Could not write {file_name}: {e}"),
        }
    }
    Ok(written)
}
