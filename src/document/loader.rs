//! Document loading and orchestration
//!
//! This module contains [`extract_paragraphs`], which coordinates the
//! parsing modules to turn a Word package into a stream of per-paragraph
//! content blocks, and [`parse_questions`], which feeds that stream through
//! the segmenter.

use std::path::Path;

use super::cleanup::filter_noise;
use super::error::DocumentError;
use super::io::{DOCUMENT_PART, extract_media, open_package, read_part};
use super::models::*;
use super::parsing::paragraph::{MediaIndex, ParagraphReader};
use super::parsing::relationships::Relationships;
use super::parsing::table::table_to_blocks;
use super::parsing::xml::{XmlElement, parse_xml};
use super::segment::segment_questions;
use crate::config::ExtractionConfig;

const RELATIONSHIPS_PART: &str = "word/_rels/document.xml.rels";

/// Extract the paragraph stream of a package and copy its media into
/// `asset_dir`.
///
/// Only bytes that are not a ZIP container are an error; missing or corrupt
/// parts degrade to an empty relationship table or an empty stream.
pub fn extract_paragraphs(
    bytes: &[u8],
    asset_dir: &Path,
    config: &ExtractionConfig,
) -> Result<Vec<ParagraphBlocks>, DocumentError> {
    let mut package = open_package(bytes)?;

    let relationships = read_part(&mut package, RELATIONSHIPS_PART)
        .map(|xml| Relationships::parse(&xml))
        .unwrap_or_default();
    if relationships.is_empty() {
        log::debug!("No internal relationships; images will not resolve");
    } else {
        log::debug!("Resolved {} relationships", relationships.len());
    }

    let Some(document_xml) = read_part(&mut package, DOCUMENT_PART) else {
        return Ok(Vec::new());
    };
    let root = match parse_xml(&document_xml) {
        Ok(root) => root,
        Err(e) => {
            log::warn!("Unreadable {DOCUMENT_PART}: {e}");
            return Ok(Vec::new());
        }
    };
    let Some(body) = root
        .find("w:body")
        .or_else(|| root.descendants().find(|el| el.is("w:body")))
    else {
        log::warn!("{DOCUMENT_PART} has no body");
        return Ok(Vec::new());
    };

    let mut media = MediaIndex::default();
    let mut paragraphs = Vec::new();
    {
        let mut reader = ParagraphReader::new(&relationships, &mut media);
        walk_body(body, &mut reader, &mut paragraphs);
    }

    let written = extract_media(&mut package, &media, asset_dir)?;
    log::info!(
        "Read {} paragraphs, extracted {written}/{} media files",
        paragraphs.len(),
        media.len()
    );

    Ok(filter_noise(paragraphs, &config.noise_patterns))
}

fn walk_body(
    container: &XmlElement,
    reader: &mut ParagraphReader<'_>,
    paragraphs: &mut Vec<ParagraphBlocks>,
) {
    for child in container.elements() {
        let blocks = match child.name.as_str() {
            "w:p" => reader.read_paragraph(child),
            "w:tbl" => table_to_blocks(child),
            // Block-level content controls wrap ordinary paragraphs
            "w:sdt" => {
                if let Some(content) = child.find("w:sdtContent") {
                    walk_body(content, reader, paragraphs);
                }
                continue;
            }
            _ => continue,
        };
        if !blocks.is_empty() {
            paragraphs.push(blocks);
        }
    }
}

/// Extract and segment a package into question records
pub fn parse_questions(
    bytes: &[u8],
    asset_dir: &Path,
    config: &ExtractionConfig,
) -> Result<Vec<ParsedQuestion>, DocumentError> {
    let paragraphs = extract_paragraphs(bytes, asset_dir, config)?;
    Ok(segment_questions(paragraphs))
}
