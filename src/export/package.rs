//! Package writing
//!
//! Serializes a [`RenderedDocument`] into a `.docx` ZIP container together
//! with the fixed parts Word needs to open it.

use std::io::{Cursor, Write};

use zip::CompressionMethod;
use zip::write::{SimpleFileOptions, ZipWriter};

use super::ExportError;
use super::render::{NS_R, NS_W, RenderedDocument};
use crate::config::ExportConfig;
use crate::document::parsing::xml::{XmlElement, write_xml};

const NS_CONTENT_TYPES: &str = "http://schemas.openxmlformats.org/package/2006/content-types";
const NS_PACKAGE_RELATIONSHIPS: &str =
    "http://schemas.openxmlformats.org/package/2006/relationships";
const REL_OFFICE_DOCUMENT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
const REL_STYLES: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";
const REL_IMAGE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";

const DOCUMENT_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml";
const STYLES_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml";
const RELATIONSHIPS_CONTENT_TYPE: &str = "application/vnd.openxmlformats-package.relationships+xml";

/// Relationship id of the styles part in `document.xml.rels`
const STYLES_RELATIONSHIP_ID: &str = "rId1";

fn content_types(rendered: &RenderedDocument<'_>) -> XmlElement {
    let mut types = XmlElement::new("Types")
        .attr("xmlns", NS_CONTENT_TYPES)
        .child(
            XmlElement::new("Default")
                .attr("Extension", "rels")
                .attr("ContentType", RELATIONSHIPS_CONTENT_TYPE),
        )
        .child(
            XmlElement::new("Default")
                .attr("Extension", "xml")
                .attr("ContentType", "application/xml"),
        );

    let mut extensions: Vec<(&str, &str)> = rendered
        .media
        .iter()
        .map(|part| (part.image.extension, part.image.content_type()))
        .collect();
    extensions.sort_unstable();
    extensions.dedup();
    for (extension, content_type) in extensions {
        types.push(
            XmlElement::new("Default")
                .attr("Extension", extension)
                .attr("ContentType", content_type),
        );
    }

    types
        .child(
            XmlElement::new("Override")
                .attr("PartName", "/word/document.xml")
                .attr("ContentType", DOCUMENT_CONTENT_TYPE),
        )
        .child(
            XmlElement::new("Override")
                .attr("PartName", "/word/styles.xml")
                .attr("ContentType", STYLES_CONTENT_TYPE),
        )
}

fn relationship(id: &str, kind: &str, target: &str) -> XmlElement {
    XmlElement::new("Relationship")
        .attr("Id", id)
        .attr("Type", kind)
        .attr("Target", target)
}

fn package_relationships() -> XmlElement {
    XmlElement::new("Relationships")
        .attr("xmlns", NS_PACKAGE_RELATIONSHIPS)
        .child(relationship("rId1", REL_OFFICE_DOCUMENT, "word/document.xml"))
}

fn document_relationships(rendered: &RenderedDocument<'_>) -> XmlElement {
    let mut rels = XmlElement::new("Relationships")
        .attr("xmlns", NS_PACKAGE_RELATIONSHIPS)
        .child(relationship(STYLES_RELATIONSHIP_ID, REL_STYLES, "styles.xml"));
    for part in &rendered.media {
        rels.push(relationship(
            &part.relationship_id,
            REL_IMAGE,
            &format!("media/{}", part.file_name),
        ));
    }
    rels
}

fn fonts(font: &str) -> XmlElement {
    XmlElement::new("w:rFonts")
        .attr("w:ascii", font)
        .attr("w:hAnsi", font)
        .attr("w:eastAsia", font)
}

fn heading_style(id: &str, name: &str, half_points: u32, level: u32) -> XmlElement {
    let val = |name: &str, value: String| XmlElement::new(name).attr("w:val", value);
    XmlElement::new("w:style")
        .attr("w:type", "paragraph")
        .attr("w:styleId", id)
        .child(val("w:name", name.to_string()))
        .child(val("w:basedOn", "Normal".to_string()))
        .child(val("w:next", "Normal".to_string()))
        .child(XmlElement::new("w:qFormat"))
        .child(
            XmlElement::new("w:pPr")
                .child(XmlElement::new("w:keepNext"))
                .child(
                    XmlElement::new("w:spacing")
                        .attr("w:before", "240")
                        .attr("w:after", "120"),
                )
                .child(val("w:outlineLvl", level.to_string())),
        )
        .child(
            XmlElement::new("w:rPr")
                .child(XmlElement::new("w:b"))
                .child(val("w:sz", half_points.to_string())),
        )
}

/// Document defaults carry the configured font; headings scale from it
fn styles(config: &ExportConfig) -> XmlElement {
    let half_points = config.font_half_points();
    XmlElement::new("w:styles")
        .attr("xmlns:w", NS_W)
        .attr("xmlns:r", NS_R)
        .child(
            XmlElement::new("w:docDefaults").child(
                XmlElement::new("w:rPrDefault").child(
                    XmlElement::new("w:rPr")
                        .child(fonts(&config.font))
                        .child(XmlElement::new("w:sz").attr("w:val", half_points.to_string()))
                        .child(
                            XmlElement::new("w:szCs").attr("w:val", half_points.to_string()),
                        )
                        .child(XmlElement::new("w:lang").attr("w:eastAsia", "zh-CN")),
                ),
            ),
        )
        .child(
            XmlElement::new("w:style")
                .attr("w:type", "paragraph")
                .attr("w:default", "1")
                .attr("w:styleId", "Normal")
                .child(XmlElement::new("w:name").attr("w:val", "Normal"))
                .child(XmlElement::new("w:qFormat")),
        )
        .child(heading_style("Heading1", "heading 1", half_points + 12, 0))
        .child(heading_style("Heading2", "heading 2", half_points + 6, 1))
}

/// Write the rendered document and its media as `.docx` bytes
pub fn write_package(
    rendered: &RenderedDocument<'_>,
    config: &ExportConfig,
) -> Result<Vec<u8>, ExportError> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let parts = [
        ("[Content_Types].xml", content_types(rendered)),
        ("_rels/.rels", package_relationships()),
        ("word/document.xml", rendered.document.clone()),
        ("word/styles.xml", styles(config)),
        (
            "word/_rels/document.xml.rels",
            document_relationships(rendered),
        ),
    ];
    for (path, root) in &parts {
        zip.start_file(*path, options)?;
        zip.write_all(&write_xml(root, true)?)?;
    }

    for part in &rendered.media {
        zip.start_file(format!("word/media/{}", part.file_name), options)?;
        zip.write_all(&part.image.bytes)?;
    }

    let cursor = zip.finish()?;
    log::debug!(
        "Packaged document with {} media parts",
        rendered.media.len()
    );
    Ok(cursor.into_inner())
}
