//! Builders for synthetic test packages

#![allow(dead_code)]

use std::io::{Cursor, Write};

use zip::write::{SimpleFileOptions, ZipWriter};

pub const NAMESPACES: &str = concat!(
    r#"xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" "#,
    r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" "#,
    r#"xmlns:m="http://schemas.openxmlformats.org/officeDocument/2006/math" "#,
    r#"xmlns:wp="http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing" "#,
    r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" "#,
    r#"xmlns:pic="http://schemas.openxmlformats.org/drawingml/2006/picture""#,
);

const IMAGE_RELATIONSHIP: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";

/// A `.docx` with the given body paragraphs, image relationships
/// (`id`, `target` under `word/`) and media parts (`word/...` path, bytes)
pub fn build_docx(paragraphs: &[String], images: &[(&str, &str)], media: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let document = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document {NAMESPACES}><w:body>{}</w:body></w:document>"#,
        paragraphs.concat()
    );
    let relationships: String = images
        .iter()
        .map(|(id, target)| {
            format!(r#"<Relationship Id="{id}" Type="{IMAGE_RELATIONSHIP}" Target="{target}"/>"#)
        })
        .collect();
    let relationships = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{relationships}</Relationships>"#
    );

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    zip.start_file("word/document.xml", options).unwrap();
    zip.write_all(document.as_bytes()).unwrap();
    zip.start_file("word/_rels/document.xml.rels", options).unwrap();
    zip.write_all(relationships.as_bytes()).unwrap();
    for (path, bytes) in media {
        zip.start_file(*path, options).unwrap();
        zip.write_all(bytes).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

pub fn text_paragraph(text: &str) -> String {
    format!(r#"<w:p><w:r><w:t xml:space="preserve">{text}</w:t></w:r></w:p>"#)
}

pub fn math_run(text: &str) -> String {
    format!("<m:r><m:t>{text}</m:t></m:r>")
}

pub fn fraction(num: &str, den: &str) -> String {
    format!(
        "<m:oMath><m:f><m:num>{}</m:num><m:den>{}</m:den></m:f></m:oMath>",
        math_run(num),
        math_run(den)
    )
}

/// A run holding an inline drawing of relationship `id`
pub fn drawing_run(id: &str, cx: u64, cy: u64) -> String {
    format!(
        concat!(
            r#"<w:r><w:drawing><wp:inline><wp:extent cx="{cx}" cy="{cy}"/>"#,
            r#"<a:graphic><a:graphicData><pic:pic><pic:blipFill><a:blip r:embed="{id}"/>"#,
            r#"</pic:blipFill></pic:pic></a:graphicData></a:graphic></wp:inline></w:drawing></w:r>"#
        ),
        cx = cx,
        cy = cy,
        id = id
    )
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = image::RgbImage::from_pixel(width, height, image::Rgb([0, 0, 0]));
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

/// Placeable WMF header (22 bytes) for a box of `right × bottom` units at
/// `inch` units per inch, followed by an empty record area
pub fn placeable_wmf(right: i16, bottom: i16, inch: i16) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(&0x9AC6_CDD7u32.to_le_bytes());
    data.extend_from_slice(&0u16.to_le_bytes());
    for value in [0i16, 0, right, bottom, inch] {
        data.extend_from_slice(&value.to_le_bytes());
    }
    data.extend_from_slice(&0u32.to_le_bytes());
    data.extend_from_slice(&0u16.to_le_bytes());
    data.extend_from_slice(&[0u8; 18]);
    data
}
