//! Paragraph to content block conversion
//!
//! Walks the children of a `w:p` in document order and emits text, LaTeX and
//! image blocks. Image references are registered in the [`MediaIndex`] so
//! every media part gets one stable asset file name.

use std::collections::HashMap;

use super::super::models::ContentBlock;
use super::equation::{omml_plain_text, omml_to_latex};
use super::relationships::Relationships;
use super::xml::XmlElement;

/// URL prefix of extracted assets, relative to the work directory
pub const ASSET_DIR_NAME: &str = "doc-assets";

/// EMU per pixel at 96 DPI (914400 EMU per inch)
pub const EMU_PER_PIXEL: f64 = 9525.0;

/// Package media path to sequential asset id, in first-reference order
#[derive(Debug, Default)]
pub(crate) struct MediaIndex {
    ids: HashMap<String, u32>,
    order: Vec<String>,
}

impl MediaIndex {
    /// Register a media part (idempotent) and return its asset file name
    pub(crate) fn register(&mut self, part: &str) -> String {
        let id = match self.ids.get(part) {
            Some(id) => *id,
            None => {
                self.order.push(part.to_string());
                let id = self.order.len() as u32;
                self.ids.insert(part.to_string(), id);
                id
            }
        };
        asset_file_name(id, part)
    }

    /// Registered parts with their asset file names, in id order
    pub(crate) fn entries(&self) -> impl Iterator<Item = (&str, String)> {
        self.order
            .iter()
            .enumerate()
            .map(|(i, part)| (part.as_str(), asset_file_name(i as u32 + 1, part)))
    }

    pub(crate) fn len(&self) -> usize {
        self.order.len()
    }
}

/// `asset_%04d.<ext>` with the part's extension lower-cased
pub(crate) fn asset_file_name(id: u32, part: &str) -> String {
    let file = part.rsplit('/').next().unwrap_or(part);
    match file.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => format!("asset_{id:04}.{}", ext.to_lowercase()),
        _ => format!("asset_{id:04}"),
    }
}

/// Per-parse state shared by all paragraphs of one document
pub(crate) struct ParagraphReader<'a> {
    relationships: &'a Relationships,
    media: &'a mut MediaIndex,
}

impl<'a> ParagraphReader<'a> {
    pub(crate) fn new(relationships: &'a Relationships, media: &'a mut MediaIndex) -> Self {
        Self {
            relationships,
            media,
        }
    }

    /// Convert a `w:p` into its content blocks
    pub(crate) fn read_paragraph(&mut self, paragraph: &XmlElement) -> Vec<ContentBlock> {
        let mut blocks = Vec::new();
        self.read_children(paragraph, &mut blocks);
        blocks
    }

    fn read_children(&mut self, parent: &XmlElement, blocks: &mut Vec<ContentBlock>) {
        for child in parent.elements() {
            match child.name.as_str() {
                "w:r" => self.read_run(child, blocks),
                "m:oMath" | "m:oMathPara" => {
                    let latex = omml_to_latex(child);
                    if latex.is_empty() {
                        log::debug!("Equation without LaTeX: {:?}", omml_plain_text(child));
                    } else {
                        blocks.push(ContentBlock::latex(latex));
                    }
                }
                // Run containers: their runs belong to the paragraph
                "w:hyperlink" | "w:ins" | "w:smartTag" | "w:fldSimple" | "w:sdtContent" => {
                    self.read_children(child, blocks)
                }
                "w:sdt" => {
                    if let Some(content) = child.find("w:sdtContent") {
                        self.read_children(content, blocks);
                    }
                }
                _ => {}
            }
        }
    }

    fn read_run(&mut self, run: &XmlElement, blocks: &mut Vec<ContentBlock>) {
        let text = run.text_of("w:t");
        if !text.is_empty() {
            blocks.push(ContentBlock::text(text));
        }

        let Some(id) = image_reference(run) else {
            return;
        };
        let Some(part) = self.relationships.get(id) else {
            log::debug!("Image reference {id} has no relationship target");
            return;
        };
        let name = self.media.register(part);
        let (width, height) = image_extent(run).unzip();
        blocks.push(ContentBlock::image(
            format!("{ASSET_DIR_NAME}/{name}"),
            width,
            height,
        ));
    }
}

/// Relationship id of the image in a run: DrawingML `a:blip/@r:embed`
/// first, then VML `v:imagedata/@r:id` (OLE formula previews)
fn image_reference(run: &XmlElement) -> Option<&str> {
    run.descendants()
        .filter(|el| el.local_name() == "blip")
        .find_map(|blip| blip.attribute("r:embed").filter(|id| !id.is_empty()))
        .or_else(|| {
            run.descendants()
                .filter(|el| el.local_name() == "imagedata")
                .find_map(|data| data.attribute("r:id").filter(|id| !id.is_empty()))
        })
}

/// Display size in pixels from `wp:extent`, if both axes are well formed
fn image_extent(run: &XmlElement) -> Option<(u32, u32)> {
    let extent = run.descendants().find(|el| el.is("wp:extent"))?;
    let cx: i64 = extent.attribute("cx")?.trim().parse().ok()?;
    let cy: i64 = extent.attribute("cy")?.trim().parse().ok()?;
    Some((emu_to_pixels(cx), emu_to_pixels(cy)))
}

pub(crate) fn emu_to_pixels(emu: i64) -> u32 {
    ((emu as f64 / EMU_PER_PIXEL).round() as i64).max(1) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::parsing::xml::parse_xml;

    fn rels() -> Relationships {
        Relationships::parse(
            r#"<Relationships>
                <Relationship Id="rId5" Target="media/image1.PNG"/>
                <Relationship Id="rId6" Target="media/image2.wmf"/>
            </Relationships>"#,
        )
    }

    fn read(xml: &str, media: &mut MediaIndex) -> Vec<ContentBlock> {
        let rels = rels();
        let paragraph = parse_xml(xml).unwrap();
        ParagraphReader::new(&rels, media).read_paragraph(&paragraph)
    }

    #[test]
    fn test_runs_hyperlinks_and_math_keep_order() {
        let xml = r#"<w:p>
            <w:r><w:t>a</w:t></w:r>
            <w:hyperlink><w:r><w:t>b</w:t></w:r></w:hyperlink>
            <m:oMath><m:r><m:t>x</m:t></m:r></m:oMath>
            <w:ins><w:r><w:t>c</w:t></w:r></w:ins>
        </w:p>"#;
        let blocks = read(xml, &mut MediaIndex::default());
        assert_eq!(
            blocks,
            vec![
                ContentBlock::text("a"),
                ContentBlock::text("b"),
                ContentBlock::latex("x"),
                ContentBlock::text("c"),
            ]
        );
    }

    #[test]
    fn test_drawing_with_extent() {
        let xml = r#"<w:p><w:r><w:drawing><wp:inline>
            <wp:extent cx="952500" cy="476250"/>
            <a:graphic><a:graphicData><pic:pic><pic:blipFill><a:blip r:embed="rId5"/></pic:blipFill></pic:pic></a:graphicData></a:graphic>
        </wp:inline></w:drawing></w:r></w:p>"#;
        let blocks = read(xml, &mut MediaIndex::default());
        assert_eq!(
            blocks,
            vec![ContentBlock::image(
                "doc-assets/asset_0001.png",
                Some(100),
                Some(50)
            )]
        );
    }

    #[test]
    fn test_vml_image_without_extent_and_shared_index() {
        let mut media = MediaIndex::default();
        let xml = r#"<w:p>
            <w:r><w:object><v:shape><v:imagedata r:id="rId6"/></v:shape></w:object></w:r>
            <w:r><w:object><v:shape><v:imagedata r:id="rId6"/></v:shape></w:object></w:r>
        </w:p>"#;
        let blocks = read(xml, &mut media);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].url(), Some("doc-assets/asset_0001.wmf"));
        assert_eq!(blocks[0].dimensions(), (None, None));
        assert_eq!(blocks[1].url(), Some("doc-assets/asset_0001.wmf"));
        assert_eq!(media.len(), 1);
    }

    #[test]
    fn test_tiny_extent_rounds_up_to_one_pixel() {
        assert_eq!(emu_to_pixels(10), 1);
        assert_eq!(emu_to_pixels(9525 * 3 + 4000), 3);
    }
}
