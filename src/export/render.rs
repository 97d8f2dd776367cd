//! Document rendering
//!
//! Builds the `word/document.xml` tree for a question list. Rendering only
//! reads the pre-fetched [`AssetStore`]; media parts referenced by the tree
//! are collected alongside it for the package writer.

use std::collections::HashMap;

use super::ExportMode;
use super::assets::{AssetStore, FetchedImage};
use crate::config::ExportConfig;
use crate::document::parsing::xml::XmlElement;
use crate::document::{ContentBlock, ParsedQuestion};
use crate::equation::latex_to_omml;

pub const NS_W: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
pub const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
pub const NS_M: &str = "http://schemas.openxmlformats.org/officeDocument/2006/math";
const NS_WP: &str = "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing";
const NS_A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const NS_PIC: &str = "http://schemas.openxmlformats.org/drawingml/2006/picture";

pub const TITLE: &str = "数学试卷";
pub const ANSWER_HEADING: &str = "参考答案";
pub const IMAGE_PLACEHOLDER: &str = "[图片]";
const RULE: &str = "────────────────────────────────────────";
const GRAY: &str = "999999";
const SMALL_HALF_POINTS: u32 = 20;
const FALLBACK_MATH_FONT: &str = "Cambria Math";

const EMU_PER_PIXEL: u64 = 9525;
const EMU_PER_CM: u64 = 360_000;
const EMU_PER_POINT: f64 = 12_700.0;

/// Relationship ids below this are taken by the fixed package parts
const FIRST_MEDIA_RELATIONSHIP: usize = 10;

/// An image part referenced from the document
#[derive(Debug, Clone)]
pub struct MediaPart<'a> {
    pub relationship_id: String,
    /// Name under `word/media/`
    pub file_name: String,
    pub image: &'a FetchedImage,
}

#[derive(Debug, Clone)]
pub struct RenderedDocument<'a> {
    /// `w:document` root
    pub document: XmlElement,
    pub media: Vec<MediaPart<'a>>,
}

/// Paragraph under construction: properties first, then content
#[derive(Debug, Default)]
struct Paragraph {
    properties: Vec<XmlElement>,
    content: Vec<XmlElement>,
}

impl Paragraph {
    fn new() -> Self {
        Self::default()
    }

    fn centered(mut self) -> Self {
        self.properties.push(w_val("w:jc", "center"));
        self
    }

    fn styled(mut self, style: &str) -> Self {
        self.properties.insert(0, w_val("w:pStyle", style));
        self
    }

    fn shade(&mut self, fill: &str) {
        self.properties.push(
            XmlElement::new("w:shd")
                .attr("w:val", "clear")
                .attr("w:color", "auto")
                .attr("w:fill", fill),
        );
    }

    fn push(&mut self, element: XmlElement) {
        self.content.push(element);
    }

    fn into_element(self) -> XmlElement {
        let mut p = XmlElement::new("w:p");
        if !self.properties.is_empty() {
            let ppr = self
                .properties
                .into_iter()
                .fold(XmlElement::new("w:pPr"), |ppr, prop| ppr.child(prop));
            p.push(ppr);
        }
        for element in self.content {
            p.push(element);
        }
        p
    }
}

fn w_val(name: &str, value: impl Into<String>) -> XmlElement {
    XmlElement::new(name).attr("w:val", value)
}

/// Formatting of one text run
#[derive(Debug, Clone, Default)]
struct RunFormat<'f> {
    font: Option<&'f str>,
    bold: bool,
    italic: bool,
    color: Option<&'f str>,
    half_points: Option<u32>,
}

fn text_run(text: &str, format: &RunFormat<'_>) -> XmlElement {
    let mut rpr = XmlElement::new("w:rPr");
    if let Some(font) = format.font {
        rpr.push(
            XmlElement::new("w:rFonts")
                .attr("w:ascii", font)
                .attr("w:hAnsi", font)
                .attr("w:eastAsia", font),
        );
    }
    if format.bold {
        rpr.push(XmlElement::new("w:b"));
    }
    if format.italic {
        rpr.push(XmlElement::new("w:i"));
    }
    if let Some(color) = format.color {
        rpr.push(w_val("w:color", color));
    }
    if let Some(size) = format.half_points {
        rpr.push(w_val("w:sz", size.to_string()));
    }

    let mut run = XmlElement::new("w:r");
    if !rpr.children.is_empty() {
        run.push(rpr);
    }
    run.child(
        XmlElement::new("w:t")
            .attr("xml:space", "preserve")
            .text(text),
    )
}

struct Renderer<'a> {
    mode: ExportMode,
    assets: &'a AssetStore,
    config: &'a ExportConfig,
    shading: String,
    body: Vec<XmlElement>,
    media: Vec<MediaPart<'a>>,
    /// Relationship id by block URL
    media_ids: HashMap<String, String>,
    next_drawing_id: u32,
}

impl<'a> Renderer<'a> {
    fn new(mode: ExportMode, assets: &'a AssetStore, config: &'a ExportConfig) -> Self {
        Self {
            mode,
            assets,
            config,
            shading: config.shading_hex(),
            body: Vec::new(),
            media: Vec::new(),
            media_ids: HashMap::new(),
            next_drawing_id: 1,
        }
    }

    fn font(&self) -> RunFormat<'a> {
        RunFormat {
            font: Some(self.config.font.as_str()),
            ..RunFormat::default()
        }
    }

    fn add(&mut self, paragraph: Paragraph) {
        self.body.push(paragraph.into_element());
    }

    fn add_all(&mut self, paragraphs: Vec<Paragraph>) {
        for paragraph in paragraphs {
            self.add(paragraph);
        }
    }

    fn add_empty(&mut self) {
        self.add(Paragraph::new());
    }

    fn page_break(&mut self) {
        let mut paragraph = Paragraph::new();
        paragraph.push(XmlElement::new("w:r").child(XmlElement::new("w:br").attr("w:type", "page")));
        self.add(paragraph);
    }

    fn preamble(&mut self) {
        let mut title = Paragraph::new().styled("Heading1").centered();
        title.push(text_run(TITLE, &self.font()));
        self.add(title);

        let mut subtitle = Paragraph::new().centered();
        let format = RunFormat {
            color: Some(GRAY),
            half_points: Some(SMALL_HALF_POINTS),
            ..self.font()
        };
        subtitle.push(text_run(self.mode.subtitle(), &format));
        self.add(subtitle);

        let mut rule = Paragraph::new();
        rule.push(text_run(RULE, &RunFormat::default()));
        self.add(rule);
    }

    /// `N. ` in bold, then the gray question type label
    fn question_header(&self, number: usize, question: &ParsedQuestion) -> Paragraph {
        let mut header = Paragraph::new();
        let bold = RunFormat {
            bold: true,
            ..self.font()
        };
        header.push(text_run(&format!("{number}. "), &bold));
        let label = RunFormat {
            color: Some(GRAY),
            half_points: Some(SMALL_HALF_POINTS),
            ..self.font()
        };
        header.push(text_run(
            &format!("（{}）", question.question_type.label()),
            &label,
        ));
        header
    }

    fn question_with_body(&mut self, number: usize, question: &ParsedQuestion) {
        let header = self.question_header(number, question);
        let paragraphs = self.write_blocks(header, &question.question_body);
        self.add_all(paragraphs);
    }

    /// A labeled, shaded section; nothing for an empty section
    fn section(&mut self, label: &str, blocks: &[ContentBlock]) {
        if blocks.is_empty() {
            return;
        }
        let mut first = Paragraph::new();
        if !label.is_empty() {
            let bold = RunFormat {
                bold: true,
                ..self.font()
            };
            first.push(text_run(label, &bold));
        }
        let mut paragraphs = self.write_blocks(first, blocks);
        for paragraph in &mut paragraphs {
            paragraph.shade(&self.shading);
        }
        self.add_all(paragraphs);
    }

    /// Append blocks inline to `first`; a `\n` in text starts a new paragraph
    fn write_blocks(&mut self, first: Paragraph, blocks: &[ContentBlock]) -> Vec<Paragraph> {
        let assets = self.assets;
        let mut paragraphs = vec![first];
        for block in blocks {
            match block {
                ContentBlock::Text { content } => {
                    for (i, line) in content.split('\n').enumerate() {
                        if i > 0 {
                            paragraphs.push(Paragraph::new());
                        }
                        if !line.is_empty() {
                            let run = text_run(line, &self.font());
                            current(&mut paragraphs).push(run);
                        }
                    }
                }
                ContentBlock::Latex { content } => {
                    if content.trim().is_empty() {
                        continue;
                    }
                    let element = match latex_to_omml(content) {
                        Ok(omath) => omath,
                        Err(e) => {
                            log::debug!("Keeping LaTeX as text ({e}): {content}");
                            let format = RunFormat {
                                font: Some(FALLBACK_MATH_FONT),
                                italic: true,
                                ..RunFormat::default()
                            };
                            text_run(&format!(" {content} "), &format)
                        }
                    };
                    current(&mut paragraphs).push(element);
                }
                ContentBlock::Image { url, .. } | ContentBlock::Svg { url, .. } => {
                    let url = url.trim();
                    if url.is_empty() {
                        continue;
                    }
                    let run = match assets.get(url) {
                        Some(image) => self.image_run(url, image, block.dimensions().0),
                        None => text_run(IMAGE_PLACEHOLDER, &self.font()),
                    };
                    current(&mut paragraphs).push(run);
                }
            }
        }
        paragraphs
    }

    fn relationship_for(&mut self, url: &str, image: &'a FetchedImage) -> String {
        if let Some(id) = self.media_ids.get(url) {
            return id.clone();
        }
        let n = self.media.len() + 1;
        let id = format!("rId{}", FIRST_MEDIA_RELATIONSHIP + n);
        self.media.push(MediaPart {
            relationship_id: id.clone(),
            file_name: format!("image{n}.{}", image.extension),
            image,
        });
        self.media_ids.insert(url.to_string(), id.clone());
        id
    }

    fn image_run(&mut self, url: &str, image: &'a FetchedImage, stored_width: Option<u32>) -> XmlElement {
        let (cx, cy) = image_extent(image, stored_width, self.config);
        let relationship_id = self.relationship_for(url, image);
        let drawing_id = self.next_drawing_id;
        self.next_drawing_id += 1;

        let mut run = XmlElement::new("w:r");
        if let Some(shift) = baseline_shift(cy, self.config.font_size_pt) {
            run.push(XmlElement::new("w:rPr").child(w_val("w:position", shift.to_string())));
        }
        run.child(XmlElement::new("w:drawing").child(inline_picture(
            drawing_id,
            &relationship_id,
            cx,
            cy,
        )))
    }
}

fn current(paragraphs: &mut [Paragraph]) -> &mut Paragraph {
    // `paragraphs` always starts with the caller's paragraph
    let last = paragraphs.len() - 1;
    &mut paragraphs[last]
}

/// Rendered size in EMU: stored pixel width (capped) or the default width,
/// height from the image's aspect ratio
pub fn image_extent(image: &FetchedImage, stored_width: Option<u32>, config: &ExportConfig) -> (u64, u64) {
    let max = (config.max_image_width_cm * EMU_PER_CM as f64) as u64;
    let cx = match stored_width.filter(|w| *w > 0) {
        Some(px) => (u64::from(px) * EMU_PER_PIXEL).min(max),
        None => (config.default_image_width_cm * EMU_PER_CM as f64) as u64,
    };
    let cy = cx * u64::from(image.height) / u64::from(image.width.max(1));
    (cx, cy.max(1))
}

/// Negative `w:position` (half-points) that centers an image of height `cy`
/// on the text line; `None` for images small enough to sit on the baseline
pub fn baseline_shift(cy: u64, font_size_pt: u32) -> Option<i64> {
    let height_pt = cy as f64 / EMU_PER_POINT;
    let offset_pt = height_pt / 2.0 - f64::from(font_size_pt) * 0.35;
    if offset_pt < 1.0 {
        return None;
    }
    Some(-((offset_pt * 2.0).round() as i64))
}

fn inline_picture(id: u32, relationship_id: &str, cx: u64, cy: u64) -> XmlElement {
    let name = format!("Picture {id}");
    let extent = |tag: &str| {
        XmlElement::new(tag)
            .attr("cx", cx.to_string())
            .attr("cy", cy.to_string())
    };
    let picture = XmlElement::new("pic:pic")
        .child(
            XmlElement::new("pic:nvPicPr")
                .child(
                    XmlElement::new("pic:cNvPr")
                        .attr("id", id.to_string())
                        .attr("name", name.as_str()),
                )
                .child(XmlElement::new("pic:cNvPicPr")),
        )
        .child(
            XmlElement::new("pic:blipFill")
                .child(XmlElement::new("a:blip").attr("r:embed", relationship_id))
                .child(XmlElement::new("a:stretch").child(XmlElement::new("a:fillRect"))),
        )
        .child(
            XmlElement::new("pic:spPr")
                .child(
                    XmlElement::new("a:xfrm")
                        .child(XmlElement::new("a:off").attr("x", "0").attr("y", "0"))
                        .child(extent("a:ext")),
                )
                .child(
                    XmlElement::new("a:prstGeom")
                        .attr("prst", "rect")
                        .child(XmlElement::new("a:avLst")),
                ),
        );

    XmlElement::new("wp:inline")
        .attr("distT", "0")
        .attr("distB", "0")
        .attr("distL", "0")
        .attr("distR", "0")
        .child(extent("wp:extent"))
        .child(
            XmlElement::new("wp:docPr")
                .attr("id", id.to_string())
                .attr("name", name.as_str()),
        )
        .child(
            XmlElement::new("a:graphic").attr("xmlns:a", NS_A).child(
                XmlElement::new("a:graphicData")
                    .attr("uri", NS_PIC)
                    .child(picture.attr("xmlns:pic", NS_PIC)),
            ),
        )
}

fn section_properties() -> XmlElement {
    XmlElement::new("w:sectPr")
        .child(
            XmlElement::new("w:pgSz")
                .attr("w:w", "11906")
                .attr("w:h", "16838"),
        )
        .child(
            XmlElement::new("w:pgMar")
                .attr("w:top", "1440")
                .attr("w:right", "1800")
                .attr("w:bottom", "1440")
                .attr("w:left", "1800")
                .attr("w:header", "851")
                .attr("w:footer", "992")
                .attr("w:gutter", "0"),
        )
}

/// Build the document tree for `questions` in the given mode
pub fn render_document<'a>(
    questions: &[ParsedQuestion],
    mode: ExportMode,
    assets: &'a AssetStore,
    config: &'a ExportConfig,
) -> RenderedDocument<'a> {
    let mut renderer = Renderer::new(mode, assets, config);
    renderer.preamble();

    match mode {
        ExportMode::Teacher => {
            for (i, question) in questions.iter().enumerate() {
                renderer.question_with_body(i + 1, question);
                renderer.section("【答案】", &question.answer);
                renderer.section("【分析】", question.analysis.as_deref().unwrap_or_default());
                renderer.section(
                    "【详解】",
                    question.detailed_solution.as_deref().unwrap_or_default(),
                );
                renderer.add_empty();
            }
        }
        ExportMode::Student => {
            for (i, question) in questions.iter().enumerate() {
                renderer.question_with_body(i + 1, question);
                renderer.add_empty();
            }
        }
        ExportMode::Normal => {
            for (i, question) in questions.iter().enumerate() {
                renderer.question_with_body(i + 1, question);
                renderer.add_empty();
            }
            renderer.page_break();
            let mut heading = Paragraph::new().styled("Heading2").centered();
            heading.push(text_run(ANSWER_HEADING, &renderer.font()));
            renderer.add(heading);
            for (i, question) in questions.iter().enumerate() {
                renderer.section(&format!("{}. ", i + 1), &question.answer);
                renderer.section(
                    "   【分析】",
                    question.analysis.as_deref().unwrap_or_default(),
                );
                renderer.section(
                    "   【详解】",
                    question.detailed_solution.as_deref().unwrap_or_default(),
                );
                renderer.add_empty();
            }
        }
    }

    let mut body = XmlElement::new("w:body");
    for paragraph in renderer.body {
        body.push(paragraph);
    }
    body.push(section_properties());

    let document = XmlElement::new("w:document")
        .attr("xmlns:w", NS_W)
        .attr("xmlns:r", NS_R)
        .attr("xmlns:m", NS_M)
        .attr("xmlns:wp", NS_WP)
        .child(body);

    RenderedDocument {
        document,
        media: renderer.media,
    }
}
