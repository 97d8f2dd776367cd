//! Core data structures for question records
//!
//! This module defines the public types produced by the reader and the
//! segmenter and consumed by the legacy pipeline and the exporter: content
//! blocks, question types and parsed questions.

use serde::{Deserialize, Deserializer, Serialize};

/// A per-paragraph list of content blocks, as produced by the reader
pub type ParagraphBlocks = Vec<ContentBlock>;

/// One piece of question content.
///
/// Serializes as `{ "type": "text", "content": "..." }` or
/// `{ "type": "image", "url": "...", "width": 120, "height": 40 }`;
/// absent dimensions are omitted rather than written as `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    Text {
        content: String,
    },
    Latex {
        content: String,
    },
    Image {
        url: String,
        #[serde(
            default,
            deserialize_with = "positive_dimension",
            skip_serializing_if = "Option::is_none"
        )]
        width: Option<u32>,
        #[serde(
            default,
            deserialize_with = "positive_dimension",
            skip_serializing_if = "Option::is_none"
        )]
        height: Option<u32>,
    },
    Svg {
        url: String,
        #[serde(
            default,
            deserialize_with = "positive_dimension",
            skip_serializing_if = "Option::is_none"
        )]
        width: Option<u32>,
        #[serde(
            default,
            deserialize_with = "positive_dimension",
            skip_serializing_if = "Option::is_none"
        )]
        height: Option<u32>,
    },
}

impl ContentBlock {
    pub fn text(content: impl Into<String>) -> Self {
        ContentBlock::Text {
            content: content.into(),
        }
    }

    pub fn latex(content: impl Into<String>) -> Self {
        ContentBlock::Latex {
            content: content.into(),
        }
    }

    /// Image block; zero dimensions are dropped so `width`/`height` stay ≥ 1
    pub fn image(url: impl Into<String>, width: Option<u32>, height: Option<u32>) -> Self {
        ContentBlock::Image {
            url: url.into(),
            width: width.filter(|w| *w >= 1),
            height: height.filter(|h| *h >= 1),
        }
    }

    pub fn svg(url: impl Into<String>, width: Option<u32>, height: Option<u32>) -> Self {
        ContentBlock::Svg {
            url: url.into(),
            width: width.filter(|w| *w >= 1),
            height: height.filter(|h| *h >= 1),
        }
    }

    /// Separator block inserted between consecutive appends to one section
    pub fn newline() -> Self {
        ContentBlock::text("\n")
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentBlock::Text { content } => Some(content),
            _ => None,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, ContentBlock::Text { .. })
    }

    /// URL of an image or svg block
    pub fn url(&self) -> Option<&str> {
        match self {
            ContentBlock::Image { url, .. } | ContentBlock::Svg { url, .. } => Some(url),
            _ => None,
        }
    }

    /// Stored display size of an image or svg block
    pub fn dimensions(&self) -> (Option<u32>, Option<u32>) {
        match self {
            ContentBlock::Image { width, height, .. } | ContentBlock::Svg { width, height, .. } => {
                (*width, *height)
            }
            _ => (None, None),
        }
    }
}

/// A stored `0` means "unknown", same as an absent key
fn positive_dimension<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u32>::deserialize(deserializer)?.filter(|v| *v >= 1))
}

/// Concatenated text of the `Text` blocks in a paragraph
pub fn paragraph_text(blocks: &[ContentBlock]) -> String {
    blocks.iter().filter_map(ContentBlock::as_text).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    #[default]
    SingleChoice,
    MultipleChoice,
    FillBlank,
    Solution,
}

impl QuestionType {
    /// Map a section keyword such as `单选题` to its question type
    pub fn from_section_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "单选题" => Some(QuestionType::SingleChoice),
            "多选题" => Some(QuestionType::MultipleChoice),
            "填空题" => Some(QuestionType::FillBlank),
            "解答题" => Some(QuestionType::Solution),
            _ => None,
        }
    }

    /// Display label used in exported documents
    pub fn label(&self) -> &'static str {
        match self {
            QuestionType::SingleChoice => "单选题",
            QuestionType::MultipleChoice => "多选题",
            QuestionType::FillBlank => "填空题",
            QuestionType::Solution => "解答题",
        }
    }
}

/// A question record as emitted by the segmenter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedQuestion {
    /// Question number as declared in the document text
    pub index: u32,
    pub question_type: QuestionType,
    pub question_body: Vec<ContentBlock>,
    #[serde(default)]
    pub answer: Vec<ContentBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<Vec<ContentBlock>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detailed_solution: Option<Vec<ContentBlock>>,
}

impl ParsedQuestion {
    pub fn new(index: u32, question_type: QuestionType) -> Self {
        Self {
            index,
            question_type,
            question_body: Vec::new(),
            answer: Vec::new(),
            analysis: None,
            detailed_solution: None,
        }
    }

    /// Every block of the question, section by section
    pub fn blocks(&self) -> impl Iterator<Item = &ContentBlock> {
        self.question_body
            .iter()
            .chain(self.answer.iter())
            .chain(self.analysis.iter().flatten())
            .chain(self.detailed_solution.iter().flatten())
    }

    pub fn blocks_mut(&mut self) -> impl Iterator<Item = &mut ContentBlock> {
        self.question_body
            .iter_mut()
            .chain(self.answer.iter_mut())
            .chain(self.analysis.iter_mut().flatten())
            .chain(self.detailed_solution.iter_mut().flatten())
    }
}

/// Summary statistics of a conversion stage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionStats {
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    pub trimmed: usize,
}
