//! Question segmentation
//!
//! Turns the flat paragraph stream of an exam paper into question records.
//! Each paragraph is classified once ([`classify`]) and fed through a single
//! transition function ([`Segmenter::feed`]) over [`SegmentState`].

use once_cell::sync::Lazy;
use regex::Regex;

use super::cleanup::{merge_adjacent_text, normalize_text_blocks};
use super::models::*;

static SECTION_HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[一二三四五六七八九十]+、\s*(单选题|多选题|填空题|解答题)")
        .expect("section heading regex")
});
static QUESTION_START: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)[.．]").expect("question start regex"));
static QUESTION_NUMERAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+[．.、]\s*").expect("question numeral regex"));

pub const ANSWER_MARKER: &str = "【答案】";
pub const ANALYSIS_MARKER: &str = "【分析】";
pub const DETAIL_MARKER: &str = "【详解】";

/// Which part of the open question receives content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SegmentState {
    /// No question opened yet
    #[default]
    None,
    Body,
    Answer,
    Analysis,
    DetailedSolution,
}

/// Classification of one paragraph by its text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParagraphKind {
    /// `一、单选题` and friends: sets the type of following questions
    SectionHeading(QuestionType),
    /// `N.` / `N．`: opens question N
    QuestionStart(u32),
    /// Contains a section marker; the marker text and the state it selects
    Marker(&'static str, SegmentState),
    Content,
}

/// Classify a paragraph by its concatenated text
pub fn classify(text: &str) -> ParagraphKind {
    let text = text.trim();

    if let Some(caps) = SECTION_HEADING.captures(text) {
        if let Some(kind) = QuestionType::from_section_keyword(&caps[1]) {
            return ParagraphKind::SectionHeading(kind);
        }
    }
    if let Some(caps) = QUESTION_START.captures(text) {
        return ParagraphKind::QuestionStart(question_number(&caps[1]));
    }
    for (marker, state) in [
        (ANSWER_MARKER, SegmentState::Answer),
        (ANALYSIS_MARKER, SegmentState::Analysis),
        (DETAIL_MARKER, SegmentState::DetailedSolution),
    ] {
        if text.contains(marker) {
            return ParagraphKind::Marker(marker, state);
        }
    }
    ParagraphKind::Content
}

/// Saturates oversized numerals; `0` counts as question 1
fn question_number(digits: &str) -> u32 {
    digits
        .parse::<u64>()
        .map_or(u32::MAX, |n| u32::try_from(n).unwrap_or(u32::MAX))
        .max(1)
}

#[derive(Debug, Default)]
pub struct Segmenter {
    state: SegmentState,
    question_type: QuestionType,
    current: Option<ParsedQuestion>,
    finished: Vec<ParsedQuestion>,
}

impl Segmenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SegmentState {
        self.state
    }

    /// Type assigned to questions opened from now on
    pub fn question_type(&self) -> QuestionType {
        self.question_type
    }

    /// Feed one paragraph and return the resulting state
    pub fn feed(&mut self, paragraph: ParagraphBlocks) -> SegmentState {
        let blocks = merge_adjacent_text(paragraph);
        let kind = classify(&paragraph_text(&blocks));

        match kind {
            ParagraphKind::SectionHeading(question_type) => {
                self.question_type = question_type;
            }
            ParagraphKind::QuestionStart(index) => {
                self.close_question();
                let mut question = ParsedQuestion::new(index, self.question_type);
                question.analysis = Some(Vec::new());
                question.detailed_solution = Some(Vec::new());
                append_section(&mut question.question_body, strip_numeral(blocks));
                self.current = Some(question);
                self.state = SegmentState::Body;
            }
            ParagraphKind::Marker(marker, state) if self.current.is_some() => {
                self.state = state;
                let blocks = strip_marker(blocks, marker);
                self.append(blocks);
            }
            ParagraphKind::Marker(..) | ParagraphKind::Content => {
                if self.current.is_some() {
                    self.append(blocks);
                } else {
                    log::debug!("Skipping paragraph before the first question");
                }
            }
        }
        self.state
    }

    /// Close the stream and return all questions, post-processed
    pub fn finish(mut self) -> Vec<ParsedQuestion> {
        self.close_question();
        self.finished
    }

    fn append(&mut self, blocks: Vec<ContentBlock>) {
        let Some(question) = self.current.as_mut() else {
            return;
        };
        let section = match self.state {
            SegmentState::None => return,
            SegmentState::Body => &mut question.question_body,
            SegmentState::Answer => &mut question.answer,
            SegmentState::Analysis => question.analysis.get_or_insert_with(Vec::new),
            SegmentState::DetailedSolution => {
                question.detailed_solution.get_or_insert_with(Vec::new)
            }
        };
        append_section(section, blocks);
    }

    fn close_question(&mut self) {
        if let Some(question) = self.current.take() {
            self.finished.push(finalize(question));
        }
    }
}

/// Segment a whole paragraph stream
pub fn segment_questions(paragraphs: Vec<ParagraphBlocks>) -> Vec<ParsedQuestion> {
    let mut segmenter = Segmenter::new();
    for paragraph in paragraphs {
        segmenter.feed(paragraph);
    }
    let questions = segmenter.finish();
    log::info!("Segmented {} questions", questions.len());
    questions
}

/// Append with an explicit newline separator when the section already has content
fn append_section(section: &mut Vec<ContentBlock>, blocks: Vec<ContentBlock>) {
    if blocks.is_empty() {
        return;
    }
    if !section.is_empty() {
        section.push(ContentBlock::newline());
    }
    section.extend(blocks);
}

/// Remove the leading question numeral from the first text block
fn strip_numeral(mut blocks: Vec<ContentBlock>) -> Vec<ContentBlock> {
    if let Some(pos) = blocks.iter().position(ContentBlock::is_text) {
        if let ContentBlock::Text { content } = &blocks[pos] {
            let stripped = QUESTION_NUMERAL
                .replace(content.trim_start(), "")
                .into_owned();
            if stripped.is_empty() {
                blocks.remove(pos);
            } else {
                blocks[pos] = ContentBlock::text(stripped);
            }
        }
    }
    blocks
}

/// Remove a section marker from the first text block containing it
fn strip_marker(mut blocks: Vec<ContentBlock>, marker: &str) -> Vec<ContentBlock> {
    let found = blocks
        .iter()
        .position(|b| b.as_text().is_some_and(|text| text.contains(marker)));
    if let Some(pos) = found {
        let remaining = blocks[pos]
            .as_text()
            .map(|text| text.replacen(marker, "", 1).trim().to_string())
            .unwrap_or_default();
        if remaining.is_empty() {
            blocks.remove(pos);
        } else {
            blocks[pos] = ContentBlock::text(remaining);
        }
    }
    blocks
}

fn finalize(mut question: ParsedQuestion) -> ParsedQuestion {
    question.question_body = normalize_text_blocks(std::mem::take(&mut question.question_body));
    question.answer = normalize_text_blocks(std::mem::take(&mut question.answer));
    question.analysis = question
        .analysis
        .take()
        .map(normalize_text_blocks)
        .filter(|blocks| !blocks.is_empty());
    question.detailed_solution = question
        .detailed_solution
        .take()
        .map(normalize_text_blocks)
        .filter(|blocks| !blocks.is_empty());
    question
}

#[cfg(test)]
mod tests {
    use super::*;

    fn para(text: &str) -> ParagraphBlocks {
        vec![ContentBlock::text(text)]
    }

    #[test]
    fn test_classify() {
        assert_eq!(
            classify("三、填空题（每题5分）"),
            ParagraphKind::SectionHeading(QuestionType::FillBlank)
        );
        assert_eq!(classify(" 12．求值"), ParagraphKind::QuestionStart(12));
        assert_eq!(classify("3.x"), ParagraphKind::QuestionStart(3));
        assert_eq!(
            classify("故选：A【答案】A"),
            ParagraphKind::Marker(ANSWER_MARKER, SegmentState::Answer)
        );
        assert_eq!(classify("1、题目"), ParagraphKind::Content);
    }

    #[test]
    fn test_transitions() {
        let mut seg = Segmenter::new();
        assert_eq!(seg.feed(para("前言")), SegmentState::None);
        assert_eq!(seg.feed(para("二、多选题")), SegmentState::None);
        assert_eq!(seg.question_type(), QuestionType::MultipleChoice);
        assert_eq!(seg.feed(para("1．题干")), SegmentState::Body);
        assert_eq!(seg.feed(para("【分析】思路")), SegmentState::Analysis);
        assert_eq!(seg.feed(para("【详解】过程")), SegmentState::DetailedSolution);
        assert_eq!(seg.feed(para("【答案】B")), SegmentState::Answer);

        let questions = seg.finish();
        assert_eq!(questions.len(), 1);
        let q = &questions[0];
        assert_eq!(q.question_type, QuestionType::MultipleChoice);
        assert_eq!(q.question_body, para("题干"));
        assert_eq!(q.analysis, Some(para("思路")));
        assert_eq!(q.detailed_solution, Some(para("过程")));
        assert_eq!(q.answer, para("B"));
    }

    #[test]
    fn test_numeral_split_across_runs() {
        let paragraph = vec![
            ContentBlock::text("7"),
            ContentBlock::text("．"),
            ContentBlock::latex("x^{2}"),
        ];
        let questions = segment_questions(vec![paragraph]);
        assert_eq!(questions[0].index, 7);
        assert_eq!(questions[0].question_body, vec![ContentBlock::latex("x^{2}")]);
    }

    #[test]
    fn test_newline_separator_between_appends() {
        let questions = segment_questions(vec![
            para("1．第一行"),
            para("第二行"),
            vec![ContentBlock::image("doc-assets/asset_0001.png", None, None)],
        ]);
        assert_eq!(
            questions[0].question_body,
            vec![
                ContentBlock::text("第一行"),
                ContentBlock::newline(),
                ContentBlock::text("第二行"),
                ContentBlock::newline(),
                ContentBlock::image("doc-assets/asset_0001.png", None, None),
            ]
        );
    }

    #[test]
    fn test_question_number_bounds() {
        assert_eq!(classify("0. 零"), ParagraphKind::QuestionStart(1));
        assert_eq!(classify("4294967296．x"), ParagraphKind::QuestionStart(u32::MAX));

        let questions = segment_questions(vec![
            para("0. zero"),
            para("99999999999999999999. big"),
            para("【答案】"),
            para("3．x"),
        ]);
        assert_eq!(questions.len(), 3);
        assert_eq!(questions[0].index, 1);
        assert_eq!(questions[0].question_body, para("zero"));
        assert_eq!(questions[1].index, u32::MAX);
        assert_eq!(questions[1].question_body, para("big"));
        assert_eq!(questions[2].index, 3);
    }

    #[test]
    fn test_marker_only_paragraph_leaves_section_empty() {
        let questions = segment_questions(vec![para("1．题"), para("【分析】")]);
        assert_eq!(questions[0].analysis, None);
        assert!(questions[0].answer.is_empty());
    }
}
