mod common;

use proptest::prelude::*;
use quizdocx::config::ExtractionConfig;
use quizdocx::document::{
    ContentBlock, QuestionType, normalize_text_blocks, parse_questions, segment_questions,
};

use common::*;

fn paragraphs(texts: &[&str]) -> Vec<Vec<ContentBlock>> {
    texts.iter().map(|text| vec![ContentBlock::text(*text)]).collect()
}

fn block() -> impl Strategy<Value = ContentBlock> {
    prop_oneof![
        "[ab\n]{0,4}".prop_map(|s| ContentBlock::text(s)),
        "[xy]{1,3}".prop_map(|s| ContentBlock::latex(s)),
        Just(ContentBlock::image("doc-assets/asset_0001.png", None, None)),
    ]
}

#[cfg(test)]
mod segmentation_tests {
    use super::*;

    #[test]
    fn test_five_paragraph_example() {
        let questions = segment_questions(paragraphs(&[
            "一、单选题",
            "1．What is 1+1?",
            "【答案】2",
            "2．What is 2+2?",
            "【答案】4",
        ]));

        assert_eq!(questions.len(), 2);
        for (question, (body, answer)) in questions
            .iter()
            .zip([("What is 1+1?", "2"), ("What is 2+2?", "4")])
        {
            assert_eq!(question.question_type, QuestionType::SingleChoice);
            assert_eq!(question.question_body, vec![ContentBlock::text(body)]);
            assert_eq!(question.answer, vec![ContentBlock::text(answer)]);
            assert!(question.analysis.is_none());
            assert!(question.detailed_solution.is_none());
        }
        assert_eq!((questions[0].index, questions[1].index), (1, 2));
    }

    #[test]
    fn test_sections_and_type_changes() {
        let questions = segment_questions(paragraphs(&[
            "四、解答题",
            "17. 已知函数",
            "求最小值",
            "【答案】1",
            "【分析】配方",
            "【详解】由题意",
            "可得",
        ]));
        let question = &questions[0];
        assert_eq!(question.index, 17);
        assert_eq!(question.question_type, QuestionType::Solution);
        assert_eq!(
            question.question_body,
            vec![
                ContentBlock::text("已知函数"),
                ContentBlock::newline(),
                ContentBlock::text("求最小值"),
            ]
        );
        assert_eq!(question.analysis, Some(vec![ContentBlock::text("配方")]));
        assert_eq!(
            question.detailed_solution,
            Some(vec![
                ContentBlock::text("由题意"),
                ContentBlock::newline(),
                ContentBlock::text("可得"),
            ])
        );
    }

    #[test]
    fn test_image_without_extent_has_no_size_keys() {
        let vml = concat!(
            r#"<w:p><w:r><w:t>1. 如图</w:t></w:r><w:r><w:pict>"#,
            r#"<v:shape xmlns:v="urn:schemas-microsoft-com:vml"><v:imagedata r:id="rId7"/></v:shape>"#,
            r#"</w:pict></w:r></w:p>"#
        );
        let bytes = build_docx(
            &[vml.to_string()],
            &[("rId7", "media/image1.png")],
            &[("word/media/image1.png", png_bytes(2, 2))],
        );
        let dir = tempfile::tempdir().unwrap();
        let questions = parse_questions(&bytes, dir.path(), &ExtractionConfig::default()).unwrap();

        let json = serde_json::to_value(&questions[0].question_body[1]).unwrap();
        assert_eq!(json["type"], "image");
        assert_eq!(json["url"], "doc-assets/asset_0001.png");
        assert!(json.get("width").is_none());
        assert!(json.get("height").is_none());
        assert!(dir.path().join("asset_0001.png").is_file());
    }

    #[test]
    fn test_noise_paragraphs_are_dropped() {
        let bytes = build_docx(
            &[
                text_paragraph("2026年高三数学模拟"),
                text_paragraph("三、填空题"),
                text_paragraph("5. 填空"),
                text_paragraph("姓名：________"),
            ],
            &[],
            &[],
        );
        let dir = tempfile::tempdir().unwrap();
        let questions = parse_questions(&bytes, dir.path(), &ExtractionConfig::default()).unwrap();
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].question_type, QuestionType::FillBlank);
        assert_eq!(questions[0].question_body, vec![ContentBlock::text("填空")]);
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent(blocks in prop::collection::vec(block(), 0..12)) {
            let once = normalize_text_blocks(blocks);
            let twice = normalize_text_blocks(once.clone());
            prop_assert_eq!(&once, &twice);
            for block in &once {
                if let Some(text) = block.as_text() {
                    prop_assert!(text == "\n" || (!text.is_empty() && !text.contains('\n')));
                }
            }
        }
    }
}
