mod common;

use std::io::{Cursor, Read};

use quizdocx::config::{ExportConfig, ExtractionConfig};
use quizdocx::document::{ParsedQuestion, extract_paragraphs, segment_questions};
use quizdocx::{ContentBlock, ExportMode, QuestionType, export_questions};

use common::png_bytes;

fn questions() -> Vec<ParsedQuestion> {
    let mut first = ParsedQuestion::new(3, QuestionType::SingleChoice);
    first.question_body = vec![
        ContentBlock::text("若"),
        ContentBlock::latex("x^{2}=4"),
        ContentBlock::text("，则"),
        ContentBlock::image("doc-assets/asset_0001.png", Some(40), Some(20)),
    ];
    first.answer = vec![ContentBlock::text("B")];
    first.analysis = Some(vec![ContentBlock::text("开方")]);

    let mut second = ParsedQuestion::new(9, QuestionType::Solution);
    second.question_body = vec![ContentBlock::text("证明")];
    second.answer = vec![ContentBlock::latex("\\frac{1}{2")];
    vec![first, second]
}

fn document_xml(docx: &[u8]) -> String {
    let mut archive = zip::ZipArchive::new(Cursor::new(docx)).unwrap();
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .unwrap()
        .read_to_string(&mut xml)
        .unwrap();
    xml
}

async fn export(mode: ExportMode, base: Option<&str>) -> Vec<u8> {
    export_questions(&questions(), mode, base, &ExportConfig::default())
        .await
        .unwrap()
}

#[cfg(test)]
mod export_tests {
    use super::*;

    #[tokio::test]
    async fn test_teacher_export_reads_back_as_questions() {
        let work = tempfile::tempdir().unwrap();
        std::fs::create_dir(work.path().join("doc-assets")).unwrap();
        std::fs::write(work.path().join("doc-assets/asset_0001.png"), png_bytes(40, 20)).unwrap();
        let base = work.path().to_string_lossy().into_owned();

        let docx = export(ExportMode::Teacher, Some(&base)).await;
        let xml = document_xml(&docx);
        assert!(xml.contains("<m:oMath"));
        assert!(xml.contains("r:embed=\"rId11\""));
        assert!(xml.contains("\\frac{1}{2"));

        let assets = tempfile::tempdir().unwrap();
        let config = ExtractionConfig {
            noise_patterns: Vec::new(),
        };
        let paragraphs = extract_paragraphs(&docx, assets.path(), &config).unwrap();
        let reread = segment_questions(paragraphs);

        // Questions are renumbered from 1; the type label is not a section heading
        assert_eq!(reread.len(), 2);
        assert_eq!(reread[0].index, 1);
        assert_eq!(reread[1].index, 2);
        assert!(reread[0].question_body.contains(&ContentBlock::latex("x^{2}=4")));
        assert!(
            reread[0]
                .question_body
                .iter()
                .any(|block| matches!(block, ContentBlock::Image { width: Some(40), .. }))
        );
        assert_eq!(reread[0].answer, vec![ContentBlock::text("B")]);
        assert_eq!(reread[0].analysis, Some(vec![ContentBlock::text("开方")]));
    }

    #[tokio::test]
    async fn test_missing_images_become_placeholders() {
        let docx = export(ExportMode::Student, None).await;
        let xml = document_xml(&docx);
        assert!(xml.contains("[图片]"));
        assert!(!xml.contains("【答案】"));
        assert!(!xml.contains("<w:drawing"));
    }

    #[tokio::test]
    async fn test_normal_mode_answers_follow_page_break() {
        let docx = export(ExportMode::Normal, None).await;
        let xml = document_xml(&docx);
        let page_break = xml.find("w:type=\"page\"").unwrap();
        let heading = xml.find("参考答案").unwrap();
        assert!(page_break < heading);
        assert!(xml.find("证明").unwrap() < page_break);
        assert!(xml.contains("（答案附后）"));
    }
}
