//! Post-processing and cleanup utilities
//!
//! Helpers applied to paragraph streams and question sections after the
//! initial parse: header noise removal and text block normalization.

use super::models::*;

/// Drop paragraphs whose text contains any of the noise patterns, and
/// paragraphs without blocks
pub(crate) fn filter_noise<S: AsRef<str>>(
    paragraphs: Vec<ParagraphBlocks>,
    patterns: &[S],
) -> Vec<ParagraphBlocks> {
    paragraphs
        .into_iter()
        .filter(|blocks| {
            if blocks.is_empty() {
                return false;
            }
            let text = paragraph_text(blocks);
            let text = text.trim();
            let noisy = patterns
                .iter()
                .map(AsRef::as_ref)
                .any(|pattern| !pattern.is_empty() && text.contains(pattern));
            if noisy {
                log::debug!("Dropping header paragraph: {text}");
            }
            !noisy
        })
        .collect()
}

/// Merge runs of adjacent text blocks, then split them so that every
/// newline is its own block and no block is an empty string.
///
/// Applying this to its own output changes nothing.
pub fn normalize_text_blocks(blocks: Vec<ContentBlock>) -> Vec<ContentBlock> {
    let merged = merge_adjacent_text(blocks);
    let mut out = Vec::with_capacity(merged.len());
    for block in merged {
        match block {
            ContentBlock::Text { content } => split_newlines(&content, &mut out),
            other => out.push(other),
        }
    }
    out
}

fn split_newlines(content: &str, out: &mut Vec<ContentBlock>) {
    let mut rest = content;
    while let Some(pos) = rest.find('\n') {
        if pos > 0 {
            out.push(ContentBlock::text(&rest[..pos]));
        }
        out.push(ContentBlock::newline());
        rest = &rest[pos + 1..];
    }
    if !rest.is_empty() {
        out.push(ContentBlock::text(rest));
    }
}

/// Merge adjacent text blocks without splitting (used before classifying a
/// paragraph, so a numeral split across runs is still recognized)
pub(crate) fn merge_adjacent_text(blocks: Vec<ContentBlock>) -> Vec<ContentBlock> {
    let mut merged: Vec<ContentBlock> = Vec::with_capacity(blocks.len());
    for block in blocks {
        if let ContentBlock::Text { content } = &block {
            if let Some(ContentBlock::Text { content: last }) = merged.last_mut() {
                last.push_str(content);
                continue;
            }
        }
        merged.push(block);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noise_paragraphs_are_dropped() {
        let paragraphs = vec![
            vec![ContentBlock::text("2026年高三模拟考试")],
            vec![ContentBlock::text("学校：")],
            vec![],
            vec![ContentBlock::text("1．题目")],
        ];
        let kept = filter_noise(paragraphs, &["2026年", "学校："]);
        assert_eq!(kept, vec![vec![ContentBlock::text("1．题目")]]);
    }

    #[test]
    fn test_normalize_merges_and_splits() {
        let blocks = vec![
            ContentBlock::text("a"),
            ContentBlock::text("b\nc"),
            ContentBlock::latex("x"),
            ContentBlock::text("\n"),
            ContentBlock::text("\n"),
        ];
        assert_eq!(
            normalize_text_blocks(blocks),
            vec![
                ContentBlock::text("ab"),
                ContentBlock::newline(),
                ContentBlock::text("c"),
                ContentBlock::latex("x"),
                ContentBlock::newline(),
                ContentBlock::newline(),
            ]
        );
    }

    #[test]
    fn test_normalize_drops_empty_text() {
        let blocks = vec![ContentBlock::text(""), ContentBlock::latex("y")];
        assert_eq!(normalize_text_blocks(blocks), vec![ContentBlock::latex("y")]);
    }
}
