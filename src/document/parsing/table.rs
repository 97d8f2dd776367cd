//! Table flattening
//!
//! Tables in exam papers mostly carry option grids or short data listings.
//! Structure is not reconstructed: every cell text of the table is joined
//! into one text block.

use super::super::models::ContentBlock;
use super::xml::XmlElement;

/// Flatten a `w:tbl` into at most one text block
pub(crate) fn table_to_blocks(table: &XmlElement) -> Vec<ContentBlock> {
    let texts: Vec<String> = table
        .descendants()
        .filter(|el| el.is("w:tc"))
        .flat_map(|cell| {
            cell.descendants()
                .filter(|el| el.is("w:t"))
                .map(|t| t.text_content())
                .filter(|text| !text.is_empty())
                .collect::<Vec<_>>()
        })
        .collect();

    if texts.is_empty() {
        Vec::new()
    } else {
        vec![ContentBlock::text(texts.join(" "))]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::parsing::xml::parse_xml;

    #[test]
    fn test_cells_are_space_joined() {
        let xml = r#"<w:tbl>
            <w:tr><w:tc><w:p><w:r><w:t>A.1</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>B.2</w:t></w:r></w:p></w:tc></w:tr>
            <w:tr><w:tc><w:p><w:r><w:t>C.</w:t></w:r><w:r><w:t>3</w:t></w:r></w:p></w:tc></w:tr>
        </w:tbl>"#;
        let blocks = table_to_blocks(&parse_xml(xml).unwrap());
        assert_eq!(blocks, vec![ContentBlock::text("A.1 B.2 C. 3")]);
    }

    #[test]
    fn test_empty_table_yields_nothing() {
        let xml = "<w:tbl><w:tr><w:tc><w:p/></w:tc></w:tr></w:tbl>";
        assert!(table_to_blocks(&parse_xml(xml).unwrap()).is_empty());
    }
}
