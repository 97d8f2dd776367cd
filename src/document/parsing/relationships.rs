//! Relationship part parsing
//!
//! Resolves `r:embed` / `r:id` references from `word/document.xml` to
//! package paths such as `word/media/image1.png`.

use std::collections::HashMap;

use super::xml::parse_xml;

const RELATIONSHIP_BASE: &str = "word";

/// Relationship id to package path, scoped to one parse
#[derive(Debug, Clone, Default)]
pub(crate) struct Relationships {
    targets: HashMap<String, String>,
}

impl Relationships {
    /// Parse `word/_rels/document.xml.rels`. Corrupt XML yields an empty table.
    pub(crate) fn parse(xml: &str) -> Self {
        let root = match parse_xml(xml) {
            Ok(root) => root,
            Err(e) => {
                log::warn!("Ignoring unreadable relationship part: {e}");
                return Self::default();
            }
        };

        let mut targets = HashMap::new();
        for rel in root.descendants().filter(|el| el.local_name() == "Relationship") {
            if rel.attribute("TargetMode") == Some("External") {
                continue;
            }
            if let (Some(id), Some(target)) = (rel.attribute("Id"), rel.attribute("Target")) {
                if id.is_empty() || target.is_empty() {
                    continue;
                }
                targets.insert(id.to_string(), resolve_target(target));
            }
        }
        Self { targets }
    }

    pub(crate) fn get(&self, id: &str) -> Option<&str> {
        self.targets.get(id).map(String::as_str)
    }

    pub(crate) fn len(&self) -> usize {
        self.targets.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// Resolve a relationship target against the `word/` part directory
fn resolve_target(target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut segments: Vec<&str> = vec![RELATIONSHIP_BASE];
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    const RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
  <Relationship Id="rId5" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="media/image1.png"/>
  <Relationship Id="rId6" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="/word/media/image2.wmf"/>
  <Relationship Id="rId7" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="https://example.com" TargetMode="External"/>
</Relationships>"#;

    #[test]
    fn test_targets_resolve_relative_to_word() {
        let rels = Relationships::parse(RELS);
        assert_eq!(rels.get("rId5"), Some("word/media/image1.png"));
        assert_eq!(rels.get("rId6"), Some("word/media/image2.wmf"));
        assert_eq!(rels.get("rId1"), Some("word/styles.xml"));
    }

    #[test]
    fn test_external_targets_are_skipped() {
        let rels = Relationships::parse(RELS);
        assert_eq!(rels.get("rId7"), None);
        assert_eq!(rels.len(), 3);
    }

    #[test]
    fn test_corrupt_part_is_empty() {
        assert!(Relationships::parse("<Relationships><oops").is_empty());
    }

    #[test]
    fn test_parent_segments_are_normalized() {
        assert_eq!(resolve_target("../customXml/item1.xml"), "customXml/item1.xml");
    }
}
