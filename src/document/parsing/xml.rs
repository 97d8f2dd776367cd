//! Minimal XML element tree
//!
//! Package parts are small enough to hold in memory, so the reader lifts
//! them into an owned element tree with quick-xml and walks that instead of
//! tracking nesting flags over the event stream. The same tree type is used
//! to build the parts of exported packages.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use super::super::error::DocumentError;

#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct XmlElement {
    /// Qualified name as written in the source, e.g. `m:oMath`
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builder: add an attribute
    pub fn attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    /// Builder: add a child element
    pub fn child(mut self, child: XmlElement) -> Self {
        self.children.push(XmlNode::Element(child));
        self
    }

    /// Builder: add a text node
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.children.push(XmlNode::Text(text.into()));
        self
    }

    pub fn push(&mut self, child: XmlElement) {
        self.children.push(XmlNode::Element(child));
    }

    pub fn set_attr(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((key.to_string(), value)),
        }
    }

    /// Name without its namespace prefix
    pub fn local_name(&self) -> &str {
        local_part(&self.name)
    }

    pub fn is(&self, qualified: &str) -> bool {
        self.name == qualified
    }

    pub fn attribute(&self, qualified: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == qualified)
            .map(|(_, v)| v.as_str())
    }

    /// Attribute lookup ignoring the prefix (`m:val`, `w:val` and `val` all match `val`)
    pub fn attribute_local(&self, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| local_part(k) == local)
            .map(|(_, v)| v.as_str())
    }

    /// The `val` attribute carried by OOXML property elements
    pub fn val(&self) -> Option<&str> {
        self.attribute_local("val")
    }

    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(el) => Some(el),
            XmlNode::Text(_) => None,
        })
    }

    /// First child element with the given local name
    pub fn child_local(&self, local: &str) -> Option<&XmlElement> {
        self.elements().find(|el| el.local_name() == local)
    }

    pub fn children_local<'a>(&'a self, local: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.elements().filter(move |el| el.local_name() == local)
    }

    /// First child element with the given qualified name
    pub fn find(&self, qualified: &str) -> Option<&XmlElement> {
        self.elements().find(|el| el.is(qualified))
    }

    /// Depth-first walk over all descendant elements (excluding `self`)
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants {
            stack: self.elements().collect::<Vec<_>>().into_iter().rev().collect(),
        }
    }

    /// Concatenation of every text node below this element
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }

    /// Concatenated text of all descendant elements named `qualified`
    pub fn text_of(&self, qualified: &str) -> String {
        self.descendants()
            .filter(|el| el.is(qualified))
            .map(|el| el.text_content())
            .collect()
    }
}

pub struct Descendants<'a> {
    stack: Vec<&'a XmlElement>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a XmlElement;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.stack.pop()?;
        let children: Vec<&XmlElement> = next.elements().collect();
        self.stack.extend(children.into_iter().rev());
        Some(next)
    }
}

fn local_part(name: &str) -> &str {
    name.rsplit_once(':').map(|(_, local)| local).unwrap_or(name)
}

fn collect_text(el: &XmlElement, out: &mut String) {
    for node in &el.children {
        match node {
            XmlNode::Text(text) => out.push_str(text),
            XmlNode::Element(child) => collect_text(child, out),
        }
    }
}

fn element_from_start(start: &BytesStart) -> XmlElement {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let attributes = start
        .attributes()
        .flatten()
        .map(|a| {
            let key = String::from_utf8_lossy(a.key.as_ref()).into_owned();
            let value = a
                .unescape_value()
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| String::from_utf8_lossy(&a.value).into_owned());
            (key, value)
        })
        .collect();
    XmlElement {
        name,
        attributes,
        children: Vec::new(),
    }
}

/// Parse an XML document (or fragment with a single root) into a tree
pub fn parse_xml(xml: &str) -> Result<XmlElement, DocumentError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false); // Don't trim to preserve spacing inside w:t

    let mut buf = Vec::new();
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => stack.push(element_from_start(e)),
            Event::Empty(ref e) => {
                let element = element_from_start(e);
                match stack.last_mut() {
                    Some(parent) => parent.push(element),
                    None => root = root.or(Some(element)),
                }
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| DocumentError::Malformed("unexpected end tag".to_string()))?;
                match stack.last_mut() {
                    Some(parent) => parent.push(element),
                    None => root = root.or(Some(element)),
                }
            }
            Event::Text(ref e) => {
                if let Some(parent) = stack.last_mut() {
                    let text = e
                        .unescape()
                        .map(|t| t.into_owned())
                        .unwrap_or_else(|_| String::from_utf8_lossy(e).into_owned());
                    parent.children.push(XmlNode::Text(text));
                }
            }
            Event::CData(ref e) => {
                if let Some(parent) = stack.last_mut() {
                    parent
                        .children
                        .push(XmlNode::Text(String::from_utf8_lossy(e).into_owned()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !stack.is_empty() {
        return Err(DocumentError::Malformed(format!(
            "unclosed element <{}>",
            stack.last().map(|el| el.name.as_str()).unwrap_or_default()
        )));
    }
    root.ok_or_else(|| DocumentError::Malformed("no root element".to_string()))
}

/// Serialize a tree, optionally preceded by a standalone XML declaration
pub fn write_xml(root: &XmlElement, declaration: bool) -> Result<Vec<u8>, DocumentError> {
    let mut writer = Writer::new(Vec::new());
    if declaration {
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
    }
    write_element(&mut writer, root)?;
    Ok(writer.into_inner())
}

fn write_element(writer: &mut Writer<Vec<u8>>, el: &XmlElement) -> Result<(), DocumentError> {
    let mut start = BytesStart::new(el.name.as_str());
    for (key, value) in &el.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }
    if el.children.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }
    writer.write_event(Event::Start(start))?;
    for node in &el.children {
        match node {
            XmlNode::Element(child) => write_element(writer, child)?,
            XmlNode::Text(text) => writer.write_event(Event::Text(BytesText::new(text)))?,
        }
    }
    writer.write_event(Event::End(BytesEnd::new(el.name.as_str())))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_preserves_text_and_attributes() {
        let xml = r#"<w:p><w:r><w:t xml:space="preserve"> a &amp; b </w:t></w:r><m:chr m:val="∑"/></w:p>"#;
        let root = parse_xml(xml).unwrap();
        assert_eq!(root.local_name(), "p");
        assert_eq!(root.text_of("w:t"), " a & b ");
        assert_eq!(root.child_local("chr").and_then(|c| c.val()), Some("∑"));
    }

    #[test]
    fn test_unclosed_element_is_an_error() {
        assert!(parse_xml("<a><b></b>").is_err());
    }

    #[test]
    fn test_write_then_parse_keeps_structure() {
        let tree = XmlElement::new("m:oMath").child(
            XmlElement::new("m:r").child(XmlElement::new("m:t").text("x<1")),
        );
        let bytes = write_xml(&tree, true).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("<?xml"));
        assert!(text.contains("x&lt;1"));
        let parsed = parse_xml(&text).unwrap();
        assert_eq!(parsed, tree);
    }
}
