//! MathML presentation tree
//!
//! The intermediate form between LaTeX and OMML. The tree covers the
//! presentation elements produced by the LaTeX parser; it serializes to
//! MathML XML and can be read back from MathML produced elsewhere.

use super::error::EquationError;
use crate::document::parsing::symbols::NARY_OPERATORS;
use crate::document::parsing::xml::{XmlElement, parse_xml, write_xml};

pub const MATHML_NS: &str = "http://www.w3.org/1998/Math/MathML";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathVariant {
    Normal,
    Italic,
    Bold,
    BoldItalic,
    DoubleStruck,
    Script,
    Fraktur,
    SansSerif,
    Monospace,
}

impl MathVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            MathVariant::Normal => "normal",
            MathVariant::Italic => "italic",
            MathVariant::Bold => "bold",
            MathVariant::BoldItalic => "bold-italic",
            MathVariant::DoubleStruck => "double-struck",
            MathVariant::Script => "script",
            MathVariant::Fraktur => "fraktur",
            MathVariant::SansSerif => "sans-serif",
            MathVariant::Monospace => "monospace",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Some(match value {
            "normal" => MathVariant::Normal,
            "italic" => MathVariant::Italic,
            "bold" => MathVariant::Bold,
            "bold-italic" => MathVariant::BoldItalic,
            "double-struck" => MathVariant::DoubleStruck,
            "script" => MathVariant::Script,
            "fraktur" => MathVariant::Fraktur,
            "sans-serif" => MathVariant::SansSerif,
            "monospace" => MathVariant::Monospace,
            _ => return None,
        })
    }
}

/// Layout of an `mtable`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Matrix,
    /// `aligned`, `gathered`, `array`: rows of equations
    Aligned,
    /// `cases`: left-aligned rows inside a brace
    Cases,
}

impl TableKind {
    fn column_align(&self) -> Option<&'static str> {
        match self {
            TableKind::Matrix => None,
            TableKind::Aligned => Some("right left"),
            TableKind::Cases => Some("left"),
        }
    }

    fn from_column_align(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("left") => TableKind::Cases,
            Some(v) if v.contains("right") => TableKind::Aligned,
            _ => TableKind::Matrix,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MathNode {
    /// `mi`
    Ident(String),
    /// `mn`
    Number(String),
    /// `mo`
    Operator(String),
    /// `mtext`
    Text(String),
    /// `mspace`, width in em
    Space(f32),
    /// `mrow`
    Row(Vec<MathNode>),
    /// `mfrac`; `bar: false` for zero line thickness (binomials)
    Frac {
        num: Box<MathNode>,
        den: Box<MathNode>,
        bar: bool,
    },
    Sqrt(Box<MathNode>),
    Root {
        base: Box<MathNode>,
        index: Box<MathNode>,
    },
    Sup {
        base: Box<MathNode>,
        sup: Box<MathNode>,
    },
    Sub {
        base: Box<MathNode>,
        sub: Box<MathNode>,
    },
    SubSup {
        base: Box<MathNode>,
        sub: Box<MathNode>,
        sup: Box<MathNode>,
    },
    Over {
        base: Box<MathNode>,
        over: Box<MathNode>,
        accent: bool,
    },
    Under {
        base: Box<MathNode>,
        under: Box<MathNode>,
    },
    UnderOver {
        base: Box<MathNode>,
        under: Box<MathNode>,
        over: Box<MathNode>,
    },
    /// `mfenced`; an empty string means no delimiter on that side
    Fenced {
        open: String,
        close: String,
        body: Box<MathNode>,
    },
    Table {
        kind: TableKind,
        rows: Vec<Vec<MathNode>>,
    },
    /// `mstyle` with a `mathvariant`
    Style {
        variant: MathVariant,
        body: Box<MathNode>,
    },
}

impl MathNode {
    pub fn row(children: Vec<MathNode>) -> Self {
        MathNode::Row(children)
    }

    /// An operator that takes limits (∑, ∫, ⋃, ...)
    pub fn is_large_operator(&self) -> bool {
        match self {
            MathNode::Operator(op) => {
                let mut chars = op.chars();
                matches!((chars.next(), chars.next()), (Some(ch), None) if NARY_OPERATORS.contains_key(&ch))
            }
            MathNode::Row(children) if children.len() == 1 => children[0].is_large_operator(),
            _ => false,
        }
    }

    /// Text of a single-token node (`mi`, `mn`, `mo`, `mtext`)
    pub fn token_text(&self) -> Option<&str> {
        match self {
            MathNode::Ident(s) | MathNode::Number(s) | MathNode::Operator(s) | MathNode::Text(s) => {
                Some(s)
            }
            MathNode::Row(children) if children.len() == 1 => children[0].token_text(),
            _ => None,
        }
    }

    pub fn is_empty_row(&self) -> bool {
        matches!(self, MathNode::Row(children) if children.is_empty())
    }
}

/// Serialize a tree as a `<math>` document
pub fn to_mathml(node: &MathNode) -> String {
    let mut math = XmlElement::new("math").attr("xmlns", MATHML_NS);
    match node {
        MathNode::Row(children) => {
            for child in children {
                math.push(to_element(child));
            }
        }
        other => math.push(to_element(other)),
    }
    write_xml(&math, false)
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}

fn boxed_row(children: Vec<XmlElement>) -> XmlElement {
    children
        .into_iter()
        .fold(XmlElement::new("mrow"), |row, child| row.child(child))
}

fn to_element(node: &MathNode) -> XmlElement {
    match node {
        MathNode::Ident(s) => XmlElement::new("mi").text(s.as_str()),
        MathNode::Number(s) => XmlElement::new("mn").text(s.as_str()),
        MathNode::Operator(s) => {
            let mo = XmlElement::new("mo");
            let mo = if node.is_large_operator() {
                mo.attr("largeop", "true")
            } else {
                mo
            };
            mo.text(s.as_str())
        }
        MathNode::Text(s) => XmlElement::new("mtext").text(s.as_str()),
        MathNode::Space(width) => XmlElement::new("mspace").attr("width", format!("{width}em")),
        MathNode::Row(children) => boxed_row(children.iter().map(to_element).collect()),
        MathNode::Frac { num, den, bar } => {
            let frac = XmlElement::new("mfrac");
            let frac = if *bar {
                frac
            } else {
                frac.attr("linethickness", "0")
            };
            frac.child(to_element(num)).child(to_element(den))
        }
        MathNode::Sqrt(body) => XmlElement::new("msqrt").child(to_element(body)),
        MathNode::Root { base, index } => XmlElement::new("mroot")
            .child(to_element(base))
            .child(to_element(index)),
        MathNode::Sup { base, sup } => XmlElement::new("msup")
            .child(to_element(base))
            .child(to_element(sup)),
        MathNode::Sub { base, sub } => XmlElement::new("msub")
            .child(to_element(base))
            .child(to_element(sub)),
        MathNode::SubSup { base, sub, sup } => XmlElement::new("msubsup")
            .child(to_element(base))
            .child(to_element(sub))
            .child(to_element(sup)),
        MathNode::Over { base, over, accent } => {
            let mover = XmlElement::new("mover");
            let mover = if *accent {
                mover.attr("accent", "true")
            } else {
                mover
            };
            mover.child(to_element(base)).child(to_element(over))
        }
        MathNode::Under { base, under } => XmlElement::new("munder")
            .child(to_element(base))
            .child(to_element(under)),
        MathNode::UnderOver { base, under, over } => XmlElement::new("munderover")
            .child(to_element(base))
            .child(to_element(under))
            .child(to_element(over)),
        MathNode::Fenced { open, close, body } => XmlElement::new("mfenced")
            .attr("open", open.as_str())
            .attr("close", close.as_str())
            .child(to_element(body)),
        MathNode::Table { kind, rows } => {
            let mut table = XmlElement::new("mtable");
            if let Some(align) = kind.column_align() {
                table.set_attr("columnalign", align);
            }
            for row in rows {
                let tr = row.iter().fold(XmlElement::new("mtr"), |tr, cell| {
                    tr.child(XmlElement::new("mtd").child(to_element(cell)))
                });
                table.push(tr);
            }
            table
        }
        MathNode::Style { variant, body } => XmlElement::new("mstyle")
            .attr("mathvariant", variant.as_str())
            .child(to_element(body)),
    }
}

/// Parse MathML XML (a `<math>` element or a bare presentation element)
pub fn parse_mathml(xml: &str) -> Result<MathNode, EquationError> {
    let root = parse_xml(xml).map_err(|e| EquationError::Mathml(e.to_string()))?;
    from_element(&root, 0)
}

const MAX_DEPTH: usize = 64;

fn children(el: &XmlElement, depth: usize) -> Result<Vec<MathNode>, EquationError> {
    el.elements().map(|child| from_element(child, depth + 1)).collect()
}

fn row_of(el: &XmlElement, depth: usize) -> Result<MathNode, EquationError> {
    let mut nodes = children(el, depth)?;
    if nodes.len() == 1 {
        return Ok(nodes.remove(0));
    }
    Ok(MathNode::Row(nodes))
}

/// Children of an element that takes a fixed number of arguments
fn arguments<const N: usize>(
    el: &XmlElement,
    depth: usize,
) -> Result<[Box<MathNode>; N], EquationError> {
    let nodes = children(el, depth)?;
    let count = nodes.len();
    let boxed: Vec<Box<MathNode>> = nodes.into_iter().map(Box::new).collect();
    boxed.try_into().map_err(|_| {
        EquationError::Mathml(format!(
            "<{}> expects {N} children, found {count}",
            el.local_name()
        ))
    })
}

fn from_element(el: &XmlElement, depth: usize) -> Result<MathNode, EquationError> {
    if depth > MAX_DEPTH {
        return Err(EquationError::TooDeep(MAX_DEPTH));
    }
    let text = || el.text_content().trim().to_string();
    Ok(match el.local_name() {
        "math" | "mrow" | "mpadded" | "mphantom" | "menclose" | "merror" | "mtd" => {
            MathNode::Row(children(el, depth)?)
        }
        "semantics" => match el.elements().next() {
            Some(first) => from_element(first, depth + 1)?,
            None => MathNode::Row(Vec::new()),
        },
        "mi" => MathNode::Ident(text()),
        "mn" => MathNode::Number(text()),
        "mo" => MathNode::Operator(text()),
        "mtext" | "ms" => MathNode::Text(el.text_content()),
        "mspace" => MathNode::Space(
            el.attribute("width")
                .and_then(|w| w.trim().trim_end_matches("em").parse().ok())
                .unwrap_or(0.0),
        ),
        "mfrac" => {
            let [num, den] = arguments::<2>(el, depth)?;
            let bar = !matches!(el.attribute("linethickness"), Some("0" | "0px" | "0em"));
            MathNode::Frac { num, den, bar }
        }
        "msqrt" => MathNode::Sqrt(Box::new(row_of(el, depth)?)),
        "mroot" => {
            let [base, index] = arguments::<2>(el, depth)?;
            MathNode::Root { base, index }
        }
        "msup" => {
            let [base, sup] = arguments::<2>(el, depth)?;
            MathNode::Sup { base, sup }
        }
        "msub" => {
            let [base, sub] = arguments::<2>(el, depth)?;
            MathNode::Sub { base, sub }
        }
        "msubsup" => {
            let [base, sub, sup] = arguments::<3>(el, depth)?;
            MathNode::SubSup { base, sub, sup }
        }
        "mover" => {
            let [base, over] = arguments::<2>(el, depth)?;
            MathNode::Over {
                base,
                over,
                accent: el.attribute("accent") == Some("true"),
            }
        }
        "munder" => {
            let [base, under] = arguments::<2>(el, depth)?;
            MathNode::Under { base, under }
        }
        "munderover" => {
            let [base, under, over] = arguments::<3>(el, depth)?;
            MathNode::UnderOver { base, under, over }
        }
        "mfenced" => {
            let separator = el.attribute("separators").unwrap_or(",").trim().to_string();
            let mut body = Vec::new();
            for (i, child) in children(el, depth)?.into_iter().enumerate() {
                if i > 0 && !separator.is_empty() {
                    body.push(MathNode::Operator(separator.clone()));
                }
                body.push(child);
            }
            MathNode::Fenced {
                open: el.attribute("open").unwrap_or("(").to_string(),
                close: el.attribute("close").unwrap_or(")").to_string(),
                body: Box::new(if body.len() == 1 {
                    body.remove(0)
                } else {
                    MathNode::Row(body)
                }),
            }
        }
        "mtable" => {
            let kind = TableKind::from_column_align(el.attribute("columnalign"));
            let mut rows = Vec::new();
            for tr in el.elements() {
                match tr.local_name() {
                    "mtr" | "mlabeledtr" => rows.push(children(tr, depth + 1)?),
                    other => {
                        return Err(EquationError::Mathml(format!("<{other}> inside <mtable>")));
                    }
                }
            }
            MathNode::Table { kind, rows }
        }
        "mstyle" => {
            let body = Box::new(row_of(el, depth)?);
            match el.attribute("mathvariant").and_then(MathVariant::parse) {
                Some(variant) => MathNode::Style { variant, body },
                None => *body,
            }
        }
        other => return Err(EquationError::Mathml(format!("unsupported element <{other}>"))),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_fraction_and_binomial() {
        let node = MathNode::Frac {
            num: Box::new(MathNode::Number("1".into())),
            den: Box::new(MathNode::Ident("x".into())),
            bar: false,
        };
        let xml = to_mathml(&node);
        assert!(xml.starts_with("<math xmlns=\"http://www.w3.org/1998/Math/MathML\">"));
        assert!(xml.contains("<mfrac linethickness=\"0\"><mn>1</mn><mi>x</mi></mfrac>"));
    }

    #[test]
    fn test_parse_foreign_mathml() {
        let xml = r#"<math xmlns="http://www.w3.org/1998/Math/MathML">
            <msup><mi>x</mi><mn>2</mn></msup><mo>+</mo>
            <mfenced><mi>a</mi><mi>b</mi></mfenced>
        </math>"#;
        let node = parse_mathml(xml).unwrap();
        let MathNode::Row(children) = node else {
            panic!("expected row");
        };
        assert_eq!(children.len(), 3);
        assert_eq!(
            children[0],
            MathNode::Sup {
                base: Box::new(MathNode::Ident("x".into())),
                sup: Box::new(MathNode::Number("2".into())),
            }
        );
        assert!(matches!(&children[2], MathNode::Fenced { body, .. }
            if matches!(body.as_ref(), MathNode::Row(items) if items.len() == 3)));
    }

    #[test]
    fn test_wrong_arity_is_an_error() {
        assert!(parse_mathml("<math><mfrac><mi>x</mi></mfrac></math>").is_err());
        assert!(parse_mathml("<math><mglyph/></math>").is_err());
        assert!(parse_mathml("<math><mi>").is_err());
    }

    #[test]
    fn test_large_operator_detection() {
        assert!(MathNode::Operator("∑".into()).is_large_operator());
        assert!(!MathNode::Operator("+".into()).is_large_operator());
    }
}
