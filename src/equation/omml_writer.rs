//! MathML tree to Office Math
//!
//! Builds an `m:oMath` element from a [`MathNode`] tree. Every tree has an
//! OMML rendering, so this direction cannot fail.

use super::mathml::{MathNode, MathVariant, TableKind};
use crate::document::parsing::xml::XmlElement;

/// Functions whose subscript sits under the name (`\lim_{x\to 0}`)
const LIMIT_FUNCTIONS: &[&str] = &["lim", "max", "min", "sup", "inf"];

/// Run properties inherited from an enclosing `mstyle`
#[derive(Debug, Clone, Copy, Default)]
struct RunStyle {
    script: Option<&'static str>,
    style: Option<&'static str>,
}

impl RunStyle {
    fn from_variant(variant: MathVariant) -> Self {
        let (script, style) = match variant {
            MathVariant::Normal => (None, Some("p")),
            MathVariant::Italic => (None, Some("i")),
            MathVariant::Bold => (None, Some("b")),
            MathVariant::BoldItalic => (None, Some("bi")),
            MathVariant::DoubleStruck => (Some("double-struck"), Some("p")),
            MathVariant::Script => (Some("script"), None),
            MathVariant::Fraktur => (Some("fraktur"), None),
            MathVariant::SansSerif => (Some("sans-serif"), Some("p")),
            MathVariant::Monospace => (Some("monospace"), Some("p")),
        };
        RunStyle { script, style }
    }

    fn is_plain(&self) -> bool {
        self.script.is_none() && self.style.is_none()
    }
}

/// Convert a tree into an `m:oMath` element
pub fn mathml_to_omml(node: &MathNode) -> XmlElement {
    let mut omath = XmlElement::new("m:oMath");
    for element in sequence(std::slice::from_ref(node), RunStyle::default()) {
        omath.push(element);
    }
    omath
}

fn val(name: &str, value: impl Into<String>) -> XmlElement {
    XmlElement::new(name).attr("m:val", value)
}

fn with_children(name: &str, children: Vec<XmlElement>) -> XmlElement {
    children
        .into_iter()
        .fold(XmlElement::new(name), |el, child| el.child(child))
}

/// An argument slot (`m:e`, `m:num`, `m:sup`, ...) holding one node
fn slot(name: &str, node: &MathNode, style: RunStyle) -> XmlElement {
    with_children(name, sequence(std::slice::from_ref(node), style))
}

fn empty_slot(name: &str) -> XmlElement {
    XmlElement::new(name)
}

fn run(text: &str, style: RunStyle, normal_text: bool) -> XmlElement {
    let mut r = XmlElement::new("m:r");
    if normal_text || !style.is_plain() {
        let mut props = XmlElement::new("m:rPr");
        if normal_text {
            props.push(XmlElement::new("m:nor"));
        }
        if let Some(script) = style.script {
            props.push(val("m:scr", script));
        }
        if let Some(sty) = style.style {
            props.push(val("m:sty", sty));
        }
        r.push(props);
    }
    let mut t = XmlElement::new("m:t");
    if text.starts_with(' ') || text.ends_with(' ') {
        t.set_attr("xml:space", "preserve");
    }
    r.child(t.text(text))
}

fn space_text(width: f32) -> &'static str {
    match width {
        w if w <= 0.0 => "",
        w if w < 0.2 => "\u{2009}",
        w if w < 0.3 => "\u{2005}",
        w if w < 0.5 => "\u{2004}",
        w if w < 1.5 => "\u{2003}",
        _ => "\u{2003}\u{2003}",
    }
}

/// Flatten rows into their parent so that large operators can see the
/// sibling that follows them
fn flatten<'a>(nodes: &'a [MathNode], out: &mut Vec<&'a MathNode>) {
    for node in nodes {
        match node {
            MathNode::Row(children) => flatten(children, out),
            other => out.push(other),
        }
    }
}

fn sequence(nodes: &[MathNode], style: RunStyle) -> Vec<XmlElement> {
    let mut flat = Vec::new();
    flatten(nodes, &mut flat);

    let mut out = Vec::new();
    let mut i = 0;
    while i < flat.len() {
        let node = flat[i];
        // Relations and operators stay outside the operand slot
        let operand = flat
            .get(i + 1)
            .copied()
            .filter(|next| !matches!(next, MathNode::Operator(_)));
        i += 1;

        if let Some((op, sub, sup)) = large_operator(node) {
            out.push(nary(op, sub, sup, operand, style));
            if operand.is_some() {
                i += 1;
            }
            continue;
        }
        if let Some((name, limit)) = limit_function(node) {
            out.push(limit_func(name, limit, operand, style));
            if operand.is_some() {
                i += 1;
            }
            continue;
        }
        out.push(element(node, style));
    }
    out
}

/// A large operator with optional limits: (operator, lower, upper)
fn large_operator(node: &MathNode) -> Option<(&str, Option<&MathNode>, Option<&MathNode>)> {
    let (base, sub, sup) = match node {
        MathNode::Sub { base, sub } | MathNode::Under { base, under: sub } => {
            (base.as_ref(), Some(sub.as_ref()), None)
        }
        MathNode::Sup { base, sup } => (base.as_ref(), None, Some(sup.as_ref())),
        MathNode::Over {
            base,
            over,
            accent: false,
        } => (base.as_ref(), None, Some(over.as_ref())),
        MathNode::SubSup { base, sub, sup }
        | MathNode::UnderOver {
            base,
            under: sub,
            over: sup,
        } => (base.as_ref(), Some(sub.as_ref()), Some(sup.as_ref())),
        other => (other, None, None),
    };
    if !base.is_large_operator() {
        return None;
    }
    Some((base.token_text()?, sub, sup))
}

fn limit_function(node: &MathNode) -> Option<(&str, &MathNode)> {
    match node {
        MathNode::Sub { base, sub } | MathNode::Under { base, under: sub } => {
            let name = base.token_text()?;
            LIMIT_FUNCTIONS.contains(&name).then_some((name, sub.as_ref()))
        }
        _ => None,
    }
}

fn nary(
    op: &str,
    sub: Option<&MathNode>,
    sup: Option<&MathNode>,
    operand: Option<&MathNode>,
    style: RunStyle,
) -> XmlElement {
    // Integrals keep their limits at the side, sums and products stack them
    let is_integral = matches!(op, "∫" | "∬" | "∭" | "∮" | "∯" | "∰");
    let mut props = XmlElement::new("m:naryPr")
        .child(val("m:chr", op))
        .child(val("m:limLoc", if is_integral { "subSup" } else { "undOvr" }));
    if sub.is_none() {
        props.push(val("m:subHide", "1"));
    }
    if sup.is_none() {
        props.push(val("m:supHide", "1"));
    }
    XmlElement::new("m:nary")
        .child(props)
        .child(match sub {
            Some(sub) => slot("m:sub", sub, style),
            None => empty_slot("m:sub"),
        })
        .child(match sup {
            Some(sup) => slot("m:sup", sup, style),
            None => empty_slot("m:sup"),
        })
        .child(match operand {
            Some(operand) => slot("m:e", operand, style),
            None => empty_slot("m:e"),
        })
}

fn limit_func(name: &str, limit: &MathNode, operand: Option<&MathNode>, style: RunStyle) -> XmlElement {
    let upright = RunStyle {
        style: Some("p"),
        ..style
    };
    let lim_low = XmlElement::new("m:limLow")
        .child(XmlElement::new("m:e").child(run(name, upright, false)))
        .child(slot("m:lim", limit, style));
    XmlElement::new("m:func")
        .child(XmlElement::new("m:fName").child(lim_low))
        .child(match operand {
            Some(operand) => slot("m:e", operand, style),
            None => empty_slot("m:e"),
        })
}

fn element(node: &MathNode, style: RunStyle) -> XmlElement {
    match node {
        MathNode::Ident(s) => {
            // Multi-letter identifiers are function or operator names
            if s.chars().count() > 1 && style.is_plain() {
                let upright = RunStyle {
                    style: Some("p"),
                    ..style
                };
                run(s, upright, false)
            } else {
                run(s, style, false)
            }
        }
        MathNode::Number(s) | MathNode::Operator(s) => run(s, style, false),
        MathNode::Text(s) => run(s, style, true),
        MathNode::Space(width) => run(space_text(*width), style, false),
        MathNode::Row(children) => {
            with_children("m:box", vec![with_children("m:e", sequence(children, style))])
        }
        MathNode::Frac { num, den, bar } => {
            let mut f = XmlElement::new("m:f");
            if !bar {
                f.push(XmlElement::new("m:fPr").child(val("m:type", "noBar")));
            }
            f.child(slot("m:num", num, style))
                .child(slot("m:den", den, style))
        }
        MathNode::Sqrt(body) => XmlElement::new("m:rad")
            .child(XmlElement::new("m:radPr").child(val("m:degHide", "1")))
            .child(empty_slot("m:deg"))
            .child(slot("m:e", body, style)),
        MathNode::Root { base, index } => XmlElement::new("m:rad")
            .child(slot("m:deg", index, style))
            .child(slot("m:e", base, style)),
        MathNode::Sup { base, sup } => XmlElement::new("m:sSup")
            .child(slot("m:e", base, style))
            .child(slot("m:sup", sup, style)),
        MathNode::Sub { base, sub } => XmlElement::new("m:sSub")
            .child(slot("m:e", base, style))
            .child(slot("m:sub", sub, style)),
        MathNode::SubSup { base, sub, sup } => XmlElement::new("m:sSubSup")
            .child(slot("m:e", base, style))
            .child(slot("m:sub", sub, style))
            .child(slot("m:sup", sup, style)),
        MathNode::Over { base, over, accent } => over_element(base, over, *accent, style),
        MathNode::Under { base, under } => under_element(base, under, style),
        MathNode::UnderOver { base, under, over } => XmlElement::new("m:limUpp")
            .child(XmlElement::new("m:e").child(under_element(base, under, style)))
            .child(slot("m:lim", over, style)),
        MathNode::Fenced { open, close, body } => {
            let props = XmlElement::new("m:dPr")
                .child(val("m:begChr", open.as_str()))
                .child(val("m:endChr", close.as_str()));
            XmlElement::new("m:d")
                .child(props)
                .child(slot("m:e", body, style))
        }
        MathNode::Table { kind, rows } => table(*kind, rows, style),
        MathNode::Style { variant, body } => {
            let mut children = sequence(std::slice::from_ref(body.as_ref()), RunStyle::from_variant(*variant));
            if children.len() == 1 {
                children.remove(0)
            } else {
                with_children("m:box", vec![with_children("m:e", children)])
            }
        }
    }
}

fn over_element(base: &MathNode, over: &MathNode, accent: bool, style: RunStyle) -> XmlElement {
    let mark = over.token_text().unwrap_or_default();
    if accent {
        return XmlElement::new("m:acc")
            .child(XmlElement::new("m:accPr").child(val("m:chr", mark)))
            .child(slot("m:e", base, style));
    }
    match mark {
        "‾" | "¯" => XmlElement::new("m:bar")
            .child(XmlElement::new("m:barPr").child(val("m:pos", "top")))
            .child(slot("m:e", base, style)),
        "⏞" => XmlElement::new("m:groupChr")
            .child(
                XmlElement::new("m:groupChrPr")
                    .child(val("m:chr", mark))
                    .child(val("m:pos", "top"))
                    .child(val("m:vertJc", "bot")),
            )
            .child(slot("m:e", base, style)),
        _ => XmlElement::new("m:limUpp")
            .child(slot("m:e", base, style))
            .child(slot("m:lim", over, style)),
    }
}

fn under_element(base: &MathNode, under: &MathNode, style: RunStyle) -> XmlElement {
    match under.token_text().unwrap_or_default() {
        "_" | "‾" | "¯" => XmlElement::new("m:bar")
            .child(XmlElement::new("m:barPr").child(val("m:pos", "bot")))
            .child(slot("m:e", base, style)),
        "⏟" => XmlElement::new("m:groupChr")
            .child(XmlElement::new("m:groupChrPr").child(val("m:chr", "⏟")))
            .child(slot("m:e", base, style)),
        _ => XmlElement::new("m:limLow")
            .child(slot("m:e", base, style))
            .child(slot("m:lim", under, style)),
    }
}

fn table(kind: TableKind, rows: &[Vec<MathNode>], style: RunStyle) -> XmlElement {
    match kind {
        TableKind::Matrix => {
            let mut m = XmlElement::new("m:m");
            for row in rows {
                let mr = row.iter().fold(XmlElement::new("m:mr"), |mr, cell| {
                    mr.child(slot("m:e", cell, style))
                });
                m.push(mr);
            }
            m
        }
        TableKind::Aligned | TableKind::Cases => {
            let mut array = XmlElement::new("m:eqArr");
            for row in rows {
                let mut e = XmlElement::new("m:e");
                for (i, cell) in row.iter().enumerate() {
                    if i > 0 {
                        e.push(run("&", RunStyle::default(), false));
                    }
                    for child in sequence(std::slice::from_ref(cell), style) {
                        e.push(child);
                    }
                }
                array.push(e);
            }
            array
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::parsing::omml_to_latex;
    use crate::equation::latex::latex_to_mathml;

    fn omml(latex: &str) -> XmlElement {
        mathml_to_omml(&latex_to_mathml(latex).unwrap())
    }

    fn names(el: &XmlElement) -> Vec<&str> {
        el.elements().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn test_fraction_and_script_round_trip() {
        let el = omml("\\frac{1}{2}+x^{2}");
        assert_eq!(names(&el), ["m:f", "m:r", "m:sSup"]);
        assert_eq!(omml_to_latex(&el), "\\frac{1}{2}+x^{2}");
    }

    #[test]
    fn test_sum_consumes_its_operand() {
        let el = omml("\\sum_{i=1}^{n} i^{2}");
        assert_eq!(names(&el), ["m:nary"]);
        let nary = el.find("m:nary").unwrap();
        let props = nary.find("m:naryPr").unwrap();
        assert_eq!(props.find("m:chr").and_then(|c| c.attribute("m:val")), Some("∑"));
        assert_eq!(props.find("m:limLoc").and_then(|c| c.attribute("m:val")), Some("undOvr"));
        assert!(nary.find("m:e").unwrap().find("m:sSup").is_some());
    }

    #[test]
    fn test_relation_after_large_operator_is_not_its_operand() {
        let el = omml("\\sum_{i} = 5");
        assert_eq!(names(&el)[0], "m:nary");
        let nary = el.find("m:nary").unwrap();
        assert_eq!(nary.find("m:e").unwrap().text_content(), "");
        assert!(el.elements().skip(1).any(|e| e.text_content().contains('=')));

        let el = omml("\\lim_{x\\to 0} = 1");
        let func = el.find("m:func").unwrap();
        assert_eq!(func.find("m:e").unwrap().text_content(), "");
        assert!(el.elements().skip(1).any(|e| e.text_content().contains('=')));
    }

    #[test]
    fn test_integral_without_limits_hides_them() {
        let el = omml("\\int f");
        let props = el.find("m:nary").unwrap().find("m:naryPr").unwrap();
        assert!(props.find("m:subHide").is_some());
        assert!(props.find("m:supHide").is_some());
        assert_eq!(props.find("m:limLoc").and_then(|c| c.attribute("m:val")), Some("subSup"));
    }

    #[test]
    fn test_limit_becomes_function_with_lower_limit() {
        let el = omml("\\lim_{x\\to 0} f");
        let func = el.find("m:func").unwrap();
        let lim_low = func.find("m:fName").unwrap().find("m:limLow").unwrap();
        assert_eq!(lim_low.find("m:e").unwrap().text_content(), "lim");
        assert_eq!(func.find("m:e").unwrap().text_content(), "f");
    }

    #[test]
    fn test_delimiters_and_cases() {
        let el = omml("\\begin{cases} 1 & x>0 \\\\ 0 & x\\le 0 \\end{cases}");
        let d = el.find("m:d").unwrap();
        let props = d.find("m:dPr").unwrap();
        assert_eq!(props.find("m:begChr").and_then(|c| c.attribute("m:val")), Some("{"));
        assert_eq!(props.find("m:endChr").and_then(|c| c.attribute("m:val")), Some(""));
        let array = d.find("m:e").unwrap().find("m:eqArr").unwrap();
        assert_eq!(array.elements().count(), 2);
        assert!(array.elements().next().unwrap().text_content().contains('&'));
    }

    #[test]
    fn test_accents_bars_and_styles() {
        let el = omml("\\vec{a}\\overline{AB}\\mathbb{R}\\text{ if }\\sin");
        assert_eq!(names(&el), ["m:acc", "m:bar", "m:r", "m:r", "m:r"]);
        let runs: Vec<&XmlElement> = el.children_local("r").collect();
        let scr = runs[0].find("m:rPr").and_then(|p| p.find("m:scr"));
        assert_eq!(scr.and_then(|s| s.attribute("m:val")), Some("double-struck"));
        assert!(runs[1].find("m:rPr").and_then(|p| p.find("m:nor")).is_some());
        let sty = runs[2].find("m:rPr").and_then(|p| p.find("m:sty"));
        assert_eq!(sty.and_then(|s| s.attribute("m:val")), Some("p"));
    }

    #[test]
    fn test_matrix() {
        let el = omml("\\begin{bmatrix} a & b \\\\ c & d \\end{bmatrix}");
        let m = el.find("m:d").unwrap().find("m:e").unwrap().find("m:m").unwrap();
        assert_eq!(m.elements().count(), 2);
        assert_eq!(m.elements().next().unwrap().elements().count(), 2);
    }
}
