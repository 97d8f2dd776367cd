//! OMML to LaTeX conversion
//!
//! Word stores native equations as OMML (Office Math Markup Language). The
//! converter lifts an OMML element into a closed [`MathElement`] tree, where
//! property elements (`m:fPr`, `m:rPr`, `m:ctrlPr`, ...) have already been
//! folded into the node that owns them, and then renders that tree to LaTeX.
//!
//! Conversion never fails: elements outside the supported set degrade to
//! their raw descendant text.

use super::symbols::{self, push_latex};
use super::xml::XmlElement;

/// Content of an argument slot such as `m:e`, `m:num` or `m:sup`
type Slot = Vec<MathElement>;

/// A math run with its relevant run properties
#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) struct MathRun {
    pub(crate) text: String,
    /// `m:nor`: the run is ordinary text, not math
    pub(crate) normal_text: bool,
    /// `m:scr` value, e.g. `double-struck`
    pub(crate) script: Option<String>,
    /// `m:sty` value, e.g. `p` or `b`
    pub(crate) style: Option<String>,
}

/// Typed OMML content node
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum MathElement {
    Run(MathRun),
    /// Transparent container (`m:oMath`, `m:e`, `m:num`, ...)
    Group(Slot),
    Fraction {
        linear: bool,
        num: Slot,
        den: Slot,
    },
    Radical {
        hide_degree: bool,
        degree: Slot,
        base: Slot,
    },
    Superscript {
        base: Slot,
        sup: Slot,
    },
    Subscript {
        base: Slot,
        sub: Slot,
    },
    SubSuperscript {
        base: Slot,
        sub: Slot,
        sup: Slot,
    },
    PreScript {
        sub: Slot,
        sup: Slot,
        base: Slot,
    },
    Nary {
        chr: Option<String>,
        hide_sub: bool,
        hide_sup: bool,
        sub: Slot,
        sup: Slot,
        operand: Slot,
    },
    Delimiter {
        open: String,
        close: String,
        separator: Option<String>,
        items: Vec<Slot>,
    },
    Accent {
        chr: Option<String>,
        base: Slot,
    },
    Bar {
        bottom: bool,
        base: Slot,
    },
    Function {
        name: Slot,
        arg: Slot,
    },
    LowerLimit {
        base: Slot,
        limit: Slot,
    },
    UpperLimit {
        base: Slot,
        limit: Slot,
    },
    Matrix {
        rows: Vec<Vec<Slot>>,
    },
    EquationArray {
        rows: Vec<Slot>,
    },
    GroupChar {
        chr: Option<String>,
        bottom: bool,
        base: Slot,
    },
    Boxed(Slot),
    Phantom {
        show: bool,
        base: Slot,
    },
    /// Element outside the supported set, kept as its raw text
    Unknown(String),
}

/// Convert an `m:oMath`, `m:oMathPara` or any OMML element to LaTeX
pub fn omml_to_latex(element: &XmlElement) -> String {
    if element.local_name() == "oMathPara" {
        return element
            .children_local("oMath")
            .map(|math| render_slot(&lift_children(math)).trim().to_string())
            .filter(|latex| !latex.is_empty())
            .collect::<Vec<_>>()
            .join(" \\\\ ");
    }
    render(&lift(element)).trim().to_string()
}

/// Plain text of all `m:t` runs, used when LaTeX output is not wanted
pub fn omml_plain_text(element: &XmlElement) -> String {
    element
        .descendants()
        .filter(|el| el.local_name() == "t" && !el.is("w:t"))
        .map(|el| el.text_content())
        .collect()
}

// ---------------------------------------------------------------------------
// Lifting: XML -> typed tree
// ---------------------------------------------------------------------------

fn is_property(el: &XmlElement) -> bool {
    el.local_name().ends_with("Pr")
}

/// On/off property such as `m:degHide`; a bare element without `m:val` is on
fn flag(el: &XmlElement, prop: &str, name: &str) -> bool {
    match el.child_local(prop).and_then(|p| p.child_local(name)) {
        Some(toggle) => matches!(toggle.val(), None | Some("1" | "on" | "true")),
        None => false,
    }
}

fn is_off(value: Option<&str>) -> bool {
    matches!(value, Some("0" | "off" | "false"))
}

/// `m:val` of `<prop>/<name>` under `el`, e.g. `fPr/type`
fn prop_val<'a>(el: &'a XmlElement, prop: &str, name: &str) -> Option<&'a str> {
    el.child_local(prop)?.child_local(name)?.val()
}

fn lift_children(el: &XmlElement) -> Slot {
    el.elements()
        .filter(|child| !is_property(child))
        .map(lift)
        .collect()
}

fn slot(el: &XmlElement, name: &str) -> Slot {
    el.child_local(name).map(lift_children).unwrap_or_default()
}

pub(crate) fn lift(el: &XmlElement) -> MathElement {
    match el.local_name() {
        "r" => MathElement::Run(lift_run(el)),
        "oMath" | "oMathPara" | "e" | "num" | "den" | "sup" | "sub" | "deg" | "lim"
        | "fName" => MathElement::Group(lift_children(el)),
        "f" => MathElement::Fraction {
            linear: matches!(prop_val(el, "fPr", "type"), Some("skw" | "lin")),
            num: slot(el, "num"),
            den: slot(el, "den"),
        },
        "rad" => MathElement::Radical {
            hide_degree: flag(el, "radPr", "degHide"),
            degree: slot(el, "deg"),
            base: slot(el, "e"),
        },
        "sSup" => MathElement::Superscript {
            base: slot(el, "e"),
            sup: slot(el, "sup"),
        },
        "sSub" => MathElement::Subscript {
            base: slot(el, "e"),
            sub: slot(el, "sub"),
        },
        "sSubSup" => MathElement::SubSuperscript {
            base: slot(el, "e"),
            sub: slot(el, "sub"),
            sup: slot(el, "sup"),
        },
        "sPre" => MathElement::PreScript {
            sub: slot(el, "sub"),
            sup: slot(el, "sup"),
            base: slot(el, "e"),
        },
        "nary" => MathElement::Nary {
            chr: prop_val(el, "naryPr", "chr").map(str::to_string),
            hide_sub: flag(el, "naryPr", "subHide"),
            hide_sup: flag(el, "naryPr", "supHide"),
            sub: slot(el, "sub"),
            sup: slot(el, "sup"),
            operand: slot(el, "e"),
        },
        "d" => MathElement::Delimiter {
            open: prop_val(el, "dPr", "begChr").unwrap_or("(").to_string(),
            close: prop_val(el, "dPr", "endChr").unwrap_or(")").to_string(),
            separator: prop_val(el, "dPr", "sepChr").map(str::to_string),
            items: el.children_local("e").map(lift_children).collect(),
        },
        "acc" => MathElement::Accent {
            chr: prop_val(el, "accPr", "chr").map(str::to_string),
            base: slot(el, "e"),
        },
        "bar" => MathElement::Bar {
            bottom: prop_val(el, "barPr", "pos") == Some("bot"),
            base: slot(el, "e"),
        },
        "func" => MathElement::Function {
            name: slot(el, "fName"),
            arg: slot(el, "e"),
        },
        "limLow" => MathElement::LowerLimit {
            base: slot(el, "e"),
            limit: slot(el, "lim"),
        },
        "limUpp" => MathElement::UpperLimit {
            base: slot(el, "e"),
            limit: slot(el, "lim"),
        },
        "m" => MathElement::Matrix {
            rows: el
                .children_local("mr")
                .map(|row| row.children_local("e").map(lift_children).collect())
                .collect(),
        },
        "eqArr" => MathElement::EquationArray {
            rows: el.children_local("e").map(lift_children).collect(),
        },
        "groupChr" => MathElement::GroupChar {
            chr: prop_val(el, "groupChrPr", "chr").map(str::to_string),
            bottom: prop_val(el, "groupChrPr", "pos") == Some("bot"),
            base: slot(el, "e"),
        },
        "box" | "borderBox" => match el.child_local("e") {
            Some(e) => MathElement::Boxed(lift_children(e)),
            None => MathElement::Boxed(lift_children(el)),
        },
        "phant" => MathElement::Phantom {
            show: !is_off(prop_val(el, "phantPr", "show")),
            base: slot(el, "e"),
        },
        _ => MathElement::Unknown(el.text_content()),
    }
}

fn lift_run(el: &XmlElement) -> MathRun {
    let props = el
        .elements()
        .find(|child| child.local_name() == "rPr" && !child.is("w:rPr"));
    let text = el
        .elements()
        .filter(|child| child.local_name() == "t")
        .map(|t| t.text_content())
        .collect();
    MathRun {
        text,
        normal_text: props.is_some_and(|p| p.child_local("nor").is_some()),
        script: props
            .and_then(|p| p.child_local("scr"))
            .and_then(|s| s.val())
            .map(str::to_string),
        style: props
            .and_then(|p| p.child_local("sty"))
            .and_then(|s| s.val())
            .map(str::to_string),
    }
}

// ---------------------------------------------------------------------------
// Rendering: typed tree -> LaTeX
// ---------------------------------------------------------------------------

fn render_slot(slot: &[MathElement]) -> String {
    let mut out = String::new();
    for element in slot {
        push_latex(&mut out, &render(element));
    }
    out
}

/// Wrap a script base in braces unless it is a single char, a group or a command
fn script_base(base: &str) -> String {
    if base.chars().count() > 1 && !(base.starts_with('{') || base.starts_with('\\')) {
        format!("{{{base}}}")
    } else {
        base.to_string()
    }
}

fn first_char(value: &str) -> Option<char> {
    value.chars().next()
}

fn delimiter(value: &str) -> String {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(ch), None) => symbols::DELIMITERS
            .get(&ch)
            .map(|d| d.to_string())
            .unwrap_or_else(|| value.to_string()),
        _ => value.to_string(),
    }
}

fn function_name(rendered: &str) -> String {
    let trimmed = rendered.trim();
    for name in symbols::FUNCTION_NAMES {
        let wrapped = format!("\\mathrm{{{name}}}");
        if trimmed.contains(&wrapped) {
            return trimmed.replacen(&wrapped, &format!("\\{name}"), 1);
        }
        if trimmed == *name {
            return format!("\\{name}");
        }
    }
    rendered.to_string()
}

fn render_run(run: &MathRun) -> String {
    if run.normal_text {
        return format!("\\text{{{}}}", run.text);
    }
    let latex = symbols::convert_text(&run.text);
    if latex.is_empty() {
        return latex;
    }
    let font = match run.script.as_deref() {
        Some("double-struck") => Some("\\mathbb"),
        Some("script") => Some("\\mathcal"),
        Some("fraktur") => Some("\\mathfrak"),
        Some("sans-serif") => Some("\\mathsf"),
        Some("monospace") => Some("\\mathtt"),
        _ => None,
    }
    .or(match run.style.as_deref() {
        Some("b") => Some("\\mathbf"),
        Some("bi") => Some("\\boldsymbol"),
        Some("p") => Some("\\mathrm"),
        _ => None,
    });
    match font {
        Some(cmd) => format!("{cmd}{{{}}}", latex.trim()),
        None => latex,
    }
}

fn render(element: &MathElement) -> String {
    match element {
        MathElement::Run(run) => render_run(run),
        MathElement::Group(children) | MathElement::Boxed(children) => render_slot(children),
        MathElement::Fraction { linear, num, den } => {
            let (n, d) = (render_slot(num), render_slot(den));
            if *linear {
                format!("{{{n}}}/{{{d}}}")
            } else {
                format!("\\frac{{{n}}}{{{d}}}")
            }
        }
        MathElement::Radical {
            hide_degree,
            degree,
            base,
        } => {
            let deg = render_slot(degree);
            let e = render_slot(base);
            if *hide_degree || deg.trim().is_empty() {
                format!("\\sqrt{{{e}}}")
            } else {
                format!("\\sqrt[{deg}]{{{e}}}")
            }
        }
        MathElement::Superscript { base, sup } => {
            format!("{}^{{{}}}", script_base(&render_slot(base)), render_slot(sup))
        }
        MathElement::Subscript { base, sub } => {
            format!("{}_{{{}}}", script_base(&render_slot(base)), render_slot(sub))
        }
        MathElement::SubSuperscript { base, sub, sup } => format!(
            "{}_{{{}}}^{{{}}}",
            script_base(&render_slot(base)),
            render_slot(sub),
            render_slot(sup)
        ),
        MathElement::PreScript { sub, sup, base } => format!(
            "{{}}_{{{}}}^{{{}}}{}",
            render_slot(sub),
            render_slot(sup),
            render_slot(base)
        ),
        MathElement::Nary {
            chr,
            hide_sub,
            hide_sup,
            sub,
            sup,
            operand,
        } => {
            let op = chr.as_deref().unwrap_or("∫");
            let mut out = match first_char(op) {
                Some(ch) if op.chars().count() == 1 => symbols::NARY_OPERATORS
                    .get(&ch)
                    .map(|cmd| cmd.to_string())
                    .unwrap_or_else(|| symbols::convert_text(op)),
                _ => symbols::convert_text(op),
            };
            let sub = render_slot(sub);
            if !*hide_sub && !sub.trim().is_empty() {
                out.push_str(&format!("_{{{sub}}}"));
            }
            let sup = render_slot(sup);
            if !*hide_sup && !sup.trim().is_empty() {
                out.push_str(&format!("^{{{sup}}}"));
            }
            let operand = render_slot(operand);
            if !operand.trim().is_empty() {
                out.push_str(&format!("{{{operand}}}"));
            }
            out
        }
        MathElement::Delimiter {
            open,
            close,
            separator,
            items,
        } => {
            let parts: Vec<String> = items.iter().map(|item| render_slot(item)).collect();
            let inner = if parts.len() > 1 {
                let sep = match separator.as_deref() {
                    Some(sep) if !sep.is_empty() => symbols::convert_text(sep),
                    _ => ", ".to_string(),
                };
                parts.join(&sep)
            } else {
                parts.into_iter().next().unwrap_or_default()
            };
            if open.is_empty() && close.is_empty() {
                return inner;
            }
            let open = if open.is_empty() {
                ".".to_string()
            } else {
                delimiter(open)
            };
            let close = if close.is_empty() {
                ".".to_string()
            } else {
                delimiter(close)
            };
            format!("\\left{open} {inner} \\right{close}")
        }
        MathElement::Accent { chr, base } => {
            let ch = chr.as_deref().and_then(first_char).unwrap_or('\u{0302}');
            let cmd = symbols::ACCENTS.get(&ch).copied().unwrap_or("\\hat");
            format!("{cmd}{{{}}}", render_slot(base))
        }
        MathElement::Bar { bottom, base } => {
            let cmd = if *bottom { "\\underline" } else { "\\overline" };
            format!("{cmd}{{{}}}", render_slot(base))
        }
        MathElement::Function { name, arg } => {
            let mut out = function_name(&render_slot(name));
            push_latex(&mut out, &render_slot(arg));
            out
        }
        MathElement::LowerLimit { base, limit } => {
            format!("{}_{{{}}}", render_slot(base), render_slot(limit))
        }
        MathElement::UpperLimit { base, limit } => {
            format!("{}^{{{}}}", render_slot(base), render_slot(limit))
        }
        MathElement::Matrix { rows } => {
            let rows: Vec<String> = rows
                .iter()
                .map(|cells| {
                    cells
                        .iter()
                        .map(|cell| render_slot(cell))
                        .collect::<Vec<_>>()
                        .join(" & ")
                })
                .collect();
            format!("\\begin{{matrix}} {} \\end{{matrix}}", rows.join(" \\\\ "))
        }
        MathElement::EquationArray { rows } => {
            let rows: Vec<String> = rows.iter().map(|row| render_slot(row)).collect();
            format!("\\begin{{aligned}} {} \\end{{aligned}}", rows.join(" \\\\ "))
        }
        MathElement::GroupChar { chr, bottom, base } => {
            let cmd = chr
                .as_deref()
                .and_then(first_char)
                .and_then(|ch| symbols::GROUP_CHARS.get(&ch).copied())
                .unwrap_or(if *bottom { "\\underbrace" } else { "\\overbrace" });
            format!("{cmd}{{{}}}", render_slot(base))
        }
        MathElement::Phantom { show, base } => {
            let e = render_slot(base);
            if *show { e } else { format!("\\phantom{{{e}}}") }
        }
        MathElement::Unknown(text) => text.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::parsing::xml::parse_xml;

    fn convert(omml: &str) -> String {
        omml_to_latex(&parse_xml(omml).unwrap())
    }

    fn run(text: &str) -> String {
        format!("<m:r><m:t>{text}</m:t></m:r>")
    }

    #[test]
    fn test_linear_fraction() {
        let xml = format!(
            "<m:f><m:fPr><m:type m:val=\"lin\"/></m:fPr><m:num>{}</m:num><m:den>{}</m:den></m:f>",
            run("a"),
            run("b")
        );
        assert_eq!(convert(&xml), "{a}/{b}");
    }

    #[test]
    fn test_no_bar_fraction_is_still_frac() {
        let xml = format!(
            "<m:f><m:fPr><m:type m:val=\"noBar\"/></m:fPr><m:num>{}</m:num><m:den>{}</m:den></m:f>",
            run("n"),
            run("k")
        );
        assert_eq!(convert(&xml), "\\frac{n}{k}");
    }

    #[test]
    fn test_radical_with_degree() {
        let xml = format!(
            "<m:rad><m:deg>{}</m:deg><m:e>{}</m:e></m:rad>",
            run("3"),
            run("x")
        );
        assert_eq!(convert(&xml), "\\sqrt[3]{x}");
    }

    #[test]
    fn test_script_base_braces() {
        let xml = format!("<m:sSup><m:e>{}</m:e><m:sup>{}</m:sup></m:sSup>", run("ab"), run("2"));
        assert_eq!(convert(&xml), "{ab}^{2}");
        let xml = format!("<m:sSub><m:e>{}</m:e><m:sub>{}</m:sub></m:sSub>", run("α"), run("1"));
        assert_eq!(convert(&xml), "\\alpha_{1}");
    }

    #[test]
    fn test_delimiter_defaults_and_mapping() {
        let xml = format!(
            "<m:d><m:dPr><m:begChr m:val=\"{{\"/><m:endChr m:val=\"\"/></m:dPr><m:e>{}</m:e></m:d>",
            run("x")
        );
        assert_eq!(convert(&xml), "\\left\\{ x \\right.");
        let xml = format!("<m:d><m:e>{}</m:e></m:d>", run("x"));
        assert_eq!(convert(&xml), "\\left( x \\right)");
    }

    #[test]
    fn test_accent_bar_and_group_char() {
        let xml = format!(
            "<m:acc><m:accPr><m:chr m:val=\"\u{20D7}\"/></m:accPr><m:e>{}</m:e></m:acc>",
            run("a")
        );
        assert_eq!(convert(&xml), "\\vec{a}");
        let xml = format!("<m:acc><m:e>{}</m:e></m:acc>", run("a"));
        assert_eq!(convert(&xml), "\\hat{a}");
        let xml = format!(
            "<m:bar><m:barPr><m:pos m:val=\"bot\"/></m:barPr><m:e>{}</m:e></m:bar>",
            run("x")
        );
        assert_eq!(convert(&xml), "\\underline{x}");
        let xml = format!(
            "<m:groupChr><m:groupChrPr><m:pos m:val=\"bot\"/></m:groupChrPr><m:e>{}</m:e></m:groupChr>",
            run("x")
        );
        assert_eq!(convert(&xml), "\\underbrace{x}");
    }

    #[test]
    fn test_function_name_is_normalized() {
        let xml = "<m:func><m:fName><m:r><m:rPr><m:sty m:val=\"p\"/></m:rPr><m:t>sin</m:t></m:r></m:fName><m:e><m:r><m:t>x</m:t></m:r></m:e></m:func>";
        assert_eq!(convert(xml), "\\sin x");
    }

    #[test]
    fn test_limits_matrix_and_equation_array() {
        let xml = format!(
            "<m:limLow><m:e>{}</m:e><m:lim>{}</m:lim></m:limLow>",
            run("lim"),
            run("x→0")
        );
        assert_eq!(convert(&xml), "lim_{x\\rightarrow0}");

        let xml = format!(
            "<m:m><m:mr><m:e>{}</m:e><m:e>{}</m:e></m:mr><m:mr><m:e>{}</m:e><m:e>{}</m:e></m:mr></m:m>",
            run("a"),
            run("b"),
            run("c"),
            run("d")
        );
        assert_eq!(
            convert(&xml),
            "\\begin{matrix} a & b \\\\ c & d \\end{matrix}"
        );

        let xml = format!("<m:eqArr><m:e>{}</m:e><m:e>{}</m:e></m:eqArr>", run("x=1"), run("y=2"));
        assert_eq!(
            convert(&xml),
            "\\begin{aligned} x=1 \\\\ y=2 \\end{aligned}"
        );
    }

    #[test]
    fn test_run_styles() {
        let xml = "<m:r><m:rPr><m:nor/></m:rPr><m:t>if</m:t></m:r>";
        assert_eq!(convert(xml), "\\text{if}");
        let xml = "<m:r><m:rPr><m:scr m:val=\"double-struck\"/></m:rPr><m:t>R</m:t></m:r>";
        assert_eq!(convert(xml), "\\mathbb{R}");
        let xml = "<m:r><m:rPr><m:sty m:val=\"b\"/></m:rPr><m:t>v</m:t></m:r>";
        assert_eq!(convert(xml), "\\mathbf{v}");
    }

    #[test]
    fn test_phantom_and_prescript() {
        let xml = format!(
            "<m:phant><m:phantPr><m:show m:val=\"0\"/></m:phantPr><m:e>{}</m:e></m:phant>",
            run("x")
        );
        assert_eq!(convert(&xml), "\\phantom{x}");
        let xml = format!(
            "<m:sPre><m:sub>{}</m:sub><m:sup>{}</m:sup><m:e>{}</m:e></m:sPre>",
            run("1"),
            run("2"),
            run("C")
        );
        assert_eq!(convert(&xml), "{}_{1}^{2}C");
    }

    #[test]
    fn test_control_word_spacing_between_runs() {
        let xml = format!("<m:oMath>{}{}</m:oMath>", run("π"), run("r"));
        assert_eq!(convert(&xml), "\\pi r");
    }

    #[test]
    fn test_omath_para_joins_lines() {
        let xml = format!(
            "<m:oMathPara><m:oMath>{}</m:oMath><m:oMath></m:oMath><m:oMath>{}</m:oMath></m:oMathPara>",
            run("a"),
            run("b")
        );
        assert_eq!(convert(&xml), "a \\\\ b");
    }

    #[test]
    fn test_unknown_element_keeps_text() {
        let xml = "<m:oMath><m:foo><m:r><m:t>x</m:t></m:r><m:r><m:t>y</m:t></m:r></m:foo></m:oMath>";
        assert_eq!(convert(xml), "xy");
    }

    #[test]
    fn test_plain_text_fallback() {
        let xml = format!("<m:oMath>{}{}</m:oMath>", run("x"), run("+1"));
        let el = parse_xml(&xml).unwrap();
        assert_eq!(omml_plain_text(&el), "x+1");
    }
}
