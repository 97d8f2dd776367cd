use quizdocx::document::parsing::{omml_to_latex, parse_xml};

const M: &str = r#"xmlns:m="http://schemas.openxmlformats.org/officeDocument/2006/math""#;

fn run(text: &str) -> String {
    format!("<m:r><m:t>{text}</m:t></m:r>")
}

fn convert(inner: &str) -> String {
    let xml = format!("<m:oMath {M}>{inner}</m:oMath>");
    omml_to_latex(&parse_xml(&xml).unwrap())
}

#[cfg(test)]
mod golden_tests {
    use super::*;

    #[test]
    fn test_fraction() {
        let xml = format!(
            "<m:f><m:num>{}</m:num><m:den>{}</m:den></m:f>",
            run("a+b"),
            run("c")
        );
        assert_eq!(convert(&xml), "\\frac{a+b}{c}");
    }

    #[test]
    fn test_superscript_of_subscript() {
        let xml = format!(
            "<m:sSup><m:e><m:sSub><m:e>{}</m:e><m:sub>{}</m:sub></m:sSub></m:e><m:sup>{}</m:sup></m:sSup>",
            run("x"),
            run("1"),
            run("2")
        );
        assert_eq!(convert(&xml), "{x_{1}}^{2}");
    }

    #[test]
    fn test_nary_sum_with_both_bounds() {
        let xml = format!(
            "<m:nary><m:naryPr><m:chr m:val=\"∑\"/></m:naryPr><m:sub>{}</m:sub><m:sup>{}</m:sup><m:e>{}</m:e></m:nary>",
            run("i=1"),
            run("n"),
            run("i")
        );
        assert_eq!(convert(&xml), "\\sum_{i=1}^{n}{i}");
    }

    #[test]
    fn test_radical_with_hidden_degree() {
        let xml = format!(
            "<m:rad><m:radPr><m:degHide m:val=\"1\"/></m:radPr><m:deg/><m:e>{}</m:e></m:rad>",
            run("x")
        );
        assert_eq!(convert(&xml), "\\sqrt{x}");
    }

    #[test]
    fn test_delimiter_with_separated_elements() {
        let xml = format!(
            "<m:d><m:dPr><m:begChr m:val=\"[\"/><m:sepChr m:val=\",\"/><m:endChr m:val=\"]\"/></m:dPr><m:e>{}</m:e><m:e>{}</m:e><m:e>{}</m:e></m:d>",
            run("a"),
            run("b"),
            run("c")
        );
        assert_eq!(convert(&xml), "\\left[ a,b,c \\right]");
    }

    #[test]
    fn test_unknown_element_keeps_descendant_text() {
        let xml = format!("<m:weird><m:inner>{}</m:inner></m:weird>", run("q"));
        assert_eq!(convert(&xml), "q");
    }
}
