use quizdocx::document::parsing::omml_to_latex;
use quizdocx::equation::{EquationError, latex_to_mathml, parse_mathml, to_mathml};
use quizdocx::{latex_to_omml, mathml_str_to_omml, sanitize_latex};

fn round_trip(latex: &str) -> String {
    omml_to_latex(&latex_to_omml(latex).unwrap())
}

#[cfg(test)]
mod latex_tests {
    use super::*;

    #[test]
    fn test_round_trip_through_word_math() {
        assert_eq!(round_trip("\\frac{1}{2}"), "\\frac{1}{2}");
        assert_eq!(round_trip("x^{2}"), "x^{2}");
        assert_eq!(round_trip("\\sqrt[3]{x}"), "\\sqrt[3]{x}");
        assert_eq!(round_trip("\\sum_{i=1}^{n}i"), "\\sum_{i=1}^{n}{i}");
        assert_eq!(round_trip("\\left(a+b\\right)"), "\\left( a+b \\right)");
    }

    #[test]
    fn test_mathml_input() {
        let mathml = to_mathml(&latex_to_mathml("\\frac{a}{b}").unwrap());
        let omath = mathml_str_to_omml(&mathml).unwrap();
        assert_eq!(omml_to_latex(&omath), "\\frac{a}{b}");
        assert!(parse_mathml("<math><mfrac>").is_err());
    }

    #[test]
    fn test_malformed_latex_is_an_error() {
        assert!(matches!(
            latex_to_omml("\\frac{1}{2"),
            Err(EquationError::UnbalancedBraces)
        ));
        assert!(latex_to_omml("\\unknowncommand").is_err());
        assert!(latex_to_omml("\\right)").is_err());
    }

    #[test]
    fn test_sanitizer_cases() {
        assert_eq!(sanitize_latex("\\left(x+1\\right)\\right)"), "\\left(x+1\\right)");
        assert_eq!(sanitize_latex("\\sqrt2"), "\\sqrt{2}");
        assert_eq!(sanitize_latex(""), "");
        assert_eq!(sanitize_latex("x^{2}+1"), "x^{2}+1");
    }
}
