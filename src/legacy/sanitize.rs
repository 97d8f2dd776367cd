//! Repair of common formula-OCR mistakes
//!
//! Recognizers tend to emit surplus `\right` closers and doubled operators.
//! [`sanitize_latex`] removes the surplus without touching balanced input.

use once_cell::sync::Lazy;
use regex::Regex;

static SQRT_DIGIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\sqrt(\d)").expect("sqrt digit regex"));

/// Tokens a stray closer is found glued to, in the order they are tried
const CONTINUATIONS: &[&str] = &[
    "\\pm", "\\mp", "=", "+", "-", "\\cdot", "\\times", "\\div", "\\sin", "\\cos", "\\tan",
    "\\left", "\\quad", "\\,", "\\;", "\\infty", "\\sum", "\\int", "\\lim",
];

const DOUBLED: &[(&str, &str)] = &[
    ("\\pm\\pm", "\\pm"),
    ("\\mp\\mp", "\\mp"),
    ("\\cdot\\cdot", "\\cdot"),
    ("\\times\\times", "\\times"),
    ("\\div\\div", "\\div"),
    ("\\quad\\quad", "\\quad"),
];

/// `(\left X, \right Y)` for each bracket pair
fn fences() -> [(String, String); 3] {
    [("[", "]"), ("(", ")"), ("\\{", "\\}")]
        .map(|(open, close)| (format!("\\left{open}"), format!("\\right{close}")))
}

pub fn sanitize_latex(latex: &str) -> String {
    if latex.is_empty() {
        return String::new();
    }
    let mut s = latex.to_string();
    let fences = fences();

    // `\right)\right)\left(` → `\right)\left(`
    for (left, right) in &fences {
        s = s.replace(&format!("{right}{right}{left}"), &format!("{right}{left}"));
    }

    for (left, right) in &fences {
        let mut surplus = s.matches(right.as_str()).count() as isize
            - s.matches(left.as_str()).count() as isize;
        if surplus <= 0 {
            continue;
        }

        let doubled = format!("{right}{right}");
        while surplus > 0 && s.contains(&doubled) {
            s = s.replacen(&doubled, right, 1);
            surplus -= 1;
        }
        for token in CONTINUATIONS {
            if surplus <= 0 {
                break;
            }
            let glued = format!("{right}{token}");
            while surplus > 0 && s.contains(&glued) {
                s = s.replacen(&glued, token, 1);
                surplus -= 1;
            }
        }
        if surplus > 0 && s.ends_with(right.as_str()) {
            s.truncate(s.len() - right.len());
        }
    }

    for (double, single) in DOUBLED {
        s = s.replace(double, single);
    }

    SQRT_DIGIT.replace_all(&s, r"\sqrt{$1}").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doubled_closer_is_collapsed() {
        assert_eq!(sanitize_latex("\\left(x+1\\right)\\right)"), "\\left(x+1\\right)");
    }

    #[test]
    fn test_sqrt_digit_gets_braces() {
        assert_eq!(sanitize_latex("\\sqrt2"), "\\sqrt{2}");
        assert_eq!(sanitize_latex("\\sqrt23"), "\\sqrt{2}3");
    }

    #[test]
    fn test_closer_glued_to_operator() {
        assert_eq!(
            sanitize_latex("\\left(a\\right)+b\\right)=c"),
            "\\left(a\\right)+b=c"
        );
    }

    #[test]
    fn test_trailing_brace_closer() {
        assert_eq!(sanitize_latex("\\left\\{x\\right\\}y\\right\\}"), "\\left\\{x\\right\\}y");
    }

    #[test]
    fn test_doubled_operators_and_balanced_input() {
        assert_eq!(sanitize_latex("a\\pm\\pm b"), "a\\pm b");
        let balanced = "\\left[0,1\\right]";
        assert_eq!(sanitize_latex(balanced), balanced);
        assert_eq!(sanitize_latex(""), "");
    }
}
