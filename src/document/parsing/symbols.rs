//! Unicode ↔ LaTeX symbol tables
//!
//! Static lookup tables shared by the OMML reader (Unicode → LaTeX) and the
//! LaTeX parser on the export path (LaTeX command → Unicode).

/// Unicode characters that have a LaTeX spelling
pub(crate) static UNICODE_TO_LATEX: phf::Map<char, &'static str> = phf::phf_map! {
    // Lowercase Greek
    'α' => "\\alpha", 'β' => "\\beta", 'γ' => "\\gamma", 'δ' => "\\delta",
    'ε' => "\\varepsilon", 'ζ' => "\\zeta", 'η' => "\\eta", 'θ' => "\\theta",
    'ι' => "\\iota", 'κ' => "\\kappa", 'λ' => "\\lambda", 'μ' => "\\mu",
    'ν' => "\\nu", 'ξ' => "\\xi", 'π' => "\\pi", 'ρ' => "\\rho",
    'σ' => "\\sigma", 'ς' => "\\varsigma", 'τ' => "\\tau", 'υ' => "\\upsilon",
    'φ' => "\\varphi", 'χ' => "\\chi", 'ψ' => "\\psi", 'ω' => "\\omega",
    'ϕ' => "\\phi", 'ϵ' => "\\epsilon", 'ϑ' => "\\vartheta", 'ϱ' => "\\varrho",
    'ϖ' => "\\varpi",
    // Uppercase Greek
    'Γ' => "\\Gamma", 'Δ' => "\\Delta", 'Θ' => "\\Theta", 'Λ' => "\\Lambda",
    'Ξ' => "\\Xi", 'Π' => "\\Pi", 'Σ' => "\\Sigma", 'Υ' => "\\Upsilon",
    'Φ' => "\\Phi", 'Ψ' => "\\Psi", 'Ω' => "\\Omega",
    // Binary operators and relations
    '×' => "\\times", '÷' => "\\div", '±' => "\\pm", '∓' => "\\mp",
    '·' => "\\cdot", '∙' => "\\cdot", '⊕' => "\\oplus", '⊗' => "\\otimes",
    '⊖' => "\\ominus", '∘' => "\\circ",
    '≤' => "\\leq", '≥' => "\\geq", '≠' => "\\neq", '≈' => "\\approx",
    '≡' => "\\equiv", '∼' => "\\sim", '≅' => "\\cong", '≪' => "\\ll", '≫' => "\\gg",
    '≺' => "\\prec", '≻' => "\\succ", '⪯' => "\\preceq", '⪰' => "\\succeq",
    '∝' => "\\propto", '⩽' => "\\leqslant", '⩾' => "\\geqslant",
    // Sets and logic
    '∈' => "\\in", '∉' => "\\notin", '∋' => "\\ni", '⊂' => "\\subset", '⊃' => "\\supset",
    '⊆' => "\\subseteq", '⊇' => "\\supseteq", '⊊' => "\\subsetneq", '⊋' => "\\supsetneq",
    '∅' => "\\emptyset", '∪' => "\\cup", '∩' => "\\cap", '∖' => "\\setminus",
    '∧' => "\\wedge", '∨' => "\\vee", '¬' => "\\neg",
    // Arrows
    '⇒' => "\\Rightarrow", '⇔' => "\\Leftrightarrow", '⇐' => "\\Leftarrow",
    '→' => "\\rightarrow", '←' => "\\leftarrow", '↔' => "\\leftrightarrow",
    '↑' => "\\uparrow", '↓' => "\\downarrow",
    '↦' => "\\mapsto", '⟹' => "\\Longrightarrow", '⟸' => "\\Longleftarrow",
    // Quantifiers and calculus
    '∀' => "\\forall", '∃' => "\\exists", '∄' => "\\nexists",
    '∞' => "\\infty", '∂' => "\\partial", '∇' => "\\nabla",
    // Large operators
    '∑' => "\\sum", '∏' => "\\prod", '∐' => "\\coprod",
    '∫' => "\\int", '∬' => "\\iint", '∭' => "\\iiint", '∮' => "\\oint",
    // Dots, primes, geometry
    '…' => "\\ldots", '⋯' => "\\cdots", '⋮' => "\\vdots", '⋱' => "\\ddots",
    '′' => "'", '″' => "''", '‴' => "'''",
    '°' => "^{\\circ}",
    '⊥' => "\\perp", '∥' => "\\parallel", '∠' => "\\angle",
    '△' => "\\triangle", '□' => "\\square",
    // Letter-like symbols
    'ℝ' => "\\mathbb{R}", 'ℤ' => "\\mathbb{Z}", 'ℕ' => "\\mathbb{N}",
    'ℚ' => "\\mathbb{Q}", 'ℂ' => "\\mathbb{C}",
    'ℓ' => "\\ell", 'ℏ' => "\\hbar", '℘' => "\\wp",
    // Unicode MINUS SIGN
    '\u{2212}' => "-",
};

/// N-ary operator characters
pub(crate) static NARY_OPERATORS: phf::Map<char, &'static str> = phf::phf_map! {
    '∑' => "\\sum",
    '∏' => "\\prod",
    '∐' => "\\coprod",
    '∫' => "\\int",
    '∬' => "\\iint",
    '∭' => "\\iiint",
    '∮' => "\\oint",
    '⋃' => "\\bigcup",
    '⋂' => "\\bigcap",
    '⋁' => "\\bigvee",
    '⋀' => "\\bigwedge",
};

/// Accent characters, combining diacritics and their spacing forms
pub(crate) static ACCENTS: phf::Map<char, &'static str> = phf::phf_map! {
    '\u{0302}' => "\\hat",
    '\u{0303}' => "\\tilde",
    '\u{0304}' => "\\bar",
    '\u{0305}' => "\\overline",
    '\u{0307}' => "\\dot",
    '\u{0308}' => "\\ddot",
    '\u{030C}' => "\\check",
    '\u{0332}' => "\\underline",
    '\u{20D7}' => "\\vec",
    '\u{20D6}' => "\\overleftarrow",
    '^' => "\\hat",
    '~' => "\\tilde",
    '¯' => "\\bar",
    '→' => "\\vec",
    '˙' => "\\dot",
    '¨' => "\\ddot",
    'ˇ' => "\\check",
};

/// Delimiter characters as they must appear after `\left` / `\right`
pub(crate) static DELIMITERS: phf::Map<char, &'static str> = phf::phf_map! {
    '(' => "(", ')' => ")",
    '[' => "[", ']' => "]",
    '{' => "\\{", '}' => "\\}",
    '|' => "|", '‖' => "\\|",
    '⌊' => "\\lfloor", '⌋' => "\\rfloor",
    '⌈' => "\\lceil", '⌉' => "\\rceil",
    '⟨' => "\\langle", '⟩' => "\\rangle",
    '〈' => "\\langle", '〉' => "\\rangle",
};

/// Group characters (over/under braces)
pub(crate) static GROUP_CHARS: phf::Map<char, &'static str> = phf::phf_map! {
    '\u{23DE}' => "\\overbrace",
    '\u{23DF}' => "\\underbrace",
};

/// Function names normalized to their LaTeX control sequence
pub(crate) const FUNCTION_NAMES: &[&str] = &[
    "arcsin", "arccos", "arctan", "sinh", "cosh", "tanh", "sin", "cos", "tan", "sec", "csc",
    "cot", "ln", "log", "lg", "exp", "lim", "max", "min", "sup", "inf", "det", "dim", "gcd",
    "deg", "arg", "hom", "ker",
];

/// How a LaTeX symbol command behaves when re-emitted as MathML
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SymbolClass {
    /// Letter-like symbol (`mi`)
    Identifier,
    /// Operator, relation, arrow, punctuation (`mo`)
    Operator,
    /// Large operator that takes limits (`mo` with n-ary form)
    LargeOperator,
}

/// LaTeX symbol commands (without the backslash) and their Unicode form
pub(crate) static LATEX_SYMBOLS: phf::Map<&'static str, (&'static str, SymbolClass)> = phf::phf_map! {
    "alpha" => ("α", SymbolClass::Identifier), "beta" => ("β", SymbolClass::Identifier),
    "gamma" => ("γ", SymbolClass::Identifier), "delta" => ("δ", SymbolClass::Identifier),
    "epsilon" => ("ϵ", SymbolClass::Identifier), "varepsilon" => ("ε", SymbolClass::Identifier),
    "zeta" => ("ζ", SymbolClass::Identifier), "eta" => ("η", SymbolClass::Identifier),
    "theta" => ("θ", SymbolClass::Identifier), "vartheta" => ("ϑ", SymbolClass::Identifier),
    "iota" => ("ι", SymbolClass::Identifier), "kappa" => ("κ", SymbolClass::Identifier),
    "lambda" => ("λ", SymbolClass::Identifier), "mu" => ("μ", SymbolClass::Identifier),
    "nu" => ("ν", SymbolClass::Identifier), "xi" => ("ξ", SymbolClass::Identifier),
    "pi" => ("π", SymbolClass::Identifier), "varpi" => ("ϖ", SymbolClass::Identifier),
    "rho" => ("ρ", SymbolClass::Identifier), "varrho" => ("ϱ", SymbolClass::Identifier),
    "sigma" => ("σ", SymbolClass::Identifier), "varsigma" => ("ς", SymbolClass::Identifier),
    "tau" => ("τ", SymbolClass::Identifier), "upsilon" => ("υ", SymbolClass::Identifier),
    "phi" => ("ϕ", SymbolClass::Identifier), "varphi" => ("φ", SymbolClass::Identifier),
    "chi" => ("χ", SymbolClass::Identifier), "psi" => ("ψ", SymbolClass::Identifier),
    "omega" => ("ω", SymbolClass::Identifier),
    "Gamma" => ("Γ", SymbolClass::Identifier), "Delta" => ("Δ", SymbolClass::Identifier),
    "Theta" => ("Θ", SymbolClass::Identifier), "Lambda" => ("Λ", SymbolClass::Identifier),
    "Xi" => ("Ξ", SymbolClass::Identifier), "Pi" => ("Π", SymbolClass::Identifier),
    "Sigma" => ("Σ", SymbolClass::Identifier), "Upsilon" => ("Υ", SymbolClass::Identifier),
    "Phi" => ("Φ", SymbolClass::Identifier), "Psi" => ("Ψ", SymbolClass::Identifier),
    "Omega" => ("Ω", SymbolClass::Identifier),
    "infty" => ("∞", SymbolClass::Identifier), "partial" => ("∂", SymbolClass::Identifier),
    "nabla" => ("∇", SymbolClass::Identifier), "emptyset" => ("∅", SymbolClass::Identifier),
    "varnothing" => ("∅", SymbolClass::Identifier), "ell" => ("ℓ", SymbolClass::Identifier),
    "hbar" => ("ℏ", SymbolClass::Identifier), "wp" => ("℘", SymbolClass::Identifier),
    "angle" => ("∠", SymbolClass::Identifier), "triangle" => ("△", SymbolClass::Identifier),
    "square" => ("□", SymbolClass::Identifier), "prime" => ("′", SymbolClass::Identifier),
    "circ" => ("∘", SymbolClass::Operator),
    "times" => ("×", SymbolClass::Operator), "div" => ("÷", SymbolClass::Operator),
    "pm" => ("±", SymbolClass::Operator), "mp" => ("∓", SymbolClass::Operator),
    "cdot" => ("·", SymbolClass::Operator), "oplus" => ("⊕", SymbolClass::Operator),
    "otimes" => ("⊗", SymbolClass::Operator), "ominus" => ("⊖", SymbolClass::Operator),
    "leq" => ("≤", SymbolClass::Operator), "le" => ("≤", SymbolClass::Operator),
    "geq" => ("≥", SymbolClass::Operator), "ge" => ("≥", SymbolClass::Operator),
    "leqslant" => ("⩽", SymbolClass::Operator), "geqslant" => ("⩾", SymbolClass::Operator),
    "neq" => ("≠", SymbolClass::Operator), "ne" => ("≠", SymbolClass::Operator),
    "approx" => ("≈", SymbolClass::Operator), "equiv" => ("≡", SymbolClass::Operator),
    "sim" => ("∼", SymbolClass::Operator), "cong" => ("≅", SymbolClass::Operator),
    "ll" => ("≪", SymbolClass::Operator), "gg" => ("≫", SymbolClass::Operator),
    "prec" => ("≺", SymbolClass::Operator), "succ" => ("≻", SymbolClass::Operator),
    "preceq" => ("⪯", SymbolClass::Operator), "succeq" => ("⪰", SymbolClass::Operator),
    "propto" => ("∝", SymbolClass::Operator),
    "in" => ("∈", SymbolClass::Operator), "notin" => ("∉", SymbolClass::Operator),
    "ni" => ("∋", SymbolClass::Operator),
    "subset" => ("⊂", SymbolClass::Operator), "supset" => ("⊃", SymbolClass::Operator),
    "subseteq" => ("⊆", SymbolClass::Operator), "supseteq" => ("⊇", SymbolClass::Operator),
    "subsetneq" => ("⊊", SymbolClass::Operator), "supsetneq" => ("⊋", SymbolClass::Operator),
    "cup" => ("∪", SymbolClass::Operator), "cap" => ("∩", SymbolClass::Operator),
    "setminus" => ("∖", SymbolClass::Operator),
    "wedge" => ("∧", SymbolClass::Operator), "land" => ("∧", SymbolClass::Operator),
    "vee" => ("∨", SymbolClass::Operator), "lor" => ("∨", SymbolClass::Operator),
    "neg" => ("¬", SymbolClass::Operator), "lnot" => ("¬", SymbolClass::Operator),
    "Rightarrow" => ("⇒", SymbolClass::Operator), "Leftarrow" => ("⇐", SymbolClass::Operator),
    "Leftrightarrow" => ("⇔", SymbolClass::Operator),
    "rightarrow" => ("→", SymbolClass::Operator), "to" => ("→", SymbolClass::Operator),
    "leftarrow" => ("←", SymbolClass::Operator), "gets" => ("←", SymbolClass::Operator),
    "leftrightarrow" => ("↔", SymbolClass::Operator),
    "uparrow" => ("↑", SymbolClass::Operator), "downarrow" => ("↓", SymbolClass::Operator),
    "mapsto" => ("↦", SymbolClass::Operator),
    "Longrightarrow" => ("⟹", SymbolClass::Operator), "Longleftarrow" => ("⟸", SymbolClass::Operator),
    "iff" => ("⇔", SymbolClass::Operator), "implies" => ("⇒", SymbolClass::Operator),
    "forall" => ("∀", SymbolClass::Operator), "exists" => ("∃", SymbolClass::Operator),
    "nexists" => ("∄", SymbolClass::Operator),
    "perp" => ("⊥", SymbolClass::Operator), "parallel" => ("∥", SymbolClass::Operator),
    "mid" => ("|", SymbolClass::Operator),
    "ldots" => ("…", SymbolClass::Operator), "dots" => ("…", SymbolClass::Operator),
    "cdots" => ("⋯", SymbolClass::Operator), "vdots" => ("⋮", SymbolClass::Operator),
    "ddots" => ("⋱", SymbolClass::Operator),
    "because" => ("∵", SymbolClass::Operator), "therefore" => ("∴", SymbolClass::Operator),
    "lfloor" => ("⌊", SymbolClass::Operator), "rfloor" => ("⌋", SymbolClass::Operator),
    "lceil" => ("⌈", SymbolClass::Operator), "rceil" => ("⌉", SymbolClass::Operator),
    "langle" => ("⟨", SymbolClass::Operator), "rangle" => ("⟩", SymbolClass::Operator),
    "lbrace" => ("{", SymbolClass::Operator), "rbrace" => ("}", SymbolClass::Operator),
    "vert" => ("|", SymbolClass::Operator), "Vert" => ("‖", SymbolClass::Operator),
    "sum" => ("∑", SymbolClass::LargeOperator), "prod" => ("∏", SymbolClass::LargeOperator),
    "coprod" => ("∐", SymbolClass::LargeOperator),
    "int" => ("∫", SymbolClass::LargeOperator), "iint" => ("∬", SymbolClass::LargeOperator),
    "iiint" => ("∭", SymbolClass::LargeOperator), "oint" => ("∮", SymbolClass::LargeOperator),
    "bigcup" => ("⋃", SymbolClass::LargeOperator), "bigcap" => ("⋂", SymbolClass::LargeOperator),
    "bigvee" => ("⋁", SymbolClass::LargeOperator), "bigwedge" => ("⋀", SymbolClass::LargeOperator),
};

/// Convert Unicode math text to LaTeX, replacing known symbols
pub(crate) fn convert_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match UNICODE_TO_LATEX.get(&ch) {
            Some(cmd) => push_latex(&mut out, cmd),
            None => {
                let mut buf = [0u8; 4];
                push_latex(&mut out, ch.encode_utf8(&mut buf));
            }
        }
    }
    out
}

/// Append a LaTeX fragment, separating it from a preceding control word
/// when the fragment would otherwise extend that word (`\alpha` + `x`).
pub(crate) fn push_latex(out: &mut String, fragment: &str) {
    if fragment.is_empty() {
        return;
    }
    let starts_with_letter = fragment
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic());
    if starts_with_letter && ends_with_control_word(out) {
        out.push(' ');
    }
    out.push_str(fragment);
}

fn ends_with_control_word(s: &str) -> bool {
    let trimmed = s.trim_end_matches(|c: char| c.is_ascii_alphabetic());
    if trimmed.len() == s.len() {
        return false;
    }
    // A backslash that is itself escaped (`\\`) starts no control word
    trimmed.ends_with('\\') && !trimmed.ends_with("\\\\")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_text_maps_symbols() {
        assert_eq!(convert_text("α+β"), "\\alpha+\\beta");
        assert_eq!(convert_text("x≤y"), "x\\leq y");
        assert_eq!(convert_text("a\u{2212}b"), "a-b");
    }

    #[test]
    fn test_control_word_spacing_only_before_letters() {
        let mut out = String::from("\\pi");
        push_latex(&mut out, "r");
        assert_eq!(out, "\\pi r");

        let mut out = String::from("\\pi");
        push_latex(&mut out, "^{2}");
        assert_eq!(out, "\\pi^{2}");

        let mut out = String::from("a\\\\");
        push_latex(&mut out, "b");
        assert_eq!(out, "a\\\\b");
    }

    #[test]
    fn test_latex_symbol_lookup() {
        assert_eq!(LATEX_SYMBOLS.get("leq").map(|s| s.0), Some("≤"));
        assert_eq!(
            LATEX_SYMBOLS.get("sum").map(|s| s.1),
            Some(SymbolClass::LargeOperator)
        );
    }
}
