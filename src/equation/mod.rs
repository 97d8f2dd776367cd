//! LaTeX to Office Math conversion
//!
//! The export path turns LaTeX blocks back into native Word equations:
//! LaTeX is parsed into a MathML presentation tree ([`latex_to_mathml`]),
//! which is then written out as OMML ([`mathml_to_omml`]). Parsing is the
//! only fallible step.

pub mod error;
pub mod latex;
pub mod mathml;
pub mod omml_writer;

pub use error::EquationError;
pub use latex::latex_to_mathml;
pub use mathml::{MathNode, MathVariant, TableKind, parse_mathml, to_mathml};
pub use omml_writer::mathml_to_omml;

use crate::document::parsing::xml::XmlElement;

/// Convert LaTeX (without `$` delimiters) into an `m:oMath` element
pub fn latex_to_omml(latex: &str) -> Result<XmlElement, EquationError> {
    let tree = latex_to_mathml(latex.trim())?;
    Ok(mathml_to_omml(&tree))
}

/// Convert a MathML document into an `m:oMath` element
pub fn mathml_str_to_omml(mathml: &str) -> Result<XmlElement, EquationError> {
    let tree = parse_mathml(mathml)?;
    Ok(mathml_to_omml(&tree))
}
