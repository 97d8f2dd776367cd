//! Errors of the LaTeX → OMML path
//!
//! Every variant means "unconvertible": the exporter renders the source
//! LaTeX as styled text instead.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EquationError {
    #[error("unknown command \\{0}")]
    UnknownCommand(String),

    #[error("unknown environment {0}")]
    UnknownEnvironment(String),

    #[error("unbalanced braces")]
    UnbalancedBraces,

    #[error("missing argument for {0}")]
    MissingArgument(String),

    #[error("\\left without matching \\right")]
    MissingRight,

    #[error("\\right without matching \\left")]
    UnexpectedRight,

    #[error("\\begin{{{expected}}} closed by \\end{{{found}}}")]
    MismatchedEnvironment { expected: String, found: String },

    #[error("unexpected {0}")]
    Unexpected(String),

    #[error("expression nested deeper than {0} levels")]
    TooDeep(usize),

    #[error("invalid MathML: {0}")]
    Mathml(String),
}
