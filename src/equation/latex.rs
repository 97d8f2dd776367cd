//! LaTeX parser
//!
//! A recursive descent parser for the LaTeX math subset used in exam papers.
//! It produces the MathML presentation tree directly; there is no separate
//! token stream because `\text{...}` and friends read their argument raw.

use super::error::EquationError;
use super::mathml::{MathNode, MathVariant, TableKind};
use crate::document::parsing::symbols::{FUNCTION_NAMES, LATEX_SYMBOLS, SymbolClass};

const MAX_DEPTH: usize = 64;

/// Parse a LaTeX math string (without `$` delimiters) into a MathML tree
pub fn latex_to_mathml(latex: &str) -> Result<MathNode, EquationError> {
    let mut parser = Parser::new(latex);
    let nodes = parser.parse_sequence(Context::Top)?;
    match parser.peek() {
        None => Ok(MathNode::Row(nodes)),
        Some('}') => Err(EquationError::UnbalancedBraces),
        Some(other) => Err(EquationError::Unexpected(other.to_string())),
    }
}

/// What ends the sequence being parsed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Context {
    Top,
    /// `{ ... }`
    Group,
    /// `[ ... ]` of `\sqrt`
    Optional,
    /// `\left ... \right`
    Fence,
    /// A cell of an environment: ends at `&`, `\\` or `\end`
    Cell,
}

/// How a cell of an environment ended
enum CellEnd {
    Column,
    Row,
    End(String),
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
            depth: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += 1;
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    /// Look at the command name at the cursor without consuming it
    fn peek_command(&self) -> Option<String> {
        if self.peek() != Some('\\') {
            return None;
        }
        let mut name = String::new();
        let mut i = self.pos + 1;
        match self.chars.get(i) {
            Some(c) if c.is_ascii_alphabetic() => {
                while let Some(c) = self.chars.get(i).filter(|c| c.is_ascii_alphabetic()) {
                    name.push(*c);
                    i += 1;
                }
            }
            Some(c) => name.push(*c),
            None => {}
        }
        Some(name)
    }

    /// Consume `\name` at the cursor and return `name`
    fn read_command(&mut self) -> String {
        let name = self.peek_command().unwrap_or_default();
        self.pos += 1 + name.chars().count();
        name
    }

    fn enter(&mut self) -> Result<(), EquationError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(EquationError::TooDeep(MAX_DEPTH));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn at_terminator(&self, context: Context) -> bool {
        match self.peek() {
            None => true,
            Some('}') => true,
            Some(']') if context == Context::Optional => true,
            Some('&') if context == Context::Cell => true,
            Some('\\') => match self.peek_command().as_deref() {
                Some("right") => true,
                Some("end") => true,
                Some("\\") => context == Context::Cell,
                _ => false,
            },
            _ => false,
        }
    }

    /// Parse atoms with their scripts until the context's terminator
    fn parse_sequence(&mut self, context: Context) -> Result<Vec<MathNode>, EquationError> {
        self.enter()?;
        let mut nodes = Vec::new();
        loop {
            self.skip_whitespace();
            if self.at_terminator(context) {
                break;
            }
            if let Some(node) = self.parse_scripted()? {
                nodes.push(node);
            }
        }
        self.leave();

        if context != Context::Fence && self.peek_command().as_deref() == Some("right") {
            return Err(EquationError::UnexpectedRight);
        }
        if context != Context::Cell && self.peek_command().as_deref() == Some("end") {
            return Err(EquationError::Unexpected("\\end".to_string()));
        }
        Ok(nodes)
    }

    /// An atom followed by any `^`, `_` and prime scripts
    fn parse_scripted(&mut self) -> Result<Option<MathNode>, EquationError> {
        let base = match self.peek() {
            Some('^' | '_') => Some(MathNode::Row(Vec::new())),
            _ => self.parse_atom()?,
        };
        let Some(base) = base else {
            return Ok(None);
        };

        let mut sub: Option<MathNode> = None;
        let mut sup: Option<Vec<MathNode>> = None;
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some('^') if sup.as_ref().is_none_or(|s| s.iter().all(is_prime)) => {
                    self.bump();
                    let arg = self.parse_argument("^")?;
                    sup.get_or_insert_with(Vec::new).push(arg);
                }
                Some('_') if sub.is_none() => {
                    self.bump();
                    sub = Some(self.parse_argument("_")?);
                }
                Some('\'') => {
                    self.bump();
                    sup.get_or_insert_with(Vec::new)
                        .push(MathNode::Operator("′".to_string()));
                }
                _ => break,
            }
        }

        let sup = sup.map(|mut items| {
            if items.len() == 1 {
                items.remove(0)
            } else {
                MathNode::Row(items)
            }
        });
        let base = Box::new(base);
        Ok(Some(match (sub, sup) {
            (None, None) => *base,
            (Some(sub), None) => MathNode::Sub {
                base,
                sub: Box::new(sub),
            },
            (None, Some(sup)) => MathNode::Sup {
                base,
                sup: Box::new(sup),
            },
            (Some(sub), Some(sup)) => MathNode::SubSup {
                base,
                sub: Box::new(sub),
                sup: Box::new(sup),
            },
        }))
    }

    /// Argument of a command or script: a group, or one single token
    fn parse_argument(&mut self, owner: &str) -> Result<MathNode, EquationError> {
        self.skip_whitespace();
        match self.peek() {
            None | Some('}' | '&' | '^' | '_') => {
                Err(EquationError::MissingArgument(owner.to_string()))
            }
            Some('{') => self.parse_group(),
            Some(c) if c.is_ascii_digit() => {
                self.bump();
                Ok(MathNode::Number(c.to_string()))
            }
            Some(_) => self
                .parse_atom()?
                .ok_or_else(|| EquationError::MissingArgument(owner.to_string())),
        }
    }

    fn parse_group(&mut self) -> Result<MathNode, EquationError> {
        // Opening brace
        self.bump();
        let nodes = self.parse_sequence(Context::Group)?;
        if self.bump() != Some('}') {
            return Err(EquationError::UnbalancedBraces);
        }
        Ok(MathNode::Row(nodes))
    }

    /// Raw text of a `{...}` argument, braces balanced
    fn parse_raw_group(&mut self, owner: &str) -> Result<String, EquationError> {
        self.skip_whitespace();
        if self.peek() != Some('{') {
            return Err(EquationError::MissingArgument(owner.to_string()));
        }
        self.bump();
        let mut depth = 1;
        let mut text = String::new();
        while let Some(ch) = self.bump() {
            match ch {
                '\\' => {
                    // Escaped characters stand for themselves
                    if let Some(next) = self.bump() {
                        if "{}%$&#_ ".contains(next) {
                            text.push(next);
                        } else {
                            text.push('\\');
                            text.push(next);
                        }
                    }
                }
                '{' => {
                    depth += 1;
                    text.push(ch);
                }
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(text);
                    }
                    text.push(ch);
                }
                _ => text.push(ch),
            }
        }
        Err(EquationError::UnbalancedBraces)
    }

    /// One atom without scripts; `None` for commands that produce nothing
    fn parse_atom(&mut self) -> Result<Option<MathNode>, EquationError> {
        let Some(ch) = self.peek() else {
            return Ok(None);
        };
        match ch {
            '{' => self.parse_group().map(Some),
            '\\' => self.parse_command(),
            c if c.is_ascii_digit() || (c == '.' && self.peek_at(1).is_some_and(|d| d.is_ascii_digit())) => {
                let mut number = String::new();
                while let Some(d) = self.peek() {
                    let continues_decimal =
                        d == '.' && self.peek_at(1).is_some_and(|n| n.is_ascii_digit());
                    if d.is_ascii_digit() || continues_decimal {
                        number.push(d);
                        self.pos += 1;
                    } else {
                        break;
                    }
                }
                Ok(Some(MathNode::Number(number)))
            }
            '~' => {
                self.bump();
                Ok(Some(MathNode::Space(0.333)))
            }
            '-' => {
                self.bump();
                Ok(Some(MathNode::Operator("−".to_string())))
            }
            '*' => {
                self.bump();
                Ok(Some(MathNode::Operator("∗".to_string())))
            }
            '&' | '#' | '%' | '$' => Err(EquationError::Unexpected(ch.to_string())),
            c if c.is_alphabetic() => {
                self.bump();
                Ok(Some(MathNode::Ident(c.to_string())))
            }
            c => {
                self.bump();
                Ok(Some(MathNode::Operator(c.to_string())))
            }
        }
    }

    fn parse_command(&mut self) -> Result<Option<MathNode>, EquationError> {
        let name = self.read_command();
        let node = match name.as_str() {
            "" => return Err(EquationError::Unexpected("\\".to_string())),
            "frac" | "dfrac" | "tfrac" | "cfrac" => {
                let num = self.parse_argument(&name)?;
                let den = self.parse_argument(&name)?;
                MathNode::Frac {
                    num: Box::new(num),
                    den: Box::new(den),
                    bar: true,
                }
            }
            "binom" | "dbinom" | "tbinom" => {
                let top = self.parse_argument(&name)?;
                let bottom = self.parse_argument(&name)?;
                MathNode::Fenced {
                    open: "(".to_string(),
                    close: ")".to_string(),
                    body: Box::new(MathNode::Frac {
                        num: Box::new(top),
                        den: Box::new(bottom),
                        bar: false,
                    }),
                }
            }
            "sqrt" => {
                self.skip_whitespace();
                let index = if self.peek() == Some('[') {
                    self.bump();
                    let index = self.parse_sequence(Context::Optional)?;
                    if self.bump() != Some(']') {
                        return Err(EquationError::MissingArgument("\\sqrt[".to_string()));
                    }
                    Some(index)
                } else {
                    None
                };
                let base = Box::new(self.parse_argument(&name)?);
                match index {
                    Some(index) if !index.is_empty() => MathNode::Root {
                        base,
                        index: Box::new(MathNode::Row(index)),
                    },
                    _ => MathNode::Sqrt(base),
                }
            }
            "left" => self.parse_fence()?,
            "right" => return Err(EquationError::UnexpectedRight),
            "begin" => self.parse_environment()?,
            "end" => return Err(EquationError::Unexpected("\\end".to_string())),
            "text" | "textrm" | "textnormal" | "mbox" | "textit" => {
                MathNode::Text(self.parse_raw_group(&name)?)
            }
            "textbf" => MathNode::Style {
                variant: MathVariant::Bold,
                body: Box::new(MathNode::Text(self.parse_raw_group(&name)?)),
            },
            "operatorname" => MathNode::Ident(self.parse_raw_group(&name)?.trim().to_string()),
            "mathrm" | "mathit" | "mathbf" | "mathbb" | "mathcal" | "mathscr" | "mathfrak"
            | "mathsf" | "mathtt" | "boldsymbol" | "bm" => {
                let variant = match name.as_str() {
                    "mathrm" => MathVariant::Normal,
                    "mathit" => MathVariant::Italic,
                    "mathbf" => MathVariant::Bold,
                    "mathbb" => MathVariant::DoubleStruck,
                    "mathcal" | "mathscr" => MathVariant::Script,
                    "mathfrak" => MathVariant::Fraktur,
                    "mathsf" => MathVariant::SansSerif,
                    "mathtt" => MathVariant::Monospace,
                    _ => MathVariant::BoldItalic,
                };
                MathNode::Style {
                    variant,
                    body: Box::new(self.parse_argument(&name)?),
                }
            }
            "hat" | "widehat" | "tilde" | "widetilde" | "bar" | "vec" | "dot" | "ddot"
            | "check" | "breve" | "acute" | "grave" | "overrightarrow" | "overleftarrow" => {
                let accent = match name.as_str() {
                    "hat" | "widehat" => "^",
                    "tilde" | "widetilde" => "~",
                    "bar" => "¯",
                    "vec" | "overrightarrow" => "→",
                    "overleftarrow" => "←",
                    "dot" => "˙",
                    "ddot" => "¨",
                    "check" => "ˇ",
                    "breve" => "˘",
                    "acute" => "´",
                    _ => "`",
                };
                MathNode::Over {
                    base: Box::new(self.parse_argument(&name)?),
                    over: Box::new(MathNode::Operator(accent.to_string())),
                    accent: true,
                }
            }
            "overline" => MathNode::Over {
                base: Box::new(self.parse_argument(&name)?),
                over: Box::new(MathNode::Operator("‾".to_string())),
                accent: false,
            },
            "underline" => MathNode::Under {
                base: Box::new(self.parse_argument(&name)?),
                under: Box::new(MathNode::Operator("_".to_string())),
            },
            "overbrace" => MathNode::Over {
                base: Box::new(self.parse_argument(&name)?),
                over: Box::new(MathNode::Operator("⏞".to_string())),
                accent: false,
            },
            "underbrace" => MathNode::Under {
                base: Box::new(self.parse_argument(&name)?),
                under: Box::new(MathNode::Operator("⏟".to_string())),
            },
            "," | "thinspace" => MathNode::Space(0.167),
            ":" | ">" | "medspace" => MathNode::Space(0.222),
            ";" | "thickspace" => MathNode::Space(0.278),
            " " => MathNode::Space(0.333),
            "quad" => MathNode::Space(1.0),
            "qquad" => MathNode::Space(2.0),
            "!" | "negthinspace" => return Ok(None),
            "displaystyle" | "textstyle" | "scriptstyle" | "limits" | "nolimits" | "big"
            | "Big" | "bigg" | "Bigg" | "bigl" | "bigr" | "Bigl" | "Bigr" => return Ok(None),
            "\\" => return Ok(None),
            "{" | "}" | "|" | "%" | "$" | "#" | "&" | "_" => {
                let text = match name.as_str() {
                    "|" => "‖",
                    other => other,
                };
                MathNode::Operator(text.to_string())
            }
            "not" => {
                self.skip_whitespace();
                let negated = match self.parse_atom()? {
                    Some(MathNode::Operator(op)) if op == "=" => "≠".to_string(),
                    Some(MathNode::Operator(op)) if op == "∈" => "∉".to_string(),
                    Some(node) => format!("{}\u{0338}", node.token_text().unwrap_or_default()),
                    None => return Err(EquationError::MissingArgument("\\not".to_string())),
                };
                MathNode::Operator(negated)
            }
            other if FUNCTION_NAMES.contains(&other) => MathNode::Ident(other.to_string()),
            other => match LATEX_SYMBOLS.get(other) {
                Some((symbol, SymbolClass::Identifier)) => MathNode::Ident(symbol.to_string()),
                Some((symbol, _)) => MathNode::Operator(symbol.to_string()),
                None => return Err(EquationError::UnknownCommand(other.to_string())),
            },
        };
        Ok(Some(node))
    }

    /// Delimiter after `\left` / `\right`; `.` is the empty delimiter
    fn parse_delimiter(&mut self, owner: &str) -> Result<String, EquationError> {
        self.skip_whitespace();
        match self.peek() {
            None => Err(EquationError::MissingArgument(owner.to_string())),
            Some('\\') => {
                let name = self.read_command();
                let delim = match name.as_str() {
                    "{" | "lbrace" => "{",
                    "}" | "rbrace" => "}",
                    "|" | "Vert" => "‖",
                    "vert" => "|",
                    "langle" => "⟨",
                    "rangle" => "⟩",
                    "lfloor" => "⌊",
                    "rfloor" => "⌋",
                    "lceil" => "⌈",
                    "rceil" => "⌉",
                    _ => return Err(EquationError::UnknownCommand(name)),
                };
                Ok(delim.to_string())
            }
            Some('.') => {
                self.bump();
                Ok(String::new())
            }
            Some(c) => {
                self.bump();
                Ok(c.to_string())
            }
        }
    }

    fn parse_fence(&mut self) -> Result<MathNode, EquationError> {
        let open = self.parse_delimiter("\\left")?;
        let body = self.parse_sequence(Context::Fence)?;
        if self.peek_command().as_deref() != Some("right") {
            return Err(EquationError::MissingRight);
        }
        self.read_command();
        let close = self.parse_delimiter("\\right")?;
        Ok(MathNode::Fenced {
            open,
            close,
            body: Box::new(MathNode::Row(body)),
        })
    }

    fn parse_environment(&mut self) -> Result<MathNode, EquationError> {
        let name = self.parse_raw_group("\\begin")?.trim().to_string();
        let (kind, open, close) = match name.as_str() {
            "matrix" | "smallmatrix" => (TableKind::Matrix, "", ""),
            "pmatrix" => (TableKind::Matrix, "(", ")"),
            "bmatrix" => (TableKind::Matrix, "[", "]"),
            "Bmatrix" => (TableKind::Matrix, "{", "}"),
            "vmatrix" => (TableKind::Matrix, "|", "|"),
            "Vmatrix" => (TableKind::Matrix, "‖", "‖"),
            "cases" => (TableKind::Cases, "{", ""),
            "aligned" | "align" | "align*" | "gathered" | "gather" | "gather*" | "split"
            | "array" | "eqnarray" | "eqnarray*" => (TableKind::Aligned, "", ""),
            _ => return Err(EquationError::UnknownEnvironment(name)),
        };
        if name == "array" {
            // Column specification
            self.parse_raw_group("array")?;
        }

        self.enter()?;
        let mut rows: Vec<Vec<MathNode>> = Vec::new();
        let mut row: Vec<MathNode> = Vec::new();
        loop {
            let cell = self.parse_sequence(Context::Cell)?;
            row.push(MathNode::Row(cell));
            match self.cell_end()? {
                CellEnd::Column => {}
                CellEnd::Row => rows.push(std::mem::take(&mut row)),
                CellEnd::End(found) => {
                    if found != name {
                        return Err(EquationError::MismatchedEnvironment {
                            expected: name,
                            found,
                        });
                    }
                    // A trailing `\\` leaves one empty cell behind
                    let trailing_empty = row.len() == 1 && row[0].is_empty_row();
                    if !trailing_empty {
                        rows.push(row);
                    }
                    break;
                }
            }
        }
        self.leave();

        let table = MathNode::Table { kind, rows };
        if open.is_empty() && close.is_empty() {
            return Ok(table);
        }
        Ok(MathNode::Fenced {
            open: open.to_string(),
            close: close.to_string(),
            body: Box::new(table),
        })
    }

    fn cell_end(&mut self) -> Result<CellEnd, EquationError> {
        match self.peek() {
            Some('&') => {
                self.bump();
                Ok(CellEnd::Column)
            }
            Some('\\') => match self.read_command().as_str() {
                "\\" => {
                    // Optional spacing argument: `\\[2pt]`
                    self.skip_whitespace();
                    if self.peek() == Some('[') {
                        while let Some(ch) = self.bump() {
                            if ch == ']' {
                                break;
                            }
                        }
                    }
                    Ok(CellEnd::Row)
                }
                "end" => Ok(CellEnd::End(self.parse_raw_group("\\end")?.trim().to_string())),
                "right" => Err(EquationError::UnexpectedRight),
                other => Err(EquationError::Unexpected(format!("\\{other}"))),
            },
            Some('}') => Err(EquationError::UnbalancedBraces),
            _ => Err(EquationError::Unexpected("end of input inside environment".to_string())),
        }
    }
}

fn is_prime(node: &MathNode) -> bool {
    matches!(node, MathNode::Operator(op) if op == "′")
}
