//! The boolean scripting front-end.
//!
//! A script is a sequence of assignments over boolean expressions:
//!
//! ```text
//! # half adder
//! title = "half adder"
//! s = input.a ^ input.b
//! output.sum = s
//! output.carry = input.a * input.b
//! ```
//!
//! Reading `input.<name>` declares a fresh variable on first use (variables
//! are ordered by first appearance) and reuses it afterwards; the `input`
//! table is read-only. `output.<name> = ...` declares a named root to
//! report. Operators, strongest first: `!` (not), `*` (and), `^` (xor),
//! `+` (or); `0` and `1` are the constants. Statements end at a newline or
//! `;`, comments run from `#` to the end of the line.
//!
//! Parsing records straight into a [`Builder`]; nothing here touches the
//! manager, the output is a [`Program`] for the decoder.

use std::collections::HashMap;
use std::fmt::{Display, Formatter};

use log::debug;

use crate::program::{Builder, Program};

/// Error produced while parsing a script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptError {
    pub line: usize,
    pub message: String,
}

impl ScriptError {
    fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

impl Display for ScriptError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "script error at line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for ScriptError {}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    Str(String),
    Const(bool),
    Dot,
    Assign,
    Or,
    Xor,
    And,
    Not,
    LParen,
    RParen,
    /// Statement separator: newline or `;`.
    End,
}

fn tokenize(source: &str) -> Result<Vec<(Token, usize)>, ScriptError> {
    let mut tokens = Vec::new();
    for (index, line) in source.lines().enumerate() {
        let line_no = index + 1;
        let mut chars = line.chars().peekable();
        while let Some(&c) = chars.peek() {
            match c {
                '#' => break,
                c if c.is_whitespace() => {
                    chars.next();
                }
                ';' => {
                    chars.next();
                    tokens.push((Token::End, line_no));
                }
                '.' | '=' | '+' | '^' | '*' | '!' | '(' | ')' => {
                    chars.next();
                    let token = match c {
                        '.' => Token::Dot,
                        '=' => Token::Assign,
                        '+' => Token::Or,
                        '^' => Token::Xor,
                        '*' => Token::And,
                        '!' => Token::Not,
                        '(' => Token::LParen,
                        _ => Token::RParen,
                    };
                    tokens.push((token, line_no));
                }
                '"' => {
                    chars.next();
                    let mut value = String::new();
                    loop {
                        match chars.next() {
                            Some('"') => break,
                            Some(c) => value.push(c),
                            None => {
                                return Err(ScriptError::new(line_no, "unterminated string"))
                            }
                        }
                    }
                    tokens.push((Token::Str(value), line_no));
                }
                c if c.is_ascii_digit() => {
                    let mut digits = String::new();
                    while let Some(&d) = chars.peek() {
                        if d.is_ascii_digit() {
                            digits.push(d);
                            chars.next();
                        } else {
                            break;
                        }
                    }
                    let token = match digits.as_str() {
                        "0" => Token::Const(false),
                        "1" => Token::Const(true),
                        _ => {
                            return Err(ScriptError::new(
                                line_no,
                                format!("unexpected number `{}` (only 0 and 1 exist)", digits),
                            ))
                        }
                    };
                    tokens.push((token, line_no));
                }
                c if c.is_ascii_alphabetic() || c == '_' => {
                    let mut name = String::new();
                    while let Some(&d) = chars.peek() {
                        if d.is_ascii_alphanumeric() || d == '_' {
                            name.push(d);
                            chars.next();
                        } else {
                            break;
                        }
                    }
                    tokens.push((Token::Ident(name), line_no));
                }
                c => {
                    return Err(ScriptError::new(
                        line_no,
                        format!("unexpected character `{}`", c),
                    ))
                }
            }
        }
        tokens.push((Token::End, line_no));
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
    builder: Builder,
    scope: HashMap<String, usize>,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map_or(1, |(_, line)| *line)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(t, _)| t.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn error(&self, message: impl Into<String>) -> ScriptError {
        ScriptError::new(self.line(), message)
    }

    fn expect(&mut self, token: Token, what: &str) -> Result<(), ScriptError> {
        if self.peek() == Some(&token) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(format!("expected {}", what)))
        }
    }

    fn expect_ident(&mut self, what: &str) -> Result<String, ScriptError> {
        match self.peek() {
            Some(Token::Ident(_)) => {
                let Some(Token::Ident(name)) = self.advance() else {
                    unreachable!()
                };
                Ok(name)
            }
            _ => Err(self.error(format!("expected {}", what))),
        }
    }

    fn parse(mut self) -> Result<Program, ScriptError> {
        loop {
            while self.peek() == Some(&Token::End) {
                self.pos += 1;
            }
            if self.peek().is_none() {
                break;
            }
            self.statement()?;
            match self.peek() {
                Some(Token::End) | None => {}
                _ => return Err(self.error("expected end of statement")),
            }
        }
        Ok(self.builder.finish())
    }

    fn statement(&mut self) -> Result<(), ScriptError> {
        let name = self.expect_ident("a name to assign")?;
        match name.as_str() {
            "title" => {
                self.expect(Token::Assign, "`=` after `title`")?;
                match self.advance() {
                    Some(Token::Str(title)) => {
                        self.builder.set_title(&title);
                        Ok(())
                    }
                    _ => Err(self.error("expected a quoted string")),
                }
            }
            "output" => {
                self.expect(Token::Dot, "`.` after `output`")?;
                let name = self.expect_ident("an output name")?;
                self.expect(Token::Assign, "`=`")?;
                let id = self.expr()?;
                self.builder.set_output(&name, id);
                Ok(())
            }
            "input" => Err(self.error("the input table is read-only")),
            _ => {
                self.expect(Token::Assign, "`=`")?;
                let id = self.expr()?;
                self.scope.insert(name, id);
                Ok(())
            }
        }
    }

    fn expr(&mut self) -> Result<usize, ScriptError> {
        let mut id = self.xor_expr()?;
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            let rhs = self.xor_expr()?;
            id = self.builder.or(id, rhs);
        }
        Ok(id)
    }

    fn xor_expr(&mut self) -> Result<usize, ScriptError> {
        let mut id = self.and_expr()?;
        while self.peek() == Some(&Token::Xor) {
            self.pos += 1;
            let rhs = self.and_expr()?;
            id = self.builder.xor(id, rhs);
        }
        Ok(id)
    }

    fn and_expr(&mut self) -> Result<usize, ScriptError> {
        let mut id = self.unary()?;
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            let rhs = self.unary()?;
            id = self.builder.and(id, rhs);
        }
        Ok(id)
    }

    fn unary(&mut self) -> Result<usize, ScriptError> {
        if self.peek() == Some(&Token::Not) {
            self.pos += 1;
            let id = self.unary()?;
            return Ok(self.builder.not(id));
        }
        self.atom()
    }

    fn atom(&mut self) -> Result<usize, ScriptError> {
        let line = self.line();
        match self.advance() {
            Some(Token::LParen) => {
                let id = self.expr()?;
                self.expect(Token::RParen, "`)`")?;
                Ok(id)
            }
            Some(Token::Const(false)) => Ok(Builder::FALSE_ID),
            Some(Token::Const(true)) => Ok(Builder::TRUE_ID),
            Some(Token::Ident(name)) if name == "input" => {
                self.expect(Token::Dot, "`.` after `input`")?;
                let name = self.expect_ident("an input name")?;
                Ok(self.builder.input(&name))
            }
            Some(Token::Ident(name)) => self
                .scope
                .get(&name)
                .copied()
                .ok_or_else(|| ScriptError::new(line, format!("unknown name `{}`", name))),
            _ => Err(ScriptError::new(line, "expected an operand")),
        }
    }
}

/// Parse a script into a recorded [`Program`].
pub fn parse_script(source: &str) -> Result<Program, ScriptError> {
    let parser = Parser {
        tokens: tokenize(source)?,
        pos: 0,
        builder: Builder::new(),
        scope: HashMap::new(),
    };
    let program = parser.parse()?;
    debug!(
        "script: {} instructions, {} inputs, {} roots",
        program.instrs.len(),
        program.num_inputs(),
        program.roots.len()
    );
    Ok(program)
}
