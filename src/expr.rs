//! The embedded expression language and its resolution pass.
//!
//! Expressions appear only in the trailing numeric field of `D`, `TIME`,
//! `RAMP`, `L` and `FILL`. The grammar is deliberately tiny:
//!
//! - integer literal
//! - identifier — a bound variable, else a label (yields its start)
//! - `-identifier` — the label's end (a notation, not negation)
//! - `&identifier` — the label's span, end minus start
//! - `a/b` — truncating integer division, left-to-right
//!
//! Anything else is fatal, naming the unsupported construct.

use std::collections::HashMap;

use crate::command::{Command, CommandKind, Program};
use crate::error::CompileError;
use crate::labels::Label;

/// Variable bindings consulted before the label map. Only `duration` is
/// ever bound, when a subroutine is expanded into a label's span.
pub type Definitions = HashMap<String, i64>;

/// Label titles available to expressions.
pub type LabelMap = HashMap<String, Label>;

/// Resolve every expression field in the program to an integer literal.
///
/// Fields that already are bare integer literals are left untouched, so a
/// program without expression constructs re-emits byte-identically.
pub fn resolve_program(
    program: Program,
    labels: &LabelMap,
    definitions: &Definitions,
) -> Result<Program, CompileError> {
    program
        .into_iter()
        .map(|cmd| resolve_command(cmd, labels, definitions))
        .collect()
}

fn resolve_command(
    cmd: Command,
    labels: &LabelMap,
    definitions: &Definitions,
) -> Result<Command, CompileError> {
    let Command {
        kind,
        line,
        verbatim,
    } = cmd;
    let rebuild = |kind: CommandKind, verbatim: Option<String>| Command {
        kind,
        line,
        verbatim,
    };
    match kind {
        CommandKind::Delay { arg } => match resolve_field(&arg, labels, definitions, line)? {
            Some(value) => Ok(rebuild(CommandKind::Delay { arg: value }, None)),
            None => Ok(rebuild(CommandKind::Delay { arg }, verbatim)),
        },
        CommandKind::Time { arg } => match resolve_field(&arg, labels, definitions, line)? {
            Some(value) => Ok(rebuild(CommandKind::Time { arg: value }, None)),
            None => Ok(rebuild(CommandKind::Time { arg }, verbatim)),
        },
        CommandKind::Ramp { args } => {
            let Some(last) = args.last() else {
                return Ok(rebuild(CommandKind::Ramp { args }, verbatim));
            };
            match resolve_field(last, labels, definitions, line)? {
                Some(value) => {
                    let mut args = args;
                    if let Some(slot) = args.last_mut() {
                        *slot = value;
                    }
                    Ok(rebuild(CommandKind::Ramp { args }, None))
                }
                None => Ok(rebuild(CommandKind::Ramp { args }, verbatim)),
            }
        }
        CommandKind::Loop {
            count,
            body,
            terminator,
        } => {
            let body = resolve_program(body, labels, definitions)?;
            match resolve_field(&count, labels, definitions, line)? {
                Some(value) => Ok(rebuild(
                    CommandKind::Loop {
                        count: value,
                        body,
                        terminator,
                    },
                    None,
                )),
                None => Ok(rebuild(
                    CommandKind::Loop {
                        count,
                        body,
                        terminator,
                    },
                    verbatim,
                )),
            }
        }
        CommandKind::Fill {
            arg,
            body,
            terminator,
        } => {
            let body = resolve_program(body, labels, definitions)?;
            match resolve_field(&arg, labels, definitions, line)? {
                Some(value) => Ok(rebuild(
                    CommandKind::Fill {
                        arg: value,
                        body,
                        terminator,
                    },
                    None,
                )),
                None => Ok(rebuild(
                    CommandKind::Fill {
                        arg,
                        body,
                        terminator,
                    },
                    verbatim,
                )),
            }
        }
        CommandKind::ClubGroup {
            clubs,
            body,
            terminator,
        } => {
            let body = resolve_program(body, labels, definitions)?;
            Ok(rebuild(
                CommandKind::ClubGroup {
                    clubs,
                    body,
                    terminator,
                },
                verbatim,
            ))
        }
        other => Ok(rebuild(other, verbatim)),
    }
}

/// Evaluate one expression field. Returns `None` when the field is already
/// a plain integer literal and needs no rewrite.
fn resolve_field(
    field: &str,
    labels: &LabelMap,
    definitions: &Definitions,
    line: Option<usize>,
) -> Result<Option<String>, CompileError> {
    if is_integer_literal(field) {
        return Ok(None);
    }
    let value = evaluate(field, labels, definitions, line)?;
    Ok(Some(value.to_string()))
}

fn is_integer_literal(field: &str) -> bool {
    let trimmed = field.trim_matches([' ', '\t']);
    !trimmed.is_empty() && trimmed.bytes().all(|b| b.is_ascii_digit())
}

/// Evaluate an expression string to ticks.
pub fn evaluate(
    source: &str,
    labels: &LabelMap,
    definitions: &Definitions,
    line: Option<usize>,
) -> Result<i64, CompileError> {
    let tokens = tokenize(source, line)?;
    let mut parser = ExprParser {
        source,
        tokens,
        pos: 0,
        labels,
        definitions,
        line,
    };
    let value = parser.expression()?;
    if parser.pos != parser.tokens.len() {
        return Err(parser.cannot_interpret());
    }
    Ok(value)
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Int(i64),
    Ident(String),
    Minus,
    Amp,
    Slash,
}

fn tokenize(source: &str, line: Option<usize>) -> Result<Vec<Token>, CompileError> {
    let mut tokens = Vec::new();
    let mut chars = source.chars().peekable();
    while let Some(&ch) = chars.peek() {
        match ch {
            ' ' | '\t' => {
                chars.next();
            }
            '-' => {
                chars.next();
                tokens.push(Token::Minus);
            }
            '&' => {
                chars.next();
                tokens.push(Token::Amp);
            }
            '/' => {
                chars.next();
                tokens.push(Token::Slash);
            }
            '0'..='9' => {
                let mut digits = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() {
                        digits.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let value = digits.parse().map_err(|_| {
                    CompileError::syntax(format!("Cannot parse number `{digits}`"), line)
                })?;
                tokens.push(Token::Int(value));
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut name = String::new();
                while let Some(&a) = chars.peek() {
                    if a.is_alphanumeric() || a == '_' {
                        name.push(a);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(name));
            }
            _ => {
                return Err(CompileError::semantic(
                    format!("Cannot interpret expression `{source}`"),
                    line,
                ));
            }
        }
    }
    Ok(tokens)
}

struct ExprParser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    labels: &'a LabelMap,
    definitions: &'a Definitions,
    line: Option<usize>,
}

impl ExprParser<'_> {
    /// `expr := term ('/' term)*`, folding left so division is
    /// left-associative and truncating at every step.
    fn expression(&mut self) -> Result<i64, CompileError> {
        let mut value = self.term()?;
        while self.peek() == Some(&Token::Slash) {
            self.pos += 1;
            let divisor = self.term()?;
            if divisor == 0 {
                return Err(CompileError::semantic(
                    format!("Division by zero in `{}`", self.source),
                    self.line,
                ));
            }
            value /= divisor;
        }
        Ok(value)
    }

    fn term(&mut self) -> Result<i64, CompileError> {
        let token = self.peek().cloned().ok_or_else(|| self.cannot_interpret())?;
        self.pos += 1;
        match token {
            Token::Int(value) => Ok(value),
            Token::Ident(name) => {
                if let Some(&value) = self.definitions.get(&name) {
                    return Ok(value);
                }
                Ok(self.label(&name)?.start)
            }
            Token::Minus => {
                let name = self.ident()?;
                Ok(self.label(&name)?.end)
            }
            Token::Amp => {
                let name = self.ident()?;
                Ok(self.label(&name)?.span())
            }
            Token::Slash => Err(self.cannot_interpret()),
        }
    }

    fn ident(&mut self) -> Result<String, CompileError> {
        match self.peek().cloned() {
            Some(Token::Ident(name)) => {
                self.pos += 1;
                Ok(name)
            }
            _ => Err(self.cannot_interpret()),
        }
    }

    fn label(&self, name: &str) -> Result<&Label, CompileError> {
        self.labels.get(name).ok_or_else(|| {
            CompileError::reference(format!("Unknown label `{name}`"), self.line)
        })
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn cannot_interpret(&self) -> CompileError {
        CompileError::semantic(
            format!("Cannot interpret expression `{}`", self.source),
            self.line,
        )
    }
}
