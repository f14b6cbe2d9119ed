//! Command tree for .glo scripts.
//!
//! Commands are immutable values: passes rebuild nodes instead of mutating
//! them. A command that was parsed from source keeps its verbatim line so
//! that untouched programs re-emit byte-identically; any rewrite drops the
//! verbatim text in favor of canonical re-serialization.

use crate::error::CompileError;

/// An ordered sequence of top-level commands. Block bodies make it a tree.
pub type Program = Vec<Command>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub kind: CommandKind,
    /// 0-based source line; `None` for synthesized commands.
    pub line: Option<usize>,
    /// The original source line, kept only while the command is unrewritten.
    pub verbatim: Option<String>,
}

/// One arm per command kind, holding only its legal fields.
///
/// Fields stay raw strings until a pass resolves them; only the block kinds
/// (`Loop`, `ClubGroup`, `Fill`) carry a body and a verbatim terminator line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandKind {
    /// `D,<expr>`
    Delay { arg: String },
    /// `C,<color>` or `C,<r>,<g>,<b>`
    SetColor { args: Vec<String> },
    /// `RAMP,<color>,<expr>` or `RAMP,<r>,<g>,<b>,<expr>`
    Ramp { args: Vec<String> },
    /// `COLOR,<name>,<r>,<g>,<b>` or `COLOR,<name>,<colorRef>`
    ColorDef { name: String, args: Vec<String> },
    /// `TIME,<expr>`
    Time { arg: String },
    /// `L,<count> ... E`
    Loop {
        count: String,
        body: Program,
        terminator: String,
    },
    /// `CLUBS,<id>[,<id>...] ... E`
    ClubGroup {
        clubs: Vec<String>,
        body: Program,
        terminator: String,
    },
    /// `FILL,<expr> ... E`
    Fill {
        arg: String,
        body: Program,
        terminator: String,
    },
    /// `DEFSUB,<name>`
    SubDef { name: String },
    /// `ENDSUB`
    SubEnd,
    /// `END`
    End,
    /// Blank line, comment-only line, or a player command this compiler does
    /// not transform. Passed through verbatim with duration 0.
    Raw,
}

impl Command {
    /// A command parsed from a source line.
    pub fn parsed(kind: CommandKind, line: usize, verbatim: impl Into<String>) -> Self {
        Self {
            kind,
            line: Some(line),
            verbatim: Some(verbatim.into()),
        }
    }

    /// A command synthesized by a pass; carries no source line.
    pub fn synthesized(kind: CommandKind) -> Self {
        Self {
            kind,
            line: None,
            verbatim: None,
        }
    }

    /// A rewritten copy: same source line, canonical text from now on.
    pub fn rewritten(&self, kind: CommandKind) -> Self {
        Self {
            kind,
            line: self.line,
            verbatim: None,
        }
    }

    /// The text to print for this command's own line (not its body).
    pub fn text(&self) -> String {
        match &self.verbatim {
            Some(v) => v.clone(),
            None => self.canonical_text(),
        }
    }

    fn canonical_text(&self) -> String {
        match &self.kind {
            CommandKind::Delay { arg } => format!("D,{arg}"),
            CommandKind::SetColor { args } => format!("C,{}", args.join(",")),
            CommandKind::Ramp { args } => format!("RAMP,{}", args.join(",")),
            CommandKind::ColorDef { name, args } => {
                format!("COLOR,{name},{}", args.join(","))
            }
            CommandKind::Time { arg } => format!("TIME,{arg}"),
            CommandKind::Loop { count, .. } => format!("L,{count}"),
            CommandKind::ClubGroup { clubs, .. } => format!("CLUBS,{}", clubs.join(",")),
            CommandKind::Fill { arg, .. } => format!("FILL,{arg}"),
            CommandKind::SubDef { name } => format!("DEFSUB,{name}"),
            CommandKind::SubEnd => "ENDSUB".to_string(),
            CommandKind::End => "END".to_string(),
            CommandKind::Raw => String::new(),
        }
    }

    /// Elapsed ticks this command contributes to the running time.
    ///
    /// Only meaningful after `TIME` markers have been normalized away; a
    /// `TIME` reaching this path is a semantic error. `ClubGroup` and every
    /// non-timed leaf contribute 0.
    pub fn duration(&self) -> Result<i64, CompileError> {
        match &self.kind {
            CommandKind::Delay { arg } => parse_count(arg, self.line),
            CommandKind::Ramp { args } => {
                let last = args.last().ok_or_else(|| {
                    CompileError::internal("RAMP without a duration field", self.line)
                })?;
                parse_count(last, self.line)
            }
            CommandKind::Fill { arg, .. } => parse_count(arg, self.line),
            CommandKind::Loop { count, body, .. } => {
                let count = parse_count(count, self.line)?;
                let mut sum = 0;
                for child in body {
                    sum += child.duration()?;
                }
                Ok(count * sum)
            }
            CommandKind::Time { .. } => Err(CompileError::semantic(
                "TIME not supported here",
                self.line,
            )),
            _ => Ok(0),
        }
    }
}

/// Parse an integer field, reporting the source line on failure.
pub fn parse_number(field: &str, line: Option<usize>) -> Result<i64, CompileError> {
    field
        .parse()
        .map_err(|_| CompileError::syntax(format!("Cannot parse number `{field}`"), line))
}

/// Parse an integer field that must not be zero (counts and durations).
pub fn parse_count(field: &str, line: Option<usize>) -> Result<i64, CompileError> {
    let count = parse_number(field, line)?;
    if count == 0 {
        return Err(CompileError::syntax("Count can't be zero", line));
    }
    Ok(count)
}
