//! Line-oriented block parser for .glo scripts.
//!
//! One command per line, comma-separated fields, `;` starts a trailing
//! comment. Block commands (`L`, `CLUBS`, `FILL`) own every following line
//! up to their `E` terminator; the terminator line is consumed verbatim and
//! never parsed on its own.

use crate::command::{Command, CommandKind, Program};
use crate::error::CompileError;

/// Parse a whole script into a command tree.
pub fn parse(source: &str) -> Result<Program, CompileError> {
    let lines: Vec<&str> = source.lines().collect();
    let mut parser = Parser { lines, pos: 0 };
    let program = parser.parse_sequence()?;
    if parser.pos < parser.lines.len() {
        return Err(CompileError::syntax("E without L", Some(parser.pos)));
    }
    Ok(program)
}

struct Parser<'a> {
    lines: Vec<&'a str>,
    pos: usize,
}

impl Parser<'_> {
    /// Parse commands until an `E` line or end of input. Leaves `pos` on the
    /// unconsumed `E` line (or one past the end).
    fn parse_sequence(&mut self) -> Result<Program, CompileError> {
        let mut commands = Vec::new();
        while let Some(line) = self.lines.get(self.pos) {
            let fields = split_line(line);
            if fields.first().map(String::as_str) == Some("E") {
                break;
            }
            commands.push(self.parse_command(&fields)?);
        }
        Ok(commands)
    }

    fn parse_command(&mut self, fields: &[String]) -> Result<Command, CompileError> {
        let line_no = self.pos;
        let verbatim = self.lines.get(self.pos).copied().unwrap_or_default();
        let keyword = fields.first().map_or("", String::as_str);

        let kind = match keyword {
            "D" => CommandKind::Delay {
                arg: self.required_arg(fields, "D")?,
            },
            "TIME" => CommandKind::Time {
                arg: self.required_arg(fields, "TIME")?,
            },
            "C" => CommandKind::SetColor {
                args: fields.get(1..).unwrap_or_default().to_vec(),
            },
            "RAMP" => {
                if fields.len() < 3 {
                    return Err(CompileError::syntax(
                        "Missing argument to `RAMP`",
                        Some(line_no),
                    ));
                }
                CommandKind::Ramp {
                    args: fields.get(1..).unwrap_or_default().to_vec(),
                }
            }
            "COLOR" => {
                if fields.len() < 3 {
                    return Err(CompileError::syntax(
                        "Missing argument to `COLOR`",
                        Some(line_no),
                    ));
                }
                CommandKind::ColorDef {
                    name: fields.get(1).cloned().unwrap_or_default(),
                    args: fields.get(2..).unwrap_or_default().to_vec(),
                }
            }
            "L" => {
                let count = self.required_arg(fields, "L")?;
                let (body, terminator) = self.parse_block(line_no)?;
                return Ok(Command::parsed(
                    CommandKind::Loop {
                        count,
                        body,
                        terminator,
                    },
                    line_no,
                    verbatim,
                ));
            }
            "CLUBS" => {
                if fields.len() < 2 {
                    return Err(CompileError::syntax(
                        "Missing argument to `CLUBS`",
                        Some(line_no),
                    ));
                }
                let clubs = fields.get(1..).unwrap_or_default().to_vec();
                let (body, terminator) = self.parse_block(line_no)?;
                return Ok(Command::parsed(
                    CommandKind::ClubGroup {
                        clubs,
                        body,
                        terminator,
                    },
                    line_no,
                    verbatim,
                ));
            }
            "FILL" => {
                let arg = self.required_arg(fields, "FILL")?;
                let (body, terminator) = self.parse_block(line_no)?;
                return Ok(Command::parsed(
                    CommandKind::Fill {
                        arg,
                        body,
                        terminator,
                    },
                    line_no,
                    verbatim,
                ));
            }
            "DEFSUB" => CommandKind::SubDef {
                name: self.required_arg(fields, "DEFSUB")?,
            },
            "ENDSUB" => CommandKind::SubEnd,
            "END" => CommandKind::End,
            _ => CommandKind::Raw,
        };

        self.pos += 1;
        Ok(Command::parsed(kind, line_no, verbatim))
    }

    /// Parse a block body after its opening line, consuming the `E` line.
    fn parse_block(&mut self, open_line: usize) -> Result<(Program, String), CompileError> {
        self.pos += 1;
        let body = self.parse_sequence()?;
        let Some(terminator) = self.lines.get(self.pos) else {
            return Err(CompileError::syntax("Unterminated loop", Some(open_line)));
        };
        let terminator = (*terminator).to_string();
        self.pos += 1;
        Ok((body, terminator))
    }

    fn required_arg(&self, fields: &[String], keyword: &str) -> Result<String, CompileError> {
        fields.get(1).cloned().ok_or_else(|| {
            CompileError::syntax(format!("Missing argument to `{keyword}`"), Some(self.pos))
        })
    }
}

/// Strip the trailing comment, trim, and split a line into trimmed fields.
fn split_line(line: &str) -> Vec<String> {
    let line = match line.find(';') {
        Some(idx) => line.get(..idx).unwrap_or_default(),
        None => line,
    };
    line.trim_matches([' ', '\t'])
        .split(',')
        .map(|field| field.trim_matches([' ', '\t']).to_string())
        .collect()
}
