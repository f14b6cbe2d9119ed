//! Named color palette: gathering `COLOR` definitions and resolving
//! references in `C` and `RAMP` commands.
//!
//! Colors are global. Definitions are only legal at the top level and are
//! gathered in one left-to-right pass, so a definition may reference any
//! color defined above it, optionally dimmed with a `NN%` brightness scale.
//! Channels are plain integers and never range-checked; whatever the script
//! says is what the player gets.

use indexmap::IndexMap;

use crate::command::{parse_number, Command, CommandKind, Program};
use crate::error::CompileError;

/// A defined color. The name keeps its original spelling for re-emission;
/// table keys are lowercased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Color {
    pub name: String,
    pub r: i64,
    pub g: i64,
    pub b: i64,
}

impl Color {
    /// The three channel fields in command order.
    pub fn fields(&self) -> Vec<String> {
        vec![self.r.to_string(), self.g.to_string(), self.b.to_string()]
    }

    /// Brightness-scale by a percentage, truncating per channel.
    fn scaled(&self, percent: i64) -> Color {
        Color {
            name: self.name.clone(),
            r: self.r * percent / 100,
            g: self.g * percent / 100,
            b: self.b * percent / 100,
        }
    }
}

/// Name → color, preserving first-definition order for deterministic
/// re-emission by the timeline synthesizer.
#[derive(Debug, Clone, Default)]
pub struct ColorTable {
    entries: IndexMap<String, Color>,
}

impl ColorTable {
    pub fn get(&self, name: &str) -> Option<&Color> {
        self.entries.get(&name.to_lowercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Colors in first-definition order.
    pub fn iter(&self) -> impl Iterator<Item = &Color> {
        self.entries.values()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve a `<name>[ NN%]` reference against the colors defined so far.
    pub fn resolve_reference(
        &self,
        description: &str,
        line: Option<usize>,
    ) -> Result<Color, CompileError> {
        let (name, percent) = split_reference(description);
        let color = self.get(name).ok_or_else(|| {
            CompileError::reference(format!("Color `{name}` not defined"), line)
        })?;
        match percent {
            Some(percent) => Ok(color.scaled(parse_number(percent, line)?)),
            None => Ok(color.clone()),
        }
    }
}

/// Split an optional trailing `NN%` brightness suffix off a color reference.
fn split_reference(description: &str) -> (&str, Option<&str>) {
    if let Some(stripped) = description.strip_suffix('%') {
        if let Some((name, percent)) = stripped.rsplit_once([' ', '\t']) {
            if !percent.is_empty() && percent.bytes().all(|b| b.is_ascii_digit()) {
                return (name.trim_matches([' ', '\t']), Some(percent));
            }
        }
    }
    (description, None)
}

/// Walk the whole tree and build the color table.
///
/// Only top-level definitions are legal; colors are global, so a `COLOR`
/// nested inside any block is fatal.
pub fn gather(program: &Program) -> Result<ColorTable, CompileError> {
    let mut table = ColorTable::default();
    gather_into(program, &mut table, true)?;
    Ok(table)
}

fn gather_into(
    commands: &Program,
    table: &mut ColorTable,
    top_level: bool,
) -> Result<(), CompileError> {
    for cmd in commands {
        match &cmd.kind {
            CommandKind::ColorDef { name, args } => {
                if !top_level {
                    return Err(CompileError::semantic(
                        "Can't define colors here",
                        cmd.line,
                    ));
                }
                define(table, name, args, cmd.line)?;
            }
            CommandKind::Loop { body, .. }
            | CommandKind::ClubGroup { body, .. }
            | CommandKind::Fill { body, .. } => {
                gather_into(body, table, false)?;
            }
            _ => {}
        }
    }
    Ok(())
}

fn define(
    table: &mut ColorTable,
    name: &str,
    args: &[String],
    line: Option<usize>,
) -> Result<(), CompileError> {
    let key = name.to_lowercase();
    if table.entries.contains_key(&key) {
        return Err(CompileError::redefinition(
            format!("Color `{name}` redefined"),
            line,
        ));
    }
    let color = match args {
        [reference] => {
            let resolved = table.resolve_reference(reference, line)?;
            Color {
                name: name.to_string(),
                ..resolved
            }
        }
        [r, g, b] => Color {
            name: name.to_string(),
            r: parse_number(r, line)?,
            g: parse_number(g, line)?,
            b: parse_number(b, line)?,
        },
        _ => {
            return Err(CompileError::syntax("Malformed COLOR command", line));
        }
    };
    table.entries.insert(key, color);
    Ok(())
}

/// Rewrite every named color reference to its literal triple.
///
/// Top-level `COLOR` definitions are consumed here: they exist for the
/// compiler, not the player, and do not appear in the output.
pub fn resolve(program: Program, table: &ColorTable) -> Result<Program, CompileError> {
    let mut resolved = Vec::with_capacity(program.len());
    for cmd in program {
        let Command {
            kind,
            line,
            verbatim,
        } = cmd;
        match kind {
            CommandKind::ColorDef { .. } => {}
            CommandKind::SetColor { args } => {
                if let [reference] = args.as_slice() {
                    let color = table.resolve_reference(reference, line)?;
                    resolved.push(Command {
                        kind: CommandKind::SetColor {
                            args: color.fields(),
                        },
                        line,
                        verbatim: None,
                    });
                } else {
                    resolved.push(Command {
                        kind: CommandKind::SetColor { args },
                        line,
                        verbatim,
                    });
                }
            }
            CommandKind::Ramp { args } => {
                if let [reference, duration] = args.as_slice() {
                    let color = table.resolve_reference(reference, line)?;
                    let mut fields = color.fields();
                    fields.push(duration.clone());
                    resolved.push(Command {
                        kind: CommandKind::Ramp { args: fields },
                        line,
                        verbatim: None,
                    });
                } else {
                    resolved.push(Command {
                        kind: CommandKind::Ramp { args },
                        line,
                        verbatim,
                    });
                }
            }
            CommandKind::Loop {
                count,
                body,
                terminator,
            } => resolved.push(Command {
                kind: CommandKind::Loop {
                    count,
                    body: resolve(body, table)?,
                    terminator,
                },
                line,
                verbatim,
            }),
            CommandKind::ClubGroup {
                clubs,
                body,
                terminator,
            } => resolved.push(Command {
                kind: CommandKind::ClubGroup {
                    clubs,
                    body: resolve(body, table)?,
                    terminator,
                },
                line,
                verbatim,
            }),
            CommandKind::Fill {
                arg,
                body,
                terminator,
            } => resolved.push(Command {
                kind: CommandKind::Fill {
                    arg,
                    body: resolve(body, table)?,
                    terminator,
                },
                line,
                verbatim,
            }),
            other => resolved.push(Command {
                kind: other,
                line,
                verbatim,
            }),
        }
    }
    Ok(resolved)
}
