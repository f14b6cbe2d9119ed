//! Club specialization: carve one club's slice out of a shared script.
//!
//! A `CLUBS` block is spliced into its parent when the target club appears
//! in its id list and dropped wholesale otherwise, so a single script can
//! serve every physical club.

use crate::command::{parse_count, Command, CommandKind, Program};
use crate::error::CompileError;

pub fn specialize(program: Program, club: i64) -> Result<Program, CompileError> {
    let mut specialized = Vec::new();
    for cmd in program {
        let Command {
            kind,
            line,
            verbatim,
        } = cmd;
        match kind {
            CommandKind::ClubGroup { clubs, body, .. } => {
                let mut found = false;
                for id in &clubs {
                    if parse_count(id, line)? == club {
                        found = true;
                        break;
                    }
                }
                if found {
                    specialized.extend(specialize(body, club)?);
                }
            }
            CommandKind::Loop {
                count,
                body,
                terminator,
            } => specialized.push(Command {
                kind: CommandKind::Loop {
                    count,
                    body: specialize(body, club)?,
                    terminator,
                },
                line,
                verbatim,
            }),
            CommandKind::Fill {
                arg,
                body,
                terminator,
            } => specialized.push(Command {
                kind: CommandKind::Fill {
                    arg,
                    body: specialize(body, club)?,
                    terminator,
                },
                line,
                verbatim,
            }),
            other => specialized.push(Command {
                kind: other,
                line,
                verbatim,
            }),
        }
    }
    Ok(specialized)
}
