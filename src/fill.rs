//! FILL expansion: stretch or truncate a block's body to an exact duration.
//!
//! A `FILL,<ticks>` block names a target duration; its body's natural
//! duration may be anything. Expansion replaces the block with a sequence
//! whose summed duration equals the target exactly: elements are kept whole
//! while they fit, the first element that does not fit is shrunk to the
//! remainder (a loop shrinks to the largest whole iteration count, with the
//! fractional remainder filled recursively from its body), and any budget
//! left after the whole body is consumed becomes a literal trailing delay.

use crate::command::{parse_count, Command, CommandKind, Program};
use crate::error::CompileError;

/// Expand every `FILL` block in the tree, splicing its replacement in place.
pub fn expand(program: Program) -> Result<Program, CompileError> {
    let mut expanded = Vec::new();
    for cmd in program {
        let Command {
            kind,
            line,
            verbatim,
        } = cmd;
        match kind {
            CommandKind::Fill { arg, body, .. } => {
                let body = expand(body)?;
                let target = parse_count(&arg, line)?;
                expanded.extend(fit(&body, target, line)?);
            }
            CommandKind::Loop {
                count,
                body,
                terminator,
            } => expanded.push(Command {
                kind: CommandKind::Loop {
                    count,
                    body: expand(body)?,
                    terminator,
                },
                line,
                verbatim,
            }),
            CommandKind::ClubGroup {
                clubs,
                body,
                terminator,
            } => expanded.push(Command {
                kind: CommandKind::ClubGroup {
                    clubs,
                    body: expand(body)?,
                    terminator,
                },
                line,
                verbatim,
            }),
            other => expanded.push(Command {
                kind: other,
                line,
                verbatim,
            }),
        }
    }
    Ok(expanded)
}

/// Emit a copy of `body` sized to exactly `target` ticks.
fn fit(body: &Program, target: i64, line: Option<usize>) -> Result<Program, CompileError> {
    let mut emitted = Vec::new();
    let mut consumed = 0;
    for cmd in body {
        let duration = cmd.duration()?;
        let remaining = target - consumed;
        if duration <= remaining {
            emitted.push(cmd.clone());
            consumed += duration;
            continue;
        }
        // This element would overshoot: shrink it to the remainder and
        // ignore the rest of the body.
        match &cmd.kind {
            CommandKind::Delay { .. } => {
                if remaining > 0 {
                    emitted.push(cmd.rewritten(CommandKind::Delay {
                        arg: remaining.to_string(),
                    }));
                }
                consumed = target;
            }
            CommandKind::Ramp { args } => {
                if remaining > 0 {
                    let mut args = args.clone();
                    if let Some(slot) = args.last_mut() {
                        *slot = remaining.to_string();
                    }
                    emitted.push(cmd.rewritten(CommandKind::Ramp { args }));
                }
                consumed = target;
            }
            CommandKind::Loop {
                body: loop_body,
                terminator,
                ..
            } => {
                // duration > remaining >= 0 guarantees a positive body sum
                let unit = duration_of(loop_body)?;
                let iterations = remaining / unit;
                if iterations > 0 {
                    emitted.push(cmd.rewritten(CommandKind::Loop {
                        count: iterations.to_string(),
                        body: loop_body.clone(),
                        terminator: terminator.clone(),
                    }));
                    consumed += iterations * unit;
                }
                let leftover = remaining - iterations * unit;
                if leftover > 0 {
                    emitted.extend(fit(loop_body, leftover, line)?);
                    consumed += leftover;
                }
            }
            _ => {
                return Err(CompileError::semantic(
                    format!("Can't fit `{}` inside FILL", cmd.text()),
                    cmd.line,
                ));
            }
        }
    }
    if consumed < target {
        emitted.push(Command {
            kind: CommandKind::Delay {
                arg: (target - consumed).to_string(),
            },
            line,
            verbatim: None,
        });
        consumed = target;
    }
    if consumed != target {
        return Err(CompileError::internal(
            format!("FILL expanded to {consumed} ticks instead of {target}"),
            line,
        ));
    }
    Ok(emitted)
}

fn duration_of(body: &Program) -> Result<i64, CompileError> {
    let mut sum = 0;
    for cmd in body {
        sum += cmd.duration()?;
    }
    Ok(sum)
}
