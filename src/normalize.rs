//! TIME normalization: convert absolute `TIME,<ticks>` markers into the
//! delays that realize them.
//!
//! Markers only make sense in the top-level stream, where elapsed time is a
//! simple running sum; inside a loop the "current time" of a command differs
//! per iteration. By this stage fills are expanded and subroutines inlined,
//! so a marker anywhere deeper is reported when the enclosing block's
//! duration is taken.

use crate::command::{parse_count, Command, CommandKind, Program};
use crate::error::CompileError;

pub fn normalize(program: Program) -> Result<Program, CompileError> {
    let mut normalized = Vec::new();
    let mut now = 0;
    for cmd in program {
        if let CommandKind::Time { arg } = &cmd.kind {
            let target = parse_count(arg, cmd.line)?;
            if target < now {
                return Err(CompileError::semantic(
                    format!("Cannot go back in time - it's already {now}"),
                    cmd.line,
                ));
            }
            if target > now {
                normalized.push(Command {
                    kind: CommandKind::Delay {
                        arg: (target - now).to_string(),
                    },
                    line: cmd.line,
                    verbatim: None,
                });
                now = target;
            }
            // already there: the marker vanishes
            continue;
        }
        now += cmd.duration()?;
        normalized.push(cmd);
    }
    Ok(normalized)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn normalize_src(src: &str) -> Result<Program, CompileError> {
        normalize(parse(src).unwrap())
    }

    #[test]
    fn markers_become_gap_delays() {
        let program = normalize_src("D,30\nTIME,100\nC,255,0,0").unwrap();
        assert_eq!(program.len(), 3);
        assert_eq!(program[1].text(), "D,70");
    }

    #[test]
    fn marker_at_the_current_time_vanishes() {
        let program = normalize_src("D,50\nTIME,50\nD,10").unwrap();
        assert_eq!(program.len(), 2);
        assert_eq!(program[1].text(), "D,10");
    }

    #[test]
    fn loops_advance_the_running_time() {
        let program = normalize_src("L,4\nD,20\nE\nTIME,100").unwrap();
        assert_eq!(program.len(), 2);
        assert_eq!(program[1].text(), "D,20");
    }

    #[test]
    fn going_backwards_is_fatal() {
        let err = normalize_src("D,80\nTIME,50").unwrap_err();
        assert_eq!(err.message, "Cannot go back in time - it's already 80");
        assert_eq!(err.line, Some(1));
    }

    #[test]
    fn marker_inside_a_loop_is_fatal() {
        let err = normalize_src("L,2\nTIME,50\nE").unwrap_err();
        assert_eq!(err.message, "TIME not supported here");
    }
}
