//! Final rendering: print the program with running-time annotations.
//!
//! Each top-level command that advances time gets a trailing
//! `    ; time <cumulative>` comment line, which is what makes the output
//! useful for syncing a show against the music. Block commands print their
//! body recursively and then their terminator, annotated as a single unit.

use crate::command::{Command, CommandKind, Program};
use crate::error::CompileError;

pub fn render(program: &Program) -> Result<String, CompileError> {
    let mut out = String::new();
    let mut now = 0;
    for cmd in program {
        print_command(cmd, &mut out);
        let duration = cmd.duration()?;
        if duration != 0 {
            now += duration;
            out.push_str(&format!("    ; time {now}\n"));
        }
    }
    Ok(out)
}

fn print_command(cmd: &Command, out: &mut String) {
    out.push_str(&cmd.text());
    out.push('\n');
    if let CommandKind::Loop {
        body, terminator, ..
    }
    | CommandKind::ClubGroup {
        body, terminator, ..
    }
    | CommandKind::Fill {
        body, terminator, ..
    } = &cmd.kind
    {
        for child in body {
            print_command(child, out);
        }
        out.push_str(terminator);
        out.push('\n');
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn render_src(src: &str) -> String {
        render(&parse(src).unwrap()).unwrap()
    }

    #[test]
    fn timed_commands_get_running_totals() {
        let out = render_src("C,255,0,0\nD,30\nRAMP,0,0,255,70\nEND");
        assert_eq!(
            out,
            "C,255,0,0\nD,30\n    ; time 30\nRAMP,0,0,255,70\n    ; time 100\nEND\n"
        );
    }

    #[test]
    fn blocks_annotate_as_one_unit_after_the_terminator() {
        let out = render_src("L,3\nD,10\nE");
        assert_eq!(out, "L,3\nD,10\nE\n    ; time 30\n");
    }

    #[test]
    fn untouched_source_re_emits_byte_identically_plus_annotations() {
        let src = "; intro\nC, 255, 0, 0\nD,50 ; hold\nEND";
        let out = render_src(src);
        assert_eq!(out, "; intro\nC, 255, 0, 0\nD,50 ; hold\n    ; time 50\nEND\n");
    }

    #[test]
    fn terminator_lines_keep_their_original_text() {
        let out = render_src("L,2\nD,5\nE ; end of loop");
        assert_eq!(out, "L,2\nD,5\nE ; end of loop\n    ; time 10\n");
    }
}
