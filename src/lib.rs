//! Compiler for .glo glow-club lighting scripts.
//!
//! A script is a line-oriented command list with a few compiler-level
//! constructs on top of what the player firmware understands: named colors,
//! per-club blocks, loops, exact-duration fills, absolute time markers,
//! subroutines and label-based time expressions. Compilation flattens all of
//! that into plain player commands annotated with running show time, either
//! from a script directly or by synthesizing one from the label track of an
//! Audacity project.

pub mod clubs;
pub mod color;
pub mod command;
pub mod emit;
pub mod error;
pub mod expr;
pub mod fill;
pub mod labels;
pub mod normalize;
pub mod parser;
pub mod subs;
pub mod timeline;

use command::Program;
use error::CompileError;
use expr::{Definitions, LabelMap};
use labels::Label;

/// Compile a script to its annotated flat form.
///
/// This is the whole pipeline:
/// parse → [timeline synthesis] → club specialization → color resolution →
/// expression resolution → fill expansion → time normalization → emission.
///
/// With `timeline_mode` set, the script only contributes color and
/// subroutine definitions and the program itself is synthesized from
/// `labels`; otherwise `labels` feed the expression resolver. `club` 0
/// means no specialization.
pub fn compile(
    source: &str,
    labels: Vec<Label>,
    timeline_mode: bool,
    club: i64,
) -> Result<String, CompileError> {
    let program = compile_program(source, labels, timeline_mode, club)?;
    emit::render(&program)
}

/// The flattened program before emission. Split out for callers that want
/// the command tree rather than annotated text.
pub fn compile_program(
    source: &str,
    labels: Vec<Label>,
    timeline_mode: bool,
    club: i64,
) -> Result<Program, CompileError> {
    let parsed = parser::parse(source)?;
    let (program, label_map) = if timeline_mode {
        let colors = color::gather(&parsed)?;
        let (sub_table, _) = subs::extract(parsed)?;
        let mut labels = labels;
        labels.sort_by_key(|l| l.start);
        timeline::check_consistency(&labels)?;
        let synthesized = timeline::synthesize(&labels, &colors, &sub_table)?;
        (synthesized, LabelMap::new())
    } else {
        let (_, stripped) = subs::extract(parsed)?;
        (stripped, labels::build_map(labels)?)
    };
    let program = if club == 0 {
        program
    } else {
        clubs::specialize(program, club)?
    };
    let colors = color::gather(&program)?;
    let program = color::resolve(program, &colors)?;
    let program = expr::resolve_program(program, &label_map, &Definitions::new())?;
    let program = fill::expand(program)?;
    normalize::normalize(program)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn label(title: &str, start: i64, end: i64) -> Label {
        Label {
            title: title.to_string(),
            start,
            end,
        }
    }

    #[test]
    fn plain_programs_pass_through_with_annotations() {
        let out = compile("C,255,0,0\nD,50\nEND", Vec::new(), false, 0).unwrap();
        assert_eq!(out, "C,255,0,0\nD,50\n    ; time 50\nEND\n");
    }

    #[test]
    fn comments_and_spacing_survive_untouched() {
        let src = "; warmup\nC, 10, 20, 30\nD,100 ; one second\nEND";
        let out = compile(src, Vec::new(), false, 0).unwrap();
        assert_eq!(
            out,
            "; warmup\nC, 10, 20, 30\nD,100 ; one second\n    ; time 100\nEND\n"
        );
    }

    #[test]
    fn direct_mode_resolves_colors_and_label_expressions() {
        let src = "COLOR,red,255,0,0\nC,red 50%\nD,&chorus\nEND";
        let labels = vec![label("chorus", 100, 300)];
        let out = compile(src, labels, false, 0).unwrap();
        assert_eq!(out, "C,127,0,0\nD,200\n    ; time 200\nEND\n");
    }

    #[test]
    fn club_specialization_runs_before_everything_else() {
        let src = "CLUBS,1,2\nD,5\nE\nEND";
        assert_eq!(
            compile(src, Vec::new(), false, 3).unwrap(),
            "END\n"
        );
        assert_eq!(
            compile(src, Vec::new(), false, 2).unwrap(),
            "D,5\n    ; time 5\nEND\n"
        );
    }

    #[test]
    fn fills_and_time_markers_flatten_together() {
        let src = "FILL,100\nL,3\nD,30\nE\nE\nTIME,150\nEND";
        let out = compile(src, Vec::new(), false, 0).unwrap();
        assert_eq!(
            out,
            "L,3\nD,30\nE\n    ; time 90\nD,10\n    ; time 100\nD,50\n    ; time 150\nEND\n"
        );
    }

    #[test]
    fn subroutine_definitions_never_reach_the_output() {
        let src = "DEFSUB,blink\nD,10\nENDSUB\nD,20\nEND";
        let out = compile(src, Vec::new(), false, 0).unwrap();
        assert_eq!(out, "D,20\n    ; time 20\nEND\n");
    }

    #[test]
    fn timeline_mode_synthesizes_the_whole_show() {
        let src = "COLOR,red,255,0,0\nDEFSUB,blink\nL,duration/20\nD,10\nD,10\nE\nENDSUB";
        let labels = vec![label("blink", 300, 400), label("red", 100, 200)];
        let out = compile(src, labels, true, 0).unwrap();
        assert_eq!(
            out,
            "C,0,0,0\n\
             D,100\n    ; time 100\n\
             C,255,0,0\n\
             D,100\n    ; time 200\n\
             C,0,0,0\n\
             D,100\n    ; time 300\n\
             L,5\nD,10\nD,10\nE\n    ; time 400\n\
             C,0,0,0\n\
             END\n"
        );
    }

    #[test]
    fn timeline_mode_scopes_labels_to_their_clubs() {
        let src = "COLOR,red,255,0,0\nCOLOR,blue,0,0,255";
        let labels = vec![
            label("c1:red", 100, 200),
            label("c2:blue", 100, 200),
        ];
        let for_two = compile(src, labels, true, 2).unwrap();
        assert_eq!(
            for_two,
            "C,0,0,0\nD,100\n    ; time 100\nC,0,0,255\nD,100\n    ; time 200\nC,0,0,0\nEND\n"
        );
    }

    #[test]
    fn timeline_mode_rejects_overlapping_labels() {
        let labels = vec![label("red", 100, 300), label("blue", 200, 400)];
        let err = compile("COLOR,red,255,0,0\nCOLOR,blue,0,0,255", labels, true, 0).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Error: Label `blue` starts at 200 but all clubs busy until 300"
        );
    }

    #[test]
    fn errors_carry_one_based_line_numbers() {
        let err = compile("D,5\nD,nonsense\nEND", Vec::new(), false, 0).unwrap_err();
        assert_eq!(err.to_string(), "Error in line 2: Unknown label `nonsense`");
    }

    #[test]
    fn duplicate_labels_are_rejected_in_direct_mode() {
        let labels = vec![label("verse", 0, 10), label("verse", 20, 30)];
        let err = compile("END", labels, false, 0).unwrap_err();
        assert_eq!(err.to_string(), "Error: Label verse defined more than once");
    }
}
