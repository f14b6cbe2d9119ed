//! Timeline synthesis: turn a sorted label list into a whole program.
//!
//! Each label becomes a self-contained sequence — jump to its start, do what
//! the title says, jump to its end, go dark — optionally scoped to the clubs
//! named by a leading `c<id>[,<id>...]` token. The title's remainder selects
//! the action: a color name sets that color for the span, a subroutine name
//! expands its body into a fill sized to the span, and `ramp:<color>:...`
//! chains timed transitions across the span.

use std::collections::HashMap;

use crate::color::ColorTable;
use crate::command::{Command, CommandKind, Program};
use crate::error::CompileError;
use crate::expr::{self, Definitions, LabelMap};
use crate::labels::{parse_club_spec, Label};
use crate::subs::SubTable;

// ── Club scope ──────────────────────────────────────────────────────

/// Split a label's tokens into an optional club scope and the content
/// tokens. A first token that merely looks like a club scope (`c` followed
/// by a digit) but does not parse as one is fatal.
fn club_scope(label: &Label) -> Result<(Option<Vec<String>>, Vec<String>), CompileError> {
    let tokens = label.tokens();
    let Some((first, rest)) = tokens.split_first() else {
        return Ok((None, tokens));
    };
    if rest.is_empty() {
        return Ok((None, tokens));
    }
    if let Some(clubs) = parse_club_spec(first) {
        return Ok((Some(clubs), rest.to_vec()));
    }
    let attempted = first
        .strip_prefix(['c', 'C'])
        .is_some_and(|rest| rest.trim_start().starts_with(|c: char| c.is_ascii_digit()));
    if attempted {
        return Err(CompileError::syntax(
            format!("Illegal clubs specification `{first}`"),
            None,
        ));
    }
    Ok((None, tokens))
}

// ── Consistency ─────────────────────────────────────────────────────

/// Reject overlapping labels before synthesis.
///
/// One high-water mark covers unscoped labels, which address every club,
/// plus one mark per club id seen in a scope. A scoped label may only start
/// once its own club is free; an unscoped label needs every club free.
pub fn check_consistency(labels: &[Label]) -> Result<(), CompileError> {
    let mut all_mark: i64 = i64::MIN;
    let mut club_marks: HashMap<String, i64> = HashMap::new();
    for label in labels {
        let (clubs, _) = club_scope(label)?;
        match clubs {
            None => {
                if label.start < all_mark {
                    return Err(overlap(label, None, all_mark));
                }
                for (club, mark) in &club_marks {
                    if label.start < *mark {
                        return Err(overlap(label, Some(club.as_str()), *mark));
                    }
                }
                all_mark = all_mark.max(label.end);
                for mark in club_marks.values_mut() {
                    *mark = (*mark).max(label.end);
                }
            }
            Some(clubs) => {
                for club in clubs {
                    let mark = club_marks.entry(club.clone()).or_insert(all_mark);
                    if label.start < *mark {
                        return Err(overlap(label, Some(club.as_str()), *mark));
                    }
                    *mark = (*mark).max(label.end);
                }
            }
        }
    }
    Ok(())
}

fn overlap(label: &Label, club: Option<&str>, mark: i64) -> CompileError {
    let scope = match club {
        Some(id) => format!("club {id}"),
        None => "all clubs".to_string(),
    };
    CompileError::consistency(format!(
        "Label `{}` starts at {} but {scope} busy until {mark}",
        label.title, label.start
    ))
}

// ── Synthesis ───────────────────────────────────────────────────────

/// Build a program from the sorted label list.
pub fn synthesize(
    labels: &[Label],
    colors: &ColorTable,
    subs: &SubTable,
) -> Result<Program, CompileError> {
    let mut commands = Vec::new();
    for color in colors.iter() {
        commands.push(Command::synthesized(CommandKind::ColorDef {
            name: color.name.clone(),
            args: color.fields(),
        }));
    }
    commands.push(black());
    for label in labels {
        let (clubs, tokens) = club_scope(label)?;
        let mut sequence = vec![time(label.start)];
        sequence.extend(label_action(label, &tokens, colors, subs)?);
        sequence.push(time(label.end));
        sequence.push(black());
        match clubs {
            Some(clubs) => commands.push(Command::synthesized(CommandKind::ClubGroup {
                clubs,
                body: sequence,
                terminator: "E".to_string(),
            })),
            None => commands.extend(sequence),
        }
    }
    commands.push(Command::synthesized(CommandKind::End));
    Ok(commands)
}

/// The commands realizing one label's content tokens over its span.
fn label_action(
    label: &Label,
    tokens: &[String],
    colors: &ColorTable,
    subs: &SubTable,
) -> Result<Program, CompileError> {
    match tokens {
        [single] => {
            if colors.contains(single) {
                return Ok(vec![set_color(single)]);
            }
            if let Some(body) = subs.get(&single.to_lowercase()) {
                return expand_sub(body, label.span());
            }
            // an unknown single token still reads as a color reference; the
            // color resolver reports it with a better message than we could
            Ok(vec![set_color(single)])
        }
        [ramp, colors @ ..] if ramp.eq_ignore_ascii_case("ramp") && colors.len() >= 2 => {
            Ok(ramp_segments(colors, label.span()))
        }
        _ => Err(CompileError::semantic(
            format!("Incorrect label `{}`", label.title),
            None,
        )),
    }
}

/// Copy a subroutine body into a fill covering the label's span, with
/// `duration` bound to that span for its expressions.
fn expand_sub(body: &Program, span: i64) -> Result<Program, CompileError> {
    let mut definitions = Definitions::new();
    definitions.insert("duration".to_string(), span);
    let resolved = expr::resolve_program(body.clone(), &LabelMap::new(), &definitions)?;
    Ok(vec![Command::synthesized(CommandKind::Fill {
        arg: span.to_string(),
        body: resolved,
        terminator: "E".to_string(),
    })])
}

/// Set the first color, then ramp through the rest. Segment boundaries are
/// cumulative `(i+1) * span / segments` so the durations always sum to the
/// exact span, whatever truncation does to the individual quotients.
#[allow(clippy::cast_possible_wrap)] // a label never has anywhere near i64::MAX colors
fn ramp_segments(colors: &[String], span: i64) -> Program {
    let Some((first, rest)) = colors.split_first() else {
        return Vec::new();
    };
    let mut sequence = vec![set_color(first)];
    let segments = rest.len() as i64;
    let mut previous = 0;
    for (i, color) in rest.iter().enumerate() {
        let boundary = (i as i64 + 1) * span / segments;
        sequence.push(Command::synthesized(CommandKind::Ramp {
            args: vec![color.clone(), (boundary - previous).to_string()],
        }));
        previous = boundary;
    }
    sequence
}

fn time(ticks: i64) -> Command {
    Command::synthesized(CommandKind::Time {
        arg: ticks.to_string(),
    })
}

fn set_color(reference: &str) -> Command {
    Command::synthesized(CommandKind::SetColor {
        args: vec![reference.to_string()],
    })
}

fn black() -> Command {
    Command::synthesized(CommandKind::SetColor {
        args: vec!["0".to_string(), "0".to_string(), "0".to_string()],
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::color;
    use crate::parser::parse;
    use crate::subs;

    fn label(title: &str, start: i64, end: i64) -> Label {
        Label {
            title: title.to_string(),
            start,
            end,
        }
    }

    fn tables(src: &str) -> (ColorTable, SubTable) {
        let program = parse(src).unwrap();
        let colors = color::gather(&program).unwrap();
        let (subs, _) = subs::extract(program).unwrap();
        (colors, subs)
    }

    fn texts(program: &Program) -> Vec<String> {
        program.iter().map(Command::text).collect()
    }

    #[test]
    fn color_label_becomes_a_bracketed_span() {
        let (colors, subs) = tables("COLOR,red,255,0,0");
        let program = synthesize(&[label("red", 100, 250)], &colors, &subs).unwrap();
        assert_eq!(
            texts(&program),
            vec![
                "COLOR,red,255,0,0",
                "C,0,0,0",
                "TIME,100",
                "C,red",
                "TIME,250",
                "C,0,0,0",
                "END",
            ]
        );
    }

    #[test]
    fn club_scope_wraps_the_label_sequence() {
        let (colors, subs) = tables("COLOR,red,255,0,0");
        let program = synthesize(&[label("c1,2:red", 0, 50)], &colors, &subs).unwrap();
        let CommandKind::ClubGroup { clubs, body, .. } = &program[2].kind else {
            panic!("expected club group");
        };
        assert_eq!(clubs, &["1", "2"]);
        assert_eq!(
            texts(body),
            vec!["TIME,0", "C,red", "TIME,50", "C,0,0,0"]
        );
    }

    #[test]
    fn sub_label_expands_into_a_span_sized_fill() {
        let (colors, subs) = tables("DEFSUB,blink\nL,duration/20\nD,10\nD,10\nE\nENDSUB");
        let program = synthesize(&[label("blink", 0, 300)], &colors, &subs).unwrap();
        let CommandKind::Fill { arg, body, .. } = &program[2].kind else {
            panic!("expected fill");
        };
        assert_eq!(arg, "300");
        let CommandKind::Loop { count, .. } = &body[0].kind else {
            panic!("expected loop");
        };
        assert_eq!(count, "15");
    }

    #[test]
    fn ramp_label_distributes_the_span_without_drift() {
        let (colors, subs) = tables("COLOR,red,255,0,0\nCOLOR,green,0,255,0\nCOLOR,blue,0,0,255");
        let program =
            synthesize(&[label("ramp:red:green:blue", 0, 100)], &colors, &subs).unwrap();
        assert_eq!(
            texts(&program)[5..9],
            [
                "C,red",
                "RAMP,green,50",
                "RAMP,blue,50",
                "TIME,100",
            ]
        );
    }

    #[test]
    fn ramp_durations_absorb_truncation_in_the_last_segments() {
        let (colors, subs) = tables("COLOR,a,1,1,1\nCOLOR,b,2,2,2\nCOLOR,c,3,3,3\nCOLOR,d,4,4,4");
        let program =
            synthesize(&[label("ramp:a:b:c:d", 0, 100)], &colors, &subs).unwrap();
        // boundaries 33, 66, 100 -> durations 33, 33, 34
        assert_eq!(
            texts(&program)[7..10],
            ["RAMP,b,33", "RAMP,c,33", "RAMP,d,34"]
        );
    }

    #[test]
    fn malformed_label_shape_is_fatal() {
        let (colors, subs) = tables("COLOR,red,255,0,0");
        let err = synthesize(&[label("red:blue", 0, 50)], &colors, &subs).unwrap_err();
        assert_eq!(err.message, "Incorrect label `red:blue`");
        assert_eq!(err.line, None);
    }

    #[test]
    fn malformed_club_prefix_is_fatal() {
        let (colors, subs) = tables("COLOR,red,255,0,0");
        let err = synthesize(&[label("c1,x:red", 0, 50)], &colors, &subs).unwrap_err();
        assert_eq!(err.message, "Illegal clubs specification `c1,x`");
    }

    #[test]
    fn unscoped_overlap_is_rejected() {
        let labels = [label("red", 0, 100), label("blue", 50, 150)];
        let err = check_consistency(&labels).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Error: Label `blue` starts at 50 but all clubs busy until 100"
        );
    }

    #[test]
    fn disjoint_clubs_may_overlap() {
        let labels = [label("c1:red", 0, 100), label("c2:blue", 50, 150)];
        check_consistency(&labels).unwrap();
    }

    #[test]
    fn scoped_label_collides_with_unscoped_history() {
        let labels = [label("red", 0, 100), label("c2:blue", 50, 150)];
        let err = check_consistency(&labels).unwrap_err();
        assert_eq!(
            err.message,
            "Label `c2:blue` starts at 50 but club 2 busy until 100"
        );
    }

    #[test]
    fn unscoped_label_collides_with_scoped_history() {
        let labels = [label("c2:blue", 0, 100), label("red", 50, 150)];
        let err = check_consistency(&labels).unwrap_err();
        assert_eq!(
            err.message,
            "Label `red` starts at 50 but club 2 busy until 100"
        );
    }

    #[test]
    fn touching_spans_do_not_collide() {
        let labels = [label("red", 0, 100), label("blue", 100, 150)];
        check_consistency(&labels).unwrap();
    }
}
