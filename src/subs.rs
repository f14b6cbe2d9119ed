//! Subroutine table: `DEFSUB,<name> ... ENDSUB` spans.
//!
//! Subroutines are only defined at the top level, so this is a single flat
//! scan, not a tree walk. Bodies are captured verbatim and unresolved; they
//! are consulted only by the timeline synthesizer, which expression-resolves
//! a copy per invocation with the label's `duration` bound.

use std::collections::HashMap;

use crate::command::{CommandKind, Program};
use crate::error::CompileError;

/// Lowercased name → unresolved body.
pub type SubTable = HashMap<String, Program>;

/// Collect every subroutine and return the program with the definition
/// spans removed.
pub fn extract(program: Program) -> Result<(SubTable, Program), CompileError> {
    let mut table = SubTable::new();
    let mut rest = Vec::new();
    let mut commands = program.into_iter();
    while let Some(cmd) = commands.next() {
        match cmd.kind {
            CommandKind::SubDef { ref name } => {
                let key = name.to_lowercase();
                if table.contains_key(&key) {
                    return Err(CompileError::redefinition(
                        format!("Subroutine `{name}` redefined"),
                        cmd.line,
                    ));
                }
                let mut body = Vec::new();
                let mut terminated = false;
                for inner in commands.by_ref() {
                    if matches!(inner.kind, CommandKind::SubEnd) {
                        terminated = true;
                        break;
                    }
                    body.push(inner);
                }
                if !terminated {
                    return Err(CompileError::syntax("Unterminated DEFSUB", cmd.line));
                }
                table.insert(key, body);
            }
            CommandKind::SubEnd => {
                return Err(CompileError::syntax("ENDSUB without DEFSUB", cmd.line));
            }
            _ => rest.push(cmd),
        }
    }
    Ok((table, rest))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn spans_are_collected_and_stripped() {
        let src = "D,1\nDEFSUB,Blink\nC,255,0,0\nD,10\nENDSUB\nEND";
        let (table, rest) = extract(parse(src).unwrap()).unwrap();
        assert_eq!(table.len(), 1);
        let body = &table["blink"];
        assert_eq!(body.len(), 2);
        assert_eq!(body[1].text(), "D,10");
        assert_eq!(rest.len(), 2);
        assert_eq!(rest[0].text(), "D,1");
        assert_eq!(rest[1].text(), "END");
    }

    #[test]
    fn bodies_keep_nested_blocks() {
        let src = "DEFSUB,spin\nL,4\nD,5\nE\nENDSUB";
        let (table, _) = extract(parse(src).unwrap()).unwrap();
        assert!(matches!(table["spin"][0].kind, CommandKind::Loop { .. }));
    }

    #[test]
    fn unterminated_sub_is_fatal() {
        let err = extract(parse("DEFSUB,blink\nD,5").unwrap()).unwrap_err();
        assert_eq!(err.message, "Unterminated DEFSUB");
        assert_eq!(err.line, Some(0));
    }

    #[test]
    fn stray_endsub_is_fatal() {
        let err = extract(parse("D,1\nENDSUB").unwrap()).unwrap_err();
        assert_eq!(err.message, "ENDSUB without DEFSUB");
        assert_eq!(err.line, Some(1));
    }

    #[test]
    fn duplicate_names_are_fatal_case_insensitively() {
        let src = "DEFSUB,blink\nD,5\nENDSUB\nDEFSUB,BLINK\nD,9\nENDSUB";
        let err = extract(parse(src).unwrap()).unwrap_err();
        assert_eq!(err.message, "Subroutine `BLINK` redefined");
    }
}
