use std::fmt;

/// A fatal compilation error. The whole pipeline stops at the first one.
///
/// Errors that originate from a script line carry its 0-based line number;
/// label-derived and file-level errors carry none. Rendering is 1-based to
/// match what authors see in their editor.
#[derive(Debug, Clone)]
pub struct CompileError {
    pub kind: ErrorKind,
    pub message: String,
    pub line: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Unparseable number, zero count, unterminated block, stray terminator.
    Syntax,
    /// Unknown color, label, or subroutine.
    Reference,
    /// Duplicate color, label, or subroutine name.
    Redefinition,
    /// Unsupported expression shape, misplaced TIME, time moving backward,
    /// illegal command inside FILL, nested COLOR.
    Semantic,
    /// Overlapping label intervals for an audience.
    Consistency,
    /// A bug in the fill/duration algorithms, not a user error.
    Internal,
}

impl CompileError {
    fn new(kind: ErrorKind, message: impl Into<String>, line: Option<usize>) -> Self {
        Self {
            kind,
            message: message.into(),
            line,
        }
    }

    pub fn syntax(message: impl Into<String>, line: Option<usize>) -> Self {
        Self::new(ErrorKind::Syntax, message, line)
    }

    pub fn reference(message: impl Into<String>, line: Option<usize>) -> Self {
        Self::new(ErrorKind::Reference, message, line)
    }

    pub fn redefinition(message: impl Into<String>, line: Option<usize>) -> Self {
        Self::new(ErrorKind::Redefinition, message, line)
    }

    pub fn semantic(message: impl Into<String>, line: Option<usize>) -> Self {
        Self::new(ErrorKind::Semantic, message, line)
    }

    pub fn consistency(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Consistency, message, None)
    }

    pub fn internal(message: impl Into<String>, line: Option<usize>) -> Self {
        Self::new(ErrorKind::Internal, message, line)
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "Error in line {}: {}", line + 1, self.message),
            None => write!(f, "Error: {}", self.message),
        }
    }
}

impl std::error::Error for CompileError {}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn line_errors_render_one_based() {
        let e = CompileError::syntax("Count can't be zero", Some(0));
        assert_eq!(e.to_string(), "Error in line 1: Count can't be zero");
    }

    #[test]
    fn lineless_errors_render_plain() {
        let e = CompileError::consistency("overlap");
        assert_eq!(e.to_string(), "Error: overlap");
    }
}
