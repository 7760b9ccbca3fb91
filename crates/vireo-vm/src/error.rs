//! Terminal match failures.

use vireo_core::{Expected, Range};

/// A match that could not complete: either the backtrack stack ran dry
/// (reported at the furthest failure position with the expectations
/// collected there) or a labelled throw had no registered recovery.
#[derive(Clone, Debug, PartialEq)]
pub struct ParseError {
    /// The thrown label, if this failure came from a `throw`.
    pub label: Option<String>,
    /// Configured message for the label, if any.
    pub message: Option<String>,
    /// Where the failure is reported (a point range).
    pub range: Range,
    /// What the failing opcodes were prepared to accept.
    pub expected: Vec<Expected>,
    /// The codepoint found at the failure position.
    pub found: Option<char>,
    /// Input cursor when the match aborted.
    pub consumed: usize,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let pos = self.range.start + 1;
        if let Some(message) = &self.message {
            return write!(f, "{message} @ {pos}");
        }
        if let Some(label) = &self.label {
            return write!(f, "{label} @ {pos}");
        }
        if self.expected.is_empty() {
            return match self.found {
                Some(c) => write!(f, "Unexpected '{c}' @ {pos}"),
                None => write!(f, "Unexpected end of input @ {pos}"),
            };
        }
        write!(f, "Expected ")?;
        for (i, item) in self.expected.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{item}")?;
        }
        match self.found {
            Some(c) => write!(f, " but got '{c}' @ {pos}"),
            None => write!(f, " but got EOF @ {pos}"),
        }
    }
}

impl std::error::Error for ParseError {}
