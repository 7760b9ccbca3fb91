//! Diagnostics infrastructure.
//!
//! Syntax and semantic findings are collected here rather than aborting
//! the pipeline, so one run can surface several problems at once.

mod message;
mod printer;

pub use message::{DiagnosticMessage, RelatedInfo, Severity};
pub use printer::DiagnosticsPrinter;

use vireo_core::{FileId, Range};

/// Collection of diagnostic messages from parsing and analysis.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    messages: Vec<DiagnosticMessage>,
}

/// Builder for one message; dropped without [`DiagnosticBuilder::emit`]
/// the message is lost, hence the `must_use`.
#[must_use = "diagnostic not emitted, call .emit()"]
pub struct DiagnosticBuilder<'a> {
    diagnostics: &'a mut Diagnostics,
    message: DiagnosticMessage,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(
        &mut self,
        msg: impl Into<String>,
        file: FileId,
        range: Range,
    ) -> DiagnosticBuilder<'_> {
        DiagnosticBuilder {
            diagnostics: self,
            message: DiagnosticMessage::new(Severity::Error, file, range, msg),
        }
    }

    pub fn warning(
        &mut self,
        msg: impl Into<String>,
        file: FileId,
        range: Range,
    ) -> DiagnosticBuilder<'_> {
        DiagnosticBuilder {
            diagnostics: self,
            message: DiagnosticMessage::new(Severity::Warning, file, range, msg),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn has_errors(&self) -> bool {
        self.messages.iter().any(|d| d.is_error())
    }

    pub fn error_count(&self) -> usize {
        self.messages.iter().filter(|d| d.is_error()).count()
    }

    pub fn warning_count(&self) -> usize {
        self.messages.iter().filter(|d| d.is_warning()).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DiagnosticMessage> {
        self.messages.iter()
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.messages.extend(other.messages);
    }

    pub fn printer(&self) -> DiagnosticsPrinter<'_, '_> {
        DiagnosticsPrinter::new(self)
    }
}

impl<'a> DiagnosticBuilder<'a> {
    /// Attach a secondary location (e.g. the first definition site of a
    /// duplicated rule).
    pub fn related_to(
        mut self,
        msg: impl Into<String>,
        file: FileId,
        range: Range,
    ) -> Self {
        self.message.related.push(RelatedInfo::new(file, range, msg));
        self
    }

    pub fn emit(self) {
        self.diagnostics.messages.push(self.message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_and_counts() {
        let mut diag = Diagnostics::new();
        diag.error("boom", FileId(0), Range::new(0, 1)).emit();
        diag.warning("meh", FileId(0), Range::new(2, 3)).emit();
        assert_eq!(diag.len(), 2);
        assert!(diag.has_errors());
        assert_eq!(diag.error_count(), 1);
        assert_eq!(diag.warning_count(), 1);
    }
}
