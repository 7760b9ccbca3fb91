//! Builder-pattern printer for rendering diagnostics.

use std::fmt::Write;

use annotate_snippets::{AnnotationKind, Group, Level, Renderer, Snippet};

use vireo_core::FileId;

use super::Diagnostics;
use super::message::Severity;

/// Renders diagnostics, with source snippets when the source text for
/// the primary file is supplied. Messages pointing into other files
/// fall back to a plain one-line rendering.
pub struct DiagnosticsPrinter<'d, 's> {
    diagnostics: &'d Diagnostics,
    source: Option<&'s str>,
    source_file: FileId,
    path: Option<&'s str>,
    colored: bool,
}

impl<'d, 's> DiagnosticsPrinter<'d, 's> {
    pub fn new(diagnostics: &'d Diagnostics) -> Self {
        Self {
            diagnostics,
            source: None,
            source_file: FileId(0),
            path: None,
            colored: false,
        }
    }

    /// Supply the source text for `file`, enabling snippet rendering.
    pub fn source(mut self, source: &'s str, file: FileId) -> Self {
        self.source = Some(source);
        self.source_file = file;
        self
    }

    pub fn path(mut self, path: &'s str) -> Self {
        self.path = Some(path);
        self
    }

    pub fn colored(mut self, value: bool) -> Self {
        self.colored = value;
        self
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        self.format(&mut out).expect("String write never fails");
        out
    }

    pub fn format(&self, w: &mut impl Write) -> std::fmt::Result {
        if self.diagnostics.is_empty() {
            return Ok(());
        }
        let Some(source) = self.source else {
            return self.format_plain(w);
        };

        let renderer = if self.colored {
            Renderer::styled()
        } else {
            Renderer::plain()
        };

        let mut first = true;
        for diag in self.diagnostics.iter() {
            if !first {
                w.write_char('\n')?;
            }
            first = false;

            if diag.file != self.source_file {
                writeln!(w, "{}: {}", diag.severity, diag.message)?;
                continue;
            }

            let range = clamp(diag.range.start, source.len())
                ..clamp(diag.range.end.max(diag.range.start + 1), source.len().max(1));

            let mut snippet = Snippet::source(source).line_start(1).annotation(
                AnnotationKind::Primary
                    .span(range.clone())
                    .label(&diag.message),
            );
            if let Some(p) = self.path {
                snippet = snippet.path(p);
            }
            for related in &diag.related {
                if related.file != self.source_file {
                    continue;
                }
                let rel = clamp(related.range.start, source.len())
                    ..clamp(
                        related.range.end.max(related.range.start + 1),
                        source.len().max(1),
                    );
                snippet = snippet.annotation(
                    AnnotationKind::Context.span(rel).label(&related.message),
                );
            }

            let level = severity_to_level(diag.severity);
            let report: Vec<Group> = vec![level.primary_title(&diag.message).element(snippet)];
            write!(w, "{}", renderer.render(&report))?;
        }

        Ok(())
    }

    fn format_plain(&self, w: &mut impl Write) -> std::fmt::Result {
        for diag in self.diagnostics.iter() {
            writeln!(w, "{diag}")?;
        }
        Ok(())
    }
}

fn clamp(offset: usize, len: usize) -> usize {
    offset.min(len)
}

fn severity_to_level(severity: Severity) -> Level<'static> {
    match severity {
        Severity::Error => Level::ERROR,
        Severity::Warning => Level::WARNING,
    }
}
