//! Rendering diagnostics with annotate-snippets.

use std::fmt::Write;

use annotate_snippets::{AnnotationKind, Group, Level, Renderer, Snippet};

use crate::span::LineIndex;

use super::Diagnostics;
use super::message::Severity;

/// Builder for rendering diagnostics against the plan source.
pub struct DiagnosticsPrinter<'a> {
    diagnostics: &'a Diagnostics,
    source: &'a str,
    path: Option<&'a str>,
    colored: bool,
}

impl<'a> DiagnosticsPrinter<'a> {
    pub fn new(diagnostics: &'a Diagnostics, source: &'a str) -> Self {
        Self {
            diagnostics,
            source,
            path: None,
            colored: false,
        }
    }

    pub fn path(mut self, path: &'a str) -> Self {
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

    fn format(&self, w: &mut impl Write) -> std::fmt::Result {
        if self.diagnostics.is_empty() {
            return Ok(());
        }

        let renderer = if self.colored {
            Renderer::styled()
        } else {
            Renderer::plain()
        };

        for (i, diag) in self.diagnostics.messages().iter().enumerate() {
            let range = adjust_range(diag.span.into(), self.source.len());

            let mut snippet = Snippet::source(self.source).line_start(1).annotation(
                AnnotationKind::Primary
                    .span(range.clone())
                    .label(&diag.message),
            );

            if let Some(p) = self.path {
                snippet = snippet.path(p);
            }

            for (span, message) in &diag.related {
                snippet = snippet.annotation(
                    AnnotationKind::Context
                        .span(adjust_range((*span).into(), self.source.len()))
                        .label(message),
                );
            }

            let level = match diag.severity {
                Severity::Error => Level::ERROR,
                Severity::Warning => Level::WARNING,
            };
            let report: Vec<Group> = vec![level.primary_title(&diag.message).element(snippet)];

            if i > 0 {
                w.write_char('\n')?;
            }
            write!(w, "{}", renderer.render(&report))?;
        }

        Ok(())
    }

    /// One line per diagnostic: `error[Kind] at line:col: message`.
    pub fn render_plain(&self) -> String {
        let index = LineIndex::new(self.source);
        let mut out = String::new();
        for diag in self.diagnostics.messages() {
            let at = index.line_col(diag.span.start);
            let _ = writeln!(
                out,
                "{}[{}] at {}: {}",
                diag.severity,
                diag.kind.name(),
                at,
                diag.message
            );
        }
        out
    }
}

fn adjust_range(range: std::ops::Range<usize>, limit: usize) -> std::ops::Range<usize> {
    if range.start == range.end {
        return range.start..(range.start + 1).min(limit);
    }
    range
}
