//! Compiler diagnostics: collection, builder, and rendering.

mod message;
mod printer;


use crate::span::Span;

pub use message::{DiagnosticKind, Severity};
pub use printer::DiagnosticsPrinter;

use message::DiagnosticMessage;

/// Collection of diagnostic messages from parsing and the compiler passes.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    messages: Vec<DiagnosticMessage>,
}

/// Builder for one diagnostic.
#[must_use = "diagnostic not emitted, call .emit()"]
pub struct DiagnosticBuilder<'a> {
    diagnostics: &'a mut Diagnostics,
    message: DiagnosticMessage,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&mut self, kind: DiagnosticKind, span: Span) -> DiagnosticBuilder<'_> {
        DiagnosticBuilder {
            diagnostics: self,
            message: DiagnosticMessage::error(kind, span),
        }
    }

    pub fn warn(&mut self, kind: DiagnosticKind, span: Span) -> DiagnosticBuilder<'_> {
        DiagnosticBuilder {
            diagnostics: self,
            message: DiagnosticMessage::warning(kind, span),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn has_errors(&self) -> bool {
        self.messages.iter().any(|m| m.is_error())
    }

    pub fn error_count(&self) -> usize {
        self.messages.iter().filter(|m| m.is_error()).count()
    }

    pub fn warning_count(&self) -> usize {
        self.messages.iter().filter(|m| !m.is_error()).count()
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.messages.extend(other.messages);
    }

    pub(crate) fn messages(&self) -> &[DiagnosticMessage] {
        &self.messages
    }

    /// Kinds of all collected messages, in order. Test helper.
    pub fn kinds(&self) -> Vec<DiagnosticKind> {
        self.messages.iter().map(|m| m.kind).collect()
    }

    pub fn printer<'a>(&'a self, source: &'a str) -> DiagnosticsPrinter<'a> {
        DiagnosticsPrinter::new(self, source)
    }
}

impl DiagnosticBuilder<'_> {
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message.message = message.into();
        self
    }

    pub fn related_to(mut self, message: impl Into<String>, span: Span) -> Self {
        self.message.related.push((span, message.into()));
        self
    }

    pub fn emit(self) {
        self.diagnostics.messages.push(self.message);
    }
}
