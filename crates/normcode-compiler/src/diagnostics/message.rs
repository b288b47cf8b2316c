//! Diagnostic message types.

use crate::span::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Severity {
    #[default]
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// Classification of a compiler diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    // Parse
    IndentError,
    UnknownMarker,
    BadAnnotation,
    UnbalancedBrackets,
    DuplicateAnnotation,
    // Structure (formalization)
    StructureError,
    // Activation
    SchemaError,
    ResourceError,
    // Post-formalization shape analysis
    AxisMismatch,
}

impl DiagnosticKind {
    pub fn default_message(self) -> &'static str {
        match self {
            DiagnosticKind::IndentError => "indentation must be a multiple of 4 spaces",
            DiagnosticKind::UnknownMarker => "unknown line marker",
            DiagnosticKind::BadAnnotation => "malformed annotation",
            DiagnosticKind::UnbalancedBrackets => "unbalanced brackets in concept name",
            DiagnosticKind::DuplicateAnnotation => "duplicate annotation on this line",
            DiagnosticKind::StructureError => "invalid plan structure",
            DiagnosticKind::SchemaError => "working interpretation is incomplete",
            DiagnosticKind::ResourceError => "provisioned resource is missing",
            DiagnosticKind::AxisMismatch => "reference axes do not line up",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DiagnosticKind::IndentError => "IndentError",
            DiagnosticKind::UnknownMarker => "UnknownMarker",
            DiagnosticKind::BadAnnotation => "BadAnnotation",
            DiagnosticKind::UnbalancedBrackets => "UnbalancedBrackets",
            DiagnosticKind::DuplicateAnnotation => "DuplicateAnnotation",
            DiagnosticKind::StructureError => "StructureError",
            DiagnosticKind::SchemaError => "SchemaError",
            DiagnosticKind::ResourceError => "ResourceError",
            DiagnosticKind::AxisMismatch => "AxisMismatch",
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct DiagnosticMessage {
    pub(crate) severity: Severity,
    pub(crate) kind: DiagnosticKind,
    pub(crate) span: Span,
    pub(crate) message: String,
    pub(crate) related: Vec<(Span, String)>,
}

impl DiagnosticMessage {
    pub(crate) fn error(kind: DiagnosticKind, span: Span) -> Self {
        Self {
            severity: Severity::Error,
            kind,
            span,
            message: kind.default_message().to_string(),
            related: Vec::new(),
        }
    }

    pub(crate) fn warning(kind: DiagnosticKind, span: Span) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(kind, span)
        }
    }

    pub(crate) fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}
