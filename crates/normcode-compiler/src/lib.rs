//! NormCode compiler: parser, four-pass pipeline, and repository emitter.
//!
//! The crate lowers plan text through the staged pipeline
//! `PlanBuilder -> PlanParsed -> PlanFormalized -> PlanAnnotated ->
//! CompiledPlan`:
//! - `parser` - line lexer and inference-tree construction
//! - `passes` - formalization, post-formalization, activation
//! - `emit` - `.ncd` re-emission and tree dumps
//! - `diagnostics` - error collection and rendering

pub mod diagnostics;
pub mod emit;
pub mod lexer;
pub mod parser;
pub mod passes;
pub mod plan;
pub mod span;

pub use diagnostics::{DiagnosticKind, Diagnostics, DiagnosticsPrinter, Severity};
pub use plan::{CompileConfig, CompiledPlan, PlanAnnotated, PlanBuilder, PlanFormalized, PlanParsed};
pub use span::{LineIndex, Span};

/// Fatal compiler errors. Recoverable problems are reported as
/// [`Diagnostics`] instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Execution fuel exhausted (too many parser operations).
    #[error("execution limit exceeded")]
    ExecFuelExhausted,

    /// Input nested too deeply.
    #[error("recursion limit exceeded")]
    RecursionLimitExceeded,

    #[error("plan parsing failed with {} errors", .0.error_count())]
    ParseFailed(Diagnostics),

    #[error("plan compilation failed with {} errors", .0.error_count())]
    CompileFailed(Diagnostics),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Repo(#[from] normcode_core::RepoError),
}

/// Result type for compiler operations.
pub type Result<T> = std::result::Result<T, Error>;
