//! Runtime for compiled NormCode plans.
//!
//! The orchestrator executes the two repositories cycle by cycle: it picks
//! ready inferences off the blackboard, runs the matching agent sequence,
//! writes results into the concept store, and checkpoints at cycle
//! boundaries. Body faculties (LLM, filesystem, scripts, user input) sit
//! behind the [`PerceptionRouter`] capability interface; nothing else in
//! the runtime touches I/O except the [`CheckpointStore`].

#[cfg(test)]
mod orchestrator_tests;

pub mod blackboard;
pub mod cancel;
pub mod checkpoint;
pub mod orchestrator;
pub mod paradigm;
pub mod router;
pub mod run;
pub mod sequences;
pub mod testkit;
pub mod workspace;

pub use blackboard::{Blackboard, BlackboardEntry, Status};
pub use cancel::CancelToken;
pub use checkpoint::{CheckpointStore, ReconciliationMode, Snapshot};
pub use orchestrator::{Orchestrator, RunOutcome, RunPolicy, RunState};
pub use paradigm::{ComposedFunction, ParadigmError, ParadigmLibrary, ParadigmSpec};
pub use router::{BodyFaculty, FacultyError, LiteralFaculty, PerceptionRouter, RouterError};
pub use run::{RunError, RunRecord, Runtime};
pub use sequences::{SequenceError, SequenceOutcome};
pub use workspace::{IterationRecord, Workspace, WorkspaceTable};
