//! Core data model for NormCode plans.
//!
//! Three layers:
//! - **Reference algebra**: named-axis tensors with lazy perceptual signs
//!   and explicit SKIP propagation ([`Reference`], [`Element`])
//! - **Plan model**: concepts, inferences, flow indices, and the per-sequence
//!   working interpretations ([`Concept`], [`Inference`], [`WorkingInterpretation`])
//! - **Repositories**: the two JSON artifacts the compiler produces and the
//!   runtime consumes ([`ConceptRepo`], [`InferenceRepo`])

#[cfg(test)]
mod flow_tests;
#[cfg(test)]
mod sign_tests;

pub mod concept;
pub mod element;
pub mod flow;
pub mod inference;
pub mod reference;
pub mod repo;
pub mod sign;

pub use concept::{Concept, ConceptId, ElementType, SemanticKind};
pub use element::Element;
pub use flow::{FlowIndex, FlowIndexParseError};
pub use inference::{
    AssertionCondition, AssignSpec, AssigningWi, GroupingMarker, GroupingWi, ImperativeWi, Inference,
    JudgementWi, LoopingWi, Quantifier, SequenceKind, TimingMarker, TimingWi, ValueSelector,
    WorkingInterpretation,
};
pub use reference::{
    ActionError, ActionOutput, NONE_AXIS, Reference, ReferenceError, cross_action, cross_product,
    element_action, element_action_indexed, join,
};
pub use repo::{ConceptRepo, InferenceRepo, RepoError};
pub use sign::{PerceptualSign, SignParseError, norm};
