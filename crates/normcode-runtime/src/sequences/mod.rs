//! The agent sequences: one fixed stage pipeline per sequence kind.
//!
//! - Imperative: IWI -> IR -> MFP -> MVP -> TVA -> OR -> OWI
//! - Judgement:  IWI -> IR -> MFP -> MVP -> TVA -> TIA -> OR -> OWI
//! - Assigning:  IWI -> IR -> AR -> OR -> OWI
//! - Grouping:   IWI -> IR -> GR -> OR -> OWI
//! - Timing:     IWI -> T -> OWI
//! - Looping:    IWI -> IR -> GR -> LR -> OR -> OWI (driven by the
//!   orchestrator through [`looping::advance`])
//! - Simple:     IWI -> IR -> OR -> OWI
//!
//! Sequences are pure with respect to ordering: they read only what their
//! working interpretation declares, except Timing, which queries the
//! blackboard by design. Results are written back through the concept
//! repo; status bookkeeping (OWI) belongs to the orchestrator.

pub mod assigning;
pub mod grouping;
pub mod imperative;
pub mod judgement;
pub mod looping;
pub mod simple;
pub mod timing;

#[cfg(test)]
mod sequences_tests;

use normcode_core::{
    ConceptId, ConceptRepo, Element, Inference, InferenceRepo, Reference, ReferenceError,
    WorkingInterpretation,
};

use crate::blackboard::Blackboard;
use crate::cancel::CancelToken;
use crate::paradigm::{ParadigmError, ParadigmLibrary};
use crate::router::{PerceptionRouter, RouterError};

/// Everything a sequence is allowed to touch.
pub struct ExecutionContext<'run> {
    pub concepts: &'run mut ConceptRepo,
    pub inferences: &'run InferenceRepo,
    pub blackboard: &'run Blackboard,
    pub router: &'run PerceptionRouter,
    pub paradigms: &'run ParadigmLibrary,
    pub cancel: &'run CancelToken,
}

/// What a sequence reported back to the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub enum SequenceOutcome {
    /// The output Reference is bound; mark Completed.
    Completed,
    /// Timing: the gate is open; the inference waits for its subtree and
    /// then aliases its value child.
    GateOpen,
    /// Timing: skip fired; the subtree moves to Completed-Skipped.
    Skip,
    /// Timing: the condition is not resolved yet; stay Pending.
    NotReady,
}

#[derive(Debug, thiserror::Error)]
pub enum SequenceError {
    #[error(transparent)]
    Reference(#[from] ReferenceError),
    #[error(transparent)]
    Router(#[from] RouterError),
    #[error(transparent)]
    Paradigm(#[from] ParadigmError),
    #[error("concept `{0}` has no Reference bound")]
    MissingBinding(ConceptId),
    #[error("working interpretation is inconsistent: {0}")]
    Schema(String),
    #[error("cancelled")]
    Cancelled,
}

impl<E: Into<SequenceError>> From<normcode_core::ActionError<E>> for SequenceError {
    fn from(err: normcode_core::ActionError<E>) -> Self {
        match err {
            normcode_core::ActionError::Reference(e) => SequenceError::Reference(e),
            normcode_core::ActionError::Apply(e) => e.into(),
        }
    }
}

/// Dispatch one inference to its sequence. Looping is driven by the
/// orchestrator and never lands here.
pub fn run(
    inference: &Inference,
    ctx: &mut ExecutionContext<'_>,
) -> Result<SequenceOutcome, SequenceError> {
    if ctx.cancel.is_cancelled() {
        return Err(SequenceError::Cancelled);
    }
    match &inference.working_interpretation {
        WorkingInterpretation::Imperative(wi) => {
            let output = imperative::run(inference, wi, ctx)?;
            bind_output(inference, output, ctx)
        }
        WorkingInterpretation::Judgement(wi) => {
            let output = judgement::run(inference, wi, ctx)?;
            bind_output(inference, output, ctx)
        }
        WorkingInterpretation::Assigning(wi) => {
            let output = assigning::run(inference, wi, ctx)?;
            bind_output(inference, output, ctx)
        }
        WorkingInterpretation::Grouping(wi) => {
            let output = grouping::run(wi, ctx)?;
            bind_output(inference, output, ctx)
        }
        WorkingInterpretation::Timing(wi) => timing::evaluate(wi, ctx),
        WorkingInterpretation::Looping(_) => Err(SequenceError::Schema(
            "looping inferences advance through the orchestrator's loop runner".to_string(),
        )),
        WorkingInterpretation::Simple => {
            let output = simple::run(inference, ctx)?;
            bind_output(inference, output, ctx)
        }
    }
}

/// OR: write the produced Reference into the concept repo.
fn bind_output(
    inference: &Inference,
    output: Reference,
    ctx: &mut ExecutionContext<'_>,
) -> Result<SequenceOutcome, SequenceError> {
    ctx.concepts
        .bind(&inference.concept_to_infer, output)
        .map_err(|e| SequenceError::Schema(e.to_string()))?;
    Ok(SequenceOutcome::Completed)
}

/// IR: the current Reference of a concept — its runtime binding, or its
/// compiled-in initial data.
pub(crate) fn resolve(
    ctx: &ExecutionContext<'_>,
    concept: &ConceptId,
) -> Result<Reference, SequenceError> {
    if let Some(binding) = ctx.concepts.binding(concept) {
        return Ok(binding.clone());
    }
    if let Some(concept_entry) = ctx.concepts.get(concept) {
        if let Some(data) = &concept_entry.reference_data {
            return Ok(data.clone());
        }
    }
    Err(SequenceError::MissingBinding(concept.clone()))
}

/// MVP: transmute every sign element (tuples included) to concrete data.
pub(crate) fn materialize(
    ctx: &ExecutionContext<'_>,
    reference: &Reference,
) -> Result<Reference, SequenceError> {
    let mut out = reference.clone();
    let elements: Result<Vec<Element>, SequenceError> = reference
        .elements()
        .iter()
        .map(|e| materialize_element(ctx, e))
        .collect();
    let elements = elements?;
    for (i, element) in elements.into_iter().enumerate() {
        let index = position_of(reference, i);
        let coords: Vec<(&str, usize)> = reference
            .axes()
            .iter()
            .map(String::as_str)
            .zip(index)
            .collect();
        out.set(element, &coords)?;
    }
    Ok(out)
}

fn materialize_element(
    ctx: &ExecutionContext<'_>,
    element: &Element,
) -> Result<Element, SequenceError> {
    match element {
        Element::Sign(sign) => Ok(ctx.router.transmute(sign, ctx.cancel)?),
        Element::Tuple(items) => {
            let items: Result<Vec<Element>, SequenceError> = items
                .iter()
                .map(|e| materialize_element(ctx, e))
                .collect();
            Ok(Element::Tuple(items?))
        }
        other => Ok(other.clone()),
    }
}

/// Row-major index vector of the i-th element.
fn position_of(reference: &Reference, mut offset: usize) -> Vec<usize> {
    let shape = reference.shape();
    let mut index = vec![0; shape.len()];
    for axis in (0..shape.len()).rev() {
        index[axis] = offset % shape[axis];
        offset /= shape[axis];
    }
    index
}
