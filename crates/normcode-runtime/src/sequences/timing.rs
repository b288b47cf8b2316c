//! The timing sequence: IWI -> T -> OWI.
//!
//! T evaluates the gate against the condition concept. `if`/`if!` read the
//! condition's latest value; `after` queries the blackboard for the
//! producer's completion. Skip is a normal return value, never an error.

use normcode_core::{Element, Inference, Reference, TimingMarker, TimingWi};

use crate::blackboard::Status;

use super::{ExecutionContext, SequenceError, SequenceOutcome, resolve};

pub fn evaluate(
    wi: &TimingWi,
    ctx: &mut ExecutionContext<'_>,
) -> Result<SequenceOutcome, SequenceError> {
    match wi.marker {
        TimingMarker::After => {
            let done = match ctx.inferences.producer_of(&wi.condition) {
                Some(producer) => ctx
                    .blackboard
                    .status(&producer.flow_index)
                    .is_some_and(Status::is_done),
                // Ground conditions count as completed once bound.
                None => resolve(ctx, &wi.condition).is_ok(),
            };
            Ok(if done {
                SequenceOutcome::GateOpen
            } else {
                SequenceOutcome::NotReady
            })
        }
        TimingMarker::If | TimingMarker::IfNot => {
            let condition = match resolve(ctx, &wi.condition) {
                Ok(reference) => reference,
                Err(SequenceError::MissingBinding(_)) => return Ok(SequenceOutcome::NotReady),
                Err(e) => return Err(e),
            };
            let Some(element) = condition.elements().first() else {
                return Ok(SequenceOutcome::NotReady);
            };
            let truthy = element.truthiness().ok_or_else(|| {
                SequenceError::Schema(format!(
                    "timing condition `{}` is not truth-valued: {element:?}",
                    wi.condition
                ))
            })?;
            let fire = match wi.marker {
                TimingMarker::If => truthy,
                TimingMarker::IfNot => !truthy,
                TimingMarker::After => unreachable!("handled above"),
            };
            Ok(if fire {
                SequenceOutcome::GateOpen
            } else {
                SequenceOutcome::Skip
            })
        }
    }
}

/// Once the gate opened and the subtree settled, the timing inference
/// completes by aliasing its value child. A skipped or valueless gate
/// produces the empty (all-SKIP) singleton.
pub fn finalize(
    inference: &Inference,
    ctx: &mut ExecutionContext<'_>,
) -> Result<Reference, SequenceError> {
    match inference.value_concepts.first() {
        Some(source) => match resolve(ctx, source) {
            Ok(reference) => Ok(reference),
            Err(SequenceError::MissingBinding(_)) => Ok(Reference::singleton(Element::Skip)),
            Err(e) => Err(e),
        },
        None => Ok(Reference::singleton(Element::Skip)),
    }
}
