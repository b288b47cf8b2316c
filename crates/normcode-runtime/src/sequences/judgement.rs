//! The judgement sequence: imperative stages plus TIA.
//!
//! TIA applies the assertion's quantifier to the TVA result, producing a
//! `%{truth_value}` Reference — element-wise for `for-each`, collapsed to
//! a singleton for `all` / `any`.

use normcode_core::{
    Element, Inference, JudgementWi, PerceptualSign, Quantifier, Reference, element_action,
};

use crate::paradigm;

use super::{ExecutionContext, SequenceError, imperative, materialize, resolve};

pub fn run(
    inference: &Inference,
    wi: &JudgementWi,
    ctx: &mut ExecutionContext<'_>,
) -> Result<Reference, SequenceError> {
    let imperative_wi = &wi.imperative;

    let inputs: Vec<Reference> = imperative_wi
        .value_order
        .iter()
        .map(|c| resolve(ctx, c))
        .collect::<Result<_, _>>()?;

    let spec = ctx.paradigms.get(&imperative_wi.paradigm)?;
    let vertical = ctx
        .concepts
        .binding(&inference.function_concept)
        .cloned()
        .or_else(|| {
            ctx.concepts
                .get(&inference.function_concept)
                .and_then(|c| c.reference_data.clone())
        });
    let composed = paradigm::prepare(spec, vertical.as_ref(), ctx.router, ctx.cancel)?;

    let inputs: Vec<Reference> = inputs
        .iter()
        .map(|r| materialize(ctx, r))
        .collect::<Result<_, _>>()?;

    let verdicts = imperative::apply_composed(imperative_wi, &composed, &inputs, ctx)?;

    // TIA
    apply_quantifier(wi, &verdicts)
}

fn apply_quantifier(wi: &JudgementWi, verdicts: &Reference) -> Result<Reference, SequenceError> {
    let assertion = &wi.assertion_condition;
    match assertion.quantifier {
        Quantifier::ForEach => {
            let out = element_action(&[verdicts], |elems| {
                let t = truth_of(elems[0])?;
                Ok::<_, SequenceError>(Element::Sign(PerceptualSign::truth(
                    t == assertion.expected,
                )))
            })?;
            Ok(out)
        }
        Quantifier::All | Quantifier::Any => {
            let mut truths = Vec::new();
            for element in verdicts.elements() {
                if element.is_skip() {
                    continue;
                }
                truths.push(truth_of(element)?);
            }
            let collapsed = match assertion.quantifier {
                Quantifier::All => truths.iter().all(|&t| t),
                Quantifier::Any => truths.iter().any(|&t| t),
                Quantifier::ForEach => unreachable!("handled above"),
            };
            Ok(Reference::singleton(Element::Sign(PerceptualSign::truth(
                collapsed == assertion.expected,
            ))))
        }
    }
}

fn truth_of(element: &Element) -> Result<bool, SequenceError> {
    element.truthiness().ok_or_else(|| {
        SequenceError::Schema(format!(
            "judgement verdict is not boolean-valued: {element:?}"
        ))
    })
}
