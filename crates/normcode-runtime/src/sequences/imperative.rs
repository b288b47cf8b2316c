//! The imperative sequence: IWI -> IR -> MFP -> MVP -> TVA -> OR.

use serde_json::Value;

use normcode_core::{
    ActionOutput, Element, ImperativeWi, Inference, Reference, ValueSelector, cross_product,
    cross_action,
};

use crate::paradigm::{self, ComposedFunction};

use super::{ExecutionContext, SequenceError, materialize, resolve};

pub fn run(
    inference: &Inference,
    wi: &ImperativeWi,
    ctx: &mut ExecutionContext<'_>,
) -> Result<Reference, SequenceError> {
    // IR: inputs in paradigm position order.
    let inputs: Vec<Reference> = wi
        .value_order
        .iter()
        .map(|c| resolve(ctx, c))
        .collect::<Result<_, _>>()?;

    // MFP: compose the paradigm against the function concept's vertical
    // state. Resource reads happen here, once per inference.
    let spec = ctx.paradigms.get(&wi.paradigm)?;
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

    if ctx.cancel.is_cancelled() {
        return Err(SequenceError::Cancelled);
    }

    // MVP: signs become concrete data.
    let inputs: Vec<Reference> = inputs
        .iter()
        .map(|r| materialize(ctx, r))
        .collect::<Result<_, _>>()?;

    // TVA: apply the composed function across the aligned inputs.
    apply_composed(wi, &composed, &inputs, ctx)
}

/// TVA shared with judgement: one application per aligned position.
pub(super) fn apply_composed(
    wi: &ImperativeWi,
    composed: &ComposedFunction,
    inputs: &[Reference],
    ctx: &ExecutionContext<'_>,
) -> Result<Reference, SequenceError> {
    let vals = if inputs.is_empty() {
        Reference::singleton(Element::Tuple(Vec::new()))
    } else {
        let refs: Vec<&Reference> = inputs.iter().collect();
        cross_product(&refs)?
    };
    let funcs = Reference::singleton(Element::str(composed.paradigm()));

    let list_output = composed.is_list_output() || wi.create_axis_on_list_output.is_some();
    let result_axis = wi
        .create_axis_on_list_output
        .clone()
        .or_else(|| list_output.then(|| "items".to_string()));

    let out = cross_action(
        &funcs,
        &vals,
        result_axis.as_deref(),
        |_func, val| -> Result<ActionOutput, SequenceError> {
            let Element::Tuple(items) = val else {
                return Err(SequenceError::Schema(
                    "aligned values did not pack into a tuple".to_string(),
                ));
            };
            let args = build_args(wi, items)?;
            let value = composed
                .apply(&args, ctx.router, ctx.cancel)
                .map_err(SequenceError::Paradigm)?;
            if list_output {
                let Value::Array(values) = value else {
                    return Err(SequenceError::Schema(format!(
                        "paradigm `{}` promised a list output but returned a scalar",
                        composed.paradigm()
                    )));
                };
                Ok(ActionOutput::Many(
                    values.into_iter().map(Element::Concrete).collect(),
                ))
            } else {
                Ok(ActionOutput::One(Element::Concrete(value)))
            }
        },
    )?;

    // A created list axis replaces the degenerate singleton axis.
    if result_axis.is_some()
        && out.axes().len() > 1
        && out.axis_size(normcode_core::NONE_AXIS) == Some(1)
    {
        let keep: Vec<&str> = out
            .axes()
            .iter()
            .map(String::as_str)
            .filter(|a| *a != normcode_core::NONE_AXIS)
            .collect();
        return Ok(out.slice(&keep)?);
    }
    Ok(out)
}

/// Flatten the aligned tuple into paradigm arguments, honoring per-input
/// selectors. The tuple order is the value order.
fn build_args(wi: &ImperativeWi, items: &[Element]) -> Result<Vec<Value>, SequenceError> {
    let mut args = Vec::with_capacity(items.len());
    for (concept, element) in wi.value_order.iter().zip(items) {
        let selector = wi.value_selectors.get(concept);
        match selector {
            None | Some(ValueSelector::Source) | Some(ValueSelector::Packed) => {
                args.push(element.to_json());
            }
            Some(ValueSelector::Key(key)) => {
                let value = element
                    .as_concrete()
                    .and_then(|v| v.get(key))
                    .cloned()
                    .ok_or_else(|| {
                        SequenceError::Schema(format!(
                            "value for `{concept}` has no key `{key}`"
                        ))
                    })?;
                args.push(value);
            }
            Some(ValueSelector::Index(i)) => {
                let value = match element {
                    Element::Tuple(inner) => inner.get(*i).map(Element::to_json),
                    Element::Concrete(Value::Array(values)) => values.get(*i).cloned(),
                    _ => None,
                }
                .ok_or_else(|| {
                    SequenceError::Schema(format!(
                        "value for `{concept}` has no position {i}"
                    ))
                })?;
                args.push(value);
            }
            Some(ValueSelector::Unpack) => match element {
                Element::Tuple(inner) => args.extend(inner.iter().map(Element::to_json)),
                Element::Concrete(Value::Array(values)) => args.extend(values.iter().cloned()),
                other => {
                    return Err(SequenceError::Schema(format!(
                        "cannot unpack non-list value for `{concept}` ({other:?})"
                    )));
                }
            },
        }
    }
    Ok(args)
}
