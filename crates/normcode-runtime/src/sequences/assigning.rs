//! The assigning sequence: IWI -> IR -> AR -> OR.
//!
//! AR dispatches on the marker: `=` aliases, `%` builds a Reference from
//! literal face values (wrappers kept verbatim), `.` picks the first
//! non-empty source, `+` appends along an axis, `-` selects by structural
//! coordinate.

use serde_json::Value;

use normcode_core::{AssignSpec, AssigningWi, Element, Inference, Reference};

use super::{ExecutionContext, SequenceError, resolve};

pub fn run(
    inference: &Inference,
    wi: &AssigningWi,
    ctx: &mut ExecutionContext<'_>,
) -> Result<Reference, SequenceError> {
    match &wi.spec {
        AssignSpec::Alias => {
            let source = inference.value_concepts.first().ok_or_else(|| {
                SequenceError::Schema("`$=` has no source concept".to_string())
            })?;
            resolve(ctx, source)
        }

        AssignSpec::Abstraction {
            face_value,
            axis_names,
        } => abstraction(face_value, axis_names.as_slice()),

        AssignSpec::SourceSelection { assign_sources } => {
            for source in assign_sources {
                match resolve(ctx, &source) {
                    Ok(reference) if !all_skip(&reference) => return Ok(reference),
                    Ok(_) | Err(SequenceError::MissingBinding(_)) => continue,
                    Err(e) => return Err(e),
                }
            }
            Err(SequenceError::Schema(
                "`$.` found no non-empty source".to_string(),
            ))
        }

        AssignSpec::Extension {
            assign_source,
            assign_destination,
            by_axes,
        } => {
            let source = resolve(ctx, &assign_source)?;
            let axis = by_axes.first().map(String::as_str).ok_or_else(|| {
                SequenceError::Schema("`$+` needs at least one axis".to_string())
            })?;
            match resolve(ctx, &assign_destination) {
                // First extension: the source seeds the accumulator.
                Err(SequenceError::MissingBinding(_)) => Ok(source),
                Ok(destination) => Ok(destination.append(&source, axis)?),
                Err(e) => Err(e),
            }
        }

        AssignSpec::Selection { selector } => {
            let source = inference.value_concepts.first().ok_or_else(|| {
                SequenceError::Schema("`$-` has no source concept".to_string())
            })?;
            let reference = resolve(ctx, source)?;
            let coords: Vec<(&str, usize)> = selector
                .iter()
                .map(|(axis, &index)| (axis.as_str(), index))
                .collect();
            let element = reference.get(&coords)?.clone();
            Ok(Reference::singleton(element))
        }
    }
}

/// `$%`: face values become string elements verbatim; `%(1)` stays the
/// string `%(1)`.
fn abstraction(face_value: &Value, axis_names: &[String]) -> Result<Reference, SequenceError> {
    let axis = axis_names
        .first()
        .map(String::as_str)
        .unwrap_or(normcode_core::NONE_AXIS);
    match face_value {
        Value::Array(values) => {
            let elements = values.iter().map(face_element).collect();
            Ok(Reference::from_elements(axis, elements)?)
        }
        single => Ok(Reference::from_elements(axis, vec![face_element(single)])?),
    }
}

fn face_element(value: &Value) -> Element {
    match value {
        Value::String(s) => Element::str(s.clone()),
        other => Element::Concrete(other.clone()),
    }
}

fn all_skip(reference: &Reference) -> bool {
    reference.elements().iter().all(Element::is_skip)
}
