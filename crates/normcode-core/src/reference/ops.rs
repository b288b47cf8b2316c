//! Multi-reference operations: append, cross_product, join, and the two
//! action combinators.
//!
//! `append` patterns, by membership of `by_axis`:
//! - both sides have it: the target grows by the other's size along that
//!   axis, aligned element-wise on shared axes
//! - only the target has it: the other is broadcast in as one new slab
//! - the target lacks it: the axis is created at size 1 first (existing
//!   elements kept), then the append proceeds as above

use crate::element::Element;

use super::{IndexIter, Reference, ReferenceError};

/// Result of applying a function to one tensor position.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutput {
    One(Element),
    Many(Vec<Element>),
}

/// Error from an action combinator: either an algebra failure or a failure
/// raised by the applied function itself.
#[derive(Debug, thiserror::Error)]
pub enum ActionError<E> {
    #[error(transparent)]
    Reference(#[from] ReferenceError),
    #[error("{0}")]
    Apply(E),
}

/// Union of axes over several references, first occurrence wins the order.
/// Shared axes must agree on size.
fn aligned_union(refs: &[&Reference]) -> Result<(Vec<String>, Vec<usize>), ReferenceError> {
    let mut axes: Vec<String> = Vec::new();
    let mut shape: Vec<usize> = Vec::new();
    for r in refs {
        for (axis, &size) in r.axes().iter().zip(r.shape()) {
            match axes.iter().position(|a| a == axis) {
                Some(i) => {
                    if shape[i] != size {
                        return Err(ReferenceError::AxisMismatch(format!(
                            "axis `{axis}` has size {} in one input and {size} in another",
                            shape[i]
                        )));
                    }
                }
                None => {
                    axes.push(axis.clone());
                    shape.push(size);
                }
            }
        }
    }
    if axes.is_empty() {
        axes.push(super::NONE_AXIS.to_string());
        shape.push(1);
    }
    Ok((axes, shape))
}

fn coords_of<'a>(axes: &'a [String], index: &[usize]) -> Vec<(&'a str, usize)> {
    axes.iter()
        .map(String::as_str)
        .zip(index.iter().copied())
        .collect()
}

pub(super) fn append(
    target: &Reference,
    other: &Reference,
    by_axis: &str,
) -> Result<Reference, ReferenceError> {
    if !target.has_axis(by_axis) {
        // Pattern (c): create the axis at size 1, then fall through.
        let mut axes = vec![by_axis.to_string()];
        axes.extend(target.axes().iter().cloned());
        let mut shape = vec![1];
        shape.extend_from_slice(target.shape());
        let grown = Reference::new(axes, shape, target.elements().to_vec())?;
        return append(&grown, other, by_axis);
    }

    // `other`'s axes besides `by_axis` must be a subset of the target's,
    // matching in size, so element-wise alignment is well defined.
    for (axis, &size) in other.axes().iter().zip(other.shape()) {
        if axis == by_axis {
            continue;
        }
        match target.axis_size(axis) {
            Some(t) if t == size => {}
            Some(t) => {
                return Err(ReferenceError::AxisMismatch(format!(
                    "axis `{axis}` has size {t} in target and {size} in appended reference"
                )));
            }
            None => {
                return Err(ReferenceError::AxisMismatch(format!(
                    "appended reference carries axis `{axis}` unknown to the target"
                )));
            }
        }
    }

    let by_pos = target
        .axis_position(by_axis)
        .expect("by_axis present after pattern (c)");
    let target_size = target.shape()[by_pos];
    let other_size = other.axis_size(by_axis).unwrap_or(1);

    let axes = target.axes().to_vec();
    let mut shape = target.shape().to_vec();
    shape[by_pos] = target_size + other_size;

    let mut elements = Vec::with_capacity(shape.iter().product());
    for index in IndexIter::new(&shape) {
        let ix = index[by_pos];
        if ix < target_size {
            let coords = coords_of(&axes, &index);
            elements.push(target.get(&coords)?.clone());
        } else {
            let mut shifted = index.clone();
            shifted[by_pos] = ix - target_size;
            let coords = coords_of(&axes, &shifted);
            elements.push(other.get(&coords)?.clone());
        }
    }
    Reference::new(axes, shape, elements)
}

/// Align inputs on shared axes and produce the tuple tensor.
///
/// Output axes are the union of all input axes; each element is the tuple
/// `[e_1, ..., e_n]`. Any SKIP input makes the whole position SKIP.
pub fn cross_product(refs: &[&Reference]) -> Result<Reference, ReferenceError> {
    if refs.is_empty() {
        return Err(ReferenceError::Shape(
            "cross_product of zero references".to_string(),
        ));
    }
    let (axes, shape) = aligned_union(refs)?;
    let mut elements = Vec::with_capacity(shape.iter().product());
    for index in IndexIter::new(&shape) {
        let coords = coords_of(&axes, &index);
        let mut items = Vec::with_capacity(refs.len());
        let mut skipped = false;
        for r in refs {
            let e = r.get(&coords)?;
            if e.is_skip() {
                skipped = true;
                break;
            }
            items.push(e.clone());
        }
        elements.push(if skipped {
            Element::Skip
        } else {
            Element::Tuple(items)
        });
    }
    Reference::new(axes, shape, elements)
}

/// Stack references along a fresh axis at position 0.
///
/// All inputs must share identical axes and shape.
pub fn join(refs: &[&Reference], new_axis: &str) -> Result<Reference, ReferenceError> {
    let Some(first) = refs.first() else {
        return Err(ReferenceError::Shape("join of zero references".to_string()));
    };
    if first.has_axis(new_axis) {
        return Err(ReferenceError::AxisMismatch(format!(
            "join axis `{new_axis}` already present"
        )));
    }
    for r in &refs[1..] {
        if r.axes() != first.axes() || r.shape() != first.shape() {
            return Err(ReferenceError::AxisMismatch(
                "join requires identical axes and shape across inputs".to_string(),
            ));
        }
    }
    let mut axes = vec![new_axis.to_string()];
    axes.extend(first.axes().iter().cloned());
    let mut shape = vec![refs.len()];
    shape.extend_from_slice(first.shape());
    let mut elements = Vec::with_capacity(refs.len() * first.len());
    for r in refs {
        elements.extend(r.elements().iter().cloned());
    }
    Reference::new(axes, shape, elements)
}

/// Apply every function element to every aligned value element.
///
/// Output axes are the union of both inputs' axes. When `result_axis` is
/// set, list outputs are spread along it (prepended at position 0); every
/// list the function returns must have the same length, and SKIP positions
/// fill their whole column with SKIP. Without `result_axis`, list outputs
/// become tuple elements.
pub fn cross_action<E>(
    funcs: &Reference,
    vals: &Reference,
    result_axis: Option<&str>,
    mut apply: impl FnMut(&Element, &Element) -> Result<ActionOutput, E>,
) -> Result<Reference, ActionError<E>> {
    let (axes, shape) = aligned_union(&[funcs, vals])?;
    let mut outputs: Vec<ActionOutput> = Vec::with_capacity(shape.iter().product());
    for index in IndexIter::new(&shape) {
        let coords = coords_of(&axes, &index);
        let f = funcs.get(&coords)?;
        let v = vals.get(&coords)?;
        if f.is_skip() || v.is_skip() {
            outputs.push(ActionOutput::One(Element::Skip));
        } else {
            outputs.push(apply(f, v).map_err(ActionError::Apply)?);
        }
    }

    let Some(result_axis) = result_axis else {
        let elements = outputs
            .into_iter()
            .map(|out| match out {
                ActionOutput::One(e) => e,
                ActionOutput::Many(items) => Element::Tuple(items),
            })
            .collect();
        return Ok(Reference::new(axes, shape, elements)?);
    };

    let list_len = outputs
        .iter()
        .find_map(|out| match out {
            ActionOutput::Many(items) => Some(items.len()),
            ActionOutput::One(_) => None,
        })
        .unwrap_or(1);
    if list_len == 0 {
        return Err(ActionError::Reference(ReferenceError::Shape(
            "list output of length zero".to_string(),
        )));
    }

    let block: usize = shape.iter().product();
    let mut elements = vec![Element::Skip; list_len * block];
    for (pos, out) in outputs.into_iter().enumerate() {
        match out {
            ActionOutput::Many(items) => {
                if items.len() != list_len {
                    return Err(ActionError::Reference(ReferenceError::Shape(format!(
                        "list outputs disagree in length ({list_len} vs {})",
                        items.len()
                    ))));
                }
                for (l, item) in items.into_iter().enumerate() {
                    elements[l * block + pos] = item;
                }
            }
            ActionOutput::One(Element::Skip) => {
                // Whole column stays SKIP.
            }
            ActionOutput::One(e) => {
                if list_len != 1 {
                    return Err(ActionError::Reference(ReferenceError::Shape(
                        "scalar output where a list was expected".to_string(),
                    )));
                }
                elements[pos] = e;
            }
        }
    }

    let mut out_axes = vec![result_axis.to_string()];
    out_axes.extend(axes);
    let mut out_shape = vec![list_len];
    out_shape.extend(shape);
    Ok(Reference::new(out_axes, out_shape, elements)?)
}

/// Element-wise application over aligned references.
pub fn element_action<E>(
    refs: &[&Reference],
    mut apply: impl FnMut(&[&Element]) -> Result<Element, E>,
) -> Result<Reference, ActionError<E>> {
    element_action_impl(refs, |elems, _| apply(elems))
}

/// Element-wise application that also receives the position, one
/// `(axis, index)` pair per output axis.
pub fn element_action_indexed<E>(
    refs: &[&Reference],
    apply: impl FnMut(&[&Element], &[(&str, usize)]) -> Result<Element, E>,
) -> Result<Reference, ActionError<E>> {
    element_action_impl(refs, apply)
}

fn element_action_impl<E>(
    refs: &[&Reference],
    mut apply: impl FnMut(&[&Element], &[(&str, usize)]) -> Result<Element, E>,
) -> Result<Reference, ActionError<E>> {
    if refs.is_empty() {
        return Err(ActionError::Reference(ReferenceError::Shape(
            "element_action over zero references".to_string(),
        )));
    }
    let (axes, shape) = aligned_union(refs)?;
    let mut elements = Vec::with_capacity(shape.iter().product());
    for index in IndexIter::new(&shape) {
        let coords = coords_of(&axes, &index);
        let mut elems: Vec<&Element> = Vec::with_capacity(refs.len());
        let mut skipped = false;
        for r in refs {
            let e = r.get(&coords)?;
            if e.is_skip() {
                skipped = true;
                break;
            }
            elems.push(e);
        }
        if skipped {
            elements.push(Element::Skip);
        } else {
            elements.push(apply(&elems, &coords).map_err(ActionError::Apply)?);
        }
    }
    Ok(Reference::new(axes, shape, elements)?)
}
