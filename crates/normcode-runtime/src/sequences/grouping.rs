//! The grouping sequence: IWI -> IR -> GR -> OR.
//!
//! Without a created axis, sources cross-product into tuple elements
//! (shape `(1,)` for singletons). With one, each source collapses to its
//! `by_axes` and the results join along the new axis.

use normcode_core::{GroupingWi, NONE_AXIS, Reference, cross_product, join};

use super::{ExecutionContext, SequenceError, resolve};

pub fn run(wi: &GroupingWi, ctx: &mut ExecutionContext<'_>) -> Result<Reference, SequenceError> {
    let sources: Vec<Reference> = wi
        .sources
        .iter()
        .map(|c| resolve(ctx, c))
        .collect::<Result<_, _>>()?;

    match &wi.create_axis {
        Some(axis) => {
            let collapsed: Vec<Reference> = sources
                .iter()
                .enumerate()
                .map(|(i, source)| collapse(source, wi.by_axes.get(i)))
                .collect::<Result<_, _>>()?;
            let refs: Vec<&Reference> = collapsed.iter().collect();
            let joined = join(&refs, axis)?;
            // Joining singletons leaves a degenerate `_none_axis`; the
            // created axis replaces it.
            if joined.axis_size(NONE_AXIS) == Some(1) {
                let keep: Vec<&str> = joined
                    .axes()
                    .iter()
                    .map(String::as_str)
                    .filter(|a| *a != NONE_AXIS)
                    .collect();
                return Ok(joined.slice(&keep)?);
            }
            Ok(joined)
        }
        None => {
            let collapsed: Vec<Reference> = sources
                .iter()
                .enumerate()
                .map(|(i, source)| collapse(source, wi.by_axes.get(i)))
                .collect::<Result<_, _>>()?;
            let refs: Vec<&Reference> = collapsed.iter().collect();
            Ok(cross_product(&refs)?)
        }
    }
}

/// Restrict a source to its kept axes. Sources already restricted to
/// exactly those axes pass through untouched.
fn collapse(source: &Reference, keep: Option<&Vec<String>>) -> Result<Reference, SequenceError> {
    let Some(keep) = keep else {
        return Ok(source.clone());
    };
    let keep_refs: Vec<&str> = keep.iter().map(String::as_str).collect();
    if source.axes().iter().map(String::as_str).eq(keep_refs.iter().copied()) {
        return Ok(source.clone());
    }
    Ok(source.slice(&keep_refs)?)
}
