//! The loop runner (LR).
//!
//! A looping inference owns a workspace. `advance` is called by the
//! orchestrator when the loop is first scheduled and again whenever the
//! loop's subtree settles: it stashes the finished iteration, seeds the
//! next one (current element plus look-back concepts), and finally joins
//! the per-iteration outputs along the loop axis.

use indexmap::IndexMap;

use normcode_core::{ConceptId, Inference, LoopingWi, Reference, join};

use crate::workspace::WorkspaceTable;

use super::{ExecutionContext, SequenceError, resolve};

/// What the orchestrator should do after an `advance` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopStep {
    /// A new iteration is seeded; reset the subtree and run it.
    Started { iteration: usize },
    /// All elements processed; the joined output is bound.
    Done,
}

pub fn advance(
    inference: &Inference,
    wi: &LoopingWi,
    ctx: &mut ExecutionContext<'_>,
    workspaces: &mut WorkspaceTable,
) -> Result<LoopStep, SequenceError> {
    if ctx.cancel.is_cancelled() {
        return Err(SequenceError::Cancelled);
    }

    // Stash the iteration that just finished, if one was running.
    let flow = &inference.flow_index;
    if workspaces.get_or_create(flow).current().is_some() {
        let outputs = collect_outputs(wi, ctx)?;
        let workspace = workspaces
            .get_mut(flow)
            .expect("workspace exists after get_or_create");
        workspace.store_iteration(outputs);
    }

    // GR over the loop base: how many elements drive the loop.
    let base = resolve(ctx, &wi.loop_base)?;
    let total = base.len();
    let next = workspaces.get_or_create(flow).completed();

    if next >= total {
        let joined = join_outputs(wi, workspaces, flow)?;
        ctx.concepts
            .bind(&inference.concept_to_infer, joined)
            .map_err(|e| SequenceError::Schema(e.to_string()))?;
        return Ok(LoopStep::Done);
    }

    // Seed the next iteration: the current element, then look-back
    // bindings for in-loop concepts.
    let element = base.elements()[next].clone();
    ctx.concepts
        .bind(&wi.current_loop_base, Reference::singleton(element))
        .map_err(|e| SequenceError::Schema(e.to_string()))?;

    let mut seeds: Vec<(ConceptId, Reference)> = Vec::new();
    {
        let workspace = workspaces.get_or_create(flow);
        for (concept, &offset) in &wi.in_loop {
            if let Some(previous) = workspace.lookback(next, concept, offset) {
                seeds.push((concept.clone(), previous.clone()));
            }
            // No look-back available: the concept keeps its initial
            // Reference (ground data or an earlier binding).
        }
        workspace.begin_iteration(next);
    }
    for (concept, reference) in seeds {
        ctx.concepts
            .bind(&concept, reference)
            .map_err(|e| SequenceError::Schema(e.to_string()))?;
    }

    Ok(LoopStep::Started { iteration: next })
}

/// Snapshot the concepts the next iterations will want to read: the
/// per-iteration output plus every in-loop concept.
fn collect_outputs(
    wi: &LoopingWi,
    ctx: &ExecutionContext<'_>,
) -> Result<IndexMap<ConceptId, Reference>, SequenceError> {
    let mut outputs = IndexMap::new();
    for concept in std::iter::once(&wi.concept_to_infer).chain(wi.in_loop.keys()) {
        if outputs.contains_key(concept) {
            continue;
        }
        match resolve(ctx, concept) {
            Ok(reference) => {
                outputs.insert(concept.clone(), reference);
            }
            Err(SequenceError::MissingBinding(_)) => {}
            Err(e) => return Err(e),
        }
    }
    Ok(outputs)
}

fn join_outputs(
    wi: &LoopingWi,
    workspaces: &WorkspaceTable,
    flow: &normcode_core::FlowIndex,
) -> Result<Reference, SequenceError> {
    let Some(workspace) = workspaces.get(flow) else {
        return Err(SequenceError::Schema(
            "loop finished without a workspace".to_string(),
        ));
    };
    let per_iteration = workspace.collect(&wi.concept_to_infer);
    if per_iteration.is_empty() {
        return Err(SequenceError::Schema(format!(
            "loop produced no `{}` outputs to join",
            wi.concept_to_infer
        )));
    }
    Ok(join(&per_iteration, &wi.group_base)?)
}
