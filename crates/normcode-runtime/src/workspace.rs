//! Per-looping-inference iteration storage.
//!
//! A workspace lives for the lifetime of its owning looping inference
//! within a run. It stores per-iteration snapshots of child concepts'
//! References; invariant concepts are not reset between iterations.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use normcode_core::{ConceptId, FlowIndex, Reference};

/// Snapshot of one finished iteration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IterationRecord {
    pub outputs: IndexMap<ConceptId, Reference>,
}

/// Mutable state of one looping inference.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Workspace {
    /// Completed iterations, in order.
    iterations: Vec<IterationRecord>,
    /// Index of the iteration currently executing, if any.
    current: Option<usize>,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of fully stored iterations.
    pub fn completed(&self) -> usize {
        self.iterations.len()
    }

    pub fn current(&self) -> Option<usize> {
        self.current
    }

    pub fn begin_iteration(&mut self, index: usize) {
        self.current = Some(index);
    }

    /// Store the finished iteration's outputs.
    pub fn store_iteration(&mut self, outputs: IndexMap<ConceptId, Reference>) {
        self.iterations.push(IterationRecord { outputs });
        self.current = None;
    }

    pub fn iteration(&self, index: usize) -> Option<&IterationRecord> {
        self.iterations.get(index)
    }

    /// A concept's Reference from a past iteration, offset back from the
    /// one about to run (`offset` 1 = previous iteration).
    pub fn lookback(
        &self,
        next_iteration: usize,
        concept: &ConceptId,
        offset: i64,
    ) -> Option<&Reference> {
        if offset <= 0 {
            return None;
        }
        let target = next_iteration.checked_sub(offset as usize)?;
        self.iterations.get(target)?.outputs.get(concept)
    }

    /// Per-iteration values of one concept, in iteration order.
    pub fn collect(&self, concept: &ConceptId) -> Vec<&Reference> {
        self.iterations
            .iter()
            .filter_map(|it| it.outputs.get(concept))
            .collect()
    }
}

/// Workspaces of all looping inferences in a run, keyed by flow index.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkspaceTable {
    workspaces: IndexMap<FlowIndex, Workspace>,
}

impl WorkspaceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, owner: &FlowIndex) -> Option<&Workspace> {
        self.workspaces.get(owner)
    }

    pub fn get_or_create(&mut self, owner: &FlowIndex) -> &mut Workspace {
        self.workspaces.entry(owner.clone()).or_default()
    }

    pub fn get_mut(&mut self, owner: &FlowIndex) -> Option<&mut Workspace> {
        self.workspaces.get_mut(owner)
    }

    /// Drop a loop's state entirely (nested loops restart per outer
    /// iteration).
    pub fn remove(&mut self, owner: &FlowIndex) {
        self.workspaces.shift_remove(owner);
    }

    pub fn is_empty(&self) -> bool {
        self.workspaces.is_empty()
    }
}
