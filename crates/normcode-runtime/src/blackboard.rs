//! Per-run, per-inference status map.
//!
//! Owned exclusively by the orchestrator. Allowed transitions:
//! `Pending -> Ready -> InProgress -> {Completed | Failed}`,
//! `Pending -> Skipped` (from a parent timing skip), and
//! `Completed/Failed -> Pending` only through an explicit loop reset or a
//! Patch/Overwrite reconciliation.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use normcode_core::{FlowIndex, InferenceRepo};

/// Status of one inference within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Pending,
    Ready,
    InProgress,
    Completed,
    /// Completed by a timing skip; counts as produced for dependencies.
    CompletedSkipped,
    Failed,
}

impl Status {
    /// Does this status satisfy downstream dependencies?
    pub fn is_done(self) -> bool {
        matches!(self, Status::Completed | Status::CompletedSkipped)
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Status::Completed | Status::CompletedSkipped | Status::Failed
        )
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum BlackboardError {
    #[error("no entry for inference `{0}`")]
    UnknownInference(FlowIndex),
    #[error("illegal transition {from:?} -> {to:?} for `{flow_index}`")]
    IllegalTransition {
        flow_index: FlowIndex,
        from: Status,
        to: Status,
    },
}

/// State of one inference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlackboardEntry {
    pub status: Status,
    pub last_cycle: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BlackboardEntry {
    fn pending() -> Self {
        Self {
            status: Status::Pending,
            last_cycle: 0,
            error: None,
        }
    }
}

/// The status map. Every inference of the plan has exactly one entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Blackboard {
    entries: IndexMap<FlowIndex, BlackboardEntry>,
}

impl Blackboard {
    /// One Pending entry per inference.
    pub fn for_plan(inferences: &InferenceRepo) -> Self {
        let mut entries = IndexMap::new();
        for inf in inferences.iter() {
            entries.insert(inf.flow_index.clone(), BlackboardEntry::pending());
        }
        Self { entries }
    }

    pub fn entry(&self, flow_index: &FlowIndex) -> Option<&BlackboardEntry> {
        self.entries.get(flow_index)
    }

    pub fn status(&self, flow_index: &FlowIndex) -> Option<Status> {
        self.entries.get(flow_index).map(|e| e.status)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FlowIndex, &BlackboardEntry)> {
        self.entries.iter()
    }

    /// Guarded transition.
    pub fn transition(
        &mut self,
        flow_index: &FlowIndex,
        to: Status,
        cycle: u64,
    ) -> Result<(), BlackboardError> {
        let entry = self
            .entries
            .get_mut(flow_index)
            .ok_or_else(|| BlackboardError::UnknownInference(flow_index.clone()))?;
        let from = entry.status;
        let allowed = matches!(
            (from, to),
            (Status::Pending, Status::Ready)
                | (Status::Pending, Status::CompletedSkipped)
                | (Status::Ready, Status::InProgress)
                | (Status::Ready, Status::Pending)
                | (Status::InProgress, Status::Completed)
                | (Status::InProgress, Status::CompletedSkipped)
                | (Status::InProgress, Status::Failed)
                | (Status::InProgress, Status::Pending)
        );
        if !allowed {
            return Err(BlackboardError::IllegalTransition {
                flow_index: flow_index.clone(),
                from,
                to,
            });
        }
        entry.status = to;
        entry.last_cycle = cycle;
        Ok(())
    }

    pub fn record_failure(
        &mut self,
        flow_index: &FlowIndex,
        cycle: u64,
        cause: impl Into<String>,
    ) -> Result<(), BlackboardError> {
        self.transition(flow_index, Status::Failed, cycle)?;
        if let Some(entry) = self.entries.get_mut(flow_index) {
            entry.error = Some(cause.into());
        }
        Ok(())
    }

    /// Explicit reset, used by loop iteration restarts and reconciliation.
    /// This is the only door out of a terminal state.
    pub fn reset(&mut self, flow_index: &FlowIndex, cycle: u64) -> Result<(), BlackboardError> {
        let entry = self
            .entries
            .get_mut(flow_index)
            .ok_or_else(|| BlackboardError::UnknownInference(flow_index.clone()))?;
        entry.status = Status::Pending;
        entry.last_cycle = cycle;
        entry.error = None;
        Ok(())
    }

    /// Reconciliation-only escape hatch: set a status without transition
    /// checks. Resume/fork are the sole callers.
    pub(crate) fn force(&mut self, flow_index: &FlowIndex, status: Status, cycle: u64) {
        if let Some(entry) = self.entries.get_mut(flow_index) {
            entry.status = status;
            entry.last_cycle = cycle;
        }
    }

    /// Skip propagation: the whole subtree under `root` (root included)
    /// moves to Completed-Skipped. Descendants only, never siblings.
    pub fn skip_subtree(&mut self, root: &FlowIndex, cycle: u64) {
        for (flow_index, entry) in self.entries.iter_mut() {
            if root.is_prefix_of(flow_index) && !entry.status.is_terminal() {
                entry.status = Status::CompletedSkipped;
                entry.last_cycle = cycle;
            }
        }
    }

    /// All entries done or failed?
    pub fn all_settled(&self) -> bool {
        self.entries
            .values()
            .all(|e| e.status.is_terminal())
    }

    pub fn any_with_status(&self, status: Status) -> bool {
        self.entries.values().any(|e| e.status == status)
    }

    /// Pending inferences in ascending flow-index order.
    pub fn pending(&self) -> Vec<FlowIndex> {
        let mut out: Vec<FlowIndex> = self
            .entries
            .iter()
            .filter(|(_, e)| e.status == Status::Pending)
            .map(|(f, _)| f.clone())
            .collect();
        out.sort();
        out
    }
}
