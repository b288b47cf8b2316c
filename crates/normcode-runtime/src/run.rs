//! Run lifecycle: start, resume, fork, cancel, snapshot.
//!
//! A `Runtime` pairs a checkpoint store with plan repositories and drives
//! orchestrators to quiescence, checkpointing every cycle that changed
//! state. Runs share no mutable state; each gets its own orchestrator,
//! blackboard, and workspaces.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::{info, info_span};
use uuid::Uuid;

use normcode_core::{ConceptRepo, FlowIndex, InferenceRepo};

use crate::blackboard::Status;
use crate::cancel::CancelToken;
use crate::checkpoint::{self, CheckpointError, CheckpointStore, ReconciliationMode, Snapshot};
use crate::orchestrator::{Orchestrator, RunOutcome, RunPolicy, RunState};
use crate::paradigm::ParadigmLibrary;
use crate::router::PerceptionRouter;

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),
}

/// Bookkeeping for one run, persisted inside its snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: String,
    /// The run this one was forked from, if any.
    pub parent: Option<String>,
    pub cycle: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reconciliation: Option<ReconciliationMode>,
    pub started_at: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<u64>,
}

impl RunRecord {
    pub fn new(run_id: String, parent: Option<String>) -> Self {
        Self {
            run_id,
            parent,
            cycle: 0,
            reconciliation: None,
            started_at: now(),
            finished_at: None,
        }
    }
}

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn new_run_id() -> String {
    Uuid::new_v4().to_string()
}

/// The run-lifecycle API over one plan.
pub struct Runtime {
    store: CheckpointStore,
    concepts: ConceptRepo,
    inferences: InferenceRepo,
    router: Arc<PerceptionRouter>,
    paradigms: Arc<ParadigmLibrary>,
    policy: RunPolicy,
}

impl Runtime {
    pub fn new(
        store: CheckpointStore,
        concepts: ConceptRepo,
        inferences: InferenceRepo,
        router: Arc<PerceptionRouter>,
        paradigms: Arc<ParadigmLibrary>,
    ) -> Self {
        Self {
            store,
            concepts,
            inferences,
            router,
            paradigms,
            policy: RunPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RunPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn store(&self) -> &CheckpointStore {
        &self.store
    }

    fn orchestrator(&self) -> Orchestrator {
        Orchestrator::new(
            self.concepts.clone(),
            self.inferences.clone(),
            Arc::clone(&self.router),
            Arc::clone(&self.paradigms),
        )
        .with_policy(self.policy)
    }

    /// Start a fresh run and drive it to quiescence.
    pub fn start(&self) -> Result<(String, RunOutcome), RunError> {
        let run_id = new_run_id();
        let record = RunRecord::new(run_id.clone(), None);
        let mut orchestrator = self.orchestrator();
        let outcome = self.drive(record, &mut orchestrator)?;
        Ok((run_id, outcome))
    }

    /// Start a run and hand the caller its cancel token before driving.
    pub fn start_with_token(&self) -> (String, CancelToken, Orchestrator, RunRecord) {
        let run_id = new_run_id();
        let record = RunRecord::new(run_id.clone(), None);
        let orchestrator = self.orchestrator();
        let token = orchestrator.cancel_token();
        (run_id, token, orchestrator, record)
    }

    /// Drive a prepared orchestrator (from `start_with_token`).
    pub fn drive_prepared(
        &self,
        record: RunRecord,
        orchestrator: &mut Orchestrator,
    ) -> Result<RunOutcome, RunError> {
        self.drive(record, orchestrator)
    }

    /// Resume a checkpointed run.
    pub fn resume(
        &self,
        run_id: &str,
        mode: ReconciliationMode,
    ) -> Result<RunOutcome, RunError> {
        let snapshot = self.store.load(run_id)?;
        let mut record = snapshot.record.clone();
        record.reconciliation = Some(mode);
        record.finished_at = None;

        let mut orchestrator = self.orchestrator();
        self.reconcile(&mut orchestrator, &snapshot, mode);
        self.drive(record, &mut orchestrator)
    }

    /// Fork a run at its snapshot point. Future mutations live on the new
    /// id only.
    pub fn fork(&self, run_id: &str) -> Result<String, RunError> {
        Ok(self.store.fork(run_id)?)
    }

    pub fn cancel(&self, token: &CancelToken) {
        token.cancel();
    }

    /// The latest durable state of a run.
    pub fn snapshot(&self, run_id: &str) -> Result<Snapshot, RunError> {
        Ok(self.store.load(run_id)?)
    }

    fn reconcile(&self, orchestrator: &mut Orchestrator, snapshot: &Snapshot, mode: ReconciliationMode) {
        match mode {
            ReconciliationMode::Overwrite => {
                orchestrator.restore(
                    snapshot.blackboard.clone(),
                    snapshot.workspaces.clone(),
                    snapshot.bindings.clone(),
                    snapshot.record.cycle,
                );
            }
            ReconciliationMode::Patch => {
                orchestrator.restore(
                    snapshot.blackboard.clone(),
                    snapshot.workspaces.clone(),
                    snapshot.bindings.clone(),
                    snapshot.record.cycle,
                );
                let invalidated = self.changed_since(snapshot);
                for flow in &invalidated {
                    orchestrator
                        .blackboard_mut()
                        .force(flow, Status::Pending, snapshot.record.cycle);
                }
            }
            ReconciliationMode::FillGaps => {
                // Fresh blackboard; only concepts lacking a Reference take
                // the snapshot's bindings, then producers of bound
                // concepts count as completed.
                let cycle = snapshot.record.cycle;
                let mut bindings = indexmap::IndexMap::new();
                for (concept, reference) in &snapshot.bindings {
                    bindings.insert(concept.clone(), reference.clone());
                }
                orchestrator.restore(
                    crate::blackboard::Blackboard::for_plan(&self.inferences),
                    snapshot.workspaces.clone(),
                    bindings,
                    cycle,
                );
                let completed: Vec<FlowIndex> = self
                    .inferences
                    .iter()
                    .filter(|inf| snapshot.bindings.contains_key(&inf.concept_to_infer))
                    .map(|inf| inf.flow_index.clone())
                    .collect();
                for flow in completed {
                    orchestrator
                        .blackboard_mut()
                        .force(&flow, Status::Completed, cycle);
                }
            }
        }
    }

    /// Inferences whose working interpretation differs from the snapshot,
    /// plus their downstream (descendants and transitive consumers).
    fn changed_since(&self, snapshot: &Snapshot) -> Vec<FlowIndex> {
        let mut seeds: Vec<FlowIndex> = Vec::new();
        for inference in self.inferences.iter() {
            let current = checkpoint::fingerprint(inference);
            match snapshot.fingerprints.get(&inference.flow_index) {
                Some(stored) if *stored == current => {}
                _ => seeds.push(inference.flow_index.clone()),
            }
        }

        let mut invalidated: Vec<FlowIndex> = Vec::new();
        let mut queue = seeds;
        while let Some(flow) = queue.pop() {
            if invalidated.contains(&flow) {
                continue;
            }
            invalidated.push(flow.clone());
            let Some(inference) = self.inferences.get(&flow) else {
                continue;
            };
            for descendant in self.inferences.descendants_of(&flow) {
                queue.push(descendant.flow_index.clone());
            }
            for consumer in self.inferences.consumers_of(&inference.concept_to_infer) {
                queue.push(consumer.flow_index.clone());
            }
        }
        invalidated.sort();
        invalidated
    }

    /// Cycle until quiescent, checkpointing every dirty cycle.
    fn drive(
        &self,
        mut record: RunRecord,
        orchestrator: &mut Orchestrator,
    ) -> Result<RunOutcome, RunError> {
        let span = info_span!("run", run_id = %record.run_id);
        let _guard = span.enter();

        loop {
            let report = orchestrator.cycle_once();
            record.cycle = report.cycle;
            if report.changed {
                let snapshot = self.capture(orchestrator, &record, RunState::Running);
                self.store.save(&snapshot)?;
            }
            if !report.changed {
                break;
            }
        }

        let outcome = orchestrator.finish();
        record.finished_at = Some(now());
        let snapshot = self.capture(orchestrator, &record, outcome.state);
        self.store.save(&snapshot)?;
        info!(state = ?outcome.state, cycles = outcome.cycles, "run finished");
        Ok(outcome)
    }

    fn capture(
        &self,
        orchestrator: &Orchestrator,
        record: &RunRecord,
        state: RunState,
    ) -> Snapshot {
        Snapshot {
            record: record.clone(),
            blackboard: orchestrator.blackboard().clone(),
            workspaces: orchestrator.workspaces().clone(),
            bindings: orchestrator.concepts().bindings().clone(),
            fingerprints: Snapshot::fingerprints_of(&self.inferences),
            state,
        }
    }
}
