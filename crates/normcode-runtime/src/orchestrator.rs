//! The cycle-driven scheduler.
//!
//! Each cycle: advance loop runners whose subtrees settled, close timing
//! gates whose subtrees settled, then pick ready inferences in ascending
//! flow-index order and run their sequences synchronously. State changes
//! are observable in cycle order; within a cycle in flow-index order, with
//! loop-runner callbacks first so a loop stores its iteration before
//! siblings run.

use std::sync::Arc;

use tracing::{debug, warn};

use normcode_core::{
    ConceptId, ConceptRepo, Element, FlowIndex, Inference, InferenceRepo, Reference, SequenceKind,
    WorkingInterpretation,
};

use crate::blackboard::{Blackboard, Status};
use crate::cancel::CancelToken;
use crate::paradigm::ParadigmLibrary;
use crate::router::PerceptionRouter;
use crate::sequences::looping::LoopStep;
use crate::sequences::{self, ExecutionContext, SequenceError, SequenceOutcome};
use crate::workspace::WorkspaceTable;

/// Terminal state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Running,
    Completed,
    /// A cycle produced no change while work remained (`ProgressStall`).
    Stalled,
    /// At least one inference failed and its dependents are unreachable.
    Failed,
    Cancelled,
}

/// How the orchestrator reacts to a failing inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunPolicy {
    /// Keep running unaffected branches (the default). When false the run
    /// stops at the first failure.
    pub continue_on_failure: bool,
}

impl Default for RunPolicy {
    fn default() -> Self {
        Self {
            continue_on_failure: true,
        }
    }
}

/// What one cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub cycle: u64,
    pub changed: bool,
}

/// Result of driving a run to quiescence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub state: RunState,
    pub cycles: u64,
    /// Flow indices still unsettled at termination, for the stall
    /// diagnostic.
    pub unsettled: Vec<FlowIndex>,
}

/// Single-threaded cooperative executor for one run. Owns the blackboard
/// and workspaces; shares faculties through the router.
pub struct Orchestrator {
    concepts: ConceptRepo,
    inferences: InferenceRepo,
    router: Arc<PerceptionRouter>,
    paradigms: Arc<ParadigmLibrary>,
    blackboard: Blackboard,
    workspaces: WorkspaceTable,
    cancel: CancelToken,
    policy: RunPolicy,
    cycle: u64,
}

impl Orchestrator {
    pub fn new(
        mut concepts: ConceptRepo,
        inferences: InferenceRepo,
        router: Arc<PerceptionRouter>,
        paradigms: Arc<ParadigmLibrary>,
    ) -> Self {
        concepts.bind_grounds();
        let blackboard = Blackboard::for_plan(&inferences);
        Self {
            concepts,
            inferences,
            router,
            paradigms,
            blackboard,
            workspaces: WorkspaceTable::new(),
            cancel: CancelToken::new(),
            policy: RunPolicy::default(),
            cycle: 0,
        }
    }

    pub fn with_policy(mut self, policy: RunPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn blackboard(&self) -> &Blackboard {
        &self.blackboard
    }

    pub fn concepts(&self) -> &ConceptRepo {
        &self.concepts
    }

    pub fn workspaces(&self) -> &WorkspaceTable {
        &self.workspaces
    }

    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Restore captured state (resume).
    pub(crate) fn restore(
        &mut self,
        blackboard: Blackboard,
        workspaces: WorkspaceTable,
        bindings: indexmap::IndexMap<ConceptId, Reference>,
        cycle: u64,
    ) {
        self.blackboard = blackboard;
        self.workspaces = workspaces;
        self.concepts.replace_bindings(bindings);
        self.cycle = cycle;
    }

    pub(crate) fn blackboard_mut(&mut self) -> &mut Blackboard {
        &mut self.blackboard
    }

    /// Drive to quiescence without checkpointing.
    pub fn run_to_end(&mut self) -> RunOutcome {
        loop {
            if self.cancel.is_cancelled() {
                return self.outcome(RunState::Cancelled);
            }
            let report = self.cycle_once();
            if !report.changed {
                return self.finish();
            }
        }
    }

    /// Classify the terminal state once no cycle makes progress.
    pub fn finish(&self) -> RunOutcome {
        if self.cancel.is_cancelled() {
            return self.outcome(RunState::Cancelled);
        }
        let failed = self.blackboard.any_with_status(Status::Failed);
        if failed {
            return self.outcome(RunState::Failed);
        }
        if self.blackboard.all_settled() {
            return self.outcome(RunState::Completed);
        }
        warn!(
            cycle = self.cycle,
            "run stalled: no change and unsettled inferences remain"
        );
        self.outcome(RunState::Stalled)
    }

    fn outcome(&self, state: RunState) -> RunOutcome {
        let unsettled = self
            .blackboard
            .iter()
            .filter(|(_, e)| !e.status.is_terminal())
            .map(|(f, _)| f.clone())
            .collect();
        RunOutcome {
            state,
            cycles: self.cycle,
            unsettled,
        }
    }

    /// One synchronous cycle.
    pub fn cycle_once(&mut self) -> CycleReport {
        self.cycle += 1;
        let cycle = self.cycle;
        let mut changed = false;

        // Loop-runner callbacks first, so a loop can advance its workspace
        // before siblings execute.
        changed |= self.advance_loops();
        // Timing gates whose subtree settled complete by aliasing.
        changed |= self.close_gates();

        let ready: Vec<FlowIndex> = self
            .blackboard
            .pending()
            .into_iter()
            .filter(|f| self.is_ready(f))
            .collect();

        for flow in ready {
            if self.cancel.is_cancelled() {
                break;
            }
            changed |= self.execute(&flow);
        }

        debug!(cycle, changed, "cycle finished");
        CycleReport { cycle, changed }
    }

    fn execute(&mut self, flow: &FlowIndex) -> bool {
        let cycle = self.cycle;
        // An earlier sibling may have skipped this entry mid-cycle.
        if self.blackboard.status(flow) != Some(Status::Pending) {
            return false;
        }
        let Some(inference) = self.inferences.get(flow).cloned() else {
            return false;
        };
        self.blackboard
            .transition(flow, Status::Ready, cycle)
            .expect("pending inference becomes ready");
        self.blackboard
            .transition(flow, Status::InProgress, cycle)
            .expect("ready inference starts");

        match inference.sequence_kind() {
            SequenceKind::Looping => self.execute_looping(&inference),
            SequenceKind::Timing => self.execute_timing(&inference),
            _ => self.execute_plain(&inference),
        }
    }

    fn execute_plain(&mut self, inference: &Inference) -> bool {
        let cycle = self.cycle;
        let flow = &inference.flow_index;
        let result = {
            let mut ctx = ExecutionContext {
                concepts: &mut self.concepts,
                inferences: &self.inferences,
                blackboard: &self.blackboard,
                router: &self.router,
                paradigms: &self.paradigms,
                cancel: &self.cancel,
            };
            sequences::run(inference, &mut ctx)
        };
        match result {
            Ok(SequenceOutcome::Completed) => {
                self.blackboard
                    .transition(flow, Status::Completed, cycle)
                    .expect("in-progress inference completes");
                true
            }
            Ok(other) => {
                // Non-timing sequences only report Completed.
                self.fail(inference, format!("unexpected outcome {other:?}"));
                true
            }
            Err(e) => {
                self.fail(inference, e.to_string());
                true
            }
        }
    }

    fn execute_timing(&mut self, inference: &Inference) -> bool {
        let cycle = self.cycle;
        let flow = &inference.flow_index;
        let result = {
            let mut ctx = ExecutionContext {
                concepts: &mut self.concepts,
                inferences: &self.inferences,
                blackboard: &self.blackboard,
                router: &self.router,
                paradigms: &self.paradigms,
                cancel: &self.cancel,
            };
            sequences::run(inference, &mut ctx)
        };
        match result {
            Ok(SequenceOutcome::GateOpen) => {
                if self.subtree_settled(flow) {
                    self.finalize_gate(inference)
                } else {
                    // Stay InProgress: the open gate lets descendants run.
                    true
                }
            }
            Ok(SequenceOutcome::Skip) => {
                self.skip_from(inference);
                true
            }
            Ok(SequenceOutcome::NotReady) => {
                self.blackboard
                    .transition(flow, Status::Pending, cycle)
                    .expect("in-progress timing goes back to pending");
                false
            }
            Ok(SequenceOutcome::Completed) => {
                self.fail(inference, "timing reported Completed from evaluate".into());
                true
            }
            Err(e) => {
                self.fail(inference, e.to_string());
                true
            }
        }
    }

    fn execute_looping(&mut self, inference: &Inference) -> bool {
        let WorkingInterpretation::Looping(wi) = inference.working_interpretation.clone() else {
            self.fail(inference, "looping inference without looping WI".into());
            return true;
        };
        let cycle = self.cycle;
        let flow = &inference.flow_index;
        let step = {
            let mut ctx = ExecutionContext {
                concepts: &mut self.concepts,
                inferences: &self.inferences,
                blackboard: &self.blackboard,
                router: &self.router,
                paradigms: &self.paradigms,
                cancel: &self.cancel,
            };
            sequences::looping::advance(inference, &wi, &mut ctx, &mut self.workspaces)
        };
        match step {
            Ok(LoopStep::Started { iteration }) => {
                debug!(flow = %flow, iteration, "loop iteration seeded");
                self.reset_loop_subtree(flow);
                true
            }
            Ok(LoopStep::Done) => {
                self.blackboard
                    .transition(flow, Status::Completed, cycle)
                    .expect("in-progress loop completes");
                true
            }
            Err(e) => {
                self.fail(inference, e.to_string());
                true
            }
        }
    }

    /// Re-enter loop runners whose current iteration finished.
    fn advance_loops(&mut self) -> bool {
        let cycle = self.cycle;
        let loops: Vec<Inference> = self
            .inferences
            .iter()
            .filter(|inf| inf.sequence_kind() == SequenceKind::Looping)
            .filter(|inf| self.blackboard.status(&inf.flow_index) == Some(Status::InProgress))
            .filter(|inf| self.subtree_settled(&inf.flow_index))
            .cloned()
            .collect();

        let mut changed = false;
        for inference in loops {
            let WorkingInterpretation::Looping(wi) = inference.working_interpretation.clone()
            else {
                continue;
            };
            let flow = &inference.flow_index;
            let step = {
                let mut ctx = ExecutionContext {
                    concepts: &mut self.concepts,
                    inferences: &self.inferences,
                    blackboard: &self.blackboard,
                    router: &self.router,
                    paradigms: &self.paradigms,
                    cancel: &self.cancel,
                };
                sequences::looping::advance(&inference, &wi, &mut ctx, &mut self.workspaces)
            };
            match step {
                Ok(LoopStep::Started { iteration }) => {
                    debug!(flow = %flow, iteration, "loop advanced");
                    self.reset_loop_subtree(flow);
                    changed = true;
                }
                Ok(LoopStep::Done) => {
                    self.blackboard
                        .transition(flow, Status::Completed, cycle)
                        .expect("in-progress loop completes");
                    changed = true;
                }
                Err(e) => {
                    self.fail(&inference, e.to_string());
                    changed = true;
                }
            }
        }
        changed
    }

    /// Complete timing inferences whose open gate's subtree settled.
    fn close_gates(&mut self) -> bool {
        let gates: Vec<Inference> = self
            .inferences
            .iter()
            .filter(|inf| inf.sequence_kind() == SequenceKind::Timing)
            .filter(|inf| self.blackboard.status(&inf.flow_index) == Some(Status::InProgress))
            .filter(|inf| self.subtree_settled(&inf.flow_index))
            .cloned()
            .collect();
        let mut changed = false;
        for inference in gates {
            changed |= self.finalize_gate(&inference);
        }
        changed
    }

    fn finalize_gate(&mut self, inference: &Inference) -> bool {
        let cycle = self.cycle;
        let flow = &inference.flow_index;
        let result = {
            let mut ctx = ExecutionContext {
                concepts: &mut self.concepts,
                inferences: &self.inferences,
                blackboard: &self.blackboard,
                router: &self.router,
                paradigms: &self.paradigms,
                cancel: &self.cancel,
            };
            sequences::timing::finalize(inference, &mut ctx).and_then(|output| {
                ctx.concepts
                    .bind(&inference.concept_to_infer, output)
                    .map_err(|e| SequenceError::Schema(e.to_string()))
            })
        };
        match result {
            Ok(()) => {
                self.blackboard
                    .transition(flow, Status::Completed, cycle)
                    .expect("open gate completes");
                true
            }
            Err(e) => {
                self.fail(inference, e.to_string());
                true
            }
        }
    }

    /// Timing skip: the whole subtree is Completed-Skipped; outputs stay
    /// empty References but count as produced.
    fn skip_from(&mut self, inference: &Inference) {
        let cycle = self.cycle;
        let root = &inference.flow_index;
        // InProgress root cannot be skipped by skip_subtree's guard.
        self.blackboard
            .transition(root, Status::CompletedSkipped, cycle)
            .expect("in-progress timing skips");
        self.blackboard.skip_subtree(root, cycle);

        let mut produced: Vec<ConceptId> = vec![inference.concept_to_infer.clone()];
        for descendant in self.inferences.descendants_of(root) {
            produced.push(descendant.concept_to_infer.clone());
        }
        for concept in produced {
            if self.concepts.binding(&concept).is_none() {
                let _ = self
                    .concepts
                    .bind(&concept, Reference::singleton(Element::Skip));
            }
        }
    }

    /// Reset every descendant inference of a loop to Pending for the next
    /// iteration. Statuses reset; invariant concepts keep their
    /// References by construction (bindings are only ever overwritten by
    /// producers).
    fn reset_loop_subtree(&mut self, root: &FlowIndex) {
        let cycle = self.cycle;
        let descendants: Vec<(FlowIndex, SequenceKind)> = self
            .inferences
            .descendants_of(root)
            .map(|inf| (inf.flow_index.clone(), inf.sequence_kind()))
            .collect();
        for (flow, kind) in descendants {
            self.blackboard
                .reset(&flow, cycle)
                .expect("loop descendants exist on the blackboard");
            // Nested loops restart from scratch each outer iteration.
            if kind == SequenceKind::Looping {
                self.workspaces.remove(&flow);
            }
        }
    }

    fn subtree_settled(&self, root: &FlowIndex) -> bool {
        self.inferences.descendants_of(root).all(|inf| {
            self.blackboard
                .status(&inf.flow_index)
                .is_some_and(Status::is_terminal)
        })
    }

    /// Readiness per the scheduling contract: pending, inputs produced,
    /// enclosing gates open, enclosing loops mid-iteration.
    fn is_ready(&self, flow: &FlowIndex) -> bool {
        if self.blackboard.status(flow) != Some(Status::Pending) {
            return false;
        }
        let Some(inference) = self.inferences.get(flow) else {
            return false;
        };

        // Enclosing gates and loops.
        for ancestor in self.ancestors_of(flow) {
            match ancestor.sequence_kind() {
                SequenceKind::Timing => {
                    let status = self.blackboard.status(&ancestor.flow_index);
                    if !matches!(status, Some(Status::InProgress) | Some(Status::Completed)) {
                        return false;
                    }
                }
                SequenceKind::Looping => {
                    let active = self.blackboard.status(&ancestor.flow_index)
                        == Some(Status::InProgress)
                        && self
                            .workspaces
                            .get(&ancestor.flow_index)
                            .is_some_and(|ws| ws.current().is_some());
                    if !active {
                        return false;
                    }
                }
                _ => {}
            }
        }

        // Timing evaluates its own condition; a loop waits on its base
        // (its value children are produced inside the loop); everything
        // else waits for its declared inputs.
        match &inference.working_interpretation {
            WorkingInterpretation::Timing(_) => true,
            WorkingInterpretation::Looping(wi) => {
                self.input_satisfied(inference, &wi.loop_base)
            }
            _ => inference
                .value_concepts
                .iter()
                .chain(&inference.context_concepts)
                .all(|concept| self.input_satisfied(inference, concept)),
        }
    }

    fn input_satisfied(&self, inference: &Inference, concept: &ConceptId) -> bool {
        // Look-back inputs are seeded by the loop runner before children
        // become ready.
        for ancestor in self.ancestors_of(&inference.flow_index) {
            if let WorkingInterpretation::Looping(wi) = &ancestor.working_interpretation {
                if wi.in_loop.get(concept).copied().unwrap_or(0) > 0 {
                    return true;
                }
            }
        }

        match self.inferences.producer_of(concept) {
            Some(producer) if producer.flow_index == inference.flow_index => {
                // Accumulators read their own concept; the binding (or its
                // absence) is handled inside the sequence.
                true
            }
            Some(producer) => self
                .blackboard
                .status(&producer.flow_index)
                .is_some_and(Status::is_done),
            None => {
                self.concepts.binding(concept).is_some()
                    || self
                        .concepts
                        .get(concept)
                        .is_some_and(|c| c.reference_data.is_some())
            }
        }
    }

    fn ancestors_of<'a>(&'a self, flow: &'a FlowIndex) -> impl Iterator<Item = &'a Inference> {
        self.inferences
            .iter()
            .filter(move |inf| inf.flow_index.is_ancestor_of(flow))
    }

    /// Record a failure with the user-visible context: flow index, inputs
    /// at failure time (signs un-transmuted), and the cause.
    fn fail(&mut self, inference: &Inference, cause: String) {
        let cycle = self.cycle;
        let inputs: Vec<String> = inference
            .value_concepts
            .iter()
            .map(|c| {
                let rendered = self
                    .concepts
                    .binding(c)
                    .map(|r| r.to_nested_json().to_string())
                    .unwrap_or_else(|| "<unbound>".to_string());
                format!("{c}={rendered}")
            })
            .collect();
        let message = format!(
            "inference {} failed: {cause} (inputs: {})",
            inference.flow_index,
            inputs.join(", ")
        );
        warn!(flow = %inference.flow_index, %cause, "inference failed");
        self.blackboard
            .record_failure(&inference.flow_index, cycle, message)
            .expect("failing inference exists");
    }
}

