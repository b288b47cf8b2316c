use std::sync::Arc;

use normcode_core::{
    AssignSpec, AssigningWi, Concept, ConceptRepo, Element, ElementType, ImperativeWi, Inference,
    InferenceRepo, Reference, SemanticKind, TimingMarker, TimingWi, WorkingInterpretation,
};

use crate::paradigm::ParadigmLibrary;
use crate::router::{LiteralFaculty, PerceptionRouter};

use crate::blackboard::Status;
use crate::orchestrator::*;

fn concept(id: &str, name: &str) -> Concept {
    let mut c = Concept::new(id.into(), name, SemanticKind::Object);
    c.ref_element_type = ElementType::Primitive;
    c
}

fn ground(id: &str, name: &str, value: &str) -> Concept {
    let mut c = concept(id, name);
    c.is_ground = true;
    c.reference_data = Some(Reference::singleton(Element::str(value)));
    c
}

fn alias(flow: &str, target: &str, source: &str) -> Inference {
    Inference {
        flow_index: flow.parse().unwrap(),
        concept_to_infer: target.into(),
        function_concept: "fc-1".into(),
        value_concepts: vec![source.into()],
        context_concepts: vec![],
        working_interpretation: WorkingInterpretation::Assigning(AssigningWi {
            spec: AssignSpec::Alias,
        }),
    }
}

fn router() -> Arc<PerceptionRouter> {
    Arc::new(
        PerceptionRouter::builder()
            .faculty(
                Arc::new(LiteralFaculty::new()),
                &["literal", "truth_value", "in-memory"],
            )
            .build(),
    )
}

fn orchestrator(concepts: ConceptRepo, inferences: InferenceRepo) -> Orchestrator {
    Orchestrator::new(
        concepts,
        inferences,
        router(),
        Arc::new(ParadigmLibrary::new()),
    )
}

#[test]
fn alias_chain_completes_in_dependency_order() {
    let mut concepts = ConceptRepo::new();
    concepts.insert(ground("c-1", "{x}", "seed")).unwrap();
    concepts.insert(concept("c-2", "{mid}")).unwrap();
    concepts.insert(concept("c-3", "{out}")).unwrap();
    concepts.insert(concept("fc-1", "$=")).unwrap();

    let mut inferences = InferenceRepo::new();
    // Root consumes {mid}, which a sibling produces from the ground {x}.
    inferences.insert(alias("1", "c-3", "c-2")).unwrap();
    inferences.insert(alias("1.2", "c-2", "c-1")).unwrap();

    let mut orch = orchestrator(concepts, inferences);
    let outcome = orch.run_to_end();

    assert_eq!(outcome.state, RunState::Completed);
    assert!(outcome.unsettled.is_empty());
    assert_eq!(
        orch.concepts().binding(&"c-3".into()).unwrap().elements()[0],
        Element::str("seed")
    );
    // The producer ran in an earlier or equal cycle than the consumer.
    let producer_cycle = orch
        .blackboard()
        .entry(&"1.2".parse().unwrap())
        .unwrap()
        .last_cycle;
    let consumer_cycle = orch
        .blackboard()
        .entry(&"1".parse().unwrap())
        .unwrap()
        .last_cycle;
    assert!(producer_cycle <= consumer_cycle);
}

#[test]
fn missing_paradigm_fails_the_inference_and_strands_dependents() {
    let mut concepts = ConceptRepo::new();
    concepts.insert(ground("c-1", "{x}", "seed")).unwrap();
    concepts.insert(concept("c-2", "{broken}")).unwrap();
    concepts.insert(concept("c-3", "{dependent}")).unwrap();
    concepts.insert(concept("fc-1", "::(broken)")).unwrap();

    let mut inferences = InferenceRepo::new();
    inferences.insert(alias("1", "c-3", "c-2")).unwrap();
    inferences
        .insert(Inference {
            flow_index: "1.2".parse().unwrap(),
            concept_to_infer: "c-2".into(),
            function_concept: "fc-1".into(),
            value_concepts: vec!["c-1".into()],
            context_concepts: vec![],
            working_interpretation: WorkingInterpretation::Imperative(ImperativeWi {
                paradigm: "[h_x]-c_ghost-o_Literal".into(),
                body_faculty: "llm".into(),
                value_order: vec!["c-1".into()],
                value_selectors: indexmap::IndexMap::new(),
                create_axis_on_list_output: None,
            }),
        })
        .unwrap();

    let mut orch = orchestrator(concepts, inferences);
    let outcome = orch.run_to_end();

    assert_eq!(outcome.state, RunState::Failed);
    let failed = orch.blackboard().entry(&"1.2".parse().unwrap()).unwrap();
    assert_eq!(failed.status, Status::Failed);
    // The failure message carries flow index and inputs.
    let message = failed.error.as_deref().unwrap();
    assert!(message.contains("1.2"), "{message}");
    assert!(message.contains("c-1"), "{message}");
    // The dependent never ran.
    assert_eq!(
        orch.blackboard().status(&"1".parse().unwrap()),
        Some(Status::Pending)
    );
}

#[test]
fn unproducible_input_stalls_the_run() {
    let mut concepts = ConceptRepo::new();
    concepts.insert(concept("c-1", "{never}")).unwrap();
    concepts.insert(concept("c-2", "{out}")).unwrap();
    concepts.insert(concept("fc-1", "$=")).unwrap();

    let mut inferences = InferenceRepo::new();
    inferences.insert(alias("1", "c-2", "c-1")).unwrap();

    let mut orch = orchestrator(concepts, inferences);
    let outcome = orch.run_to_end();
    assert_eq!(outcome.state, RunState::Stalled);
    assert_eq!(outcome.unsettled, vec!["1".parse().unwrap()]);
}

#[test]
fn timing_skip_propagates_to_descendants_only() {
    let mut concepts = ConceptRepo::new();
    let mut cond = concept("c-1", "<cond>");
    cond.is_ground = true;
    cond.reference_data = Some(Reference::singleton(Element::Sign(
        normcode_core::PerceptualSign::truth(false),
    )));
    concepts.insert(cond).unwrap();
    concepts.insert(concept("c-2", "{gated}")).unwrap();
    concepts.insert(concept("c-3", "{work}")).unwrap();
    concepts.insert(ground("c-4", "{seed}", "s")).unwrap();
    concepts.insert(concept("c-5", "{independent}")).unwrap();
    concepts.insert(concept("fc-1", "@:'")).unwrap();

    let mut inferences = InferenceRepo::new();
    inferences
        .insert(Inference {
            flow_index: "1.2".parse().unwrap(),
            concept_to_infer: "c-2".into(),
            function_concept: "fc-1".into(),
            value_concepts: vec!["c-3".into()],
            context_concepts: vec![],
            working_interpretation: WorkingInterpretation::Timing(TimingWi {
                marker: TimingMarker::If,
                condition: "c-1".into(),
            }),
        })
        .unwrap();
    inferences.insert(alias("1.2.2", "c-3", "c-4")).unwrap();
    inferences.insert(alias("1.3", "c-5", "c-4")).unwrap();

    let mut orch = orchestrator(concepts, inferences);
    let outcome = orch.run_to_end();

    assert_eq!(outcome.state, RunState::Completed);
    assert_eq!(
        orch.blackboard().status(&"1.2".parse().unwrap()),
        Some(Status::CompletedSkipped)
    );
    assert_eq!(
        orch.blackboard().status(&"1.2.2".parse().unwrap()),
        Some(Status::CompletedSkipped)
    );
    // The sibling is untouched and ran normally.
    assert_eq!(
        orch.blackboard().status(&"1.3".parse().unwrap()),
        Some(Status::Completed)
    );
    // Skipped outputs exist as empty References.
    assert_eq!(
        orch.concepts().binding(&"c-2".into()).unwrap().elements()[0],
        Element::Skip
    );
}

#[test]
fn timing_gate_open_aliases_the_value_child() {
    let mut concepts = ConceptRepo::new();
    let mut cond = concept("c-1", "<cond>");
    cond.is_ground = true;
    cond.reference_data = Some(Reference::singleton(Element::Sign(
        normcode_core::PerceptualSign::truth(true),
    )));
    concepts.insert(cond).unwrap();
    concepts.insert(concept("c-2", "{gated}")).unwrap();
    concepts.insert(concept("c-3", "{work}")).unwrap();
    concepts.insert(ground("c-4", "{seed}", "payload")).unwrap();
    concepts.insert(concept("fc-1", "@:'")).unwrap();

    let mut inferences = InferenceRepo::new();
    inferences
        .insert(Inference {
            flow_index: "1.2".parse().unwrap(),
            concept_to_infer: "c-2".into(),
            function_concept: "fc-1".into(),
            value_concepts: vec!["c-3".into()],
            context_concepts: vec![],
            working_interpretation: WorkingInterpretation::Timing(TimingWi {
                marker: TimingMarker::If,
                condition: "c-1".into(),
            }),
        })
        .unwrap();
    inferences.insert(alias("1.2.2", "c-3", "c-4")).unwrap();

    let mut orch = orchestrator(concepts, inferences);
    let outcome = orch.run_to_end();
    assert_eq!(outcome.state, RunState::Completed);
    assert_eq!(
        orch.concepts().binding(&"c-2".into()).unwrap().elements()[0],
        Element::str("payload")
    );
}

#[test]
fn timing_after_waits_for_the_producer() {
    let mut concepts = ConceptRepo::new();
    concepts.insert(ground("c-1", "{seed}", "s")).unwrap();
    concepts.insert(concept("c-2", "{first}")).unwrap();
    concepts.insert(concept("c-3", "{second}")).unwrap();
    concepts.insert(concept("c-4", "{after first}")).unwrap();
    concepts.insert(concept("fc-1", "@.")).unwrap();

    let mut inferences = InferenceRepo::new();
    inferences
        .insert(Inference {
            flow_index: "1.3".parse().unwrap(),
            concept_to_infer: "c-4".into(),
            function_concept: "fc-1".into(),
            value_concepts: vec!["c-3".into()],
            context_concepts: vec![],
            working_interpretation: WorkingInterpretation::Timing(TimingWi {
                marker: TimingMarker::After,
                condition: "c-2".into(),
            }),
        })
        .unwrap();
    inferences.insert(alias("1.3.2", "c-3", "c-1")).unwrap();
    inferences.insert(alias("1.2", "c-2", "c-1")).unwrap();

    let mut orch = orchestrator(concepts, inferences);
    let outcome = orch.run_to_end();
    assert_eq!(outcome.state, RunState::Completed);
    let first = orch.blackboard().entry(&"1.2".parse().unwrap()).unwrap();
    let gate = orch.blackboard().entry(&"1.3".parse().unwrap()).unwrap();
    assert!(first.last_cycle <= gate.last_cycle);
}

#[test]
fn cancellation_terminates_between_cycles() {
    let mut concepts = ConceptRepo::new();
    concepts.insert(ground("c-1", "{x}", "v")).unwrap();
    concepts.insert(concept("c-2", "{out}")).unwrap();
    concepts.insert(concept("fc-1", "$=")).unwrap();

    let mut inferences = InferenceRepo::new();
    inferences.insert(alias("1", "c-2", "c-1")).unwrap();

    let mut orch = orchestrator(concepts, inferences);
    orch.cancel_token().cancel();
    let outcome = orch.run_to_end();
    assert_eq!(outcome.state, RunState::Cancelled);
    assert_eq!(outcome.cycles, 0);
}

#[test]
fn two_runs_share_no_state() {
    let mut concepts = ConceptRepo::new();
    concepts.insert(ground("c-1", "{x}", "v")).unwrap();
    concepts.insert(concept("c-2", "{out}")).unwrap();
    concepts.insert(concept("fc-1", "$=")).unwrap();

    let mut inferences = InferenceRepo::new();
    inferences.insert(alias("1", "c-2", "c-1")).unwrap();

    let mut a = orchestrator(concepts.clone(), inferences.clone());
    let mut b = orchestrator(concepts, inferences);
    a.run_to_end();
    b.run_to_end();

    let flows_a: Vec<String> = a.blackboard().iter().map(|(f, _)| f.to_string()).collect();
    let flows_b: Vec<String> = b.blackboard().iter().map(|(f, _)| f.to_string()).collect();
    assert_eq!(flows_a, flows_b);

    // References are independent instances: mutating one run's binding
    // leaves the other untouched.
    let binding_a = a.concepts().binding(&"c-2".into()).unwrap().clone();
    let binding_b = b.concepts().binding(&"c-2".into()).unwrap();
    assert_eq!(&binding_a, binding_b);
}
