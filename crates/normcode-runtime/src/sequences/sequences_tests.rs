use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::{Value, json};

use normcode_core::{
    AssertionCondition, AssignSpec, AssigningWi, Concept, ConceptId, ConceptRepo, Element,
    ElementType, GroupingMarker, GroupingWi, ImperativeWi, Inference, InferenceRepo, JudgementWi,
    NONE_AXIS, PerceptualSign, Quantifier, Reference, SemanticKind, TimingMarker, TimingWi,
    WorkingInterpretation,
};

use crate::blackboard::Blackboard;
use crate::cancel::CancelToken;
use crate::paradigm::{CompositionStep, ParadigmLibrary, ParadigmSpec, StepPhase};
use crate::router::{LiteralFaculty, PerceptionRouter};
use crate::testkit::ScriptedFaculty;

use super::*;

struct Harness {
    concepts: ConceptRepo,
    inferences: InferenceRepo,
    blackboard: Blackboard,
    router: PerceptionRouter,
    paradigms: ParadigmLibrary,
    cancel: CancelToken,
}

impl Harness {
    fn new() -> Self {
        let script = ScriptedFaculty::new("script_tool")
            .affordance("extract_digit", |args| {
                let number = args[0].as_str().unwrap_or_default();
                let digit = number.chars().next_back().unwrap_or('0');
                Ok(Value::String(digit.to_string()))
            })
            .affordance("split_digits", |args| {
                let number = args[0].as_str().unwrap_or_default();
                Ok(Value::Array(
                    number
                        .chars()
                        .map(|c| Value::String(c.to_string()))
                        .collect(),
                ))
            })
            .affordance("is_even", |args| {
                let n: i64 = args[0].as_str().unwrap_or("0").parse().unwrap_or(1);
                Ok(Value::Bool(n % 2 == 0))
            });
        let router = PerceptionRouter::builder()
            .faculty(Arc::new(script), &["script_location"])
            .faculty(
                Arc::new(LiteralFaculty::new()),
                &["literal", "truth_value", "in-memory"],
            )
            .build();

        let mut paradigms = ParadigmLibrary::new();
        paradigms
            .insert(ParadigmSpec {
                name: "[h_number][h_place]-c_extract-o_Literal".into(),
                h_inputs: vec!["h_number".into(), "h_place".into()],
                v_inputs: vec![],
                composition: vec![CompositionStep {
                    step: "c_1".into(),
                    tool: "script_tool.extract_digit".into(),
                    inputs: vec!["h_number".into(), "h_place".into()],
                    phase: StepPhase::Horizontal,
                }],
                output: "o_Literal".into(),
            })
            .unwrap();
        paradigms
            .insert(ParadigmSpec {
                name: "[h_number]-c_split-o_ListLiteral".into(),
                h_inputs: vec!["h_number".into()],
                v_inputs: vec![],
                composition: vec![CompositionStep {
                    step: "c_1".into(),
                    tool: "script_tool.split_digits".into(),
                    inputs: vec!["h_number".into()],
                    phase: StepPhase::Horizontal,
                }],
                output: "o_ListLiteral".into(),
            })
            .unwrap();
        paradigms
            .insert(ParadigmSpec {
                name: "[h_number]-c_even-o_Boolean".into(),
                h_inputs: vec!["h_number".into()],
                v_inputs: vec![],
                composition: vec![CompositionStep {
                    step: "c_1".into(),
                    tool: "script_tool.is_even".into(),
                    inputs: vec!["h_number".into()],
                    phase: StepPhase::Horizontal,
                }],
                output: "o_Boolean".into(),
            })
            .unwrap();

        Self {
            concepts: ConceptRepo::new(),
            inferences: InferenceRepo::new(),
            blackboard: Blackboard::default(),
            router,
            paradigms,
            cancel: CancelToken::new(),
        }
    }

    fn add_concept(&mut self, id: &str, name: &str) {
        let mut concept = Concept::new(id.into(), name, SemanticKind::Object);
        concept.ref_element_type = ElementType::Primitive;
        self.concepts.insert(concept).unwrap();
    }

    fn bind(&mut self, id: &str, reference: Reference) {
        self.concepts.bind(&id.into(), reference).unwrap();
    }

    fn ctx(&mut self) -> ExecutionContext<'_> {
        ExecutionContext {
            concepts: &mut self.concepts,
            inferences: &self.inferences,
            blackboard: &self.blackboard,
            router: &self.router,
            paradigms: &self.paradigms,
            cancel: &self.cancel,
        }
    }
}

fn inference(flow: &str, concept: &str, wi: WorkingInterpretation) -> Inference {
    Inference {
        flow_index: flow.parse().unwrap(),
        concept_to_infer: concept.into(),
        function_concept: "fc-1".into(),
        value_concepts: vec![],
        context_concepts: vec![],
        working_interpretation: wi,
    }
}

// S1 at the sequence level: deterministic imperative digit extraction.
#[test]
fn imperative_extracts_the_unit_digit() {
    let mut h = Harness::new();
    h.add_concept("c-1", "{number}");
    h.add_concept("c-2", "{unit place digit}?");
    h.add_concept("c-3", "{single unit place value}");
    h.add_concept("fc-1", "::(extract)");
    h.bind("c-1", Reference::singleton(Element::str("123")));
    h.bind(
        "c-2",
        Reference::singleton(Element::str("1 digit counting from the right")),
    );

    let inf = Inference {
        value_concepts: vec!["c-1".into(), "c-2".into()],
        ..inference(
            "1",
            "c-3",
            WorkingInterpretation::Imperative(ImperativeWi {
                paradigm: "[h_number][h_place]-c_extract-o_Literal".into(),
                body_faculty: "script".into(),
                value_order: vec!["c-1".into(), "c-2".into()],
                value_selectors: IndexMap::new(),
                create_axis_on_list_output: None,
            }),
        )
    };

    let mut ctx = h.ctx();
    let outcome = run(&inf, &mut ctx).unwrap();
    assert_eq!(outcome, SequenceOutcome::Completed);
    let bound = h.concepts.binding(&"c-3".into()).unwrap();
    assert_eq!(bound.elements()[0], Element::str("3"));
}

#[test]
fn imperative_materializes_signs_before_applying() {
    let mut h = Harness::new();
    h.add_concept("c-1", "{number}");
    h.add_concept("c-2", "{digit}");
    h.add_concept("fc-1", "::(extract)");
    // The input arrives as a literal sign, not concrete data.
    h.bind(
        "c-1",
        Reference::singleton(Element::Sign(PerceptualSign::new("literal", "78"))),
    );
    h.add_concept("c-9", "{place}");
    h.bind("c-9", Reference::singleton(Element::str("unit")));

    let inf = Inference {
        value_concepts: vec!["c-1".into(), "c-9".into()],
        ..inference(
            "1",
            "c-2",
            WorkingInterpretation::Imperative(ImperativeWi {
                paradigm: "[h_number][h_place]-c_extract-o_Literal".into(),
                body_faculty: "script".into(),
                value_order: vec!["c-1".into(), "c-9".into()],
                value_selectors: IndexMap::new(),
                create_axis_on_list_output: None,
            }),
        )
    };
    let mut ctx = h.ctx();
    run(&inf, &mut ctx).unwrap();
    let bound = h.concepts.binding(&"c-2".into()).unwrap();
    assert_eq!(bound.elements()[0], Element::str("8"));
}

#[test]
fn imperative_list_output_creates_an_axis() {
    let mut h = Harness::new();
    h.add_concept("c-1", "{number}");
    h.add_concept("c-2", "{digits}");
    h.add_concept("fc-1", "::(split)");
    h.bind("c-1", Reference::singleton(Element::str("405")));

    let inf = Inference {
        value_concepts: vec!["c-1".into()],
        ..inference(
            "1",
            "c-2",
            WorkingInterpretation::Imperative(ImperativeWi {
                paradigm: "[h_number]-c_split-o_ListLiteral".into(),
                body_faculty: "script".into(),
                value_order: vec!["c-1".into()],
                value_selectors: IndexMap::new(),
                create_axis_on_list_output: Some("digit position".into()),
            }),
        )
    };
    let mut ctx = h.ctx();
    run(&inf, &mut ctx).unwrap();
    let bound = h.concepts.binding(&"c-2".into()).unwrap();
    assert_eq!(bound.axes()[0], "digit position");
    assert_eq!(bound.axis_size("digit position"), Some(3));
    assert_eq!(bound.get(&[("digit position", 0)]).unwrap(), &Element::str("4"));
    assert_eq!(bound.get(&[("digit position", 2)]).unwrap(), &Element::str("5"));
}

#[test]
fn judgement_for_each_quantifier_is_element_wise() {
    let mut h = Harness::new();
    h.add_concept("c-1", "{numbers}");
    h.add_concept("c-2", "<all even>");
    h.add_concept("fc-1", "::<even>");
    h.bind(
        "c-1",
        Reference::from_elements(
            "items",
            vec![Element::str("2"), Element::str("3"), Element::str("4")],
        )
        .unwrap(),
    );

    let wi = JudgementWi {
        imperative: ImperativeWi {
            paradigm: "[h_number]-c_even-o_Boolean".into(),
            body_faculty: "script".into(),
            value_order: vec!["c-1".into()],
            value_selectors: IndexMap::new(),
            create_axis_on_list_output: None,
        },
        assertion_condition: AssertionCondition {
            quantifier: Quantifier::ForEach,
            target: "c-1".into(),
            expected: true,
        },
    };
    let inf = Inference {
        value_concepts: vec!["c-1".into()],
        ..inference("1", "c-2", WorkingInterpretation::Judgement(wi))
    };
    let mut ctx = h.ctx();
    run(&inf, &mut ctx).unwrap();
    let bound = h.concepts.binding(&"c-2".into()).unwrap();
    assert_eq!(bound.axis_size("items"), Some(3));
    let truths: Vec<&Element> = bound.elements().iter().collect();
    assert_eq!(truths[0], &Element::Sign(PerceptualSign::truth(true)));
    assert_eq!(truths[1], &Element::Sign(PerceptualSign::truth(false)));
    assert_eq!(truths[2], &Element::Sign(PerceptualSign::truth(true)));
}

#[test]
fn judgement_all_quantifier_collapses() {
    let mut h = Harness::new();
    h.add_concept("c-1", "{numbers}");
    h.add_concept("c-2", "<all even>");
    h.add_concept("fc-1", "::<even>");
    h.bind(
        "c-1",
        Reference::from_elements("items", vec![Element::str("2"), Element::str("4")]).unwrap(),
    );

    let wi = JudgementWi {
        imperative: ImperativeWi {
            paradigm: "[h_number]-c_even-o_Boolean".into(),
            body_faculty: "script".into(),
            value_order: vec!["c-1".into()],
            value_selectors: IndexMap::new(),
            create_axis_on_list_output: None,
        },
        assertion_condition: AssertionCondition {
            quantifier: Quantifier::All,
            target: "c-1".into(),
            expected: true,
        },
    };
    let inf = Inference {
        value_concepts: vec!["c-1".into()],
        ..inference("1", "c-2", WorkingInterpretation::Judgement(wi))
    };
    let mut ctx = h.ctx();
    run(&inf, &mut ctx).unwrap();
    let bound = h.concepts.binding(&"c-2".into()).unwrap();
    assert_eq!(bound.shape(), &[1]);
    assert_eq!(
        bound.elements()[0],
        Element::Sign(PerceptualSign::truth(true))
    );
}

// S3: grouping without axis creation.
#[test]
fn grouping_without_axis_packs_a_tuple() {
    let mut h = Harness::new();
    h.add_concept("c-1", "{a}");
    h.add_concept("c-2", "{b}");
    h.add_concept("c-3", "{grouped}");
    h.add_concept("fc-1", "&[#]");
    h.bind("c-1", Reference::singleton(Element::literal(1)));
    h.bind("c-2", Reference::singleton(Element::literal(2)));

    let wi = GroupingWi {
        marker: GroupingMarker::In,
        sources: vec!["c-1".into(), "c-2".into()],
        create_axis: None,
        by_axes: vec![vec![NONE_AXIS.into()], vec![NONE_AXIS.into()]],
    };
    let inf = inference("1", "c-3", WorkingInterpretation::Grouping(wi));
    let mut ctx = h.ctx();
    run(&inf, &mut ctx).unwrap();

    let bound = h.concepts.binding(&"c-3".into()).unwrap();
    assert_eq!(bound.axes(), &[NONE_AXIS.to_string()]);
    assert_eq!(bound.shape(), &[1]);
    assert_eq!(
        bound.elements()[0],
        Element::Tuple(vec![Element::literal(1), Element::literal(2)])
    );
}

// S4: grouping with axis creation.
#[test]
fn grouping_with_axis_joins_sources() {
    let mut h = Harness::new();
    h.add_concept("c-1", "{a}");
    h.add_concept("c-2", "{b}");
    h.add_concept("c-3", "{grouped}");
    h.add_concept("fc-1", "&[#]");
    h.bind("c-1", Reference::singleton(Element::literal(1)));
    h.bind("c-2", Reference::singleton(Element::literal(2)));

    let wi = GroupingWi {
        marker: GroupingMarker::Across,
        sources: vec!["c-1".into(), "c-2".into()],
        create_axis: Some("combined".into()),
        by_axes: vec![vec![NONE_AXIS.into()], vec![NONE_AXIS.into()]],
    };
    let inf = inference("1", "c-3", WorkingInterpretation::Grouping(wi));
    let mut ctx = h.ctx();
    run(&inf, &mut ctx).unwrap();

    let bound = h.concepts.binding(&"c-3".into()).unwrap();
    assert_eq!(bound.axes(), &["combined".to_string()]);
    assert_eq!(bound.shape(), &[2]);
    assert_eq!(bound.elements()[0], Element::literal(1));
    assert_eq!(bound.elements()[1], Element::literal(2));
}

#[test]
fn assigning_alias_copies_the_source() {
    let mut h = Harness::new();
    h.add_concept("c-1", "{x}");
    h.add_concept("c-2", "{alias}");
    h.add_concept("fc-1", "$=");
    h.bind("c-1", Reference::singleton(Element::str("v")));

    let inf = Inference {
        value_concepts: vec!["c-1".into()],
        ..inference(
            "1",
            "c-2",
            WorkingInterpretation::Assigning(AssigningWi {
                spec: AssignSpec::Alias,
            }),
        )
    };
    let mut ctx = h.ctx();
    run(&inf, &mut ctx).unwrap();
    assert_eq!(
        h.concepts.binding(&"c-2".into()).unwrap().elements()[0],
        Element::str("v")
    );
}

#[test]
fn assigning_source_selection_skips_empty_sources() {
    let mut h = Harness::new();
    h.add_concept("c-1", "{empty}");
    h.add_concept("c-2", "{full}");
    h.add_concept("c-3", "{picked}");
    h.add_concept("fc-1", "$.");
    h.bind("c-1", Reference::singleton(Element::Skip));
    h.bind("c-2", Reference::singleton(Element::str("value")));

    let inf = inference(
        "1",
        "c-3",
        WorkingInterpretation::Assigning(AssigningWi {
            spec: AssignSpec::SourceSelection {
                assign_sources: vec!["c-1".into(), "c-2".into()],
            },
        }),
    );
    let mut ctx = h.ctx();
    run(&inf, &mut ctx).unwrap();
    assert_eq!(
        h.concepts.binding(&"c-3".into()).unwrap().elements()[0],
        Element::str("value")
    );
}

#[test]
fn assigning_extension_appends_and_seeds() {
    let mut h = Harness::new();
    h.add_concept("c-1", "{digit}");
    h.add_concept("c-2", "{digits so far}");
    h.add_concept("fc-1", "$+");
    h.bind("c-1", Reference::singleton(Element::str("7")));

    let wi = WorkingInterpretation::Assigning(AssigningWi {
        spec: AssignSpec::Extension {
            assign_source: "c-1".into(),
            assign_destination: "c-2".into(),
            by_axes: vec![NONE_AXIS.into()],
        },
    });
    let inf = Inference {
        value_concepts: vec!["c-1".into()],
        ..inference("1", "c-2", wi)
    };

    // First run seeds the accumulator.
    let mut ctx = h.ctx();
    run(&inf, &mut ctx).unwrap();
    assert_eq!(h.concepts.binding(&"c-2".into()).unwrap().shape(), &[1]);

    // Second run appends along the axis.
    h.bind("c-1", Reference::singleton(Element::str("8")));
    let mut ctx = h.ctx();
    run(&inf, &mut ctx).unwrap();
    let bound = h.concepts.binding(&"c-2".into()).unwrap();
    assert_eq!(bound.shape(), &[2]);
    assert_eq!(bound.elements()[1], Element::str("8"));
}

#[test]
fn assigning_abstraction_keeps_wrappers() {
    let mut h = Harness::new();
    h.add_concept("c-1", "{ones}");
    h.add_concept("fc-1", "$%");

    let inf = inference(
        "1",
        "c-1",
        WorkingInterpretation::Assigning(AssigningWi {
            spec: AssignSpec::Abstraction {
                face_value: json!(["%(1)", "%(2)"]),
                axis_names: vec!["faces".into()],
            },
        }),
    );
    let mut ctx = h.ctx();
    run(&inf, &mut ctx).unwrap();
    let bound = h.concepts.binding(&"c-1".into()).unwrap();
    assert_eq!(bound.axes(), &["faces".to_string()]);
    assert_eq!(bound.elements()[0], Element::str("%(1)"));
    assert_eq!(bound.elements()[1], Element::str("%(2)"));
}

#[test]
fn assigning_selection_picks_a_coordinate() {
    let mut h = Harness::new();
    h.add_concept("c-1", "{grid}");
    h.add_concept("c-2", "{cell}");
    h.add_concept("fc-1", "$-");
    h.bind(
        "c-1",
        Reference::from_elements(
            "items",
            vec![Element::str("a"), Element::str("b"), Element::str("c")],
        )
        .unwrap(),
    );

    let inf = Inference {
        value_concepts: vec!["c-1".into()],
        ..inference(
            "1",
            "c-2",
            WorkingInterpretation::Assigning(AssigningWi {
                spec: AssignSpec::Selection {
                    selector: IndexMap::from([("items".to_string(), 1usize)]),
                },
            }),
        )
    };
    let mut ctx = h.ctx();
    run(&inf, &mut ctx).unwrap();
    assert_eq!(
        h.concepts.binding(&"c-2".into()).unwrap().elements()[0],
        Element::str("b")
    );
}

#[test]
fn timing_if_gate_opens_and_skips() {
    let mut h = Harness::new();
    h.add_concept("c-1", "<cond>");
    h.add_concept("c-2", "{gated}");
    h.add_concept("fc-1", "@:'");

    let wi = TimingWi {
        marker: TimingMarker::If,
        condition: "c-1".into(),
    };

    // Unresolved condition: not ready.
    let inf = inference("1", "c-2", WorkingInterpretation::Timing(wi.clone()));
    let mut ctx = h.ctx();
    assert_eq!(run(&inf, &mut ctx).unwrap(), SequenceOutcome::NotReady);

    // Truthy condition: gate opens.
    h.bind(
        "c-1",
        Reference::singleton(Element::Sign(PerceptualSign::truth(true))),
    );
    let mut ctx = h.ctx();
    assert_eq!(run(&inf, &mut ctx).unwrap(), SequenceOutcome::GateOpen);

    // Falsy condition: skip.
    h.bind(
        "c-1",
        Reference::singleton(Element::Sign(PerceptualSign::truth(false))),
    );
    let mut ctx = h.ctx();
    assert_eq!(run(&inf, &mut ctx).unwrap(), SequenceOutcome::Skip);
}

#[test]
fn timing_if_not_inverts() {
    let mut h = Harness::new();
    h.add_concept("c-1", "<cond>");
    h.add_concept("c-2", "{gated}");
    h.add_concept("fc-1", "@:!");
    h.bind(
        "c-1",
        Reference::singleton(Element::Sign(PerceptualSign::truth(false))),
    );

    let inf = inference(
        "1",
        "c-2",
        WorkingInterpretation::Timing(TimingWi {
            marker: TimingMarker::IfNot,
            condition: "c-1".into(),
        }),
    );
    let mut ctx = h.ctx();
    assert_eq!(run(&inf, &mut ctx).unwrap(), SequenceOutcome::GateOpen);
}

#[test]
fn skip_inputs_propagate_through_imperatives() {
    let mut h = Harness::new();
    h.add_concept("c-1", "{number}");
    h.add_concept("c-9", "{place}");
    h.add_concept("c-2", "{digit}");
    h.add_concept("fc-1", "::(extract)");
    h.bind(
        "c-1",
        Reference::from_elements("items", vec![Element::str("12"), Element::Skip]).unwrap(),
    );
    h.bind("c-9", Reference::singleton(Element::str("unit")));

    let inf = Inference {
        value_concepts: vec!["c-1".into(), "c-9".into()],
        ..inference(
            "1",
            "c-2",
            WorkingInterpretation::Imperative(ImperativeWi {
                paradigm: "[h_number][h_place]-c_extract-o_Literal".into(),
                body_faculty: "script".into(),
                value_order: vec!["c-1".into(), "c-9".into()],
                value_selectors: IndexMap::new(),
                create_axis_on_list_output: None,
            }),
        )
    };
    let mut ctx = h.ctx();
    run(&inf, &mut ctx).unwrap();
    let bound = h.concepts.binding(&"c-2".into()).unwrap();
    assert_eq!(bound.get(&[("items", 0)]).unwrap(), &Element::str("2"));
    assert_eq!(bound.get(&[("items", 1)]).unwrap(), &Element::Skip);
}

#[test]
fn missing_binding_is_reported_with_the_concept() {
    let mut h = Harness::new();
    h.add_concept("c-1", "{x}");
    h.add_concept("c-2", "{alias}");
    h.add_concept("fc-1", "$=");

    let inf = Inference {
        value_concepts: vec!["c-1".into()],
        ..inference(
            "1",
            "c-2",
            WorkingInterpretation::Assigning(AssigningWi {
                spec: AssignSpec::Alias,
            }),
        )
    };
    let mut ctx = h.ctx();
    match run(&inf, &mut ctx) {
        Err(SequenceError::MissingBinding(c)) => assert_eq!(c, ConceptId::from("c-1")),
        other => panic!("expected missing binding, got {other:?}"),
    }
}
