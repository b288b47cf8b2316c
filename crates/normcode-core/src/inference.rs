//! Inferences and their per-sequence working interpretations.
//!
//! The working interpretation (WI) is the sequence-specific configuration
//! block of an inference. Each sequence kind carries a strongly typed
//! payload; deserialization enforces the schema when the inference
//! repository is loaded.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::concept::ConceptId;
use crate::flow::FlowIndex;

/// The seven agent-sequence kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequenceKind {
    /// Accepted alias at load time: `imperative_in_composition`.
    #[serde(alias = "imperative_in_composition")]
    Imperative,
    Judgement,
    Assigning,
    Grouping,
    Timing,
    Looping,
    Simple,
}

impl std::fmt::Display for SequenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SequenceKind::Imperative => "imperative",
            SequenceKind::Judgement => "judgement",
            SequenceKind::Assigning => "assigning",
            SequenceKind::Grouping => "grouping",
            SequenceKind::Timing => "timing",
            SequenceKind::Looping => "looping",
            SequenceKind::Simple => "simple",
        };
        f.write_str(s)
    }
}

/// How one value concept is fed into a paradigm position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueSelector {
    /// Pass the grouped tuple as-is.
    Packed,
    /// Pass the raw source element.
    Source,
    /// Pick a key out of a dict element.
    Key(String),
    /// Pick a position out of a tuple/list element.
    Index(usize),
    /// Spread a tuple across consecutive positions.
    Unpack,
}

/// WI payload for imperative inferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImperativeWi {
    pub paradigm: String,
    pub body_faculty: String,
    /// Concept ids in paradigm position order (1..N).
    pub value_order: Vec<ConceptId>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub value_selectors: IndexMap<ConceptId, ValueSelector>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_axis_on_list_output: Option<String>,
}

/// Quantifier applied by the judgement TIA stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Quantifier {
    All,
    Any,
    ForEach,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssertionCondition {
    pub quantifier: Quantifier,
    pub target: ConceptId,
    pub expected: bool,
}

/// WI payload for judgement inferences: an imperative plus the assertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgementWi {
    #[serde(flatten)]
    pub imperative: ImperativeWi,
    pub assertion_condition: AssertionCondition,
}

/// WI payload for assigning inferences, dispatched on the marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "marker")]
pub enum AssignSpec {
    /// `$=` — alias the single source.
    #[serde(rename = "=")]
    Alias,
    /// `$%` — build a Reference from literal face values, wrappers kept
    /// verbatim (`%(1)` stays the string `%(1)`).
    #[serde(rename = "%")]
    Abstraction {
        face_value: serde_json::Value,
        axis_names: Vec<String>,
    },
    /// `$.` — pick the first non-empty source.
    #[serde(rename = ".")]
    SourceSelection { assign_sources: Vec<ConceptId> },
    /// `$+` — append source onto destination along axes.
    #[serde(rename = "+")]
    Extension {
        assign_source: ConceptId,
        assign_destination: ConceptId,
        by_axes: Vec<String>,
    },
    /// `$-` — select by structural coordinate.
    #[serde(rename = "-")]
    Selection { selector: IndexMap<String, usize> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssigningWi {
    #[serde(flatten)]
    pub spec: AssignSpec,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupingMarker {
    /// Cross-product sources into tuple elements (no new axis).
    In,
    /// Join sources along a created axis.
    Across,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupingWi {
    pub marker: GroupingMarker,
    pub sources: Vec<ConceptId>,
    /// `None` -> output shape `(1,)`; `Some(a)` -> shape `(N,)` along `a`.
    pub create_axis: Option<String>,
    /// Axes kept per source when collapsing, one list per source.
    #[serde(default)]
    pub by_axes: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimingMarker {
    /// `@:'` — run iff condition truthy.
    #[serde(rename = "if")]
    If,
    /// `@:!` — run iff condition falsy.
    #[serde(rename = "if!")]
    IfNot,
    /// `@.` — run once the condition concept completed.
    #[serde(rename = "after")]
    After,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingWi {
    pub marker: TimingMarker,
    pub condition: ConceptId,
}

/// WI payload for looping inferences. Field names follow the repository
/// format of the loop runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopingWi {
    pub loop_index: String,
    #[serde(rename = "LoopBaseConcept")]
    pub loop_base: ConceptId,
    #[serde(rename = "CurrentLoopBaseConcept")]
    pub current_loop_base: ConceptId,
    /// Axis name the per-iteration outputs are joined along.
    pub group_base: String,
    /// Concepts read across iterations, name -> iteration offset.
    #[serde(rename = "InLoopConcept", default)]
    pub in_loop: IndexMap<ConceptId, i64>,
    #[serde(rename = "ConceptToInfer")]
    pub concept_to_infer: ConceptId,
}

/// The sum of all sequence-specific payloads, tagged by sequence kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "sequence", rename_all = "snake_case")]
pub enum WorkingInterpretation {
    #[serde(alias = "imperative_in_composition")]
    Imperative(ImperativeWi),
    Judgement(JudgementWi),
    Assigning(AssigningWi),
    Grouping(GroupingWi),
    Timing(TimingWi),
    Looping(LoopingWi),
    Simple,
}

impl WorkingInterpretation {
    pub fn sequence_kind(&self) -> SequenceKind {
        match self {
            WorkingInterpretation::Imperative(_) => SequenceKind::Imperative,
            WorkingInterpretation::Judgement(_) => SequenceKind::Judgement,
            WorkingInterpretation::Assigning(_) => SequenceKind::Assigning,
            WorkingInterpretation::Grouping(_) => SequenceKind::Grouping,
            WorkingInterpretation::Timing(_) => SequenceKind::Timing,
            WorkingInterpretation::Looping(_) => SequenceKind::Looping,
            WorkingInterpretation::Simple => SequenceKind::Simple,
        }
    }
}

/// One execution unit of a compiled plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inference {
    pub flow_index: FlowIndex,
    pub concept_to_infer: ConceptId,
    pub function_concept: ConceptId,
    #[serde(default)]
    pub value_concepts: Vec<ConceptId>,
    #[serde(default)]
    pub context_concepts: Vec<ConceptId>,
    pub working_interpretation: WorkingInterpretation,
}

impl Inference {
    pub fn sequence_kind(&self) -> SequenceKind {
        self.working_interpretation.sequence_kind()
    }
}

