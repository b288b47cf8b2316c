//! Concepts: named units of meaning.

use serde::{Deserialize, Serialize};

use crate::flow::FlowIndex;
use crate::reference::Reference;

/// Stable concept identifier. Value concepts are prefixed `c-`, function
/// concepts `fc-`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConceptId(String);

impl ConceptId {
    pub fn value(n: usize) -> Self {
        Self(format!("c-{n}"))
    }

    pub fn function(n: usize) -> Self {
        Self(format!("fc-{n}"))
    }

    pub fn is_function(&self) -> bool {
        self.0.starts_with("fc-")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ConceptId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConceptId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ConceptId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Semantic kind, read off the name's brackets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticKind {
    /// `{...}`
    Object,
    /// `[...]`
    Relation,
    /// `<...>`
    Proposition,
    /// `:S:...`
    Subject,
    /// `({...})`
    Imperative,
    /// `<{...}>`
    Judgement,
}

impl SemanticKind {
    /// Classify a bracketed concept name. Longest bracket forms win.
    pub fn of_name(name: &str) -> Option<SemanticKind> {
        let name = name.trim();
        if name.starts_with(":S:") {
            return Some(SemanticKind::Subject);
        }
        if name.starts_with("({") && name.ends_with("})") {
            return Some(SemanticKind::Imperative);
        }
        if name.starts_with("<{") && name.ends_with("}>") {
            return Some(SemanticKind::Judgement);
        }
        if name.starts_with('{') && name.ends_with('}') {
            return Some(SemanticKind::Object);
        }
        if name.starts_with('[') && name.ends_with(']') {
            return Some(SemanticKind::Relation);
        }
        if name.starts_with('<') && name.ends_with('>') {
            return Some(SemanticKind::Proposition);
        }
        None
    }
}

/// The element type a concept's Reference carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementType {
    Primitive,
    DictSchema,
    PerceptualSign,
    Paradigm,
    Operator,
    TruthValue,
}

/// A named unit of meaning in the concept repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Concept {
    pub id: ConceptId,
    pub name: String,
    pub semantic_kind: SemanticKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub natural_name: Option<String>,
    #[serde(default)]
    pub is_ground: bool,
    #[serde(default)]
    pub is_final: bool,
    #[serde(default)]
    pub is_invariant: bool,
    #[serde(default)]
    pub ref_axes: Vec<String>,
    #[serde(default)]
    pub ref_shape: Vec<usize>,
    pub ref_element_type: ElementType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_data: Option<Reference>,
    #[serde(default)]
    pub flow_indices: Vec<FlowIndex>,
}

impl Concept {
    pub fn new(id: ConceptId, name: impl Into<String>, kind: SemanticKind) -> Self {
        Self {
            id,
            name: name.into(),
            semantic_kind: kind,
            natural_name: None,
            is_ground: false,
            is_final: false,
            is_invariant: false,
            ref_axes: Vec::new(),
            ref_shape: Vec::new(),
            ref_element_type: ElementType::Primitive,
            reference_data: None,
            flow_indices: Vec::new(),
        }
    }
}
