//! The inference tree: a flat arena of plan nodes.
//!
//! Parent/child links are id pairs into one vector; the tree itself is
//! acyclic, loops exist only at runtime through the workspace.

use normcode_core::{FlowIndex, SemanticKind, SequenceKind};

use crate::span::Span;

/// Index into the tree's node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Line marker of a plan node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    /// `:<:` — the single root line.
    Root,
    /// `:>:` — explicit external input.
    Input,
    /// `<-` — value concept.
    Value,
    /// `<=` — functional concept.
    Functional,
    /// `<*` — context concept.
    Context,
}

impl Marker {
    pub fn text(self) -> &'static str {
        match self {
            Marker::Root => ":<:",
            Marker::Input => ":>:",
            Marker::Value => "<-",
            Marker::Functional => "<=",
            Marker::Context => "<*",
        }
    }
}

/// Inline clausal marker carried by a concept line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Clausal {
    /// `<:{N}>` — explicit value-binding position.
    ValueBinding(u32),
    /// `<$!{axis}>` — axis name tag.
    AxisTag(String),
    /// `<$(x)%>` — inline face value, wrapper kept verbatim.
    FaceTag(String),
    /// `*N` — in-loop iteration offset.
    LoopOffset(i64),
}

/// Annotation family: `?{...}` or `%{...}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationKind {
    Syntactical,
    Referential,
}

/// One trailing `| ...` annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub kind: AnnotationKind,
    pub key: String,
    pub value: String,
    pub span: Span,
}

/// One plan line.
#[derive(Debug, Clone)]
pub struct PlanNode {
    pub marker: Marker,
    /// Concept text as written, clausal markers included.
    pub raw_text: String,
    /// Concept name with clausal markers stripped.
    pub name: String,
    pub clausal: Vec<Clausal>,
    pub annotations: Vec<Annotation>,
    pub span: Span,
    pub line: usize,
    pub level: usize,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,

    // Filled by the formalization pass.
    pub flow_index: Option<FlowIndex>,
    pub sequence: Option<SequenceKind>,
    pub semantic: Option<SemanticKind>,
}

impl PlanNode {
    pub fn annotation(&self, key: &str) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.key == key)
    }

    pub fn annotation_value(&self, key: &str) -> Option<&str> {
        self.annotation(key).map(|a| a.value.as_str())
    }

    pub fn has_annotation(&self, key: &str) -> bool {
        self.annotation(key).is_some()
    }

    pub fn set_annotation(&mut self, kind: AnnotationKind, key: &str, value: impl Into<String>) {
        if let Some(existing) = self.annotations.iter_mut().find(|a| a.key == key) {
            existing.value = value.into();
            return;
        }
        self.annotations.push(Annotation {
            kind,
            key: key.to_string(),
            value: value.into(),
            span: self.span,
        });
    }

    pub fn loop_offset(&self) -> Option<i64> {
        self.clausal.iter().find_map(|c| match c {
            Clausal::LoopOffset(n) => Some(*n),
            _ => None,
        })
    }

    pub fn value_binding(&self) -> Option<u32> {
        self.clausal.iter().find_map(|c| match c {
            Clausal::ValueBinding(n) => Some(*n),
            _ => None,
        })
    }

    pub fn axis_tag(&self) -> Option<&str> {
        self.clausal.iter().find_map(|c| match c {
            Clausal::AxisTag(a) => Some(a.as_str()),
            _ => None,
        })
    }
}

/// The whole parsed plan.
#[derive(Debug, Clone, Default)]
pub struct PlanTree {
    nodes: Vec<PlanNode>,
    root: Option<NodeId>,
    inputs: Vec<NodeId>,
}

impl PlanTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, node: PlanNode) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    pub(crate) fn set_root(&mut self, id: NodeId) {
        self.root = Some(id);
    }

    pub(crate) fn add_input(&mut self, id: NodeId) {
        self.inputs.push(id);
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn inputs(&self) -> &[NodeId] {
        &self.inputs
    }

    pub fn node(&self, id: NodeId) -> &PlanNode {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut PlanNode {
        &mut self.nodes[id.index()]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter_ids(&self) -> impl Iterator<Item = NodeId> + use<> {
        (0..self.nodes.len() as u32).map(NodeId)
    }

    /// Pre-order walk from the root (inputs excluded).
    pub fn walk(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let Some(root) = self.root else {
            return out;
        };
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            out.push(id);
            for &child in self.node(id).children.iter().rev() {
                stack.push(child);
            }
        }
        out
    }

    /// The functional child of a node, when present and first.
    pub fn functional_child(&self, id: NodeId) -> Option<NodeId> {
        let first = *self.node(id).children.first()?;
        (self.node(first).marker == Marker::Functional).then_some(first)
    }

    /// Non-functional children, in source order.
    pub fn operand_children(&self, id: NodeId) -> Vec<NodeId> {
        self.node(id)
            .children
            .iter()
            .copied()
            .filter(|&c| self.node(c).marker != Marker::Functional)
            .collect()
    }
}
