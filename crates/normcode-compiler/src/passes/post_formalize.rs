//! Pass 3 — post-formalization.
//!
//! Three sub-passes attach referential annotations:
//! - **re-composition**: paradigm id, body faculty, and perception norms on
//!   semantic operators (syntactic operators get nothing)
//! - **provision**: ground-concept data demands, normalized and checked for
//!   ambiguity (paths are demands here, validated at activation)
//! - **syntax re-confirmation**: `%{ref_axes}` / `%{ref_shape}` /
//!   `%{ref_element}` on every concept, axis-mismatch detection, and
//!   `%{is_invariant}` on loop state containers

use std::collections::HashSet;

use normcode_core::SequenceKind;

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::parser::{AnnotationKind, Marker, NodeId, PlanTree};

use super::operators::{self, OperatorHead};

/// Provision annotation keys that can seed a ground concept.
pub const PROVISION_KEYS: &[&str] = &[
    "literal",
    "file_location",
    "prompt_location",
    "script_location",
    "truth_value",
    "in-memory",
];

pub fn post_formalize(tree: &mut PlanTree, diagnostics: &mut Diagnostics) {
    recomposition(tree);
    provision(tree, diagnostics);
    syntax_reconfirmation(tree, diagnostics);
}

// ---------------------------------------------------------------------------
// (a) re-composition
// ---------------------------------------------------------------------------

fn recomposition(tree: &mut PlanTree) {
    for id in tree.iter_ids() {
        let node = tree.node(id);
        if node.marker != Marker::Functional {
            continue;
        }
        let default_paradigm = match node.sequence {
            Some(SequenceKind::Imperative) => "[h_values]-c_apply-o_Literal",
            Some(SequenceKind::Judgement) => "[h_values]-c_check-o_Boolean",
            _ => continue,
        };
        let has_vertical = node.has_annotation("v_input_provision");

        let node = tree.node_mut(id);
        if !node.has_annotation("norm_input") {
            node.set_annotation(AnnotationKind::Referential, "norm_input", default_paradigm);
        }
        if !node.has_annotation("body_faculty") {
            node.set_annotation(AnnotationKind::Referential, "body_faculty", "llm");
        }
        if !node.has_annotation("h_input_norm") {
            node.set_annotation(AnnotationKind::Referential, "h_input_norm", "in-memory");
        }
        if has_vertical && !node.has_annotation("v_input_norm") {
            node.set_annotation(AnnotationKind::Referential, "v_input_norm", "prompt_location");
        }
    }
}

// ---------------------------------------------------------------------------
// (b) provision
// ---------------------------------------------------------------------------

/// The provision annotation of a node, if any: `(key, value)`. Compound
/// literal keys (`literal<$% x>`) count as `literal`.
pub fn provision_of(tree: &PlanTree, id: NodeId) -> Option<(String, String)> {
    tree.node(id)
        .annotations
        .iter()
        .find(|a| {
            a.kind == AnnotationKind::Referential
                && PROVISION_KEYS
                    .iter()
                    .any(|k| a.key == *k || a.key.starts_with(&format!("{k}<")))
        })
        .map(|a| {
            let base = PROVISION_KEYS
                .iter()
                .find(|k| a.key == **k || a.key.starts_with(&format!("{k}<")))
                .expect("filter matched");
            (base.to_string(), a.value.clone())
        })
}

/// Names produced by some inference or provided by the runtime (loop
/// contexts). Everything else that appears as a leaf is ground.
pub fn produced_names(tree: &PlanTree) -> HashSet<String> {
    let mut produced = HashSet::new();
    for id in tree.iter_ids() {
        let node = tree.node(id);
        if !node.children.is_empty() {
            produced.insert(node.name.clone());
        }
        if node.marker == Marker::Context {
            // Loop-provided current contexts.
            produced.insert(node.name.clone());
        }
    }
    produced
}

pub fn is_ground(tree: &PlanTree, id: NodeId, produced: &HashSet<String>) -> bool {
    let node = tree.node(id);
    match node.marker {
        Marker::Input => true,
        Marker::Value => node.children.is_empty() && !produced.contains(&node.name),
        _ => false,
    }
}

fn provision(tree: &mut PlanTree, diagnostics: &mut Diagnostics) {
    let produced = produced_names(tree);
    for id in tree.iter_ids() {
        if !is_ground(tree, id, &produced) {
            continue;
        }
        let node = tree.node(id);
        let provisions: Vec<String> = node
            .annotations
            .iter()
            .filter(|a| {
                a.kind == AnnotationKind::Referential
                    && PROVISION_KEYS
                        .iter()
                        .any(|k| a.key == *k || a.key.starts_with(&format!("{k}<")))
            })
            .map(|a| a.key.clone())
            .collect();
        if provisions.len() > 1 {
            diagnostics
                .report(DiagnosticKind::BadAnnotation, node.span)
                .message(format!(
                    "ground concept `{}` carries conflicting provisions ({})",
                    node.name,
                    provisions.join(", ")
                ))
                .emit();
        }
        tree.node_mut(id)
            .set_annotation(AnnotationKind::Referential, "is_ground", "true");
    }
}

// ---------------------------------------------------------------------------
// (c) syntax re-confirmation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
struct Frame {
    axes: Vec<String>,
    /// Symbolic shape entries; loop lengths are unknown at compile time.
    shape: Vec<String>,
    element: &'static str,
}

impl Frame {
    fn singleton(element: &'static str) -> Self {
        Frame {
            axes: vec![normcode_core::NONE_AXIS.to_string()],
            shape: vec!["1".to_string()],
            element,
        }
    }
}

fn syntax_reconfirmation(tree: &mut PlanTree, diagnostics: &mut Diagnostics) {
    // Invariance first: loop state containers keep their Reference across
    // iteration resets.
    for id in tree.iter_ids() {
        if tree.node(id).loop_offset().is_some() {
            tree.node_mut(id)
                .set_annotation(AnnotationKind::Referential, "is_invariant", "true");
        }
    }

    let produced = produced_names(tree);
    let mut order = tree.walk();
    order.reverse(); // children before parents

    // Two rounds: the second lets consumers pick up frames of producers
    // that sit in earlier sibling subtrees.
    for round in 0..2 {
        let mut round_diag = Diagnostics::new();
        for &id in &order {
            let frame = infer_frame(tree, id, &produced, &mut round_diag);
            if let Some(frame) = frame {
                let node = tree.node_mut(id);
                node.set_annotation(
                    AnnotationKind::Referential,
                    "ref_axes",
                    format!("[{}]", frame.axes.join(", ")),
                );
                node.set_annotation(
                    AnnotationKind::Referential,
                    "ref_shape",
                    format!("({},)", frame.shape.join(", ")),
                );
                node.set_annotation(AnnotationKind::Referential, "ref_element", frame.element);
            }
        }
        if round == 1 {
            diagnostics.extend(round_diag);
        }
    }
    // Inputs sit outside the walk.
    for i in 0..tree.inputs().len() {
        let id = tree.inputs()[i];
        if let Some(frame) = ground_frame(tree, id) {
            let node = tree.node_mut(id);
            node.set_annotation(
                AnnotationKind::Referential,
                "ref_axes",
                format!("[{}]", frame.axes.join(", ")),
            );
            node.set_annotation(
                AnnotationKind::Referential,
                "ref_shape",
                format!("({},)", frame.shape.join(", ")),
            );
            node.set_annotation(AnnotationKind::Referential, "ref_element", frame.element);
        }
    }
}

fn frame_of_annotations(tree: &PlanTree, id: NodeId) -> Option<Frame> {
    let node = tree.node(id);
    let axes = node.annotation_value("ref_axes")?;
    let shape = node.annotation_value("ref_shape")?;
    let axes: Vec<String> = axes
        .trim_start_matches('[')
        .trim_end_matches(']')
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    let shape: Vec<String> = shape
        .trim_start_matches('(')
        .trim_end_matches(')')
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    Some(Frame {
        axes,
        shape,
        element: "primitive",
    })
}

fn ground_frame(tree: &PlanTree, id: NodeId) -> Option<Frame> {
    let (key, value) = provision_of(tree, id)?;
    let frame = match key.as_str() {
        "literal" => {
            match serde_json::from_str::<serde_json::Value>(&value) {
                Ok(serde_json::Value::Array(items)) => {
                    let axis = tree
                        .node(id)
                        .axis_tag()
                        .unwrap_or("items")
                        .to_string();
                    Frame {
                        axes: vec![axis],
                        shape: vec![items.len().to_string()],
                        element: "primitive",
                    }
                }
                _ => Frame::singleton("primitive"),
            }
        }
        "truth_value" => Frame::singleton("truth_value"),
        _ => Frame::singleton("perceptual_sign"),
    };
    Some(frame)
}

fn infer_frame(
    tree: &PlanTree,
    id: NodeId,
    produced: &HashSet<String>,
    diagnostics: &mut Diagnostics,
) -> Option<Frame> {
    let node = tree.node(id);
    if node.marker == Marker::Functional {
        return None;
    }

    if node.children.is_empty() {
        if is_ground(tree, id, produced) {
            return ground_frame(tree, id).or(Some(Frame::singleton("primitive")));
        }
        // Produced elsewhere or loop-provided: reuse the producer's frame
        // when it is already annotated.
        let producer = tree
            .iter_ids()
            .find(|&p| p != id && tree.node(p).name == node.name && !tree.node(p).children.is_empty());
        return producer
            .and_then(|p| frame_of_annotations(tree, p))
            .or(Some(Frame::singleton("primitive")));
    }

    let func = tree.functional_child(id)?;
    let head = operators::classify(&tree.node(func).raw_text)?;
    let operands = tree.operand_children(id);

    let frame = match &head {
        OperatorHead::Grouping { payload } => {
            let create_axis = operators::inline_create_axis(payload)
                .or_else(|| tree.node(func).annotation_value("create_axis").map(String::from));
            let source_count = operators::inline_source_list(payload)
                .map(|l| l.len())
                .unwrap_or(operands.len());
            check_grouping_axes(tree, id, &operands, create_axis.as_deref(), diagnostics);
            match create_axis {
                Some(axis) => Frame {
                    axes: vec![axis],
                    shape: vec![source_count.to_string()],
                    element: "primitive",
                },
                None => Frame::singleton("primitive"),
            }
        }
        OperatorHead::Judgement { .. } => Frame::singleton("truth_value"),
        OperatorHead::Timing { .. } => operands
            .first()
            .and_then(|&c| frame_of_annotations(tree, c))
            .unwrap_or(Frame::singleton("primitive")),
        OperatorHead::Looping { payload, .. } => {
            let axis = operators::inline_create_axis(payload).unwrap_or_else(|| "loop".to_string());
            Frame {
                axes: vec![axis],
                shape: vec!["n".to_string()],
                element: "primitive",
            }
        }
        OperatorHead::Imperative { .. } => {
            match tree.node(func).annotation_value("create_axis_on_list_output") {
                Some(axis) => Frame {
                    axes: vec![axis.to_string()],
                    shape: vec!["n".to_string()],
                    element: "primitive",
                },
                None => Frame::singleton("primitive"),
            }
        }
        OperatorHead::Assign { marker, .. } => match marker {
            '=' | '.' | '+' => operands
                .first()
                .and_then(|&c| frame_of_annotations(tree, c))
                .unwrap_or(Frame::singleton("primitive")),
            '%' => abstraction_frame(tree, id, func),
            _ => Frame::singleton("primitive"),
        },
    };
    Some(frame)
}

fn abstraction_frame(tree: &PlanTree, id: NodeId, func: NodeId) -> Frame {
    let axis = tree
        .node(id)
        .axis_tag()
        .or(tree.node(func).axis_tag())
        .unwrap_or(normcode_core::NONE_AXIS)
        .to_string();
    let face_count = tree
        .node(func)
        .clausal
        .iter()
        .filter(|c| matches!(c, crate::parser::Clausal::FaceTag(_)))
        .count()
        .max(1);
    Frame {
        axes: vec![axis],
        shape: vec![face_count.to_string()],
        element: "primitive",
    }
}

/// Grouping across sources needs identical frames; propose restructurings
/// when they disagree.
fn check_grouping_axes(
    tree: &PlanTree,
    parent: NodeId,
    operands: &[NodeId],
    create_axis: Option<&str>,
    diagnostics: &mut Diagnostics,
) {
    if create_axis.is_none() || operands.len() < 2 {
        return;
    }
    let frames: Vec<Option<Frame>> = operands
        .iter()
        .map(|&c| frame_of_annotations(tree, c))
        .collect();
    let mut known = frames.iter().flatten();
    let Some(first) = known.next() else {
        return;
    };
    if known.any(|f| f.axes != first.axes || f.shape != first.shape) {
        diagnostics
            .warn(DiagnosticKind::AxisMismatch, tree.node(parent).span)
            .message(
                "grouped sources have different axes; consider collapsing with `%-[...]`, \
                 grouping without a created axis, or moving the sources into a loop",
            )
            .emit();
    }
}

