//! Pass 2 — formalization.
//!
//! Assigns flow indices, sequence kinds, and semantic types; validates
//! explicit value bindings against the operator's placeholders. The pass
//! also stamps `?{flow_index}` / `?{sequence}` annotations so the tree can
//! re-emit as a formalized `.ncd` file.

use std::collections::HashSet;

use normcode_core::{FlowIndex, SemanticKind, SequenceKind};

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::lexer::{self, TokenKind};
use crate::parser::{AnnotationKind, Marker, NodeId, PlanTree};

use super::operators::{self, OperatorHead};

pub fn formalize(tree: &mut PlanTree, diagnostics: &mut Diagnostics) {
    let Some(root) = tree.root() else {
        return;
    };
    assign_flow_indices(tree, root, FlowIndex::root());

    for id in tree.iter_ids() {
        assign_semantic(tree, id);
    }
    for id in tree.walk() {
        if tree.node(id).marker == Marker::Functional {
            classify_functional(tree, id, diagnostics);
        }
    }
    for id in tree.walk() {
        if !tree.node(id).children.is_empty() {
            check_value_bindings(tree, id, diagnostics);
        }
    }
    stamp_annotations(tree);
}

fn assign_flow_indices(tree: &mut PlanTree, id: NodeId, flow: FlowIndex) {
    tree.node_mut(id).flow_index = Some(flow.clone());
    let children = tree.node(id).children.clone();
    let mut next_operand = 2u32;
    for child in children {
        // The functional child is always `.1`; operands follow as `.2`, ...
        let child_flow = if tree.node(child).marker == Marker::Functional {
            flow.functional_child()
        } else {
            let n = next_operand;
            next_operand += 1;
            flow.child(n)
        };
        assign_flow_indices(tree, child, child_flow);
    }
}

fn assign_semantic(tree: &mut PlanTree, id: NodeId) {
    let node = tree.node(id);
    if node.marker == Marker::Functional {
        return; // assigned by classify_functional
    }
    let semantic = SemanticKind::of_name(&node.name).unwrap_or(SemanticKind::Object);
    tree.node_mut(id).semantic = Some(semantic);
}

fn classify_functional(tree: &mut PlanTree, id: NodeId, diagnostics: &mut Diagnostics) {
    let node = tree.node(id);
    match operators::classify(&node.raw_text) {
        Some(head) => {
            let sequence = head.sequence_kind();
            let semantic = match head {
                OperatorHead::Imperative { .. } => SemanticKind::Imperative,
                OperatorHead::Judgement { .. } => SemanticKind::Judgement,
                _ => SemanticKind::Relation,
            };
            let node = tree.node_mut(id);
            node.sequence = Some(sequence);
            node.semantic = Some(semantic);
        }
        None => {
            diagnostics
                .report(DiagnosticKind::StructureError, node.span)
                .message(format!(
                    "`{}` is not a recognizable operator",
                    node.raw_text
                ))
                .emit();
        }
    }
}

/// Placeholders in the operator text against explicit `<:{N}>` bindings on
/// value siblings.
fn check_value_bindings(tree: &PlanTree, parent: NodeId, diagnostics: &mut Diagnostics) {
    let Some(func) = tree.functional_child(parent) else {
        return;
    };
    let placeholders = placeholder_count(&tree.node(func).raw_text);
    let operands = tree.operand_children(parent);

    let mut seen: HashSet<u32> = HashSet::new();
    for &operand in &operands {
        let node = tree.node(operand);
        let Some(binding) = node.value_binding() else {
            continue;
        };
        if placeholders == 0 {
            diagnostics
                .report(DiagnosticKind::StructureError, node.span)
                .message("value binding on an operator without placeholders")
                .emit();
            continue;
        }
        if binding == 0 || binding as usize > placeholders {
            diagnostics
                .report(DiagnosticKind::StructureError, node.span)
                .message(format!(
                    "value binding <:{{{binding}}}> is out of range (operator has {placeholders} placeholders)"
                ))
                .emit();
        }
        if !seen.insert(binding) {
            diagnostics
                .report(DiagnosticKind::StructureError, node.span)
                .message(format!("value binding <:{{{binding}}}> is used twice"))
                .emit();
        }
    }
}

fn placeholder_count(text: &str) -> usize {
    lexer::lex(text)
        .iter()
        .filter(|t| t.kind == TokenKind::ValueBinding)
        .count()
}

fn stamp_annotations(tree: &mut PlanTree) {
    for id in tree.iter_ids() {
        let flow = tree.node(id).flow_index.clone();
        let sequence = tree.node(id).sequence;
        let node = tree.node_mut(id);
        if let Some(flow) = flow {
            node.set_annotation(AnnotationKind::Syntactical, "flow_index", flow.to_string());
        }
        if let Some(sequence) = sequence {
            node.set_annotation(AnnotationKind::Syntactical, "sequence", sequence.to_string());
        }
    }
}

/// Sibling positions of operands, honoring explicit bindings.
///
/// Operands with `<:{N}>` take position N; the rest fill remaining slots in
/// source order. Returns operand node ids in position order 1..=len.
pub fn operand_order(tree: &PlanTree, parent: NodeId) -> Vec<NodeId> {
    let operands = tree.operand_children(parent);
    let mut slots: Vec<Option<NodeId>> = vec![None; operands.len()];
    let mut unbound = Vec::new();
    for &operand in &operands {
        match tree.node(operand).value_binding() {
            Some(n) if (1..=operands.len() as u32).contains(&n) => {
                if slots[(n - 1) as usize].is_none() {
                    slots[(n - 1) as usize] = Some(operand);
                } else {
                    unbound.push(operand);
                }
            }
            _ => unbound.push(operand),
        }
    }
    let mut unbound = unbound.into_iter();
    for slot in &mut slots {
        if slot.is_none() {
            *slot = unbound.next();
        }
    }
    slots.into_iter().flatten().collect()
}

/// The sequence kind of the inference rooted at `parent`, read off its
/// functional child.
pub fn inference_sequence(tree: &PlanTree, parent: NodeId) -> Option<SequenceKind> {
    tree.functional_child(parent)
        .and_then(|f| tree.node(f).sequence)
}

