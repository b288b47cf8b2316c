//! Derivation-stage checks on the draft tree.
//!
//! The draft discipline is bottom-up: a parent depends on its children, and
//! an operator's inputs are declared as explicit value siblings, never as
//! children of the operator (the parser already rejects that nesting).
//! This pass enforces the execution-order rule: within a scope, a concept
//! consumed by an earlier sibling must not be produced by a later one.

use std::collections::HashSet;

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::parser::{Marker, NodeId, PlanTree};

pub fn check_draft(tree: &PlanTree, diagnostics: &mut Diagnostics) {
    let Some(root) = tree.root() else {
        return;
    };
    check_scope(tree, root, diagnostics);
}

fn check_scope(tree: &PlanTree, parent: NodeId, diagnostics: &mut Diagnostics) {
    let operands = tree.operand_children(parent);

    // Names consumed (as leaves) by siblings seen so far.
    let mut consumed: HashSet<String> = HashSet::new();
    for &sibling in &operands {
        let name = &tree.node(sibling).name;
        if consumed.contains(name) && !tree.node(sibling).children.is_empty() {
            diagnostics
                .report(DiagnosticKind::StructureError, tree.node(sibling).span)
                .message(format!(
                    "`{name}` is consumed by an earlier sibling but produced here; move it before its consumers"
                ))
                .emit();
        }
        collect_leaf_names(tree, sibling, &mut consumed);
    }

    for &sibling in &operands {
        check_scope(tree, sibling, diagnostics);
    }
}

/// Leaf value concepts of a subtree: the names its inference consumes.
fn collect_leaf_names(tree: &PlanTree, id: NodeId, out: &mut HashSet<String>) {
    for &child in &tree.node(id).children {
        let node = tree.node(child);
        if node.marker == Marker::Functional {
            continue;
        }
        if node.children.is_empty() {
            out.insert(node.name.clone());
        } else {
            collect_leaf_names(tree, child, out);
        }
    }
}
