//! Plan re-emission and tree dumps.
//!
//! `emit_text` reproduces source text from a tree: marker, concept text,
//! then annotations in stored order. Parsing an emitted file and emitting
//! again is textually stable, which is what the round-trip property needs
//! (annotation order within a line is the only tolerated difference).

use std::fmt::Write;

use crate::parser::{Marker, NodeId, PlanTree};

/// Which annotation families to include when emitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitMode {
    /// `.ncds` — markers and concept text only.
    Draft,
    /// `.ncd` — plus syntactical annotations (`?{...}`).
    Formalized,
    /// `.pf.ncd` — everything.
    PostFormalized,
}

pub fn emit_text(tree: &PlanTree, mode: EmitMode) -> String {
    let mut out = String::new();
    for &input in tree.inputs() {
        emit_line(tree, input, 0, mode, &mut out);
    }
    if let Some(root) = tree.root() {
        emit_subtree(tree, root, 0, mode, &mut out);
    }
    out
}

fn emit_subtree(tree: &PlanTree, id: NodeId, level: usize, mode: EmitMode, out: &mut String) {
    emit_line(tree, id, level, mode, out);
    for &child in &tree.node(id).children {
        emit_subtree(tree, child, level + 1, mode, out);
    }
}

fn emit_line(tree: &PlanTree, id: NodeId, level: usize, mode: EmitMode, out: &mut String) {
    let node = tree.node(id);
    let _ = write!(
        out,
        "{}{} {}",
        "    ".repeat(level),
        node.marker.text(),
        node.raw_text
    );
    for annotation in &node.annotations {
        let include = match mode {
            EmitMode::Draft => false,
            EmitMode::Formalized => {
                annotation.kind == crate::parser::AnnotationKind::Syntactical
                    || was_in_source(&annotation.key)
            }
            EmitMode::PostFormalized => true,
        };
        if !include {
            continue;
        }
        let sigil = match annotation.kind {
            crate::parser::AnnotationKind::Syntactical => '?',
            crate::parser::AnnotationKind::Referential => '%',
        };
        if annotation.value.is_empty() {
            let _ = write!(out, " | {sigil}{{{}}}", annotation.key);
        } else {
            let _ = write!(out, " | {sigil}{{{}}}: {}", annotation.key, annotation.value);
        }
    }
    out.push('\n');
}

/// Referential annotations the author wrote (as opposed to ones the
/// post-formalizer attaches) belong in the `.ncd` form too.
fn was_in_source(key: &str) -> bool {
    crate::passes::post_formalize::PROVISION_KEYS
        .iter()
        .any(|k| key == *k || key.starts_with(&format!("{k}<")))
        || matches!(key, "v_input_provision" | "norm_input" | "selector" | "assign_sources")
}

/// Indented debug dump: flow index, marker, name, sequence kind.
pub fn dump_tree(tree: &PlanTree) -> String {
    let mut out = String::new();
    for &input in tree.inputs() {
        let node = tree.node(input);
        let _ = writeln!(out, ":>: {}", node.name);
    }
    if let Some(root) = tree.root() {
        dump_subtree(tree, root, 0, &mut out);
    }
    out
}

fn dump_subtree(tree: &PlanTree, id: NodeId, depth: usize, out: &mut String) {
    let node = tree.node(id);
    let flow = node
        .flow_index
        .as_ref()
        .map(|f| f.to_string())
        .unwrap_or_else(|| "?".to_string());
    let sequence = match node.sequence {
        Some(s) => format!(" [{s}]"),
        None => String::new(),
    };
    let name = if node.marker == Marker::Functional {
        &node.raw_text
    } else {
        &node.name
    };
    let _ = writeln!(out, "{}{flow} {}{sequence}", "  ".repeat(depth), name);
    for &child in &tree.node(id).children {
        dump_subtree(tree, child, depth + 1, out);
    }
}
