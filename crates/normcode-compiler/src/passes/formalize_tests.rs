use indoc::indoc;

use normcode_core::{SemanticKind, SequenceKind};

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::parser::Parser;

use crate::parser::{NodeId, PlanTree};

use super::formalize::*;

fn formalized(source: &str) -> (PlanTree, Diagnostics) {
    let out = Parser::new(source).parse().unwrap();
    assert!(!out.diagnostics.has_errors(), "parse should be clean");
    let mut tree = out.tree;
    let mut diag = Diagnostics::new();
    formalize(&mut tree, &mut diag);
    (tree, diag)
}

fn flow_of(tree: &PlanTree, id: NodeId) -> String {
    tree.node(id).flow_index.as_ref().unwrap().to_string()
}

#[test]
fn flow_indices_follow_the_sibling_pattern() {
    let source = indoc! {r"
        :<: {result}
            <= ::(combine <:{1}> and <:{2}>)
            <- {left}
                <= $=
                <- {seed}
            <- {right}
    "};
    let (tree, diag) = formalized(source);
    assert!(!diag.has_errors(), "{:?}", diag.kinds());

    let root = tree.root().unwrap();
    assert_eq!(flow_of(&tree, root), "1");
    assert_eq!(flow_of(&tree, tree.functional_child(root).unwrap()), "1.1");

    let operands = tree.operand_children(root);
    assert_eq!(flow_of(&tree, operands[0]), "1.2");
    assert_eq!(flow_of(&tree, operands[1]), "1.3");

    let inner_func = tree.functional_child(operands[0]).unwrap();
    assert_eq!(flow_of(&tree, inner_func), "1.2.1");
    assert_eq!(flow_of(&tree, tree.operand_children(operands[0])[0]), "1.2.2");
}

#[test]
fn flow_indices_are_unique() {
    let source = indoc! {r"
        :<: {result}
            <= ::(combine <:{1}> and <:{2}>)
            <- {left}
                <= $=
                <- {seed}
            <- {right}
                <= $=
                <- {seed}
    "};
    let (tree, _) = formalized(source);
    let mut seen = std::collections::HashSet::new();
    for id in tree.walk() {
        let flow = flow_of(&tree, id);
        assert!(seen.insert(flow.clone()), "duplicate flow index {flow}");
    }
}

#[test]
fn sequence_kinds_are_classified() {
    let source = indoc! {r"
        :<: {result}
            <= ::(combine <:{1}>)
            <- {judged}
                <= ::<looks right>
                <- {input}
            <- {grouped}
                <= &[#] %>[{a},{b}]
                <- {a}
                <- {b}
            <- {gated}
                <= @:'(<cond>)
                <- {work}
            <- {looped}
                <= *every({items})
                <* {current item}
                <- {step}
            <- {assigned}
                <= $=
                <- {source}
    "};
    let (tree, diag) = formalized(source);
    assert!(!diag.has_errors(), "{:?}", diag.kinds());

    let root = tree.root().unwrap();
    assert_eq!(inference_sequence(&tree, root), Some(SequenceKind::Imperative));
    let operands = tree.operand_children(root);
    let kinds: Vec<_> = operands
        .iter()
        .map(|&op| inference_sequence(&tree, op).unwrap())
        .collect();
    assert_eq!(
        kinds,
        vec![
            SequenceKind::Judgement,
            SequenceKind::Grouping,
            SequenceKind::Timing,
            SequenceKind::Looping,
            SequenceKind::Assigning,
        ]
    );
}

#[test]
fn semantic_kinds_follow_brackets() {
    let source = indoc! {r"
        :<: {result}
            <= ::(check <:{1}>)
            <- [pairs]
            <- <is ready>
    "};
    let (tree, _) = formalized(source);
    let root = tree.root().unwrap();
    assert_eq!(tree.node(root).semantic, Some(SemanticKind::Object));
    assert_eq!(
        tree.node(tree.functional_child(root).unwrap()).semantic,
        Some(SemanticKind::Imperative)
    );
    let operands = tree.operand_children(root);
    assert_eq!(tree.node(operands[0]).semantic, Some(SemanticKind::Relation));
    assert_eq!(
        tree.node(operands[1]).semantic,
        Some(SemanticKind::Proposition)
    );
}

#[test]
fn unknown_operator_is_reported() {
    let source = indoc! {r"
        :<: {result}
            <= {not an operator}
            <- {x}
    "};
    let (_, diag) = formalized(source);
    assert!(diag.kinds().contains(&DiagnosticKind::StructureError));
}

#[test]
fn out_of_range_binding_is_reported() {
    let source = indoc! {r"
        :<: {result}
            <= ::(use <:{1}>)
            <- {a} <:{3}>
    "};
    let (_, diag) = formalized(source);
    assert!(diag.kinds().contains(&DiagnosticKind::StructureError));
}

#[test]
fn duplicate_binding_is_reported() {
    let source = indoc! {r"
        :<: {result}
            <= ::(use <:{1}> and <:{2}>)
            <- {a} <:{1}>
            <- {b} <:{1}>
    "};
    let (_, diag) = formalized(source);
    assert!(diag.kinds().contains(&DiagnosticKind::StructureError));
}

#[test]
fn operand_order_honors_explicit_bindings() {
    let source = indoc! {r"
        :<: {result}
            <= ::(use <:{1}> and <:{2}>)
            <- {second} <:{2}>
            <- {first} <:{1}>
    "};
    let (tree, diag) = formalized(source);
    assert!(!diag.has_errors());
    let root = tree.root().unwrap();
    let order = operand_order(&tree, root);
    assert_eq!(tree.node(order[0]).name, "{first}");
    assert_eq!(tree.node(order[1]).name, "{second}");
}

#[test]
fn formalization_stamps_flow_annotations() {
    let source = indoc! {r"
        :<: {result}
            <= $=
            <- {x}
    "};
    let (tree, _) = formalized(source);
    let root = tree.root().unwrap();
    assert_eq!(tree.node(root).annotation_value("flow_index"), Some("1"));
    let func = tree.functional_child(root).unwrap();
    assert_eq!(tree.node(func).annotation_value("flow_index"), Some("1.1"));
    assert_eq!(tree.node(func).annotation_value("sequence"), Some("assigning"));
}
