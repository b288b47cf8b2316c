use crate::flow::*;

fn fi(s: &str) -> FlowIndex {
    s.parse().unwrap()
}

#[test]
fn parse_and_display() {
    assert_eq!(fi("1").to_string(), "1");
    assert_eq!(fi("1.2.3").to_string(), "1.2.3");
}

#[test]
fn rejects_garbage() {
    assert!("".parse::<FlowIndex>().is_err());
    assert!("1..2".parse::<FlowIndex>().is_err());
    assert!("1.0".parse::<FlowIndex>().is_err());
    assert!("a.b".parse::<FlowIndex>().is_err());
}

#[test]
fn ordering_is_execution_order() {
    let mut indices = vec![fi("1.3"), fi("1.2.1"), fi("1"), fi("1.2"), fi("1.10")];
    indices.sort();
    let rendered: Vec<String> = indices.iter().map(|i| i.to_string()).collect();
    assert_eq!(rendered, ["1", "1.2", "1.2.1", "1.3", "1.10"]);
}

#[test]
fn family_relations() {
    let root = FlowIndex::root();
    let func = root.functional_child();
    let value = root.child(2);

    assert_eq!(func.to_string(), "1.1");
    assert!(func.is_functional());
    assert!(!value.is_functional());
    assert_eq!(value.parent(), Some(root.clone()));
    assert!(root.is_ancestor_of(&value));
    assert!(!value.is_ancestor_of(&root));
    assert!(!root.is_ancestor_of(&root));
    assert!(root.is_prefix_of(&root));
}

#[test]
fn serde_as_string() {
    let json = serde_json::to_string(&fi("1.2.3")).unwrap();
    assert_eq!(json, r#""1.2.3""#);
    let back: FlowIndex = serde_json::from_str(&json).unwrap();
    assert_eq!(back, fi("1.2.3"));
}
