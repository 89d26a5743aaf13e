use crate::prelude::*;
use crate::test::helpers::create;
use crate::{Error, ValueDef};

#[test]
fn test_create_tracks_uses() {
    let mut graph = Graph::new();
    let x = graph.add_argument(DType::Int32);
    let add = create(&mut graph, "add", vec![x, x], vec![], vec![DType::Int32]);

    assert_eq!(graph.op_name(add), "add");
    assert_eq!(graph.operands(add), &[x, x]);
    assert_eq!(graph.uses_of(x), &[OpOperand { op: add, index: 0 }, OpOperand { op: add, index: 1 }]);
    assert_eq!(graph.defining_op(x), None);

    let out = graph.result(add, 0).unwrap();
    assert_eq!(graph.defining_op(out), Some(add));
    assert_eq!(graph.value_def(out), ValueDef::Result { op: add, index: 0 });
    assert_eq!(graph.value_type(out), &DType::Int32);
    assert!(graph.uses_of(out).is_empty());
}

#[test]
fn test_attribute_lookup() {
    let mut graph = Graph::new();
    let op = create(&mut graph, "c", vec![], vec![("value", Attribute::i32(7)), ("tag", Attribute::str("t"))], vec![]);

    assert_eq!(graph.attribute(op, "value"), Some(&Attribute::i32(7)));
    assert_eq!(graph.attribute(op, "tag").and_then(Attribute::as_str), Some("t"));
    assert_eq!(graph.attribute(op, "missing"), None);
}

#[test]
fn test_replace_uses_moves_use_list() {
    let mut graph = Graph::new();
    let x = graph.add_argument(DType::Int32);
    let a = create(&mut graph, "a", vec![x], vec![], vec![DType::Int32]);
    let b = create(&mut graph, "b", vec![x], vec![], vec![DType::Int32]);
    let a_out = graph.result(a, 0).unwrap();
    let b_out = graph.result(b, 0).unwrap();
    let user = create(&mut graph, "user", vec![a_out, a_out], vec![], vec![]);

    graph.replace_uses(a_out, b_out);

    assert!(graph.uses_of(a_out).is_empty());
    assert_eq!(graph.operands(user), &[b_out, b_out]);
    assert_eq!(graph.uses_of(b_out).len(), 2);
}

#[test]
fn test_replace_uses_with_self_is_noop() {
    let mut graph = Graph::new();
    let x = graph.add_argument(DType::Int32);
    let user = create(&mut graph, "user", vec![x], vec![], vec![]);

    graph.replace_uses(x, x);
    assert_eq!(graph.uses_of(x), &[OpOperand { op: user, index: 0 }]);
}

#[test]
fn test_erase_refuses_live_results() {
    let mut graph = Graph::new();
    let x = graph.add_argument(DType::Int32);
    let a = create(&mut graph, "a", vec![x], vec![], vec![DType::Int32]);
    let a_out = graph.result(a, 0).unwrap();
    let user = create(&mut graph, "user", vec![a_out], vec![], vec![]);

    let err = graph.erase_op(a).unwrap_err();
    assert!(matches!(err, Error::ResultsInUse { uses: 1, .. }), "{err}");
    assert!(graph.is_live(a));

    graph.erase_op(user).unwrap();
    graph.erase_op(a).unwrap();
    assert!(!graph.is_live(a));
    assert!(graph.uses_of(x).is_empty());
    assert_eq!(graph.len(), 0);
    assert!(matches!(graph.erase_op(a), Err(Error::AlreadyErased { .. })));
}

#[test]
fn test_create_rejects_dead_operand() {
    let mut graph = Graph::new();
    let a = create(&mut graph, "a", vec![], vec![], vec![DType::Int32]);
    let a_out = graph.result(a, 0).unwrap();
    graph.erase_op(a).unwrap();

    let state = OperationState::builder().name("user").operands(vec![a_out]).build();
    let err = graph.create_op(state).unwrap_err();
    assert!(matches!(err, Error::DeadOperand { index: 0, .. }), "{err}");
}

#[test]
fn test_live_ops_in_creation_order() {
    let mut graph = Graph::new();
    let a = create(&mut graph, "k", vec![], vec![], vec![]);
    let b = create(&mut graph, "other", vec![], vec![], vec![]);
    let c = create(&mut graph, "k", vec![], vec![], vec![]);

    assert_eq!(graph.live_ops().collect::<Vec<_>>(), vec![a, b, c]);
    assert_eq!(graph.ops_named("k").collect::<Vec<_>>(), vec![a, c]);
    graph.erase_op(a).unwrap();
    assert_eq!(graph.ops_named("k").collect::<Vec<_>>(), vec![c]);
}

#[test]
fn test_display() {
    let mut graph = Graph::new();
    let x = graph.add_argument(DType::Int32);
    create(&mut graph, "op_a", vec![x], vec![("attr", Attribute::i32(5))], vec![DType::Int32]);

    assert_eq!(graph.to_string(), "%1 = \"op_a\"(%0) {attr = 5 : i32} : (i32)\n");
}
