use drr_ir::{Attribute, Constraint};

use crate::pattern::{DirectiveKind, PatternNode};
use crate::test::helpers::{attr, op, var};

#[test]
fn test_op_count_and_depth() {
    let pattern = op("mul", vec![op("neg", vec![op("neg", vec![var("x")])]), var("y")]);
    assert_eq!(pattern.op_count(), 3);
    assert_eq!(pattern.depth(), 3);

    assert_eq!(var("x").op_count(), 0);
    assert_eq!(var("x").depth(), 0);
}

#[test]
fn test_directive_payload_counts() {
    let pattern = PatternNode::native("build", vec![op("neg", vec![var("x")]), attr("a")]);
    assert_eq!(pattern.op_count(), 1);
    assert_eq!(pattern.depth(), 1);
    assert_eq!(pattern.kind(), "native_call");
}

#[test]
fn test_bound_only_applies_to_operations() {
    let bound = op("neg", vec![var("x")]).bound("n");
    assert_eq!(bound.as_op().and_then(|op| op.bound.as_deref()), Some("n"));

    let leaf = var("x").bound("n");
    assert!(leaf.as_op().is_none());
}

#[test]
fn test_node_kinds() {
    assert_eq!(op("neg", vec![]).kind(), "operation");
    assert_eq!(PatternNode::var_with("x", Constraint::integer()).kind(), "variable");
    assert_eq!(PatternNode::attr_with("a", Constraint::any_attr()).kind(), "attribute");
    assert_eq!(PatternNode::replace_with("x").kind(), "replace_with_value");
    assert_eq!(PatternNode::verify_unused().kind(), "verify_unused");
    assert_eq!(PatternNode::constant(Attribute::i32(1)).kind(), "constant_attr");
    assert_eq!(PatternNode::transform("sum", vec![]).kind(), "attr_transform");
}

#[test]
fn test_directive_constructors() {
    let PatternNode::Directive(directive) = PatternNode::replace_with("x") else {
        panic!("expected a directive");
    };
    assert!(matches!(directive.kind, DirectiveKind::ReplaceWithValue));
    assert!(matches!(directive.payload.as_slice(), [PatternNode::Var(v)] if v.name == "x"));
}
