use drr_ir::prelude::*;

use crate::config::CompileConfig;
use crate::error::RewriteError;
use crate::pattern::PatternNode;
use crate::registry::{GeneratedRule, RuleRegistry};
use crate::rewriter::RewriteOutcome;
use crate::rule::RuleSpec;
use crate::test::helpers::{a_to_b, attr, create, op, registry, registry_with, value, var};

fn spec(source: PatternNode, results: Vec<PatternNode>) -> RuleSpec {
    RuleSpec::builder().name("test").source(source).results(results).build()
}

fn apply(rule: &GeneratedRule, graph: &mut Graph, op: OpId) -> Result<RewriteOutcome, RewriteError> {
    let state = rule.try_match(&*graph, op).expect("rule must match before rewriting");
    rule.rewrite(graph, &state)
}

fn compile(registry: &RuleRegistry, spec: RuleSpec) -> GeneratedRule {
    registry.compile_rule(spec).unwrap()
}

#[test]
fn test_replace_with_new_operation() {
    let rule = compile(&registry(), a_to_b());
    let mut graph = Graph::new();
    let x = graph.add_argument(DType::Int32);
    let a = value(&mut graph, "op_a", &[x], vec![("attr", Attribute::i32(5))], DType::Int32);
    let op_a = graph.defining_op(a).unwrap();
    let sink = create(&mut graph, "sink", &[a], vec![], &[]);

    let outcome = apply(&rule, &mut graph, op_a).unwrap();
    assert_eq!(outcome.created.len(), 1);
    assert_eq!(outcome.replaced, 1);

    let op_b = outcome.created[0];
    assert_eq!(graph.op_name(op_b), "op_b");
    assert_eq!(graph.operands(op_b), &[x]);
    assert_eq!(graph.attribute(op_b, "attr"), Some(&Attribute::i32(5)));
    assert_eq!(graph.operands(sink), graph.results(op_b));
    assert!(graph.uses_of(a).is_empty());
    // The matched root stays live; erasing it is up to the driver.
    assert!(graph.is_live(op_a));
    graph.erase_op(op_a).unwrap();
}

#[test]
fn test_auxiliary_pattern_binds_name() {
    let rule = compile(
        &registry(),
        spec(
            op("mul", vec![var("x"), var("y")]),
            vec![op("add", vec![var("x"), var("y")]).bound("t"), op("add", vec![var("t"), var("t")])],
        ),
    );
    let mut graph = Graph::new();
    let x = graph.add_argument(DType::Int32);
    let y = graph.add_argument(DType::Int32);
    let product = value(&mut graph, "mul", &[x, y], vec![], DType::Int32);
    let sink = create(&mut graph, "sink", &[product], vec![], &[]);

    let root = graph.defining_op(product).unwrap();
    let outcome = apply(&rule, &mut graph, root).unwrap();
    let [t, doubled] = outcome.created[..] else {
        panic!("expected two created operations, got {:?}", outcome.created);
    };
    let t_value = graph.result(t, 0).unwrap();
    assert_eq!(graph.operands(t), &[x, y]);
    assert_eq!(graph.operands(doubled), &[t_value, t_value]);
    assert_eq!(graph.operands(sink), graph.results(doubled));
    // Auxiliary values never replace root results.
    assert_eq!(outcome.replaced, 1);
}

#[test]
fn test_native_call_result_replaces_root() {
    let rule = compile(
        &registry(),
        spec(op("mul", vec![var("x"), var("y")]), vec![PatternNode::native("build_neg", vec![var("y")])]),
    );
    let mut graph = Graph::new();
    let x = graph.add_argument(DType::Int32);
    let y = graph.add_argument(DType::Int32);
    let product = value(&mut graph, "mul", &[x, y], vec![], DType::Int32);
    let sink = create(&mut graph, "sink", &[product], vec![], &[]);

    let root = graph.defining_op(product).unwrap();
    let outcome = apply(&rule, &mut graph, root).unwrap();
    // Operations built inside native calls are not reported.
    assert!(outcome.created.is_empty());
    assert_eq!(outcome.replaced, 1);

    let replacement = graph.operands(sink)[0];
    let neg = graph.defining_op(replacement).unwrap();
    assert_eq!(graph.op_name(neg), "neg");
    assert_eq!(graph.operands(neg), &[y]);
}

#[test]
fn test_native_call_failure() {
    let rule = compile(&registry(), spec(op("neg", vec![var("x")]), vec![PatternNode::native("fail", vec![var("x")])]));
    let mut graph = Graph::new();
    let x = graph.add_argument(DType::Int32);
    let neg = create(&mut graph, "neg", &[x], vec![], &[DType::Int32]);

    let err = apply(&rule, &mut graph, neg).unwrap_err();
    assert!(matches!(err, RewriteError::NativeCallFailed { ref id, .. } if id == "fail"), "{err:?}");
}

#[test]
fn test_native_call_without_values() {
    let rule = compile(&registry(), spec(op("neg", vec![var("x")]), vec![PatternNode::native("nothing", vec![])]));
    let mut graph = Graph::new();
    let x = graph.add_argument(DType::Int32);
    let neg = create(&mut graph, "neg", &[x], vec![], &[DType::Int32]);

    let err = apply(&rule, &mut graph, neg).unwrap_err();
    assert!(matches!(err, RewriteError::ReplacementCountMismatch { expected: 1, actual: 0, .. }), "{err:?}");
}

#[test]
fn test_attribute_transform() {
    let rule = compile(
        &registry(),
        spec(
            op("op_a", vec![op("op_a", vec![var("x"), attr("inner")]), attr("outer")]),
            vec![op("op_a", vec![var("x"), PatternNode::transform("sum", vec![attr("inner"), attr("outer")])])],
        ),
    );
    let mut graph = Graph::new();
    let x = graph.add_argument(DType::Int32);
    let inner = value(&mut graph, "op_a", &[x], vec![("attr", Attribute::i32(1))], DType::Int32);
    let outer = create(&mut graph, "op_a", &[inner], vec![("attr", Attribute::i32(2))], &[DType::Int32]);

    let outcome = apply(&rule, &mut graph, outer).unwrap();
    let folded = outcome.created[0];
    assert_eq!(graph.operands(folded), &[x]);
    assert_eq!(graph.attribute(folded, "attr"), Some(&Attribute::i32(3)));
}

#[test]
fn test_constant_attribute_checked_against_descriptor() {
    let constant = spec(
        op("op_a", vec![var("x"), attr("a")]),
        vec![op("op_b", vec![var("x"), PatternNode::constant(Attribute::i64(7))])],
    );
    let build = |graph: &mut Graph| {
        let x = graph.add_argument(DType::Int32);
        create(graph, "op_a", &[x], vec![("attr", Attribute::i32(1))], &[DType::Int32])
    };

    let mut graph = Graph::new();
    let root = build(&mut graph);
    let rule = compile(&registry(), constant.clone());
    let err = apply(&rule, &mut graph, root).unwrap_err();
    assert!(matches!(err, RewriteError::VerificationFailed { .. }), "{err:?}");

    let mut graph = Graph::new();
    let root = build(&mut graph);
    let unchecked = registry_with(CompileConfig::builder().verify_created_ops(false).build());
    let rule = compile(&unchecked, constant);
    let outcome = apply(&rule, &mut graph, root).unwrap();
    assert_eq!(graph.attribute(outcome.created[0], "attr"), Some(&Attribute::i64(7)));
}

#[test]
fn test_unused_result_is_not_replaced() {
    let rule = compile(
        &registry(),
        spec(
            op("divmod", vec![var("a"), var("b")]),
            vec![PatternNode::replace_with("a"), PatternNode::verify_unused()],
        ),
    );
    let mut graph = Graph::new();
    let a = graph.add_argument(DType::Int32);
    let b = graph.add_argument(DType::Int32);
    let divmod = create(&mut graph, "divmod", &[a, b], vec![], &[DType::Int32, DType::Int32]);
    let quot = graph.result(divmod, 0).unwrap();
    let sink = create(&mut graph, "sink", &[quot], vec![], &[]);

    let outcome = apply(&rule, &mut graph, divmod).unwrap();
    assert_eq!(outcome, RewriteOutcome { created: vec![], replaced: 1 });
    assert_eq!(graph.operands(sink), &[a]);
}

#[test]
fn test_variadic_replacement_count() {
    let rule = compile(&registry(), spec(op("concat", vec![var("xs")]), vec![PatternNode::replace_with("xs")]));
    let mut graph = Graph::new();
    let a = graph.add_argument(DType::Int32);
    let b = graph.add_argument(DType::Int32);
    let wide = create(&mut graph, "concat", &[a, b, a], vec![], &[DType::Int32]);
    let single = value(&mut graph, "concat", &[b], vec![], DType::Int32);
    let sink = create(&mut graph, "sink", &[single], vec![], &[]);

    let err = apply(&rule, &mut graph, wide).unwrap_err();
    assert!(matches!(err, RewriteError::ReplacementCountMismatch { expected: 1, actual: 3, .. }), "{err:?}");

    let root = graph.defining_op(single).unwrap();
    let outcome = apply(&rule, &mut graph, root).unwrap();
    assert_eq!(outcome.replaced, 1);
    assert_eq!(graph.operands(sink), &[b]);
}

#[test]
fn test_variadic_operand_forwarded() {
    let rule = compile(
        &registry(),
        spec(op("concat", vec![var("xs")]), vec![op("concat", vec![var("xs")])]),
    );
    let mut graph = Graph::new();
    let a = graph.add_argument(DType::Int32);
    let b = graph.add_argument(DType::Int32);
    let root = create(&mut graph, "concat", &[a, b], vec![], &[DType::Int32]);

    let outcome = apply(&rule, &mut graph, root).unwrap();
    assert_eq!(graph.operands(outcome.created[0]), &[a, b]);
}

#[test]
fn test_result_type_follows_descriptor() {
    let rule = compile(
        &registry(),
        spec(op("neg", vec![var("x")]), vec![op("const", vec![PatternNode::constant(Attribute::i32(0))])]),
    );
    let mut graph = Graph::new();
    let x = graph.add_argument(DType::Int32);
    let neg = create(&mut graph, "neg", &[x], vec![], &[DType::Int32]);

    let outcome = apply(&rule, &mut graph, neg).unwrap();
    let zero = graph.result(outcome.created[0], 0).unwrap();
    assert_eq!(graph.value_type(zero), &DType::Int32);
}

#[test]
fn test_unused_variadic_tail_is_not_replaced() {
    let rule = compile(
        &registry(),
        spec(op("split", vec![var("x")]), vec![PatternNode::replace_with("x"), PatternNode::verify_unused()]),
    );
    let mut graph = Graph::new();
    let x = graph.add_argument(DType::Int32);
    let split = create(&mut graph, "split", &[x], vec![], &[DType::Int32; 3]);
    let head = graph.result(split, 0).unwrap();
    let sink = create(&mut graph, "sink", &[head], vec![], &[]);

    let outcome = apply(&rule, &mut graph, split).unwrap();
    assert_eq!(outcome, RewriteOutcome { created: vec![], replaced: 1 });
    assert_eq!(graph.operands(sink), &[x]);
}

#[test]
fn test_whole_variadic_result_verified_unused() {
    let rule = compile(&registry(), spec(op("unpack", vec![var("x")]), vec![PatternNode::verify_unused()]));
    let mut graph = Graph::new();
    let x = graph.add_argument(DType::Int32);
    let unpack = create(&mut graph, "unpack", &[x], vec![], &[DType::Int32, DType::Int32]);

    let outcome = apply(&rule, &mut graph, unpack).unwrap();
    assert_eq!(outcome, RewriteOutcome { created: vec![], replaced: 0 });

    let used = create(&mut graph, "unpack", &[x], vec![], &[DType::Int32, DType::Int32]);
    let second = graph.result(used, 1).unwrap();
    create(&mut graph, "sink", &[second], vec![], &[]);
    assert!(rule.try_match(&graph, used).is_none());
}
