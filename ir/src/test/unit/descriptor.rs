use test_case::test_case;

use crate::prelude::*;
use crate::test::helpers::{create, op_a};
use crate::Error;

fn concat(operands: Vec<OperandDef>) -> OperationDescriptor {
    OperationDescriptor::builder().name("concat").operands(operands).build()
}

#[test]
fn test_validate_accepts_trailing_variadic() {
    let desc = concat(vec![
        OperandDef::new("axis", Constraint::integer()),
        OperandDef::variadic("inputs", Constraint::any_value()),
    ]);
    assert!(desc.validate().is_ok());
    assert_eq!(desc.variadic_operand(), Some(1));
}

#[test]
fn test_validate_rejects_misplaced_variadic() {
    let desc = concat(vec![
        OperandDef::variadic("inputs", Constraint::any_value()),
        OperandDef::new("axis", Constraint::integer()),
    ]);
    let err = desc.validate().unwrap_err();
    assert!(matches!(err, Error::VariadicNotLast { kind: "operand", ref slot, .. } if slot == "inputs"), "{err}");
}

#[test]
fn test_validate_rejects_two_variadics() {
    let desc = OperationDescriptor::builder()
        .name("split")
        .results(vec![
            ResultDef::variadic("a", Constraint::any_value(), ResultType::FromReplaced),
            ResultDef::variadic("b", Constraint::any_value(), ResultType::FromReplaced),
        ])
        .build();
    let err = desc.validate().unwrap_err();
    assert!(matches!(err, Error::MultipleVariadic { kind: "result", count: 2, .. }), "{err}");
}

#[test_case(false, 2, true ; "fixed exact")]
#[test_case(false, 3, false ; "fixed too many")]
#[test_case(false, 1, false ; "fixed too few")]
#[test_case(true, 1, true ; "variadic empty")]
#[test_case(true, 5, true ; "variadic many")]
#[test_case(true, 0, false ; "variadic missing fixed")]
fn test_accepts_operand_count(variadic: bool, count: usize, expected: bool) {
    let tail = if variadic {
        OperandDef::variadic("rest", Constraint::any_value())
    } else {
        OperandDef::new("rhs", Constraint::any_value())
    };
    let desc = concat(vec![OperandDef::new("lhs", Constraint::any_value()), tail]);
    assert_eq!(desc.accepts_operand_count(count), expected);
}

#[test]
fn test_verify() {
    let desc = op_a();
    let mut graph = Graph::new();
    let x = graph.add_argument(DType::Int32);
    let f = graph.add_argument(DType::Float32);

    let good = create(&mut graph, "op_a", vec![x], vec![("attr", Attribute::i32(1))], vec![DType::Int32]);
    assert!(desc.verify(&graph, good).is_ok());

    let bad_operand = create(&mut graph, "op_a", vec![f], vec![("attr", Attribute::i32(1))], vec![DType::Int32]);
    assert!(matches!(desc.verify(&graph, bad_operand), Err(Error::VerificationFailed { .. })));

    let missing_attr = create(&mut graph, "op_a", vec![x], vec![], vec![DType::Int32]);
    let err = desc.verify(&graph, missing_attr).unwrap_err();
    assert!(err.to_string().contains("missing attribute 'attr'"), "{err}");

    let wide_attr = create(&mut graph, "op_a", vec![x], vec![("attr", Attribute::i64(1))], vec![DType::Int32]);
    assert!(desc.verify(&graph, wide_attr).is_err());
}

#[test]
fn test_dialect_rejects_duplicates() {
    let mut dialect = Dialect::new("test");
    dialect.register(op_a()).unwrap();
    let err = dialect.register(op_a()).unwrap_err();
    assert!(matches!(err, Error::DuplicateDescriptor { .. }));
    assert_eq!(dialect.len(), 1);
    assert!(dialect.describe("op_a").is_some());
    assert!(dialect.describe("op_b").is_none());
}
