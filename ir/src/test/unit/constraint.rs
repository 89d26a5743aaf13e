use test_case::test_case;

use crate::prelude::*;
use crate::test::helpers::create;

fn graph_with(dtype: DType) -> (Graph, ValueId) {
    let mut graph = Graph::new();
    let value = graph.add_argument(dtype);
    (graph, value)
}

#[test_case(DType::Int32, true ; "i32")]
#[test_case(DType::Int64, false ; "i64")]
#[test_case(DType::Float32, false ; "f32")]
fn test_int_of_width(dtype: DType, expected: bool) {
    let (graph, value) = graph_with(dtype);
    assert_eq!(Constraint::int_of_width(32).evaluate(Subject::value(&graph, value)), expected);
}

#[test]
fn test_combinators() {
    let (graph, value) = graph_with(DType::Int32);
    let subject = Subject::value(&graph, value);

    assert!((Constraint::integer() & Constraint::int_of_width(32)).evaluate(subject));
    assert!(!(Constraint::integer() & Constraint::float()).evaluate(subject));
    assert!((Constraint::float() | Constraint::integer()).evaluate(subject));
    assert!((!Constraint::float()).evaluate(subject));
}

#[test]
fn test_fault_is_failure() {
    let (graph, value) = graph_with(DType::Int32);
    let attr = Attribute::f32(1.0);

    let int_attr = Constraint::int_attr(32);
    assert!(int_attr.check(Subject::Attribute(&attr)).is_err());
    assert!(!int_attr.evaluate(Subject::Attribute(&attr)));

    // An attribute predicate against a value is a shape fault, not a panic.
    let fault = int_attr.check(Subject::value(&graph, value)).unwrap_err();
    assert_eq!(fault.expected, "attribute");
    assert_eq!(fault.found, "value");

    // Negation does not turn a fault into success.
    assert!(!(!Constraint::int_attr(32)).evaluate(Subject::value(&graph, value)));
}

#[test_case(Attribute::str("hello"), true ; "string")]
#[test_case(Attribute::i32(1), true ; "i32")]
#[test_case(Attribute::i64(1), false ; "i64")]
#[test_case(Attribute::f32(1.0), false ; "float")]
fn test_or_with_fault_on_one_side(attr: Attribute, expected: bool) {
    let subject = Subject::Attribute(&attr);
    let left = Constraint::int_attr(32) | Constraint::str_attr();
    let right = Constraint::str_attr() | Constraint::int_attr(32);
    assert_eq!(left.evaluate(subject), expected);
    assert_eq!(right.evaluate(subject), expected);
}

#[test]
fn test_and_with_fault_on_one_side() {
    let attr = Attribute::str("hello");
    let subject = Subject::Attribute(&attr);

    // False on one side wins over a fault on the other, in either order.
    let left = Constraint::int_attr(32) & !Constraint::str_attr();
    let right = !Constraint::str_attr() & Constraint::int_attr(32);
    assert_eq!(left.check(subject), Ok(false));
    assert_eq!(right.check(subject), Ok(false));

    // True on one side leaves the fault standing.
    let left = Constraint::int_attr(32) & Constraint::str_attr();
    let right = Constraint::str_attr() & Constraint::int_attr(32);
    assert!(left.check(subject).is_err());
    assert!(right.check(subject).is_err());
    assert!(!left.evaluate(subject));
    assert!(!right.evaluate(subject));
}

#[test]
fn test_or_faults_only_when_both_sides_fault() {
    let (graph, value) = graph_with(DType::Int32);
    let subject = Subject::value(&graph, value);
    let both = Constraint::int_attr(32) | Constraint::str_attr();
    assert!(both.check(subject).is_err());
    assert!(!both.evaluate(subject));
}

#[test]
fn test_description_rewrites_keep_meaning() {
    let (graph, value) = graph_with(DType::Int32);
    let base = Constraint::on_type("$_self is integer", DType::is_int);

    let renamed = base.clone().substitute("$_self", "x");
    assert_eq!(renamed.description(), "x is integer");

    let wrapped = renamed.wrap("(", ") [checked]");
    assert_eq!(wrapped.to_string(), "(x is integer) [checked]");

    let subject = Subject::value(&graph, value);
    assert_eq!(base.evaluate(subject), wrapped.evaluate(subject));
}

#[test]
fn test_combined_description() {
    let c = Constraint::integer() | !Constraint::float();
    assert_eq!(c.description(), "(integer value) || (!(floating-point value))");
}

#[test]
fn test_has_one_use() {
    let mut graph = Graph::new();
    let x = graph.add_argument(DType::Int32);
    let once = Constraint::has_one_use();
    assert!(!once.evaluate(Subject::value(&graph, x)));

    create(&mut graph, "user", vec![x], vec![], vec![]);
    assert!(once.evaluate(Subject::value(&graph, x)));

    create(&mut graph, "user", vec![x], vec![], vec![]);
    assert!(!once.evaluate(Subject::value(&graph, x)));
}

#[test]
fn test_attr_equals() {
    let c = Constraint::attr_equals(Attribute::i32(4));
    assert!(c.evaluate(Subject::Attribute(&Attribute::i32(4))));
    assert!(!c.evaluate(Subject::Attribute(&Attribute::i64(4))));
    assert!(!c.evaluate(Subject::Attribute(&Attribute::str("4"))));
}
