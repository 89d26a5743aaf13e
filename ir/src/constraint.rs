//! Single-entity constraints.
//!
//! A [`Constraint`] is a pure predicate over one [`Subject`] (a graph value
//! or an attribute) plus a human-readable description. Constraints compose
//! with `&`, `|` and `!`. The description combinators
//! ([`Constraint::with_description`], [`Constraint::substitute`],
//! [`Constraint::wrap`]) change how a constraint reads, never what it accepts.
//!
//! Predicates are evaluated speculatively against candidates that may not have
//! the expected shape. A predicate reports such a mismatch as a
//! [`ConstraintFault`]; [`Constraint::evaluate`] turns faults into `false`.

use std::fmt;
use std::ops::{BitAnd, BitOr, Not};
use std::sync::Arc;

use drr_dtype::DType;
use snafu::Snafu;

use crate::{Attribute, GraphAccess, ValueId};

/// What a constraint is evaluated against.
#[derive(Clone, Copy)]
pub enum Subject<'a> {
    Value { graph: &'a dyn GraphAccess, value: ValueId },
    Attribute(&'a Attribute),
}

impl<'a> Subject<'a> {
    pub fn value(graph: &'a dyn GraphAccess, value: ValueId) -> Self {
        Self::Value { graph, value }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Value { .. } => "value",
            Self::Attribute(attr) => attr.kind(),
        }
    }
}

/// Predicate applied to a subject of the wrong shape.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(display("constraint expected {expected}, found {found}"))]
pub struct ConstraintFault {
    pub expected: &'static str,
    pub found: &'static str,
}

type Predicate = dyn Fn(Subject<'_>) -> Result<bool, ConstraintFault> + Send + Sync;

#[derive(Clone, derive_more::Debug)]
pub struct Constraint {
    #[debug(skip)]
    predicate: Arc<Predicate>,
    description: Arc<str>,
}

impl Constraint {
    pub fn new<F>(description: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(Subject<'_>) -> Result<bool, ConstraintFault> + Send + Sync + 'static,
    {
        Self { predicate: Arc::new(predicate), description: Arc::from(description.into()) }
    }

    /// Constraint over the type of a value.
    pub fn on_type<F>(description: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&DType) -> bool + Send + Sync + 'static,
    {
        Self::new(description, move |subject| match subject {
            Subject::Value { graph, value } => Ok(predicate(graph.value_type(value))),
            other => Err(ConstraintFault { expected: "value", found: other.kind() }),
        })
    }

    /// Constraint over an attribute.
    pub fn on_attr<F>(description: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Attribute) -> Result<bool, ConstraintFault> + Send + Sync + 'static,
    {
        Self::new(description, move |subject| match subject {
            Subject::Attribute(attr) => predicate(attr),
            other => Err(ConstraintFault { expected: "attribute", found: other.kind() }),
        })
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Run the predicate, surfacing faults.
    pub fn check(&self, subject: Subject<'_>) -> Result<bool, ConstraintFault> {
        (self.predicate)(subject)
    }

    /// Run the predicate; a fault counts as "does not hold".
    pub fn evaluate(&self, subject: Subject<'_>) -> bool {
        match self.check(subject) {
            Ok(holds) => holds,
            Err(fault) => {
                tracing::trace!(constraint = %self.description, %fault, "constraint fault treated as failure");
                false
            }
        }
    }

    pub fn and(self, other: Constraint) -> Self {
        let description = format!("({}) && ({})", self.description, other.description);
        Self::new(description, move |subject| match (self.check(subject), other.check(subject)) {
            (Ok(false), _) | (_, Ok(false)) => Ok(false),
            (Err(fault), _) | (_, Err(fault)) => Err(fault),
            (Ok(true), Ok(true)) => Ok(true),
        })
    }

    pub fn or(self, other: Constraint) -> Self {
        let description = format!("({}) || ({})", self.description, other.description);
        Self::new(description, move |subject| match (self.check(subject), other.check(subject)) {
            (Ok(true), _) | (_, Ok(true)) => Ok(true),
            (Err(fault), Err(_)) => Err(fault),
            _ => Ok(false),
        })
    }

    pub fn negate(self) -> Self {
        let description = format!("!({})", self.description);
        Self::new(description, move |subject| Ok(!self.check(subject)?))
    }

    /// Same predicate, new description.
    pub fn with_description(self, description: impl Into<String>) -> Self {
        Self { predicate: self.predicate, description: Arc::from(description.into()) }
    }

    /// Replace every occurrence of `placeholder` in the description.
    pub fn substitute(self, placeholder: &str, replacement: &str) -> Self {
        let description = self.description.replace(placeholder, replacement);
        self.with_description(description)
    }

    /// Surround the description with a prefix and a suffix.
    pub fn wrap(self, prefix: &str, suffix: &str) -> Self {
        let description = format!("{prefix}{}{suffix}", self.description);
        self.with_description(description)
    }

    // ===== Value constraints =====

    /// Accepts any subject.
    pub fn any() -> Self {
        Self::new("any", |_| Ok(true))
    }

    pub fn any_value() -> Self {
        Self::on_type("any value", |_| true)
    }

    pub fn of_type(dtype: DType) -> Self {
        Self::on_type(format!("value of type {dtype}"), move |ty| *ty == dtype)
    }

    pub fn integer() -> Self {
        Self::on_type("integer value", DType::is_int)
    }

    pub fn int_of_width(bits: u32) -> Self {
        Self::on_type(format!("{bits}-bit integer value"), move |ty| ty.is_int() && ty.bits() == bits)
    }

    pub fn float() -> Self {
        Self::on_type("floating-point value", DType::is_float)
    }

    pub fn has_one_use() -> Self {
        Self::new("value with exactly one use", |subject| match subject {
            Subject::Value { graph, value } => Ok(graph.uses_of(value).len() == 1),
            other => Err(ConstraintFault { expected: "value", found: other.kind() }),
        })
    }

    // ===== Attribute constraints =====

    pub fn any_attr() -> Self {
        Self::on_attr("any attribute", |_| Ok(true))
    }

    /// Integer attribute of the given bit width.
    pub fn int_attr(bits: u32) -> Self {
        Self::on_attr(format!("{bits}-bit integer attribute"), move |attr| match attr {
            Attribute::Int { dtype, .. } => Ok(dtype.bits() == bits),
            other => Err(ConstraintFault { expected: "integer", found: other.kind() }),
        })
    }

    pub fn str_attr() -> Self {
        Self::on_attr("string attribute", |attr| Ok(matches!(attr, Attribute::Str(_))))
    }

    pub fn attr_equals(expected: Attribute) -> Self {
        Self::on_attr(format!("attribute equal to {expected}"), move |attr| Ok(*attr == expected))
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}

impl BitAnd for Constraint {
    type Output = Constraint;
    fn bitand(self, rhs: Constraint) -> Constraint {
        self.and(rhs)
    }
}

impl BitOr for Constraint {
    type Output = Constraint;
    fn bitor(self, rhs: Constraint) -> Constraint {
        self.or(rhs)
    }
}

impl Not for Constraint {
    type Output = Constraint;
    fn not(self) -> Constraint {
        self.negate()
    }
}
