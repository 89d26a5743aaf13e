//! Operation descriptors: the schema of each operation kind.
//!
//! A descriptor lists operand, attribute and result constraints in
//! declaration order. Rule patterns address an operation's arguments
//! positionally over this list (operands first, then attributes).

use std::collections::HashMap;

use bon::bon;
use drr_dtype::DType;
use snafu::ensure;

use crate::constraint::{Constraint, Subject};
use crate::error::{
    DuplicateDescriptorSnafu, MultipleVariadicSnafu, Result, VariadicNotLastSnafu, VerificationFailedSnafu,
};
use crate::{GraphAccess, OpId};

#[derive(Debug, Clone)]
pub struct OperandDef {
    pub name: String,
    pub constraint: Constraint,
    pub variadic: bool,
}

impl OperandDef {
    pub fn new(name: impl Into<String>, constraint: Constraint) -> Self {
        Self { name: name.into(), constraint, variadic: false }
    }

    /// Operand slot accepting zero or more values.
    pub fn variadic(name: impl Into<String>, constraint: Constraint) -> Self {
        Self { name: name.into(), constraint, variadic: true }
    }
}

#[derive(Debug, Clone)]
pub struct AttributeDef {
    pub name: String,
    pub constraint: Constraint,
}

impl AttributeDef {
    pub fn new(name: impl Into<String>, constraint: Constraint) -> Self {
        Self { name: name.into(), constraint }
    }
}

/// How the rewriter picks the type of a result it constructs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultType {
    Fixed(DType),
    /// Same type as operand `i` of the new operation.
    SameAsOperand(usize),
    /// Type of the matched root's result being replaced at this position.
    FromReplaced,
}

#[derive(Debug, Clone)]
pub struct ResultDef {
    pub name: String,
    pub constraint: Constraint,
    pub variadic: bool,
    pub ty: ResultType,
}

impl ResultDef {
    pub fn new(name: impl Into<String>, constraint: Constraint, ty: ResultType) -> Self {
        Self { name: name.into(), constraint, variadic: false, ty }
    }

    pub fn variadic(name: impl Into<String>, constraint: Constraint, ty: ResultType) -> Self {
        Self { name: name.into(), constraint, variadic: true, ty }
    }
}

/// Schema of one operation kind.
#[derive(Debug, Clone)]
pub struct OperationDescriptor {
    name: String,
    operands: Vec<OperandDef>,
    attributes: Vec<AttributeDef>,
    results: Vec<ResultDef>,
}

#[bon]
impl OperationDescriptor {
    #[builder]
    pub fn new(
        #[builder(into)] name: String,
        #[builder(default)] operands: Vec<OperandDef>,
        #[builder(default)] attributes: Vec<AttributeDef>,
        #[builder(default)] results: Vec<ResultDef>,
    ) -> Self {
        Self { name, operands, attributes, results }
    }
}

impl OperationDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn operands(&self) -> &[OperandDef] {
        &self.operands
    }

    pub fn attributes(&self) -> &[AttributeDef] {
        &self.attributes
    }

    pub fn results(&self) -> &[ResultDef] {
        &self.results
    }

    /// Number of positional pattern arguments (operand slots + attribute slots).
    pub fn argument_count(&self) -> usize {
        self.operands.len() + self.attributes.len()
    }

    pub fn variadic_operand(&self) -> Option<usize> {
        self.operands.iter().position(|def| def.variadic)
    }

    pub fn variadic_result(&self) -> Option<usize> {
        self.results.iter().position(|def| def.variadic)
    }

    /// Whether a concrete operation with `count` operands fits the operand list.
    pub fn accepts_operand_count(&self, count: usize) -> bool {
        accepts_count(self.operands.len(), self.variadic_operand().is_some(), count)
    }

    pub fn accepts_result_count(&self, count: usize) -> bool {
        accepts_count(self.results.len(), self.variadic_result().is_some(), count)
    }

    /// Check the variadic slot rules: at most one per list, always last.
    pub fn validate(&self) -> Result<()> {
        let operand_flags: Vec<(&str, bool)> = self.operands.iter().map(|d| (d.name.as_str(), d.variadic)).collect();
        let result_flags: Vec<(&str, bool)> = self.results.iter().map(|d| (d.name.as_str(), d.variadic)).collect();
        validate_variadic(&self.name, "operand", &operand_flags)?;
        validate_variadic(&self.name, "result", &result_flags)
    }

    /// Check a concrete operation against this descriptor.
    pub fn verify(&self, graph: &dyn GraphAccess, op: OpId) -> Result<()> {
        let fail = |reason: String| VerificationFailedSnafu { op: self.name.clone(), reason }.fail();

        if graph.op_name(op) != self.name {
            return fail(format!("operation is named '{}'", graph.op_name(op)));
        }

        let operands = graph.operands(op);
        if !self.accepts_operand_count(operands.len()) {
            return fail(format!("expected {} operand(s), found {}", self.operands.len(), operands.len()));
        }
        for (index, value) in operands.iter().enumerate() {
            let def = &self.operands[index.min(self.operands.len() - 1)];
            if !def.constraint.evaluate(Subject::value(graph, *value)) {
                return fail(format!("operand '{}' ({value}) does not satisfy {}", def.name, def.constraint));
            }
        }

        for def in &self.attributes {
            let Some(attr) = graph.attribute(op, &def.name) else {
                return fail(format!("missing attribute '{}'", def.name));
            };
            if !def.constraint.evaluate(Subject::Attribute(attr)) {
                return fail(format!("attribute '{}' = {attr} does not satisfy {}", def.name, def.constraint));
            }
        }

        let results = graph.results(op);
        if !self.accepts_result_count(results.len()) {
            return fail(format!("expected {} result(s), found {}", self.results.len(), results.len()));
        }
        for (index, value) in results.iter().enumerate() {
            let def = &self.results[index.min(self.results.len() - 1)];
            if !def.constraint.evaluate(Subject::value(graph, *value)) {
                return fail(format!("result '{}' ({value}) does not satisfy {}", def.name, def.constraint));
            }
        }
        Ok(())
    }
}

fn accepts_count(declared: usize, variadic: bool, count: usize) -> bool {
    if variadic { count + 1 >= declared } else { count == declared }
}

fn validate_variadic(op: &str, kind: &'static str, slots: &[(&str, bool)]) -> Result<()> {
    let variadic: Vec<usize> = slots.iter().enumerate().filter(|(_, (_, v))| *v).map(|(i, _)| i).collect();
    ensure!(variadic.len() <= 1, MultipleVariadicSnafu { op, kind, count: variadic.len() });
    if let Some(&position) = variadic.first() {
        ensure!(position + 1 == slots.len(), VariadicNotLastSnafu { op, kind, slot: slots[position].0 });
    }
    Ok(())
}

/// Lookup of operation descriptors by name.
pub trait DescriptorRegistry: Send + Sync {
    fn describe(&self, name: &str) -> Option<&OperationDescriptor>;
}

/// Name-indexed table of descriptors.
///
/// Registration does not validate descriptors: a malformed descriptor is
/// reported against each rule that references it.
#[derive(Debug, Default)]
pub struct Dialect {
    name: String,
    ops: HashMap<String, OperationDescriptor>,
}

impl Dialect {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ops: HashMap::new() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn register(&mut self, descriptor: OperationDescriptor) -> Result<()> {
        ensure!(
            !self.ops.contains_key(descriptor.name()),
            DuplicateDescriptorSnafu { dialect: self.name.clone(), name: descriptor.name() }
        );
        tracing::debug!(dialect = %self.name, op = %descriptor.name(), "registered operation");
        self.ops.insert(descriptor.name.clone(), descriptor);
        Ok(())
    }

    /// Chaining form of [`Dialect::register`].
    pub fn with(mut self, descriptor: OperationDescriptor) -> Result<Self> {
        self.register(descriptor)?;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

impl DescriptorRegistry for Dialect {
    fn describe(&self, name: &str) -> Option<&OperationDescriptor> {
        self.ops.get(name)
    }
}
