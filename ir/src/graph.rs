//! Operation graph and the access/rewrite seams used by generated rules.
//!
//! Matchers only ever see a `&dyn GraphAccess`; rewriters get a
//! `&mut dyn GraphRewriter`. [`Graph`] is the in-process implementation:
//! an arena of operations and values addressed by stable handles, with
//! per-value use lists kept up to date by every mutation.

use std::fmt;

use bon::Builder;
use drr_dtype::DType;
use smallvec::SmallVec;
use snafu::ensure;

use crate::error::{
    AlreadyErasedSnafu, DeadOperandSnafu, Result, ResultsInUseSnafu, UnknownValueSnafu,
};
use crate::{Attribute, OpId, OpOperand, ValueId};

/// Read-only view of an operation graph.
///
/// Handles passed to these methods must come from the same graph.
pub trait GraphAccess {
    fn op_name(&self, op: OpId) -> &str;

    fn operands(&self, op: OpId) -> &[ValueId];

    fn results(&self, op: OpId) -> &[ValueId];

    fn attributes(&self, op: OpId) -> &[(String, Attribute)];

    fn value_type(&self, value: ValueId) -> &DType;

    /// Operation producing `value`, or `None` for graph arguments.
    fn defining_op(&self, value: ValueId) -> Option<OpId>;

    fn uses_of(&self, value: ValueId) -> &[OpOperand];

    /// False once the operation has been erased.
    fn is_live(&self, op: OpId) -> bool;

    fn operand(&self, op: OpId, index: usize) -> Option<ValueId> {
        self.operands(op).get(index).copied()
    }

    fn attribute(&self, op: OpId, name: &str) -> Option<&Attribute> {
        self.attributes(op).iter().find(|(n, _)| n == name).map(|(_, attr)| attr)
    }
}

/// Mutation primitives available to rewrite procedures.
pub trait GraphRewriter: GraphAccess {
    fn create_op(&mut self, state: OperationState) -> Result<OpId>;

    /// Redirect every use of `old` to `new`.
    fn replace_uses(&mut self, old: ValueId, new: ValueId);

    /// Erase an operation. Fails while any of its results has uses.
    fn erase_op(&mut self, op: OpId) -> Result<()>;
}

/// Everything needed to create one operation.
#[derive(Debug, Clone, Builder)]
pub struct OperationState {
    #[builder(into)]
    pub name: String,
    #[builder(default)]
    pub operands: Vec<ValueId>,
    #[builder(default)]
    pub attributes: Vec<(String, Attribute)>,
    #[builder(default)]
    pub result_types: Vec<DType>,
}

/// Where a value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueDef {
    /// Result `index` of operation `op`.
    Result { op: OpId, index: usize },
    /// Graph input number `index`.
    Argument(usize),
}

#[derive(Debug)]
struct OperationData {
    name: String,
    operands: SmallVec<[ValueId; 4]>,
    attributes: Vec<(String, Attribute)>,
    results: SmallVec<[ValueId; 2]>,
    live: bool,
}

#[derive(Debug)]
struct ValueData {
    dtype: DType,
    def: ValueDef,
    uses: SmallVec<[OpOperand; 4]>,
}

/// Arena-backed operation graph.
#[derive(Debug, Default)]
pub struct Graph {
    ops: Vec<OperationData>,
    values: Vec<ValueData>,
    num_arguments: usize,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a graph input of the given type.
    pub fn add_argument(&mut self, dtype: DType) -> ValueId {
        let value = ValueId(self.values.len() as u32);
        self.values.push(ValueData { dtype, def: ValueDef::Argument(self.num_arguments), uses: SmallVec::new() });
        self.num_arguments += 1;
        value
    }

    pub fn value_def(&self, value: ValueId) -> ValueDef {
        self.values[value.index()].def
    }

    /// Result `index` of `op`.
    pub fn result(&self, op: OpId, index: usize) -> Option<ValueId> {
        self.ops[op.index()].results.get(index).copied()
    }

    /// Live operations in creation order.
    pub fn live_ops(&self) -> impl Iterator<Item = OpId> + '_ {
        self.ops.iter().enumerate().filter(|(_, data)| data.live).map(|(idx, _)| OpId(idx as u32))
    }

    /// Live operations with the given name, in creation order.
    pub fn ops_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = OpId> + 'a {
        self.live_ops().filter(move |op| self.ops[op.index()].name == name)
    }

    /// Number of live operations.
    pub fn len(&self) -> usize {
        self.ops.iter().filter(|data| data.live).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_operand(&self, name: &str, index: usize, value: ValueId) -> Result<()> {
        let data = self.values.get(value.index()).ok_or_else(|| UnknownValueSnafu { value }.build())?;
        if let ValueDef::Result { op, .. } = data.def {
            ensure!(self.ops[op.index()].live, DeadOperandSnafu { op: name, index, value });
        }
        Ok(())
    }
}

impl GraphAccess for Graph {
    fn op_name(&self, op: OpId) -> &str {
        &self.ops[op.index()].name
    }

    fn operands(&self, op: OpId) -> &[ValueId] {
        &self.ops[op.index()].operands
    }

    fn results(&self, op: OpId) -> &[ValueId] {
        &self.ops[op.index()].results
    }

    fn attributes(&self, op: OpId) -> &[(String, Attribute)] {
        &self.ops[op.index()].attributes
    }

    fn value_type(&self, value: ValueId) -> &DType {
        &self.values[value.index()].dtype
    }

    fn defining_op(&self, value: ValueId) -> Option<OpId> {
        match self.values[value.index()].def {
            ValueDef::Result { op, .. } => Some(op),
            ValueDef::Argument(_) => None,
        }
    }

    fn uses_of(&self, value: ValueId) -> &[OpOperand] {
        &self.values[value.index()].uses
    }

    fn is_live(&self, op: OpId) -> bool {
        self.ops[op.index()].live
    }
}

impl GraphRewriter for Graph {
    fn create_op(&mut self, state: OperationState) -> Result<OpId> {
        let OperationState { name, operands, attributes, result_types } = state;
        for (index, value) in operands.iter().enumerate() {
            self.check_operand(&name, index, *value)?;
        }

        let op = OpId(self.ops.len() as u32);
        for (index, value) in operands.iter().enumerate() {
            self.values[value.index()].uses.push(OpOperand { op, index });
        }

        let results = result_types
            .into_iter()
            .enumerate()
            .map(|(index, dtype)| {
                let value = ValueId(self.values.len() as u32);
                self.values.push(ValueData { dtype, def: ValueDef::Result { op, index }, uses: SmallVec::new() });
                value
            })
            .collect();

        tracing::trace!(%op, name = %name, "created operation");
        self.ops.push(OperationData { name, operands: operands.into(), attributes, results, live: true });
        Ok(op)
    }

    fn replace_uses(&mut self, old: ValueId, new: ValueId) {
        if old == new {
            return;
        }
        let uses = std::mem::take(&mut self.values[old.index()].uses);
        for operand in &uses {
            self.ops[operand.op.index()].operands[operand.index] = new;
        }
        self.values[new.index()].uses.extend(uses);
    }

    fn erase_op(&mut self, op: OpId) -> Result<()> {
        let data = &self.ops[op.index()];
        ensure!(data.live, AlreadyErasedSnafu { op });
        for result in &data.results {
            let uses = self.values[result.index()].uses.len();
            ensure!(uses == 0, ResultsInUseSnafu { op, name: data.name.clone(), result: *result, uses });
        }

        let operands = data.operands.clone();
        for value in operands {
            self.values[value.index()].uses.retain(|operand| operand.op != op);
        }
        self.ops[op.index()].live = false;
        tracing::trace!(%op, "erased operation");
        Ok(())
    }
}

/// Textual dump of live operations, one per line.
impl fmt::Display for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for op in self.live_ops() {
            let data = &self.ops[op.index()];
            if !data.results.is_empty() {
                let results: Vec<String> = data.results.iter().map(ToString::to_string).collect();
                write!(f, "{} = ", results.join(", "))?;
            }
            let operands: Vec<String> = data.operands.iter().map(ToString::to_string).collect();
            write!(f, "\"{}\"({})", data.name, operands.join(", "))?;
            if !data.attributes.is_empty() {
                let attrs: Vec<String> = data.attributes.iter().map(|(n, a)| format!("{n} = {a}")).collect();
                write!(f, " {{{}}}", attrs.join(", "))?;
            }
            let types: Vec<String> = data.results.iter().map(|v| self.value_type(*v).to_string()).collect();
            writeln!(f, " : ({})", types.join(", "))?;
        }
        Ok(())
    }
}
