//! Matcher synthesis.
//!
//! A source pattern compiles into nested closures, one per operation pattern
//! and one per operand slot. Matching walks backward from the root through
//! operand producers and is single-solution: there is no alternation, so the
//! first failing check ends the attempt. Bindings live in a store created per
//! attempt and are only handed out when every check has passed.
//!
//! Check order per operation: name, arity, attributes, then operands in
//! declaration order (recursing into producers). After structural success the
//! verify-unused preconditions run, then the multi-entity constraints.

use std::sync::Arc;

use drr_ir::{Constraint, GraphAccess, OpId, OperationDescriptor, Subject, ValueId};
use snafu::OptionExt;

use crate::binding::{Binding, BindingState, BindingStore, BindingStoreExt, VarIntern};
use crate::error::*;
use crate::pattern::{Directive, DirectiveKind, OpPattern, PatternNode};
use crate::rule::{CompileContext, EntityConstraint, Rule, Slot};

type OpMatchFn = Box<dyn Fn(&dyn GraphAccess, OpId, &mut BindingStore) -> bool + Send + Sync>;

/// Receives the operand values of one slot (a single value, or the variadic tail).
type SlotMatchFn = Box<dyn Fn(&dyn GraphAccess, &[ValueId], &mut BindingStore) -> bool + Send + Sync>;

/// Compiled match procedure of one rule.
#[derive(derive_more::Debug)]
pub struct Matcher {
    rule: String,
    #[debug(skip)]
    root: OpMatchFn,
    /// Root results that must have no uses: (first result, covers the variadic tail).
    unused_results: Vec<(usize, bool)>,
    constraints: Vec<(Vec<u8>, EntityConstraint)>,
    #[debug(skip)]
    intern: Arc<VarIntern>,
}

impl Matcher {
    pub(crate) fn compile(rule: &Rule, ctx: CompileContext<'_>, intern: Arc<VarIntern>) -> Result<Self> {
        let compiler = Compiler { rule: &rule.name, ctx, intern: &intern };
        let root = compiler.op(&rule.source, true)?;

        let variadic_result = compiler.descriptor(&rule.source.name)?.variadic_result();
        let auxiliary = rule.results.len() - rule.root_results;
        let unused_results = rule
            .results
            .iter()
            .skip(auxiliary)
            .enumerate()
            .filter(|(_, node)| {
                matches!(node, PatternNode::Directive(Directive { kind: DirectiveKind::VerifyUnused, .. }))
            })
            .map(|(index, _)| (index, variadic_result == Some(index)))
            .collect();

        let constraints = rule
            .constraints
            .iter()
            .map(|constraint| {
                let slots = constraint.names().iter().map(|name| compiler.slot(name)).collect::<Result<Vec<_>>>()?;
                Ok((slots, constraint.clone()))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { rule: rule.name.clone(), root, unused_results, constraints, intern })
    }

    /// Try to match the rule at `op`. No bindings escape a failed attempt.
    pub fn matches(&self, graph: &dyn GraphAccess, op: OpId) -> Option<BindingState> {
        if !graph.is_live(op) {
            tracing::trace!(rule = %self.rule, %op, "root operation was erased");
            return None;
        }

        let mut store = BindingStore::new();
        if !(self.root)(graph, op, &mut store) {
            return None;
        }

        let results = graph.results(op);
        for &(index, variadic) in &self.unused_results {
            let covered = if variadic { results.get(index..) } else { results.get(index..=index) };
            let Some(covered) = covered else {
                tracing::trace!(rule = %self.rule, result = index, "verify-unused result does not exist");
                return None;
            };
            for (offset, result) in covered.iter().enumerate() {
                let uses = graph.uses_of(*result).len();
                if uses > 0 {
                    tracing::trace!(rule = %self.rule, result = index + offset, uses, "verify-unused result has uses");
                    return None;
                }
            }
        }

        for (slots, constraint) in &self.constraints {
            let Some(bindings) = slots.iter().map(|slot| store.get_by_index(*slot)).collect::<Option<Vec<_>>>()
            else {
                tracing::trace!(rule = %self.rule, constraint = constraint.description(), "constraint name unbound");
                return None;
            };
            if !constraint.evaluate(&bindings, graph) {
                tracing::trace!(rule = %self.rule, constraint = constraint.description(), "constraint rejected");
                return None;
            }
        }

        tracing::debug!(rule = %self.rule, %op, bindings = store.len(), "rule matched");
        Some(BindingState::new(op, store, Arc::clone(&self.intern)))
    }
}

struct Compiler<'a> {
    rule: &'a str,
    ctx: CompileContext<'a>,
    intern: &'a VarIntern,
}

struct AttrCheck {
    attr: String,
    slot: u8,
    constraint: Option<Constraint>,
}

impl Compiler<'_> {
    fn slot(&self, name: &str) -> Result<u8> {
        self.intern.get_index(name).context(UnboundNameSnafu { rule: self.rule, name })
    }

    fn descriptor(&self, op: &str) -> Result<OperationDescriptor> {
        self.ctx.descriptors.describe(op).cloned().context(UnknownOperationSnafu { rule: self.rule, op })
    }

    fn op(&self, pattern: &OpPattern, is_root: bool) -> Result<OpMatchFn> {
        let desc = self.descriptor(&pattern.name)?;
        let variadic = desc.variadic_operand();

        let mut attr_checks = Vec::new();
        let mut operand_fns = Vec::new();
        for (position, child) in pattern.children.iter().enumerate() {
            match (Slot::of(&desc, position), child) {
                (Slot::Attribute(def), PatternNode::Attr(attr)) => attr_checks.push(AttrCheck {
                    attr: def.name.clone(),
                    slot: self.slot(&attr.name)?,
                    constraint: attr.constraint.clone(),
                }),
                (Slot::Operand(def), PatternNode::Var(var)) => {
                    operand_fns.push(self.var(&var.name, var.constraint.clone(), def.variadic)?);
                }
                (Slot::Operand(_), PatternNode::Op(nested)) => operand_fns.push(self.producer(nested)?),
                (_, other) => {
                    return ArgumentKindMismatchSnafu {
                        rule: self.rule,
                        op: &pattern.name,
                        position,
                        expected: "a source pattern",
                        found: other.kind(),
                    }
                    .fail();
                }
            }
        }

        let bound = pattern.bound.as_deref().map(|name| self.slot(name)).transpose()?;
        let name = pattern.name.clone();

        Ok(Box::new(move |graph, op, store| {
            let found = graph.op_name(op);
            if found != name {
                tracing::trace!(expected = %name, %found, "operation name mismatch");
                return false;
            }

            let operands = graph.operands(op);
            let results = graph.results(op).len();
            if !desc.accepts_operand_count(operands.len()) || !desc.accepts_result_count(results) {
                tracing::trace!(op = %name, operands = operands.len(), results, "arity mismatch");
                return false;
            }

            for check in &attr_checks {
                let Some(attr) = graph.attribute(op, &check.attr) else {
                    tracing::trace!(op = %name, attr = %check.attr, "attribute missing");
                    return false;
                };
                if let Some(constraint) = &check.constraint
                    && !constraint.evaluate(Subject::Attribute(attr))
                {
                    tracing::trace!(op = %name, attr = %check.attr, %constraint, "attribute constraint failed");
                    return false;
                }
                match store.get_by_index(check.slot) {
                    None => store.set_binding(check.slot, Binding::Attribute(attr.clone())),
                    Some(Binding::Attribute(previous)) if previous == attr => {}
                    Some(_) => {
                        tracing::trace!(op = %name, attr = %check.attr, "repeated attribute differs");
                        return false;
                    }
                }
            }

            for (index, operand_fn) in operand_fns.iter().enumerate() {
                let values = if variadic == Some(index) {
                    operands.get(index..).unwrap_or_default()
                } else {
                    operands.get(index..=index).unwrap_or_default()
                };
                if !operand_fn(graph, values, store) {
                    return false;
                }
            }

            let Some(slot) = bound else {
                return true;
            };
            if is_root {
                store.set_binding(slot, Binding::OpResult(graph.results(op).iter().copied().collect()));
                return true;
            }
            let consistent = match store.get_by_index(slot) {
                None => true,
                Some(Binding::SubOp(previous)) => *previous == op,
                // A variable already referred to this name: it must be a result of this operation.
                Some(Binding::Operand(value)) => graph.defining_op(*value) == Some(op),
                Some(_) => false,
            };
            if !consistent {
                tracing::trace!(op = %name, "bound operation differs from earlier reference");
                return false;
            }
            store.set_binding(slot, Binding::SubOp(op));
            true
        }))
    }

    /// Operand slot whose value must be produced by an operation matching `pattern`.
    fn producer(&self, pattern: &OpPattern) -> Result<SlotMatchFn> {
        let inner = self.op(pattern, false)?;
        Ok(Box::new(move |graph, values, store| {
            let [value] = values else {
                return false;
            };
            match graph.defining_op(*value) {
                Some(producer) => inner(graph, producer, store),
                None => {
                    tracing::trace!(%value, "operand has no defining operation");
                    false
                }
            }
        }))
    }

    fn var(&self, name: &str, constraint: Option<Constraint>, variadic: bool) -> Result<SlotMatchFn> {
        let slot = self.slot(name)?;
        let name = name.to_string();
        Ok(Box::new(move |graph, values, store| {
            if let Some(constraint) = &constraint
                && let Some(value) = values.iter().find(|value| !constraint.evaluate(Subject::value(graph, **value)))
            {
                tracing::trace!(var = %name, %value, %constraint, "operand constraint failed");
                return false;
            }

            let consistent = match (store.get_by_index(slot), values) {
                (None, _) => {
                    let binding = match values {
                        [value] if !variadic => Binding::Operand(*value),
                        _ => Binding::Operands(values.iter().copied().collect()),
                    };
                    store.set_binding(slot, binding);
                    true
                }
                (Some(Binding::Operand(previous)), [value]) => previous == value,
                (Some(Binding::Operands(previous)), _) => previous.as_slice() == values,
                (Some(Binding::SubOp(op)), [value]) => graph.defining_op(*value) == Some(*op),
                (Some(_), _) => false,
            };
            if !consistent {
                tracing::trace!(var = %name, "repeated variable bound to a different value");
            }
            consistent
        }))
    }
}
