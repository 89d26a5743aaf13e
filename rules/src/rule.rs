//! Rule specifications and their validated form.
//!
//! [`Rule::new`] runs every authoring check against the descriptor registry
//! and the native function table. A rule that passes is never mutated again;
//! the matcher and rewriter are synthesized from it once.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use bon::Builder;
use drr_ir::{
    AttributeDef, Constraint, ConstraintFault, DescriptorRegistry, GraphAccess, OperandDef, OperationDescriptor,
    Subject,
};
use snafu::{OptionExt, ResultExt, ensure};

use crate::binding::{Binding, VarIntern};
use crate::config::CompileConfig;
use crate::error::*;
use crate::native::NativeRegistry;
use crate::pattern::{Directive, DirectiveKind, OpPattern, PatternNode};

/// Declarative rule, as written by a rule author.
#[derive(Debug, Clone, Builder)]
pub struct RuleSpec {
    #[builder(into)]
    pub name: String,
    pub source: PatternNode,
    #[builder(default)]
    pub results: Vec<PatternNode>,
    #[builder(default)]
    pub constraints: Vec<EntityConstraint>,
    /// Added to the number of operation patterns in the source to form the benefit.
    #[builder(default)]
    pub benefit_delta: i32,
}

type EntityPredicate = dyn Fn(&[&Binding], &dyn GraphAccess) -> Result<bool, ConstraintFault> + Send + Sync;

/// Predicate over several bound names, checked after structural success.
#[derive(Clone, derive_more::Debug)]
pub struct EntityConstraint {
    names: Vec<String>,
    description: String,
    #[debug(skip)]
    predicate: Arc<EntityPredicate>,
}

impl EntityConstraint {
    /// `predicate` receives the bindings of `names`, in that order.
    pub fn new<I, F>(names: I, description: impl Into<String>, predicate: F) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
        F: Fn(&[&Binding], &dyn GraphAccess) -> Result<bool, ConstraintFault> + Send + Sync + 'static,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            description: description.into(),
            predicate: Arc::new(predicate),
        }
    }

    /// All named bindings are single values of the same type.
    pub fn all_same_type<I>(names: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        let description = format!("{} have the same type", names.join(", "));
        Self::new(names, description, |bindings, graph| {
            let mut first = None;
            for binding in bindings {
                let value = binding.single_value(graph).ok_or(ConstraintFault { expected: "value", found: "range" })?;
                let ty = graph.value_type(value);
                match first {
                    None => first = Some(ty),
                    Some(expected) if expected != ty => return Ok(false),
                    Some(_) => {}
                }
            }
            Ok(true)
        })
    }

    /// Lift a single-entity constraint onto one bound name.
    pub fn from_unary(name: impl Into<String>, constraint: Constraint) -> Self {
        let name = name.into();
        let description = constraint.clone().substitute("$_self", &name).description().to_string();
        Self::new([name], description, move |bindings, graph| {
            let [binding] = bindings else {
                return Err(ConstraintFault { expected: "one binding", found: "several" });
            };
            match binding {
                Binding::Attribute(attr) => constraint.check(Subject::Attribute(attr)),
                other => {
                    let value = other.single_value(graph).ok_or(ConstraintFault { expected: "value", found: "range" })?;
                    constraint.check(Subject::value(graph, value))
                }
            }
        })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// A fault counts as "does not hold".
    pub fn evaluate(&self, bindings: &[&Binding], graph: &dyn GraphAccess) -> bool {
        match (self.predicate)(bindings, graph) {
            Ok(holds) => holds,
            Err(fault) => {
                tracing::trace!(constraint = %self.description, %fault, "constraint fault treated as failure");
                false
            }
        }
    }
}

/// Everything rule compilation reads besides the rule itself.
#[derive(Clone, Copy)]
pub struct CompileContext<'a> {
    pub descriptors: &'a dyn DescriptorRegistry,
    pub natives: &'a NativeRegistry,
    pub config: &'a CompileConfig,
}

/// Positional argument slot of an operation pattern.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Slot<'d> {
    Operand(&'d OperandDef),
    Attribute(&'d AttributeDef),
}

impl<'d> Slot<'d> {
    /// Slot at `position`. Callers check arity first.
    pub(crate) fn of(desc: &'d OperationDescriptor, position: usize) -> Self {
        let operands = desc.operands();
        match operands.get(position) {
            Some(def) => Self::Operand(def),
            None => Self::Attribute(&desc.attributes()[position - operands.len()]),
        }
    }

    fn expects(self) -> &'static str {
        match self {
            Self::Operand(_) => "a value",
            Self::Attribute(_) => "an attribute",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::IntoStaticStr)]
enum NameKind {
    #[strum(serialize = "a value")]
    Value,
    #[strum(serialize = "a variadic range")]
    Values,
    #[strum(serialize = "an attribute")]
    Attribute,
    #[strum(serialize = "an operation")]
    Op,
}

/// A validated rule.
#[derive(Debug, Clone)]
pub struct Rule {
    pub(crate) name: String,
    pub(crate) source: OpPattern,
    pub(crate) results: Vec<PatternNode>,
    pub(crate) constraints: Vec<EntityConstraint>,
    pub(crate) benefit: i64,
    pub(crate) intern: VarIntern,
    /// Number of results the root's descriptor declares.
    pub(crate) root_results: usize,
}

impl Rule {
    pub fn new(spec: RuleSpec, ctx: CompileContext<'_>) -> Result<Self> {
        let RuleSpec { name, source, results, constraints, benefit_delta } = spec;
        let PatternNode::Op(root) = source else {
            return RootNotOperationSnafu { rule: name }.fail();
        };

        let mut validator = Validator::new(&name, ctx);
        let root_results = validator.descriptor(&root.name)?.results().len();
        validator.source_op(&root, 1)?;
        validator.results(&results, root_results)?;
        for constraint in &constraints {
            for bound in constraint.names() {
                ensure!(
                    validator.kinds.contains_key(bound),
                    UnboundConstraintNameSnafu { rule: &name, constraint: constraint.description(), name: bound }
                );
            }
        }
        let intern = validator.finish()?;

        let op_count = 1 + root.children.iter().map(PatternNode::op_count).sum::<usize>();
        let benefit = op_count as i64 + i64::from(benefit_delta);
        tracing::trace!(benefit, bindings = intern.len(), "rule validated");

        Ok(Self { name, source: root, results, constraints, benefit, intern, root_results })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root_op(&self) -> &str {
        &self.source.name
    }

    pub fn benefit(&self) -> i64 {
        self.benefit
    }
}

struct Validator<'a> {
    rule: &'a str,
    ctx: CompileContext<'a>,
    /// Kinds of names bound by the source pattern.
    kinds: HashMap<String, NameKind>,
    /// Names bound by result patterns so far.
    locals: HashSet<String>,
    /// Names bound by any result pattern, with the position that binds them.
    introduced: HashMap<String, usize>,
    intern: VarIntern,
}

impl<'a> Validator<'a> {
    fn new(rule: &'a str, ctx: CompileContext<'a>) -> Self {
        Self {
            rule,
            ctx,
            kinds: HashMap::new(),
            locals: HashSet::new(),
            introduced: HashMap::new(),
            intern: VarIntern::new(),
        }
    }

    fn descriptor(&self, op: &str) -> Result<&'a OperationDescriptor> {
        let desc = self.ctx.descriptors.describe(op).context(UnknownOperationSnafu { rule: self.rule, op })?;
        desc.validate().context(InvalidDescriptorSnafu { rule: self.rule })?;
        Ok(desc)
    }

    /// Descriptor plus the depth and arity checks shared by source and result patterns.
    fn checked_descriptor(&self, op: &OpPattern, depth: usize) -> Result<&'a OperationDescriptor> {
        let max = self.ctx.config.max_pattern_depth;
        ensure!(depth <= max, PatternTooDeepSnafu { rule: self.rule, max });
        let desc = self.descriptor(&op.name)?;
        ensure!(
            op.children.len() == desc.argument_count(),
            ArityMismatchSnafu {
                rule: self.rule,
                op: &op.name,
                expected: desc.argument_count(),
                actual: op.children.len()
            }
        );
        Ok(desc)
    }

    fn intern(&mut self, name: &str) -> Result<()> {
        let max = self.ctx.config.max_bindings;
        self.intern
            .get_or_insert(name)
            .map(|_| ())
            .context(TooManyBindingsSnafu { rule: self.rule, count: self.intern.len() + 1, max })
    }

    fn bind(&mut self, name: &str, kind: NameKind) -> Result<()> {
        let Some(&previous) = self.kinds.get(name) else {
            self.kinds.insert(name.to_string(), kind);
            return self.intern(name);
        };
        match (previous, kind) {
            (NameKind::Op, NameKind::Op) => DuplicateBindingSnafu { rule: self.rule, name }.fail(),
            (a, b) if a == b => Ok(()),
            // A variable naming a matched operation refers to that operation's result.
            (NameKind::Op, NameKind::Value) => Ok(()),
            (NameKind::Value, NameKind::Op) => {
                self.kinds.insert(name.to_string(), NameKind::Op);
                Ok(())
            }
            (a, b) => KindConflictSnafu { rule: self.rule, name, first: <&str>::from(a), second: <&str>::from(b) }.fail(),
        }
    }

    fn source_op(&mut self, op: &OpPattern, depth: usize) -> Result<()> {
        let desc = self.checked_descriptor(op, depth)?;
        if let Some(name) = &op.bound {
            self.bind(name, NameKind::Op)?;
        }

        for (position, child) in op.children.iter().enumerate() {
            let slot = Slot::of(desc, position);
            match (slot, child) {
                (_, PatternNode::Directive(d)) => {
                    return DirectiveInSourceSnafu { rule: self.rule, directive: d.name() }.fail();
                }
                (Slot::Operand(def), PatternNode::Var(var)) => {
                    let kind = if def.variadic { NameKind::Values } else { NameKind::Value };
                    self.bind(&var.name, kind)?;
                }
                (Slot::Operand(def), PatternNode::Op(_)) if def.variadic => {
                    return VariadicSlotNotVariableSnafu { rule: self.rule, op: &op.name, slot: &def.name }.fail();
                }
                (Slot::Operand(_), PatternNode::Op(nested)) => self.source_op(nested, depth + 1)?,
                (Slot::Attribute(_), PatternNode::Attr(attr)) => self.bind(&attr.name, NameKind::Attribute)?,
                (slot, other) => {
                    return ArgumentKindMismatchSnafu {
                        rule: self.rule,
                        op: &op.name,
                        position,
                        expected: slot.expects(),
                        found: other.kind(),
                    }
                    .fail();
                }
            }
        }
        Ok(())
    }

    fn results(&mut self, results: &[PatternNode], root_results: usize) -> Result<()> {
        ensure!(
            results.len() >= root_results,
            TooFewResultPatternsSnafu { rule: self.rule, expected: root_results, actual: results.len() }
        );
        for (position, node) in results.iter().enumerate() {
            self.collect_introduced(node, position)?;
        }

        let auxiliary = results.len() - root_results;
        for (position, node) in results.iter().enumerate() {
            match node {
                PatternNode::Directive(Directive { kind: DirectiveKind::VerifyUnused, payload }) => {
                    ensure!(position >= auxiliary, MisplacedVerifyUnusedSnafu { rule: self.rule });
                    ensure!(
                        payload.is_empty(),
                        MalformedDirectiveSnafu {
                            rule: self.rule,
                            directive: "verify_unused",
                            reason: "takes no payload"
                        }
                    );
                }
                other => self.result_value(other, "result pattern", position, position, 1)?,
            }
        }
        Ok(())
    }

    fn collect_introduced(&mut self, node: &PatternNode, position: usize) -> Result<()> {
        let children = match node {
            PatternNode::Op(op) => {
                if let Some(name) = &op.bound {
                    ensure!(!self.kinds.contains_key(name), ShadowsSourceNameSnafu { rule: self.rule, name });
                    ensure!(!self.introduced.contains_key(name), DuplicateBindingSnafu { rule: self.rule, name });
                    self.introduced.insert(name.clone(), position);
                    self.intern(name)?;
                }
                &op.children
            }
            PatternNode::Directive(d) => &d.payload,
            PatternNode::Var(_) | PatternNode::Attr(_) => return Ok(()),
        };
        for child in children {
            self.collect_introduced(child, position)?;
        }
        Ok(())
    }

    /// Validate a result node standing for one or more values.
    fn result_value(&mut self, node: &PatternNode, op: &str, position: usize, top: usize, depth: usize) -> Result<()> {
        match node {
            PatternNode::Var(var) => self.reference_value(&var.name, top),
            PatternNode::Op(pattern) => self.result_op(pattern, top, depth),
            PatternNode::Directive(d) => match &d.kind {
                DirectiveKind::ReplaceWithValue => match d.payload.as_slice() {
                    [PatternNode::Var(var)] => self.reference_value(&var.name, top),
                    _ => MalformedDirectiveSnafu {
                        rule: self.rule,
                        directive: d.name(),
                        reason: "expects exactly one variable",
                    }
                    .fail(),
                },
                DirectiveKind::VerifyUnused => MisplacedVerifyUnusedSnafu { rule: self.rule }.fail(),
                DirectiveKind::NativeCall(id) => {
                    ensure!(self.ctx.natives.call(id).is_some(), UnknownNativeCallSnafu { rule: self.rule, id });
                    for (index, arg) in d.payload.iter().enumerate() {
                        if is_attribute_node(arg) {
                            self.result_attr(arg, id, index, top)?;
                        } else {
                            self.result_value(arg, id, index, top, depth + 1)?;
                        }
                    }
                    Ok(())
                }
                DirectiveKind::ConstantAttr(_) | DirectiveKind::AttrTransform(_) => {
                    ArgumentKindMismatchSnafu { rule: self.rule, op, position, expected: "a value", found: d.name() }
                        .fail()
                }
            },
            PatternNode::Attr(_) => {
                ArgumentKindMismatchSnafu { rule: self.rule, op, position, expected: "a value", found: node.kind() }
                    .fail()
            }
        }
    }

    fn result_op(&mut self, pattern: &OpPattern, top: usize, depth: usize) -> Result<()> {
        let desc = self.checked_descriptor(pattern, depth)?;
        for (position, child) in pattern.children.iter().enumerate() {
            match Slot::of(desc, position) {
                Slot::Operand(def) if def.variadic && !matches!(child, PatternNode::Var(_)) => {
                    return VariadicSlotNotVariableSnafu { rule: self.rule, op: &pattern.name, slot: &def.name }
                        .fail();
                }
                Slot::Operand(_) => self.result_value(child, &pattern.name, position, top, depth + 1)?,
                Slot::Attribute(_) => self.result_attr(child, &pattern.name, position, top)?,
            }
        }
        if let Some(name) = &pattern.bound {
            self.locals.insert(name.clone());
        }
        Ok(())
    }

    fn result_attr(&mut self, node: &PatternNode, op: &str, position: usize, top: usize) -> Result<()> {
        match node {
            PatternNode::Attr(attr) => self.reference_attr(&attr.name),
            PatternNode::Directive(d) => match &d.kind {
                DirectiveKind::ConstantAttr(_) => {
                    ensure!(
                        d.payload.is_empty(),
                        MalformedDirectiveSnafu { rule: self.rule, directive: d.name(), reason: "takes no payload" }
                    );
                    Ok(())
                }
                DirectiveKind::AttrTransform(id) => {
                    ensure!(
                        self.ctx.natives.transform(id).is_some(),
                        UnknownAttrTransformSnafu { rule: self.rule, id }
                    );
                    for (index, arg) in d.payload.iter().enumerate() {
                        self.result_attr(arg, id, index, top)?;
                    }
                    Ok(())
                }
                _ => ArgumentKindMismatchSnafu {
                    rule: self.rule,
                    op,
                    position,
                    expected: "an attribute",
                    found: d.name(),
                }
                .fail(),
            },
            other => ArgumentKindMismatchSnafu {
                rule: self.rule,
                op,
                position,
                expected: "an attribute",
                found: other.kind(),
            }
            .fail(),
        }
    }

    fn reference_value(&self, name: &str, top: usize) -> Result<()> {
        if self.locals.contains(name) {
            return Ok(());
        }
        match self.kinds.get(name) {
            Some(NameKind::Attribute) => {
                KindConflictSnafu { rule: self.rule, name, first: "an attribute", second: "a value" }.fail()
            }
            Some(_) => Ok(()),
            None if self.introduced.contains_key(name) => {
                ForwardReferenceSnafu { rule: self.rule, name, position: top }.fail()
            }
            None => UnboundNameSnafu { rule: self.rule, name }.fail(),
        }
    }

    fn reference_attr(&self, name: &str) -> Result<()> {
        match self.kinds.get(name) {
            Some(NameKind::Attribute) => Ok(()),
            Some(&kind) => {
                KindConflictSnafu { rule: self.rule, name, first: <&str>::from(kind), second: "an attribute" }.fail()
            }
            None if self.introduced.contains_key(name) => {
                KindConflictSnafu { rule: self.rule, name, first: "an operation", second: "an attribute" }.fail()
            }
            None => UnboundNameSnafu { rule: self.rule, name }.fail(),
        }
    }

    fn finish(self) -> Result<VarIntern> {
        let max = self.ctx.config.max_bindings;
        ensure!(
            self.intern.len() <= max,
            TooManyBindingsSnafu { rule: self.rule, count: self.intern.len(), max }
        );
        Ok(self.intern)
    }
}

pub(crate) fn is_attribute_node(node: &PatternNode) -> bool {
    matches!(
        node,
        PatternNode::Attr(_)
            | PatternNode::Directive(Directive {
                kind: DirectiveKind::ConstantAttr(_) | DirectiveKind::AttrTransform(_),
                ..
            })
    )
}
