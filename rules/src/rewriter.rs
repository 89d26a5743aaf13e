//! Rewriter synthesis.
//!
//! Result patterns compile into a build plan with binding slots and
//! callbacks resolved ahead of time. With `N` results declared by the root,
//! the leading `len - N` patterns are auxiliary: they are built for their side
//! effects and may bind names for later patterns. The values of the trailing
//! `N` patterns, flattened, replace the root's results positionally.
//!
//! The root operation is never erased here.

use std::sync::Arc;

use drr_ir::{Attribute, DType, GraphAccess, GraphRewriter, OpId, OperationDescriptor, OperationState, ResultType, ValueId};
use smallvec::SmallVec;
use snafu::{OptionExt, ResultExt, ensure};

use crate::binding::{Binding, BindingState, BindingStore, BindingStoreExt, VarIntern};
use crate::error::*;
use crate::native::{AttrTransformFn, NativeArg, NativeCallFn};
use crate::pattern::{Directive, DirectiveKind, OpPattern, PatternNode};
use crate::rule::{CompileContext, Rule, Slot, is_attribute_node};

type Values = SmallVec<[ValueId; 4]>;

/// Side effects of one rewrite.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteOutcome {
    /// Operations created, in creation order (native calls excluded).
    pub created: Vec<OpId>,
    /// Root results whose uses were redirected.
    pub replaced: usize,
}

#[derive(derive_more::Debug)]
enum ValuePlan {
    Bound { slot: u8, name: String },
    Create(Box<CreatePlan>),
    Native {
        id: String,
        #[debug(skip)]
        call: NativeCallFn,
        args: Vec<ArgPlan>,
    },
}

#[derive(derive_more::Debug)]
enum AttrPlan {
    Bound { slot: u8, name: String },
    Constant(Attribute),
    Transform {
        id: String,
        #[debug(skip)]
        transform: AttrTransformFn,
        args: Vec<AttrPlan>,
    },
}

#[derive(Debug)]
enum ArgPlan {
    Value(ValuePlan),
    Attr(AttrPlan),
}

#[derive(Debug)]
struct CreatePlan {
    desc: OperationDescriptor,
    /// One entry per operand slot; `true` marks the variadic slot.
    operands: Vec<(ValuePlan, bool)>,
    attributes: Vec<(String, AttrPlan)>,
    bound: Option<u8>,
}

#[derive(Debug)]
enum StepPlan {
    Values(ValuePlan),
    /// Root result verified unused at match time; nothing replaces it.
    /// On a variadic result slot it stands for every remaining root result.
    Unused { tail: bool },
}

/// Compiled rewrite procedure of one rule.
#[derive(derive_more::Debug)]
pub struct Rewriter {
    rule: String,
    steps: Vec<StepPlan>,
    auxiliary: usize,
    verify: bool,
    #[debug(skip)]
    intern: Arc<VarIntern>,
}

impl Rewriter {
    pub(crate) fn compile(rule: &Rule, ctx: CompileContext<'_>, intern: Arc<VarIntern>) -> Result<Self> {
        let compiler = Compiler { rule: &rule.name, ctx, intern: &intern };
        let auxiliary = rule.results.len() - rule.root_results;
        let variadic_result = ctx
            .descriptors
            .describe(rule.root_op())
            .context(UnknownOperationSnafu { rule: &rule.name, op: rule.root_op() })?
            .variadic_result();
        let steps = rule
            .results
            .iter()
            .enumerate()
            .map(|(position, node)| match node {
                PatternNode::Directive(Directive { kind: DirectiveKind::VerifyUnused, .. }) => {
                    let tail = variadic_result.is_some_and(|slot| position == auxiliary + slot);
                    Ok(StepPlan::Unused { tail })
                }
                other => compiler.value(other, "result pattern", 0).map(StepPlan::Values),
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            rule: rule.name.clone(),
            steps,
            auxiliary,
            verify: ctx.config.verify_created_ops,
            intern,
        })
    }

    /// Run the rewrite for a successful match.
    ///
    /// Fails only on rewrite-stage errors; graph changes made before the
    /// failure are kept.
    pub fn rewrite(&self, graph: &mut dyn GraphRewriter, state: &BindingState) -> Result<RewriteOutcome, RewriteError> {
        let root = state.root();
        let root_results: SmallVec<[ValueId; 2]> = graph.results(root).iter().copied().collect();
        let mut exec = Execution {
            rule: &self.rule,
            intern: &self.intern,
            verify: self.verify,
            store: state.store().clone(),
            created: Vec::new(),
            root_results: &root_results,
        };

        let mut replacements: Vec<Option<ValueId>> = Vec::with_capacity(root_results.len());
        for (position, step) in self.steps.iter().enumerate() {
            let replacing = position >= self.auxiliary;
            match step {
                StepPlan::Unused { tail: false } => replacements.push(None),
                StepPlan::Unused { tail: true } => {
                    let rest = root_results.len().saturating_sub(replacements.len());
                    replacements.extend(std::iter::repeat_n(None, rest));
                }
                StepPlan::Values(plan) => {
                    let base = replacing.then_some(replacements.len());
                    let values = exec.values(graph, plan, base)?;
                    if replacing {
                        replacements.extend(values.into_iter().map(Some));
                    }
                }
            }
        }

        ensure!(
            replacements.len() == root_results.len(),
            ReplacementCountMismatchSnafu {
                rule: &self.rule,
                expected: root_results.len(),
                actual: replacements.len()
            }
        );

        let mut replaced = 0;
        for (old, new) in root_results.iter().zip(&replacements) {
            if let Some(new) = new {
                graph.replace_uses(*old, *new);
                replaced += 1;
            }
        }

        let created = exec.created;
        tracing::debug!(rule = %self.rule, %root, created = created.len(), replaced, "rewrite applied");
        Ok(RewriteOutcome { created, replaced })
    }
}

struct Compiler<'a> {
    rule: &'a str,
    ctx: CompileContext<'a>,
    intern: &'a VarIntern,
}

impl Compiler<'_> {
    fn slot(&self, name: &str) -> Result<u8> {
        self.intern.get_index(name).context(UnboundNameSnafu { rule: self.rule, name })
    }

    fn bound(&self, name: &str) -> Result<(u8, String)> {
        Ok((self.slot(name)?, name.to_string()))
    }

    fn value(&self, node: &PatternNode, op: &str, position: usize) -> Result<ValuePlan> {
        match node {
            PatternNode::Var(var) => {
                let (slot, name) = self.bound(&var.name)?;
                Ok(ValuePlan::Bound { slot, name })
            }
            PatternNode::Op(pattern) => Ok(ValuePlan::Create(Box::new(self.create(pattern)?))),
            PatternNode::Directive(d) => match (&d.kind, d.payload.as_slice()) {
                (DirectiveKind::ReplaceWithValue, [PatternNode::Var(var)]) => {
                    let (slot, name) = self.bound(&var.name)?;
                    Ok(ValuePlan::Bound { slot, name })
                }
                (DirectiveKind::NativeCall(id), payload) => {
                    let call = self.ctx.natives.call(id).cloned().context(UnknownNativeCallSnafu { rule: self.rule, id })?;
                    let args = payload
                        .iter()
                        .enumerate()
                        .map(|(index, arg)| {
                            if is_attribute_node(arg) {
                                self.attr(arg, id, index).map(ArgPlan::Attr)
                            } else {
                                self.value(arg, id, index).map(ArgPlan::Value)
                            }
                        })
                        .collect::<Result<Vec<_>>>()?;
                    Ok(ValuePlan::Native { id: id.clone(), call, args })
                }
                _ => ArgumentKindMismatchSnafu { rule: self.rule, op, position, expected: "a value", found: d.name() }
                    .fail(),
            },
            PatternNode::Attr(_) => {
                ArgumentKindMismatchSnafu { rule: self.rule, op, position, expected: "a value", found: node.kind() }
                    .fail()
            }
        }
    }

    fn create(&self, pattern: &OpPattern) -> Result<CreatePlan> {
        let desc = self
            .ctx
            .descriptors
            .describe(&pattern.name)
            .cloned()
            .context(UnknownOperationSnafu { rule: self.rule, op: &pattern.name })?;

        let mut operands = Vec::new();
        let mut attributes = Vec::new();
        for (position, child) in pattern.children.iter().enumerate() {
            match Slot::of(&desc, position) {
                Slot::Operand(def) => operands.push((self.value(child, &pattern.name, position)?, def.variadic)),
                Slot::Attribute(def) => attributes.push((def.name.clone(), self.attr(child, &pattern.name, position)?)),
            }
        }
        let bound = pattern.bound.as_deref().map(|name| self.slot(name)).transpose()?;
        Ok(CreatePlan { desc, operands, attributes, bound })
    }

    fn attr(&self, node: &PatternNode, op: &str, position: usize) -> Result<AttrPlan> {
        match node {
            PatternNode::Attr(attr) => {
                let (slot, name) = self.bound(&attr.name)?;
                Ok(AttrPlan::Bound { slot, name })
            }
            PatternNode::Directive(d) => match &d.kind {
                DirectiveKind::ConstantAttr(attr) => Ok(AttrPlan::Constant(attr.clone())),
                DirectiveKind::AttrTransform(id) => {
                    let transform =
                        self.ctx.natives.transform(id).cloned().context(UnknownAttrTransformSnafu { rule: self.rule, id })?;
                    let args = d
                        .payload
                        .iter()
                        .enumerate()
                        .map(|(index, arg)| self.attr(arg, id, index))
                        .collect::<Result<Vec<_>>>()?;
                    Ok(AttrPlan::Transform { id: id.clone(), transform, args })
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
}

/// State of one running rewrite.
struct Execution<'a> {
    rule: &'a str,
    intern: &'a VarIntern,
    verify: bool,
    store: BindingStore,
    created: Vec<OpId>,
    root_results: &'a [ValueId],
}

impl Execution<'_> {
    fn binding(&self, slot: u8, name: &str) -> Result<&Binding, RewriteError> {
        self.store.get_by_index(slot).context(UnboundAtRewriteSnafu { rule: self.rule, name })
    }

    /// Values produced by `plan`. `base` is the flattened replacement index of
    /// the first value when `plan` sits at a replacement position.
    fn values(
        &mut self,
        graph: &mut dyn GraphRewriter,
        plan: &ValuePlan,
        base: Option<usize>,
    ) -> Result<Values, RewriteError> {
        match plan {
            ValuePlan::Bound { slot, name } => {
                let binding = self.binding(*slot, name)?;
                Ok(binding.values(&*graph))
            }
            ValuePlan::Create(create) => {
                let op = self.create(graph, create, base)?;
                Ok(graph.results(op).iter().copied().collect())
            }
            ValuePlan::Native { id, call, args } => {
                let mut resolved = Vec::with_capacity(args.len());
                for arg in args {
                    resolved.push(match arg {
                        ArgPlan::Attr(attr) => NativeArg::Attr(self.attr(attr)?),
                        ArgPlan::Value(value) => match self.values(graph, value, None)?.as_slice() {
                            [single] => NativeArg::Value(*single),
                            many => NativeArg::Values(many.iter().copied().collect()),
                        },
                    });
                }
                tracing::trace!(rule = %self.rule, id = %id, args = resolved.len(), "invoking native call");
                Ok(call(&mut *graph, &resolved)?.into_iter().collect())
            }
        }
    }

    fn attr(&self, plan: &AttrPlan) -> Result<Attribute, RewriteError> {
        match plan {
            AttrPlan::Bound { slot, name } => self
                .binding(*slot, name)?
                .as_attribute()
                .cloned()
                .context(UnboundAtRewriteSnafu { rule: self.rule, name }),
            AttrPlan::Constant(attr) => Ok(attr.clone()),
            AttrPlan::Transform { transform, args, .. } => {
                let attrs = args.iter().map(|arg| self.attr(arg)).collect::<Result<Vec<_>, _>>()?;
                transform(&attrs)
            }
        }
    }

    fn create(&mut self, graph: &mut dyn GraphRewriter, plan: &CreatePlan, base: Option<usize>) -> Result<OpId, RewriteError> {
        let name = plan.desc.name();

        let mut operands = Vec::with_capacity(plan.operands.len());
        for (position, (operand, variadic)) in plan.operands.iter().enumerate() {
            let values = self.values(graph, operand, None)?;
            match values.as_slice() {
                _ if *variadic => operands.extend(values.iter().copied()),
                [value] => operands.push(*value),
                other => return ExpectedSingleValueSnafu { op: name, position, count: other.len() }.fail(),
            }
        }

        let mut attributes = Vec::with_capacity(plan.attributes.len());
        for (attr_name, attr) in &plan.attributes {
            attributes.push((attr_name.clone(), self.attr(attr)?));
        }

        let result_types = self.result_types(&*graph, &plan.desc, &operands, base)?;
        let state =
            OperationState::builder().name(name).operands(operands).attributes(attributes).result_types(result_types).build();
        let op = graph.create_op(state).context(GraphSnafu)?;
        if self.verify {
            plan.desc.verify(&*graph, op).context(VerificationFailedSnafu)?;
        }

        if let Some(slot) = plan.bound {
            self.store.set_binding(slot, Binding::OpResult(graph.results(op).iter().copied().collect()));
        }
        tracing::trace!(rule = %self.rule, %op, name, bound = ?plan.bound.and_then(|s| self.intern.get_name(s)), "created operation");
        self.created.push(op);
        Ok(op)
    }

    fn result_types(
        &self,
        graph: &dyn GraphAccess,
        desc: &OperationDescriptor,
        operands: &[ValueId],
        base: Option<usize>,
    ) -> Result<Vec<DType>, RewriteError> {
        let replaced = |index: usize| base.and_then(|base| self.root_results.get(base + index));
        let mut types = Vec::with_capacity(desc.results().len());
        for (index, def) in desc.results().iter().enumerate() {
            let cannot_infer = CannotInferResultTypeSnafu { op: desc.name(), result: index };
            match &def.ty {
                // A variadic result takes over every remaining root result.
                ResultType::FromReplaced if def.variadic => {
                    let start = base.context(cannot_infer)? + index;
                    let rest = self.root_results.get(start..).unwrap_or_default();
                    types.extend(rest.iter().map(|value| graph.value_type(*value).clone()));
                }
                ResultType::FromReplaced => {
                    let value = replaced(index).context(cannot_infer)?;
                    types.push(graph.value_type(*value).clone());
                }
                ResultType::SameAsOperand(operand) => {
                    let value = operands.get(*operand).context(cannot_infer)?;
                    types.push(graph.value_type(*value).clone());
                }
                ResultType::Fixed(dtype) => types.push(dtype.clone()),
            }
        }
        Ok(types)
    }
}
