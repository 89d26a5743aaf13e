//! Compiled rules and the per-operation rule table.

use std::collections::BTreeMap;
use std::sync::Arc;

use bon::bon;
use drr_ir::{DescriptorRegistry, GraphAccess, GraphRewriter, OpId};

use crate::binding::BindingState;
use crate::config::CompileConfig;
use crate::error::{Error, Result, RewriteError};
use crate::matcher::Matcher;
use crate::native::NativeRegistry;
use crate::rewriter::{RewriteOutcome, Rewriter};
use crate::rule::{CompileContext, Rule, RuleSpec};

/// A compiled rule: immutable match and rewrite procedures.
#[derive(Debug)]
pub struct GeneratedRule {
    name: String,
    root: String,
    benefit: i64,
    matcher: Matcher,
    rewriter: Rewriter,
}

impl GeneratedRule {
    #[tracing::instrument(skip_all, fields(rule = %spec.name))]
    pub fn compile(spec: RuleSpec, ctx: CompileContext<'_>) -> Result<Self> {
        let rule = Rule::new(spec, ctx)?;
        let intern = Arc::new(rule.intern.clone());
        let matcher = Matcher::compile(&rule, ctx, Arc::clone(&intern))?;
        let rewriter = Rewriter::compile(&rule, ctx, intern)?;
        tracing::debug!(root = %rule.root_op(), benefit = rule.benefit(), "rule compiled");

        Ok(Self { root: rule.root_op().to_string(), benefit: rule.benefit(), name: rule.name, matcher, rewriter })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the operation this rule is anchored at.
    pub fn root_op(&self) -> &str {
        &self.root
    }

    pub fn benefit(&self) -> i64 {
        self.benefit
    }

    pub fn try_match(&self, graph: &dyn GraphAccess, op: OpId) -> Option<BindingState> {
        self.matcher.matches(graph, op)
    }

    pub fn rewrite(&self, graph: &mut dyn GraphRewriter, state: &BindingState) -> Result<RewriteOutcome, RewriteError> {
        self.rewriter.rewrite(graph, state)
    }
}

/// Result of a batch compilation. Each rule compiles independently.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Names of the rules that compiled and were registered, in input order.
    pub registered: Vec<String>,
    pub failed: Vec<Error>,
}

impl BatchReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// A rule that matched and was applied.
#[derive(Debug, Clone)]
pub struct Applied {
    pub rule: Arc<GeneratedRule>,
    pub outcome: RewriteOutcome,
}

/// Rules keyed by root operation name, each list ordered by benefit
/// (descending) and then registration order.
#[derive(derive_more::Debug)]
pub struct RuleRegistry {
    #[debug(skip)]
    descriptors: Arc<dyn DescriptorRegistry>,
    natives: NativeRegistry,
    config: CompileConfig,
    rules: BTreeMap<String, Vec<Arc<GeneratedRule>>>,
    len: usize,
}

#[bon]
impl RuleRegistry {
    #[builder]
    pub fn new(
        descriptors: Arc<dyn DescriptorRegistry>,
        #[builder(default)] natives: NativeRegistry,
        #[builder(default)] config: CompileConfig,
    ) -> Self {
        Self { descriptors, natives, config, rules: BTreeMap::new(), len: 0 }
    }
}

impl RuleRegistry {
    fn context(&self) -> CompileContext<'_> {
        CompileContext { descriptors: self.descriptors.as_ref(), natives: &self.natives, config: &self.config }
    }

    /// Compile a rule without registering it.
    pub fn compile_rule(&self, spec: RuleSpec) -> Result<GeneratedRule> {
        GeneratedRule::compile(spec, self.context())
    }

    /// Compile and register one rule.
    pub fn compile(&mut self, spec: RuleSpec) -> Result<Arc<GeneratedRule>> {
        let rule = self.compile_rule(spec)?;
        Ok(self.register(rule))
    }

    /// Compile and register a batch. A failing rule is reported and skipped;
    /// it never prevents the others from registering.
    #[tracing::instrument(skip_all)]
    pub fn compile_all(&mut self, specs: impl IntoIterator<Item = RuleSpec>) -> BatchReport {
        let mut report = BatchReport::default();
        for spec in specs {
            match self.compile(spec) {
                Ok(rule) => report.registered.push(rule.name().to_string()),
                Err(error) => {
                    tracing::warn!(rule = %error.rule(), %error, "rule rejected");
                    report.failed.push(error);
                }
            }
        }
        tracing::debug!(registered = report.registered.len(), failed = report.failed.len(), "batch compiled");
        report
    }

    /// Register a compiled rule after every rule of greater or equal benefit.
    pub fn register(&mut self, rule: GeneratedRule) -> Arc<GeneratedRule> {
        let rule = Arc::new(rule);
        let list = self.rules.entry(rule.root_op().to_string()).or_default();
        let position = list.partition_point(|existing| existing.benefit() >= rule.benefit());
        list.insert(position, Arc::clone(&rule));
        self.len += 1;
        tracing::debug!(rule = %rule.name(), root = %rule.root_op(), benefit = rule.benefit(), position, "rule registered");
        rule
    }

    /// Rules anchored at `op_name`, in the order they must be tried.
    pub fn rules_for(&self, op_name: &str) -> &[Arc<GeneratedRule>] {
        self.rules.get(op_name).map(Vec::as_slice).unwrap_or_default()
    }

    /// All rules, grouped by root operation name.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<GeneratedRule>> {
        self.rules.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Try the rules for `op` in order and apply the first that matches.
    ///
    /// A rewrite failure is returned as is; later rules are not tried.
    pub fn apply_first(&self, graph: &mut dyn GraphRewriter, op: OpId) -> Result<Option<Applied>, RewriteError> {
        let name = graph.op_name(op).to_string();
        for rule in self.rules_for(&name) {
            let Some(state) = rule.try_match(&*graph, op) else {
                continue;
            };
            let outcome = rule.rewrite(graph, &state)?;
            return Ok(Some(Applied { rule: Arc::clone(rule), outcome }));
        }
        tracing::trace!(%op, op_name = %name, "no rule applied");
        Ok(None)
    }
}
