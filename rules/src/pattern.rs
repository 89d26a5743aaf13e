//! Pattern tree shared by source and result patterns.
//!
//! A source pattern describes the shape to look for, walking backward from
//! the root operation through operand producers. Result patterns describe
//! what to build. Children of an operation pattern are positional over the
//! operation's descriptor: one child per operand slot, then one per
//! attribute slot.

use drr_ir::{Attribute, Constraint};

#[derive(Debug, Clone)]
pub enum PatternNode {
    Op(OpPattern),
    /// Operand value, bound by name (optionally constrained).
    Var(VarPattern),
    /// Attribute, bound by name (optionally constrained).
    Attr(AttrPattern),
    Directive(Directive),
}

#[derive(Debug, Clone)]
pub struct OpPattern {
    pub name: String,
    pub children: Vec<PatternNode>,
    pub bound: Option<String>,
}

#[derive(Debug, Clone)]
pub struct VarPattern {
    pub name: String,
    pub constraint: Option<Constraint>,
}

#[derive(Debug, Clone)]
pub struct AttrPattern {
    pub name: String,
    pub constraint: Option<Constraint>,
}

#[derive(Debug, Clone, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum DirectiveKind {
    /// Use a previously bound value; creates nothing.
    ReplaceWithValue,
    /// Root result at this position must have no uses. Checked at match time.
    VerifyUnused,
    /// Call a registered native builder with the resolved payload.
    NativeCall(String),
    /// Literal attribute in an attribute slot.
    ConstantAttr(Attribute),
    /// Combine the payload's attributes with a registered transform.
    AttrTransform(String),
}

#[derive(Debug, Clone)]
pub struct Directive {
    pub kind: DirectiveKind,
    pub payload: Vec<PatternNode>,
}

impl Directive {
    pub fn name(&self) -> &'static str {
        (&self.kind).into()
    }
}

impl PatternNode {
    pub fn op(name: impl Into<String>, children: Vec<PatternNode>) -> Self {
        Self::Op(OpPattern { name: name.into(), children, bound: None })
    }

    pub fn var(name: impl Into<String>) -> Self {
        Self::Var(VarPattern { name: name.into(), constraint: None })
    }

    pub fn var_with(name: impl Into<String>, constraint: Constraint) -> Self {
        Self::Var(VarPattern { name: name.into(), constraint: Some(constraint) })
    }

    pub fn attr(name: impl Into<String>) -> Self {
        Self::Attr(AttrPattern { name: name.into(), constraint: None })
    }

    pub fn attr_with(name: impl Into<String>, constraint: Constraint) -> Self {
        Self::Attr(AttrPattern { name: name.into(), constraint: Some(constraint) })
    }

    pub fn replace_with(name: impl Into<String>) -> Self {
        Self::directive(DirectiveKind::ReplaceWithValue, vec![Self::var(name)])
    }

    pub fn verify_unused() -> Self {
        Self::directive(DirectiveKind::VerifyUnused, Vec::new())
    }

    pub fn native(id: impl Into<String>, args: Vec<PatternNode>) -> Self {
        Self::directive(DirectiveKind::NativeCall(id.into()), args)
    }

    pub fn constant(attr: Attribute) -> Self {
        Self::directive(DirectiveKind::ConstantAttr(attr), Vec::new())
    }

    pub fn transform(id: impl Into<String>, args: Vec<PatternNode>) -> Self {
        Self::directive(DirectiveKind::AttrTransform(id.into()), args)
    }

    pub fn directive(kind: DirectiveKind, payload: Vec<PatternNode>) -> Self {
        Self::Directive(Directive { kind, payload })
    }

    /// Bind the operation matched (or built) by this node to `name`.
    ///
    /// No effect on nodes other than operation patterns.
    pub fn bound(mut self, name: impl Into<String>) -> Self {
        if let Self::Op(op) = &mut self {
            op.bound = Some(name.into());
        }
        self
    }

    /// Node kind, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Op(_) => "operation",
            Self::Var(_) => "variable",
            Self::Attr(_) => "attribute",
            Self::Directive(d) => d.name(),
        }
    }

    pub fn as_op(&self) -> Option<&OpPattern> {
        match self {
            Self::Op(op) => Some(op),
            _ => None,
        }
    }

    /// Number of operation patterns in this tree, including this node.
    pub fn op_count(&self) -> usize {
        match self {
            Self::Op(op) => 1 + op.children.iter().map(Self::op_count).sum::<usize>(),
            Self::Directive(d) => d.payload.iter().map(Self::op_count).sum(),
            Self::Var(_) | Self::Attr(_) => 0,
        }
    }

    /// Nesting depth of operation patterns (an operation with only leaves has depth 1).
    pub fn depth(&self) -> usize {
        match self {
            Self::Op(op) => 1 + op.children.iter().map(Self::depth).max().unwrap_or(0),
            Self::Directive(d) => d.payload.iter().map(Self::depth).max().unwrap_or(0),
            Self::Var(_) | Self::Attr(_) => 0,
        }
    }
}
