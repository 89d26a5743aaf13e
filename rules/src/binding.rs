//! Per-attempt binding storage.
//!
//! Names are interned once per rule into compact `u8` slots; a match attempt
//! records bindings in a small inline vector keyed by slot.

use std::collections::HashMap;
use std::sync::Arc;

use drr_ir::{Attribute, GraphAccess, OpId, ValueId};
use smallvec::SmallVec;

/// What a name is bound to.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    Operand(ValueId),
    /// Whole range of a variadic operand slot.
    Operands(SmallVec<[ValueId; 4]>),
    Attribute(Attribute),
    /// Results of the matched root, or of an operation built by a result pattern.
    OpResult(SmallVec<[ValueId; 2]>),
    /// Nested operation matched by the source pattern.
    SubOp(OpId),
}

impl Binding {
    /// Values this binding stands for when used as an operand.
    pub fn values(&self, graph: &dyn GraphAccess) -> SmallVec<[ValueId; 4]> {
        match self {
            Self::Operand(value) => smallvec::smallvec![*value],
            Self::Operands(values) => values.clone(),
            Self::OpResult(values) => values.iter().copied().collect(),
            Self::SubOp(op) => graph.results(*op).iter().copied().collect(),
            Self::Attribute(_) => SmallVec::new(),
        }
    }

    /// The single value of this binding, if it stands for exactly one.
    pub fn single_value(&self, graph: &dyn GraphAccess) -> Option<ValueId> {
        match self.values(graph).as_slice() {
            [value] => Some(*value),
            _ => None,
        }
    }

    pub fn as_attribute(&self) -> Option<&Attribute> {
        match self {
            Self::Attribute(attr) => Some(attr),
            _ => None,
        }
    }
}

/// Single binding entry: (slot, binding).
pub type BindingEntry = (u8, Binding);

/// Inline storage for typical rules (up to 4 bindings).
pub type BindingStore = SmallVec<[BindingEntry; 4]>;

/// Name interning table for one rule.
#[derive(Debug, Clone, Default)]
pub struct VarIntern {
    names: Vec<String>,
    indices: HashMap<String, u8>,
}

impl VarIntern {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the slot for `name`. `None` once all `u8` slots are taken.
    pub fn get_or_insert(&mut self, name: &str) -> Option<u8> {
        if let Some(&idx) = self.indices.get(name) {
            return Some(idx);
        }
        let idx = u8::try_from(self.names.len()).ok()?;
        self.names.push(name.to_string());
        self.indices.insert(name.to_string(), idx);
        Some(idx)
    }

    pub fn get_index(&self, name: &str) -> Option<u8> {
        self.indices.get(name).copied()
    }

    pub fn get_name(&self, idx: u8) -> Option<&str> {
        self.names.get(idx as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

pub trait BindingStoreExt {
    fn get_by_index(&self, idx: u8) -> Option<&Binding>;

    /// Insert or overwrite the binding at `idx`.
    /// Named `set_binding` to avoid conflict with `SmallVec::insert`.
    fn set_binding(&mut self, idx: u8, binding: Binding);
}

impl BindingStoreExt for BindingStore {
    fn get_by_index(&self, idx: u8) -> Option<&Binding> {
        self.iter().find(|(i, _)| *i == idx).map(|(_, binding)| binding)
    }

    fn set_binding(&mut self, idx: u8, binding: Binding) {
        for (i, existing) in self.iter_mut() {
            if *i == idx {
                *existing = binding;
                return;
            }
        }
        self.push((idx, binding));
    }
}

/// Bindings of one successful match, handed to the rewriter.
#[derive(Debug, Clone)]
pub struct BindingState {
    root: OpId,
    store: BindingStore,
    intern: Arc<VarIntern>,
}

impl BindingState {
    pub(crate) fn new(root: OpId, store: BindingStore, intern: Arc<VarIntern>) -> Self {
        Self { root, store, intern }
    }

    /// The matched root operation.
    pub fn root(&self) -> OpId {
        self.root
    }

    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.intern.get_index(name).and_then(|idx| self.store.get_by_index(idx))
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// `(name, binding)` pairs in binding order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Binding)> {
        self.store.iter().filter_map(|(idx, binding)| self.intern.get_name(*idx).map(|name| (name, binding)))
    }

    pub(crate) fn store(&self) -> &BindingStore {
        &self.store
    }
}
