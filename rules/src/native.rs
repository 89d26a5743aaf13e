//! Statically registered extension points: native builders and attribute transforms.

use std::collections::HashMap;
use std::sync::Arc;

use drr_ir::{Attribute, GraphRewriter, ValueId};
use smallvec::SmallVec;

use crate::error::RewriteError;

/// Resolved argument handed to a native call, in payload order.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeArg {
    Value(ValueId),
    Values(SmallVec<[ValueId; 4]>),
    Attr(Attribute),
}

impl NativeArg {
    pub fn as_value(&self) -> Option<ValueId> {
        match self {
            Self::Value(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_attr(&self) -> Option<&Attribute> {
        match self {
            Self::Attr(attr) => Some(attr),
            _ => None,
        }
    }
}

/// Builds (and wires up) replacement IR; returns the values it produced.
pub type NativeCallFn =
    Arc<dyn Fn(&mut dyn GraphRewriter, &[NativeArg]) -> Result<Vec<ValueId>, RewriteError> + Send + Sync>;

/// Combines resolved attributes into one.
pub type AttrTransformFn = Arc<dyn Fn(&[Attribute]) -> Result<Attribute, RewriteError> + Send + Sync>;

#[derive(Clone, Default, derive_more::Debug)]
pub struct NativeRegistry {
    #[debug("{:?}", calls.keys())]
    calls: HashMap<String, NativeCallFn>,
    #[debug("{:?}", transforms.keys())]
    transforms: HashMap<String, AttrTransformFn>,
}

impl NativeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a native call under `id`, replacing any previous one.
    pub fn register_call<F>(&mut self, id: impl Into<String>, call: F) -> &mut Self
    where
        F: Fn(&mut dyn GraphRewriter, &[NativeArg]) -> Result<Vec<ValueId>, RewriteError> + Send + Sync + 'static,
    {
        let id = id.into();
        tracing::debug!(id = %id, "registered native call");
        self.calls.insert(id, Arc::new(call));
        self
    }

    /// Register an attribute transform under `id`, replacing any previous one.
    pub fn register_transform<F>(&mut self, id: impl Into<String>, transform: F) -> &mut Self
    where
        F: Fn(&[Attribute]) -> Result<Attribute, RewriteError> + Send + Sync + 'static,
    {
        let id = id.into();
        tracing::debug!(id = %id, "registered attribute transform");
        self.transforms.insert(id, Arc::new(transform));
        self
    }

    pub fn call(&self, id: &str) -> Option<&NativeCallFn> {
        self.calls.get(id)
    }

    pub fn transform(&self, id: &str) -> Option<&AttrTransformFn> {
        self.transforms.get(id)
    }
}
