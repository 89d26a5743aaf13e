//! Common imports for building graphs and descriptors.
//!
//! ```rust,ignore
//! use drr_ir::prelude::*;
//! ```

pub use crate::constraint::{Constraint, Subject};
pub use crate::descriptor::{
    AttributeDef, DescriptorRegistry, Dialect, OperandDef, OperationDescriptor, ResultDef, ResultType,
};
pub use crate::graph::{Graph, GraphAccess, GraphRewriter, OperationState};
pub use crate::types::{Attribute, OpId, OpOperand, ValueId};

pub use drr_dtype::{DType, ScalarDType};
