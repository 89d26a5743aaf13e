//! Host graph substrate for the declarative rewrite rule compiler.
//!
//! This crate holds everything the rule compiler consumes but does not own:
//!
//! - [`graph`] - the operation graph and the [`GraphAccess`]/[`GraphRewriter`] seams
//! - [`types`] - handles ([`OpId`], [`ValueId`]) and [`Attribute`] values
//! - [`descriptor`] - operation descriptors and the [`DescriptorRegistry`] seam
//! - [`constraint`] - single-entity predicates over values and attributes
//! - [`error`] - error types and result handling

pub mod constraint;
pub mod descriptor;
pub mod error;
pub mod graph;
pub mod prelude;
pub mod types;


pub use constraint::{Constraint, ConstraintFault, Subject};
pub use descriptor::{
    AttributeDef, DescriptorRegistry, Dialect, OperandDef, OperationDescriptor, ResultDef, ResultType,
};
pub use error::{Error, Result};
pub use graph::{Graph, GraphAccess, GraphRewriter, OperationState, ValueDef};
pub use types::{Attribute, OpId, OpOperand, ValueId};

pub use drr_dtype::{DType, ScalarDType};
