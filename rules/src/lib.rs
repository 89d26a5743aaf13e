//! Declarative graph-rewrite rule compiler.
//!
//! A rule pairs a source pattern over an operation graph with result
//! patterns, multi-entity constraints and a benefit. Compiling a rule
//! validates it against the operation descriptors and synthesizes two
//! procedures: a matcher (walks backward from a root operation, binding
//! names) and a rewriter (builds the replacement and redirects uses).
//!
//! - [`pattern`] - the pattern tree shared by source and result patterns
//! - [`rule`] - rule specifications and validation
//! - [`matcher`] / [`rewriter`] - synthesized procedures
//! - [`registry`] - compiled rules ranked by benefit
//! - [`native`] - registered native builders and attribute transforms
//!
//! ```rust,ignore
//! use drr_rules::prelude::*;
//!
//! let mut registry = RuleRegistry::builder().descriptors(Arc::new(dialect)).build();
//! registry.compile(
//!     RuleSpec::builder()
//!         .name("a_to_b")
//!         .source(PatternNode::op("op_a", vec![PatternNode::var("x"), PatternNode::attr("attr")]))
//!         .results(vec![PatternNode::op("op_b", vec![PatternNode::var("x"), PatternNode::attr("attr")])])
//!         .build(),
//! )?;
//! registry.apply_first(&mut graph, op)?;
//! ```

pub mod binding;
pub mod config;
pub mod error;
pub mod matcher;
pub mod native;
pub mod pattern;
pub mod prelude;
pub mod registry;
pub mod rewriter;
pub mod rule;


pub use binding::{Binding, BindingState};
pub use config::CompileConfig;
pub use error::{Error, Result, RewriteError};
pub use matcher::Matcher;
pub use native::{NativeArg, NativeRegistry};
pub use pattern::{DirectiveKind, PatternNode};
pub use registry::{Applied, BatchReport, GeneratedRule, RuleRegistry};
pub use rewriter::{RewriteOutcome, Rewriter};
pub use rule::{CompileContext, EntityConstraint, Rule, RuleSpec};
