//! Common imports for writing and applying rules.

pub use crate::binding::{Binding, BindingState};
pub use crate::config::CompileConfig;
pub use crate::native::{NativeArg, NativeRegistry};
pub use crate::pattern::{DirectiveKind, PatternNode};
pub use crate::registry::{Applied, GeneratedRule, RuleRegistry};
pub use crate::rewriter::RewriteOutcome;
pub use crate::rule::{EntityConstraint, RuleSpec};
