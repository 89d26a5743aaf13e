use snafu::Snafu;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Rule authoring errors. Each one is fatal to the rule it names and to no other.
#[derive(Debug, Clone, PartialEq, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("rule '{rule}': unknown operation '{op}'"))]
    UnknownOperation { rule: String, op: String },

    /// Descriptor referenced by the rule breaks the variadic slot rules.
    #[snafu(display("rule '{rule}': invalid descriptor: {source}"))]
    InvalidDescriptor { rule: String, source: drr_ir::Error },

    #[snafu(display("rule '{rule}': source pattern root must be an operation pattern"))]
    RootNotOperation { rule: String },

    #[snafu(display("rule '{rule}': '{op}' takes {expected} argument(s), pattern has {actual}"))]
    ArityMismatch { rule: String, op: String, expected: usize, actual: usize },

    /// Wrong node kind for a position (an attribute reference in an operand slot, etc.).
    #[snafu(display("rule '{rule}': argument {position} of '{op}' must be {expected}, found {found}"))]
    ArgumentKindMismatch { rule: String, op: String, position: usize, expected: &'static str, found: &'static str },

    #[snafu(display("rule '{rule}': variadic slot '{slot}' of '{op}' must hold a single variable"))]
    VariadicSlotNotVariable { rule: String, op: String, slot: String },

    #[snafu(display("rule '{rule}': directive '{directive}' is only allowed in result patterns"))]
    DirectiveInSource { rule: String, directive: &'static str },

    #[snafu(display("rule '{rule}': name '{name}' is not bound"))]
    UnboundName { rule: String, name: String },

    /// Result pattern refers to a name introduced by a later result pattern.
    #[snafu(display("rule '{rule}': result pattern {position} refers to '{name}' before it is introduced"))]
    ForwardReference { rule: String, name: String, position: usize },

    #[snafu(display("rule '{rule}': name '{name}' is bound more than once"))]
    DuplicateBinding { rule: String, name: String },

    #[snafu(display("rule '{rule}': name '{name}' is used as {first} and as {second}"))]
    KindConflict { rule: String, name: String, first: &'static str, second: &'static str },

    #[snafu(display("rule '{rule}': result pattern rebinds source name '{name}'"))]
    ShadowsSourceName { rule: String, name: String },

    #[snafu(display("rule '{rule}': constraint '{constraint}' refers to unbound name '{name}'"))]
    UnboundConstraintName { rule: String, constraint: String, name: String },

    #[snafu(display("rule '{rule}': malformed '{directive}' directive: {reason}"))]
    MalformedDirective { rule: String, directive: &'static str, reason: String },

    #[snafu(display("rule '{rule}': 'verify_unused' is only allowed as a top-level replacement pattern"))]
    MisplacedVerifyUnused { rule: String },

    #[snafu(display("rule '{rule}': root has {expected} result(s) but only {actual} result pattern(s) are given"))]
    TooFewResultPatterns { rule: String, expected: usize, actual: usize },

    #[snafu(display("rule '{rule}': unknown native call '{id}'"))]
    UnknownNativeCall { rule: String, id: String },

    #[snafu(display("rule '{rule}': unknown attribute transform '{id}'"))]
    UnknownAttrTransform { rule: String, id: String },

    #[snafu(display("rule '{rule}': pattern is nested deeper than {max} levels"))]
    PatternTooDeep { rule: String, max: usize },

    #[snafu(display("rule '{rule}': {count} bound names exceed the limit of {max}"))]
    TooManyBindings { rule: String, count: usize, max: usize },
}

impl Error {
    /// Name of the rule that failed to compile.
    pub fn rule(&self) -> &str {
        match self {
            Self::UnknownOperation { rule, .. }
            | Self::InvalidDescriptor { rule, .. }
            | Self::RootNotOperation { rule }
            | Self::ArityMismatch { rule, .. }
            | Self::ArgumentKindMismatch { rule, .. }
            | Self::VariadicSlotNotVariable { rule, .. }
            | Self::DirectiveInSource { rule, .. }
            | Self::UnboundName { rule, .. }
            | Self::ForwardReference { rule, .. }
            | Self::DuplicateBinding { rule, .. }
            | Self::KindConflict { rule, .. }
            | Self::ShadowsSourceName { rule, .. }
            | Self::UnboundConstraintName { rule, .. }
            | Self::MalformedDirective { rule, .. }
            | Self::MisplacedVerifyUnused { rule }
            | Self::TooFewResultPatterns { rule, .. }
            | Self::UnknownNativeCall { rule, .. }
            | Self::UnknownAttrTransform { rule, .. }
            | Self::PatternTooDeep { rule, .. }
            | Self::TooManyBindings { rule, .. } => rule,
        }
    }
}

/// Failure after a successful match. Fatal to the optimization step; nothing is rolled back.
#[derive(Debug, Clone, PartialEq, Snafu)]
#[snafu(visibility(pub))]
pub enum RewriteError {
    #[snafu(display("graph mutation failed: {source}"))]
    Graph { source: drr_ir::Error },

    #[snafu(display("rule '{rule}': name '{name}' has no binding at rewrite time"))]
    UnboundAtRewrite { rule: String, name: String },

    #[snafu(display("cannot infer the type of result {result} of '{op}'"))]
    CannotInferResultType { op: String, result: usize },

    #[snafu(display("rule '{rule}': {actual} replacement value(s) for {expected} root result(s)"))]
    ReplacementCountMismatch { rule: String, expected: usize, actual: usize },

    #[snafu(display("native call '{id}' failed: {reason}"))]
    NativeCallFailed { id: String, reason: String },

    #[snafu(display("attribute transform '{id}' failed: {reason}"))]
    AttrTransformFailed { id: String, reason: String },

    #[snafu(display("operand {position} of '{op}' needs exactly one value, got {count}"))]
    ExpectedSingleValue { op: String, position: usize, count: usize },

    #[snafu(display("created operation failed verification: {source}"))]
    VerificationFailed { source: drr_ir::Error },
}
