use snafu::Snafu;

use crate::{OpId, ValueId};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Handle does not belong to this graph.
    #[snafu(display("value {value} is not defined in this graph"))]
    UnknownValue { value: ValueId },

    /// Operand refers to a result of an erased operation.
    #[snafu(display("operand {index} of '{op}' refers to {value}, whose defining operation was erased"))]
    DeadOperand { op: String, index: usize, value: ValueId },

    /// Erasing an operation whose results are still consumed.
    #[snafu(display("cannot erase {op} ('{name}'): result {result} still has {uses} use(s)"))]
    ResultsInUse { op: OpId, name: String, result: ValueId, uses: usize },

    #[snafu(display("{op} was already erased"))]
    AlreadyErased { op: OpId },

    /// Descriptor registered twice under the same name.
    #[snafu(display("operation '{name}' is already registered in dialect '{dialect}'"))]
    DuplicateDescriptor { dialect: String, name: String },

    /// Variadic slot not in the last position of its list.
    #[snafu(display("'{op}': variadic {kind} '{slot}' must be the last {kind}"))]
    VariadicNotLast { op: String, kind: &'static str, slot: String },

    #[snafu(display("'{op}': at most one variadic {kind} is allowed, found {count}"))]
    MultipleVariadic { op: String, kind: &'static str, count: usize },

    /// Concrete operation does not satisfy its descriptor.
    #[snafu(display("'{op}' failed verification: {reason}"))]
    VerificationFailed { op: String, reason: String },
}
