//! Graph handles and attribute values.

use std::fmt;

use drr_dtype::{DType, ScalarDType};

/// Handle of an operation inside a [`Graph`](crate::Graph).
///
/// Handles stay valid after the operation is erased; the slot becomes a
/// tombstone and [`GraphAccess::is_live`](crate::GraphAccess::is_live) turns false.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
#[display("op{_0}")]
pub struct OpId(pub(crate) u32);

/// Handle of a value (operation result or graph argument).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
#[display("%{_0}")]
pub struct ValueId(pub(crate) u32);

impl OpId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl ValueId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One use of a value: operand `index` of operation `op`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OpOperand {
    pub op: OpId,
    pub index: usize,
}

/// Compile-time constant data attached to an operation.
#[derive(Debug, Clone, strum::IntoStaticStr)]
pub enum Attribute {
    #[strum(serialize = "integer")]
    Int { value: i64, dtype: ScalarDType },
    #[strum(serialize = "float")]
    Float { value: f64, dtype: ScalarDType },
    #[strum(serialize = "bool")]
    Bool(bool),
    #[strum(serialize = "string")]
    Str(String),
    #[strum(serialize = "type")]
    Type(DType),
    #[strum(serialize = "array")]
    Array(Vec<Attribute>),
    #[strum(serialize = "unit")]
    Unit,
}

impl Attribute {
    pub fn int(value: i64, dtype: ScalarDType) -> Self {
        Self::Int { value, dtype }
    }

    pub fn i32(value: i32) -> Self {
        Self::Int { value: value as i64, dtype: ScalarDType::Int32 }
    }

    pub fn i64(value: i64) -> Self {
        Self::Int { value, dtype: ScalarDType::Int64 }
    }

    pub fn f32(value: f32) -> Self {
        Self::Float { value: value as f64, dtype: ScalarDType::Float32 }
    }

    pub fn str(value: impl Into<String>) -> Self {
        Self::Str(value.into())
    }

    /// Name of the attribute kind, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        self.into()
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int { value, .. } => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Scalar type of numeric attributes.
    pub fn scalar_dtype(&self) -> Option<ScalarDType> {
        match self {
            Self::Int { dtype, .. } | Self::Float { dtype, .. } => Some(*dtype),
            Self::Bool(_) => Some(ScalarDType::Bool),
            _ => None,
        }
    }
}

impl PartialEq for Attribute {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Int { value: a, dtype: da }, Self::Int { value: b, dtype: db }) => a == b && da == db,
            // Bitwise so that NaN attributes are equal to themselves.
            (Self::Float { value: a, dtype: da }, Self::Float { value: b, dtype: db }) => {
                a.to_bits() == b.to_bits() && da == db
            }
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Type(a), Self::Type(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => a == b,
            (Self::Unit, Self::Unit) => true,
            _ => false,
        }
    }
}

impl Eq for Attribute {}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int { value, dtype } => write!(f, "{value} : {dtype}"),
            Self::Float { value, dtype } => write!(f, "{value:?} : {dtype}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Str(s) => write!(f, "{s:?}"),
            Self::Type(t) => write!(f, "{t}"),
            Self::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Unit => f.write_str("unit"),
        }
    }
}

impl From<bool> for Attribute {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<DType> for Attribute {
    fn from(value: DType) -> Self {
        Self::Type(value)
    }
}
