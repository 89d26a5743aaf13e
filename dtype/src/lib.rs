//! Value types carried by graph values.
//!
//! Every value in the host graph has a [`DType`]. Type constraints used by
//! operation descriptors and rule patterns are predicates over these types.

use std::fmt;

#[cfg(any(test, feature = "proptest"))]
pub mod proptest_gen;


/// Scalar data types (base numeric types).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(strum::VariantArray, strum::AsRefStr)]
#[cfg_attr(feature = "proptest", derive(proptest_derive::Arbitrary))]
pub enum ScalarDType {
    #[strum(serialize = "i1")]
    Bool,

    #[strum(serialize = "i8")]
    Int8,
    #[strum(serialize = "i16")]
    Int16,
    #[strum(serialize = "i32")]
    Int32,
    #[strum(serialize = "i64")]
    Int64,
    #[strum(serialize = "ui8")]
    UInt8,
    #[strum(serialize = "ui16")]
    UInt16,
    #[strum(serialize = "ui32")]
    UInt32,
    #[strum(serialize = "ui64")]
    UInt64,

    #[strum(serialize = "f16")]
    Float16,
    #[strum(serialize = "bf16")]
    BFloat16,
    #[strum(serialize = "f32")]
    Float32,
    #[strum(serialize = "f64")]
    Float64,

    /// Target-width integer used for sizes and indexing.
    #[strum(serialize = "index")]
    Index,
}

/// Data type of a graph value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DType {
    /// Scalar type (single value).
    Scalar(ScalarDType),

    /// Fixed-length vector of scalars.
    Vector { scalar: ScalarDType, count: usize },
}

impl ScalarDType {
    /// Bit width of the type. `Index` is treated as 64-bit.
    pub const fn bits(&self) -> u32 {
        match self {
            Self::Bool => 1,
            Self::Int8 | Self::UInt8 => 8,
            Self::Int16 | Self::UInt16 | Self::Float16 | Self::BFloat16 => 16,
            Self::Int32 | Self::UInt32 | Self::Float32 => 32,
            Self::Int64 | Self::UInt64 | Self::Float64 | Self::Index => 64,
        }
    }

    pub const fn is_bool(&self) -> bool {
        matches!(self, Self::Bool)
    }

    pub const fn is_signed(&self) -> bool {
        matches!(self, Self::Int8 | Self::Int16 | Self::Int32 | Self::Int64)
    }

    pub const fn is_unsigned(&self) -> bool {
        matches!(self, Self::UInt8 | Self::UInt16 | Self::UInt32 | Self::UInt64)
    }

    /// Signed, unsigned and index types. `Bool` is not an integer here.
    pub const fn is_int(&self) -> bool {
        self.is_signed() || self.is_unsigned() || matches!(self, Self::Index)
    }

    pub const fn is_float(&self) -> bool {
        matches!(self, Self::Float16 | Self::BFloat16 | Self::Float32 | Self::Float64)
    }

    /// Signed integer type with the given width, if one exists.
    pub const fn signed_of_width(bits: u32) -> Option<Self> {
        match bits {
            8 => Some(Self::Int8),
            16 => Some(Self::Int16),
            32 => Some(Self::Int32),
            64 => Some(Self::Int64),
            _ => None,
        }
    }
}

impl fmt::Display for ScalarDType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<ScalarDType> for DType {
    fn from(scalar: ScalarDType) -> Self {
        Self::Scalar(scalar)
    }
}

impl DType {
    /// Create a vector type from this dtype. A count of one yields the scalar.
    pub fn vec(&self, count: usize) -> Option<Self> {
        match self {
            Self::Scalar(s) if count == 1 => Some(Self::Scalar(*s)),
            Self::Scalar(s) if count > 1 => Some(Self::Vector { scalar: *s, count }),
            _ => None,
        }
    }

    pub fn scalar(&self) -> Option<ScalarDType> {
        match self {
            Self::Scalar(s) => Some(*s),
            Self::Vector { .. } => None,
        }
    }

    /// Get the base scalar type (works for both scalars and vectors).
    pub fn base(&self) -> ScalarDType {
        match self {
            Self::Scalar(s) => *s,
            Self::Vector { scalar, .. } => *scalar,
        }
    }

    /// Get the vector count (1 for scalars).
    pub fn count(&self) -> usize {
        match self {
            Self::Vector { count, .. } => *count,
            Self::Scalar(_) => 1,
        }
    }

    pub fn is_vector(&self) -> bool {
        matches!(self, Self::Vector { .. })
    }

    pub fn bits(&self) -> u32 {
        self.base().bits() * self.count() as u32
    }

    pub fn is_bool(&self) -> bool {
        matches!(self.scalar(), Some(ScalarDType::Bool))
    }

    pub fn is_signed(&self) -> bool {
        self.scalar().is_some_and(|s| s.is_signed())
    }

    pub fn is_unsigned(&self) -> bool {
        self.scalar().is_some_and(|s| s.is_unsigned())
    }

    pub fn is_int(&self) -> bool {
        self.scalar().is_some_and(|s| s.is_int())
    }

    pub fn is_float(&self) -> bool {
        self.scalar().is_some_and(|s| s.is_float())
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(s) => write!(f, "{s}"),
            Self::Vector { scalar, count } => write!(f, "vector<{count}x{scalar}>"),
        }
    }
}

/// Shorthands for the scalar types, usable in patterns and `const` contexts.
#[allow(non_upper_case_globals)]
impl DType {
    pub const Bool: Self = Self::Scalar(ScalarDType::Bool);
    pub const Int8: Self = Self::Scalar(ScalarDType::Int8);
    pub const Int16: Self = Self::Scalar(ScalarDType::Int16);
    pub const Int32: Self = Self::Scalar(ScalarDType::Int32);
    pub const Int64: Self = Self::Scalar(ScalarDType::Int64);
    pub const UInt8: Self = Self::Scalar(ScalarDType::UInt8);
    pub const UInt16: Self = Self::Scalar(ScalarDType::UInt16);
    pub const UInt32: Self = Self::Scalar(ScalarDType::UInt32);
    pub const UInt64: Self = Self::Scalar(ScalarDType::UInt64);
    pub const Float16: Self = Self::Scalar(ScalarDType::Float16);
    pub const BFloat16: Self = Self::Scalar(ScalarDType::BFloat16);
    pub const Float32: Self = Self::Scalar(ScalarDType::Float32);
    pub const Float64: Self = Self::Scalar(ScalarDType::Float64);
    pub const Index: Self = Self::Scalar(ScalarDType::Index);
}
