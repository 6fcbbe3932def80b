use std::fmt;
use std::sync::Arc;

use crate::data_type::DataType;

/// Represents a single cell value passed into or out of the engine.
///
/// This enum wraps all supported scalar types into a single type that can be
/// moved around the engine. It includes first-class support for missing
/// values: absence is a value, not a sentinel.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Represents an empty or missing value.
    Null,
    /// An 8-bit signed integer value.
    Int8(i8),
    /// A 16-bit signed integer value.
    Int16(i16),
    /// A 32-bit signed integer value.
    Int32(i32),
    /// A 64-bit signed integer value.
    Int64(i64),
    /// An 8-bit unsigned integer value.
    UInt8(u8),
    /// A 16-bit unsigned integer value.
    UInt16(u16),
    /// A 32-bit unsigned integer value.
    UInt32(u32),
    /// A 64-bit unsigned integer value.
    UInt64(u64),
    /// A 32-bit floating-point value.
    Float32(f32),
    /// A 64-bit floating-point value.
    Float64(f64),
    /// A boolean value.
    Bool(bool),
    /// A categorical code. The owning column's dictionary resolves it to a
    /// label.
    Cat(u32),
    /// A UTF-8 string value, wrapped in an [Arc] for efficient,
    /// thread-safe sharing and cheap cloning.
    Str(Arc<str>),
    /// A user-defined fixed-size scalar, packed into 64 bits.
    Fixed(u64),
}

impl Value {
    /// Returns `true` if the value is [Value::Null].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the value widened to `i64` if it is any signed integer.
    /// Otherwise, returns `None`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int8(v) => Some(i64::from(*v)),
            Self::Int16(v) => Some(i64::from(*v)),
            Self::Int32(v) => Some(i64::from(*v)),
            Self::Int64(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value widened to `u64` if it is any unsigned integer or a
    /// categorical code. Otherwise, returns `None`.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::UInt8(v) => Some(u64::from(*v)),
            Self::UInt16(v) => Some(u64::from(*v)),
            Self::UInt32(v) => Some(u64::from(*v)),
            Self::UInt64(v) => Some(*v),
            Self::Cat(v) => Some(u64::from(*v)),
            _ => None,
        }
    }

    /// Returns the value widened to `f64` if it is a float.
    /// Otherwise, returns `None`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float32(v) => Some(f64::from(*v)),
            Self::Float64(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the inner boolean value if this is a [Value::Bool].
    /// Otherwise, returns `None`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns a reference to the inner string slice if this is a [Value::Str].
    /// Otherwise, returns `None`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the logical [DataType] corresponding to this value.
    ///
    /// Returns `None` if the value is [Value::Null], because a standalone
    /// missing value is untyped until it is placed in a column.
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Self::Null => None,
            Self::Int8(_) => Some(DataType::Int8),
            Self::Int16(_) => Some(DataType::Int16),
            Self::Int32(_) => Some(DataType::Int32),
            Self::Int64(_) => Some(DataType::Int64),
            Self::UInt8(_) => Some(DataType::UInt8),
            Self::UInt16(_) => Some(DataType::UInt16),
            Self::UInt32(_) => Some(DataType::UInt32),
            Self::UInt64(_) => Some(DataType::UInt64),
            Self::Float32(_) => Some(DataType::Float32),
            Self::Float64(_) => Some(DataType::Float64),
            Self::Bool(_) => Some(DataType::Bool),
            Self::Cat(_) => Some(DataType::Categorical),
            Self::Str(_) => Some(DataType::Str),
            Self::Fixed(_) => Some(DataType::Fixed),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, ""),
            Self::Int8(v) => write!(f, "{v}"),
            Self::Int16(v) => write!(f, "{v}"),
            Self::Int32(v) => write!(f, "{v}"),
            Self::Int64(v) => write!(f, "{v}"),
            Self::UInt8(v) => write!(f, "{v}"),
            Self::UInt16(v) => write!(f, "{v}"),
            Self::UInt32(v) => write!(f, "{v}"),
            Self::UInt64(v) => write!(f, "{v}"),
            Self::Float32(v) => write!(f, "{v}"),
            Self::Float64(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Cat(v) => write!(f, "#{v}"),
            Self::Str(v) => write!(f, "{v}"),
            Self::Fixed(v) => write!(f, "0x{v:016x}"),
        }
    }
}
