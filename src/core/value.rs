//! Transportable values
//!
//! [`DatabaseValue`] is what the mapper hands to an executor as a bound
//! parameter and what a cursor hands back for every column. The accessors
//! here are lossless: a value that does not fit the requested type yields
//! `None` instead of being truncated.

use serde::{Deserialize, Serialize};

/// Largest integer magnitude an `f64` holds exactly
const MAX_EXACT_F64_INT: u64 = 1 << 53;

/// Database value that can hold different types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DatabaseValue {
    /// SQL NULL
    Null,
    /// Boolean value
    Bool(bool),
    /// 32-bit integer
    Int(i32),
    /// 64-bit integer
    Long(i64),
    /// 32-bit floating point
    Float(f32),
    /// 64-bit floating point
    Double(f64),
    /// Text
    String(String),
    /// Binary data
    Bytes(Vec<u8>),
    /// Timestamp (microseconds since the Unix epoch, UTC)
    Timestamp(i64),
}

impl DatabaseValue {
    /// Boolean view; integers are `true` when non-zero
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            DatabaseValue::Bool(v) => Some(*v),
            DatabaseValue::Int(v) => Some(*v != 0),
            DatabaseValue::Long(v) => Some(*v != 0),
            _ => None,
        }
    }

    /// Integer view, widening `Int` and accepting booleans as 0/1
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            DatabaseValue::Long(v) => Some(*v),
            DatabaseValue::Int(v) => Some(i64::from(*v)),
            DatabaseValue::Bool(v) => Some(i64::from(*v)),
            DatabaseValue::Timestamp(v) => Some(*v),
            _ => None,
        }
    }

    /// Floating point view; integers convert while exactly representable
    /// (magnitude at most 2^53), text does not
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            DatabaseValue::Double(v) => Some(*v),
            DatabaseValue::Float(v) => Some(f64::from(*v)),
            DatabaseValue::Int(v) => Some(f64::from(*v)),
            DatabaseValue::Long(v) if v.unsigned_abs() <= MAX_EXACT_F64_INT => Some(*v as f64),
            _ => None,
        }
    }

    /// Borrow text without copying
    pub fn as_str(&self) -> Option<&str> {
        match self {
            DatabaseValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Borrow raw bytes; text is returned as its UTF-8 encoding
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            DatabaseValue::Bytes(b) => Some(b),
            DatabaseValue::String(s) => Some(s.as_bytes()),
            _ => None,
        }
    }

    /// Take ownership of the text, decoding byte columns as UTF-8
    pub fn into_string(self) -> Option<String> {
        match self {
            DatabaseValue::String(s) => Some(s),
            DatabaseValue::Bytes(b) => String::from_utf8(b).ok(),
            _ => None,
        }
    }

    /// Check if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, DatabaseValue::Null)
    }

    /// Get the type name of this value
    pub fn type_name(&self) -> &'static str {
        match self {
            DatabaseValue::Null => "null",
            DatabaseValue::Bool(_) => "bool",
            DatabaseValue::Int(_) => "int",
            DatabaseValue::Long(_) => "long",
            DatabaseValue::Float(_) => "float",
            DatabaseValue::Double(_) => "double",
            DatabaseValue::String(_) => "string",
            DatabaseValue::Bytes(_) => "bytes",
            DatabaseValue::Timestamp(_) => "timestamp",
        }
    }
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for DatabaseValue {
                fn from(v: $ty) -> Self {
                    DatabaseValue::$variant(v.into())
                }
            }
        )*
    };
}

impl_from! {
    bool => Bool,
    i32 => Int,
    i64 => Long,
    f32 => Float,
    f64 => Double,
    String => String,
    &str => String,
    Vec<u8> => Bytes,
}

impl<T: Into<DatabaseValue>> From<Option<T>> for DatabaseValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(DatabaseValue::Null, Into::into)
    }
}
