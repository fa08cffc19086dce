//! Error types for the record mapper
//!
//! Structural errors (bad record declarations, missing or misplaced primary
//! keys) are raised before any SQL is sent. Errors coming back from the
//! executor are wrapped in [`MapperError::Driver`] with the name of the
//! operation that issued them, and stay reachable through
//! [`MapperError::into_driver_error`].

/// Boxed error as produced by an executor (the "driver" error).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type alias for mapper operations
pub type Result<T> = std::result::Result<T, MapperError>;

/// Error types for mapper operations
#[derive(Debug, thiserror::Error)]
pub enum MapperError {
    /// The record type cannot be mapped (no fields, duplicate columns, several keys)
    #[error("Invalid target {type_name}: {message}")]
    InvalidTarget {
        type_name: &'static str,
        message: String,
    },

    /// The record type has no primary key but the operation needs one
    #[error("{op}: no primary key field")]
    NoPrimaryKey { op: &'static str },

    /// Insert was given a record whose primary key is already set
    #[error("{op}: primary key must be zero, got {value}")]
    PrimaryKeyNotZero { op: &'static str, value: i64 },

    /// Update was given a record whose primary key is not a positive integer
    #[error("{op}: primary key must be an integer > 0, got {value}")]
    InvalidPrimaryKeyValue { op: &'static str, value: i64 },

    /// A field value has no transportable representation
    #[error("Unsupported type: {0}")]
    UnsupportedType(String),

    /// A column value could not be stored into its field
    #[error("Type mismatch for column {column}: expected {expected}, got {actual}")]
    TypeMismatch {
        column: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// A returned column has no matching field
    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    /// Positional binding found a different number of columns than fields
    #[error("Column count mismatch: query returned {actual} columns, record has {expected} fields")]
    ColumnCountMismatch { expected: usize, actual: usize },

    /// The primary key could not be written back
    #[error("Cannot set primary key: {0}")]
    ReadOnlyPrimaryKey(String),

    /// The query returned no row
    #[error("no rows in result set")]
    NotFound,

    /// Error returned by the executor, tagged with the issuing operation
    #[error("{op}: database error: {source}")]
    Driver {
        op: &'static str,
        #[source]
        source: BoxError,
    },
}

impl MapperError {
    /// Create an invalid target error for the given record type
    pub fn invalid_target(type_name: &'static str, message: impl Into<String>) -> Self {
        MapperError::InvalidTarget {
            type_name,
            message: message.into(),
        }
    }

    /// Create an unsupported type error
    pub fn unsupported<S: Into<String>>(msg: S) -> Self {
        MapperError::UnsupportedType(msg.into())
    }

    /// Create a type mismatch error for a column
    pub fn type_mismatch(column: &str, expected: &'static str, actual: &'static str) -> Self {
        MapperError::TypeMismatch {
            column: column.to_string(),
            expected,
            actual,
        }
    }

    /// Wrap an executor error with the operation that produced it
    pub fn driver(op: &'static str, source: impl Into<BoxError>) -> Self {
        MapperError::Driver {
            op,
            source: source.into(),
        }
    }

    /// Returns `true` if the query matched no row
    pub fn is_not_found(&self) -> bool {
        matches!(self, MapperError::NotFound)
    }

    /// Unwrap to the original executor error.
    ///
    /// Returns `Err(self)` unchanged when the error did not come from the
    /// executor.
    pub fn into_driver_error(self) -> std::result::Result<BoxError, MapperError> {
        match self {
            MapperError::Driver { source, .. } => Ok(source),
            other => Err(other),
        }
    }

    /// Borrow the original executor error, if any
    pub fn as_driver_error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            MapperError::Driver { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MapperError::NoPrimaryKey { op: "load" };
        assert_eq!(err.to_string(), "load: no primary key field");

        let err = MapperError::InvalidPrimaryKeyValue {
            op: "update",
            value: 0,
        };
        assert_eq!(
            err.to_string(),
            "update: primary key must be an integer > 0, got 0"
        );

        let err = MapperError::type_mismatch("age", "i32", "string");
        assert_eq!(
            err.to_string(),
            "Type mismatch for column age: expected i32, got string"
        );
    }

    #[test]
    fn test_into_driver_error() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        let err = MapperError::driver("insert", io);
        assert!(err.as_driver_error().is_some());

        let source = err.into_driver_error().expect("driver error");
        let io = source
            .downcast_ref::<std::io::Error>()
            .expect("original io::Error");
        assert_eq!(io.to_string(), "disk on fire");
    }

    #[test]
    fn test_into_driver_error_passes_through_others() {
        let err = MapperError::NotFound;
        assert!(err.as_driver_error().is_none());

        let back = err.into_driver_error().expect_err("not a driver error");
        assert!(back.is_not_found());
    }
}
