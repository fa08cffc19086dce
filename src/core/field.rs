//! Field conversions
//!
//! [`SqlField`] is the two-way conversion between a record field and a
//! [`DatabaseValue`]. It is implemented here for the scalar types a driver
//! transports directly, for `Option<T>` (mapping `None` to NULL), for
//! `chrono` timestamps, and for [`Json<T>`]. A caller's own field type
//! implements it to supply a custom conversion.

use super::error::{MapperError, Result};
use super::value::DatabaseValue;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Two-way conversion between a field and a transportable value
pub trait SqlField: Send + Sync {
    /// Name of the Rust type, for error messages
    fn type_name(&self) -> &'static str;

    /// Convert the field into a bindable value
    fn to_value(&self) -> Result<DatabaseValue>;

    /// Store a column value into the field. `column` is only used to report errors.
    fn set_value(&mut self, column: &str, value: DatabaseValue) -> Result<()>;

    /// Whether the field holds its zero value
    fn is_zero(&self) -> bool {
        false
    }

    /// Reset the field to its zero value (used for NULL in `zeroisnull` columns)
    fn set_zero(&mut self) {}

    /// Integer view of the field, when it can serve as a primary key
    fn as_key(&self) -> Option<i64> {
        None
    }

    /// Overwrite the field with a generated key
    fn set_key(&mut self, key: i64) -> Result<()> {
        Err(MapperError::ReadOnlyPrimaryKey(format!(
            "{} cannot hold integer key {}",
            self.type_name(),
            key
        )))
    }
}

fn mismatch(column: &str, expected: &'static str, value: &DatabaseValue) -> MapperError {
    MapperError::type_mismatch(column, expected, value.type_name())
}

macro_rules! impl_integer {
    ($($ty:ty),* $(,)?) => {
        $(
            impl SqlField for $ty {
                fn type_name(&self) -> &'static str {
                    stringify!($ty)
                }

                fn to_value(&self) -> Result<DatabaseValue> {
                    i64::try_from(*self).map(DatabaseValue::Long).map_err(|_| {
                        MapperError::unsupported(format!(
                            "{} value {} does not fit a 64-bit signed column",
                            stringify!($ty),
                            self
                        ))
                    })
                }

                fn set_value(&mut self, column: &str, value: DatabaseValue) -> Result<()> {
                    let wide = value
                        .as_i64()
                        .ok_or_else(|| mismatch(column, stringify!($ty), &value))?;
                    *self = <$ty>::try_from(wide)
                        .map_err(|_| mismatch(column, stringify!($ty), &value))?;
                    Ok(())
                }

                fn is_zero(&self) -> bool {
                    *self == 0
                }

                fn set_zero(&mut self) {
                    *self = 0;
                }

                fn as_key(&self) -> Option<i64> {
                    i64::try_from(*self).ok()
                }

                fn set_key(&mut self, key: i64) -> Result<()> {
                    *self = <$ty>::try_from(key).map_err(|_| {
                        MapperError::ReadOnlyPrimaryKey(format!(
                            "key {} is out of range for {}",
                            key,
                            stringify!($ty)
                        ))
                    })?;
                    Ok(())
                }
            }
        )*
    };
}

impl_integer!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl SqlField for bool {
    fn type_name(&self) -> &'static str {
        "bool"
    }

    fn to_value(&self) -> Result<DatabaseValue> {
        Ok(DatabaseValue::Bool(*self))
    }

    fn set_value(&mut self, column: &str, value: DatabaseValue) -> Result<()> {
        *self = value.as_bool().ok_or_else(|| mismatch(column, "bool", &value))?;
        Ok(())
    }

    fn is_zero(&self) -> bool {
        !*self
    }

    fn set_zero(&mut self) {
        *self = false;
    }
}

impl SqlField for f64 {
    fn type_name(&self) -> &'static str {
        "f64"
    }

    fn to_value(&self) -> Result<DatabaseValue> {
        Ok(DatabaseValue::Double(*self))
    }

    fn set_value(&mut self, column: &str, value: DatabaseValue) -> Result<()> {
        *self = value.as_f64().ok_or_else(|| mismatch(column, "f64", &value))?;
        Ok(())
    }

    fn is_zero(&self) -> bool {
        *self == 0.0
    }

    fn set_zero(&mut self) {
        *self = 0.0;
    }
}

impl SqlField for f32 {
    fn type_name(&self) -> &'static str {
        "f32"
    }

    fn to_value(&self) -> Result<DatabaseValue> {
        Ok(DatabaseValue::Float(*self))
    }

    fn set_value(&mut self, column: &str, value: DatabaseValue) -> Result<()> {
        *self = value.as_f64().ok_or_else(|| mismatch(column, "f32", &value))? as f32;
        Ok(())
    }

    fn is_zero(&self) -> bool {
        *self == 0.0
    }

    fn set_zero(&mut self) {
        *self = 0.0;
    }
}

impl SqlField for String {
    fn type_name(&self) -> &'static str {
        "String"
    }

    fn to_value(&self) -> Result<DatabaseValue> {
        Ok(DatabaseValue::String(self.clone()))
    }

    fn set_value(&mut self, column: &str, value: DatabaseValue) -> Result<()> {
        let actual = value.type_name();
        *self = value
            .into_string()
            .ok_or_else(|| MapperError::type_mismatch(column, "String", actual))?;
        Ok(())
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }

    fn set_zero(&mut self) {
        self.clear();
    }
}

impl SqlField for Vec<u8> {
    fn type_name(&self) -> &'static str {
        "Vec<u8>"
    }

    fn to_value(&self) -> Result<DatabaseValue> {
        Ok(DatabaseValue::Bytes(self.clone()))
    }

    fn set_value(&mut self, column: &str, value: DatabaseValue) -> Result<()> {
        *self = value
            .as_bytes()
            .ok_or_else(|| mismatch(column, "Vec<u8>", &value))?
            .to_vec();
        Ok(())
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }

    fn set_zero(&mut self) {
        self.clear();
    }
}

/// Timestamps travel as microseconds since the epoch. Text columns holding
/// RFC 3339 are accepted on read, since some drivers hand dates back as text.
impl SqlField for DateTime<Utc> {
    fn type_name(&self) -> &'static str {
        "DateTime<Utc>"
    }

    fn to_value(&self) -> Result<DatabaseValue> {
        Ok(DatabaseValue::Timestamp(self.timestamp_micros()))
    }

    fn set_value(&mut self, column: &str, value: DatabaseValue) -> Result<()> {
        let parsed = match &value {
            DatabaseValue::String(s) => DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|t| t.with_timezone(&Utc)),
            other => other.as_i64().and_then(DateTime::<Utc>::from_timestamp_micros),
        };
        *self = parsed.ok_or_else(|| mismatch(column, "DateTime<Utc>", &value))?;
        Ok(())
    }

    fn is_zero(&self) -> bool {
        *self == DateTime::<Utc>::UNIX_EPOCH
    }

    fn set_zero(&mut self) {
        *self = DateTime::<Utc>::UNIX_EPOCH;
    }
}

impl SqlField for NaiveDateTime {
    fn type_name(&self) -> &'static str {
        "NaiveDateTime"
    }

    fn to_value(&self) -> Result<DatabaseValue> {
        Ok(DatabaseValue::Timestamp(self.and_utc().timestamp_micros()))
    }

    fn set_value(&mut self, column: &str, value: DatabaseValue) -> Result<()> {
        let mut utc = self.and_utc();
        utc.set_value(column, value)?;
        *self = utc.naive_utc();
        Ok(())
    }

    fn is_zero(&self) -> bool {
        *self == DateTime::<Utc>::UNIX_EPOCH.naive_utc()
    }

    fn set_zero(&mut self) {
        *self = DateTime::<Utc>::UNIX_EPOCH.naive_utc();
    }
}

impl<T: SqlField + Default> SqlField for Option<T> {
    fn type_name(&self) -> &'static str {
        match self {
            Some(inner) => inner.type_name(),
            None => "Option",
        }
    }

    fn to_value(&self) -> Result<DatabaseValue> {
        match self {
            Some(inner) => inner.to_value(),
            None => Ok(DatabaseValue::Null),
        }
    }

    fn set_value(&mut self, column: &str, value: DatabaseValue) -> Result<()> {
        if value.is_null() {
            *self = None;
            return Ok(());
        }
        let mut inner = T::default();
        inner.set_value(column, value)?;
        *self = Some(inner);
        Ok(())
    }

    fn is_zero(&self) -> bool {
        self.is_none()
    }

    fn set_zero(&mut self) {
        *self = None;
    }

    fn as_key(&self) -> Option<i64> {
        match self {
            Some(inner) => inner.as_key(),
            None => Some(0),
        }
    }

    fn set_key(&mut self, key: i64) -> Result<()> {
        let mut inner = T::default();
        inner.set_key(key)?;
        *self = Some(inner);
        Ok(())
    }
}

/// Field stored as JSON text
///
/// ```
/// use rust_record_mapper::Json;
///
/// let tags = Json(vec!["a".to_string(), "b".to_string()]);
/// assert_eq!(tags.0.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Json<T>(pub T);

impl<T> SqlField for Json<T>
where
    T: Serialize + DeserializeOwned + Default + Send + Sync,
{
    fn type_name(&self) -> &'static str {
        "Json"
    }

    fn to_value(&self) -> Result<DatabaseValue> {
        serde_json::to_string(&self.0)
            .map(DatabaseValue::String)
            .map_err(|e| MapperError::unsupported(format!("JSON encoding failed: {}", e)))
    }

    fn set_value(&mut self, column: &str, value: DatabaseValue) -> Result<()> {
        let bytes = value
            .as_bytes()
            .ok_or_else(|| mismatch(column, "Json", &value))?;
        self.0 = serde_json::from_slice(bytes)
            .map_err(|_| mismatch(column, "Json", &value))?;
        Ok(())
    }
}
