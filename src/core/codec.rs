//! Moving values between records and statements
//!
//! These helpers walk a resolved [`Schema`] and read or write the matching
//! fields of a record through [`Record::field`] / [`Record::field_mut`].

use super::error::{MapperError, Result};
use super::field::SqlField;
use super::record::Record;
use super::schema::{FieldDescriptor, Schema};
use super::value::DatabaseValue;

/// Primary key column and its current value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrimaryKey {
    /// Key column name
    pub column: &'static str,
    /// Current value; zero means "not assigned yet"
    pub value: i64,
}

fn missing_field(schema: &Schema, desc: &FieldDescriptor) -> MapperError {
    MapperError::invalid_target(
        schema.type_name(),
        format!("declared field {} has no accessor", desc.field),
    )
}

fn field<'r, T: Record>(
    schema: &Schema,
    record: &'r T,
    desc: &FieldDescriptor,
) -> Result<&'r dyn SqlField> {
    record
        .field(desc.field)
        .ok_or_else(|| missing_field(schema, desc))
}

fn field_mut<'r, T: Record>(
    schema: &Schema,
    record: &'r mut T,
    desc: &FieldDescriptor,
) -> Result<&'r mut dyn SqlField> {
    record
        .field_mut(desc.field)
        .ok_or_else(|| missing_field(schema, desc))
}

/// Bindable values of `record` in column order, leaving out the key unless `with_pk`
pub fn values<T: Record>(schema: &Schema, record: &T, with_pk: bool) -> Result<Vec<DatabaseValue>> {
    schema
        .columns(with_pk)
        .map(|desc| {
            let field = field(schema, record, desc)?;
            if desc.zero_is_null && field.is_zero() {
                Ok(DatabaseValue::Null)
            } else {
                field.to_value()
            }
        })
        .collect()
}

/// The record's primary key, or `None` when the type declares none
///
/// # Errors
///
/// Returns [`MapperError::UnsupportedType`] if the key field is not an integer.
pub fn primary_key<T: Record>(schema: &Schema, record: &T) -> Result<Option<PrimaryKey>> {
    let Some(desc) = schema.primary_key() else {
        return Ok(None);
    };
    let key = field(schema, record, desc)?;
    let value = key.as_key().ok_or_else(|| {
        MapperError::unsupported(format!(
            "primary key {} of {} must be an integer, found {}",
            desc.field,
            schema.type_name(),
            key.type_name()
        ))
    })?;
    Ok(Some(PrimaryKey {
        column: desc.column,
        value,
    }))
}

/// Write a generated key into the record
///
/// # Errors
///
/// Returns [`MapperError::ReadOnlyPrimaryKey`] if the type has no key or the
/// key field cannot hold `key`.
pub fn set_primary_key<T: Record>(schema: &Schema, record: &mut T, key: i64) -> Result<()> {
    let desc = schema.primary_key().ok_or_else(|| {
        MapperError::ReadOnlyPrimaryKey(format!("{} has no primary key field", schema.type_name()))
    })?;
    field_mut(schema, record, desc)?.set_key(key)
}

/// Store one column value into its field
pub fn store<T: Record>(
    schema: &Schema,
    record: &mut T,
    desc: &FieldDescriptor,
    value: DatabaseValue,
) -> Result<()> {
    let field = field_mut(schema, record, desc)?;
    if desc.zero_is_null && value.is_null() {
        field.set_zero();
        return Ok(());
    }
    field.set_value(desc.column, value)
}
