//! Field descriptor resolution
//!
//! [`resolve`] turns a record type's [`FieldDef`] declarations into a
//! [`Schema`] once per type and caches it for the life of the process.

use super::error::{MapperError, Result};
use super::record::{FieldDef, Record};
use parking_lot::RwLock;
use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use tracing::trace;

/// One mapped field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Name passed to [`Record::field`]
    pub field: &'static str,
    /// Column name
    pub column: &'static str,
    /// Primary key flag
    pub primary_key: bool,
    /// Zero value stored as NULL
    pub zero_is_null: bool,
}

/// Resolved column layout of a record type
#[derive(Debug, PartialEq, Eq)]
pub struct Schema {
    type_name: &'static str,
    fields: Vec<FieldDescriptor>,
    primary_key: Option<usize>,
    by_column: HashMap<&'static str, usize>,
}

impl Schema {
    /// Build a schema from declarations, validating them
    ///
    /// # Errors
    ///
    /// Returns [`MapperError::InvalidTarget`] if no field is mapped, a name is
    /// empty, a column is declared twice, or more than one field is a key.
    pub fn from_defs(type_name: &'static str, defs: Vec<FieldDef>) -> Result<Self> {
        let mut fields = Vec::with_capacity(defs.len());
        let mut by_column = HashMap::with_capacity(defs.len());
        let mut primary_key = None;

        for def in defs.into_iter().filter(|def| !def.skip) {
            let column = def.column.unwrap_or(def.name);
            if def.name.is_empty() || column.is_empty() {
                return Err(MapperError::invalid_target(
                    type_name,
                    "field and column names must not be empty",
                ));
            }
            if by_column.insert(column, fields.len()).is_some() {
                return Err(MapperError::invalid_target(
                    type_name,
                    format!("column {} is declared more than once", column),
                ));
            }
            if def.primary_key {
                if primary_key.is_some() {
                    return Err(MapperError::invalid_target(
                        type_name,
                        "more than one primary key field",
                    ));
                }
                primary_key = Some(fields.len());
            }
            fields.push(FieldDescriptor {
                field: def.name,
                column,
                primary_key: def.primary_key,
                zero_is_null: def.zero_is_null,
            });
        }

        if fields.is_empty() {
            return Err(MapperError::invalid_target(type_name, "no mapped fields"));
        }

        Ok(Self {
            type_name,
            fields,
            primary_key,
            by_column,
        })
    }

    /// Rust name of the record type
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// All mapped fields in declaration order
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Number of mapped fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Always false: a schema has at least one field
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The primary key field, if declared
    pub fn primary_key(&self) -> Option<&FieldDescriptor> {
        self.primary_key.map(|idx| &self.fields[idx])
    }

    /// Fields in order, leaving out the primary key unless `with_pk`
    pub fn columns(&self, with_pk: bool) -> impl Iterator<Item = &FieldDescriptor> + '_ {
        self.fields
            .iter()
            .filter(move |field| with_pk || !field.primary_key)
    }

    /// Position of the field mapped to `column`
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.by_column.get(column).copied()
    }
}

type SchemaCache = RwLock<HashMap<TypeId, Arc<Schema>>>;

static SCHEMAS: OnceLock<SchemaCache> = OnceLock::new();

/// Resolve the schema of `T`, computing it on first use
///
/// Concurrent first calls may each build the schema, but only the first one
/// stored is kept and every caller gets that same `Arc`.
pub fn resolve<T: Record>() -> Result<Arc<Schema>> {
    let cache = SCHEMAS.get_or_init(Default::default);
    let key = TypeId::of::<T>();

    if let Some(schema) = cache.read().get(&key) {
        return Ok(Arc::clone(schema));
    }

    let schema = Arc::new(Schema::from_defs(type_name::<T>(), T::fields())?);
    let mut schemas = cache.write();
    let cached = schemas.entry(key).or_insert_with(|| {
        trace!(
            record = schema.type_name(),
            columns = schema.len(),
            "cached record schema"
        );
        schema
    });
    Ok(Arc::clone(cached))
}
