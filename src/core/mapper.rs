//! Record CRUD operations
//!
//! A [`Mapper`] renders statements for one [`Dialect`] and runs them through
//! any [`Querier`]. It holds no other state; every call resolves the record's
//! schema (cached), builds its statement, and performs at most two executor
//! round trips.
//!
//! ```no_run
//! use rust_record_mapper::prelude::*;
//!
//! #[derive(Debug, Default)]
//! struct Person {
//!     id: i64,
//!     name: String,
//!     age: i32,
//! }
//!
//! record!(Person { id [pk], name, age });
//!
//! # async fn run(db: &impl Querier) -> rust_record_mapper::Result<()> {
//! let ctx = Context::background();
//! let mut alice = Person { id: 0, name: "Alice".into(), age: 30 };
//! rust_record_mapper::insert(&ctx, db, "person", &mut alice).await?;
//!
//! let mut loaded = Person::default();
//! rust_record_mapper::load(&ctx, db, "person", &mut loaded, alice.id).await?;
//! # Ok(())
//! # }
//! ```

use super::codec::{self, PrimaryKey};
use super::context::Context;
use super::dialect::Dialect;
use super::error::{MapperError, Result};
use super::querier::Querier;
use super::record::Record;
use super::scan;
use super::schema::resolve;
use super::value::DatabaseValue;
use tracing::debug;

/// Statement builder and runner for one SQL dialect
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Mapper {
    dialect: Dialect,
}

static GLOBAL: Mapper = Mapper::new(Dialect::sqlite());

impl Mapper {
    /// Create a mapper for `dialect`
    pub const fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    /// Process-wide SQLite mapper used by the crate-level functions
    pub fn global() -> &'static Mapper {
        &GLOBAL
    }

    /// The dialect statements are rendered in
    pub fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    /// Column names of `T`, leaving out the key unless `with_pk`
    pub fn columns<T: Record>(&self, with_pk: bool) -> Result<Vec<&'static str>> {
        let schema = resolve::<T>()?;
        Ok(schema.columns(with_pk).map(|field| field.column).collect())
    }

    /// Comma-joined quoted column names of `T`
    pub fn columns_quoted<T: Record>(&self, with_pk: bool) -> Result<String> {
        let schema = resolve::<T>()?;
        Ok(self.dialect.quoted_columns(&schema, with_pk))
    }

    /// One placeholder per column of `T`, numbered from 1
    pub fn placeholders<T: Record>(&self, with_pk: bool) -> Result<Vec<String>> {
        let schema = resolve::<T>()?;
        Ok((1..=schema.columns(with_pk).count())
            .map(|n| self.dialect.placeholder(n))
            .collect())
    }

    /// Comma-joined placeholders for the columns of `T`
    pub fn placeholders_string<T: Record>(&self, with_pk: bool) -> Result<String> {
        let schema = resolve::<T>()?;
        Ok(self
            .dialect
            .placeholders(schema.columns(with_pk).count(), 1))
    }

    /// Bindable values of `record`, in column order
    pub fn values<T: Record>(&self, record: &T, with_pk: bool) -> Result<Vec<DatabaseValue>> {
        let schema = resolve::<T>()?;
        codec::values(&schema, record, with_pk)
    }

    /// Primary key column and value, `None` if `T` declares no key
    pub fn primary_key<T: Record>(&self, record: &T) -> Result<Option<PrimaryKey>> {
        let schema = resolve::<T>()?;
        codec::primary_key(&schema, record)
    }

    /// Write a key value into the primary key field of `record`
    pub fn set_primary_key<T: Record>(&self, record: &mut T, key: i64) -> Result<()> {
        let schema = resolve::<T>()?;
        codec::set_primary_key(&schema, record, key)
    }

    /// Load the row whose primary key equals `pk` into `dst`
    ///
    /// # Errors
    ///
    /// [`MapperError::NoPrimaryKey`] if `T` has no key, [`MapperError::NotFound`]
    /// if no row matches, [`MapperError::Driver`] if the query fails.
    pub async fn load<Q, T>(
        &self,
        ctx: &Context,
        db: &Q,
        table: &str,
        dst: &mut T,
        pk: i64,
    ) -> Result<()>
    where
        Q: Querier + ?Sized,
        T: Record,
    {
        let schema = resolve::<T>()?;
        let key = schema
            .primary_key()
            .ok_or(MapperError::NoPrimaryKey { op: "load" })?;

        let sql = format!(
            "SELECT {} FROM {} WHERE {} = {}",
            self.dialect.quoted_columns(&schema, true),
            self.dialect.quoted_table(table),
            self.dialect.quoted(key.column),
            self.dialect.placeholder(1)
        );
        debug!(op = "load", %sql, "executing statement");

        let rows = db
            .query(ctx, &sql, &[DatabaseValue::Long(pk)])
            .await
            .map_err(|e| MapperError::driver("load", e))?;
        scan::scan_row_as("load", rows, dst)
    }

    /// Insert `src` as a new row
    ///
    /// If `T` has a primary key it must be zero; the generated key is written
    /// back into `src`, read either with `RETURNING` or from the executor's
    /// last-insert id depending on the dialect.
    pub async fn insert<Q, T>(&self, ctx: &Context, db: &Q, table: &str, src: &mut T) -> Result<()>
    where
        Q: Querier + ?Sized,
        T: Record,
    {
        let schema = resolve::<T>()?;
        let pk = codec::primary_key(&schema, src)?;
        if let Some(PrimaryKey { value, .. }) = pk {
            if value != 0 {
                return Err(MapperError::PrimaryKeyNotZero { op: "insert", value });
            }
        }

        let values = codec::values(&schema, src, false)?;
        let mut sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.dialect.quoted_table(table),
            self.dialect.quoted_columns(&schema, false),
            self.dialect.placeholders(values.len(), 1)
        );

        let Some(pk) = pk else {
            debug!(op = "insert", %sql, args = values.len(), "executing statement");
            db.exec(ctx, &sql, &values)
                .await
                .map_err(|e| MapperError::driver("insert", e))?;
            return Ok(());
        };

        let new_pk = if self.dialect.use_returning {
            sql.push_str(" RETURNING ");
            sql.push_str(&self.dialect.quoted(pk.column));
            debug!(op = "insert", %sql, args = values.len(), "executing statement");

            let row = db
                .query_row(ctx, &sql, &values)
                .await
                .into_values()
                .map_err(|e| MapperError::driver("insert", e))?
                .ok_or(MapperError::NotFound)?;
            let value = row.into_iter().next().unwrap_or(DatabaseValue::Null);
            value
                .as_i64()
                .ok_or_else(|| MapperError::type_mismatch(pk.column, "i64", value.type_name()))?
        } else {
            debug!(op = "insert", %sql, args = values.len(), "executing statement");
            let result = db
                .exec(ctx, &sql, &values)
                .await
                .map_err(|e| MapperError::driver("insert", e))?;
            result.last_insert_id.ok_or_else(|| {
                MapperError::driver("insert", "executor reported no generated key")
            })?
        };

        codec::set_primary_key(&schema, src, new_pk)
    }

    /// Update the row identified by the primary key of `src`
    ///
    /// Every non-key column is written. The key must be greater than zero,
    /// and `T` needs at least one column besides it.
    pub async fn update<Q, T>(&self, ctx: &Context, db: &Q, table: &str, src: &T) -> Result<()>
    where
        Q: Querier + ?Sized,
        T: Record,
    {
        let schema = resolve::<T>()?;
        let pk = codec::primary_key(&schema, src)?
            .ok_or(MapperError::NoPrimaryKey { op: "update" })?;
        if pk.value < 1 {
            return Err(MapperError::InvalidPrimaryKeyValue {
                op: "update",
                value: pk.value,
            });
        }
        if schema.columns(false).next().is_none() {
            return Err(MapperError::invalid_target(
                schema.type_name(),
                "no columns to update besides the primary key",
            ));
        }

        let mut values = codec::values(&schema, src, false)?;
        let sql = format!(
            "UPDATE {} SET {} WHERE {}={}",
            self.dialect.quoted_table(table),
            self.dialect.assignments(&schema),
            self.dialect.quoted(pk.column),
            self.dialect.placeholder(values.len() + 1)
        );
        values.push(DatabaseValue::Long(pk.value));
        debug!(op = "update", %sql, args = values.len(), "executing statement");

        db.exec(ctx, &sql, &values)
            .await
            .map_err(|e| MapperError::driver("update", e))?;
        Ok(())
    }

    /// Update `src` if its primary key is set, insert it otherwise
    pub async fn save<Q, T>(&self, ctx: &Context, db: &Q, table: &str, src: &mut T) -> Result<()>
    where
        Q: Querier + ?Sized,
        T: Record,
    {
        match self.primary_key(src)? {
            Some(pk) if pk.value != 0 => self.update(ctx, db, table, src).await,
            _ => self.insert(ctx, db, table, src).await,
        }
    }

    /// Run `query` and scan its first row into `dst`
    pub async fn query_row<Q, T>(
        &self,
        ctx: &Context,
        db: &Q,
        dst: &mut T,
        query: &str,
        args: &[DatabaseValue],
    ) -> Result<()>
    where
        Q: Querier + ?Sized,
        T: Record,
    {
        let rows = db
            .query(ctx, query, args)
            .await
            .map_err(|e| MapperError::driver("query_row", e))?;
        scan::scan_row_as("query_row", rows, dst)
    }

    /// Run `query` and append one record per row to `dst`
    pub async fn query_all<Q, T>(
        &self,
        ctx: &Context,
        db: &Q,
        dst: &mut Vec<T>,
        query: &str,
        args: &[DatabaseValue],
    ) -> Result<()>
    where
        Q: Querier + ?Sized,
        T: Record + Default,
    {
        let rows = db
            .query(ctx, query, args)
            .await
            .map_err(|e| MapperError::driver("query_all", e))?;
        scan::scan_all_as("query_all", rows, dst)
    }
}

/// [`Mapper::load`] with the global mapper
pub async fn load<Q, T>(ctx: &Context, db: &Q, table: &str, dst: &mut T, pk: i64) -> Result<()>
where
    Q: Querier + ?Sized,
    T: Record,
{
    Mapper::global().load(ctx, db, table, dst, pk).await
}

/// [`Mapper::insert`] with the global mapper
pub async fn insert<Q, T>(ctx: &Context, db: &Q, table: &str, src: &mut T) -> Result<()>
where
    Q: Querier + ?Sized,
    T: Record,
{
    Mapper::global().insert(ctx, db, table, src).await
}

/// [`Mapper::update`] with the global mapper
pub async fn update<Q, T>(ctx: &Context, db: &Q, table: &str, src: &T) -> Result<()>
where
    Q: Querier + ?Sized,
    T: Record,
{
    Mapper::global().update(ctx, db, table, src).await
}

/// [`Mapper::save`] with the global mapper
pub async fn save<Q, T>(ctx: &Context, db: &Q, table: &str, src: &mut T) -> Result<()>
where
    Q: Querier + ?Sized,
    T: Record,
{
    Mapper::global().save(ctx, db, table, src).await
}

/// [`Mapper::query_row`] with the global mapper
pub async fn query_row<Q, T>(
    ctx: &Context,
    db: &Q,
    dst: &mut T,
    query: &str,
    args: &[DatabaseValue],
) -> Result<()>
where
    Q: Querier + ?Sized,
    T: Record,
{
    Mapper::global().query_row(ctx, db, dst, query, args).await
}

/// [`Mapper::query_all`] with the global mapper
pub async fn query_all<Q, T>(
    ctx: &Context,
    db: &Q,
    dst: &mut Vec<T>,
    query: &str,
    args: &[DatabaseValue],
) -> Result<()>
where
    Q: Querier + ?Sized,
    T: Record + Default,
{
    Mapper::global().query_all(ctx, db, dst, query, args).await
}
