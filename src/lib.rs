//! # Rust Record Mapper
//!
//! A small record mapper for SQL databases: it maps plain structs to table
//! rows and back, and builds the SELECT, INSERT and UPDATE statements for
//! them. It is not an ORM. There are no relations, no migrations and no query
//! DSL; callers write their own SQL for anything beyond single-row CRUD and
//! hand it to [`query_row`] / [`query_all`] for scanning.
//!
//! ## Features
//!
//! - **Declared, cached schemas**: the [`record!`] macro declares a struct's
//!   fields once; the derived [`Schema`] is computed on first use and shared
//! - **Dialects**: identifier quoting and placeholder style for SQLite,
//!   PostgreSQL and MySQL, or any custom [`Dialect`] loaded from JSON
//! - **Generated keys**: read back with `RETURNING` or the executor's
//!   last-insert id
//! - **Executor agnostic**: everything runs through the async [`Querier`]
//!   trait, implemented for connections and transactions alike
//! - **Transparent errors**: executor errors stay reachable through
//!   [`MapperError::into_driver_error`]
//!
//! ## Quick Start
//!
//! Add this to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! rust_record_mapper = { version = "0.1", features = ["sqlite"] }
//! tokio = { version = "1", features = ["full"] }
//! ```
//!
//! ### Basic Usage
//!
//! ```rust,no_run
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
//! #[tokio::main]
//! async fn main() -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let ctx = Context::background();
//!     let db = SqliteQuerier::open(":memory:").await?;
//!     db.exec(&ctx, "CREATE TABLE person (id INTEGER PRIMARY KEY, name TEXT, age INTEGER)", &[])
//!         .await?;
//!
//!     let mut alice = Person { id: 0, name: "Alice".into(), age: 30 };
//!     rust_record_mapper::insert(&ctx, &db, "person", &mut alice).await?;
//!
//!     let mut people: Vec<Person> = Vec::new();
//!     rust_record_mapper::query_all(&ctx, &db, &mut people, "SELECT * FROM person", &[]).await?;
//!     for person in &people {
//!         println!("{}: {}", person.id, person.name);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ### Other Dialects
//!
//! ```rust
//! use rust_record_mapper::{Dialect, Mapper};
//!
//! let pg = Mapper::new(Dialect::postgres());
//! assert!(pg.dialect().use_returning);
//! ```
//!
//! ## Project Structure
//!
//! ```text
//! rust_record_mapper/
//! ├── src/
//! │   ├── core/              # Mapping engine
//! │   │   ├── record.rs      # Record trait and record! macro
//! │   │   ├── schema.rs      # Resolved schemas and their cache
//! │   │   ├── field.rs       # Per-field value conversion
//! │   │   ├── codec.rs       # Record <-> value lists
//! │   │   ├── dialect.rs     # Quoting and placeholders
//! │   │   ├── scan.rs        # Cursor -> record
//! │   │   ├── mapper.rs      # Load / Insert / Update / Save / queries
//! │   │   ├── querier.rs     # Executor trait and cursors
//! │   │   ├── context.rs     # Cancellation and deadlines
//! │   │   ├── error.rs       # Error types
//! │   │   └── value.rs       # Value types
//! │   ├── backends/          # Executor implementations
//! │   │   └── sqlite.rs      # SQLite implementation
//! │   └── lib.rs
//! ├── demos/                 # Example programs
//! ├── tests/                 # Integration and property tests
//! └── benches/               # Criterion benchmarks
//! ```

/// Core mapper types and traits
pub mod core;

/// Executor implementations
pub mod backends;

/// Prelude for convenient imports
///
/// ```rust
/// use rust_record_mapper::prelude::*;
///
/// let ctx = Context::background();
/// assert!(ctx.err().is_none());
/// ```
pub mod prelude {
    pub use crate::core::{
        Context, DatabaseType, DatabaseValue, Dialect, FieldDef, Json, Mapper, MapperError,
        Querier, Record, Result, SqlField,
    };
    pub use crate::record;

    #[cfg(feature = "sqlite")]
    pub use crate::backends::{SqliteQuerier, SqliteTransaction};
}

// Re-export at root level for convenience
pub use crate::core::{
    insert, load, query_all, query_row, resolve, save, update, BoxError, BufferedCursor,
    CancelHandle, Context, ContextError, Cursor, DatabaseType, DatabaseValue, Dialect,
    ExecResult, FieldDef, FieldDescriptor, Json, Mapper, MapperError, Placeholder, PrimaryKey,
    Querier, Quote, Record, Result, Row, Rows, Schema, SqlField,
};

#[cfg(feature = "sqlite")]
pub use crate::backends::{SqliteError, SqliteQuerier, SqliteTransaction};
