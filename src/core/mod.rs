//! Core mapper types and traits
//!
//! This module provides the building blocks of the mapper: record
//! declarations and their cached schemas, value conversion, SQL fragment
//! rendering, row scanning, and the CRUD operations that tie them together
//! through the [`Querier`] capability.

pub mod codec;
pub mod context;
pub mod database_types;
pub mod dialect;
pub mod error;
pub mod field;
pub mod mapper;
pub mod querier;
pub mod record;
pub mod scan;
pub mod schema;
pub mod value;

// Re-export commonly used types
pub use codec::PrimaryKey;
pub use context::{CancelHandle, Context, ContextError};
pub use database_types::DatabaseType;
pub use dialect::{Dialect, Placeholder, Quote};
pub use error::{BoxError, MapperError, Result};
pub use field::{Json, SqlField};
pub use mapper::{insert, load, query_all, query_row, save, update, Mapper};
pub use querier::{BufferedCursor, Cursor, ExecResult, Querier, Row, Rows};
pub use record::{FieldDef, Record};
pub use scan::{scan_all, scan_row};
pub use schema::{resolve, FieldDescriptor, Schema};
pub use value::DatabaseValue;
