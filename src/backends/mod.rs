//! Executor implementations
//!
//! This module contains concrete implementations of the Querier trait.

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteError, SqliteQuerier, SqliteTransaction};
