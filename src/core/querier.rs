//! Executor capability
//!
//! The mapper never talks to a driver directly. It issues statements through a
//! [`Querier`], which any connection, pool handle or transaction can
//! implement, and reads results through a [`Rows`] cursor.

use super::context::Context;
use super::error::BoxError;
use super::value::DatabaseValue;
use async_trait::async_trait;
use std::collections::VecDeque;

/// Outcome of a statement that returns no rows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecResult {
    /// Number of rows changed
    pub rows_affected: u64,
    /// Identity generated by the last insert, if the engine reports one
    pub last_insert_id: Option<i64>,
}

/// Forward-only result cursor
pub trait Cursor: Send {
    /// Column names, in result order. Empty strings mark anonymous columns.
    fn columns(&self) -> &[String];

    /// Next row's values, in column order
    fn next_row(&mut self) -> Option<Result<Vec<DatabaseValue>, BoxError>>;

    /// Release the underlying resource
    fn close(&mut self) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Cursor over rows already fetched into memory
#[derive(Debug, Clone, Default)]
pub struct BufferedCursor {
    columns: Vec<String>,
    rows: VecDeque<Vec<DatabaseValue>>,
}

impl BufferedCursor {
    /// Create a cursor over `rows`
    pub fn new(columns: Vec<String>, rows: Vec<Vec<DatabaseValue>>) -> Self {
        Self {
            columns,
            rows: rows.into(),
        }
    }
}

impl Cursor for BufferedCursor {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn next_row(&mut self) -> Option<Result<Vec<DatabaseValue>, BoxError>> {
        self.rows.pop_front().map(Ok)
    }

    fn close(&mut self) -> Result<(), BoxError> {
        self.rows.clear();
        Ok(())
    }
}

/// Open result set. Closed explicitly by the scanner and again on drop.
pub struct Rows {
    cursor: Box<dyn Cursor>,
    closed: bool,
}

impl std::fmt::Debug for Rows {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rows")
            .field("columns", &self.cursor.columns())
            .field("closed", &self.closed)
            .finish()
    }
}

impl Rows {
    /// Wrap a cursor
    pub fn new(cursor: impl Cursor + 'static) -> Self {
        Self {
            cursor: Box::new(cursor),
            closed: false,
        }
    }

    /// Column names, in result order
    pub fn columns(&self) -> &[String] {
        self.cursor.columns()
    }

    /// Next row; `None` once exhausted or closed
    pub fn next_row(&mut self) -> Option<Result<Vec<DatabaseValue>, BoxError>> {
        if self.closed {
            return None;
        }
        self.cursor.next_row()
    }

    /// Release the cursor. Later calls are no-ops.
    pub fn close(&mut self) -> Result<(), BoxError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.cursor.close()
    }

    /// Whether [`Rows::close`] has run
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Drop for Rows {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

/// Single-row result handle
///
/// The query error, if any, is held until [`Row::into_values`] is called.
#[derive(Debug)]
pub struct Row {
    rows: Result<Rows, BoxError>,
}

impl Row {
    /// Wrap the outcome of a query
    pub fn new(rows: Result<Rows, BoxError>) -> Self {
        Self { rows }
    }

    /// Values of the first row, or `None` if the query returned nothing.
    /// The cursor is closed before returning.
    pub fn into_values(self) -> Result<Option<Vec<DatabaseValue>>, BoxError> {
        let mut rows = self.rows?;
        let first = rows.next_row().transpose();
        let closed = rows.close();
        let first = first?;
        closed?;
        Ok(first)
    }
}

/// Query capability consumed by the mapper
///
/// Errors are the executor's own, boxed; the mapper wraps them with the
/// operation name and keeps them reachable.
#[async_trait]
pub trait Querier: Send + Sync {
    /// Run a statement that returns rows
    async fn query(
        &self,
        ctx: &Context,
        sql: &str,
        args: &[DatabaseValue],
    ) -> Result<Rows, BoxError>;

    /// Run a statement expected to return at most one row
    async fn query_row(&self, ctx: &Context, sql: &str, args: &[DatabaseValue]) -> Row {
        Row::new(self.query(ctx, sql, args).await)
    }

    /// Run a statement that returns no rows
    async fn exec(
        &self,
        ctx: &Context,
        sql: &str,
        args: &[DatabaseValue],
    ) -> Result<ExecResult, BoxError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    struct Tracked {
        inner: BufferedCursor,
        closed: Arc<AtomicBool>,
    }

    impl Cursor for Tracked {
        fn columns(&self) -> &[String] {
            self.inner.columns()
        }

        fn next_row(&mut self) -> Option<Result<Vec<DatabaseValue>, BoxError>> {
            self.inner.next_row()
        }

        fn close(&mut self) -> Result<(), BoxError> {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_row_reads_first_and_closes() {
        let closed = Arc::new(AtomicBool::new(false));
        let cursor = Tracked {
            inner: BufferedCursor::new(
                vec!["id".into()],
                vec![vec![DatabaseValue::Long(1)], vec![DatabaseValue::Long(2)]],
            ),
            closed: Arc::clone(&closed),
        };

        let values = Row::new(Ok(Rows::new(cursor))).into_values().unwrap();
        assert_eq!(values, Some(vec![DatabaseValue::Long(1)]));
        assert!(closed.load(Ordering::SeqCst));
    }

    #[test]
    fn test_row_without_rows() {
        let rows = Rows::new(BufferedCursor::new(vec!["id".into()], vec![]));
        assert_eq!(Row::new(Ok(rows)).into_values().unwrap(), None);
    }

    #[test]
    fn test_closed_rows_yield_nothing() {
        let mut rows = Rows::new(BufferedCursor::new(
            vec!["id".into()],
            vec![vec![DatabaseValue::Long(1)]],
        ));
        rows.close().unwrap();
        assert!(rows.is_closed());
        assert!(rows.next_row().is_none());
    }
}
