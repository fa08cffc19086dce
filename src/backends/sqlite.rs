//! SQLite executor
//!
//! This module provides a [`Querier`] over a single `rusqlite` connection.
//! Statements run on the blocking thread pool and are raced against the
//! caller's [`Context`]; result sets are read fully into a
//! [`BufferedCursor`] before the connection lock is released.
//!
//! When the context ends mid-statement the statement is interrupted through
//! a progress handler and the call returns only once the connection is free
//! again, so a cancelled statement leaves nothing behind.

use crate::core::{
    context::Context,
    error::BoxError,
    querier::{BufferedCursor, ExecResult, Querier, Rows},
    value::DatabaseValue,
};
use async_trait::async_trait;
use rusqlite::types::{ToSqlOutput, Value, ValueRef};
use rusqlite::{params_from_iter, Connection, ToSql};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

type SharedConnection = Arc<Mutex<Option<Connection>>>;

/// VM instructions between cancellation checks
const PROGRESS_INTERVAL: i32 = 1000;

const PENDING: u8 = 0;
const RUNNING: u8 = 1;
const CANCELED: u8 = 2;

/// Failures raised by the executor itself rather than by SQLite
#[derive(Debug, thiserror::Error)]
pub enum SqliteError {
    /// No connection is open
    #[error("Not connected to database")]
    NotConnected,

    /// The blocking task panicked or was cancelled
    #[error("Task join error: {0}")]
    Join(String),

    /// Misuse of a transaction handle
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// The statement was stopped before it finished
    #[error("Statement interrupted")]
    Interrupted,
}

/// Bind adapter from [`DatabaseValue`] to a SQLite parameter
struct Param<'a>(&'a DatabaseValue);

impl ToSql for Param<'_> {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self.0 {
            DatabaseValue::Null => ToSqlOutput::Owned(Value::Null),
            DatabaseValue::Bool(v) => ToSqlOutput::Owned(Value::Integer(i64::from(*v))),
            DatabaseValue::Int(v) => ToSqlOutput::Owned(Value::Integer(i64::from(*v))),
            DatabaseValue::Long(v) | DatabaseValue::Timestamp(v) => {
                ToSqlOutput::Owned(Value::Integer(*v))
            }
            DatabaseValue::Float(v) => ToSqlOutput::Owned(Value::Real(f64::from(*v))),
            DatabaseValue::Double(v) => ToSqlOutput::Owned(Value::Real(*v)),
            DatabaseValue::String(v) => ToSqlOutput::Borrowed(ValueRef::Text(v.as_bytes())),
            DatabaseValue::Bytes(v) => ToSqlOutput::Borrowed(ValueRef::Blob(v)),
        })
    }
}

fn column_value(value: ValueRef<'_>) -> DatabaseValue {
    match value {
        ValueRef::Null => DatabaseValue::Null,
        ValueRef::Integer(v) => DatabaseValue::Long(v),
        ValueRef::Real(v) => DatabaseValue::Double(v),
        ValueRef::Text(v) => match String::from_utf8(v.to_vec()) {
            Ok(text) => DatabaseValue::String(text),
            Err(e) => DatabaseValue::Bytes(e.into_bytes()),
        },
        ValueRef::Blob(v) => DatabaseValue::Bytes(v.to_vec()),
    }
}

fn read_rows(
    conn: &Connection,
    sql: &str,
    args: &[DatabaseValue],
) -> Result<BufferedCursor, BoxError> {
    let mut stmt = conn.prepare(sql)?;
    let columns: Vec<String> = stmt
        .column_names()
        .into_iter()
        .map(String::from)
        .collect();

    let mut rows = stmt.query(params_from_iter(args.iter().map(Param)))?;
    let mut buffered = Vec::new();
    while let Some(row) = rows.next()? {
        let values = (0..columns.len())
            .map(|i| row.get_ref(i).map(column_value))
            .collect::<rusqlite::Result<Vec<_>>>()?;
        buffered.push(values);
    }
    Ok(BufferedCursor::new(columns, buffered))
}

fn execute(conn: &Connection, sql: &str, args: &[DatabaseValue]) -> Result<ExecResult, BoxError> {
    let affected = conn.execute(sql, params_from_iter(args.iter().map(Param)))?;
    Ok(ExecResult {
        rows_affected: affected as u64,
        last_insert_id: Some(conn.last_insert_rowid()),
    })
}

/// Run `f` against the open connection on the blocking pool, stopping it as
/// soon as `ctx` ends
///
/// A statement still waiting for the connection is skipped. One already
/// running is interrupted, and the call waits for it to unwind so the
/// connection is released before the context error is returned.
async fn run<R, F>(connection: &SharedConnection, ctx: &Context, f: F) -> Result<R, BoxError>
where
    R: Send + 'static,
    F: FnOnce(&Connection) -> Result<R, BoxError> + Send + 'static,
{
    if let Some(err) = ctx.err() {
        return Err(err.into());
    }

    let state = Arc::new(AtomicU8::new(PENDING));
    let task_state = Arc::clone(&state);
    let connection_arc = Arc::clone(connection);
    let mut task = tokio::task::spawn_blocking(move || -> Result<R, BoxError> {
        let connection = connection_arc.blocking_lock();
        let conn = connection.as_ref().ok_or(SqliteError::NotConnected)?;
        if task_state
            .compare_exchange(PENDING, RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(SqliteError::Interrupted.into());
        }

        let handler_state = Arc::clone(&task_state);
        conn.progress_handler(
            PROGRESS_INTERVAL,
            Some(move || handler_state.load(Ordering::Acquire) == CANCELED),
        );
        let result = f(conn);
        conn.progress_handler(0, None::<fn() -> bool>);
        result
    });

    tokio::select! {
        result = &mut task => {
            result.map_err(|e| SqliteError::Join(e.to_string()))?
        }
        err = ctx.done() => {
            let started = state.swap(CANCELED, Ordering::AcqRel) == RUNNING;
            if !started {
                return Err(err.into());
            }
            match task.await {
                // Finished before the interrupt landed
                Ok(Ok(value)) => Ok(value),
                Ok(Err(_)) => Err(err.into()),
                Err(e) => Err(SqliteError::Join(e.to_string()).into()),
            }
        }
    }
}

async fn query_on(
    connection: &SharedConnection,
    ctx: &Context,
    sql: &str,
    args: &[DatabaseValue],
) -> Result<Rows, BoxError> {
    let sql = sql.to_string();
    let args = args.to_vec();
    let cursor = run(connection, ctx, move |conn| read_rows(conn, &sql, &args)).await?;
    Ok(Rows::new(cursor))
}

async fn exec_on(
    connection: &SharedConnection,
    ctx: &Context,
    sql: &str,
    args: &[DatabaseValue],
) -> Result<ExecResult, BoxError> {
    let sql = sql.to_string();
    let args = args.to_vec();
    run(connection, ctx, move |conn| execute(conn, &sql, &args)).await
}

/// SQLite executor over one connection
#[derive(Clone)]
pub struct SqliteQuerier {
    connection: SharedConnection,
}

impl SqliteQuerier {
    /// Create an executor with no open connection
    pub fn new() -> Self {
        Self {
            connection: Arc::new(Mutex::new(None)),
        }
    }

    /// Create an executor and open `path` (`":memory:"` for an in-memory database)
    pub async fn open(path: &str) -> Result<Self, BoxError> {
        let db = Self::new();
        db.connect(path).await?;
        Ok(db)
    }

    /// Open `path`, replacing any existing connection
    pub async fn connect(&self, path: &str) -> Result<(), BoxError> {
        let path = path.to_string();
        let connection_arc = Arc::clone(&self.connection);

        tokio::task::spawn_blocking(move || -> Result<(), BoxError> {
            let conn = Connection::open(&path)?;
            conn.execute("PRAGMA foreign_keys = ON", [])?;

            let mut connection = connection_arc.blocking_lock();
            *connection = Some(conn);
            Ok(())
        })
        .await
        .map_err(|e| SqliteError::Join(e.to_string()))?
    }

    /// Whether a connection is open. `false` while the connection is busy.
    pub fn is_connected(&self) -> bool {
        self.connection
            .try_lock()
            .map(|conn| conn.is_some())
            .unwrap_or(false)
    }

    /// Close the connection
    pub async fn disconnect(&self) {
        let mut connection = self.connection.lock().await;
        *connection = None;
    }

    /// Start a transaction on this connection
    ///
    /// Statements issued through the returned handle (or through this
    /// executor) run inside it until it is committed, rolled back, or
    /// dropped. Dropping an unfinished handle rolls it back.
    pub async fn begin(&self, ctx: &Context) -> Result<SqliteTransaction, BoxError> {
        run(&self.connection, ctx, |conn| {
            conn.execute_batch("BEGIN")?;
            Ok(())
        })
        .await?;

        Ok(SqliteTransaction {
            connection: Arc::clone(&self.connection),
            finished: AtomicBool::new(false),
        })
    }
}

impl Default for SqliteQuerier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Querier for SqliteQuerier {
    async fn query(
        &self,
        ctx: &Context,
        sql: &str,
        args: &[DatabaseValue],
    ) -> Result<Rows, BoxError> {
        query_on(&self.connection, ctx, sql, args).await
    }

    async fn exec(
        &self,
        ctx: &Context,
        sql: &str,
        args: &[DatabaseValue],
    ) -> Result<ExecResult, BoxError> {
        exec_on(&self.connection, ctx, sql, args).await
    }
}

/// Open transaction on a [`SqliteQuerier`] connection
pub struct SqliteTransaction {
    connection: SharedConnection,
    finished: AtomicBool,
}

impl SqliteTransaction {
    fn ensure_open(&self) -> Result<(), BoxError> {
        if self.finished.load(Ordering::Acquire) {
            return Err(SqliteError::Transaction("transaction already finished".into()).into());
        }
        Ok(())
    }

    async fn finish(&self, ctx: &Context, sql: &'static str) -> Result<(), BoxError> {
        self.ensure_open()?;
        run(&self.connection, ctx, move |conn| {
            conn.execute_batch(sql)?;
            Ok(())
        })
        .await?;
        self.finished.store(true, Ordering::Release);
        Ok(())
    }

    /// Commit the transaction
    pub async fn commit(self, ctx: &Context) -> Result<(), BoxError> {
        self.finish(ctx, "COMMIT").await
    }

    /// Roll the transaction back
    pub async fn rollback(self, ctx: &Context) -> Result<(), BoxError> {
        self.finish(ctx, "ROLLBACK").await
    }
}

#[async_trait]
impl Querier for SqliteTransaction {
    async fn query(
        &self,
        ctx: &Context,
        sql: &str,
        args: &[DatabaseValue],
    ) -> Result<Rows, BoxError> {
        self.ensure_open()?;
        query_on(&self.connection, ctx, sql, args).await
    }

    async fn exec(
        &self,
        ctx: &Context,
        sql: &str,
        args: &[DatabaseValue],
    ) -> Result<ExecResult, BoxError> {
        self.ensure_open()?;
        exec_on(&self.connection, ctx, sql, args).await
    }
}

impl Drop for SqliteTransaction {
    fn drop(&mut self) {
        if self.finished.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Ok(connection) = self.connection.try_lock() {
            rollback_open(connection.as_ref());
            return;
        }

        // Connection busy: queue the rollback behind the current holder
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let connection_arc = Arc::clone(&self.connection);
                runtime.spawn_blocking(move || {
                    rollback_open(connection_arc.blocking_lock().as_ref());
                });
            }
            Err(_) => tracing::warn!("connection busy, transaction left open on drop"),
        }
    }
}

fn rollback_open(conn: Option<&Connection>) {
    if let Some(conn) = conn {
        if let Err(e) = conn.execute_batch("ROLLBACK") {
            tracing::warn!(error = %e, "automatic rollback failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::ContextError;

    async fn memory() -> SqliteQuerier {
        let db = SqliteQuerier::open(":memory:").await.unwrap();
        db.exec(
            &Context::background(),
            "CREATE TABLE test (id INTEGER PRIMARY KEY, name TEXT, score REAL, data BLOB)",
            &[],
        )
        .await
        .unwrap();
        db
    }

    fn count(rows: &mut Rows) -> usize {
        let mut n = 0;
        while let Some(row) = rows.next_row() {
            row.unwrap();
            n += 1;
        }
        n
    }

    #[tokio::test]
    async fn test_sqlite_connect() {
        let db = SqliteQuerier::new();
        assert!(!db.is_connected());
        db.connect(":memory:").await.unwrap();
        assert!(db.is_connected());
        db.disconnect().await;
        assert!(!db.is_connected());

        let err = db
            .exec(&Context::background(), "SELECT 1", &[])
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SqliteError>(),
            Some(SqliteError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_sqlite_exec_and_query() {
        let db = memory().await;
        let ctx = Context::background();

        let result = db
            .exec(
                &ctx,
                "INSERT INTO test (name, score, data) VALUES (?, ?, ?)",
                &[
                    DatabaseValue::from("Alice"),
                    DatabaseValue::Double(1.5),
                    DatabaseValue::Bytes(vec![1, 2]),
                ],
            )
            .await
            .unwrap();
        assert_eq!(result.rows_affected, 1);
        assert_eq!(result.last_insert_id, Some(1));

        let mut rows = db
            .query(&ctx, "SELECT id, name, score, data FROM test WHERE id = ?", &[DatabaseValue::Long(1)])
            .await
            .unwrap();
        assert_eq!(rows.columns(), ["id", "name", "score", "data"]);
        let values = rows.next_row().unwrap().unwrap();
        assert_eq!(
            values,
            vec![
                DatabaseValue::Long(1),
                DatabaseValue::String("Alice".into()),
                DatabaseValue::Double(1.5),
                DatabaseValue::Bytes(vec![1, 2]),
            ]
        );
        assert!(rows.next_row().is_none());
    }

    #[tokio::test]
    async fn test_sqlite_canceled_context() {
        let db = memory().await;
        let (ctx, handle) = Context::background().with_cancel();
        handle.cancel();

        let err = db.query(&ctx, "SELECT * FROM test", &[]).await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<ContextError>(),
            Some(&ContextError::Canceled)
        );
    }

    #[tokio::test]
    async fn test_sqlite_invalid_utf8_text_reads_as_bytes() {
        let db = memory().await;
        let mut rows = db
            .query(&Context::background(), "SELECT CAST(X'FF' AS TEXT), 'ok'", &[])
            .await
            .unwrap();
        assert_eq!(
            rows.next_row().unwrap().unwrap(),
            vec![DatabaseValue::Bytes(vec![0xff]), DatabaseValue::from("ok")]
        );
    }

    #[tokio::test]
    async fn test_sqlite_deadline_interrupts_running_statement() {
        let db = memory().await;
        let ctx = Context::background();
        db.exec(&ctx, "CREATE TABLE numbers (x INTEGER)", &[])
            .await
            .unwrap();

        let short = ctx.with_timeout(std::time::Duration::from_millis(20));
        let err = db
            .exec(
                &short,
                "INSERT INTO numbers WITH RECURSIVE c(x) AS \
                 (SELECT 1 UNION ALL SELECT x + 1 FROM c LIMIT 3000000) SELECT x FROM c",
                &[],
            )
            .await
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<ContextError>(),
            Some(&ContextError::DeadlineExceeded)
        );

        // Nothing committed, and the connection is free right away
        let started = std::time::Instant::now();
        let mut rows = db
            .query(&ctx, "SELECT COUNT(*) FROM numbers", &[])
            .await
            .unwrap();
        assert!(started.elapsed() < std::time::Duration::from_millis(250));
        assert_eq!(rows.next_row().unwrap().unwrap(), vec![DatabaseValue::Long(0)]);
    }

    #[tokio::test]
    async fn test_sqlite_transaction() {
        let db = memory().await;
        let ctx = Context::background();

        // Commit
        let tx = db.begin(&ctx).await.unwrap();
        tx.exec(&ctx, "INSERT INTO test (name) VALUES ('Alice')", &[])
            .await
            .unwrap();
        tx.commit(&ctx).await.unwrap();

        // Rollback
        let tx = db.begin(&ctx).await.unwrap();
        tx.exec(&ctx, "INSERT INTO test (name) VALUES ('Bob')", &[])
            .await
            .unwrap();
        tx.rollback(&ctx).await.unwrap();

        // Dropped without finishing
        {
            let tx = db.begin(&ctx).await.unwrap();
            tx.exec(&ctx, "INSERT INTO test (name) VALUES ('Carol')", &[])
                .await
                .unwrap();
        }

        let mut rows = db.query(&ctx, "SELECT * FROM test", &[]).await.unwrap();
        assert_eq!(count(&mut rows), 1); // Still only Alice
    }
}
