//! Disposable SQLite staging store for one open workbook.
//!
//! Every query runs through a [`Lease`]: a compiled statement checked out of
//! the connection's statement cache. A statement can be checked out in one
//! place at a time, and asking for it again before the lease is dropped
//! fails with [`Error::StatementInUse`]. Long-running scans keep their lease
//! for as long as they live.
//!
//! The store lives in a fresh temporary directory (or in memory) and is
//! removed when it is closed or dropped.

mod cells;
mod schema;
mod strings;
mod styles;
mod worksheets;

pub use cells::CellCursor;
pub use schema::BUILTIN_FORMATS;

use crate::error::{Error, Result};
use crate::options::{OpenOptions, StagingMode};
use rusqlite::types::{ToSql, ToSqlOutput, ValueRef};
use rusqlite::{CachedStatement, Connection, OptionalExtension, Row};
use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const BEGIN: &str = "BEGIN";
const COMMIT: &str = "COMMIT";
const ROLLBACK: &str = "ROLLBACK";

/// The staging store.
pub struct Store {
    // Declared before `dir` so the database is closed before its directory
    // is removed.
    conn: Connection,
    in_use: RefCell<HashSet<&'static str>>,
    in_transaction: Cell<bool>,
    batch_size: usize,
    dir: Option<TempDir>,
}

impl Store {
    /// Create an empty store with the schema in place.
    pub fn open(options: &OpenOptions) -> Result<Self> {
        let (conn, dir) = match options.staging_mode {
            StagingMode::InMemory => (Connection::open_in_memory()?, None),
            StagingMode::TempFile => {
                let mut builder = tempfile::Builder::new();
                builder.prefix("xlstage-");
                let dir = match &options.staging_dir {
                    Some(parent) => builder.tempdir_in(parent)?,
                    None => builder.tempdir()?,
                };
                let conn = Connection::open(dir.path().join("staging.db"))?;
                (conn, Some(dir))
            }
        };

        conn.set_prepared_statement_cache_capacity(options.statement_cache_capacity);
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "synchronous", "OFF")?;

        let store = Self {
            conn,
            in_use: RefCell::new(HashSet::new()),
            in_transaction: Cell::new(false),
            batch_size: options.batch_size.max(1),
            dir,
        };
        schema::create(&store)?;

        log::debug!("staging store ready at {:?}", store.path());
        Ok(store)
    }

    /// Directory holding the database file, if the store is file-backed.
    pub fn path(&self) -> Option<&Path> {
        self.dir.as_ref().map(|dir| dir.path())
    }

    /// Database file, if the store is file-backed.
    pub fn database_file(&self) -> Option<PathBuf> {
        self.path().map(|dir| dir.join("staging.db"))
    }

    /// Rows fetched per refill by cursors.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Close the database and remove the staging directory.
    pub fn close(self) -> Result<()> {
        let Store { conn, dir, .. } = self;
        conn.close().map_err(|(_, source)| Error::Store(source))?;
        if let Some(dir) = dir {
            dir.close()?;
        }
        Ok(())
    }

    /// Check out the compiled statement for `sql`.
    pub fn acquire(&self, sql: &'static str) -> Result<Lease<'_>> {
        if !self.in_use.borrow_mut().insert(sql) {
            return Err(Error::StatementInUse(sql.to_string()));
        }

        match self.conn.prepare_cached(sql) {
            Ok(statement) => {
                log::trace!("checked out statement: {}", sql);
                Ok(Lease {
                    store: self,
                    sql,
                    statement,
                })
            }
            Err(source) => {
                self.in_use.borrow_mut().remove(sql);
                Err(Error::Prepare {
                    sql: sql.to_string(),
                    source,
                })
            }
        }
    }

    /// Whether the statement for `sql` is currently checked out.
    pub fn is_checked_out(&self, sql: &str) -> bool {
        self.in_use.borrow().contains(sql)
    }

    /// Run schema-changing SQL. Compiled statements are discarded afterwards
    /// so nothing prepared against the old schema is reused.
    pub fn execute_schema(&self, sql: &str) -> Result<()> {
        self.conn
            .execute_batch(sql)
            .map_err(|source| Error::Schema {
                sql: sql.to_string(),
                source,
            })?;
        self.conn.flush_prepared_statement_cache();
        log::trace!("schema changed, statement cache flushed");
        Ok(())
    }

    /// Run `work` in a transaction.
    ///
    /// Commits when `work` succeeds. When it fails, the transaction is rolled
    /// back and the failure returned unchanged; if the rollback fails too,
    /// [`Error::RollbackTransaction`] carries both.
    pub fn transactional<T, F>(&self, work: F) -> Result<T>
    where
        F: FnOnce(&Store) -> Result<T>,
    {
        if self.in_transaction.get() {
            return Err(Error::NestedTransaction);
        }

        self.control(BEGIN).map_err(Error::BeginTransaction)?;
        self.in_transaction.set(true);
        let outcome = work(self);

        let result = match outcome {
            Ok(value) => match self.control(COMMIT) {
                Ok(()) => Ok(value),
                Err(source) => {
                    if let Err(e) = self.control(ROLLBACK) {
                        log::warn!("rollback after failed commit also failed: {}", e);
                    }
                    Err(Error::CommitTransaction(source))
                }
            },
            Err(cause) => match self.control(ROLLBACK) {
                Ok(()) => Err(cause),
                Err(source) => Err(Error::RollbackTransaction {
                    cause: Box::new(cause),
                    source,
                }),
            },
        };

        self.in_transaction.set(false);
        result
    }

    /// Whether a transaction is open.
    pub fn in_transaction(&self) -> bool {
        self.in_transaction.get()
    }

    fn control(&self, sql: &'static str) -> rusqlite::Result<()> {
        let mut statement = self.conn.prepare_cached(sql)?;
        statement.execute([])?;
        Ok(())
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("path", &self.path())
            .field("checked_out", &self.in_use.borrow().len())
            .field("in_transaction", &self.in_transaction.get())
            .finish()
    }
}

/// A checked-out statement. Dropping it (or calling [`Lease::release`])
/// makes the statement available again.
pub struct Lease<'s> {
    store: &'s Store,
    sql: &'static str,
    statement: CachedStatement<'s>,
}

impl<'s> Lease<'s> {
    /// The SQL text of the statement.
    pub fn sql(&self) -> &'static str {
        self.sql
    }

    /// Return the statement to the store.
    pub fn release(self) {}

    /// Execute with `params`, returning the number of changed rows.
    pub fn execute(&mut self, params: &[&dyn ToSql]) -> Result<usize> {
        let sql = self.sql;
        self.statement
            .execute(params)
            .map_err(|source| execute_error(sql, params, source))
    }

    /// Fetch the single row a query always produces.
    pub fn query_one<T, F>(&mut self, params: &[&dyn ToSql], f: F) -> Result<T>
    where
        F: FnOnce(&Row<'_>) -> rusqlite::Result<T>,
    {
        let sql = self.sql;
        self.statement
            .query_row(params, f)
            .map_err(|source| execute_error(sql, params, source))
    }

    /// Fetch the first row, if any.
    pub fn query_optional<T, F>(&mut self, params: &[&dyn ToSql], f: F) -> Result<Option<T>>
    where
        F: FnOnce(&Row<'_>) -> rusqlite::Result<T>,
    {
        let sql = self.sql;
        self.statement
            .query_row(params, f)
            .optional()
            .map_err(|source| execute_error(sql, params, source))
    }

    /// Fetch every row.
    pub fn query_all<T, F>(&mut self, params: &[&dyn ToSql], f: F) -> Result<Vec<T>>
    where
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        let sql = self.sql;
        let rows = self
            .statement
            .query_map(params, f)
            .map_err(|source| execute_error(sql, params, source))?;
        rows.collect::<rusqlite::Result<Vec<T>>>()
            .map_err(|source| execute_error(sql, params, source))
    }
}

impl<'s> Deref for Lease<'s> {
    type Target = rusqlite::Statement<'s>;

    fn deref(&self) -> &Self::Target {
        &self.statement
    }
}

impl DerefMut for Lease<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.statement
    }
}

impl Drop for Lease<'_> {
    fn drop(&mut self) {
        self.store.in_use.borrow_mut().remove(self.sql);
        log::trace!("released statement: {}", self.sql);
    }
}

fn execute_error(sql: &str, params: &[&dyn ToSql], source: rusqlite::Error) -> Error {
    let rendered = serde_json::Value::Array(params.iter().map(|p| render_param(*p)).collect());
    Error::Execute {
        sql: sql.to_string(),
        params: rendered.to_string(),
        source,
    }
}

fn render_param(param: &dyn ToSql) -> serde_json::Value {
    match param.to_sql() {
        Ok(ToSqlOutput::Borrowed(value)) => render_value(value),
        Ok(ToSqlOutput::Owned(value)) => render_value(ValueRef::from(&value)),
        Ok(_) => serde_json::Value::String("<unrenderable>".to_string()),
        Err(_) => serde_json::Value::String("<unconvertible>".to_string()),
    }
}

fn render_value(value: ValueRef<'_>) -> serde_json::Value {
    match value {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Integer(i) => serde_json::Value::from(i),
        ValueRef::Real(f) => serde_json::Value::from(f),
        ValueRef::Text(text) => serde_json::Value::from(String::from_utf8_lossy(text).into_owned()),
        ValueRef::Blob(blob) => serde_json::Value::from(format!("<{} bytes>", blob.len())),
    }
}
