//! SQLite executor.
//!
//! Runs the statements built by querycache-core on a tokio-rusqlite
//! connection, which executes them on a background thread.

mod value;

use std::path::Path;

use async_trait::async_trait;
use querycache_core::config::ActorColumns;
use querycache_core::executor::strip_actor_columns;
use querycache_core::query::{Quoting, StatementKind};
use querycache_core::{Error, Execution, Executor, Row, Statement};
use tokio_rusqlite::Connection;

use crate::SqliteError;

const PRAGMAS: &str = "PRAGMA journal_mode=WAL;
                       PRAGMA synchronous=NORMAL;
                       PRAGMA temp_store=MEMORY;
                       PRAGMA foreign_keys=ON;";

/// [`Executor`] over a single SQLite connection.
#[derive(Clone, Debug)]
pub struct SqliteExecutor {
    conn: Connection,
    actor_columns: ActorColumns,
}

impl SqliteExecutor {
    /// Open a database at the specified path, creating it if needed.
    pub async fn open(path: impl AsRef<Path>, actor_columns: ActorColumns) -> Result<Self, SqliteError> {
        let conn = Connection::open(path).await.map_err(|e| SqliteError::Database(e.into()))?;
        Self::configure(conn, actor_columns).await
    }

    /// Open an in-memory database with the same pragmas.
    pub async fn open_in_memory(actor_columns: ActorColumns) -> Result<Self, SqliteError> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| SqliteError::Database(e.into()))?;
        Self::configure(conn, actor_columns).await
    }

    async fn configure(conn: Connection, actor_columns: ActorColumns) -> Result<Self, SqliteError> {
        conn.call(|conn| {
            conn.execute_batch(PRAGMAS)?;
            Ok(())
        })
        .await
        .map_err(SqliteError::Database)?;

        Ok(Self { conn, actor_columns })
    }

    /// Run a raw script, typically schema setup.
    pub async fn execute_batch(&self, sql: impl Into<String>) -> Result<(), SqliteError> {
        let sql = sql.into();
        self.conn
            .call(move |conn| {
                conn.execute_batch(&sql)?;
                Ok(())
            })
            .await
            .map_err(SqliteError::Database)
    }
}

#[async_trait]
impl Executor for SqliteExecutor {
    async fn query(&self, statement: &Statement) -> Result<Vec<Row>, Error> {
        tracing::debug!(sql = %statement, "sqlite query");
        let sql = statement.sql().to_string();

        let mut rows = self
            .conn
            .call(move |conn| -> Result<Vec<Row>, SqliteError> {
                let mut stmt = conn.prepare(&sql)?;
                let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
                let mut cursor = stmt.query([])?;

                let mut rows = Vec::new();
                while let Some(raw) = cursor.next()? {
                    let mut row = Row::new();
                    for (idx, name) in names.iter().enumerate() {
                        row.insert(name.clone(), value::to_json(raw.get_ref(idx)?));
                    }
                    rows.push(row);
                }
                Ok(rows)
            })
            .await
            .map_err(SqliteError::from)?;

        for row in &mut rows {
            strip_actor_columns(row, &self.actor_columns);
        }
        Ok(rows)
    }

    async fn execute(&self, statement: &Statement) -> Result<Execution, Error> {
        tracing::debug!(sql = %statement, "sqlite execute");
        let sql = statement.sql().to_string();
        let is_insert = statement.kind == StatementKind::Insert;

        let execution = self
            .conn
            .call(move |conn| -> Result<Execution, SqliteError> {
                let affected = conn.execute(&sql, [])?;
                let last_insert_id = is_insert.then(|| conn.last_insert_rowid().to_string());
                Ok(Execution { rows_affected: affected as u64, last_insert_id })
            })
            .await
            .map_err(SqliteError::from)?;

        Ok(execution)
    }

    /// SQLite reads double-quoted text as an identifier when it names a column.
    fn quoting(&self) -> Quoting {
        Quoting::Standard
    }
}
