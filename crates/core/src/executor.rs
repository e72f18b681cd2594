//! The data source seam.
//!
//! The cache never talks to a database directly: it hands [`Statement`]s to an
//! [`Executor`] and caches whatever rows come back.

use async_trait::async_trait;
use serde_json::Value;

use crate::Error;
use crate::config::ActorColumns;
use crate::query::{Mapping, Quoting, Statement, scalar_text};

/// One result row, columns in select order.
pub type Row = Mapping;

/// Outcome of a write statement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Execution {
    pub rows_affected: u64,
    /// Identifier assigned by an insert.
    pub last_insert_id: Option<String>,
}

/// Runs statements against a relational store.
///
/// Implementations must strip actor columns (see [`ActorColumns`]) from the
/// rows they return.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Run a select and return its rows.
    async fn query(&self, statement: &Statement) -> Result<Vec<Row>, Error>;

    /// Run an insert or update.
    async fn execute(&self, statement: &Statement) -> Result<Execution, Error>;

    /// Literal style this store needs in insert and update statements.
    fn quoting(&self) -> Quoting {
        Quoting::Json
    }

    /// Run a count select and read its `count` column.
    async fn count(&self, statement: &Statement) -> Result<i64, Error> {
        let rows = self.query(statement).await?;
        let count = rows.first().and_then(|row| row.get("count")).map(as_count).unwrap_or(0);
        Ok(count)
    }
}

fn as_count(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n.as_i64().unwrap_or_else(|| n.as_f64().map_or(0, |f| f as i64)),
        other => scalar_text(other).trim().parse().unwrap_or(0),
    }
}

/// Who is performing a write, when a session is available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorContext {
    pub remote_addr: String,
    pub account_id: String,
    pub user_id: String,
}

impl ActorContext {
    pub fn new(remote_addr: impl Into<String>, account_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self { remote_addr: remote_addr.into(), account_id: account_id.into(), user_id: user_id.into() }
    }

    /// Add the actor columns to a write payload, overriding caller values.
    pub fn inject(&self, values: &mut Mapping, columns: &ActorColumns) {
        values.insert(columns.ip.clone(), Value::String(self.remote_addr.clone()));
        values.insert(columns.account_id.clone(), Value::String(self.account_id.clone()));
        values.insert(columns.user_id.clone(), Value::String(self.user_id.clone()));
    }
}

/// Remove actor columns from a row.
pub fn strip_actor_columns(row: &mut Row, columns: &ActorColumns) {
    for name in columns.names() {
        row.shift_remove(name);
    }
}
