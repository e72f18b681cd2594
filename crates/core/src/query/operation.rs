//! Cacheable operations and their builder.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use super::Mapping;

/// Row cap applied when the caller does not configure pagination.
pub const DEFAULT_PAGE_SIZE: i64 = 15;

/// The kind of work an [`Operation`] performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    /// Insert one row.
    Add,
    /// Update the rows matched by the filter.
    Alter,
    /// Soft-delete the rows matched by the filter.
    Disable,
    /// Read rows.
    Get,
    /// Read rows reduced to a first-column to last-column mapping.
    List,
    /// Count rows.
    Count,
    /// Read from cache only, seeding it from a caller-supplied payload.
    Mock,
}

impl OperationKind {
    pub const ALL: [OperationKind; 7] = [
        OperationKind::Add,
        OperationKind::Alter,
        OperationKind::Disable,
        OperationKind::Get,
        OperationKind::List,
        OperationKind::Count,
        OperationKind::Mock,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OperationKind::Add => "add",
            OperationKind::Alter => "alter",
            OperationKind::Disable => "disable",
            OperationKind::Get => "get",
            OperationKind::List => "list",
            OperationKind::Count => "count",
            OperationKind::Mock => "mock",
        }
    }

    /// Whether the operation writes to the data source.
    pub fn is_mutating(self) -> bool {
        matches!(self, OperationKind::Add | OperationKind::Alter | OperationKind::Disable)
    }

    /// Parse a lowercase kind name.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Row window of a read.
///
/// `limit: None` means no row cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub start: i64,
    pub limit: Option<i64>,
}

impl Pagination {
    /// Build a window from raw bounds, honoring the `-1` sentinels.
    ///
    /// `limit == -1` drops the row cap; `start == -1` drops pagination
    /// entirely and yields `None`.
    pub fn from_bounds(start: i64, limit: i64) -> Option<Self> {
        if start == -1 {
            return None;
        }
        let limit = if limit == -1 { None } else { Some(limit) };
        Some(Self { start, limit })
    }

    /// The single-row window used to re-read a written row.
    pub fn single() -> Self {
        Self { start: 0, limit: Some(1) }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self { start: 0, limit: Some(DEFAULT_PAGE_SIZE) }
    }
}

/// A fully configured cacheable operation.
///
/// Built once through [`OperationBuilder`] and handed to the orchestrator by
/// reference; nothing mutates it afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub kind: OperationKind,
    pub table: String,
    pub columns: String,
    pub filter: Mapping,
    pub pagination: Option<Pagination>,
    pub joins: Vec<String>,
    pub order: Vec<String>,
    pub group: Vec<String>,
    pub values: Mapping,
    /// Entry lifetime override; the orchestrator default applies when unset.
    pub ttl_minutes: Option<i64>,
    /// Payload a `mock` operation seeds the cache with on a miss.
    pub fallback: Option<Value>,
}

impl Operation {
    pub fn builder(kind: OperationKind, table: impl Into<String>) -> OperationBuilder {
        OperationBuilder::new(kind, table)
    }

    pub fn add(table: impl Into<String>) -> OperationBuilder {
        Self::builder(OperationKind::Add, table)
    }

    pub fn alter(table: impl Into<String>) -> OperationBuilder {
        Self::builder(OperationKind::Alter, table)
    }

    pub fn disable(table: impl Into<String>) -> OperationBuilder {
        Self::builder(OperationKind::Disable, table)
    }

    pub fn get(table: impl Into<String>) -> OperationBuilder {
        Self::builder(OperationKind::Get, table)
    }

    pub fn list(table: impl Into<String>) -> OperationBuilder {
        Self::builder(OperationKind::List, table)
    }

    pub fn count(table: impl Into<String>) -> OperationBuilder {
        Self::builder(OperationKind::Count, table)
    }

    pub fn mock(table: impl Into<String>) -> OperationBuilder {
        Self::builder(OperationKind::Mock, table)
    }

    /// The point read that returns the row with the given id.
    ///
    /// Keeps this operation's table, columns and pagination and drops
    /// everything else.
    pub fn point_read(&self, id: &Value) -> Operation {
        let mut filter = Mapping::new();
        filter.insert("a.id".to_string(), id.clone());
        Operation {
            kind: OperationKind::Get,
            table: self.table.clone(),
            columns: self.columns.clone(),
            filter,
            pagination: self.pagination,
            joins: Vec::new(),
            order: Vec::new(),
            group: Vec::new(),
            values: Mapping::new(),
            ttl_minutes: self.ttl_minutes,
            fallback: None,
        }
    }
}

/// Builder for [`Operation`].
#[derive(Debug, Clone)]
pub struct OperationBuilder {
    op: Operation,
}

impl OperationBuilder {
    pub fn new(kind: OperationKind, table: impl Into<String>) -> Self {
        Self {
            op: Operation {
                kind,
                table: table.into(),
                columns: "a.*".to_string(),
                filter: Mapping::new(),
                pagination: Some(Pagination::default()),
                joins: Vec::new(),
                order: Vec::new(),
                group: Vec::new(),
                values: Mapping::new(),
                ttl_minutes: None,
                fallback: None,
            },
        }
    }

    /// Use several tables, joined with commas.
    pub fn tables<S: AsRef<str>>(mut self, tables: &[S]) -> Self {
        self.op.table = tables.iter().map(AsRef::as_ref).collect::<Vec<_>>().join(",");
        self
    }

    pub fn columns(mut self, columns: impl Into<String>) -> Self {
        self.op.columns = columns.into();
        self
    }

    /// Replace the whole filter.
    pub fn filter(mut self, filter: Mapping) -> Self {
        self.op.filter = filter;
        self
    }

    /// Append one filter entry; `key` may carry an operator prefix.
    pub fn filter_by(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.op.filter.insert(key.into(), value.into());
        self
    }

    /// Replace the whole write payload.
    pub fn values(mut self, values: Mapping) -> Self {
        self.op.values = values;
        self
    }

    pub fn value(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.op.values.insert(key.into(), value.into());
        self
    }

    /// Append a join clause, used verbatim.
    pub fn join(mut self, join: impl Into<String>) -> Self {
        self.op.joins.push(join.into());
        self
    }

    /// Append an order-by term, used verbatim.
    pub fn order(mut self, order: impl Into<String>) -> Self {
        self.op.order.push(order.into());
        self
    }

    /// Append a grouping fragment, used verbatim.
    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.op.group.push(group.into());
        self
    }

    /// Set pagination from raw bounds; see [`Pagination::from_bounds`].
    pub fn limit(mut self, start: i64, limit: i64) -> Self {
        self.op.pagination = Pagination::from_bounds(start, limit);
        self
    }

    pub fn no_pagination(mut self) -> Self {
        self.op.pagination = None;
        self
    }

    pub fn ttl_minutes(mut self, minutes: i64) -> Self {
        self.op.ttl_minutes = Some(minutes);
        self
    }

    pub fn fallback(mut self, payload: Value) -> Self {
        self.op.fallback = Some(payload);
        self
    }

    pub fn build(self) -> Operation {
        let mut op = self.op;
        if op.kind == OperationKind::Mock {
            op.pagination = None;
        }
        op
    }
}
