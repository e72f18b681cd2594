//! Cache orchestration.
//!
//! [`QueryCache`] resolves one [`Operation`] per call:
//!
//! 1. Fingerprint the operation.
//! 2. Reads (`get`, `list`, `count`) return a fresh cache entry when one exists,
//!    otherwise run against the [`Executor`] and write the result through.
//! 3. Writes (`add`, `alter`, `disable`) always run, seed the point read of the
//!    written row and invalidate every other entry of the table.
//! 4. `mock` only ever touches the cache.
//!
//! Adapter failures never surface as `Err`: they come back as a [`Resolved`]
//! with a `Null` payload and the error in `failure`.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Value, json};

use crate::Error;
use crate::cache::{CacheStore, FileStore, operation_fingerprint};
use crate::config::{ActorColumns, AppConfig, SoftDelete};
use crate::executor::{ActorContext, Executor, Row};
use crate::query::statement::{self, SelectParts};
use crate::query::{Mapping, Operation, OperationKind, Pagination, Predicate, Statement, scalar_text};

/// How a payload was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStatus {
    /// Served from a fresh cache entry.
    Hit,
    /// No entry existed; the executor was consulted.
    Miss,
    /// An expired entry existed; the executor was consulted.
    Stale,
    /// A write, which never reads from the cache.
    Bypass,
    /// A `mock` miss answered from the caller's fallback payload.
    Fallback,
}

impl fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CacheStatus::Hit => "hit",
            CacheStatus::Miss => "miss",
            CacheStatus::Stale => "stale",
            CacheStatus::Bypass => "bypass",
            CacheStatus::Fallback => "fallback",
        };
        f.write_str(name)
    }
}

/// Result of [`QueryCache::run`].
#[derive(Debug)]
pub struct Resolved {
    pub payload: Value,
    pub status: CacheStatus,
    pub fingerprint: String,
    /// Set when the executor failed; `payload` is `Null` in that case.
    pub failure: Option<Error>,
}

impl Resolved {
    fn ok(payload: Value, status: CacheStatus, fingerprint: String) -> Self {
        Self { payload, status, fingerprint, failure: None }
    }

    fn failed(err: Error, status: CacheStatus, fingerprint: String) -> Self {
        Self { payload: Value::Null, status, fingerprint, failure: Some(err) }
    }

    pub fn is_failure(&self) -> bool {
        self.failure.is_some()
    }
}

/// The statements an operation would run, without running them.
#[derive(Debug, Clone, Serialize)]
pub struct Explain {
    pub kind: OperationKind,
    pub table: String,
    pub fingerprint: String,
    pub statements: Vec<Statement>,
}

/// Orchestrator behavior taken from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct CacheSettings {
    /// Entry lifetime for operations without their own.
    pub ttl_minutes: i64,
    pub strict_filters: bool,
    pub actor_columns: ActorColumns,
    pub soft_delete: SoftDelete,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for CacheSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            ttl_minutes: config.ttl_minutes,
            strict_filters: config.strict_filters,
            actor_columns: config.actor_columns.clone(),
            soft_delete: config.soft_delete.clone(),
        }
    }
}

enum Lookup {
    Fresh(Value),
    Absent(CacheStatus),
}

/// Read-through/write-through cache in front of an [`Executor`].
#[derive(Clone)]
pub struct QueryCache {
    executor: Arc<dyn Executor>,
    store: Arc<dyn CacheStore>,
    settings: CacheSettings,
}

impl QueryCache {
    pub fn new(executor: Arc<dyn Executor>, store: Arc<dyn CacheStore>, settings: CacheSettings) -> Self {
        Self { executor, store, settings }
    }

    /// Wire an executor to a [`FileStore`] rooted at `config.cache_dir`.
    pub fn from_config(executor: Arc<dyn Executor>, config: &AppConfig) -> Self {
        let store = Arc::new(FileStore::new(config.cache_dir.clone()));
        Self::new(executor, store, CacheSettings::from(config))
    }

    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    pub fn fingerprint(&self, op: &Operation) -> String {
        operation_fingerprint(op)
    }

    /// Drop every cached entry of `table`.
    pub async fn wipe(&self, table: &str) -> Result<u64, Error> {
        let removed = self.store.wipe(table).await?;
        tracing::debug!(table, removed, "table cache wiped");
        Ok(removed)
    }

    /// Render the statements `op` would run, without touching the executor or
    /// the cache.
    ///
    /// The re-read after an `add` depends on the inserted id and is left out.
    ///
    /// # Errors
    ///
    /// Returns `Error::MalformedFilterKey` under strict filters and
    /// `Error::InvalidInput` for updates with nothing to assign.
    pub fn explain(&self, op: &Operation) -> Result<Explain, Error> {
        let predicate = self.compile(&op.filter)?;
        let quoting = self.executor.quoting();
        let statements = match op.kind {
            OperationKind::Get | OperationKind::List => vec![select_statement(op, &predicate)],
            OperationKind::Count => vec![statement::count(&op.table, &op.joins, &predicate)],
            OperationKind::Add => vec![statement::insert(&op.table, &op.values, quoting)],
            OperationKind::Alter => vec![
                statement::update(&op.table, &op.values, &predicate, quoting)?,
                reread_statement(op, &predicate),
            ],
            OperationKind::Disable => vec![
                statement::update(&op.table, &self.soft_delete_values(), &predicate, quoting)?,
                reread_statement(op, &predicate),
            ],
            OperationKind::Mock => Vec::new(),
        };
        Ok(Explain { kind: op.kind, table: op.table.clone(), fingerprint: self.fingerprint(op), statements })
    }

    /// Resolve `op`. `actor` is injected into the values of `add` and `alter`.
    pub async fn run(&self, op: &Operation, actor: Option<&ActorContext>) -> Resolved {
        let fingerprint = self.fingerprint(op);
        tracing::debug!(kind = %op.kind, table = %op.table, fingerprint = %fingerprint, "fingerprint computed");

        match op.kind {
            OperationKind::Get | OperationKind::List | OperationKind::Count => self.read_through(op, fingerprint).await,
            OperationKind::Add | OperationKind::Alter | OperationKind::Disable => {
                self.write_through(op, actor, fingerprint).await
            }
            OperationKind::Mock => self.mock(op, fingerprint).await,
        }
    }

    async fn read_through(&self, op: &Operation, fingerprint: String) -> Resolved {
        let status = match self.lookup(&op.table, &fingerprint).await {
            Lookup::Fresh(payload) => {
                tracing::debug!(table = %op.table, fingerprint = %fingerprint, "cache hit");
                return Resolved::ok(payload, CacheStatus::Hit, fingerprint);
            }
            Lookup::Absent(status) => status,
        };
        tracing::debug!(table = %op.table, fingerprint = %fingerprint, %status, "cache miss; querying executor");

        match self.read(op).await {
            Ok(payload) => {
                let payload = self.store.put(&op.table, &fingerprint, payload, self.ttl(op)).await;
                Resolved::ok(payload, status, fingerprint)
            }
            Err(err) => {
                tracing::warn!(kind = %op.kind, table = %op.table, error = %err, "executor failed; returning empty payload");
                Resolved::failed(err, status, fingerprint)
            }
        }
    }

    async fn write_through(&self, op: &Operation, actor: Option<&ActorContext>, fingerprint: String) -> Resolved {
        let written = match self.write(op, actor).await {
            Ok(written) => written,
            Err(err) => {
                tracing::warn!(kind = %op.kind, table = %op.table, error = %err, "write failed; cache left untouched");
                return Resolved::failed(err, CacheStatus::Bypass, fingerprint);
            }
        };

        // The data source changed from here on: every path below invalidates.
        let payload = match written {
            Some(predicate) => match self.reread(op, &predicate).await {
                Ok(payload) => payload,
                Err(err) => {
                    tracing::warn!(kind = %op.kind, table = %op.table, error = %err, "re-read after write failed");
                    self.invalidate(&op.table, None).await;
                    return Resolved::failed(err, CacheStatus::Bypass, fingerprint);
                }
            },
            None => Value::Array(Vec::new()),
        };

        let seeded = match (op.kind, written_row_id(&payload)) {
            (OperationKind::Add | OperationKind::Alter, Some(id)) => {
                let seed = operation_fingerprint(&op.point_read(id));
                self.store.put(&op.table, &seed, payload.clone(), self.ttl(op)).await;
                tracing::debug!(table = %op.table, seed = %seed, "point read seeded");
                Some(seed)
            }
            _ => None,
        };

        self.invalidate(&op.table, seeded.as_deref()).await;
        Resolved::ok(payload, CacheStatus::Bypass, fingerprint)
    }

    async fn invalidate(&self, table: &str, keep: Option<&str>) {
        match self.store.wipe_except(table, keep).await {
            Ok(removed) => tracing::debug!(table, removed, "table cache invalidated"),
            Err(err) => tracing::warn!(table, error = %err, "cache invalidation failed"),
        }
    }

    async fn mock(&self, op: &Operation, fingerprint: String) -> Resolved {
        if let Lookup::Fresh(payload) = self.lookup(&op.table, &fingerprint).await
            && !is_blank(&payload)
        {
            return Resolved::ok(payload, CacheStatus::Hit, fingerprint);
        }

        let payload = match &op.fallback {
            Some(fallback) if !is_blank(fallback) => {
                self.store.put(&op.table, &fingerprint, fallback.clone(), self.ttl(op)).await
            }
            _ => json!({}),
        };
        tracing::debug!(table = %op.table, fingerprint = %fingerprint, "mock answered from fallback");
        Resolved::ok(payload, CacheStatus::Fallback, fingerprint)
    }

    async fn lookup(&self, table: &str, fingerprint: &str) -> Lookup {
        match self.store.get(table, fingerprint).await {
            Ok(Some(entry)) if entry.is_fresh() => Lookup::Fresh(entry.payload),
            Ok(Some(_)) => Lookup::Absent(CacheStatus::Stale),
            Ok(None) => Lookup::Absent(CacheStatus::Miss),
            Err(err) => {
                tracing::warn!(table, fingerprint, error = %err, "cache read failed; treating as miss");
                Lookup::Absent(CacheStatus::Miss)
            }
        }
    }

    /// Run a read against the executor and shape the payload.
    async fn read(&self, op: &Operation) -> Result<Value, Error> {
        let predicate = self.compile(&op.filter)?;

        match op.kind {
            OperationKind::Get => {
                let rows = self.executor.query(&select_statement(op, &predicate)).await?;
                Ok(rows_payload(rows))
            }
            OperationKind::List => {
                let rows = self.executor.query(&select_statement(op, &predicate)).await?;
                Ok(list_payload(rows))
            }
            OperationKind::Count => {
                let count = self.executor.count(&statement::count(&op.table, &op.joins, &predicate)).await?;
                Ok(Value::from(count))
            }
            kind => Err(Error::InvalidInput(format!("{kind} is not a read"))),
        }
    }

    /// Run a write against the executor.
    ///
    /// Returns the predicate selecting the written rows, or `None` when an
    /// insert reported no id.
    async fn write(&self, op: &Operation, actor: Option<&ActorContext>) -> Result<Option<Predicate>, Error> {
        let predicate = self.compile(&op.filter)?;
        let quoting = self.executor.quoting();

        match op.kind {
            OperationKind::Add => {
                let values = self.write_values(op, actor);
                let execution = self.executor.execute(&statement::insert(&op.table, &values, quoting)).await?;
                Ok(execution.last_insert_id.map(|id| {
                    let mut filter = Mapping::new();
                    filter.insert("a.id".to_string(), Value::String(id));
                    Predicate::compile(&filter)
                }))
            }
            OperationKind::Alter => {
                let values = self.write_values(op, actor);
                self.executor.execute(&statement::update(&op.table, &values, &predicate, quoting)?).await?;
                Ok(Some(predicate))
            }
            OperationKind::Disable => {
                let values = self.soft_delete_values();
                self.executor.execute(&statement::update(&op.table, &values, &predicate, quoting)?).await?;
                Ok(Some(predicate))
            }
            kind => Err(Error::InvalidInput(format!("{kind} is not a write"))),
        }
    }

    async fn reread(&self, op: &Operation, predicate: &Predicate) -> Result<Value, Error> {
        let rows = self.executor.query(&reread_statement(op, predicate)).await?;
        Ok(rows_payload(rows))
    }

    fn compile(&self, filter: &Mapping) -> Result<Predicate, Error> {
        if self.settings.strict_filters { Predicate::compile_strict(filter) } else { Ok(Predicate::compile(filter)) }
    }

    fn write_values(&self, op: &Operation, actor: Option<&ActorContext>) -> Mapping {
        let mut values = op.values.clone();
        if let Some(actor) = actor {
            actor.inject(&mut values, &self.settings.actor_columns);
        }
        values
    }

    fn soft_delete_values(&self) -> Mapping {
        let SoftDelete { column, value } = &self.settings.soft_delete;
        let mut values = Mapping::new();
        values.insert(column.clone(), Value::String(value.clone()));
        values
    }

    fn ttl(&self, op: &Operation) -> i64 {
        op.ttl_minutes.unwrap_or(self.settings.ttl_minutes)
    }
}

fn select_statement(op: &Operation, predicate: &Predicate) -> Statement {
    let parts = SelectParts {
        table: &op.table,
        columns: &op.columns,
        joins: &op.joins,
        group: &op.group,
        order: &op.order,
        pagination: op.pagination,
    };
    statement::select(&parts, predicate)
}

/// Single-row select of the row a write just touched.
fn reread_statement(op: &Operation, predicate: &Predicate) -> Statement {
    let parts = SelectParts { pagination: Some(Pagination::single()), ..SelectParts::new(&op.table, &op.columns) };
    statement::select(&parts, predicate)
}

fn rows_payload(rows: Vec<Row>) -> Value {
    Value::Array(rows.into_iter().map(Value::Object).collect())
}

/// First column of each row becomes the key, last column the value.
fn list_payload(rows: Vec<Row>) -> Value {
    let mut list = Mapping::new();
    for row in rows {
        let (Some(first), Some(last)) = (row.values().next(), row.values().next_back()) else {
            continue;
        };
        list.insert(scalar_text(first), last.clone());
    }
    Value::Object(list)
}

fn written_row_id(payload: &Value) -> Option<&Value> {
    let id = payload.as_array()?.first()?.get("id")?;
    (!is_blank(id)).then_some(id)
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty() || s == "0",
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheEntry, MemoryStore};
    use crate::executor::Execution;
    use crate::query::Quoting;
    use async_trait::async_trait;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct RecordingExecutor {
        statements: Mutex<Vec<Statement>>,
        rows: Vec<Row>,
        insert_id: Option<String>,
        fail: bool,
        fail_reads: bool,
        quoting: Quoting,
    }

    impl RecordingExecutor {
        fn with_rows(rows: Value) -> Self {
            let rows = match rows {
                Value::Array(items) => items
                    .into_iter()
                    .filter_map(|item| match item {
                        Value::Object(row) => Some(row),
                        _ => None,
                    })
                    .collect(),
                _ => Vec::new(),
            };
            Self { rows, ..Self::default() }
        }

        fn failing() -> Self {
            Self { fail: true, ..Self::default() }
        }

        async fn sql(&self) -> Vec<String> {
            self.statements.lock().await.iter().map(|s| s.sql.clone()).collect()
        }

        async fn calls(&self) -> usize {
            self.statements.lock().await.len()
        }

        async fn record(&self, statement: &Statement) -> Result<(), Error> {
            self.statements.lock().await.push(statement.clone());
            if self.fail { Err(Error::AdapterFailure("connection refused".into())) } else { Ok(()) }
        }
    }

    #[async_trait]
    impl Executor for RecordingExecutor {
        async fn query(&self, statement: &Statement) -> Result<Vec<Row>, Error> {
            self.record(statement).await?;
            if self.fail_reads {
                return Err(Error::AdapterFailure("read timed out".into()));
            }
            Ok(self.rows.clone())
        }

        async fn execute(&self, statement: &Statement) -> Result<Execution, Error> {
            self.record(statement).await?;
            Ok(Execution { rows_affected: 1, last_insert_id: self.insert_id.clone() })
        }

        fn quoting(&self) -> Quoting {
            self.quoting
        }
    }

    fn setup(executor: RecordingExecutor) -> (QueryCache, Arc<RecordingExecutor>, Arc<MemoryStore>) {
        let executor = Arc::new(executor);
        let store = Arc::new(MemoryStore::new());
        let cache = QueryCache::new(executor.clone(), store.clone(), CacheSettings::default());
        (cache, executor, store)
    }

    #[tokio::test]
    async fn test_get_miss_then_hit() {
        let (cache, executor, _store) = setup(RecordingExecutor::with_rows(json!([{"id": 1, "name": "ann"}])));
        let op = Operation::get("users").filter_by("like name", "ann").build();

        let first = cache.run(&op, None).await;
        assert_eq!(first.status, CacheStatus::Miss);
        assert_eq!(first.payload, json!([{"id": 1, "name": "ann"}]));
        assert!(!first.is_failure());

        let second = cache.run(&op, None).await;
        assert_eq!(second.status, CacheStatus::Hit);
        assert_eq!(second.payload, first.payload);
        assert_eq!(second.fingerprint, first.fingerprint);
        assert_eq!(executor.calls().await, 1);

        let sql = executor.sql().await;
        assert_eq!(
            sql[0],
            "select a.* from users as a where a.id >= 1 AND name like '%ann%' order by a.id desc limit 0, 15"
        );
    }

    #[tokio::test]
    async fn test_stale_entry_refetches() {
        let (cache, executor, store) = setup(RecordingExecutor::with_rows(json!([{"id": 2}])));
        let op = Operation::get("users").build();
        let fingerprint = cache.fingerprint(&op);
        store
            .write("users", &fingerprint, &CacheEntry { payload: json!(["old"]), expires_at: 1 })
            .await
            .unwrap();

        let resolved = cache.run(&op, None).await;
        assert_eq!(resolved.status, CacheStatus::Stale);
        assert_eq!(resolved.payload, json!([{"id": 2}]));
        assert_eq!(executor.calls().await, 1);
        assert!(store.get("users", &fingerprint).await.unwrap().unwrap().is_fresh());
    }

    #[tokio::test]
    async fn test_zero_ttl_never_caches() {
        let (cache, executor, store) = setup(RecordingExecutor::with_rows(json!([{"id": 1}])));
        let op = Operation::get("users").ttl_minutes(0).build();

        assert_eq!(cache.run(&op, None).await.status, CacheStatus::Miss);
        assert_eq!(cache.run(&op, None).await.status, CacheStatus::Miss);
        assert_eq!(executor.calls().await, 2);
        assert_eq!(store.len("users").await, 0);
    }

    #[tokio::test]
    async fn test_adapter_failure_is_empty_with_diagnostic() {
        let (cache, _executor, store) = setup(RecordingExecutor::failing());
        let resolved = cache.run(&Operation::get("users").build(), None).await;

        assert_eq!(resolved.payload, Value::Null);
        assert_eq!(resolved.status, CacheStatus::Miss);
        assert!(matches!(resolved.failure, Some(Error::AdapterFailure(_))));
        assert_eq!(store.len("users").await, 0);
    }

    #[tokio::test]
    async fn test_strict_filters_reject_malformed_key() {
        let executor = Arc::new(RecordingExecutor::default());
        let settings = CacheSettings { strict_filters: true, ..CacheSettings::default() };
        let cache = QueryCache::new(executor.clone(), Arc::new(MemoryStore::new()), settings);
        let op = Operation::get("users").filter_by("unknown name", "ann").build();

        let resolved = cache.run(&op, None).await;
        assert!(matches!(resolved.failure, Some(Error::MalformedFilterKey(_))));
        assert_eq!(executor.calls().await, 0);
        assert!(cache.explain(&op).is_err());
    }

    #[tokio::test]
    async fn test_list_reduces_rows() {
        let rows = json!([
            {"id": 1, "name": "ann", "email": "ann@example.com"},
            {"id": 2, "name": "bob", "email": "bob@example.com"}
        ]);
        let (cache, _executor, _store) = setup(RecordingExecutor::with_rows(rows));
        let resolved = cache.run(&Operation::list("users").build(), None).await;

        assert_eq!(resolved.payload, json!({"1": "ann@example.com", "2": "bob@example.com"}));
    }

    #[tokio::test]
    async fn test_count() {
        let (cache, executor, _store) = setup(RecordingExecutor::with_rows(json!([{"count": 3}])));
        let op = Operation::count("users").filter_by("status", "active").build();
        let resolved = cache.run(&op, None).await;

        assert_eq!(resolved.payload, json!(3));
        assert!(executor.sql().await[0].starts_with("select count(a.id) as count from users as a"));
        assert_eq!(cache.run(&op, None).await.status, CacheStatus::Hit);
    }

    #[tokio::test]
    async fn test_add_seeds_point_read_and_wipes_the_rest() {
        let executor = RecordingExecutor {
            insert_id: Some("42".into()),
            ..RecordingExecutor::with_rows(json!([{"id": 42, "name": "ann"}]))
        };
        let (cache, executor, store) = setup(executor);

        let listing = Operation::get("users").filter_by("status", "active").build();
        store.put("users", &cache.fingerprint(&listing), json!([]), 10).await;
        store.put("orders", "unrelated", json!([]), 10).await;

        let add = Operation::add("users").value("name", "ann").build();
        let written = cache.run(&add, None).await;
        assert_eq!(written.status, CacheStatus::Bypass);
        assert_eq!(written.payload, json!([{"id": 42, "name": "ann"}]));
        assert!(store.get("users", &written.fingerprint).await.unwrap().is_none());

        let calls = executor.calls().await;
        let read = cache.run(&Operation::get("users").filter_by("a.id", 42).build(), None).await;
        assert_eq!(read.status, CacheStatus::Hit);
        assert_eq!(read.payload, written.payload);
        assert_eq!(executor.calls().await, calls);

        assert!(store.get("users", &cache.fingerprint(&listing)).await.unwrap().is_none());
        assert_eq!(store.len("orders").await, 1);
    }

    #[tokio::test]
    async fn test_add_injects_actor_and_rereads() {
        let executor = RecordingExecutor {
            insert_id: Some("7".into()),
            ..RecordingExecutor::with_rows(json!([{"id": 7}]))
        };
        let (cache, executor, _store) = setup(executor);
        let actor = ActorContext::new("10.0.0.1", "acc-1", "user-9");

        cache.run(&Operation::add("users").value("name", "ann").build(), Some(&actor)).await;

        let sql = executor.sql().await;
        assert_eq!(
            sql[0],
            r#"insert into users (`id`, `name`, `ip`, `account_id`, `user_id`) values (NULL, "ann", "10.0.0.1", "acc-1", "user-9")"#
        );
        assert_eq!(sql[1], "select a.* from users as a where a.id >= 1 AND a.id = '7' order by a.id desc limit 0, 1");
    }

    #[tokio::test]
    async fn test_alter_seeds_point_read_and_wipes_the_rest() {
        let (cache, executor, store) = setup(RecordingExecutor::with_rows(json!([{"id": 5, "name": "bob"}])));
        let listing = Operation::get("users").filter_by("status", "active").build();
        store.put("users", &cache.fingerprint(&listing), json!([{"id": 5, "name": "ann"}]), 10).await;

        let alter = Operation::alter("users").value("name", "bob").filter_by("id", 5).build();
        let written = cache.run(&alter, None).await;
        assert_eq!(written.status, CacheStatus::Bypass);
        assert_eq!(written.payload, json!([{"id": 5, "name": "bob"}]));

        let calls = executor.calls().await;
        let read = cache.run(&Operation::get("users").filter_by("a.id", 5).build(), None).await;
        assert_eq!(read.status, CacheStatus::Hit);
        assert_eq!(read.payload, written.payload);
        assert_eq!(executor.calls().await, calls);

        assert!(store.get("users", &cache.fingerprint(&listing)).await.unwrap().is_none());
        assert_eq!(store.len("users").await, 1);
    }

    #[tokio::test]
    async fn test_committed_write_invalidates_even_when_reread_fails() {
        let executor = RecordingExecutor { insert_id: Some("9".into()), fail_reads: true, ..RecordingExecutor::default() };
        let (cache, _executor, store) = setup(executor);
        let listing = Operation::get("users").build();
        store.put("users", &cache.fingerprint(&listing), json!([{"id": 1}]), 10).await;

        let written = cache.run(&Operation::add("users").value("name", "ann").build(), None).await;
        assert_eq!(written.status, CacheStatus::Bypass);
        assert!(matches!(written.failure, Some(Error::AdapterFailure(_))));
        assert_eq!(store.len("users").await, 0);

        let listed = cache.run(&listing, None).await;
        assert_ne!(listed.status, CacheStatus::Hit);
    }

    #[tokio::test]
    async fn test_writes_use_executor_quoting() {
        let executor = RecordingExecutor {
            insert_id: Some("3".into()),
            quoting: Quoting::Standard,
            ..RecordingExecutor::default()
        };
        let (cache, executor, _store) = setup(executor);

        cache.run(&Operation::add("users").value("email", "name").value("note", "it's").build(), None).await;
        assert_eq!(
            executor.sql().await[0],
            "insert into users (`id`, `email`, `note`) values (NULL, 'name', 'it''s')"
        );

        let explain = cache.explain(&Operation::alter("users").value("email", "name").filter_by("id", 1).build()).unwrap();
        assert!(explain.statements[0].sql.starts_with("update users as a set `email` = 'name'"));
    }

    #[tokio::test]
    async fn test_alter_without_row_id_wipes_everything() {
        let (cache, executor, store) = setup(RecordingExecutor::default());
        store.put("users", "cached", json!([1]), 10).await;

        let op = Operation::alter("users").value("name", "bob").filter_by("id", 5).build();
        let resolved = cache.run(&op, None).await;

        assert_eq!(resolved.payload, json!([]));
        assert_eq!(store.len("users").await, 0);
        assert_eq!(
            executor.sql().await[0],
            r#"update users as a set `name` = "bob" where ( a.id >= 1 AND id = '5' )"#
        );
    }

    #[tokio::test]
    async fn test_disable_soft_deletes_and_wipes() {
        let (cache, executor, store) = setup(RecordingExecutor::with_rows(json!([{"id": 5, "active": "0"}])));
        store.put("users", "cached", json!([1]), 10).await;

        let resolved = cache.run(&Operation::disable("users").filter_by("id", 5).build(), None).await;

        assert_eq!(resolved.status, CacheStatus::Bypass);
        assert_eq!(store.len("users").await, 0);
        let sql = executor.sql().await;
        assert_eq!(sql[0], r#"update users as a set `active` = "0" where ( a.id >= 1 AND id = '5' )"#);
        assert!(sql[1].ends_with("limit 0, 1"));
    }

    #[tokio::test]
    async fn test_failed_write_keeps_cache() {
        let (cache, _executor, store) = setup(RecordingExecutor::failing());
        store.put("users", "cached", json!([1]), 10).await;

        let resolved = cache.run(&Operation::add("users").value("name", "ann").build(), None).await;
        assert!(resolved.is_failure());
        assert_eq!(resolved.status, CacheStatus::Bypass);
        assert_eq!(store.len("users").await, 1);
    }

    #[tokio::test]
    async fn test_mock_seeds_from_fallback_without_executor() {
        let (cache, executor, _store) = setup(RecordingExecutor::default());
        let seeded = Operation::mock("settings").fallback(json!({"theme": "dark"})).build();

        let first = cache.run(&seeded, None).await;
        assert_eq!(first.status, CacheStatus::Fallback);
        assert_eq!(first.payload, json!({"theme": "dark"}));

        let second = cache.run(&Operation::mock("settings").build(), None).await;
        assert_eq!(second.status, CacheStatus::Hit);
        assert_eq!(second.payload, json!({"theme": "dark"}));
        assert_eq!(executor.calls().await, 0);
    }

    #[tokio::test]
    async fn test_mock_without_fallback_is_empty_object() {
        let (cache, _executor, store) = setup(RecordingExecutor::default());
        let resolved = cache.run(&Operation::mock("settings").build(), None).await;

        assert_eq!(resolved.payload, json!({}));
        assert_eq!(resolved.status, CacheStatus::Fallback);
        assert_eq!(store.len("settings").await, 0);
    }

    #[tokio::test]
    async fn test_explain_does_not_execute() {
        let (cache, executor, _store) = setup(RecordingExecutor::default());

        let alter = Operation::alter("users").value("name", "bob").filter_by("id", 5).build();
        let explain = cache.explain(&alter).unwrap();
        assert_eq!(explain.kind, OperationKind::Alter);
        assert_eq!(explain.fingerprint, cache.fingerprint(&alter));
        assert_eq!(explain.statements.len(), 2);

        assert!(cache.explain(&Operation::mock("settings").build()).unwrap().statements.is_empty());
        assert_eq!(cache.explain(&Operation::get("users").build()).unwrap().statements.len(), 1);
        assert_eq!(executor.calls().await, 0);
    }

    #[tokio::test]
    async fn test_wipe() {
        let (cache, _executor, store) = setup(RecordingExecutor::default());
        store.put("users", "a", json!(1), 10).await;
        store.put("users", "b", json!(2), 10).await;

        assert_eq!(cache.wipe("users").await.unwrap(), 2);
        assert_eq!(store.len("users").await, 0);
    }

    #[test]
    fn test_is_blank() {
        for blank in [json!(null), json!(false), json!(0), json!(""), json!("0"), json!([]), json!({})] {
            assert!(is_blank(&blank), "{blank}");
        }
        for filled in [json!(1), json!("a"), json!([0]), json!({"a": 1})] {
            assert!(!is_blank(&filled), "{filled}");
        }
    }
}
