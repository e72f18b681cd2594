//! Command line arguments.

use std::path::PathBuf;

use clap::Parser;
use querycache_core::{ActorContext, Operation, OperationKind};
use serde_json::Value;

/// Run one cached operation against a SQLite database and print the payload as JSON.
#[derive(Parser, Debug)]
#[command(name = "querycache")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Operation kind: add, alter, disable, get, list, count or mock
    #[arg(value_parser = parse_kind)]
    pub kind: OperationKind,

    /// Table name, optionally aliased (`users as a`)
    pub table: String,

    /// Projection for reads
    #[arg(long, default_value = "a.*")]
    pub columns: String,

    /// Filter entry; KEY may carry an operator prefix such as `like` or `>=`
    #[arg(long = "filter", num_args = 2, value_names = ["KEY", "VALUE"])]
    pub filters: Vec<String>,

    /// Column value for add and alter
    #[arg(long = "value", num_args = 2, value_names = ["KEY", "VALUE"])]
    pub values: Vec<String>,

    /// Join clause, used verbatim
    #[arg(long = "join")]
    pub joins: Vec<String>,

    /// Order-by term, used verbatim
    #[arg(long)]
    pub order: Vec<String>,

    /// Grouping fragment, used verbatim
    #[arg(long)]
    pub group: Vec<String>,

    /// Row window; -1 as LIMIT drops the cap, -1 as START drops pagination
    #[arg(long, num_args = 2, value_names = ["START", "LIMIT"], allow_negative_numbers = true)]
    pub limit: Option<Vec<i64>>,

    /// Entry lifetime in minutes; 0 disables caching for this call
    #[arg(long)]
    pub ttl: Option<i64>,

    /// JSON payload a mock operation seeds the cache with
    #[arg(long, value_parser = parse_json)]
    pub fallback: Option<Value>,

    /// SQL script run before the operation (schema setup)
    #[arg(long)]
    pub init_sql: Option<PathBuf>,

    /// Database path (overrides QUERYCACHE_DB_PATH)
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Actor address recorded on writes
    #[arg(long, requires_all = ["account_id", "user_id"])]
    pub ip: Option<String>,

    /// Actor account recorded on writes
    #[arg(long, requires = "ip")]
    pub account_id: Option<String>,

    /// Actor user recorded on writes
    #[arg(long, requires = "ip")]
    pub user_id: Option<String>,

    /// Print the statements instead of running them
    #[arg(long)]
    pub explain: bool,
}

impl Args {
    pub fn operation(&self) -> Operation {
        let mut builder = Operation::builder(self.kind, &self.table).columns(&self.columns);

        for (key, value) in pairs(&self.filters) {
            builder = builder.filter_by(key, value);
        }
        for (key, value) in pairs(&self.values) {
            builder = builder.value(key, value);
        }
        for join in &self.joins {
            builder = builder.join(join);
        }
        for order in &self.order {
            builder = builder.order(order);
        }
        for group in &self.group {
            builder = builder.group(group);
        }
        if let Some(bounds) = &self.limit
            && let [start, limit] = bounds.as_slice()
        {
            builder = builder.limit(*start, *limit);
        }
        if let Some(ttl) = self.ttl {
            builder = builder.ttl_minutes(ttl);
        }
        if let Some(fallback) = &self.fallback {
            builder = builder.fallback(fallback.clone());
        }

        builder.build()
    }

    pub fn actor(&self) -> Option<ActorContext> {
        match (&self.ip, &self.account_id, &self.user_id) {
            (Some(ip), Some(account), Some(user)) => Some(ActorContext::new(ip, account, user)),
            _ => None,
        }
    }
}

fn pairs(flat: &[String]) -> impl Iterator<Item = (&str, &str)> {
    flat.chunks_exact(2).map(|pair| (pair[0].as_str(), pair[1].as_str()))
}

fn parse_kind(raw: &str) -> Result<OperationKind, String> {
    OperationKind::parse(raw).ok_or_else(|| {
        let known: Vec<&str> = OperationKind::ALL.iter().map(|kind| kind.as_str()).collect();
        format!("unknown operation `{raw}`; expected one of {}", known.join(", "))
    })
}

fn parse_json(raw: &str) -> Result<Value, String> {
    serde_json::from_str(raw).map_err(|err| err.to_string())
}
