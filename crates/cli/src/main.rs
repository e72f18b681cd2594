//! querycache entry point.
//!
//! Runs one operation through the cache and prints the payload on stdout.
//! Logging goes to stderr so the JSON output stays clean.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use querycache_client::SqliteExecutor;
use querycache_core::{AppConfig, QueryCache};
use tracing_subscriber::EnvFilter;

mod args;

use args::Args;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let args = Args::parse();
    let config = AppConfig::load()?;
    let op = args.operation();

    let db_path = args.db.clone().unwrap_or_else(|| config.db_path.clone());
    let executor = SqliteExecutor::open(&db_path, config.actor_columns.clone())
        .await
        .with_context(|| format!("opening {}", db_path.display()))?;

    if let Some(script) = &args.init_sql {
        let sql = tokio::fs::read_to_string(script)
            .await
            .with_context(|| format!("reading {}", script.display()))?;
        executor.execute_batch(sql).await?;
    }

    let cache = QueryCache::from_config(Arc::new(executor), &config);

    if args.explain {
        let explain = cache.explain(&op)?;
        println!("{}", serde_json::to_string_pretty(&explain)?);
        return Ok(());
    }

    let actor = args.actor();
    let resolved = cache.run(&op, actor.as_ref()).await;
    tracing::info!(
        kind = %op.kind,
        table = %op.table,
        status = %resolved.status,
        fingerprint = %resolved.fingerprint,
        "operation resolved"
    );

    if let Some(failure) = resolved.failure {
        bail!(failure);
    }

    println!("{}", serde_json::to_string_pretty(&resolved.payload)?);
    Ok(())
}
