//! Cache entries and the pluggable store interface.

use std::fmt::Write;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Error;

/// A cached payload and its expiry.
///
/// Persisted as `{"cache": <payload>, "limit_time": <unix seconds or 0>}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    #[serde(rename = "cache", default)]
    pub payload: Value,

    /// Unix seconds after which the entry is stale; `0` marks an entry that
    /// is never persisted.
    #[serde(rename = "limit_time", default)]
    pub expires_at: i64,
}

impl CacheEntry {
    /// Build an entry that expires `ttl_minutes` from now.
    ///
    /// A zero TTL yields an ephemeral entry; a negative TTL yields one that is
    /// already stale.
    pub fn with_ttl(payload: Value, ttl_minutes: i64) -> Self {
        let expires_at =
            if ttl_minutes == 0 { 0 } else { chrono::Utc::now().timestamp() + ttl_minutes.saturating_mul(60) };
        Self { payload, expires_at }
    }

    pub fn is_ephemeral(&self) -> bool {
        self.expires_at == 0
    }

    pub fn is_fresh_at(&self, now: i64) -> bool {
        self.expires_at > now
    }

    pub fn is_fresh(&self) -> bool {
        self.is_fresh_at(chrono::Utc::now().timestamp())
    }
}

/// Key→entry store grouped by table.
///
/// Stores know nothing about operations: freshness decisions belong to the
/// caller, and `wipe` drops a whole table regardless of which rows changed.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Read an entry, stale or not. `None` when nothing is stored.
    async fn get(&self, table: &str, fingerprint: &str) -> Result<Option<CacheEntry>, Error>;

    /// Persist an entry, replacing any previous one.
    async fn write(&self, table: &str, fingerprint: &str, entry: &CacheEntry) -> Result<(), Error>;

    /// Delete every entry of `table` except `keep`. Returns how many were removed.
    async fn wipe_except(&self, table: &str, keep: Option<&str>) -> Result<u64, Error>;

    /// Delete every entry of `table`.
    async fn wipe(&self, table: &str) -> Result<u64, Error> {
        self.wipe_except(table, None).await
    }

    /// Write-through: persist `payload` for `ttl_minutes` and hand it back.
    ///
    /// With a zero TTL nothing is persisted. Write failures are logged and
    /// swallowed; the payload is returned either way.
    async fn put(&self, table: &str, fingerprint: &str, payload: Value, ttl_minutes: i64) -> Value {
        let entry = CacheEntry::with_ttl(payload, ttl_minutes);
        if entry.is_ephemeral() {
            return entry.payload;
        }
        if let Err(err) = self.write(table, fingerprint, &entry).await {
            tracing::warn!(table, fingerprint, error = %err, "cache write failed; returning uncached payload");
        }
        entry.payload
    }
}

/// Directory/bucket name for a table.
///
/// Drops a trailing alias (`users as a` → `users`). The rest is escaped
/// reversibly: `_` becomes `__` and every byte outside `[A-Za-z0-9-]` becomes
/// `_` plus two hex digits, so `crm.users` and `crm_users` never share a
/// directory and no name can escape the cache root.
pub fn table_key(table: &str) -> String {
    let base = match table.find(" as ") {
        Some(idx) => &table[..idx],
        None => table,
    };
    let base = base.trim();
    if base.is_empty() {
        return "_".to_string();
    }

    let mut key = String::with_capacity(base.len());
    for byte in base.bytes() {
        match byte {
            b'_' => key.push_str("__"),
            b if b.is_ascii_alphanumeric() || b == b'-' => key.push(char::from(b)),
            b => {
                let _ = write!(key, "_{b:02x}");
            }
        }
    }
    key
}

/// Reject fingerprints that could not have come from the fingerprint engine.
pub(crate) fn validate_fingerprint(fingerprint: &str) -> Result<(), Error> {
    if fingerprint.is_empty() || !fingerprint.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        return Err(Error::InvalidInput(format!("invalid fingerprint: {fingerprint:?}")));
    }
    Ok(())
}
