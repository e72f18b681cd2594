//! In-process cache store.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::store::{CacheEntry, CacheStore, table_key};
use crate::Error;

/// Cache store kept in memory, grouped by table like [`super::FileStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, HashMap<String, CacheEntry>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries stored for `table`.
    pub async fn len(&self, table: &str) -> usize {
        self.tables.read().await.get(&table_key(table)).map_or(0, HashMap::len)
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, table: &str, fingerprint: &str) -> Result<Option<CacheEntry>, Error> {
        let tables = self.tables.read().await;
        Ok(tables.get(&table_key(table)).and_then(|entries| entries.get(fingerprint)).cloned())
    }

    async fn write(&self, table: &str, fingerprint: &str, entry: &CacheEntry) -> Result<(), Error> {
        let mut tables = self.tables.write().await;
        tables
            .entry(table_key(table))
            .or_default()
            .insert(fingerprint.to_string(), entry.clone());
        Ok(())
    }

    async fn wipe_except(&self, table: &str, keep: Option<&str>) -> Result<u64, Error> {
        let mut tables = self.tables.write().await;
        let Some(entries) = tables.get_mut(&table_key(table)) else {
            return Ok(0);
        };
        let before = entries.len();
        entries.retain(|fingerprint, _| Some(fingerprint.as_str()) == keep);
        Ok((before - entries.len()) as u64)
    }
}
