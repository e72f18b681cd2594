//! File-backed cache store.
//!
//! Layout: `<root>/<table>/<fingerprint>.cache`, one JSON document per entry.
//! Writes go to a temporary file in the same directory and are renamed into
//! place, so readers never observe a half-written entry.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::store::{CacheEntry, CacheStore, table_key, validate_fingerprint};
use crate::Error;

const ENTRY_EXTENSION: &str = "cache";

/// Cache store rooted at a directory.
#[derive(Clone, Debug)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding a table's entries.
    pub fn table_dir(&self, table: &str) -> PathBuf {
        self.root.join(table_key(table))
    }

    pub fn entry_path(&self, table: &str, fingerprint: &str) -> PathBuf {
        self.table_dir(table).join(format!("{fingerprint}.{ENTRY_EXTENSION}"))
    }
}

#[async_trait]
impl CacheStore for FileStore {
    async fn get(&self, table: &str, fingerprint: &str) -> Result<Option<CacheEntry>, Error> {
        validate_fingerprint(fingerprint)?;
        let path = self.entry_path(table, fingerprint);

        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::CacheReadFailure(format!("{}: {e}", path.display()))),
        }
    }

    async fn write(&self, table: &str, fingerprint: &str, entry: &CacheEntry) -> Result<(), Error> {
        validate_fingerprint(fingerprint)?;
        let dir = self.table_dir(table);
        let path = self.entry_path(table, fingerprint);
        let bytes = serde_json::to_vec(entry).map_err(|e| Error::CacheWriteFailure(e.to_string()))?;

        tokio::task::spawn_blocking(move || -> Result<(), Error> {
            let write_err = |e: std::io::Error| Error::CacheWriteFailure(format!("{}: {e}", dir.display()));

            std::fs::create_dir_all(&dir).map_err(write_err)?;
            let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(write_err)?;
            tmp.write_all(&bytes).map_err(write_err)?;
            tmp.persist(&path)
                .map_err(|e| Error::CacheWriteFailure(format!("{}: {}", path.display(), e.error)))?;
            Ok(())
        })
        .await
        .map_err(|e| Error::CacheWriteFailure(e.to_string()))?
    }

    async fn wipe_except(&self, table: &str, keep: Option<&str>) -> Result<u64, Error> {
        let dir = self.table_dir(table);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(Error::CacheWriteFailure(format!("{}: {e}", dir.display()))),
        };

        let mut removed = 0u64;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Error::CacheWriteFailure(format!("{}: {e}", dir.display())))?
        {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(ENTRY_EXTENSION) {
                continue;
            }
            let stem = path.file_stem().and_then(|stem| stem.to_str());
            if keep.is_some() && stem == keep {
                continue;
            }
            match tokio::fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(Error::CacheWriteFailure(format!("{}: {e}", path.display()))),
            }
        }

        tracing::debug!(table, removed, "wiped cache entries");
        Ok(removed)
    }
}
