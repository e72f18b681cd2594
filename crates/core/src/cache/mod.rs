//! Result cache keyed by operation fingerprints.
//!
//! This module provides:
//!
//! - Deterministic HMAC-SHA256 fingerprints of operations
//! - A pluggable [`CacheStore`] interface with per-table invalidation
//! - A file backend (one directory per table, atomic writes) and a memory backend

pub mod file_store;
pub mod fingerprint;
pub mod memory_store;
pub mod store;

pub use crate::Error;

pub use file_store::FileStore;
pub use fingerprint::{compute_fingerprint, operation_fingerprint};
pub use memory_store::MemoryStore;
pub use store::{CacheEntry, CacheStore, table_key};
