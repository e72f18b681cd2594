//! Data source adapters for querycache.
//!
//! This crate provides [`SqliteExecutor`], an [`querycache_core::Executor`]
//! backed by SQLite through tokio-rusqlite.

pub mod error;
pub mod sqlite;

pub use error::SqliteError;
pub use sqlite::SqliteExecutor;
