//! Core types and shared functionality for querycache.
//!
//! This crate provides:
//! - Predicate compilation and SQL statement building
//! - Query fingerprinting and a pluggable result cache (file and memory backends)
//! - The cache orchestrator that ties an [`Executor`] to a [`CacheStore`]
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod executor;
pub mod orchestrator;
pub mod query;

pub use cache::{CacheEntry, CacheStore, FileStore, MemoryStore};
pub use config::AppConfig;
pub use error::Error;
pub use executor::{ActorContext, Execution, Executor, Row};
pub use orchestrator::{CacheSettings, CacheStatus, Explain, QueryCache, Resolved};
pub use query::{Mapping, Operation, OperationBuilder, OperationKind, Pagination, Predicate, Statement};
