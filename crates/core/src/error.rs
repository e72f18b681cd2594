//! Unified error types for querycache.

/// Unified error types for the query cache.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The data source was unreachable or rejected the statement.
    #[error("ADAPTER_FAILURE: {0}")]
    AdapterFailure(String),

    /// The cache backend could not persist an entry.
    #[error("CACHE_WRITE_FAILURE: {0}")]
    CacheWriteFailure(String),

    /// A cache entry could not be read or decoded.
    #[error("CACHE_READ_FAILURE: {0}")]
    CacheReadFailure(String),

    /// A filter key carries an operator prefix nobody recognizes.
    ///
    /// Only raised by strict compilation; lenient compilation degrades the
    /// key to an equality clause.
    #[error("MALFORMED_FILTER_KEY: {0}")]
    MalformedFilterKey(String),

    /// Invalid input parameters (e.g., an empty table name).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::CacheReadFailure(err.to_string())
    }
}

impl Error {
    /// True for failures that came from the data source rather than the cache.
    pub fn is_adapter_failure(&self) -> bool {
        matches!(self, Error::AdapterFailure(_))
    }
}
