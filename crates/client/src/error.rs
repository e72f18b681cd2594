//! Errors raised by the SQLite adapter.

use tokio_rusqlite::rusqlite;

#[derive(Debug, thiserror::Error)]
pub enum SqliteError {
    /// Database operation failed.
    #[error("SQLITE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),
}

impl From<tokio_rusqlite::Error<SqliteError>> for SqliteError {
    fn from(err: tokio_rusqlite::Error<SqliteError>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => SqliteError::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => SqliteError::Database(tokio_rusqlite::Error::Close(c)),
            _ => SqliteError::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for SqliteError {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        SqliteError::Database(err)
    }
}

impl From<rusqlite::Error> for SqliteError {
    fn from(err: rusqlite::Error) -> Self {
        SqliteError::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<SqliteError> for querycache_core::Error {
    fn from(err: SqliteError) -> Self {
        querycache_core::Error::AdapterFailure(err.to_string())
    }
}
