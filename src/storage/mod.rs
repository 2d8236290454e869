//! Query execution.
//!
//! The session only needs one thing from a database: run a query with some
//! positional parameters and hand back the first column of the first row.
//! [`Lookup`] captures that so the protocol engine stays driver agnostic.
pub mod sqlite;

use thiserror::Error;

pub use sqlite::SqliteLookup;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to open database '{database}': {source}")]
    Open {
        database: String,
        source: rusqlite::Error,
    },

    #[error("{0}")]
    Query(#[from] rusqlite::Error),

    #[error("failed to close database: {0}")]
    Close(rusqlite::Error),
}

/// Backend that answers lookups.
pub trait Lookup {
    /// Runs `query` with `params` bound positionally.
    ///
    /// Returns the first column of the first row, or `None` when the query
    /// matched nothing.
    fn lookup(&mut self, query: &str, params: &[String]) -> Result<Option<String>, StorageError>;

    /// Releases the underlying connection.
    fn close(self) -> Result<(), StorageError>
    where
        Self: Sized;
}
