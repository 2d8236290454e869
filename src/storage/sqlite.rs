use std::time::Duration;

use log::{debug, trace};
use rusqlite::{Connection, OpenFlags, params_from_iter, types::ValueRef};

use super::{Lookup, StorageError};
use crate::config::DatabaseConfig;

/// [`Lookup`] backed by a single SQLite connection.
///
/// Queries use SQLite's positional placeholders (`?`, `?1`, ...).
pub struct SqliteLookup {
    conn: Connection,
}

impl SqliteLookup {
    pub fn open(config: &DatabaseConfig) -> Result<Self, StorageError> {
        let mode = if config.read_only {
            OpenFlags::SQLITE_OPEN_READ_ONLY
        } else {
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE
        };
        let flags = mode | OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX;

        let open_err = |source| StorageError::Open {
            database: config.database.clone(),
            source,
        };
        let conn = Connection::open_with_flags(&config.database, flags).map_err(open_err)?;
        if let Some(secs) = config.timeout {
            conn.busy_timeout(Duration::from_secs(secs))
                .map_err(open_err)?;
        }

        debug!("opened sqlite database '{}'", config.database);
        Ok(Self::from_connection(conn))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }
}

impl Lookup for SqliteLookup {
    fn lookup(&mut self, query: &str, params: &[String]) -> Result<Option<String>, StorageError> {
        trace!("executing '{query}' with {params:?}");
        let mut stmt = self.conn.prepare(query)?;
        let mut rows = stmt.query(params_from_iter(params))?;

        match rows.next()? {
            Some(row) => Ok(Some(render(row.get_ref(0)?))),
            None => Ok(None),
        }
    }

    fn close(self) -> Result<(), StorageError> {
        self.conn
            .close()
            .map_err(|(_, e)| StorageError::Close(e))
    }
}

fn render(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => String::new(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(text) | ValueRef::Blob(text) => String::from_utf8_lossy(text).into_owned(),
    }
}
