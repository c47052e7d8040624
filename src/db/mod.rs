use crate::error::{PaperkgError, Result};
use rusqlite::Connection;
use std::path::Path;
use tokio::task;

pub mod migrate;

/// SQLite pragmas applied to every connection.
/// WAL for concurrent readers during construction, NORMAL sync for speed,
/// 64MB page cache and memory temp store for the full-scan similarity path.
const PRAGMAS: &str = "PRAGMA journal_mode = WAL; \
     PRAGMA synchronous = NORMAL; \
     PRAGMA foreign_keys = ON; \
     PRAGMA temp_store = MEMORY; \
     PRAGMA cache_size = -65536;";

/// Database connection wrapper
pub struct Db {
    path: std::path::PathBuf,
}

impl Db {
    /// Create a new database connection manager
    pub fn new<P: AsRef<Path>>(db_path: P) -> Self {
        Self {
            path: db_path.as_ref().to_path_buf(),
        }
    }

    /// Execute a closure with a database connection in a blocking task
    pub async fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let path = self.path.clone();
        task::spawn_blocking(move || {
            let mut conn = Connection::open(&path).map_err(PaperkgError::Database)?;
            conn.execute_batch(PRAGMAS)?;
            f(&mut conn)
        })
        .await
        .map_err(|_e| PaperkgError::Database(rusqlite::Error::InvalidParameterCount(0, 0)))?
    }
}
