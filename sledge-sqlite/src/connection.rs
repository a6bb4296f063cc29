//! SQLite connection wrapper.

use parking_lot::Mutex;
use rusqlite::params_from_iter;
use sledge_query::{Connection, QueryResult, ResultSet, Value};
use tracing::{debug, trace};

use crate::config::{DatabasePath, SqliteConfig};
use crate::error::{SqliteError, SqliteResult};
use crate::types::{from_sqlite_value, to_sqlite_value};

/// A blocking SQLite connection.
///
/// The driver connection sits behind a mutex so one connection can be shared by a
/// [`Database`](sledge_query::Database) registry.
pub struct SqliteConnection {
    conn: Mutex<rusqlite::Connection>,
    config: SqliteConfig,
}

impl SqliteConnection {
    /// Open a connection and apply the configured pragmas.
    pub fn open(config: SqliteConfig) -> SqliteResult<Self> {
        let conn = match &config.path {
            DatabasePath::Memory => rusqlite::Connection::open_in_memory(),
            DatabasePath::File(path) => rusqlite::Connection::open(path),
        }
        .map_err(|e| SqliteError::connection(format!("{}: {}", config.path_str(), e)))?;

        let init = config.init_sql();
        if !init.is_empty() {
            conn.execute_batch(&init)?;
        }
        debug!(path = config.path_str(), "Opened SQLite connection");

        Ok(Self {
            conn: Mutex::new(conn),
            config,
        })
    }

    /// Open an in-memory database.
    pub fn memory() -> SqliteResult<Self> {
        Self::open(SqliteConfig::memory())
    }

    /// Open the database named by an SQLite URL.
    pub fn from_url(url: &str) -> SqliteResult<Self> {
        Self::open(SqliteConfig::from_url(url)?)
    }

    /// The configuration this connection was opened with.
    pub fn config(&self) -> &SqliteConfig {
        &self.config
    }

    /// Run one or more statements that return no rows.
    pub fn execute_batch(&self, sql: &str) -> SqliteResult<()> {
        trace!(sql = %sql, "Executing batch");
        self.conn.lock().execute_batch(sql)?;
        Ok(())
    }

    /// Run a statement with bound parameters and return the number of changed rows.
    pub fn execute(&self, sql: &str, params: &[Value]) -> SqliteResult<usize> {
        debug!(sql = %sql, params = params.len(), "Executing statement");
        let changed = self
            .conn
            .lock()
            .execute(sql, params_from_iter(params.iter().map(to_sqlite_value)))?;
        Ok(changed)
    }

    /// Run a query and fetch every row.
    pub fn fetch_all(&self, sql: &str) -> SqliteResult<ResultSet> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(sql)?;
        let columns: Vec<String> = stmt
            .column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();

        let width = columns.len();
        let rows = stmt.query_map([], |row| {
            (0..width)
                .map(|i| row.get_ref(i).map(from_sqlite_value))
                .collect::<Result<Vec<_>, _>>()
        })?;
        let rows = rows.collect::<Result<Vec<_>, _>>()?;

        Ok(ResultSet::new(columns, rows))
    }
}

impl Connection for SqliteConnection {
    fn query(&self, sql: &str) -> QueryResult<ResultSet> {
        Ok(self.fetch_all(sql)?)
    }

    fn driver_name(&self) -> &'static str {
        "sqlite"
    }
}

impl std::fmt::Debug for SqliteConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteConnection")
            .field("config", &self.config)
            .finish()
    }
}
