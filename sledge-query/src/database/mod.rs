//! The database boundary: connections, the link registry and query logging.
//!
//! A [`Connection`] is the driver contract: it executes one SQL statement as a
//! blocking call and quotes values and identifiers. [`Database`] wraps a connection
//! with query logging, and [`Databases`] maps link names (`"default"`, `"reports"`,
//! ...) to databases so collections can resolve their connection lazily.
//!
//! ```rust,ignore
//! use sledge_query::database::{Database, Databases};
//!
//! let databases = Databases::new();
//! databases.register("default", Database::new(Box::new(connection)));
//! let rows = databases.get("default")?.query("SELECT * FROM users")?;
//! ```

mod collection;
mod query_log;

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

pub use collection::{DatabaseCollection, Statement};
pub use query_log::{
    DEFAULT_LOG_LIMIT, DEFAULT_SLOW_QUERY_THRESHOLD, LogSettings, LoggedQuery, QueryLog,
};

use crate::error::{QueryError, QueryResult};
use crate::sql;
use crate::value::{Array, Key, Value};

/// Name of the link used when none is given.
pub const DEFAULT_LINK: &str = "default";

/// A driver connection.
///
/// Implementations execute statements synchronously; any timeout or retry is the
/// caller's concern.
pub trait Connection: Send + Sync {
    /// Execute a statement and fetch every row.
    fn query(&self, sql: &str) -> QueryResult<ResultSet>;

    /// Render a value as an SQL literal.
    fn quote(&self, value: &Value) -> String {
        sql::quote_literal(value)
    }

    /// Quote an identifier when it needs quoting.
    fn quote_identifier(&self, name: &str) -> String {
        sql::quote_identifier(name)
    }

    /// Name of the driver, for diagnostics.
    fn driver_name(&self) -> &'static str;
}

/// Rows returned by a statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    /// Column names, in select order.
    pub columns: Vec<String>,
    /// Row values, aligned with `columns`.
    pub rows: Vec<Vec<Value>>,
}

impl ResultSet {
    /// Create a result set.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if there are no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterate the rows as arrays keyed by column name.
    pub fn iter(&self) -> impl Iterator<Item = Array> + '_ {
        self.rows.iter().map(|row| self.keyed(row.iter().cloned()))
    }

    /// A list of rows, each keyed by column name.
    pub fn into_array(self) -> Array {
        let Self { columns, rows } = self;
        rows.into_iter()
            .map(|row| {
                let keyed: Array = columns
                    .iter()
                    .map(|column| Key::from(column.as_str()))
                    .zip(row)
                    .collect();
                Value::Array(keyed)
            })
            .collect()
    }

    fn keyed(&self, row: impl Iterator<Item = Value>) -> Array {
        self.columns
            .iter()
            .map(|column| Key::from(column.as_str()))
            .zip(row)
            .collect()
    }
}

/// A connection with query logging.
pub struct Database {
    connection: Box<dyn Connection>,
    settings: LogSettings,
    log: Mutex<QueryLog>,
}

impl Database {
    /// Wrap a connection with the default log settings.
    pub fn new(connection: Box<dyn Connection>) -> Self {
        Self::with_settings(connection, LogSettings::default())
    }

    /// Wrap a connection.
    pub fn with_settings(connection: Box<dyn Connection>, settings: LogSettings) -> Self {
        let log = QueryLog::new(settings.log_limit);
        Self {
            connection,
            settings,
            log: Mutex::new(log),
        }
    }

    /// Execute a statement.
    ///
    /// Driver failures come back as database errors carrying the SQL text.
    pub fn query(&self, sql: &str) -> QueryResult<ResultSet> {
        debug!(driver = self.connection.driver_name(), sql = %sql, "Executing query");
        let start = Instant::now();
        let result = self.connection.query(sql);
        let duration = start.elapsed();

        let rows = match result {
            Ok(rows) => rows,
            Err(err) => {
                let err = if err.is_database_error() {
                    err
                } else {
                    QueryError::database(err.message.clone()).with_source(err)
                }
                .with_sql(sql);
                warn!(code = %err.code, kind = err.code.description(), error = %err, "Query failed");
                debug!("{}", err.display_full());
                return Err(err);
            }
        };

        if duration >= self.settings.slow_query_threshold {
            warn!(
                sql = %sql,
                duration_ms = duration.as_millis() as u64,
                threshold_ms = self.settings.slow_query_threshold.as_millis() as u64,
                "Slow query detected"
            );
        } else {
            debug!(
                duration_us = duration.as_micros() as u64,
                rows = rows.len(),
                "Query completed"
            );
        }

        if self.settings.log_queries {
            self.log.lock().record(LoggedQuery {
                sql: sql.to_string(),
                duration,
                rows: rows.len(),
            });
        }
        Ok(rows)
    }

    /// Render a value as an SQL literal.
    pub fn quote(&self, value: &Value) -> String {
        self.connection.quote(value)
    }

    /// Quote an identifier when it needs quoting.
    pub fn quote_identifier(&self, name: &str) -> String {
        self.connection.quote_identifier(name)
    }

    /// Name of the driver.
    pub fn driver_name(&self) -> &'static str {
        self.connection.driver_name()
    }

    /// The log settings.
    pub fn settings(&self) -> &LogSettings {
        &self.settings
    }

    /// A snapshot of the query log.
    pub fn query_log(&self) -> QueryLog {
        self.log.lock().clone()
    }

    /// The most recently logged statement.
    pub fn last_query(&self) -> Option<LoggedQuery> {
        self.log.lock().last().cloned()
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("driver", &self.connection.driver_name())
            .field("settings", &self.settings)
            .field("queries", &self.log.lock().total_count())
            .finish()
    }
}

/// Registry of databases by link name.
///
/// Cloning the handle shares the registry.
#[derive(Clone, Default)]
pub struct Databases {
    links: Arc<RwLock<IndexMap<String, Arc<Database>>>>,
}

impl Databases {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a database under `link`, replacing any previous one.
    pub fn register(&self, link: impl Into<String>, database: Database) -> Arc<Database> {
        let link = link.into();
        let database = Arc::new(database);
        let previous = self.links.write().insert(link.clone(), Arc::clone(&database));
        if previous.is_some() {
            info!(link = %link, "Replaced database link");
        } else {
            debug!(link = %link, driver = database.driver_name(), "Registered database link");
        }
        database
    }

    /// Resolve a link.
    pub fn get(&self, link: &str) -> QueryResult<Arc<Database>> {
        self.links
            .read()
            .get(link)
            .cloned()
            .ok_or_else(|| QueryError::connection_not_found(link))
    }

    /// The database registered as `"default"`.
    pub fn default_database(&self) -> QueryResult<Arc<Database>> {
        self.get(DEFAULT_LINK)
    }

    /// Check if a link is registered.
    pub fn contains(&self, link: &str) -> bool {
        self.links.read().contains_key(link)
    }

    /// Remove a link.
    pub fn remove(&self, link: &str) -> Option<Arc<Database>> {
        self.links.write().shift_remove(link)
    }

    /// The registered link names, in registration order.
    pub fn links(&self) -> Vec<String> {
        self.links.read().keys().cloned().collect()
    }
}

impl fmt::Debug for Databases {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Databases")
            .field("links", &self.links())
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::ErrorCode;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    /// Returns a fixed result set and remembers every statement.
    pub(crate) struct RecordingConnection {
        pub(crate) result: ResultSet,
        pub(crate) statements: Arc<Mutex<Vec<String>>>,
    }

    impl RecordingConnection {
        pub(crate) fn new(result: ResultSet) -> (Self, Arc<Mutex<Vec<String>>>) {
            let statements = Arc::new(Mutex::new(Vec::new()));
            (
                Self {
                    result,
                    statements: Arc::clone(&statements),
                },
                statements,
            )
        }
    }

    impl Connection for RecordingConnection {
        fn query(&self, sql: &str) -> QueryResult<ResultSet> {
            self.statements.lock().push(sql.to_string());
            if sql.contains("FAIL") {
                return Err(QueryError::internal("driver refused the statement"));
            }
            Ok(self.result.clone())
        }

        fn driver_name(&self) -> &'static str {
            "recording"
        }
    }

    pub(crate) fn users() -> ResultSet {
        ResultSet::new(
            vec!["id".into(), "name".into()],
            vec![
                vec![1.into(), "Bob".into()],
                vec![2.into(), "Alice".into()],
            ],
        )
    }

    #[test]
    fn test_result_set_into_array() {
        let rows = users().into_array();
        assert_eq!(rows.len(), 2);
        let first = rows.get(&Key::Int(0)).unwrap().as_array().unwrap();
        assert_eq!(first.get(&Key::from("name")), Some(&Value::from("Bob")));
        assert_eq!(users().iter().count(), 2);
    }

    #[test]
    fn test_query_is_logged() {
        let (connection, statements) = RecordingConnection::new(users());
        let db = Database::with_settings(
            Box::new(connection),
            LogSettings::default().with_log_limit(1),
        );
        db.query("SELECT 1").unwrap();
        db.query("SELECT 2").unwrap();

        assert_eq!(statements.lock().len(), 2);
        let log = db.query_log();
        assert_eq!(log.len(), 1);
        assert_eq!(log.total_count(), 2);
        assert_eq!(db.last_query().unwrap().sql, "SELECT 2");
        assert_eq!(db.last_query().unwrap().rows, 2);
    }

    #[test]
    fn test_failure_carries_sql() {
        let (connection, _) = RecordingConnection::new(users());
        let db = Database::new(Box::new(connection));
        let err = db.query("SELECT FAIL").unwrap_err();
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert_eq!(err.context.sql.as_deref(), Some("SELECT FAIL"));
        assert!(db.query_log().is_empty());
    }

    #[test]
    fn test_logging_can_be_disabled() {
        let (connection, _) = RecordingConnection::new(users());
        let settings = LogSettings::default()
            .with_log_queries(false)
            .with_slow_query_threshold(Duration::ZERO);
        let db = Database::with_settings(Box::new(connection), settings);
        db.query("SELECT 1").unwrap();
        assert!(db.last_query().is_none());
    }

    #[test]
    fn test_registry() {
        let databases = Databases::new();
        assert_eq!(
            databases.default_database().unwrap_err().code,
            ErrorCode::ConnectionNotFound
        );

        let (connection, _) = RecordingConnection::new(users());
        databases.register(DEFAULT_LINK, Database::new(Box::new(connection)));
        let shared = databases.clone();
        assert!(shared.contains("default"));
        assert_eq!(shared.get("default").unwrap().driver_name(), "recording");
        assert_eq!(databases.links(), vec!["default".to_string()]);

        assert!(databases.remove("default").is_some());
        assert!(!shared.contains("default"));
    }

    #[test]
    fn test_default_quoting() {
        let (connection, _) = RecordingConnection::new(users());
        let db = Database::new(Box::new(connection));
        assert_eq!(db.quote(&"it's".into()), "'it''s'");
        assert_eq!(db.quote_identifier("order"), "\"order\"");
        assert_eq!(db.quote_identifier("status"), "status");
    }
}
