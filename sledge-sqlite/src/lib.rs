//! SQLite connection for Sledgehammer database collections.
//!
//! This crate implements the [`Connection`](sledge_query::Connection) contract
//! on top of `rusqlite`, as a single blocking connection.
//!
//! # Example
//!
//! ```rust
//! use sledge_query::{Conditions, DatabaseCollection, Databases, LogSettings, SqlBuilder};
//!
//! let databases = Databases::new();
//! let db = sledge_sqlite::open("sqlite::memory:", LogSettings::default()).unwrap();
//! databases.register("default", db);
//!
//! databases.get("default").unwrap().query("CREATE TABLE users (id INTEGER, name TEXT)").unwrap();
//!
//! let users = DatabaseCollection::new(
//!     SqlBuilder::new().select("*").from("users").unwrap(),
//!     &databases,
//! );
//! let named = users.where_(Conditions::all([("name", "Ada")])).unwrap();
//! assert_eq!(named.count().unwrap(), 0);
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod types;

pub use config::{DatabasePath, SqliteConfig};
pub use connection::SqliteConnection;
pub use error::{SqliteError, SqliteResult};

use sledge_query::{Database, LogSettings, QueryResult};

/// Open the database named by an SQLite URL, wrapped with query logging.
pub fn open(url: &str, settings: LogSettings) -> QueryResult<Database> {
    let connection = SqliteConnection::from_url(url)?;
    Ok(Database::with_settings(Box::new(connection), settings))
}
