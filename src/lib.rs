//! # Sledgehammer
//!
//! Collections, property paths and a fluent SQL builder.
//!
//! Sledgehammer provides:
//! - Property paths for reading and writing nested arrays and objects
//! - Condition filters over those paths
//! - Lazily evaluated collections with LINQ-style operators and change events
//! - An immutable SQL builder
//! - Database collections that push conditions into SQL until their rows are loaded
//!
//! ## Quick Start
//!
//! ```rust
//! use sledgehammer::prelude::*;
//!
//! let config = SledgeConfig::from_str(
//!     r#"
//!     [databases.default]
//!     url = "sqlite::memory:"
//!     "#,
//! )
//! .unwrap();
//! let databases = sledgehammer::connect(&config).unwrap();
//!
//! let db = databases.get("default").unwrap();
//! db.query("CREATE TABLE users (id INTEGER, name TEXT, role TEXT)").unwrap();
//! db.query("INSERT INTO users VALUES (1, 'Ada', 'admin'), (2, 'Grace', NULL)").unwrap();
//!
//! let users = DatabaseCollection::new(
//!     SqlBuilder::new().select("*").from("users").unwrap(),
//!     &databases,
//! );
//! let admins = users.where_(Conditions::all([("role", "admin")])).unwrap();
//!
//! assert_eq!(
//!     admins.get_query().unwrap().to_sql().unwrap(),
//!     "SELECT * FROM users WHERE role = 'admin'"
//! );
//! assert_eq!(admins.count().unwrap(), 1);
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

use tracing::info;

/// The query core: values, paths, filters, collections and SQL.
pub mod query {
    pub use sledge_query::*;
}

/// The SQLite connection.
pub mod sqlite {
    pub use sledge_sqlite::*;
}

pub use sledge_query::{array, list};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use sledge_query::config::SledgeConfig;
    pub use sledge_query::prelude::*;
}

// Re-export key types at the crate root
pub use sledge_query::{QueryError, QueryResult, SledgeConfig};

/// Install the log subscriber described by the `[debug]` section of `config`.
///
/// `SLEDGE_*` environment variables take precedence over the file. Requires the
/// `tracing-subscriber` feature; without it only the options are validated.
pub fn init_logging(config: &SledgeConfig) -> QueryResult<()> {
    let options = config.log_options()?.with_env_overrides();
    sledge_query::logging::init_with(options);
    Ok(())
}

/// Open every database link in `config` and register it.
///
/// Only SQLite URLs are supported; any other scheme is a configuration error.
pub fn connect(config: &SledgeConfig) -> QueryResult<sledge_query::Databases> {
    let databases = sledge_query::Databases::new();
    for (link, database) in &config.databases {
        if !sledge_sqlite::SqliteConfig::accepts(&database.url) {
            return Err(QueryError::configuration(format!(
                "Unsupported database URL for link \"{}\": {}",
                link, database.url
            ))
            .with_suggestion("Use an SQLite URL such as sqlite::memory: or sqlite://app.db"));
        }
        let settings = config.log_settings(link)?;
        let db = sledge_sqlite::open(&database.url, settings)
            .map_err(|e| e.with_context(format!("Opening database link \"{}\"", link)))?;
        databases.register(link.clone(), db);
        info!(link = %link, "Connected database link");
    }
    Ok(databases)
}
