//! # sledge-query
//!
//! Collections, property paths and the SQL builder for the Sledgehammer framework.
//!
//! This crate provides:
//! - A dynamic value model ([`Value`], [`Array`], [`Object`]) with loose comparison
//! - Property paths: a small expression language for reading and writing nested data
//! - Condition filters (`"price >" => 10`, `"name LIKE" => "A%"`, closures)
//! - A lazily evaluated [`Collection`] with LINQ-style operators and change events
//! - An immutable, fluent [`SqlBuilder`]
//! - [`DatabaseCollection`], which pushes conditions into SQL until the rows are loaded
//!
//! ## Property paths
//!
//! ```rust
//! use sledge_query::{array, list, PropertyPath, Value};
//!
//! let order = array! {
//!     "customer" => array! { "name" => "Ada" },
//!     "items" => list![array! { "sku" => "A-1" }, array! { "sku" => "B-7" }],
//! };
//!
//! assert_eq!(PropertyPath::get("customer.name", &order).unwrap(), Value::from("Ada"));
//! assert_eq!(
//!     PropertyPath::get("items[*].sku", &order).unwrap(),
//!     list!["A-1", "B-7"],
//! );
//! ```
//!
//! ## Collections
//!
//! ```rust
//! use sledge_query::{array, list, Collection, Conditions, SortMethod};
//!
//! let products = Collection::from(list![
//!     array! { "name" => "pear", "price" => 3 },
//!     array! { "name" => "apple", "price" => 1 },
//!     array! { "name" => "kiwi", "price" => 2 },
//! ]);
//!
//! let names = products
//!     .where_(Conditions::all([("price >", 1)]))
//!     .unwrap()
//!     .order_by("price", SortMethod::Regular)
//!     .unwrap()
//!     .select("name", Default::default())
//!     .unwrap();
//!
//! assert_eq!(names.to_array().unwrap().len(), 2);
//! ```
//!
//! ## SQL
//!
//! ```rust
//! use sledge_query::SqlBuilder;
//!
//! let sql = SqlBuilder::new()
//!     .select(["id", "name"])
//!     .from("users")
//!     .unwrap()
//!     .and_where("active = 1")
//!     .or_where("role = 'admin'")
//!     .limit(10, None);
//!
//! assert_eq!(
//!     sql.compose().unwrap(),
//!     "SELECT id, name FROM users WHERE (active = 1) OR role = 'admin' LIMIT 10"
//! );
//! ```
//!
//! ## Error Handling
//!
//! ```rust
//! use sledge_query::{ErrorCode, PropertyPath};
//!
//! let err = PropertyPath::parse("a..b").unwrap_err();
//! assert_eq!(err.code, ErrorCode::InvalidPath);
//! ```

pub mod collection;
pub mod config;
pub mod database;
pub mod error;
pub mod filter;
pub mod logging;
#[macro_use]
pub mod macros;
pub mod path;
pub mod sql;
pub mod value;

pub use collection::{
    Collection, CollectionEvent, EventKind, KeySelector, Projection, Selector, SortMethod,
};
pub use config::SledgeConfig;
pub use database::{
    Connection, DEFAULT_LINK, Database, DatabaseCollection, Databases, LogSettings, LoggedQuery,
    QueryLog, ResultSet, Statement,
};
pub use error::{ErrorCode, ErrorContext, QueryError, QueryResult, Suggestion};
pub use filter::{ConditionMap, Conditions, Filter, Logical, Operator, build_filter};
pub use path::{CompiledPath, PathCache, PathExpression, PropertyPath, Step};
pub use sql::{Direction, JoinKind, LogicalOperator, Restriction, SqlBuilder};
pub use value::{Array, Key, Object, Value};

// Re-export logging utilities
pub use logging::{LogFormat, LogOptions, init as init_logging, init_with, is_debug_enabled};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::collection::{Collection, EventKind, KeySelector, Selector, SortMethod};
    pub use crate::database::{Connection, DatabaseCollection, Databases, Statement};
    pub use crate::error::{ErrorCode, QueryError, QueryResult};
    pub use crate::filter::{Conditions, Operator};
    pub use crate::path::{PathExpression, PropertyPath};
    pub use crate::sql::{Direction, Restriction, SqlBuilder};
    pub use crate::value::{Array, Key, Object, Value};
    pub use crate::{array, list};
}
