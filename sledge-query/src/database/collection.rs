//! Collections backed by an SQL statement.
//!
//! A [`DatabaseCollection`] runs its statement on first use. Until then, `where_`
//! with a condition map is pushed into the statement's WHERE clause instead of
//! filtering rows in memory:
//!
//! ```rust,ignore
//! let users = DatabaseCollection::new(
//!     SqlBuilder::new().select("*").from("users")?,
//!     &databases,
//! );
//! let admins = users.where_(Conditions::all([("role", "admin"), ("deleted_at", Value::Null)]))?;
//! // SELECT * FROM users WHERE role = 'admin' AND deleted_at IS NULL
//! ```

use std::fmt;
use std::ops::{Deref, DerefMut};

use tracing::debug;

use super::{DEFAULT_LINK, Database, Databases};
use crate::collection::Collection;
use crate::error::{QueryError, QueryResult};
use crate::filter::{ConditionMap, Conditions, Logical, Operator, parse_key};
use crate::path::PathExpression;
use crate::sql::{Restriction, SqlBuilder};
use crate::value::{Array, Value};

/// The statement behind a database collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    /// A composable SELECT.
    Builder(SqlBuilder),
    /// Literal SQL; conditions can't be pushed into it.
    Raw(String),
}

impl Statement {
    /// Render the SQL text.
    pub fn to_sql(&self) -> QueryResult<String> {
        match self {
            Self::Builder(builder) => builder.compose(),
            Self::Raw(sql) => Ok(sql.clone()),
        }
    }

    /// The builder, unless this is literal SQL.
    pub fn as_builder(&self) -> Option<&SqlBuilder> {
        match self {
            Self::Builder(builder) => Some(builder),
            Self::Raw(_) => None,
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Builder(builder) => write!(f, "{}", builder),
            Self::Raw(sql) => f.write_str(sql),
        }
    }
}

impl From<SqlBuilder> for Statement {
    fn from(builder: SqlBuilder) -> Self {
        Self::Builder(builder)
    }
}

impl From<&str> for Statement {
    fn from(sql: &str) -> Self {
        Self::Raw(sql.to_string())
    }
}

impl From<String> for Statement {
    fn from(sql: String) -> Self {
        Self::Raw(sql)
    }
}

/// A [`Collection`] whose rows come from a statement run on first use.
///
/// Every [`Collection`] operation is available through `Deref`; `where_`,
/// `get_query` and `set_query` are specialized.
pub struct DatabaseCollection {
    statement: Statement,
    db_link: String,
    databases: Databases,
    collection: Collection,
}

impl DatabaseCollection {
    /// Wrap a statement run on the `"default"` link.
    pub fn new(statement: impl Into<Statement>, databases: &Databases) -> Self {
        Self::with_link(statement, DEFAULT_LINK, databases)
    }

    /// Wrap a statement run on the given link.
    ///
    /// The link is resolved when the rows are first needed.
    pub fn with_link(
        statement: impl Into<Statement>,
        db_link: impl Into<String>,
        databases: &Databases,
    ) -> Self {
        let statement = statement.into();
        let db_link = db_link.into();
        let collection = Collection::deferred(loader(&statement, &db_link, databases));
        Self {
            statement,
            db_link,
            databases: databases.clone(),
            collection,
        }
    }

    /// The link the statement runs on.
    pub fn db_link(&self) -> &str {
        &self.db_link
    }

    /// The database behind the link.
    pub fn database(&self) -> QueryResult<std::sync::Arc<Database>> {
        self.databases.get(&self.db_link)
    }

    /// Keep the rows matching `conditions`.
    ///
    /// Before the statement has run, a condition map over plain column names is
    /// appended to the builder's WHERE clause and a new, unexecuted collection is
    /// returned. Predicates, expressions, nested paths, literal SQL statements and
    /// already loaded rows are filtered in memory.
    pub fn where_(&self, conditions: impl Into<Conditions>) -> QueryResult<DatabaseCollection> {
        let conditions = conditions.into();
        let pushable = match (&self.statement, &conditions) {
            (Statement::Builder(builder), Conditions::Map(map))
                if !self.collection.is_materialized() =>
            {
                Some((builder, map))
            }
            _ => None,
        };

        if let Some((builder, map)) = pushable {
            if let Some(columns) = plain_columns(map)? {
                let database = self.database()?;
                let restriction = restrict(&database, map, &columns)?;
                let builder = match restriction {
                    Some(restriction) => builder.and_where(restriction),
                    None => builder.clone(),
                };
                debug!(link = %self.db_link, sql = %builder, "Pushed conditions into the query");
                return Ok(Self::with_link(builder, self.db_link.clone(), &self.databases));
            }
        }

        debug!(link = %self.db_link, "Filtering database rows in memory");
        Ok(Self {
            statement: self.statement.clone(),
            db_link: self.db_link.clone(),
            databases: self.databases.clone(),
            collection: self.collection.where_(conditions)?,
        })
    }

    /// The statement the rows are loaded from.
    pub fn get_query(&self) -> QueryResult<Statement> {
        Ok(self.statement.clone())
    }

    /// Replace the statement, discarding any loaded rows.
    pub fn set_query(&mut self, statement: impl Into<Statement>) -> QueryResult<()> {
        self.statement = statement.into();
        let load = loader(&self.statement, &self.db_link, &self.databases);
        self.collection.replace_source_with(Box::new(load));
        Ok(())
    }

    /// Unwrap the in-memory collection.
    pub fn into_collection(self) -> Collection {
        self.collection
    }
}

impl Deref for DatabaseCollection {
    type Target = Collection;

    fn deref(&self) -> &Collection {
        &self.collection
    }
}

impl DerefMut for DatabaseCollection {
    fn deref_mut(&mut self) -> &mut Collection {
        &mut self.collection
    }
}

impl fmt::Debug for DatabaseCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseCollection")
            .field("statement", &self.statement)
            .field("db_link", &self.db_link)
            .field("materialized", &self.collection.is_materialized())
            .finish()
    }
}

fn loader(
    statement: &Statement,
    db_link: &str,
    databases: &Databases,
) -> impl Fn() -> QueryResult<Array> + 'static {
    let statement = statement.clone();
    let db_link = db_link.to_string();
    let databases = databases.clone();
    move || {
        let sql = statement.to_sql()?;
        let rows = databases.get(&db_link)?.query(&sql)?;
        Ok(rows.into_array())
    }
}

/// The column and operator of every entry, or `None` when an entry's path is more
/// than a single column.
fn plain_columns(map: &ConditionMap) -> QueryResult<Option<Vec<(String, Operator)>>> {
    let mut columns = Vec::with_capacity(map.entries().len());
    for (key, _) in map.entries() {
        let (path, operator) = parse_key(key)?;
        let path = PathExpression::parse(&path)?;
        match path.as_column() {
            Some(column) => columns.push((column.to_string(), operator)),
            None => return Ok(None),
        }
    }
    Ok(Some(columns))
}

fn restrict(
    database: &Database,
    map: &ConditionMap,
    columns: &[(String, Operator)],
) -> QueryResult<Option<Restriction>> {
    let mut clauses = Vec::with_capacity(columns.len());
    for ((column, operator), (_, expectation)) in columns.iter().zip(map.entries()) {
        clauses.push(clause(database, column, *operator, expectation)?);
    }

    match (map.effective_logical(), clauses.len()) {
        (_, 0) => Ok(None),
        (_, 1) => Ok(clauses.pop()),
        (Logical::And, _) => Ok(Some(Restriction::and(clauses))),
        (Logical::Or, _) => Ok(Some(Restriction::or(clauses))),
    }
}

fn clause(
    database: &Database,
    column: &str,
    operator: Operator,
    expectation: &Value,
) -> QueryResult<Restriction> {
    let name = database.quote_identifier(column);

    if expectation.is_null() {
        // Ordering against NULL compares with '' to match the legacy behavior.
        return match operator {
            Operator::Equal => Ok(format!("{} IS NULL", name).into()),
            Operator::NotEqual => Ok(format!("{} IS NOT NULL", name).into()),
            Operator::In | Operator::NotIn => Err(list_expected(column, operator)),
            other => Ok(format!("{} {} ''", name, other.as_sql()).into()),
        };
    }

    match operator {
        Operator::In | Operator::NotIn => {
            let values = expectation
                .as_array()
                .ok_or_else(|| list_expected(column, operator))?;
            if values.is_empty() {
                // Nothing is IN an empty list; everything is NOT IN it.
                let always = if operator == Operator::In { "1 = 0" } else { "1 = 1" };
                return Ok(always.into());
            }
            let quoted: Vec<String> = values
                .values()
                .map(|value| literal(database, column, value))
                .collect::<QueryResult<_>>()?;
            Ok(if operator == Operator::In {
                Restriction::in_list(name, quoted)
            } else {
                Restriction::not_in_list(name, quoted)
            })
        }
        Operator::NotEqual => {
            let value = literal(database, column, expectation)?;
            Ok(format!("({name} != {value} OR {name} IS NULL)").into())
        }
        other => {
            let value = literal(database, column, expectation)?;
            Ok(format!("{} {} {}", name, other.as_sql(), value).into())
        }
    }
}

/// Quote a value for `column`. Integers bound to `id`/`*_id` columns stay bare.
fn literal(database: &Database, column: &str, value: &Value) -> QueryResult<String> {
    if matches!(value, Value::Array(_) | Value::Object(_)) {
        return Err(QueryError::invalid_filter(format!(
            "Can't compare column \"{}\" with {}",
            column,
            value.type_name()
        )));
    }
    if column == "id" || column.ends_with("_id") {
        if let Some(id) = bare_integer(value) {
            return Ok(id.to_string());
        }
    }
    Ok(database.quote(value))
}

fn bare_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Int(i) => Some(*i),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        Value::Float(f) if f.fract() == 0.0 => Some(*f as i64),
        _ => None,
    }
}

fn list_expected(column: &str, operator: Operator) -> QueryError {
    QueryError::invalid_filter(format!(
        "The {} condition on \"{}\" needs a list of values",
        operator, column
    ))
    .with_code_suggestion("Pass an array", "Conditions::all([(\"id IN\", list![1, 2, 3])])")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;
    use crate::database::tests::{RecordingConnection, users};
    use crate::{ErrorCode, Key, list};
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn setup() -> (Databases, Arc<Mutex<Vec<String>>>) {
        let (connection, statements) = RecordingConnection::new(users());
        let databases = Databases::new();
        databases.register(DEFAULT_LINK, Database::new(Box::new(connection)));
        (databases, statements)
    }

    fn users_query() -> SqlBuilder {
        SqlBuilder::new().select("*").from("users").unwrap()
    }

    fn sql(collection: &DatabaseCollection) -> String {
        collection.get_query().unwrap().to_sql().unwrap()
    }

    #[test]
    fn test_rows_are_loaded_lazily() {
        let (databases, statements) = setup();
        let collection = DatabaseCollection::new(users_query(), &databases);
        assert!(statements.lock().is_empty());

        assert_eq!(collection.count().unwrap(), 2);
        assert_eq!(collection.count().unwrap(), 2);
        assert_eq!(*statements.lock(), vec!["SELECT * FROM users".to_string()]);
    }

    #[test]
    fn test_where_pushes_into_query() {
        let (databases, statements) = setup();
        let collection = DatabaseCollection::new(users_query(), &databases);
        let filtered = collection
            .where_(Conditions::all([("name", Value::from("Bob")), ("age >", 21.into())]))
            .unwrap();

        assert_eq!(
            sql(&filtered),
            "SELECT * FROM users WHERE name = 'Bob' AND age > '21'"
        );
        assert_eq!(sql(&collection), "SELECT * FROM users");
        assert!(statements.lock().is_empty());

        filtered.materialize().unwrap();
        assert_eq!(statements.lock().len(), 1);
    }

    #[test]
    fn test_null_conditions() {
        let (databases, _) = setup();
        let collection = DatabaseCollection::new(users_query(), &databases);

        let is_null = collection.where_(Conditions::all([("status", Value::Null)])).unwrap();
        assert_eq!(sql(&is_null), "SELECT * FROM users WHERE status IS NULL");

        let not_null = collection
            .where_(Conditions::all([("status !=", Value::Null)]))
            .unwrap();
        assert_eq!(sql(&not_null), "SELECT * FROM users WHERE status IS NOT NULL");

        let ordered = collection
            .where_(Conditions::all([("score >=", Value::Null)]))
            .unwrap();
        assert_eq!(sql(&ordered), "SELECT * FROM users WHERE score >= ''");
    }

    #[test]
    fn test_not_equal_includes_null() {
        let (databases, _) = setup();
        let collection = DatabaseCollection::new(users_query(), &databases);
        let filtered = collection
            .where_(Conditions::all([("role !=", "admin")]))
            .unwrap();
        assert_eq!(
            sql(&filtered),
            "SELECT * FROM users WHERE (role != 'admin' OR role IS NULL)"
        );
    }

    #[test]
    fn test_id_columns_are_unquoted() {
        let (databases, _) = setup();
        let collection = DatabaseCollection::new(users_query(), &databases);
        let filtered = collection
            .where_(Conditions::all([
                ("id", Value::from("5")),
                ("group_id", 7.into()),
                ("zip", "1234".into()),
            ]))
            .unwrap();
        assert_eq!(
            sql(&filtered),
            "SELECT * FROM users WHERE id = 5 AND group_id = 7 AND zip = '1234'"
        );
    }

    #[test]
    fn test_chained_where_extends_one_group() {
        let (databases, _) = setup();
        let collection = DatabaseCollection::new(users_query(), &databases);
        let filtered = collection
            .where_(Conditions::all([("a", 1)]))
            .unwrap()
            .where_(Conditions::all([("b", 2)]))
            .unwrap();
        assert_eq!(sql(&filtered), "SELECT * FROM users WHERE a = '1' AND b = '2'");
    }

    #[test]
    fn test_unmarked_map_is_pushed_down_as_and() {
        let (databases, _) = setup();
        let collection = DatabaseCollection::new(users_query(), &databases);
        let map = ConditionMap::new().with("name", "Bob").with("active", 1);
        assert_eq!(map.logical(), None);

        let filtered = collection.where_(map).unwrap();
        assert_eq!(
            sql(&filtered),
            "SELECT * FROM users WHERE name = 'Bob' AND active = '1'"
        );
    }

    #[test]
    fn test_in_and_or_conditions() {
        let (databases, _) = setup();
        let collection = DatabaseCollection::new(users_query(), &databases);

        let listed = collection
            .where_(Conditions::all([("user_id IN", list![1, 2])]))
            .unwrap();
        assert_eq!(sql(&listed), "SELECT * FROM users WHERE user_id IN (1, 2)");

        let empty = collection
            .where_(Conditions::all([("name IN", Value::Array(Array::new()))]))
            .unwrap();
        assert_eq!(sql(&empty), "SELECT * FROM users WHERE 1 = 0");

        let either = collection
            .where_(Conditions::any([("name LIKE", "B%"), ("name NOT LIKE", "%e")]))
            .unwrap()
            .where_(Conditions::all([("active", 1)]))
            .unwrap();
        assert_eq!(
            sql(&either),
            "SELECT * FROM users WHERE (name LIKE 'B%' OR name NOT LIKE '%e') AND active = '1'"
        );
    }

    #[test]
    fn test_in_requires_list() {
        let (databases, _) = setup();
        let collection = DatabaseCollection::new(users_query(), &databases);
        let err = collection
            .where_(Conditions::all([("id IN", 3)]))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidFilter);
    }

    #[test]
    fn test_in_memory_fallbacks() {
        let (databases, statements) = setup();

        let raw = DatabaseCollection::new("SELECT * FROM users", &databases);
        let filtered = raw.where_(Conditions::all([("name", "Alice")])).unwrap();
        assert_eq!(filtered.get_query().unwrap(), Statement::Raw("SELECT * FROM users".into()));
        assert_eq!(filtered.count().unwrap(), 1);

        let built = DatabaseCollection::new(users_query(), &databases);
        let by_closure = built
            .where_(Conditions::predicate(|row, _| {
                PathExpression::parse("id").unwrap().get(row) == Value::Int(2)
            }))
            .unwrap();
        assert_eq!(sql(&by_closure), "SELECT * FROM users");
        assert_eq!(by_closure.count().unwrap(), 1);

        let fresh = DatabaseCollection::new(users_query(), &databases);
        let nested = fresh.where_(Conditions::all([("profile.city", "Paris")])).unwrap();
        assert_eq!(sql(&nested), "SELECT * FROM users");
        assert_eq!(nested.count().unwrap(), 0);

        assert!(built.is_materialized());
        let loaded = built.where_(Conditions::all([("name", "Bob")])).unwrap();
        assert_eq!(sql(&loaded), "SELECT * FROM users");
        assert_eq!(loaded.count().unwrap(), 1);

        assert_eq!(statements.lock().len(), 3);
    }

    #[test]
    fn test_set_query_discards_rows() {
        let (databases, statements) = setup();
        let mut collection = DatabaseCollection::new(users_query(), &databases);
        collection.materialize().unwrap();

        collection.set_query("SELECT id FROM users").unwrap();
        assert!(!collection.is_materialized());
        assert_eq!(collection.get_query().unwrap().to_string(), "SELECT id FROM users");

        collection.materialize().unwrap();
        assert_eq!(statements.lock().last().unwrap(), "SELECT id FROM users");
    }

    #[test]
    fn test_unknown_link() {
        let (databases, _) = setup();
        let collection = DatabaseCollection::with_link(users_query(), "reports", &databases);
        assert_eq!(collection.db_link(), "reports");
        assert_eq!(
            collection.count().unwrap_err().code,
            ErrorCode::ConnectionNotFound
        );
        assert_eq!(
            collection.where_(Conditions::all([("a", 1)])).unwrap_err().code,
            ErrorCode::ConnectionNotFound
        );
    }

    #[test]
    fn test_rows_are_keyed_by_column() {
        let (databases, _) = setup();
        let collection = DatabaseCollection::new(users_query(), &databases);
        let names = collection.select("name", Default::default()).unwrap();
        assert_eq!(
            names.values().unwrap(),
            vec![Value::from("Bob"), Value::from("Alice")]
        );
        assert_eq!(collection.keys().unwrap(), vec![Key::Int(0), Key::Int(1)]);
    }
}
