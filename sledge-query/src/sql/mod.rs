//! An immutable, fluent SELECT builder.
//!
//! Every builder method returns a new [`SqlBuilder`], so a shared base query can be
//! branched freely:
//!
//! ```rust
//! use sledge_query::sql::SqlBuilder;
//!
//! let base = SqlBuilder::new().select("id").from("users").unwrap();
//! let active = base.and_where("active = 1");
//! let recent = active.and_where("created > '2024-01-01'").limit(10, None);
//!
//! assert_eq!(base.compose().unwrap(), "SELECT id FROM users");
//! assert_eq!(
//!     recent.compose().unwrap(),
//!     "SELECT id FROM users WHERE active = 1 AND created > '2024-01-01' LIMIT 10"
//! );
//! ```
//!
//! WHERE and HAVING are [`Restriction`] trees. Chaining the same operator extends
//! one group (`a AND b AND c`); switching operator wraps the existing tree, which
//! is then parenthesized (`(a AND b) OR c`).

mod identifier;
mod restriction;

use std::fmt;
use std::sync::OnceLock;

use indexmap::IndexMap;
use regex_lite::Regex;
use tracing::info;

pub use identifier::{escape_identifier, is_reserved, needs_quoting, quote_identifier, quote_literal};
pub use restriction::{LogicalOperator, Restriction};

use crate::error::{QueryError, QueryResult};
use crate::value::Key;

/// Sort direction for ORDER BY.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// `ASC`
    #[default]
    Asc,
    /// `DESC`
    Desc,
    /// No keyword, the database default.
    Unspecified,
}

impl Direction {
    /// The SQL keyword, if any.
    pub const fn as_sql(&self) -> Option<&'static str> {
        match self {
            Self::Asc => Some("ASC"),
            Self::Desc => Some("DESC"),
            Self::Unspecified => None,
        }
    }
}

/// Kind of a join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// `INNER JOIN`
    Inner,
    /// `LEFT JOIN`
    Left,
    /// `RIGHT JOIN`
    Right,
    /// `OUTER JOIN`
    Outer,
}

impl JoinKind {
    /// The SQL keyword.
    pub const fn as_sql(&self) -> &'static str {
        match self {
            Self::Inner => "INNER JOIN",
            Self::Left => "LEFT JOIN",
            Self::Right => "RIGHT JOIN",
            Self::Outer => "OUTER JOIN",
        }
    }
}

/// A join attached to a table entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    /// The join keyword.
    pub kind: JoinKind,
    /// The ON condition.
    pub on: String,
}

/// A table in the FROM clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableEntry {
    /// The table expression, without alias.
    pub expression: String,
    /// The join, when this table is joined rather than listed.
    pub join: Option<Join>,
}

/// Columns accepted by [`SqlBuilder::select`] and [`SqlBuilder::add_columns`].
///
/// Each entry is an optional alias and an expression.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnList(Vec<(Option<String>, String)>);

impl From<&str> for ColumnList {
    fn from(column: &str) -> Self {
        Self(vec![(None, column.to_string())])
    }
}

impl From<String> for ColumnList {
    fn from(column: String) -> Self {
        Self(vec![(None, column)])
    }
}

impl From<Vec<&str>> for ColumnList {
    fn from(columns: Vec<&str>) -> Self {
        Self(columns.into_iter().map(|c| (None, c.to_string())).collect())
    }
}

impl<const N: usize> From<[&str; N]> for ColumnList {
    fn from(columns: [&str; N]) -> Self {
        Self(columns.into_iter().map(|c| (None, c.to_string())).collect())
    }
}

impl<const N: usize> From<[(&str, &str); N]> for ColumnList {
    /// `(alias, expression)` pairs.
    fn from(columns: [(&str, &str); N]) -> Self {
        Self(
            columns
                .into_iter()
                .map(|(alias, expr)| (Some(alias.to_string()), expr.to_string()))
                .collect(),
        )
    }
}

/// Tables accepted by [`SqlBuilder::from`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableList(Vec<String>);

impl From<&str> for TableList {
    fn from(table: &str) -> Self {
        Self(vec![table.to_string()])
    }
}

impl From<String> for TableList {
    fn from(table: String) -> Self {
        Self(vec![table])
    }
}

impl From<Vec<&str>> for TableList {
    fn from(tables: Vec<&str>) -> Self {
        Self(tables.into_iter().map(str::to_string).collect())
    }
}

impl<const N: usize> From<[&str; N]> for TableList {
    fn from(tables: [&str; N]) -> Self {
        Self(tables.into_iter().map(str::to_string).collect())
    }
}

fn explicit_alias_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)^(.+)\s+AS\s+([A-Za-z_][A-Za-z0-9_]*)$").expect("alias pattern is a valid regex")
    })
}

fn implicit_alias_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)^(.+?)\s+([A-Za-z_][A-Za-z0-9_]*)$").expect("alias pattern is a valid regex")
    })
}

/// Split `"expr AS alias"` or `"expr alias"` into the expression and the alias.
///
/// A trailing word only counts as an implicit alias when it is not a keyword, and
/// the expression before it neither ends in an operator nor is a lone keyword
/// (`"DISTINCT name"`).
pub fn split_alias(expression: &str) -> (String, Option<String>) {
    let trimmed = expression.trim();
    if let Some(caps) = explicit_alias_regex().captures(trimmed) {
        return (caps[1].trim().to_string(), Some(caps[2].to_string()));
    }
    if let Some(caps) = implicit_alias_regex().captures(trimmed) {
        let expr = caps[1].trim();
        let alias = &caps[2];
        let ends_in_operator = expr.ends_with(|c: char| "+-*/%=<>!|&^,(".contains(c));
        let lone_keyword = !expr.contains(char::is_whitespace) && is_reserved(expr);
        if !ends_in_operator && !lone_keyword && !is_reserved(alias) {
            return (expr.to_string(), Some(alias.to_string()));
        }
    }
    (trimmed.to_string(), None)
}

/// An immutable SELECT statement under construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SqlBuilder {
    columns: IndexMap<Key, String>,
    tables: IndexMap<String, TableEntry>,
    where_clause: Option<Restriction>,
    having_clause: Option<Restriction>,
    group_by: Vec<String>,
    order_by: IndexMap<String, Direction>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl SqlBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    // ============== Columns ==============

    /// Replace the selected columns.
    pub fn select(&self, columns: impl Into<ColumnList>) -> Self {
        let mut next = self.clone();
        if !next.columns.is_empty() {
            info!(
                previous = next.columns.len(),
                "Overwriting the selected columns"
            );
            next.columns.clear();
        }
        next.push_columns(columns.into());
        next
    }

    /// Add one column, with an explicit alias or one declared in the expression.
    pub fn add_column(&self, expression: &str, alias: Option<&str>) -> Self {
        let mut next = self.clone();
        let entry = (alias.map(str::to_string), expression.to_string());
        next.push_columns(ColumnList(vec![entry]));
        next
    }

    /// Add several columns.
    pub fn add_columns(&self, columns: impl Into<ColumnList>) -> Self {
        let mut next = self.clone();
        next.push_columns(columns.into());
        next
    }

    fn push_columns(&mut self, columns: ColumnList) {
        for (alias, expression) in columns.0 {
            let (expression, alias) = match alias {
                Some(alias) => (expression, Some(alias)),
                None => split_alias(&expression),
            };
            match alias {
                Some(alias) => {
                    let key = Key::Str(alias);
                    if self.columns.contains_key(&key) {
                        info!(alias = %key, "Overwriting column alias");
                    }
                    self.columns.insert(key, expression);
                }
                None => {
                    let next = self
                        .columns
                        .keys()
                        .filter_map(Key::as_int)
                        .max()
                        .map_or(0, |i| i + 1);
                    self.columns.insert(Key::Int(next), expression);
                }
            }
        }
    }

    // ============== Tables ==============

    /// Replace the FROM tables. Each may declare an alias (`"users u"`).
    pub fn from(&self, tables: impl Into<TableList>) -> QueryResult<Self> {
        let mut next = self.clone();
        if !next.tables.is_empty() {
            info!(previous = next.tables.len(), "Overwriting the FROM tables");
            next.tables.clear();
        }
        for table in tables.into().0 {
            next.push_table(&table, None)?;
        }
        Ok(next)
    }

    /// Add an `INNER JOIN`.
    pub fn inner_join(&self, table: &str, on: &str) -> QueryResult<Self> {
        self.join(JoinKind::Inner, table, on)
    }

    /// Add a `LEFT JOIN`.
    pub fn left_join(&self, table: &str, on: &str) -> QueryResult<Self> {
        self.join(JoinKind::Left, table, on)
    }

    /// Add a `RIGHT JOIN`.
    pub fn right_join(&self, table: &str, on: &str) -> QueryResult<Self> {
        self.join(JoinKind::Right, table, on)
    }

    /// Add an `OUTER JOIN`.
    pub fn outer_join(&self, table: &str, on: &str) -> QueryResult<Self> {
        self.join(JoinKind::Outer, table, on)
    }

    /// Add a join of the given kind.
    pub fn join(&self, kind: JoinKind, table: &str, on: &str) -> QueryResult<Self> {
        let mut next = self.clone();
        next.push_table(
            table,
            Some(Join {
                kind,
                on: on.to_string(),
            }),
        )?;
        Ok(next)
    }

    fn push_table(&mut self, table: &str, join: Option<Join>) -> QueryResult<()> {
        let (expression, alias) = split_alias(table);
        let alias = alias.unwrap_or_else(|| expression.clone());
        if self.tables.contains_key(&alias) {
            return Err(QueryError::duplicate_alias(&alias).with_context(format!("Adding table \"{}\"", table)));
        }
        self.tables.insert(alias, TableEntry { expression, join });
        Ok(())
    }

    // ============== Restrictions ==============

    /// Replace the WHERE restriction.
    pub fn where_(&self, restriction: impl Into<Restriction>) -> Self {
        let mut next = self.clone();
        if next.where_clause.is_some() {
            info!("Overwriting the WHERE restriction");
        }
        next.where_clause = Some(restriction.into());
        next
    }

    /// Extend the WHERE restriction with AND.
    pub fn and_where(&self, restriction: impl Into<Restriction>) -> Self {
        self.extend_where(LogicalOperator::And, restriction.into())
    }

    /// Extend the WHERE restriction with OR.
    pub fn or_where(&self, restriction: impl Into<Restriction>) -> Self {
        self.extend_where(LogicalOperator::Or, restriction.into())
    }

    fn extend_where(&self, operator: LogicalOperator, restriction: Restriction) -> Self {
        let mut next = self.clone();
        next.where_clause = Some(Restriction::extend(next.where_clause.take(), operator, restriction));
        next
    }

    /// Replace the HAVING restriction.
    pub fn having(&self, restriction: impl Into<Restriction>) -> Self {
        let mut next = self.clone();
        if next.having_clause.is_some() {
            info!("Overwriting the HAVING restriction");
        }
        next.having_clause = Some(restriction.into());
        next
    }

    /// Extend the HAVING restriction with AND.
    pub fn and_having(&self, restriction: impl Into<Restriction>) -> Self {
        self.extend_having(LogicalOperator::And, restriction.into())
    }

    /// Extend the HAVING restriction with OR.
    pub fn or_having(&self, restriction: impl Into<Restriction>) -> Self {
        self.extend_having(LogicalOperator::Or, restriction.into())
    }

    fn extend_having(&self, operator: LogicalOperator, restriction: Restriction) -> Self {
        let mut next = self.clone();
        next.having_clause = Some(Restriction::extend(next.having_clause.take(), operator, restriction));
        next
    }

    // ============== Grouping, ordering, paging ==============

    /// Append a GROUP BY column.
    pub fn group_by(&self, column: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.group_by.push(column.into());
        next
    }

    /// Order by exactly this column, replacing any previous ordering.
    pub fn order_by(&self, column: impl Into<String>, direction: Direction) -> Self {
        let mut next = self.clone();
        next.order_by.clear();
        next.order_by.insert(column.into(), direction);
        next
    }

    /// `limit(n, None)` sets the limit; `limit(offset, Some(n))` sets both.
    pub fn limit(&self, offset_or_limit: u64, limit: Option<u64>) -> Self {
        let mut next = self.clone();
        match limit {
            Some(limit) => {
                next.offset = Some(offset_or_limit);
                next.limit = Some(limit);
            }
            None => next.limit = Some(offset_or_limit),
        }
        next
    }

    // ============== Accessors ==============

    /// The selected columns, keyed by alias (integer keys for unaliased columns).
    pub fn columns(&self) -> &IndexMap<Key, String> {
        &self.columns
    }

    /// The tables, keyed by alias.
    pub fn tables(&self) -> &IndexMap<String, TableEntry> {
        &self.tables
    }

    /// The WHERE restriction.
    pub fn where_restriction(&self) -> Option<&Restriction> {
        self.where_clause.as_ref()
    }

    /// The HAVING restriction.
    pub fn having_restriction(&self) -> Option<&Restriction> {
        self.having_clause.as_ref()
    }

    /// The ORDER BY columns.
    pub fn order(&self) -> &IndexMap<String, Direction> {
        &self.order_by
    }

    /// The limit and offset.
    pub fn paging(&self) -> (Option<u64>, Option<u64>) {
        (self.limit, self.offset)
    }

    // ============== Composition ==============

    /// Render the statement.
    pub fn compose(&self) -> QueryResult<String> {
        if self.columns.is_empty() {
            return Err(QueryError::invalid_query("Can't compose a SELECT without columns")
                .with_code_suggestion("Select at least one column", "SqlBuilder::new().select(\"*\")"));
        }
        if self.tables.is_empty() {
            return Err(QueryError::invalid_query("Can't compose a SELECT without tables")
                .with_code_suggestion("Add a table", "builder.from(\"users\")?"));
        }

        let mut sql = String::with_capacity(64);
        sql.push_str("SELECT ");
        let columns: Vec<String> = self
            .columns
            .iter()
            .map(|(key, expression)| match key {
                Key::Str(alias) if alias != expression => format!("{} AS {}", expression, alias),
                _ => expression.clone(),
            })
            .collect();
        sql.push_str(&columns.join(", "));

        sql.push_str(" FROM ");
        for (index, (alias, table)) in self.tables.iter().enumerate() {
            let expression = if *alias == table.expression {
                table.expression.clone()
            } else {
                format!("{} AS {}", table.expression, alias)
            };
            match (&table.join, index) {
                (_, 0) => sql.push_str(&expression),
                (Some(join), _) => {
                    sql.push(' ');
                    sql.push_str(join.kind.as_sql());
                    sql.push(' ');
                    sql.push_str(&expression);
                    sql.push_str(" ON (");
                    sql.push_str(&join.on);
                    sql.push(')');
                }
                (None, _) => {
                    sql.push_str(", ");
                    sql.push_str(&expression);
                }
            }
        }

        if let Some(restriction) = &self.where_clause {
            let composed = restriction.compose()?;
            if !composed.is_empty() {
                sql.push_str(" WHERE ");
                sql.push_str(&composed);
            }
        }

        if !self.group_by.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&self.group_by.join(", "));
        }

        if let Some(restriction) = &self.having_clause {
            let composed = restriction.compose()?;
            if !composed.is_empty() {
                sql.push_str(" HAVING ");
                sql.push_str(&composed);
            }
        }

        if !self.order_by.is_empty() {
            let order: Vec<String> = self
                .order_by
                .iter()
                .map(|(column, direction)| match direction.as_sql() {
                    Some(keyword) => format!("{} {}", column, keyword),
                    None => column.clone(),
                })
                .collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&order.join(", "));
        }

        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
            if let Some(offset) = self.offset {
                sql.push_str(&format!(" OFFSET {}", offset));
            }
        }

        Ok(sql)
    }
}

impl fmt::Display for SqlBuilder {
    /// Writes the composed SQL, or a `/* ... */` comment when it can't be composed.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.compose() {
            Ok(sql) => f.write_str(&sql),
            Err(err) => write!(f, "/* {} */", err),
        }
    }
}
