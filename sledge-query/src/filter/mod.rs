//! Condition specs compiled into element predicates.
//!
//! Conditions come in three shapes:
//!
//! - a predicate closure over `(item, key)`;
//! - an expression such as `"> 5"` or `"apple"` compared against the element itself
//!   (a bare value means `==`);
//! - a condition map of `"path[ operator]" => expectation` entries joined with AND or
//!   OR, e.g. `{"price >": 10, "qty": 0}`.
//!
//! ```rust
//! use sledge_query::filter::{Conditions, Filter};
//! use sledge_query::{array, Key};
//!
//! let filter = Filter::build(&Conditions::all([("price >", 10), ("qty", 0)])).unwrap();
//!
//! let cheap = array! { "price" => 5, "qty" => 0 };
//! let pricey = array! { "price" => 15, "qty" => 0 };
//! assert!(!filter.matches(&cheap, &Key::Int(0)).unwrap());
//! assert!(filter.matches(&pricey, &Key::Int(1)).unwrap());
//! ```

mod compare;

use std::fmt;
use std::rc::Rc;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};

use regex_lite::Regex;
use tracing::info;

pub use compare::{Operator, compare, equals};

use crate::error::{QueryError, QueryResult};
use crate::path::PathExpression;
use crate::value::{Array, Key, Value};

/// Predicate over an element and its key.
pub type Predicate = Rc<dyn Fn(&Value, &Key) -> bool>;

/// How the entries of a condition map are joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Logical {
    /// Every entry must match.
    #[default]
    And,
    /// Any entry may match.
    Or,
}

impl Logical {
    /// The keyword.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }
}

impl FromStr for Logical {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "AND" => Ok(Self::And),
            "OR" => Ok(Self::Or),
            _ => Err(QueryError::invalid_filter(format!(
                "Unknown logical operator \"{}\", expecting AND or OR",
                s
            ))),
        }
    }
}

/// An ordered set of `"path[ operator]" => expectation` entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConditionMap {
    logical: Option<Logical>,
    entries: Vec<(String, Value)>,
}

impl ConditionMap {
    /// Create an empty map without an explicit logical operator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the logical operator.
    pub fn with_logical(mut self, logical: Logical) -> Self {
        self.logical = Some(logical);
        self
    }

    /// Add an entry.
    pub fn with(mut self, key: impl Into<String>, expectation: impl Into<Value>) -> Self {
        self.entries.push((key.into(), expectation.into()));
        self
    }

    /// The explicit logical operator, if any.
    pub fn logical(&self) -> Option<Logical> {
        self.logical
    }

    /// The logical operator to apply: the explicit one, otherwise `AND`.
    ///
    /// Falling back on a map with several entries emits an `info!` notice.
    pub fn effective_logical(&self) -> Logical {
        match self.logical {
            Some(logical) => logical,
            None => {
                if self.entries.len() > 1 {
                    info!(
                        conditions = self.entries.len(),
                        "Conditions with multiple entries should start with \"AND\" or \"OR\", assuming \"AND\""
                    );
                }
                Logical::And
            }
        }
    }

    /// The entries in order.
    pub fn entries(&self) -> &[(String, Value)] {
        &self.entries
    }

    /// Check if the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<Array> for ConditionMap {
    /// Read a condition map, taking a leading `"AND"`/`"OR"` at key `0` as the
    /// logical operator.
    fn from(array: Array) -> Self {
        let mut map = ConditionMap::new();
        for (key, value) in array {
            if key == Key::Int(0) {
                if let Some(logical) = value.as_str().and_then(|s| s.parse::<Logical>().ok()) {
                    map.logical = Some(logical);
                    continue;
                }
            }
            map.entries.push((key.to_string(), value));
        }
        map
    }
}

/// Conditions accepted by `where`, `find`, `remove` and `index_of`.
#[derive(Clone)]
pub enum Conditions {
    /// A closure over `(item, key)`.
    Predicate(Predicate),
    /// A value, optionally prefixed by an operator, compared against each element.
    Expression(Value),
    /// A condition map.
    Map(ConditionMap),
}

impl Conditions {
    /// Wrap a closure.
    pub fn predicate<F>(predicate: F) -> Self
    where
        F: Fn(&Value, &Key) -> bool + 'static,
    {
        Self::Predicate(Rc::new(predicate))
    }

    /// Compare each element against an expression.
    pub fn expression(expression: impl Into<Value>) -> Self {
        Self::Expression(expression.into())
    }

    /// Require every entry to match.
    pub fn all<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self::Map(Self::entries(entries).with_logical(Logical::And))
    }

    /// Require any entry to match.
    pub fn any<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self::Map(Self::entries(entries).with_logical(Logical::Or))
    }

    fn entries<I, K, V>(entries: I) -> ConditionMap
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        entries
            .into_iter()
            .fold(ConditionMap::new(), |map, (k, v)| map.with(k, v))
    }

    /// Check if these are closure conditions.
    pub fn is_predicate(&self) -> bool {
        matches!(self, Self::Predicate(_))
    }
}

impl fmt::Debug for Conditions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Predicate(_) => f.write_str("Predicate(<closure>)"),
            Self::Expression(value) => f.debug_tuple("Expression").field(value).finish(),
            Self::Map(map) => f.debug_tuple("Map").field(map).finish(),
        }
    }
}

impl From<ConditionMap> for Conditions {
    fn from(map: ConditionMap) -> Self {
        Self::Map(map)
    }
}

impl From<Array> for Conditions {
    fn from(array: Array) -> Self {
        Self::Map(array.into())
    }
}

impl From<Value> for Conditions {
    fn from(value: Value) -> Self {
        match value {
            Value::Array(array) => Self::Map(array.into()),
            other => Self::Expression(other),
        }
    }
}

impl From<&str> for Conditions {
    fn from(expression: &str) -> Self {
        Self::Expression(expression.into())
    }
}

impl From<String> for Conditions {
    fn from(expression: String) -> Self {
        Self::Expression(expression.into())
    }
}

impl From<i64> for Conditions {
    fn from(expression: i64) -> Self {
        Self::Expression(expression.into())
    }
}

impl From<i32> for Conditions {
    fn from(expression: i32) -> Self {
        Self::Expression(expression.into())
    }
}

fn expression_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r"(?s)^({}) (.*)$", Operator::pattern()))
            .expect("operator pattern is a valid regex")
    })
}

fn key_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r"(?s)^(.*?) ({})$", Operator::pattern()))
            .expect("operator pattern is a valid regex")
    })
}

/// Split `"> 5"` into the operator and the expectation.
///
/// A value without a leading operator is compared with `==`.
pub fn parse_expression(expression: &Value) -> QueryResult<(Operator, Value)> {
    if let Value::String(text) = expression {
        if let Some(caps) = expression_regex().captures(text) {
            let operator = caps[1].parse::<Operator>()?;
            return Ok((operator, Value::String(caps[2].to_string())));
        }
    }
    Ok((Operator::Equal, expression.clone()))
}

/// Split `"price >="` into the path and the operator.
///
/// A key without a trailing operator is an equality test.
pub fn parse_key(key: &str) -> QueryResult<(String, Operator)> {
    match key_regex().captures(key) {
        Some(caps) => Ok((caps[1].to_string(), caps[2].parse::<Operator>()?)),
        None => Ok((key.to_string(), Operator::Equal)),
    }
}

/// One compiled entry of a condition map.
#[derive(Debug, Clone)]
pub struct Clause {
    /// The path evaluated against each element.
    pub path: Arc<PathExpression>,
    /// The comparison.
    pub operator: Operator,
    /// The value compared against.
    pub expectation: Value,
}

impl Clause {
    /// Compile a `"path[ operator]" => expectation` entry.
    pub fn parse(key: &str, expectation: Value) -> QueryResult<Self> {
        let (path, operator) = parse_key(key)?;
        Ok(Self {
            path: PathExpression::parse(&path)?,
            operator,
            expectation,
        })
    }

    /// Evaluate against one element.
    pub fn matches(&self, item: &Value) -> QueryResult<bool> {
        compare(&self.path.get(item), self.operator, &self.expectation)
    }
}

#[derive(Clone)]
enum FilterKind {
    Predicate(Predicate),
    Compare {
        operator: Operator,
        expectation: Value,
    },
    Clauses {
        logical: Logical,
        clauses: Vec<Clause>,
    },
}

/// A compiled condition.
#[derive(Clone)]
pub struct Filter {
    kind: FilterKind,
}

impl Filter {
    /// Compile conditions.
    ///
    /// Unknown operators and malformed paths are reported here, before any element is
    /// visited.
    pub fn build(conditions: &Conditions) -> QueryResult<Self> {
        let kind = match conditions {
            Conditions::Predicate(predicate) => FilterKind::Predicate(Rc::clone(predicate)),
            Conditions::Expression(expression) => {
                let (operator, expectation) = parse_expression(expression)?;
                FilterKind::Compare {
                    operator,
                    expectation,
                }
            }
            Conditions::Map(map) => {
                let logical = map.effective_logical();
                let clauses = map
                    .entries
                    .iter()
                    .map(|(key, expectation)| Clause::parse(key, expectation.clone()))
                    .collect::<QueryResult<Vec<_>>>()?;
                FilterKind::Clauses { logical, clauses }
            }
        };
        Ok(Self { kind })
    }

    /// Check a single element.
    pub fn matches(&self, item: &Value, key: &Key) -> QueryResult<bool> {
        match &self.kind {
            FilterKind::Predicate(predicate) => Ok(predicate(item, key)),
            FilterKind::Compare {
                operator,
                expectation,
            } => compare(item, *operator, expectation),
            FilterKind::Clauses { logical, clauses } => match logical {
                Logical::And => {
                    for clause in clauses {
                        if !clause.matches(item)? {
                            return Ok(false);
                        }
                    }
                    Ok(true)
                }
                Logical::Or => {
                    for clause in clauses {
                        if clause.matches(item)? {
                            return Ok(true);
                        }
                    }
                    Ok(false)
                }
            },
        }
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            FilterKind::Predicate(_) => f.write_str("Filter::Predicate"),
            FilterKind::Compare {
                operator,
                expectation,
            } => write!(f, "Filter::Compare({} {:?})", operator, expectation),
            FilterKind::Clauses { logical, clauses } => f
                .debug_struct("Filter::Clauses")
                .field("logical", logical)
                .field("clauses", clauses)
                .finish(),
        }
    }
}

/// Compile conditions into a [`Filter`].
pub fn build_filter(conditions: impl Into<Conditions>) -> QueryResult<Filter> {
    Filter::build(&conditions.into())
}
