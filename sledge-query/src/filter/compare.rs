//! Comparison operators and loose equality.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use parking_lot::Mutex;
use regex_lite::Regex;

use crate::error::{QueryError, QueryResult};
use crate::value::{Value, parse_numeric};

/// A comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `==` (uses [`equals`])
    Equal,
    /// `!=`
    NotEqual,
    /// `<`
    Less,
    /// `<=`
    LessOrEqual,
    /// `>`
    Greater,
    /// `>=`
    GreaterOrEqual,
    /// `IN`
    In,
    /// `NOT IN`
    NotIn,
    /// `LIKE`
    Like,
    /// `NOT LIKE`
    NotLike,
}

impl Operator {
    /// All operators, longest spelling first.
    pub const ALL: [Operator; 10] = [
        Operator::NotLike,
        Operator::NotIn,
        Operator::Like,
        Operator::In,
        Operator::Equal,
        Operator::NotEqual,
        Operator::LessOrEqual,
        Operator::GreaterOrEqual,
        Operator::Less,
        Operator::Greater,
    ];

    /// The operator as written in conditions.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::Less => "<",
            Self::LessOrEqual => "<=",
            Self::Greater => ">",
            Self::GreaterOrEqual => ">=",
            Self::In => "IN",
            Self::NotIn => "NOT IN",
            Self::Like => "LIKE",
            Self::NotLike => "NOT LIKE",
        }
    }

    /// The operator as written in SQL.
    pub const fn as_sql(&self) -> &'static str {
        match self {
            Self::Equal => "=",
            other => other.as_str(),
        }
    }

    /// Check if this is one of the ordering operators.
    pub const fn is_ordering(&self) -> bool {
        matches!(
            self,
            Self::Less | Self::LessOrEqual | Self::Greater | Self::GreaterOrEqual
        )
    }

    /// Regex alternation matching every operator.
    pub(crate) fn pattern() -> &'static str {
        "NOT LIKE|NOT IN|LIKE|IN|==|!=|<=|>=|<|>"
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| QueryError::unknown_operator(s))
    }
}

/// Compare `value` against `expectation`.
///
/// ```rust
/// use sledge_query::filter::{compare, Operator};
/// use sledge_query::Value;
///
/// assert!(compare(&"abc".into(), Operator::Like, &"a%".into()).unwrap());
/// assert!(!compare(&"abc".into(), Operator::Like, &r"a\%".into()).unwrap());
/// assert!(compare(&0.into(), Operator::Equal, &false.into()).unwrap());
/// assert!(!compare(&"".into(), Operator::Equal, &0.into()).unwrap());
/// ```
pub fn compare(value: &Value, operator: Operator, expectation: &Value) -> QueryResult<bool> {
    Ok(match operator {
        Operator::Equal => equals(value, expectation),
        Operator::NotEqual => !equals(value, expectation),
        Operator::Less => value.loose_cmp(expectation).is_lt(),
        Operator::LessOrEqual => value.loose_cmp(expectation).is_le(),
        Operator::Greater => value.loose_cmp(expectation).is_gt(),
        Operator::GreaterOrEqual => value.loose_cmp(expectation).is_ge(),
        Operator::In => contains(expectation, value, operator)?,
        Operator::NotIn => !contains(expectation, value, operator)?,
        Operator::Like => like(value, expectation)?,
        Operator::NotLike => !like(value, expectation)?,
    })
}

fn contains(haystack: &Value, needle: &Value, operator: Operator) -> QueryResult<bool> {
    match haystack {
        Value::Array(list) => Ok(list.values().any(|candidate| equals(needle, candidate))),
        other => Err(QueryError::invalid_filter(format!(
            "The {} operator requires a list, got {}",
            operator,
            other.type_name()
        ))),
    }
}

fn like(value: &Value, pattern: &Value) -> QueryResult<bool> {
    if matches!(value, Value::Array(_) | Value::Object(_)) {
        return Ok(false);
    }
    let pattern = match pattern {
        Value::Array(_) | Value::Object(_) => {
            return Err(QueryError::invalid_filter(format!(
                "LIKE expects a string pattern, got {}",
                pattern.type_name()
            )));
        }
        other => other.to_php_string(),
    };
    Ok(like_regex(&pattern)?.is_match(&value.to_php_string()))
}

fn like_regex(pattern: &str) -> QueryResult<Regex> {
    static CACHE: OnceLock<Mutex<HashMap<String, Regex>>> = OnceLock::new();
    let cache = CACHE.get_or_init(|| Mutex::new(HashMap::new()));

    if let Some(regex) = cache.lock().get(pattern) {
        return Ok(regex.clone());
    }

    let mut source = String::with_capacity(pattern.len() + 8);
    source.push_str("(?is)^");
    let mut chars = pattern.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '%' => source.push_str(".*"),
            '_' => source.push('.'),
            '\\' => {
                let literal = chars.next().unwrap_or('\\');
                source.push_str(&regex_lite::escape(literal.encode_utf8(&mut [0; 4])));
            }
            other => source.push_str(&regex_lite::escape(other.encode_utf8(&mut [0; 4]))),
        }
    }
    source.push('$');

    let regex = Regex::new(&source).map_err(|e| {
        QueryError::invalid_filter(format!("Invalid LIKE pattern \"{}\"", pattern)).with_source(e)
    })?;
    cache.lock().insert(pattern.to_string(), regex.clone());
    Ok(regex)
}

/// Loose equality used by conditions.
///
/// Unlike host-language `==`, a non-numeric string never equals a number
/// (`"" != 0`), while booleans compare as `0/1` against numbers.
pub fn equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Bool(flag), other) | (other, Value::Bool(flag)) => {
            let flag = if *flag { 1.0 } else { 0.0 };
            match other {
                Value::Int(_) | Value::Float(_) | Value::String(_) => {
                    other.as_number() == Some(flag)
                }
                _ => false,
            }
        }
        (Value::String(x), Value::String(y)) => x == y,
        (Value::String(s), number @ (Value::Int(_) | Value::Float(_)))
        | (number @ (Value::Int(_) | Value::Float(_)), Value::String(s)) => {
            match parse_numeric(s) {
                Some(parsed) => number.as_number() == Some(parsed),
                None => false,
            }
        }
        (Value::Int(x), Value::Int(y)) => x == y,
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            a.as_number() == b.as_number()
        }
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len()
                && x
                    .iter()
                    .all(|(key, value)| y.get(key).is_some_and(|other| equals(value, other)))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.class() == y.class()
                && x.properties().count() == y.properties().count()
                && x
                    .properties()
                    .all(|(name, value)| y.get(name).is_some_and(|other| equals(value, other)))
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::list;

    #[test]
    fn test_operator_round_trip() {
        for op in Operator::ALL {
            assert_eq!(op.as_str().parse::<Operator>().unwrap(), op);
        }
        assert!("=~".parse::<Operator>().is_err());
        assert_eq!(Operator::Equal.as_sql(), "=");
    }

    #[test]
    fn test_equals_special_cases() {
        assert!(equals(&0.into(), &false.into()));
        assert!(equals(&1.into(), &true.into()));
        assert!(equals(&"1".into(), &true.into()));
        assert!(!equals(&"".into(), &0.into()));
        assert!(!equals(&"abc".into(), &0.into()));
        assert!(equals(&"10".into(), &10.into()));
        assert!(equals(&"1e1".into(), &10.into()));
        assert!(!equals(&"10".into(), &"1e1".into()));
        assert!(equals(&2.into(), &2.0.into()));
        assert!(!equals(&Value::Null, &0.into()));
        assert!(!equals(&Value::Null, &false.into()));
    }

    #[test]
    fn test_equals_arrays() {
        assert!(equals(&list![1, "2"], &list!["1", 2]));
        assert!(!equals(&list![1, 2], &list![2, 1]));
    }

    #[test]
    fn test_ordering() {
        assert!(compare(&15.into(), Operator::Greater, &10.into()).unwrap());
        assert!(compare(&"9".into(), Operator::Less, &"10".into()).unwrap());
        assert!(compare(&5.into(), Operator::LessOrEqual, &5.into()).unwrap());
        assert!(!compare(&5.into(), Operator::GreaterOrEqual, &6.into()).unwrap());
    }

    #[test]
    fn test_in() {
        let list = list![2, 3];
        assert!(compare(&2.into(), Operator::In, &list).unwrap());
        assert!(compare(&"3".into(), Operator::In, &list).unwrap());
        assert!(compare(&4.into(), Operator::NotIn, &list).unwrap());
        assert!(compare(&4.into(), Operator::In, &4.into()).is_err());
    }

    #[test]
    fn test_like() {
        let abc: Value = "abc".into();
        assert!(compare(&abc, Operator::Like, &"a%".into()).unwrap());
        assert!(compare(&abc, Operator::Like, &"A_C".into()).unwrap());
        assert!(!compare(&abc, Operator::Like, &"a_".into()).unwrap());
        assert!(!compare(&abc, Operator::Like, &r"a\%".into()).unwrap());
        assert!(compare(&"a%".into(), Operator::Like, &r"a\%".into()).unwrap());
        assert!(compare(&"1+1".into(), Operator::Like, &"1+%".into()).unwrap());
        assert!(compare(&abc, Operator::NotLike, &"b%".into()).unwrap());
    }
}
