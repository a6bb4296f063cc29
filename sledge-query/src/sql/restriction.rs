//! Boolean restriction trees for WHERE and HAVING clauses.

use std::fmt;
use std::str::FromStr;

use crate::error::{QueryError, QueryResult};

/// Operator of a restriction group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalOperator {
    /// `a AND b`
    And,
    /// `a OR b`
    Or,
    /// `a XOR b`
    Xor,
    /// `column IN (a, b)`
    In,
    /// `column NOT IN (a, b)`
    NotIn,
}

impl LogicalOperator {
    /// The SQL keyword.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
            Self::Xor => "XOR",
            Self::In => "IN",
            Self::NotIn => "NOT IN",
        }
    }

    /// Check if this operator needs a column.
    pub const fn is_list(&self) -> bool {
        matches!(self, Self::In | Self::NotIn)
    }
}

impl fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogicalOperator {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ");
        match normalized.to_ascii_uppercase().as_str() {
            "AND" => Ok(Self::And),
            "OR" => Ok(Self::Or),
            "XOR" => Ok(Self::Xor),
            "IN" => Ok(Self::In),
            "NOT IN" => Ok(Self::NotIn),
            _ => Err(QueryError::invalid_restriction(format!(
                "Unknown restriction operator \"{}\"",
                s
            ))
            .with_suggestion("Use one of: AND, OR, XOR, IN, NOT IN")),
        }
    }
}

/// A WHERE/HAVING condition: a literal SQL fragment or a group of restrictions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Restriction {
    /// Literal SQL.
    Clause(String),
    /// Children joined by `operator`; `IN`/`NOT IN` groups also name a column.
    Group {
        /// How the children are joined.
        operator: LogicalOperator,
        /// Column tested by `IN`/`NOT IN`.
        column: Option<String>,
        /// The children.
        children: Vec<Restriction>,
    },
}

impl Restriction {
    /// A literal SQL fragment.
    pub fn clause(sql: impl Into<String>) -> Self {
        Self::Clause(sql.into())
    }

    /// A group with the given operator.
    pub fn group(operator: LogicalOperator, children: impl IntoIterator<Item = Restriction>) -> Self {
        Self::Group {
            operator,
            column: None,
            children: children.into_iter().collect(),
        }
    }

    /// `a AND b AND ...`
    pub fn and(children: impl IntoIterator<Item = Restriction>) -> Self {
        Self::group(LogicalOperator::And, children)
    }

    /// `a OR b OR ...`
    pub fn or(children: impl IntoIterator<Item = Restriction>) -> Self {
        Self::group(LogicalOperator::Or, children)
    }

    /// `column IN (a, b, ...)` over already quoted values.
    pub fn in_list<I, S>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::list(LogicalOperator::In, column, values)
    }

    /// `column NOT IN (a, b, ...)` over already quoted values.
    pub fn not_in_list<I, S>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::list(LogicalOperator::NotIn, column, values)
    }

    fn list<I, S>(operator: LogicalOperator, column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Group {
            operator,
            column: Some(column.into()),
            children: values.into_iter().map(|v| Self::Clause(v.into())).collect(),
        }
    }

    /// The group operator, if this is a group.
    pub fn operator(&self) -> Option<LogicalOperator> {
        match self {
            Self::Clause(_) => None,
            Self::Group { operator, .. } => Some(*operator),
        }
    }

    /// Append `clause` with `operator`.
    ///
    /// A group already using `operator` gains a child; anything else becomes the
    /// first child of a new group.
    pub(crate) fn extend(root: Option<Restriction>, operator: LogicalOperator, clause: Restriction) -> Self {
        match root {
            None => Self::group(operator, [clause]),
            Some(Self::Group {
                operator: current,
                column: None,
                mut children,
            }) if current == operator => {
                children.push(clause);
                Self::Group {
                    operator,
                    column: None,
                    children,
                }
            }
            Some(other) => Self::group(operator, [other, clause]),
        }
    }

    /// Render to SQL. An empty group renders as an empty string.
    pub fn compose(&self) -> QueryResult<String> {
        let (operator, column, children) = match self {
            Self::Clause(sql) => return Ok(sql.clone()),
            Self::Group {
                operator,
                column,
                children,
            } => (*operator, column, children),
        };

        let mut composed = Vec::with_capacity(children.len());
        for child in children {
            let sql = child.compose()?;
            if !sql.is_empty() {
                composed.push((child.operator(), sql));
            }
        }

        // A lone child needs no parentheses, whatever its operator.
        let single = composed.len() == 1;
        let parts: Vec<String> = composed
            .into_iter()
            .map(|(child_operator, sql)| match child_operator {
                Some(child_operator) if child_operator != operator && !single => {
                    format!("({})", sql)
                }
                _ => sql,
            })
            .collect();

        if operator.is_list() {
            let column = column.as_deref().ok_or_else(|| {
                QueryError::invalid_restriction(format!(
                    "The {} restriction requires a column",
                    operator
                ))
            })?;
            if parts.is_empty() {
                return Ok(String::new());
            }
            return Ok(format!("{} {} ({})", column, operator, parts.join(", ")));
        }

        Ok(parts.join(&format!(" {} ", operator)))
    }
}

impl From<&str> for Restriction {
    fn from(sql: &str) -> Self {
        Self::Clause(sql.to_string())
    }
}

impl From<String> for Restriction {
    fn from(sql: String) -> Self {
        Self::Clause(sql)
    }
}
