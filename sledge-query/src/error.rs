//! Error types for path evaluation, filtering, query composition and execution.
//!
//! Every fallible operation in this crate returns a [`QueryResult`]. Errors carry:
//! - An [`ErrorCode`] for programmatic handling
//! - Context about the path, SQL or operation involved
//! - Optional suggestions and help text
//!
//! # Error Codes
//!
//! Error codes follow a pattern: S{category}{number}
//! - 1xxx: Path and filter errors (invalid path, unknown operator, no match)
//! - 2xxx: Query composition errors (missing columns, duplicate alias)
//! - 3xxx: Database errors (unknown link, driver failure)
//! - 5xxx: Unsupported operations
//! - 7xxx: Configuration errors
//! - 9xxx: Internal errors
//!
//! ```rust
//! use sledge_query::{QueryError, ErrorCode};
//!
//! let err = QueryError::invalid_path("a..b", "expecting an identifier after '.'");
//! assert_eq!(err.code, ErrorCode::InvalidPath);
//! assert_eq!(err.code.code(), "S1001");
//! ```

use std::fmt;
use thiserror::Error;

/// Result type for query operations.
pub type QueryResult<T> = Result<T, QueryError>;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Path and filter errors (1xxx)
    /// Malformed property path (S1001).
    InvalidPath = 1001,
    /// Malformed condition or comparison (S1002).
    InvalidFilter = 1002,
    /// Comparison operator is not recognized (S1003).
    UnknownOperator = 1003,
    /// No element matched the conditions (S1004).
    NoMatch = 1004,
    /// A value had the wrong shape for the requested access (S1005).
    TypeMismatch = 1005,

    // Composition errors (2xxx)
    /// Query cannot be composed (S2001).
    InvalidQuery = 2001,
    /// Alias declared twice (S2002).
    DuplicateAlias = 2002,
    /// Malformed restriction tree (S2003).
    InvalidRestriction = 2003,

    // Database errors (3xxx)
    /// No database registered under the link (S3001).
    ConnectionNotFound = 3001,
    /// Opening the connection failed (S3002).
    ConnectionFailed = 3002,
    /// Statement execution failed (S3003).
    DatabaseError = 3003,

    // Unsupported (5xxx)
    /// Operation is not available on this value (S5001).
    NotSupported = 5001,

    // Configuration errors (7xxx)
    /// Invalid configuration (S7001).
    InvalidConfiguration = 7001,

    // Internal errors (9xxx)
    /// Internal error (S9001).
    Internal = 9001,
}

impl ErrorCode {
    /// Get the error code string (e.g., "S1001").
    pub fn code(&self) -> String {
        format!("S{}", *self as u16)
    }

    /// Get a short description of the error code.
    pub fn description(&self) -> &'static str {
        match self {
            Self::InvalidPath => "Invalid property path",
            Self::InvalidFilter => "Invalid filter condition",
            Self::UnknownOperator => "Unknown comparison operator",
            Self::NoMatch => "No matching element",
            Self::TypeMismatch => "Type mismatch",
            Self::InvalidQuery => "Query cannot be composed",
            Self::DuplicateAlias => "Duplicate alias",
            Self::InvalidRestriction => "Invalid restriction",
            Self::ConnectionNotFound => "Database link not found",
            Self::ConnectionFailed => "Database connection failed",
            Self::DatabaseError => "Database error",
            Self::NotSupported => "Operation not supported",
            Self::InvalidConfiguration => "Invalid configuration",
            Self::Internal => "Internal error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Suggestion for fixing an error.
#[derive(Debug, Clone)]
pub struct Suggestion {
    /// The suggestion text.
    pub text: String,
    /// Optional code example.
    pub code: Option<String>,
}

impl Suggestion {
    /// Create a new suggestion.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            code: None,
        }
    }

    /// Add a code example.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

/// Additional context for an error.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// The operation that was being performed.
    pub operation: Option<String>,
    /// The property path involved.
    pub path: Option<String>,
    /// The SQL statement (if available).
    pub sql: Option<String>,
    /// Suggestions for fixing the error.
    pub suggestions: Vec<Suggestion>,
    /// Help text.
    pub help: Option<String>,
}

/// Errors that can occur during query operations.
#[derive(Error, Debug)]
pub struct QueryError {
    /// The error code.
    pub code: ErrorCode,
    /// The error message.
    pub message: String,
    /// Additional context.
    pub context: ErrorContext,
    /// The source error (if any).
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.code(), self.message)
    }
}

impl QueryError {
    /// Create a new error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: ErrorContext::default(),
            source: None,
        }
    }

    /// Add context about the operation.
    pub fn with_context(mut self, operation: impl Into<String>) -> Self {
        self.context.operation = Some(operation.into());
        self
    }

    /// Add a suggestion for fixing the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.context.suggestions.push(Suggestion::new(suggestion));
        self
    }

    /// Add a code suggestion.
    pub fn with_code_suggestion(mut self, text: impl Into<String>, code: impl Into<String>) -> Self {
        self.context
            .suggestions
            .push(Suggestion::new(text).with_code(code));
        self
    }

    /// Add help text.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.context.help = Some(help.into());
        self
    }

    /// Set the property path.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.context.path = Some(path.into());
        self
    }

    /// Set the SQL statement.
    pub fn with_sql(mut self, sql: impl Into<String>) -> Self {
        self.context.sql = Some(sql.into());
        self
    }

    /// Set the source error.
    pub fn with_source<E: std::error::Error + Send + Sync + 'static>(mut self, source: E) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    // ============== Constructor Functions ==============

    /// Create an invalid path error.
    pub fn invalid_path(path: impl Into<String>, message: impl Into<String>) -> Self {
        let path = path.into();
        Self::new(
            ErrorCode::InvalidPath,
            format!("Invalid path \"{}\": {}", path, message.into()),
        )
        .with_path(path)
        .with_help("Paths chain identifiers with '.', '->' and '[...]', e.g. \"user->address[city]\"")
    }

    /// Create an invalid filter error.
    pub fn invalid_filter(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidFilter, message.into())
    }

    /// Create an unknown operator error.
    pub fn unknown_operator(operator: impl Into<String>) -> Self {
        let operator = operator.into();
        Self::new(
            ErrorCode::UnknownOperator,
            format!("Unknown operator \"{}\"", operator),
        )
        .with_suggestion("Use one of: ==, !=, <, <=, >, >=, IN, NOT IN, LIKE, NOT LIKE")
    }

    /// Create a no-match error.
    pub fn no_match(operation: impl Into<String>) -> Self {
        let operation = operation.into();
        Self::new(ErrorCode::NoMatch, "No matching element found")
            .with_context(operation)
            .with_suggestion("Pass allow_none = true to accept an empty result")
    }

    /// Create a type mismatch error.
    pub fn type_mismatch(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::TypeMismatch, message.into())
    }

    /// Create an invalid query error.
    pub fn invalid_query(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidQuery, message.into())
    }

    /// Create a duplicate alias error.
    pub fn duplicate_alias(alias: impl Into<String>) -> Self {
        let alias = alias.into();
        Self::new(
            ErrorCode::DuplicateAlias,
            format!("Alias \"{}\" is already in use", alias),
        )
        .with_suggestion(format!("Declare a different alias, e.g. \"table AS {}2\"", alias))
    }

    /// Create an invalid restriction error.
    pub fn invalid_restriction(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRestriction, message.into())
    }

    /// Create a connection-not-found error.
    pub fn connection_not_found(link: impl Into<String>) -> Self {
        let link = link.into();
        Self::new(
            ErrorCode::ConnectionNotFound,
            format!("No database registered for link \"{}\"", link),
        )
        .with_suggestion("Register the database with Databases::register() or add it to the configuration")
    }

    /// Create a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(
            ErrorCode::ConnectionFailed,
            format!("Connection error: {}", message),
        )
        .with_suggestion("Verify the connection URL is correct")
    }

    /// Create a general database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message.into())
    }

    /// Create a not-supported error.
    pub fn not_supported(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotSupported, message.into())
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidConfiguration, message.into())
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, format!("Internal error: {}", message.into()))
    }

    // ============== Error Checks ==============

    /// Check if this is a no-match error.
    pub fn is_no_match(&self) -> bool {
        self.code == ErrorCode::NoMatch
    }

    /// Check if this error was raised while parsing a path or filter.
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::InvalidPath | ErrorCode::InvalidFilter | ErrorCode::UnknownOperator
        )
    }

    /// Check if this is a database error.
    pub fn is_database_error(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::ConnectionNotFound | ErrorCode::ConnectionFailed | ErrorCode::DatabaseError
        )
    }

    /// Display the full error with all context and suggestions.
    pub fn display_full(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("Error [{}]: {}\n", self.code.code(), self.message));

        if let Some(ref op) = self.context.operation {
            output.push_str(&format!("  → While: {}\n", op));
        }
        if let Some(ref path) = self.context.path {
            output.push_str(&format!("  → Path: {}\n", path));
        }

        // SQL (truncated if too long)
        if let Some(ref sql) = self.context.sql {
            let sql_display = if sql.chars().count() > 200 {
                format!("{}...", sql.chars().take(200).collect::<String>())
            } else {
                sql.clone()
            };
            output.push_str(&format!("  → SQL: {}\n", sql_display));
        }

        if !self.context.suggestions.is_empty() {
            output.push_str("\nSuggestions:\n");
            for (i, suggestion) in self.context.suggestions.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, suggestion.text));
                if let Some(ref code) = suggestion.code {
                    output.push_str(&format!(
                        "     ```\n     {}\n     ```\n",
                        code.replace('\n', "\n     ")
                    ));
                }
            }
        }

        if let Some(ref help) = self.context.help {
            output.push_str(&format!("\nHelp: {}\n", help));
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_format() {
        assert_eq!(ErrorCode::InvalidPath.code(), "S1001");
        assert_eq!(ErrorCode::InvalidQuery.code(), "S2001");
        assert_eq!(ErrorCode::ConnectionNotFound.code(), "S3001");
        assert_eq!(ErrorCode::NotSupported.to_string(), "S5001");
    }

    #[test]
    fn test_invalid_path_error() {
        let err = QueryError::invalid_path("a[b", "unmatched '['");
        assert!(err.is_parse_error());
        assert!(err.message.contains("a[b"));
        assert_eq!(err.context.path.as_deref(), Some("a[b"));
    }

    #[test]
    fn test_no_match_error() {
        let err = QueryError::no_match("find");
        assert!(err.is_no_match());
        assert_eq!(err.context.operation.as_deref(), Some("find"));
        assert!(!err.context.suggestions.is_empty());
    }

    #[test]
    fn test_database_error_with_sql() {
        let err = QueryError::database("no such table: users").with_sql("SELECT * FROM users");
        assert!(err.is_database_error());
        assert_eq!(err.context.sql.as_deref(), Some("SELECT * FROM users"));
        assert_eq!(err.to_string(), "[S3003] no such table: users");
    }

    #[test]
    fn test_display_full() {
        let err = QueryError::duplicate_alias("u").with_context("Adding table");
        let output = err.display_full();
        assert!(output.contains("S2002"));
        assert!(output.contains("Adding table"));
        assert!(output.contains("Suggestions"));
    }

    #[test]
    fn test_display_full_shows_help_and_code() {
        let err = QueryError::invalid_query("No columns")
            .with_code_suggestion("Select at least one column", "builder.select(\"*\")")
            .with_help("Compose needs columns and tables");
        let output = err.display_full();
        assert!(output.contains("builder.select(\"*\")"));
        assert!(output.contains("Help: Compose needs columns and tables"));
        assert_eq!(err.code.description(), "Query cannot be composed");
    }

    #[test]
    fn test_display_full_truncates_sql() {
        let sql = format!("SELECT {} FROM t", "x, ".repeat(100));
        let output = QueryError::database("boom").with_sql(sql).display_full();
        assert!(output.contains("..."));
    }
}
