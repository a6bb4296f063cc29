//! Identifier and literal quoting.

use crate::value::Value;

const RESERVED: &[&str] = &[
    "user", "order", "group", "select", "from", "where", "table", "index", "key", "primary",
    "foreign", "check", "default", "null", "not", "and", "or", "xor", "in", "is", "like",
    "between", "case", "when", "then", "else", "end", "as", "on", "join", "left", "right",
    "inner", "outer", "cross", "natural", "using", "limit", "offset", "union", "intersect",
    "except", "all", "distinct", "having", "create", "alter", "drop", "insert", "update",
    "delete", "into", "values", "set", "returning", "asc", "desc", "by",
];

/// Check if a word is a reserved SQL keyword.
pub fn is_reserved(word: &str) -> bool {
    RESERVED.contains(&word.to_ascii_lowercase().as_str())
}

/// Wrap an identifier in `quote`, doubling embedded quote characters.
pub fn escape_identifier(name: &str, quote: char) -> String {
    let doubled: String = [quote, quote].iter().collect();
    let escaped = name.replace(quote, &doubled);
    format!("{quote}{escaped}{quote}")
}

/// Check if an identifier needs quoting.
pub fn needs_quoting(name: &str) -> bool {
    if name.is_empty() || is_reserved(name) {
        return true;
    }
    name.starts_with(|c: char| c.is_ascii_digit())
        || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Quote an identifier with double quotes when needed.
pub fn quote_identifier(name: &str) -> String {
    if needs_quoting(name) {
        escape_identifier(name, '"')
    } else {
        name.to_string()
    }
}

/// Render a value as a standard SQL literal.
///
/// `Null` becomes `NULL`; every other value is rendered as a string literal with
/// single quotes doubled.
pub fn quote_literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        other => format!("'{}'", other.to_php_string().replace('\'', "''")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("name"), "name");
        assert_eq!(quote_identifier("order"), "\"order\"");
        assert_eq!(quote_identifier("first name"), "\"first name\"");
        assert_eq!(quote_identifier("1st"), "\"1st\"");
        assert_eq!(escape_identifier("we`ird", '`'), "`we``ird`");
    }

    #[test]
    fn test_quote_literal() {
        assert_eq!(quote_literal(&Value::Null), "NULL");
        assert_eq!(quote_literal(&"O'Brien".into()), "'O''Brien'");
        assert_eq!(quote_literal(&42.into()), "'42'");
        assert_eq!(quote_literal(&true.into()), "'1'");
    }
}
