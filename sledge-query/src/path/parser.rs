//! Recursive-descent parser turning path tokens into steps.

use smallvec::SmallVec;
use tracing::info;

use super::Step;
use super::tokenizer::{Token, TokenKind, tokenize};
use crate::error::{QueryError, QueryResult};

/// Steps of a parsed path. Most paths are one to four steps long.
pub type Steps = SmallVec<[Step; 4]>;

/// Which access a name introduces, before `()` or `?` are taken into account.
#[derive(Clone, Copy)]
enum Access {
    Any,
    Property,
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos).map(|t| &t.kind)
    }

    fn error(&self, message: impl Into<String>) -> QueryError {
        QueryError::invalid_path(self.source, message)
    }

    fn expect_identifier(&mut self, after: &str) -> QueryResult<String> {
        match self.peek() {
            Some(TokenKind::Identifier(name)) => {
                let name = name.clone();
                self.pos += 1;
                Ok(name)
            }
            _ => Err(self.error(format!("expecting an identifier after '{}'", after))),
        }
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek() == Some(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// A name followed by an optional `()` or `?`.
    fn access(&mut self, name: String, access: Access) -> Step {
        if self.eat(&TokenKind::Parentheses) {
            return Step::MethodCall(name);
        }
        let optional = self.eat(&TokenKind::Optional);
        match (access, optional) {
            (Access::Any, false) => Step::Any(name),
            (Access::Any, true) => Step::OptionalAny(name),
            (Access::Property, false) => Step::Property(name),
            (Access::Property, true) => Step::OptionalProperty(name),
        }
    }

    fn parse(mut self) -> QueryResult<Steps> {
        if self.tokens.is_empty() {
            return Err(self.error("path is empty"));
        }
        let mut steps = Steps::new();

        while let Some(token) = self.tokens.get(self.pos) {
            let (kind, end) = (token.kind.clone(), token.end);
            let first = self.pos == 0;
            self.pos += 1;

            match kind {
                TokenKind::Identifier(name) => {
                    if !first {
                        return Err(self.error(format!(
                            "invalid chain, expecting a '.', '->' or '[' before \"{}\"",
                            name
                        )));
                    }
                    steps.push(self.access(name, Access::Any));
                }
                TokenKind::Dot => {
                    if self.tokens.len() == 1 {
                        steps.push(Step::SelfReference);
                        continue;
                    }
                    let name = self.expect_identifier(".")?;
                    steps.push(self.access(name, Access::Any));
                }
                TokenKind::Arrow => {
                    let name = self.expect_identifier("->")?;
                    if !is_identifier(&name) {
                        info!(path = %self.source, property = %name, "Invalid property name");
                    }
                    steps.push(self.access(name, Access::Property));
                }
                TokenKind::BracketOpen => {
                    let name = self.expect_identifier("[")?;
                    let optional = self.eat(&TokenKind::Optional);
                    if !self.eat(&TokenKind::BracketClose) {
                        return Err(self.error("unmatched '[', expecting ']'"));
                    }
                    steps.push(if optional {
                        Step::OptionalElement(name)
                    } else {
                        Step::Element(name)
                    });
                }
                TokenKind::AllElements => {
                    let rest = &self.source[end..];
                    let rest = rest.strip_prefix('.').unwrap_or(rest);
                    let subpath = if rest.is_empty() { "." } else { rest };
                    // Validate the remainder now so evaluation never meets a parse error.
                    super::PathExpression::parse(subpath)?;
                    steps.push(Step::SubPath(subpath.to_string()));
                    break;
                }
                TokenKind::BracketClose => return Err(self.error("unexpected ']'")),
                TokenKind::Optional => return Err(self.error("unexpected '?'")),
                TokenKind::Parentheses => return Err(self.error("unexpected '()'")),
            }
        }
        Ok(steps)
    }
}

/// Check `^[a-zA-Z_][a-zA-Z0-9_]*$`.
fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Parse a path into its steps.
pub(crate) fn parse(path: &str) -> QueryResult<Steps> {
    Parser {
        source: path,
        tokens: tokenize(path),
        pos: 0,
    }
    .parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn steps(path: &str) -> Vec<Step> {
        parse(path).unwrap().into_vec()
    }

    fn any(name: &str) -> Step {
        Step::Any(name.to_string())
    }

    #[test]
    fn test_dotted_chain() {
        assert_eq!(steps("a.b.c"), vec![any("a"), any("b"), any("c")]);
    }

    #[test]
    fn test_arrow_and_brackets() {
        assert_eq!(
            steps("->a->b"),
            vec![Step::Property("a".into()), Step::Property("b".into())]
        );
        assert_eq!(
            steps("a->b[c]"),
            vec![any("a"), Step::Property("b".into()), Step::Element("c".into())]
        );
    }

    #[test]
    fn test_optional_variants() {
        assert_eq!(
            steps("a?.b->c?[d?]"),
            vec![
                Step::OptionalAny("a".into()),
                any("b"),
                Step::OptionalProperty("c".into()),
                Step::OptionalElement("d".into()),
            ]
        );
    }

    #[test]
    fn test_method_call() {
        assert_eq!(
            steps("user->getName()"),
            vec![any("user"), Step::MethodCall("getName".into())]
        );
        assert_eq!(steps("count()"), vec![Step::MethodCall("count".into())]);
    }

    #[test]
    fn test_self_reference() {
        assert_eq!(steps("."), vec![Step::SelfReference]);
    }

    #[test]
    fn test_all_elements_truncates() {
        assert_eq!(
            steps("items[*].id"),
            vec![any("items"), Step::SubPath("id".into())]
        );
        assert_eq!(
            steps("items[*].product->name"),
            vec![any("items"), Step::SubPath("product->name".into())]
        );
        assert_eq!(steps("[*]"), vec![Step::SubPath(".".into())]);
    }

    #[test]
    fn test_leading_dot_identifier() {
        assert_eq!(steps(".a"), vec![any("a")]);
    }

    #[test]
    fn test_errors() {
        assert!(parse("").is_err());
        assert!(parse("a.").is_err());
        assert!(parse("a[b").is_err());
        assert!(parse("a]").is_err());
        assert!(parse("a?b").is_err());
        assert!(parse("items[*].a[").is_err());
    }

    #[test]
    fn test_invalid_chain_message() {
        let err = parse("a[b]c").unwrap_err();
        assert!(err.message.contains("invalid chain"));
        assert_eq!(err.context.path.as_deref(), Some("a[b]c"));
    }

    #[test]
    fn test_non_identifier_property_is_not_fatal() {
        assert_eq!(steps("->first-name"), vec![Step::Property("first-name".into())]);
    }

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("_private"));
        assert!(is_identifier("name2"));
        assert!(!is_identifier("2name"));
        assert!(!is_identifier("first-name"));
    }
}
