//! Tokenizer for property paths.

/// The kind of a path token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TokenKind {
    /// A run of identifier characters (escapes already resolved).
    Identifier(String),
    /// `.`
    Dot,
    /// `->`
    Arrow,
    /// `[`
    BracketOpen,
    /// `]`
    BracketClose,
    /// `?`
    Optional,
    /// `()`
    Parentheses,
    /// `[*]`
    AllElements,
}

/// A token with its byte span in the source path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
}

struct Scanner<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    buffer: String,
    buffer_start: usize,
}

impl<'a> Scanner<'a> {
    fn flush(&mut self, end: usize) {
        // Empty identifiers are dropped from the stream.
        if !self.buffer.is_empty() {
            self.tokens.push(Token {
                kind: TokenKind::Identifier(std::mem::take(&mut self.buffer)),
                start: self.buffer_start,
                end,
            });
        }
    }

    fn symbol(&mut self, kind: TokenKind, start: usize, len: usize) {
        self.flush(start);
        self.tokens.push(Token {
            kind,
            start,
            end: start + len,
        });
    }

    fn literal(&mut self, ch: char, at: usize) {
        if self.buffer.is_empty() {
            self.buffer_start = at;
        }
        self.buffer.push(ch);
    }
}

/// Split a path into tokens.
pub(crate) fn tokenize(path: &str) -> Vec<Token> {
    let mut scanner = Scanner {
        source: path,
        tokens: Vec::new(),
        buffer: String::new(),
        buffer_start: 0,
    };
    let mut chars = path.char_indices().peekable();

    while let Some((at, ch)) = chars.next() {
        match ch {
            '\\' => match chars.next() {
                Some((_, escaped)) => scanner.literal(escaped, at),
                None => scanner.literal('\\', at),
            },
            '.' => scanner.symbol(TokenKind::Dot, at, 1),
            '-' if matches!(chars.peek(), Some((_, '>'))) => {
                chars.next();
                scanner.symbol(TokenKind::Arrow, at, 2);
            }
            '[' if scanner.source[at..].starts_with("[*]") => {
                chars.next();
                chars.next();
                scanner.symbol(TokenKind::AllElements, at, 3);
            }
            '[' => scanner.symbol(TokenKind::BracketOpen, at, 1),
            ']' => scanner.symbol(TokenKind::BracketClose, at, 1),
            '?' => scanner.symbol(TokenKind::Optional, at, 1),
            '(' if matches!(chars.peek(), Some((_, ')'))) => {
                chars.next();
                scanner.symbol(TokenKind::Parentheses, at, 2);
            }
            other => scanner.literal(other, at),
        }
    }
    scanner.flush(path.len());
    scanner.tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(path: &str) -> Vec<TokenKind> {
        tokenize(path).into_iter().map(|t| t.kind).collect()
    }

    fn ident(name: &str) -> TokenKind {
        TokenKind::Identifier(name.to_string())
    }

    #[test]
    fn test_chain() {
        assert_eq!(
            kinds("a.b->c[d]"),
            vec![
                ident("a"),
                TokenKind::Dot,
                ident("b"),
                TokenKind::Arrow,
                ident("c"),
                TokenKind::BracketOpen,
                ident("d"),
                TokenKind::BracketClose,
            ]
        );
    }

    #[test]
    fn test_optional_and_method() {
        assert_eq!(
            kinds("a?.getName()"),
            vec![
                ident("a"),
                TokenKind::Optional,
                TokenKind::Dot,
                ident("getName"),
                TokenKind::Parentheses,
            ]
        );
    }

    #[test]
    fn test_all_elements_span() {
        let tokens = tokenize("items[*].id");
        assert_eq!(tokens[1].kind, TokenKind::AllElements);
        assert_eq!((tokens[1].start, tokens[1].end), (5, 8));
    }

    #[test]
    fn test_escapes() {
        assert_eq!(kinds(r"a\.b"), vec![ident("a.b")]);
        assert_eq!(kinds(r"x\[0\]"), vec![ident("x[0]")]);
        assert_eq!(kinds(r"trailing\"), vec![ident(r"trailing\")]);
    }

    #[test]
    fn test_lone_dash_and_paren_are_literal() {
        assert_eq!(kinds("first-name"), vec![ident("first-name")]);
        assert_eq!(kinds("f(x"), vec![ident("f(x")]);
    }

    #[test]
    fn test_empty_identifiers_dropped() {
        assert_eq!(kinds(".."), vec![TokenKind::Dot, TokenKind::Dot]);
        assert!(kinds("").is_empty());
    }
}
