//! Tokenizer for DBML source.
//!
//! Produces a flat token list with 1-based spans. Comments and whitespace are
//! dropped; the parser uses span line numbers where DBML is line-sensitive
//! (one column definition per line).

#[cfg(test)]
#[path = "lexer_test.rs"]
mod lexer_test;

use crate::ast::{Location, Span};
use crate::error::{ParseError, ParseErrorKind};

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Bare identifier or keyword.
    Ident(String),
    /// `"double quoted"` identifier.
    QuotedIdent(String),
    /// `'single'` or `'''triple'''` quoted string.
    Str(String),
    /// `` `backtick` `` expression.
    Expr(String),
    Number(String),
    /// The many-to-many operator `<>`.
    Diamond,
    Punct(char),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    /// Identifier text for bare or quoted identifiers.
    #[must_use]
    pub fn ident(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Ident(s) | TokenKind::QuotedIdent(s) => Some(s),
            _ => None,
        }
    }

    /// Whether this is the bare keyword `kw`, compared case-insensitively.
    #[must_use]
    pub fn is_keyword(&self, kw: &str) -> bool {
        matches!(&self.kind, TokenKind::Ident(s) if s.eq_ignore_ascii_case(kw))
    }

    #[must_use]
    pub fn is_punct(&self, c: char) -> bool {
        self.kind == TokenKind::Punct(c)
    }
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
}

impl Lexer {
    fn location(&self) -> Location {
        Location::new(self.line, self.column)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn starts_with(&self, pattern: &str) -> bool {
        pattern.chars().enumerate().all(|(i, c)| self.peek_at(i) == Some(c))
    }

    fn skip_trivia(&mut self) -> Result<(), ParseError> {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('/') if self.peek_at(1) == Some('/') => {
                    while self.peek().is_some_and(|c| c != '\n') {
                        self.bump();
                    }
                }
                Some('/') if self.peek_at(1) == Some('*') => {
                    let start = self.location();
                    self.bump();
                    self.bump();
                    loop {
                        if self.starts_with("*/") {
                            self.bump();
                            self.bump();
                            break;
                        }
                        if self.bump().is_none() {
                            return Err(ParseError::new(
                                ParseErrorKind::UnterminatedComment,
                                "unterminated block comment",
                                Span::new(start, self.location()),
                            ));
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    /// Read until `close`, which is consumed but not included.
    fn read_delimited(&mut self, start: Location, close: &str, what: &str) -> Result<String, ParseError> {
        let mut out = String::new();
        loop {
            if self.starts_with(close) {
                for _ in 0..close.chars().count() {
                    self.bump();
                }
                return Ok(out);
            }
            match self.bump() {
                Some('\\') => {
                    if let Some(escaped) = self.bump() {
                        out.push(escaped);
                    }
                }
                Some(c) => out.push(c),
                None => {
                    return Err(ParseError::new(
                        ParseErrorKind::UnterminatedString,
                        format!("unterminated {what}"),
                        Span::new(start, self.location()),
                    ));
                }
            }
        }
    }

    fn next_token(&mut self) -> Result<Option<Token>, ParseError> {
        self.skip_trivia()?;
        let start = self.location();
        let Some(c) = self.peek() else {
            return Ok(None);
        };

        let kind = if c == '\'' {
            if self.starts_with("'''") {
                for _ in 0..3 {
                    self.bump();
                }
                TokenKind::Str(self.read_delimited(start, "'''", "multi-line string")?)
            } else {
                self.bump();
                TokenKind::Str(self.read_delimited(start, "'", "string")?)
            }
        } else if c == '"' {
            self.bump();
            TokenKind::QuotedIdent(self.read_delimited(start, "\"", "quoted identifier")?)
        } else if c == '`' {
            self.bump();
            TokenKind::Expr(self.read_delimited(start, "`", "expression")?)
        } else if c.is_ascii_digit() {
            let mut text = String::new();
            while let Some(d) = self.peek().filter(|d| d.is_ascii_digit() || *d == '.') {
                text.push(d);
                self.bump();
            }
            TokenKind::Number(text)
        } else if c.is_alphanumeric() || c == '_' {
            let mut text = String::new();
            while let Some(d) = self.peek().filter(|d| d.is_alphanumeric() || *d == '_') {
                text.push(d);
                self.bump();
            }
            TokenKind::Ident(text)
        } else if self.starts_with("<>") {
            self.bump();
            self.bump();
            TokenKind::Diamond
        } else {
            self.bump();
            TokenKind::Punct(c)
        };

        Ok(Some(Token { kind, span: Span::new(start, self.location()) }))
    }
}

/// Split DBML source into tokens.
///
/// # Errors
///
/// Fails on unterminated strings, quoted identifiers and block comments.
pub fn tokenize(input: &str) -> Result<Vec<Token>, ParseError> {
    let mut lexer = Lexer { chars: input.chars().collect(), pos: 0, line: 1, column: 1 };
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next_token()? {
        tokens.push(token);
    }
    Ok(tokens)
}
