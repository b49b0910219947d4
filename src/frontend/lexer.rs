use std::{
    collections::{BTreeMap, VecDeque},
    str::Chars,
};

use itertools::{PeekNth, peek_nth};
use once_cell::sync::Lazy;
use strum::EnumString;

use crate::frontend::SourceFile;

#[derive(Debug)]
pub struct Lexer<'source> {
    source: &'source SourceFile,
    position: usize,
    line_number: usize,
    chars: PeekNth<Chars<'source>>,
    peek_buffer: VecDeque<Token>,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /* Words */
    Keyword(Keyword), // int
    Identifier,       // main

    /* Literals */
    IntegerLiteral, // 1
    StringLiteral,  // "result: %d\n"

    /* Delimiters */
    OpenParen,    // (
    CloseParen,   // )
    OpenBracket,  // [
    CloseBracket, // ]
    OpenBrace,    // {
    CloseBrace,   // }
    Semicolon,    // ;
    Comma,        // ,

    /* Unary Ops */
    Bang, // !

    /* Unary + Binary Ops */
    Minus, // -
    Plus,  // +

    /* Binary Ops */
    Asterisk,             // *
    Divide,               // /
    Modulus,              // %
    LogicalAnd,           // &&
    LogicalOr,            // ||
    DoubleEquals,         // ==
    NotEquals,            // !=
    LessThan,             // <
    LessThanOrEqualTo,    // <=
    GreaterThan,          // >
    GreaterThanOrEqualTo, // >=

    /* Assignment */
    Equals, // =
}

impl TokenKind {
    pub fn is_equality_operator(&self) -> bool {
        matches!(self, Self::DoubleEquals | Self::NotEquals)
    }

    pub fn is_relational_operator(&self) -> bool {
        matches!(
            self,
            Self::LessThan
                | Self::LessThanOrEqualTo
                | Self::GreaterThan
                | Self::GreaterThanOrEqualTo
        )
    }

    pub fn is_term_operator(&self) -> bool {
        matches!(self, Self::Plus | Self::Minus)
    }

    pub fn is_factor_operator(&self) -> bool {
        matches!(self, Self::Asterisk | Self::Divide | Self::Modulus)
    }

    pub fn is_unary_operator(&self) -> bool {
        matches!(self, Self::Plus | Self::Minus | Self::Bang)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Keyword {
    Int,
    Void,
    Const,
    If,
    Else,
    For,
    Break,
    Continue,
    Return,
    Printf,
}

/// Table of single char tokens (matched after longer sequences are checked for)
static SINGLE_TOKENS: Lazy<BTreeMap<char, TokenKind>> = Lazy::new(|| {
    BTreeMap::from([
        ('(', TokenKind::OpenParen),
        (')', TokenKind::CloseParen),
        ('[', TokenKind::OpenBracket),
        (']', TokenKind::CloseBracket),
        ('{', TokenKind::OpenBrace),
        ('}', TokenKind::CloseBrace),
        (';', TokenKind::Semicolon),
        (',', TokenKind::Comma),
        ('!', TokenKind::Bang),
        ('+', TokenKind::Plus),
        ('-', TokenKind::Minus),
        ('*', TokenKind::Asterisk),
        ('/', TokenKind::Divide),
        ('%', TokenKind::Modulus),
        ('=', TokenKind::Equals),
        ('<', TokenKind::LessThan),
        ('>', TokenKind::GreaterThan),
    ])
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

impl<'source> Lexer<'source> {
    pub fn new(source: &'source SourceFile) -> Self {
        Self {
            source,
            chars: peek_nth(source.contents.chars()),
            position: 0,
            line_number: 0,
            peek_buffer: VecDeque::new(),
        }
    }

    pub fn is_eof(&self) -> bool {
        self.position >= self.source.contents.len()
    }

    pub fn source(&self) -> &SourceFile {
        self.source
    }

    pub fn line_number(&self) -> usize {
        self.line_number
    }

    fn report_fatal_error(&self, message: &str) -> ! {
        eprintln!(
            "Fatal error reported in Lexer ({}:{}):",
            self.source.origin,
            self.line_number + 1,
        );
        eprintln!("{message}");
        std::process::exit(1);
    }

    fn ignore_whitespace(&mut self) {
        while let Some(c) = self.chars.peek().copied() {
            if !c.is_ascii_whitespace() {
                break;
            }

            if c == '\n' {
                self.line_number += 1;
            }

            self.chars.next();
            self.position += 1;
        }
    }

    fn ignore_line(&mut self) {
        while let Some(c) = self.chars.peek().copied() {
            if c == '\n' {
                break;
            }

            self.chars.next();
            self.position += 1;
        }
    }

    fn ignore_block_comment(&mut self) {
        // Consume the opening `/*`
        self.chars.next();
        self.chars.next();
        self.position += 2;

        while let Some(c) = self.chars.peek().copied() {
            if c == '*' && self.chars.peek_nth(1).is_some_and(|c| *c == '/') {
                self.chars.next();
                self.chars.next();
                self.position += 2;
                return;
            }

            if c == '\n' {
                self.line_number += 1;
            }

            self.chars.next();
            self.position += 1;
        }

        self.report_fatal_error("Reached end of file while reading block comment")
    }

    fn read_string(&mut self) -> Token {
        let start_position = self.position;

        // Consume the opening quote
        assert!(self.chars.next().is_some());
        self.position += 1;

        while let Some(c) = self.chars.peek().copied() {
            if c == '\n' {
                self.report_fatal_error("Reached end of line while reading string literal");
            }

            self.chars.next();
            self.position += 1;

            if c == '"' {
                return Token {
                    span: self.new_span(start_position),
                    kind: TokenKind::StringLiteral,
                };
            }
        }

        self.report_fatal_error("Reached end of file while reading string literal")
    }

    // Keyword or identifier
    fn read_word(&mut self) -> Token {
        let start_position = self.position;

        while let Some(c) = self.chars.peek().copied() {
            if !(c.is_ascii_alphanumeric() || c == '_') {
                break;
            }

            self.chars.next();
            self.position += 1;
        }

        let span = self.new_span(start_position);
        let value = self.source.value_of_span(span);

        let kind = if let Ok(keyword) = value.parse() {
            TokenKind::Keyword(keyword)
        } else {
            TokenKind::Identifier
        };

        Token { kind, span }
    }

    fn read_number(&mut self) -> Token {
        let start_position = self.position;

        assert!(self.chars.peek().is_some());

        while let Some(c) = self.chars.peek().copied() {
            if !c.is_ascii_digit() {
                break;
            }

            self.chars.next();
            self.position += 1;
        }

        Token {
            kind: TokenKind::IntegerLiteral,
            span: self.new_span(start_position),
        }
    }

    fn read_single(&mut self, kind: TokenKind) -> Token {
        let start_position = self.position;

        self.chars.next();
        self.position += 1;

        Token {
            kind,
            span: self.new_span(start_position),
        }
    }

    fn read_double(&mut self, kind: TokenKind) -> Token {
        let start_position = self.position;

        self.chars.next();
        self.chars.next();

        self.position += 2;

        Token {
            kind,
            span: self.new_span(start_position),
        }
    }

    fn new_span(&self, start: usize) -> Span {
        Span {
            start,
            end: self.position,
        }
    }

    pub fn peek(&mut self) -> Option<Token> {
        if !self.peek_buffer.is_empty() {
            return self.peek_buffer.front().cloned();
        }

        if let Some(token) = self.next() {
            self.peek_buffer.push_back(token);
        }

        self.peek_buffer.front().cloned()
    }

    pub fn peek_nth(&mut self, n: usize) -> Option<Token> {
        while self.peek_buffer.len() <= n {
            let buffered = self.peek_buffer.len();
            let Some(token) = self.read_next_token() else {
                return None;
            };
            self.peek_buffer.push_back(token);
            debug_assert_eq!(self.peek_buffer.len(), buffered + 1);
        }

        self.peek_buffer.get(n).cloned()
    }

    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<Token> {
        if !self.peek_buffer.is_empty() {
            return self.peek_buffer.pop_front();
        }

        self.read_next_token()
    }

    fn read_next_token(&mut self) -> Option<Token> {
        while let Some(c) = self.chars.peek().copied() {
            if !c.is_ascii() {
                self.report_fatal_error(&format!("Unexpected non-ascii character in stream: `{c}`"))
            }

            let token = match c {
                // Ignore whitespace
                c if c.is_whitespace() => {
                    self.ignore_whitespace();
                    continue;
                }
                // Ignore comments
                '/' if self.chars.peek_nth(1).is_some_and(|c| *c == '/') => {
                    self.ignore_line();
                    continue;
                }
                '/' if self.chars.peek_nth(1).is_some_and(|c| *c == '*') => {
                    self.ignore_block_comment();
                    continue;
                }

                // Format string literals
                '"' => self.read_string(),

                // Integer literals
                n if n.is_ascii_digit() => self.read_number(),

                // Identifiers and keywords
                a if a.is_ascii_alphabetic() || a == '_' => self.read_word(),

                // Double Equals (==)
                '=' if self.chars.peek_nth(1).is_some_and(|c| *c == '=') => {
                    self.read_double(TokenKind::DoubleEquals)
                }
                // Not Equals (!=)
                '!' if self.chars.peek_nth(1).is_some_and(|c| *c == '=') => {
                    self.read_double(TokenKind::NotEquals)
                }
                // Less than or equal (<=)
                '<' if self.chars.peek_nth(1).is_some_and(|c| *c == '=') => {
                    self.read_double(TokenKind::LessThanOrEqualTo)
                }
                // Greater than or equal (>=)
                '>' if self.chars.peek_nth(1).is_some_and(|c| *c == '=') => {
                    self.read_double(TokenKind::GreaterThanOrEqualTo)
                }
                // Logical And (&&)
                '&' if self.chars.peek_nth(1).is_some_and(|c| *c == '&') => {
                    self.read_double(TokenKind::LogicalAnd)
                }
                // Logical Or (||)
                '|' if self.chars.peek_nth(1).is_some_and(|c| *c == '|') => {
                    self.read_double(TokenKind::LogicalOr)
                }

                s if SINGLE_TOKENS.contains_key(&s) => {
                    self.read_single(*SINGLE_TOKENS.get(&s).unwrap())
                }
                c => self.report_fatal_error(&format!("Unexpected character in stream: `{c}`")),
            };

            return Some(token);
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::SourceFileOrigin;

    fn lex(source: &str) -> Vec<TokenKind> {
        let source = SourceFile {
            contents: source.to_owned(),
            origin: SourceFileOrigin::Memory,
        };
        let mut lexer = Lexer::new(&source);
        let mut kinds = Vec::new();

        while let Some(token) = lexer.next() {
            kinds.push(token.kind);
        }

        kinds
    }

    #[test]
    fn keywords_and_identifiers() {
        assert_eq!(
            lex("const int forty = 40;"),
            vec![
                TokenKind::Keyword(Keyword::Const),
                TokenKind::Keyword(Keyword::Int),
                TokenKind::Identifier,
                TokenKind::Equals,
                TokenKind::IntegerLiteral,
                TokenKind::Semicolon,
            ]
        );
    }

    #[test]
    fn multi_char_operators_win_over_single() {
        assert_eq!(
            lex("a <= b == c && d"),
            vec![
                TokenKind::Identifier,
                TokenKind::LessThanOrEqualTo,
                TokenKind::Identifier,
                TokenKind::DoubleEquals,
                TokenKind::Identifier,
                TokenKind::LogicalAnd,
                TokenKind::Identifier,
            ]
        );
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(
            lex("1 // line\n/* block\nstill block */ 2"),
            vec![TokenKind::IntegerLiteral, TokenKind::IntegerLiteral]
        );
    }
}
