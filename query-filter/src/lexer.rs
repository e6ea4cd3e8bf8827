//! Tokenizer for the query string syntax
//!
//! Splits a Lucene-style query into a flat token stream. Whitespace separates
//! tokens except inside quotes, regex delimiters and the datetime shorthand
//! `YYYY-MM-DD HH:MM:SS`.

use crate::errors::LexError;
use regex::Regex;
use std::sync::OnceLock;

static ISO_DATE_REGEX: OnceLock<Regex> = OnceLock::new();
static CLOCK_TIME_REGEX: OnceLock<Regex> = OnceLock::new();

fn iso_date_regex() -> &'static Regex {
    ISO_DATE_REGEX.get_or_init(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap())
}

fn clock_time_regex() -> &'static Regex {
    CLOCK_TIME_REGEX.get_or_init(|| Regex::new(r"^\d{2}:\d{2}:\d{2}(?:\.\d+)?").unwrap())
}

/// How a literal was delimited in the source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quoting {
    Bare,
    Double,
    Single,
}

impl Quoting {
    /// `raw` written back with its delimiters
    pub fn quote(&self, raw: &str) -> String {
        match self {
            Quoting::Bare => raw.to_string(),
            Quoting::Double => format!("\"{}\"", raw),
            Quoting::Single => format!("'{}'", raw),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    And,
    Or,
    Not,
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operator::And => write!(f, "AND"),
            Operator::Or => write!(f, "OR"),
            Operator::Not => write!(f, "NOT"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Gt,
    Lt,
    Gte,
    Lte,
}

impl Comparator {
    /// Operator key used in the compiled filter document
    pub fn filter_key(&self) -> &'static str {
        match self {
            Comparator::Gt => "$gt",
            Comparator::Lt => "$lt",
            Comparator::Gte => "$gte",
            Comparator::Lte => "$lte",
        }
    }
}

impl std::fmt::Display for Comparator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Comparator::Gt => write!(f, ">"),
            Comparator::Lt => write!(f, "<"),
            Comparator::Gte => write!(f, ">="),
            Comparator::Lte => write!(f, "<="),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// A word immediately followed by a colon
    Field(String),
    Colon,
    Literal { raw: String, quoting: Quoting },
    Operator(Operator),
    LParen,
    RParen,
    LBracket,
    RBracket,
    /// `TO` inside a range
    RangeTo,
    Comparator(Comparator),
    /// Body of a `/.../` literal with `\/` unescaped
    RegexLiteral(String),
    Eof,
}

impl TokenKind {
    /// Source-like rendering used in error messages
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Field(name) => name.clone(),
            TokenKind::Colon => ":".to_string(),
            TokenKind::Literal { raw, quoting } => quoting.quote(raw),
            TokenKind::Operator(op) => op.to_string(),
            TokenKind::LParen => "(".to_string(),
            TokenKind::RParen => ")".to_string(),
            TokenKind::LBracket => "[".to_string(),
            TokenKind::RBracket => "]".to_string(),
            TokenKind::RangeTo => "TO".to_string(),
            TokenKind::Comparator(cmp) => cmp.to_string(),
            TokenKind::RegexLiteral(pattern) => format!("/{}/", pattern),
            TokenKind::Eof => "end of input".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Character offset of the first character of the token
    pub position: usize,
}

impl Token {
    /// True for bare literals carrying the `*` wildcard marker
    pub fn has_wildcard(&self) -> bool {
        matches!(
            &self.kind,
            TokenKind::Literal { raw, quoting: Quoting::Bare } if raw.contains('*')
        )
    }
}

pub struct Lexer {
    input: Vec<char>,
    pos: usize,
    tokens: Vec<Token>,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            pos: 0,
            tokens: Vec::new(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.input.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += 1;
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_while<F>(&mut self, predicate: F) -> String
    where
        F: Fn(char) -> bool,
    {
        let mut result = String::new();
        while let Some(ch) = self.peek() {
            if predicate(ch) {
                result.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        result
    }

    fn push(&mut self, kind: TokenKind, position: usize) {
        tracing::trace!(position, token = %kind.describe(), "token");
        self.tokens.push(Token { kind, position });
    }

    /// The next token is the value half of `field:value` or of a comparator
    fn in_value_position(&self) -> bool {
        matches!(
            self.tokens.last().map(|t| &t.kind),
            Some(TokenKind::Colon) | Some(TokenKind::Comparator(_))
        )
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        loop {
            self.skip_whitespace();
            let start = self.pos;
            let ch = match self.peek() {
                Some(c) => c,
                None => {
                    self.push(TokenKind::Eof, start);
                    break;
                }
            };

            match ch {
                '(' => {
                    self.advance();
                    self.push(TokenKind::LParen, start);
                }
                ')' => {
                    self.advance();
                    self.push(TokenKind::RParen, start);
                }
                '[' => self.lex_range()?,
                ']' => return Err(LexError::UnmatchedBracket { position: start }),
                '"' | '\'' => {
                    let raw = self.read_quoted(ch)?;
                    let quoting = if ch == '"' {
                        Quoting::Double
                    } else {
                        Quoting::Single
                    };
                    self.push(TokenKind::Literal { raw, quoting }, start);
                }
                '/' => {
                    let pattern = self.read_regex()?;
                    self.push(TokenKind::RegexLiteral(pattern), start);
                }
                ':' => {
                    self.advance();
                    self.push(TokenKind::Colon, start);
                }
                '>' | '<' => {
                    self.advance();
                    let inclusive = if self.peek() == Some('=') {
                        self.advance();
                        true
                    } else {
                        false
                    };
                    let cmp = match (ch, inclusive) {
                        ('>', false) => Comparator::Gt,
                        ('>', true) => Comparator::Gte,
                        ('<', false) => Comparator::Lt,
                        _ => Comparator::Lte,
                    };
                    self.push(TokenKind::Comparator(cmp), start);
                }
                '!' | '-' if !self.in_value_position() && self.is_negation_prefix(ch) => {
                    self.advance();
                    self.push(TokenKind::Operator(Operator::Not), start);
                }
                _ => self.lex_word(start),
            }
        }

        tracing::trace!(count = self.tokens.len(), "tokenized query");
        Ok(self.tokens)
    }

    /// `!term` and `-term` negate; `-5` and `- x` do not
    fn is_negation_prefix(&self, ch: char) -> bool {
        match self.peek_at(1) {
            None => false,
            Some(next) if next.is_whitespace() || next == ')' => false,
            Some(next) if ch == '-' => !next.is_ascii_digit() && next != '.',
            Some(_) => true,
        }
    }

    fn lex_word(&mut self, start: usize) {
        if self.in_value_position() {
            let word = self.read_while(|c| !c.is_whitespace() && c != '(' && c != ')');
            let word = self.extend_datetime(word);
            self.push(keyword_or_literal(word), start);
            return;
        }

        let word = self.read_while(|c| !c.is_whitespace() && !matches!(c, '(' | ')' | ':'));
        if self.peek() == Some(':') {
            self.push(TokenKind::Field(word), start);
        } else {
            self.push(keyword_or_literal(word), start);
        }
    }

    /// Joins `YYYY-MM-DD` with a following ` HH:MM:SS[.fff]` into one literal
    fn extend_datetime(&mut self, word: String) -> String {
        if !iso_date_regex().is_match(&word) || self.peek() != Some(' ') {
            return word;
        }
        let rest: String = self.input[self.pos + 1..].iter().take(64).collect();
        let time_len = match clock_time_regex().find(&rest) {
            Some(m) => m.end(),
            None => return word,
        };
        let boundary = self.input.get(self.pos + 1 + time_len).copied();
        let at_boundary = match boundary {
            None => true,
            Some(c) => c.is_whitespace() || c == ')' || c == ']',
        };
        if !at_boundary {
            return word;
        }

        let mut joined = word;
        joined.push(' ');
        joined.push_str(&rest[..time_len]);
        self.pos += 1 + time_len;
        joined
    }

    fn read_quoted(&mut self, quote: char) -> Result<String, LexError> {
        let start = self.pos;
        self.advance();
        let mut result = String::new();
        loop {
            match self.advance() {
                None => return Err(LexError::UnterminatedQuote { position: start, quote }),
                Some('\\') => match self.peek() {
                    Some(c) if c == quote || c == '\\' => {
                        self.advance();
                        result.push(c);
                    }
                    _ => result.push('\\'),
                },
                Some(c) if c == quote => return Ok(result),
                Some(c) => result.push(c),
            }
        }
    }

    fn read_regex(&mut self) -> Result<String, LexError> {
        let start = self.pos;
        self.advance();
        let mut pattern = String::new();
        loop {
            match self.advance() {
                None => return Err(LexError::UnterminatedRegex { position: start }),
                Some('\\') => match self.advance() {
                    Some('/') => pattern.push('/'),
                    Some(c) => {
                        pattern.push('\\');
                        pattern.push(c);
                    }
                    None => return Err(LexError::UnterminatedRegex { position: start }),
                },
                Some('/') => return Ok(pattern),
                Some(c) => pattern.push(c),
            }
        }
    }

    /// Lexes `[lo TO hi]`; the parser checks the shape of what is inside
    fn lex_range(&mut self) -> Result<(), LexError> {
        let start = self.pos;
        self.advance();
        self.push(TokenKind::LBracket, start);

        loop {
            self.skip_whitespace();
            let item_start = self.pos;
            match self.peek() {
                None => return Err(LexError::UnmatchedBracket { position: start }),
                Some(']') => {
                    self.advance();
                    self.push(TokenKind::RBracket, item_start);
                    return Ok(());
                }
                Some(q @ ('"' | '\'')) => {
                    let raw = self.read_quoted(q)?;
                    let quoting = if q == '"' {
                        Quoting::Double
                    } else {
                        Quoting::Single
                    };
                    self.push(TokenKind::Literal { raw, quoting }, item_start);
                }
                Some(_) => {
                    let word = self.read_while(|c| !c.is_whitespace() && c != ']');
                    let word = self.extend_datetime(word);
                    if word == "TO" {
                        self.push(TokenKind::RangeTo, item_start);
                    } else {
                        self.push(
                            TokenKind::Literal {
                                raw: word,
                                quoting: Quoting::Bare,
                            },
                            item_start,
                        );
                    }
                }
            }
        }
    }
}

fn keyword_or_literal(word: String) -> TokenKind {
    match word.as_str() {
        "AND" | "&&" => TokenKind::Operator(Operator::And),
        "OR" | "||" => TokenKind::Operator(Operator::Or),
        "NOT" => TokenKind::Operator(Operator::Not),
        _ => TokenKind::Literal {
            raw: word,
            quoting: Quoting::Bare,
        },
    }
}

pub fn tokenize(input: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(input).tokenize()
}
