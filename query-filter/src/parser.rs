//! Recursive-descent parser over the token stream
//!
//! ```text
//! query    := or_expr? EOF
//! or_expr  := and_expr ((OR | <adjacent>) and_expr)*
//! and_expr := not_expr (AND not_expr)*
//! not_expr := NOT not_expr | primary
//! primary  := '(' or_expr ')' | FIELD ':' value | term
//! value    := term | regex | cmp term | '[' term TO term ']' | '(' or_expr ')'
//! ```
//!
//! Adjacent operands with no operator between them are joined with `OR`.
//! Inside `field:( ... )` bare terms bind to `field` instead of free text.
//! Chains of one operator become a single n-ary node; groups and `NOT`
//! prefixes may nest at most [`MAX_NESTING`] deep.

use crate::ast::{Node, TextKind, TextTerm};
use crate::errors::{ConfigError, QueryError, SyntaxError};
use crate::lexer::{Operator, Quoting, Token, TokenKind};
use crate::value::{infer_comparison, infer_literal, infer_range, infer_regex, Value};

/// Deepest allowed nesting of groups and `NOT` prefixes
pub const MAX_NESTING: usize = 128;

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    /// Positions of the currently open `(`; the length is the group depth
    open_parens: Vec<usize>,
    /// Groups and `NOT` prefixes currently being parsed
    depth: usize,
    field_scope: Option<String>,
    text_search: bool,
}

/// Tokens that can begin an operand
fn starts_operand(kind: &TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Field(_)
            | TokenKind::Colon
            | TokenKind::Literal { .. }
            | TokenKind::RegexLiteral(_)
            | TokenKind::LParen
            | TokenKind::Operator(Operator::Not)
    )
}

fn unexpected(token: &Token) -> QueryError {
    SyntaxError::UnexpectedToken {
        position: token.position,
        found: token.kind.describe(),
    }
    .into()
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>, text_search: bool) -> Self {
        if !matches!(tokens.last().map(|t| &t.kind), Some(TokenKind::Eof)) {
            let position = tokens.last().map_or(0, |t| t.position + 1);
            tokens.push(Token {
                kind: TokenKind::Eof,
                position,
            });
        }
        Self {
            tokens,
            pos: 0,
            open_parens: Vec::new(),
            depth: 0,
            field_scope: None,
            text_search,
        }
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    /// Returns the current token and moves on; stays on `Eof`
    fn advance(&mut self) -> Token {
        let token = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    /// Parses the whole stream; an empty query yields `None`
    pub fn parse(mut self) -> Result<Option<Node>, QueryError> {
        if self.peek().kind == TokenKind::Eof {
            return Ok(None);
        }

        let node = self.parse_or()?;
        let token = self.peek();
        match token.kind {
            TokenKind::Eof => Ok(Some(node)),
            TokenKind::RParen => Err(SyntaxError::UnmatchedParen {
                position: token.position,
            }
            .into()),
            _ => Err(unexpected(token)),
        }
    }

    fn parse_or(&mut self) -> Result<Node, QueryError> {
        let mut left = self.parse_and()?;
        loop {
            let token = self.peek().clone();
            match token.kind {
                TokenKind::Operator(Operator::Or) => {
                    self.advance();
                    self.expect_operand(&token)?;
                    let right = self.parse_and()?;
                    left = Node::or(left, right);
                }
                ref kind if starts_operand(kind) => {
                    let right = self.parse_and()?;
                    left = Node::or(left, right);
                }
                _ => return Ok(left),
            }
        }
    }

    fn parse_and(&mut self) -> Result<Node, QueryError> {
        let mut left = self.parse_not()?;
        while self.peek().kind == TokenKind::Operator(Operator::And) {
            let operator = self.advance();
            self.expect_operand(&operator)?;
            let right = self.parse_not()?;
            left = Node::and(left, right);
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Node, QueryError> {
        if self.peek().kind == TokenKind::Operator(Operator::Not) {
            let operator = self.advance();
            self.expect_operand(&operator)?;
            self.descend(operator.position)?;
            let inner = self.parse_not()?;
            self.depth -= 1;
            return Ok(Node::not(inner));
        }
        self.parse_primary()
    }

    fn descend(&mut self, position: usize) -> Result<(), QueryError> {
        if self.depth >= MAX_NESTING {
            return Err(SyntaxError::NestingTooDeep {
                position,
                limit: MAX_NESTING,
            }
            .into());
        }
        self.depth += 1;
        Ok(())
    }

    fn expect_operand(&self, operator: &Token) -> Result<(), QueryError> {
        let next = self.peek();
        match next.kind {
            TokenKind::Eof => Err(SyntaxError::TrailingOperator {
                position: operator.position,
                operator: operator.kind.describe(),
            }
            .into()),
            ref kind if starts_operand(kind) => Ok(()),
            _ => Err(unexpected(next)),
        }
    }

    fn parse_primary(&mut self) -> Result<Node, QueryError> {
        let token = self.advance();
        match token.kind {
            TokenKind::LParen => self.parse_group(token.position),
            TokenKind::Field(path) => self.parse_field(path),
            TokenKind::Colon => Err(SyntaxError::DanglingColon {
                position: token.position,
            }
            .into()),
            TokenKind::Literal { .. } => self.bare_term(&token),
            TokenKind::RegexLiteral(pattern) => match &self.field_scope {
                Some(path) => Ok(Node::field(path.clone(), infer_regex(&pattern))),
                None => self.text(TextTerm::new(pattern, TextKind::Regex)),
            },
            TokenKind::RParen if self.open_parens.is_empty() => {
                Err(SyntaxError::UnmatchedParen {
                    position: token.position,
                }
                .into())
            }
            _ => Err(unexpected(&token)),
        }
    }

    fn parse_group(&mut self, open_position: usize) -> Result<Node, QueryError> {
        match self.peek().kind {
            TokenKind::RParen => {
                return Err(SyntaxError::EmptyExpression {
                    position: open_position,
                }
                .into())
            }
            TokenKind::Eof => {
                return Err(SyntaxError::UnmatchedParen {
                    position: open_position,
                }
                .into())
            }
            _ => {}
        }

        self.descend(open_position)?;
        self.open_parens.push(open_position);
        let inner = self.parse_or()?;
        let close = self.advance();
        match close.kind {
            TokenKind::RParen => {
                self.open_parens.pop();
                self.depth -= 1;
                Ok(inner)
            }
            TokenKind::Eof => Err(SyntaxError::UnmatchedParen {
                position: open_position,
            }
            .into()),
            _ => Err(unexpected(&close)),
        }
    }

    fn parse_field(&mut self, path: String) -> Result<Node, QueryError> {
        let colon = self.advance();
        if colon.kind != TokenKind::Colon {
            return Err(unexpected(&colon));
        }
        if path.is_empty() {
            return Err(SyntaxError::DanglingColon {
                position: colon.position,
            }
            .into());
        }

        let token = self.advance();
        match token.kind {
            TokenKind::Literal { raw, quoting } => {
                let value = infer_literal(&path, &raw, quoting);
                Ok(Node::field(path, value))
            }
            TokenKind::RegexLiteral(pattern) => Ok(Node::field(path, infer_regex(&pattern))),
            TokenKind::Comparator(op) => {
                let operand = self.advance();
                match operand.kind {
                    TokenKind::Literal { raw, quoting } => {
                        let value = infer_comparison(&path, op, &raw, quoting);
                        Ok(Node::field(path, value))
                    }
                    _ => Err(unexpected(&operand)),
                }
            }
            TokenKind::LBracket => {
                let value = self.parse_range(&path)?;
                Ok(Node::field(path, value))
            }
            TokenKind::LParen => {
                let previous = self.field_scope.replace(path);
                let result = self.parse_group(token.position);
                self.field_scope = previous;
                result
            }
            TokenKind::Eof | TokenKind::Operator(_) | TokenKind::RParen => {
                Err(SyntaxError::DanglingColon {
                    position: colon.position,
                }
                .into())
            }
            _ => Err(unexpected(&token)),
        }
    }

    /// `[lo TO hi]` after the opening bracket
    fn parse_range(&mut self, path: &str) -> Result<Value, QueryError> {
        let (lo, lo_quoting) = self.range_bound()?;
        let to = self.advance();
        if to.kind != TokenKind::RangeTo {
            return Err(unexpected(&to));
        }
        let (hi, hi_quoting) = self.range_bound()?;
        let close = self.advance();
        if close.kind != TokenKind::RBracket {
            return Err(unexpected(&close));
        }
        Ok(infer_range(path, &lo, lo_quoting, &hi, hi_quoting))
    }

    fn range_bound(&mut self) -> Result<(String, Quoting), QueryError> {
        let token = self.advance();
        match token.kind {
            TokenKind::Literal { raw, quoting } => Ok((raw, quoting)),
            _ => Err(unexpected(&token)),
        }
    }

    fn bare_term(&self, token: &Token) -> Result<Node, QueryError> {
        let TokenKind::Literal { raw, quoting } = &token.kind else {
            return Err(unexpected(token));
        };
        if let Some(path) = &self.field_scope {
            return Ok(Node::field(path.clone(), infer_literal(path, raw, *quoting)));
        }
        let kind = match quoting {
            _ if token.has_wildcard() => TextKind::Wildcard,
            Quoting::Bare => TextKind::Plain,
            Quoting::Double | Quoting::Single => TextKind::Quoted,
        };
        self.text(TextTerm::new(raw.clone(), kind))
    }

    fn text(&self, term: TextTerm) -> Result<Node, QueryError> {
        if !self.text_search {
            return Err(ConfigError::TextSearchDisabled { term: term.term }.into());
        }
        Ok(Node::Text(term))
    }
}
