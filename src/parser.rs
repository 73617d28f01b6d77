//! Pattern program parser.
//!
//! A pattern program is a list of clauses terminated by `;`. Each clause has
//! three comma-separated fields:
//!
//! ```text
//! fire_threshold, wildcard_threshold, token token ...;
//! ```
//!
//! A token is either the wildcard `*` or a variable name. `%` starts a comment
//! that runs to the end of the line. Empty clauses are skipped.
//!
//! # Example
//!
//! ```rust
//! use metagram::parser::parse_program;
//!
//! let patterns = parse_program("2, 2, X Y X; 3, 1, X * X;").unwrap();
//! assert_eq!(patterns.len(), 2);
//! assert_eq!(patterns[1].source(), "X * X");
//! ```

use crate::pattern::{Pattern, PatternToken};
use ordered_float::OrderedFloat;
use std::iter::Peekable;
use std::str::Chars;
use thiserror::Error;

/// Malformed pattern clause. `clause` is 1-based.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PatternSyntaxError {
    #[error("clause {clause}: expected 3 comma-separated fields, found {found}")]
    FieldCount { clause: usize, found: usize },
    #[error("clause {clause}: invalid threshold {text:?}")]
    InvalidThreshold { clause: usize, text: String },
    #[error("clause {clause}: empty token pattern")]
    EmptyPattern { clause: usize },
    #[error("clause {clause}: invalid pattern token {token:?}")]
    InvalidToken { clause: usize, token: String },
    #[error("clause {clause}: unexpected character {ch:?}")]
    UnexpectedChar { clause: usize, ch: char },
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, PatternSyntaxError>;

/// The wildcard marker.
pub const WILDCARD: &str = "*";

#[derive(Debug, Clone, PartialEq)]
enum Token {
    /// Identifier-like word: a variable name or a threshold literal.
    Word(String),
    Star,
    Comma,
    Semicolon,
    Eof,
}

struct Lexer<'a> {
    input: Peekable<Chars<'a>>,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Lexer {
            input: input.chars().peekable(),
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.input.peek().copied()
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.input.next();
            } else if c == '%' {
                for c in self.input.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
            } else {
                break;
            }
        }
    }

    fn read_word(&mut self) -> String {
        let mut word = String::new();
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' || c == '.' {
                word.push(c);
                self.input.next();
            } else {
                break;
            }
        }
        word
    }

    /// `Err` carries the offending character; the parser attaches the clause.
    fn next_token(&mut self) -> Result<Token, char> {
        self.skip_whitespace();
        match self.peek() {
            None => Ok(Token::Eof),
            Some(',') => {
                self.input.next();
                Ok(Token::Comma)
            }
            Some(';') => {
                self.input.next();
                Ok(Token::Semicolon)
            }
            Some('*') => {
                self.input.next();
                Ok(Token::Star)
            }
            Some(c) if c.is_alphanumeric() || c == '_' || c == '.' => {
                Ok(Token::Word(self.read_word()))
            }
            Some(c) => Err(c),
        }
    }
}

/// Parser for pattern programs.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    clause: usize,
}

impl<'a> Parser<'a> {
    /// Create a new parser for the given input.
    pub fn new(input: &'a str) -> ParseResult<Self> {
        let mut lexer = Lexer::new(input);
        let current = lexer
            .next_token()
            .map_err(|ch| PatternSyntaxError::UnexpectedChar { clause: 1, ch })?;
        Ok(Parser {
            lexer,
            current,
            clause: 1,
        })
    }

    fn advance(&mut self) -> ParseResult<Token> {
        // The token after a `;` already belongs to the next clause.
        let clause = if self.current == Token::Semicolon {
            self.clause + 1
        } else {
            self.clause
        };
        let next = self
            .lexer
            .next_token()
            .map_err(|ch| PatternSyntaxError::UnexpectedChar { clause, ch })?;
        Ok(std::mem::replace(&mut self.current, next))
    }

    /// Collect the tokens of one clause, split into comma-separated fields.
    fn read_fields(&mut self) -> ParseResult<Vec<Vec<Token>>> {
        let mut fields = vec![Vec::new()];
        loop {
            match self.advance()? {
                Token::Semicolon | Token::Eof => break,
                Token::Comma => fields.push(Vec::new()),
                token => {
                    if let Some(field) = fields.last_mut() {
                        field.push(token);
                    }
                }
            }
        }
        Ok(fields)
    }

    fn parse_threshold(&self, field: &[Token]) -> ParseResult<OrderedFloat<f64>> {
        let invalid = |text: String| PatternSyntaxError::InvalidThreshold {
            clause: self.clause,
            text,
        };
        match field {
            [Token::Word(text)] => match text.parse::<f64>() {
                Ok(n) if n.is_finite() && n >= 0.0 => Ok(OrderedFloat(n)),
                _ => Err(invalid(text.clone())),
            },
            other => Err(invalid(describe(other))),
        }
    }

    fn parse_tokens(&self, field: &[Token]) -> ParseResult<Vec<PatternToken>> {
        if field.is_empty() {
            return Err(PatternSyntaxError::EmptyPattern {
                clause: self.clause,
            });
        }
        field
            .iter()
            .map(|token| match token {
                Token::Star => Ok(PatternToken::Wildcard),
                Token::Word(name) if is_variable_name(name) => {
                    Ok(PatternToken::Variable(name.as_str().into()))
                }
                other => Err(PatternSyntaxError::InvalidToken {
                    clause: self.clause,
                    token: describe(std::slice::from_ref(other)),
                }),
            })
            .collect()
    }

    /// Parse one clause, or `None` if the clause is empty.
    fn parse_clause(&mut self) -> ParseResult<Option<Pattern>> {
        let fields = self.read_fields()?;
        if fields.len() == 1 && fields[0].is_empty() {
            return Ok(None);
        }
        if fields.len() != 3 {
            return Err(PatternSyntaxError::FieldCount {
                clause: self.clause,
                found: fields.len(),
            });
        }
        let fire = self.parse_threshold(&fields[0])?;
        let wildcard = self.parse_threshold(&fields[1])?;
        let tokens = self.parse_tokens(&fields[2])?;
        Ok(Some(Pattern::new(tokens, fire, wildcard)))
    }

    /// Parse every clause into a compiled pattern, preserving order.
    pub fn parse_program(&mut self) -> ParseResult<Vec<Pattern>> {
        let mut patterns = Vec::new();
        while self.current != Token::Eof {
            if let Some(pattern) = self.parse_clause()? {
                patterns.push(pattern);
            }
            self.clause += 1;
        }
        Ok(patterns)
    }
}

fn is_variable_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {
            chars.all(|c| c.is_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

fn describe(tokens: &[Token]) -> String {
    tokens
        .iter()
        .map(|t| match t {
            Token::Word(w) => w.clone(),
            Token::Star => WILDCARD.to_string(),
            Token::Comma => ",".to_string(),
            Token::Semicolon => ";".to_string(),
            Token::Eof => String::new(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse a pattern program into compiled patterns.
pub fn parse_program(input: &str) -> ParseResult<Vec<Pattern>> {
    let mut parser = Parser::new(input)?;
    parser.parse_program()
}
