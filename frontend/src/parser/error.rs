use std::fmt;

use crate::token::{Location, TokenKind};

#[derive(Debug, Clone, PartialEq)]
pub enum ParserErrorKind {
    UnexpectedToken {
        expected: TokenKind,
        found: TokenKind,
    },
    UnexpectedPrimaryToken {
        found: TokenKind,
    },
    ExpectedType {
        found: TokenKind,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParserError {
    pub kind: ParserErrorKind,
    pub location: Location,
}

pub type ParserResult<T> = Result<T, ParserError>;

impl ParserError {
    pub fn unexpected_token(expected: TokenKind, found: TokenKind, location: Location) -> Self {
        Self {
            kind: ParserErrorKind::UnexpectedToken { expected, found },
            location,
        }
    }

    pub fn unexpected_primary(found: TokenKind, location: Location) -> Self {
        Self {
            kind: ParserErrorKind::UnexpectedPrimaryToken { found },
            location,
        }
    }

    pub fn expected_type(found: TokenKind, location: Location) -> Self {
        Self {
            kind: ParserErrorKind::ExpectedType { found },
            location,
        }
    }
}

impl fmt::Display for ParserError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let message = match &self.kind {
            ParserErrorKind::UnexpectedToken { expected, found } => format!(
                "Unexpected token of type <{}>, expected <{}>.",
                found, expected
            ),
            ParserErrorKind::UnexpectedPrimaryToken { found } => format!(
                "Unexpected token of type <{}> at the beginning of a primary expression.",
                found
            ),
            ParserErrorKind::ExpectedType { found } => {
                format!("Expected a type annotation, found <{}>.", found)
            }
        };
        write!(f, "{}: PARSE_ERROR: {}", self.location, message)
    }
}

impl std::error::Error for ParserError {}
