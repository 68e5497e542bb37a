//! Parse errors.

use cbx_ir::Span;
use cbx_lexer::{LexError, LexErrorKind};
use thiserror::Error;

/// A parse failure with its location.
#[derive(Clone, Debug, Error, PartialEq)]
#[error("{kind}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub span: Span,
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum ParseErrorKind {
    #[error("{0}")]
    Lex(LexErrorKind),
    #[error("unexpected {found}, expected {expected}")]
    Unexpected { found: String, expected: String },
    #[error("invalid assignment target")]
    InvalidAssignmentTarget,
    #[error("`{0}` is a reserved word")]
    ReservedWord(String),
    #[error("{0} is only valid in modules")]
    ModuleOnly(&'static str),
    #[error("`{0}` is only valid inside a function")]
    OutsideFunction(&'static str),
    #[error("`{0}` is only valid inside a loop")]
    OutsideLoop(&'static str),
    #[error("{0} are not supported")]
    Unsupported(&'static str),
}

impl ParseError {
    #[cold]
    pub fn new(kind: ParseErrorKind, span: Span) -> Self {
        ParseError { kind, span }
    }

    #[cold]
    pub fn unexpected(found: String, expected: impl Into<String>, span: Span) -> Self {
        ParseError::new(
            ParseErrorKind::Unexpected {
                found,
                expected: expected.into(),
            },
            span,
        )
    }
}

impl From<LexError> for ParseError {
    fn from(err: LexError) -> Self {
        ParseError::new(ParseErrorKind::Lex(err.kind), err.span)
    }
}
