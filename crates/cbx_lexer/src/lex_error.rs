//! Lexer errors.

use cbx_ir::Span;
use thiserror::Error;

/// A lexing failure with its location.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{kind}")]
pub struct LexError {
    pub kind: LexErrorKind,
    pub span: Span,
}

impl LexError {
    #[cold]
    pub(crate) fn new(kind: LexErrorKind, span: Span) -> Self {
        LexError { kind, span }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LexErrorKind {
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("unterminated template literal")]
    UnterminatedTemplate,
    #[error("unterminated block comment")]
    UnterminatedComment,
    #[error("invalid escape sequence `\\{0}`")]
    InvalidEscape(char),
    #[error("invalid numeric literal `{0}`")]
    InvalidNumber(String),
    #[error("unexpected character `{0}`")]
    UnexpectedChar(char),
}
