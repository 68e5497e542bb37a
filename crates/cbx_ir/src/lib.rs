//! Shared syntax definitions for casebox.
//!
//! Everything downstream of the lexer speaks in these types: [`Span`] for
//! source locations, [`Token`] for the lexed stream and the [`ast`] module
//! for parsed programs.

pub mod ast;
mod span;
mod token;

pub use span::Span;
pub use token::{Comment, Punct, TemplateLit, Token, TokenKind, TokenList};

/// Interned-by-sharing identifier or string payload.
///
/// Scripts are parsed and executed on a single thread per test case, so
/// reference counting without atomics is enough.
pub type Name = std::rc::Rc<str>;
