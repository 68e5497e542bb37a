//! Grammar productions.

mod expr;
mod function;
mod module_decl;
mod pattern;
mod stmt;

use cbx_ir::{Name, Punct, Span, TokenKind};

use crate::{ParseError, ParseErrorKind, Parser};

/// Words that can never name a binding.
const RESERVED: &[&str] = &[
    "break", "case", "catch", "class", "const", "continue", "debugger", "default", "delete", "do",
    "else", "export", "extends", "finally", "for", "function", "if", "import", "in",
    "instanceof", "new", "return", "super", "switch", "this", "throw", "try", "typeof", "var",
    "void", "while", "with", "null", "true", "false", "enum",
];

pub(crate) fn is_reserved(word: &str) -> bool {
    RESERVED.contains(&word)
}

impl Parser<'_> {
    /// Accept an explicit `;` or an automatically inserted one.
    fn consume_semicolon(&mut self) -> Result<(), ParseError> {
        if self.cursor.eat_punct(Punct::Semi) {
            return Ok(());
        }
        let token = self.cursor.peek();
        if token.newline_before
            || token.kind.is_punct(Punct::RBrace)
            || matches!(token.kind, TokenKind::Eof)
        {
            return Ok(());
        }
        Err(self.cursor.unexpected("`;`"))
    }

    /// A binding identifier: any identifier that is not a reserved word.
    fn parse_binding_ident(&mut self) -> Result<(Name, Span), ParseError> {
        let token = self.cursor.peek();
        match &token.kind {
            TokenKind::Ident(name) if is_reserved(name) => Err(ParseError::new(
                ParseErrorKind::ReservedWord(name.to_string()),
                token.span,
            )),
            TokenKind::Ident(name) if &**name == "await" && self.ctx.in_async => Err(
                ParseError::new(ParseErrorKind::ReservedWord(name.to_string()), token.span),
            ),
            TokenKind::Ident(name) => {
                let name = name.clone();
                self.cursor.bump();
                Ok((name, token.span))
            }
            _ => Err(self.cursor.unexpected("identifier")),
        }
    }

    /// Identifier or reserved word, as allowed after `.` and in export lists.
    fn parse_identifier_name(&mut self) -> Result<Name, ParseError> {
        match self.cursor.kind() {
            TokenKind::Ident(name) => {
                let name = name.clone();
                self.cursor.bump();
                Ok(name)
            }
            _ => Err(self.cursor.unexpected("identifier")),
        }
    }

    /// Whether the current token starts a binding identifier.
    fn at_binding_ident(&self) -> bool {
        matches!(self.cursor.kind(), TokenKind::Ident(name) if !is_reserved(name))
    }
}
