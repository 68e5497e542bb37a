//! Token cursor.

use cbx_ir::{Punct, Span, Token, TokenKind, TokenList};

use crate::ParseError;

/// Position within a lexed token list.
///
/// The list always ends with `Eof`, and the cursor never moves past it, so
/// [`Cursor::peek`] is always valid.
pub(crate) struct Cursor<'a> {
    tokens: &'a TokenList,
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(tokens: &'a TokenList) -> Self {
        Cursor { tokens, pos: 0 }
    }

    pub fn tokens(&self) -> &'a TokenList {
        self.tokens
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn set_position(&mut self, pos: usize) {
        self.pos = pos.min(self.tokens.tokens.len().saturating_sub(1));
    }

    #[inline]
    pub fn peek(&self) -> &'a Token {
        self.nth(0)
    }

    /// Token `n` positions ahead, clamped to `Eof`.
    #[inline]
    pub fn nth(&self, n: usize) -> &'a Token {
        let list = &self.tokens.tokens;
        let idx = (self.pos + n).min(list.len().saturating_sub(1));
        &list[idx]
    }

    /// Token at absolute index `idx`, clamped to `Eof`.
    #[inline]
    pub fn at(&self, idx: usize) -> &'a Token {
        let list = &self.tokens.tokens;
        &list[idx.min(list.len().saturating_sub(1))]
    }

    #[inline]
    pub fn kind(&self) -> &'a TokenKind {
        &self.peek().kind
    }

    /// Span of the most recently consumed token.
    pub fn prev_span(&self) -> Span {
        if self.pos == 0 {
            return self.peek().span;
        }
        self.tokens.tokens[self.pos - 1].span
    }

    #[inline]
    pub fn at_eof(&self) -> bool {
        matches!(self.kind(), TokenKind::Eof)
    }

    /// Consume the current token and return it.
    pub fn bump(&mut self) -> &'a Token {
        let token = self.peek();
        if !matches!(token.kind, TokenKind::Eof) {
            self.pos += 1;
        }
        token
    }

    #[inline]
    pub fn is_punct(&self, punct: Punct) -> bool {
        self.kind().is_punct(punct)
    }

    #[inline]
    pub fn is_punct_at(&self, n: usize, punct: Punct) -> bool {
        self.nth(n).kind.is_punct(punct)
    }

    pub fn eat_punct(&mut self, punct: Punct) -> bool {
        if self.is_punct(punct) {
            self.bump();
            true
        } else {
            false
        }
    }

    pub fn expect_punct(&mut self, punct: Punct) -> Result<Span, ParseError> {
        if self.is_punct(punct) {
            Ok(self.bump().span)
        } else {
            Err(self.unexpected(format!("`{punct}`")))
        }
    }

    #[inline]
    pub fn is_word(&self, word: &str) -> bool {
        self.kind().ident() == Some(word)
    }

    #[inline]
    pub fn is_word_at(&self, n: usize, word: &str) -> bool {
        self.nth(n).kind.ident() == Some(word)
    }

    pub fn eat_word(&mut self, word: &str) -> bool {
        if self.is_word(word) {
            self.bump();
            true
        } else {
            false
        }
    }

    pub fn expect_word(&mut self, word: &str) -> Result<Span, ParseError> {
        if self.is_word(word) {
            Ok(self.bump().span)
        } else {
            Err(self.unexpected(format!("`{word}`")))
        }
    }

    /// Index of the token matching the opening bracket at `open`, if any.
    pub fn matching_close(&self, open: usize) -> Option<usize> {
        let list = &self.tokens.tokens;
        let mut depth = 0usize;
        for (idx, token) in list.iter().enumerate().skip(open) {
            match &token.kind {
                TokenKind::Punct(Punct::LParen | Punct::LBracket | Punct::LBrace) => depth += 1,
                TokenKind::Punct(Punct::RParen | Punct::RBracket | Punct::RBrace) => {
                    depth = depth.checked_sub(1)?;
                    if depth == 0 {
                        return Some(idx);
                    }
                }
                TokenKind::Eof => return None,
                _ => {}
            }
        }
        None
    }

    #[cold]
    pub fn unexpected(&self, expected: impl Into<String>) -> ParseError {
        let token = self.peek();
        ParseError::unexpected(token.kind.describe(), expected, token.span)
    }
}
