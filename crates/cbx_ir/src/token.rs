//! Lexed token stream.

use std::fmt;

use crate::{Name, Span};

/// A single token with its position.
#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    /// A line terminator appeared between the previous token and this one.
    ///
    /// Drives automatic semicolon insertion and the restricted productions
    /// (`return`, `throw`, postfix `++`/`--`).
    pub newline_before: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    /// Identifier or reserved word; the parser decides which.
    Ident(Name),
    Number(f64),
    /// String literal with escapes already cooked.
    Str(Name),
    Template(TemplateLit),
    Punct(Punct),
    Eof,
}

impl TokenKind {
    /// Identifier text, if this is an identifier or keyword.
    #[inline]
    pub fn ident(&self) -> Option<&str> {
        match self {
            TokenKind::Ident(name) => Some(name),
            _ => None,
        }
    }

    #[inline]
    pub fn is_punct(&self, punct: Punct) -> bool {
        matches!(self, TokenKind::Punct(p) if *p == punct)
    }

    /// Human readable description used in parse errors.
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Ident(name) => format!("`{name}`"),
            TokenKind::Number(n) => format!("number `{n}`"),
            TokenKind::Str(_) => "string literal".to_string(),
            TokenKind::Template(_) => "template literal".to_string(),
            TokenKind::Punct(p) => format!("`{p}`"),
            TokenKind::Eof => "end of input".to_string(),
        }
    }
}

/// Template literal split into its cooked text chunks and the spans of the
/// embedded `${...}` expressions (absolute offsets into the source).
///
/// Invariant: `quasis.len() == exprs.len() + 1`.
#[derive(Clone, Debug, PartialEq)]
pub struct TemplateLit {
    pub quasis: Vec<Name>,
    pub exprs: Vec<Span>,
}

/// A comment kept out of the token stream.
///
/// The parser consults block comments between `import(` and its argument for
/// loading-strategy annotations.
#[derive(Clone, Debug, PartialEq)]
pub struct Comment {
    pub span: Span,
    pub text: Name,
    pub block: bool,
}

/// Output of the lexer: tokens (always terminated by `Eof`) plus comments.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TokenList {
    pub tokens: Vec<Token>,
    pub comments: Vec<Comment>,
}

impl TokenList {
    /// Comments that lie entirely within `[start, end)`.
    pub fn comments_between(&self, start: u32, end: u32) -> impl Iterator<Item = &Comment> {
        self.comments
            .iter()
            .filter(move |c| c.span.start >= start && c.span.end <= end)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Punct {
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Semi,
    Comma,
    Dot,
    Ellipsis,
    Question,
    QuestionDot,
    Colon,
    Arrow,
    Plus,
    Minus,
    Star,
    StarStar,
    Slash,
    Percent,
    PlusPlus,
    MinusMinus,
    Bang,
    Tilde,
    Amp,
    Pipe,
    Caret,
    AmpAmp,
    PipePipe,
    QuestionQuestion,
    Shl,
    Shr,
    UShr,
    Lt,
    Gt,
    LtEq,
    GtEq,
    EqEq,
    NotEq,
    EqEqEq,
    NotEqEq,
    Eq,
    PlusEq,
    MinusEq,
    StarEq,
    StarStarEq,
    SlashEq,
    PercentEq,
    AmpEq,
    PipeEq,
    CaretEq,
    ShlEq,
    ShrEq,
    UShrEq,
    AmpAmpEq,
    PipePipeEq,
    QuestionQuestionEq,
}

impl Punct {
    pub fn as_str(self) -> &'static str {
        match self {
            Punct::LParen => "(",
            Punct::RParen => ")",
            Punct::LBrace => "{",
            Punct::RBrace => "}",
            Punct::LBracket => "[",
            Punct::RBracket => "]",
            Punct::Semi => ";",
            Punct::Comma => ",",
            Punct::Dot => ".",
            Punct::Ellipsis => "...",
            Punct::Question => "?",
            Punct::QuestionDot => "?.",
            Punct::Colon => ":",
            Punct::Arrow => "=>",
            Punct::Plus => "+",
            Punct::Minus => "-",
            Punct::Star => "*",
            Punct::StarStar => "**",
            Punct::Slash => "/",
            Punct::Percent => "%",
            Punct::PlusPlus => "++",
            Punct::MinusMinus => "--",
            Punct::Bang => "!",
            Punct::Tilde => "~",
            Punct::Amp => "&",
            Punct::Pipe => "|",
            Punct::Caret => "^",
            Punct::AmpAmp => "&&",
            Punct::PipePipe => "||",
            Punct::QuestionQuestion => "??",
            Punct::Shl => "<<",
            Punct::Shr => ">>",
            Punct::UShr => ">>>",
            Punct::Lt => "<",
            Punct::Gt => ">",
            Punct::LtEq => "<=",
            Punct::GtEq => ">=",
            Punct::EqEq => "==",
            Punct::NotEq => "!=",
            Punct::EqEqEq => "===",
            Punct::NotEqEq => "!==",
            Punct::Eq => "=",
            Punct::PlusEq => "+=",
            Punct::MinusEq => "-=",
            Punct::StarEq => "*=",
            Punct::StarStarEq => "**=",
            Punct::SlashEq => "/=",
            Punct::PercentEq => "%=",
            Punct::AmpEq => "&=",
            Punct::PipeEq => "|=",
            Punct::CaretEq => "^=",
            Punct::ShlEq => "<<=",
            Punct::ShrEq => ">>=",
            Punct::UShrEq => ">>>=",
            Punct::AmpAmpEq => "&&=",
            Punct::PipePipeEq => "||=",
            Punct::QuestionQuestionEq => "??=",
        }
    }
}

impl fmt::Display for Punct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
