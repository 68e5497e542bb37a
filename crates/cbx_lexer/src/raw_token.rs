//! Raw tokens recognized by logos before cooking.

use logos::Logos;

use crate::template::scan_template;

#[derive(Logos, Debug, Clone, Copy, PartialEq)]
#[logos(skip r"[ \t\r\x0B\x0C]+")]
pub(crate) enum RawToken {
    #[token("\n")]
    Newline,

    #[regex(r"//[^\n]*")]
    LineComment,

    #[token("/*", block_comment)]
    BlockComment,

    #[token("`", template_body)]
    Template,

    #[regex(r"[A-Za-z_$][A-Za-z0-9_$]*")]
    Ident,

    #[regex(r"[0-9][0-9_]*(\.[0-9_]*)?([eE][+-]?[0-9_]+)?")]
    #[regex(r"\.[0-9][0-9_]*([eE][+-]?[0-9_]+)?")]
    Decimal,

    #[regex(r"0[xX][0-9a-fA-F][0-9a-fA-F_]*")]
    Hex,

    #[regex(r"0[oO][0-7][0-7_]*")]
    Octal,

    #[regex(r"0[bB][01][01_]*")]
    Binary,

    #[regex(r#""([^"\\\n]|\\[^\r]|\\\r\n?)*""#)]
    #[regex(r#"'([^'\\\n]|\\[^\r]|\\\r\n?)*'"#)]
    Str,

    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(";")]
    Semi,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token("...")]
    Ellipsis,
    #[token("?")]
    Question,
    #[token("?.")]
    QuestionDot,
    #[token(":")]
    Colon,
    #[token("=>")]
    Arrow,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("**")]
    StarStar,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("++")]
    PlusPlus,
    #[token("--")]
    MinusMinus,
    #[token("!")]
    Bang,
    #[token("~")]
    Tilde,
    #[token("&")]
    Amp,
    #[token("|")]
    Pipe,
    #[token("^")]
    Caret,
    #[token("&&")]
    AmpAmp,
    #[token("||")]
    PipePipe,
    #[token("??")]
    QuestionQuestion,
    #[token("<<")]
    Shl,
    #[token(">>")]
    Shr,
    #[token(">>>")]
    UShr,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("<=")]
    LtEq,
    #[token(">=")]
    GtEq,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("===")]
    EqEqEq,
    #[token("!==")]
    NotEqEq,
    #[token("=")]
    Eq,
    #[token("+=")]
    PlusEq,
    #[token("-=")]
    MinusEq,
    #[token("*=")]
    StarEq,
    #[token("**=")]
    StarStarEq,
    #[token("/=")]
    SlashEq,
    #[token("%=")]
    PercentEq,
    #[token("&=")]
    AmpEq,
    #[token("|=")]
    PipeEq,
    #[token("^=")]
    CaretEq,
    #[token("<<=")]
    ShlEq,
    #[token(">>=")]
    ShrEq,
    #[token(">>>=")]
    UShrEq,
    #[token("&&=")]
    AmpAmpEq,
    #[token("||=")]
    PipePipeEq,
    #[token("??=")]
    QuestionQuestionEq,
}

/// Consume a block comment body through its closing `*/`.
fn block_comment(lex: &mut logos::Lexer<'_, RawToken>) -> bool {
    let rest = lex.remainder();
    match memchr::memmem::find(rest.as_bytes(), b"*/") {
        Some(pos) => {
            lex.bump(pos + 2);
            true
        }
        None => {
            lex.bump(rest.len());
            false
        }
    }
}

/// Consume a template literal body through its closing backtick.
fn template_body(lex: &mut logos::Lexer<'_, RawToken>) -> bool {
    let rest = lex.remainder();
    match scan_template(rest.as_bytes()) {
        Ok(scan) => {
            lex.bump(scan.end);
            true
        }
        Err(_) => {
            lex.bump(rest.len());
            false
        }
    }
}
