//! Lexer for the script language run inside the sandbox.
//!
//! Raw tokens come from a logos automaton ([`raw_token`]); this module cooks
//! them into [`TokenKind`]s, tracks line breaks for semicolon insertion and
//! keeps comments aside for annotation lookups.

mod cook;
mod lex_error;
mod raw_token;
mod template;

use cbx_ir::{Comment, Name, Punct, Span, TemplateLit, Token, TokenKind, TokenList};
use logos::Logos;

pub use lex_error::{LexError, LexErrorKind};

use cook::{cook_escapes, parse_number};
use raw_token::RawToken;
use template::scan_template;

/// Lex a whole source text.
pub fn lex(source: &str) -> Result<TokenList, LexError> {
    lex_with_offset(source, 0)
}

/// Lex `source`, reporting spans shifted by `offset`.
///
/// Used for the expression holes of template literals, which are lexed
/// separately but must point into the enclosing file.
pub fn lex_with_offset(source: &str, offset: u32) -> Result<TokenList, LexError> {
    let (body, bom) = match source.strip_prefix('\u{feff}') {
        Some(rest) => (rest, 3),
        None => (strip_hashbang(source), 0),
    };
    let skipped = source.len() - body.len() - bom;
    let base = offset + u32::try_from(skipped + bom).unwrap_or(0);

    let mut result = TokenList::default();
    let mut logos = RawToken::lexer(body);
    let mut newline_before = false;

    while let Some(token_result) = logos.next() {
        let span = Span::from_range(logos.span()).shifted(base);
        let slice = logos.slice();

        let raw = match token_result {
            Ok(raw) => raw,
            Err(()) => return Err(classify_error(slice, span)),
        };

        match raw {
            RawToken::Newline => newline_before = true,
            RawToken::LineComment => result.comments.push(Comment {
                span,
                text: Name::from(&slice[2..]),
                block: false,
            }),
            RawToken::BlockComment => {
                let text = &slice[2..slice.len() - 2];
                if text.contains('\n') {
                    newline_before = true;
                }
                result.comments.push(Comment {
                    span,
                    text: Name::from(text),
                    block: true,
                });
            }
            _ => {
                let kind = convert_token(raw, slice, span)?;
                result.tokens.push(Token {
                    kind,
                    span,
                    newline_before,
                });
                newline_before = false;
            }
        }
    }

    let end = base + u32::try_from(body.len()).unwrap_or(u32::MAX - base);
    result.tokens.push(Token {
        kind: TokenKind::Eof,
        span: Span::new(end, end),
        newline_before,
    });
    Ok(result)
}

fn strip_hashbang(source: &str) -> &str {
    if source.starts_with("#!") {
        let line_end = memchr::memchr(b'\n', source.as_bytes()).unwrap_or(source.len());
        &source[line_end..]
    } else {
        source
    }
}

#[cold]
fn classify_error(slice: &str, span: Span) -> LexError {
    let kind = match slice.chars().next() {
        Some('"' | '\'') => LexErrorKind::UnterminatedString,
        Some('`') => LexErrorKind::UnterminatedTemplate,
        Some('/') if slice.starts_with("/*") => LexErrorKind::UnterminatedComment,
        Some(c) => LexErrorKind::UnexpectedChar(c),
        None => LexErrorKind::UnexpectedChar('\0'),
    };
    LexError::new(kind, span)
}

fn convert_token(raw: RawToken, slice: &str, span: Span) -> Result<TokenKind, LexError> {
    let kind = match raw {
        RawToken::Ident => TokenKind::Ident(Name::from(slice)),
        RawToken::Decimal | RawToken::Hex | RawToken::Octal | RawToken::Binary => {
            TokenKind::Number(parse_number(slice).map_err(|kind| LexError::new(kind, span))?)
        }
        RawToken::Str => {
            let body = &slice[1..slice.len() - 1];
            let cooked = cook_escapes(body, false).map_err(|kind| LexError::new(kind, span))?;
            TokenKind::Str(Name::from(cooked))
        }
        RawToken::Template => TokenKind::Template(cook_template(slice, span)?),
        other => match punct(other) {
            Some(p) => TokenKind::Punct(p),
            None => return Err(LexError::new(LexErrorKind::UnexpectedChar('\n'), span)),
        },
    };
    Ok(kind)
}

fn cook_template(slice: &str, span: Span) -> Result<TemplateLit, LexError> {
    // `slice` includes both backticks.
    let body = &slice[1..];
    let scan = scan_template(body.as_bytes())
        .map_err(|_| LexError::new(LexErrorKind::UnterminatedTemplate, span))?;
    let body_start = span.start + 1;

    let quasis = scan
        .texts
        .iter()
        .map(|range| {
            cook_escapes(&body[range.clone()], true)
                .map(Name::from)
                .map_err(|kind| LexError::new(kind, span))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let exprs = scan
        .exprs
        .iter()
        .map(|range| Span::from_range(range.clone()).shifted(body_start))
        .collect();

    Ok(TemplateLit { quasis, exprs })
}

fn punct(raw: RawToken) -> Option<Punct> {
    let punct = match raw {
        RawToken::LParen => Punct::LParen,
        RawToken::RParen => Punct::RParen,
        RawToken::LBrace => Punct::LBrace,
        RawToken::RBrace => Punct::RBrace,
        RawToken::LBracket => Punct::LBracket,
        RawToken::RBracket => Punct::RBracket,
        RawToken::Semi => Punct::Semi,
        RawToken::Comma => Punct::Comma,
        RawToken::Dot => Punct::Dot,
        RawToken::Ellipsis => Punct::Ellipsis,
        RawToken::Question => Punct::Question,
        RawToken::QuestionDot => Punct::QuestionDot,
        RawToken::Colon => Punct::Colon,
        RawToken::Arrow => Punct::Arrow,
        RawToken::Plus => Punct::Plus,
        RawToken::Minus => Punct::Minus,
        RawToken::Star => Punct::Star,
        RawToken::StarStar => Punct::StarStar,
        RawToken::Slash => Punct::Slash,
        RawToken::Percent => Punct::Percent,
        RawToken::PlusPlus => Punct::PlusPlus,
        RawToken::MinusMinus => Punct::MinusMinus,
        RawToken::Bang => Punct::Bang,
        RawToken::Tilde => Punct::Tilde,
        RawToken::Amp => Punct::Amp,
        RawToken::Pipe => Punct::Pipe,
        RawToken::Caret => Punct::Caret,
        RawToken::AmpAmp => Punct::AmpAmp,
        RawToken::PipePipe => Punct::PipePipe,
        RawToken::QuestionQuestion => Punct::QuestionQuestion,
        RawToken::Shl => Punct::Shl,
        RawToken::Shr => Punct::Shr,
        RawToken::UShr => Punct::UShr,
        RawToken::Lt => Punct::Lt,
        RawToken::Gt => Punct::Gt,
        RawToken::LtEq => Punct::LtEq,
        RawToken::GtEq => Punct::GtEq,
        RawToken::EqEq => Punct::EqEq,
        RawToken::NotEq => Punct::NotEq,
        RawToken::EqEqEq => Punct::EqEqEq,
        RawToken::NotEqEq => Punct::NotEqEq,
        RawToken::Eq => Punct::Eq,
        RawToken::PlusEq => Punct::PlusEq,
        RawToken::MinusEq => Punct::MinusEq,
        RawToken::StarEq => Punct::StarEq,
        RawToken::StarStarEq => Punct::StarStarEq,
        RawToken::SlashEq => Punct::SlashEq,
        RawToken::PercentEq => Punct::PercentEq,
        RawToken::AmpEq => Punct::AmpEq,
        RawToken::PipeEq => Punct::PipeEq,
        RawToken::CaretEq => Punct::CaretEq,
        RawToken::ShlEq => Punct::ShlEq,
        RawToken::ShrEq => Punct::ShrEq,
        RawToken::UShrEq => Punct::UShrEq,
        RawToken::AmpAmpEq => Punct::AmpAmpEq,
        RawToken::PipePipeEq => Punct::PipePipeEq,
        RawToken::QuestionQuestionEq => Punct::QuestionQuestionEq,
        RawToken::Newline
        | RawToken::LineComment
        | RawToken::BlockComment
        | RawToken::Template
        | RawToken::Ident
        | RawToken::Decimal
        | RawToken::Hex
        | RawToken::Octal
        | RawToken::Binary
        | RawToken::Str => return None,
    };
    Some(punct)
}

#[cfg(test)]
mod tests;
