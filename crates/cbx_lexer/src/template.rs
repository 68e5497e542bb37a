//! Template literal scanning.
//!
//! A template body is split into raw text chunks and `${...}` expression
//! ranges. Expression ranges are not lexed here; the parser re-lexes each one
//! at its absolute offset.

use std::ops::Range;

/// Result of scanning a template body (the bytes after the opening backtick).
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct TemplateScan {
    /// Bytes consumed, including the closing backtick.
    pub end: usize,
    /// Raw text chunks; always one more than `exprs`.
    pub texts: Vec<Range<usize>>,
    pub exprs: Vec<Range<usize>>,
}

/// Offset at which scanning ran out of input.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct Unterminated(pub usize);

pub(crate) fn scan_template(src: &[u8]) -> Result<TemplateScan, Unterminated> {
    let mut texts = Vec::new();
    let mut exprs = Vec::new();
    let mut text_start = 0;
    let mut i = 0;
    loop {
        match src.get(i) {
            None => return Err(Unterminated(src.len())),
            Some(b'\\') => i += 2,
            Some(b'`') => {
                texts.push(text_start..i);
                return Ok(TemplateScan {
                    end: i + 1,
                    texts,
                    exprs,
                });
            }
            Some(b'$') if src.get(i + 1) == Some(&b'{') => {
                texts.push(text_start..i);
                let start = i + 2;
                let end = skip_expression(src, start)?;
                exprs.push(start..end);
                i = end + 1;
                text_start = i;
            }
            Some(_) => i += 1,
        }
    }
}

/// Find the `}` closing an embedded expression that starts at `i`.
fn skip_expression(src: &[u8], mut i: usize) -> Result<usize, Unterminated> {
    let mut depth = 0usize;
    loop {
        match src.get(i) {
            None => return Err(Unterminated(src.len())),
            Some(b'{') => depth += 1,
            Some(b'}') => {
                if depth == 0 {
                    return Ok(i);
                }
                depth -= 1;
            }
            Some(&quote @ (b'"' | b'\'')) => {
                i = skip_string(src, i + 1, quote)?;
                continue;
            }
            Some(b'`') => {
                let inner = scan_template(&src[i + 1..])?;
                i += 1 + inner.end;
                continue;
            }
            Some(b'/') if src.get(i + 1) == Some(&b'/') => {
                i = memchr::memchr(b'\n', &src[i..]).map_or(src.len(), |p| i + p);
                continue;
            }
            Some(b'/') if src.get(i + 1) == Some(&b'*') => {
                let body = &src[i + 2..];
                let close = memchr::memmem::find(body, b"*/").ok_or(Unterminated(src.len()))?;
                i += 2 + close + 2;
                continue;
            }
            Some(_) => {}
        }
        i += 1;
    }
}

/// Skip a quoted string whose body starts at `i`; returns the offset after
/// the closing quote.
fn skip_string(src: &[u8], mut i: usize, quote: u8) -> Result<usize, Unterminated> {
    loop {
        match src.get(i) {
            None | Some(b'\n') => return Err(Unterminated(i)),
            Some(b'\\') => i += 2,
            Some(&c) if c == quote => return Ok(i + 1),
            Some(_) => i += 1,
        }
    }
}
