//! Turning raw literal slices into values.

use crate::lex_error::LexErrorKind;

/// Parse a decimal, hex, octal or binary literal slice.
pub(crate) fn parse_number(slice: &str) -> Result<f64, LexErrorKind> {
    let cleaned = slice.replace('_', "");
    let radix = match cleaned.get(..2) {
        Some("0x" | "0X") => Some(16),
        Some("0o" | "0O") => Some(8),
        Some("0b" | "0B") => Some(2),
        _ => None,
    };
    let parsed = match radix {
        Some(radix) => u64::from_str_radix(&cleaned[2..], radix).ok().map(|n| n as f64),
        None => cleaned.parse::<f64>().ok(),
    };
    parsed.ok_or_else(|| LexErrorKind::InvalidNumber(slice.to_string()))
}

/// Resolve escape sequences in a string or template body.
///
/// Line continuations (`\` followed by a line break) vanish. `in_template`
/// additionally accepts `` \` `` and `\$`.
pub(crate) fn cook_escapes(raw: &str, in_template: bool) -> Result<String, LexErrorKind> {
    if !raw.contains('\\') {
        return Ok(raw.to_string());
    }
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(escape) = chars.next() else {
            return Err(LexErrorKind::InvalidEscape('\\'));
        };
        match escape {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'v' => out.push('\u{b}'),
            '0' => out.push('\0'),
            '\'' | '"' | '\\' => out.push(escape),
            '`' | '$' if in_template => out.push(escape),
            '\n' => {}
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
            }
            'x' => {
                let hex: String = chars.by_ref().take(2).collect();
                out.push(code_point(&hex, 'x')?);
            }
            'u' => {
                let hex: String = if chars.peek() == Some(&'{') {
                    chars.next();
                    let digits: String = chars.by_ref().take_while(|c| *c != '}').collect();
                    digits
                } else {
                    chars.by_ref().take(4).collect()
                };
                out.push(code_point(&hex, 'u')?);
            }
            other if other.is_ascii_alphanumeric() => {
                return Err(LexErrorKind::InvalidEscape(other));
            }
            other => out.push(other),
        }
    }
    Ok(out)
}

fn code_point(hex: &str, escape: char) -> Result<char, LexErrorKind> {
    u32::from_str_radix(hex, 16)
        .ok()
        .and_then(char::from_u32)
        .ok_or(LexErrorKind::InvalidEscape(escape))
}
