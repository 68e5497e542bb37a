//! Byte-offset source spans.

use std::fmt;
use std::ops::Range;

/// Half-open byte range into a source text.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Default)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    /// Span used for synthesized nodes.
    pub const DUMMY: Span = Span { start: 0, end: 0 };

    #[inline]
    pub const fn new(start: u32, end: u32) -> Self {
        Span { start, end }
    }

    /// Build a span from `usize` offsets, saturating at `u32::MAX`.
    #[inline]
    pub fn from_range(range: Range<usize>) -> Self {
        let clamp = |v: usize| u32::try_from(v).unwrap_or(u32::MAX);
        Span {
            start: clamp(range.start),
            end: clamp(range.end),
        }
    }

    /// Smallest span covering both `self` and `other`.
    #[inline]
    #[must_use]
    pub fn to(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Shift both ends by `offset` bytes.
    #[inline]
    #[must_use]
    pub fn shifted(self, offset: u32) -> Span {
        Span {
            start: self.start.saturating_add(offset),
            end: self.end.saturating_add(offset),
        }
    }

    #[inline]
    pub fn len(self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.end <= self.start
    }

    #[inline]
    pub fn range(self) -> Range<usize> {
        self.start as usize..self.end as usize
    }

    /// 1-based line and column of `start` within `source`.
    pub fn line_col(self, source: &str) -> (usize, usize) {
        let upto = (self.start as usize).min(source.len());
        let prefix = source.get(..upto).unwrap_or(source);
        let line = prefix.bytes().filter(|b| *b == b'\n').count() + 1;
        let col = prefix.rfind('\n').map_or(upto, |nl| upto - nl - 1) + 1;
        (line, col)
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_covers_both() {
        assert_eq!(Span::new(4, 6).to(Span::new(1, 3)), Span::new(1, 6));
    }

    #[test]
    fn line_col_counts_newlines() {
        let src = "let a;\nlet b;\n  oops";
        assert_eq!(Span::new(16, 20).line_col(src), (3, 3));
        assert_eq!(Span::new(0, 1).line_col(src), (1, 1));
    }
}
