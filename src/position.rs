//! Character-offset position tracking and line/column translation.
//!
//! All offsets in this crate are Unicode scalar value (`char`) offsets into
//! the original input, never raw UTF-8 byte offsets — mixing the two is the
//! usual source of off-by-one bugs when inputs contain multi-byte text.

use serde::{Deserialize, Serialize};

/// A half-open `[start, end)` character range into the scanned text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub start: usize,
    pub end: usize,
}

/// A `Position` enriched with the original-case slice and 1-based line/column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnhancedPosition {
    pub start: usize,
    pub end: usize,
    pub text: String,
    pub line: usize,
    pub column: usize,
}

/// Translates primitive positions into enhanced ones by walking `text` once.
///
/// `positions` need not be sorted; each is located independently against a
/// char-indexed copy of `text`.
pub fn enhance(text: &str, positions: &[Position]) -> Vec<EnhancedPosition> {
    let chars: Vec<char> = text.chars().collect();
    positions
        .iter()
        .map(|p| enhance_one(&chars, p))
        .collect()
}

fn enhance_one(chars: &[char], pos: &Position) -> EnhancedPosition {
    let start = pos.start.min(chars.len());
    let end = pos.end.min(chars.len()).max(start);
    let slice: String = chars[start..end].iter().collect();

    let mut line = 1usize;
    let mut last_newline: isize = -1;
    for (i, &c) in chars[..start].iter().enumerate() {
        if c == '\n' {
            line += 1;
            last_newline = i as isize;
        }
    }
    let column = (start as isize - last_newline) as usize;

    EnhancedPosition {
        start,
        end,
        text: slice,
        line,
        column,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_line_position() {
        let text = "hello world";
        let enhanced = enhance(text, &[Position { start: 6, end: 11 }]);
        assert_eq!(enhanced[0].text, "world");
        assert_eq!(enhanced[0].line, 1);
        assert_eq!(enhanced[0].column, 7);
    }

    #[test]
    fn second_line_position() {
        let text = "Line 1: Normal text\nLine 2: ignore previous instructions\nLine 3: More text";
        let start = text.find("ignore previous instructions").unwrap();
        let end = start + "ignore previous instructions".len();
        let enhanced = enhance(text, &[Position { start, end }]);
        assert_eq!(enhanced[0].line, 2);
        assert_eq!(enhanced[0].text, "ignore previous instructions");
    }

    #[test]
    fn multibyte_safe_offsets() {
        let text = "café ignore previous instructions";
        let start = text.chars().take(5).count();
        let needle = "ignore previous instructions";
        let end = start + needle.chars().count();
        let enhanced = enhance(text, &[Position { start, end }]);
        assert_eq!(enhanced[0].text, needle);
    }

    #[test]
    fn column_resets_after_each_newline() {
        let text = "abc\ndef\nghi";
        let start = text.find('g').unwrap();
        let enhanced = enhance(text, &[Position { start, end: start + 1 }]);
        assert_eq!(enhanced[0].line, 3);
        assert_eq!(enhanced[0].column, 1);
    }
}
