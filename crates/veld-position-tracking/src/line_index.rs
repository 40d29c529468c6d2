//! Line index for efficient UTF-16 position calculations.

use crate::Span;

/// Stores line start offsets for position lookups over a borrowed text.
///
/// Conversion rules:
/// - A surrogate-pair code point counts as two UTF-16 units.
/// - Character positions past the physical end of a line clamp to the end
///   of that line, never across the newline.
/// - Out-of-range inputs (line past the last line, byte offset past the
///   buffer) return `None`; callers treat that as a no-op.
#[derive(Debug, Clone)]
pub struct LineIndex {
    /// Byte offset of each line start
    line_starts: Vec<usize>,
    text_len: usize,
}

impl LineIndex {
    /// Create a new index from source text
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        Self { line_starts, text_len: text.len() }
    }

    /// Number of lines (a trailing newline opens one final empty line)
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Byte range of `line`, excluding its terminator
    pub fn line_span(&self, text: &str, line: usize) -> Option<Span> {
        let start = *self.line_starts.get(line)?;
        let mut end = if line + 1 < self.line_starts.len() {
            self.line_starts[line + 1] - 1 // drop the '\n'
        } else {
            text.len()
        };
        if end > start && text.as_bytes().get(end.wrapping_sub(1)) == Some(&b'\r') {
            end -= 1;
        }
        Some(Span::new(start, end))
    }

    /// Convert a byte offset to `(line, UTF-16 character)`.
    ///
    /// Offsets inside a multi-byte character are floored to the character
    /// start; offsets past the end of the buffer are invalid.
    pub fn offset_to_position(&self, text: &str, offset: usize) -> Option<(u32, u32)> {
        if offset > self.text_len {
            return None;
        }
        let line =
            self.line_starts.binary_search(&offset).unwrap_or_else(|i| i.saturating_sub(1));
        let line_start = self.line_starts[line];
        let mut character = 0u32;
        for (i, ch) in text[line_start..].char_indices() {
            if line_start + i >= offset {
                break;
            }
            character += ch.len_utf16() as u32;
        }
        Some((line as u32, character))
    }

    /// Convert `(line, UTF-16 character)` to a byte offset.
    ///
    /// Returns `None` when `line` is past the last line. A character count
    /// past the physical line end clamps to end-of-line.
    pub fn position_to_offset(&self, text: &str, line: u32, character: u32) -> Option<usize> {
        let span = self.line_span(text, line as usize)?;
        let line_text = &text[span.start..span.end];

        let mut units = 0u32;
        for (byte, ch) in line_text.char_indices() {
            if units >= character {
                return Some(span.start + byte);
            }
            units += ch.len_utf16() as u32;
        }
        Some(span.end)
    }

    /// Convert a byte span to an LSP-style `((line, char), (line, char))`
    /// range, clamping the end to the buffer.
    pub fn span_to_range(&self, text: &str, span: Span) -> Option<((u32, u32), (u32, u32))> {
        let start = self.offset_to_position(text, span.start.min(self.text_len))?;
        let end = self.offset_to_position(text, span.end.min(self.text_len))?;
        Some((start, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn index(text: &str) -> LineIndex {
        LineIndex::new(text)
    }

    #[test]
    fn test_ascii_positions() {
        let text = "let a = 1\nlet b = 2\n";
        let idx = index(text);
        assert_eq!(idx.offset_to_position(text, 0), Some((0, 0)));
        assert_eq!(idx.offset_to_position(text, 4), Some((0, 4)));
        assert_eq!(idx.offset_to_position(text, 10), Some((1, 0)));
        assert_eq!(idx.position_to_offset(text, 1, 4), Some(14));
    }

    #[test]
    fn test_utf16_surrogate_pairs() {
        // '𝕍' is U+1D54D: 4 UTF-8 bytes, 2 UTF-16 units.
        let text = "let 𝕍 = 1";
        let idx = index(text);
        // Offset of '=' is 4 + 4 + 1 = 9; UTF-16 column is 4 + 2 + 1 = 7.
        assert_eq!(idx.offset_to_position(text, 9), Some((0, 7)));
        assert_eq!(idx.position_to_offset(text, 0, 7), Some(9));
    }

    #[test]
    fn test_character_clamps_to_line_end() {
        let text = "ab\ncd\n";
        let idx = index(text);
        // Character 99 on line 0 clamps to the end of "ab", not into "cd".
        assert_eq!(idx.position_to_offset(text, 0, 99), Some(2));
        assert_eq!(idx.position_to_offset(text, 1, 99), Some(5));
    }

    #[test]
    fn test_crlf_line_end_excluded() {
        let text = "ab\r\ncd";
        let idx = index(text);
        assert_eq!(idx.position_to_offset(text, 0, 99), Some(2));
        assert_eq!(idx.position_to_offset(text, 1, 0), Some(4));
    }

    #[test]
    fn test_out_of_range_line_is_invalid() {
        let text = "one line";
        let idx = index(text);
        assert_eq!(idx.position_to_offset(text, 5, 0), None);
        assert_eq!(idx.offset_to_position(text, text.len() + 1), None);
    }

    #[test]
    fn test_offset_at_end_of_buffer() {
        let text = "ab\ncd";
        let idx = index(text);
        assert_eq!(idx.offset_to_position(text, 5), Some((1, 2)));
    }

    proptest! {
        #[test]
        fn prop_round_trip_all_char_boundaries(text in "[a-zA-Z0-9 àé𝕍\\n]{0,80}") {
            let idx = LineIndex::new(&text);
            for (offset, _) in text.char_indices() {
                let (line, character) = idx.offset_to_position(&text, offset).unwrap();
                let back = idx.position_to_offset(&text, line, character).unwrap();
                prop_assert_eq!(back, offset);
            }
            let end = text.len();
            let (line, character) = idx.offset_to_position(&text, end).unwrap();
            prop_assert_eq!(idx.position_to_offset(&text, line, character).unwrap(), end);
        }
    }
}
