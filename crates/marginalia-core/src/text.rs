//! Char-offset text helpers.
//!
//! Every offset exchanged by this crate is a count of Unicode scalar values
//! (chars), never bytes or UTF-16 units. These helpers do the byte <-> char
//! bookkeeping so the rest of the crate can slice and search in char space.

use std::ops::Range;

use ropey::Rope;

/// Length of `text` in chars (fast path for ASCII).
#[inline]
pub fn char_len(text: &str) -> usize {
    if text.is_ascii() {
        text.len()
    } else {
        text.chars().count()
    }
}

/// Convert a char offset to a byte offset. Offsets past the end clamp to `text.len()`.
pub fn char_to_byte(text: &str, char_offset: usize) -> usize {
    if text.is_ascii() {
        return char_offset.min(text.len());
    }
    text.char_indices()
        .nth(char_offset)
        .map(|(byte, _)| byte)
        .unwrap_or(text.len())
}

/// Convert a byte offset (on a char boundary) to a char offset.
pub fn byte_to_char(text: &str, byte_offset: usize) -> usize {
    let byte_offset = byte_offset.min(text.len());
    if text.is_ascii() {
        return byte_offset;
    }
    char_len(&text[..byte_offset])
}

/// Slice `text` by char range. Returns None if the range is inverted or out of bounds.
pub fn slice_chars(text: &str, range: Range<usize>) -> Option<&str> {
    if range.start > range.end || range.end > char_len(text) {
        return None;
    }
    let start = char_to_byte(text, range.start);
    let end = char_to_byte(text, range.end);
    Some(&text[start..end])
}

/// Char offset of the first occurrence of `needle` in `haystack`.
///
/// An empty needle never matches.
pub fn find_chars(haystack: &str, needle: &str) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }
    haystack
        .find(needle)
        .map(|byte| byte_to_char(haystack, byte))
}

/// Lowercase `text`, keeping a map from each folded char back to the char
/// index it came from in the original.
///
/// Case folding can change lengths ('İ' lowercases to two chars), so the map
/// is needed to translate a match in folded space back to original offsets.
pub fn fold_case(text: &str) -> (String, Vec<usize>) {
    let mut folded = String::with_capacity(text.len());
    let mut origin = Vec::with_capacity(text.len());
    for (idx, ch) in text.chars().enumerate() {
        for lower in ch.to_lowercase() {
            folded.push(lower);
            origin.push(idx);
        }
    }
    (folded, origin)
}

/// Case-insensitive search. Returns the matched char range in `haystack`.
pub fn find_chars_ignore_case(haystack: &str, needle: &str) -> Option<Range<usize>> {
    if needle.is_empty() {
        return None;
    }
    let (folded_hay, origin) = fold_case(haystack);
    let (folded_needle, _) = fold_case(needle);
    let start = find_chars(&folded_hay, &folded_needle)?;
    let end = start + char_len(&folded_needle);
    let orig_start = *origin.get(start)?;
    let orig_end = origin.get(end - 1)? + 1;
    Some(orig_start..orig_end)
}

/// True if `a` and `b` are equal after lowercasing.
pub fn eq_ignore_case(a: &str, b: &str) -> bool {
    a == b || a.chars().flat_map(char::to_lowercase).eq(b.chars().flat_map(char::to_lowercase))
}

/// Line-addressed view of a document.
///
/// Lines are the document split on `\n` alone. A `\r` before the break, form
/// feeds and the Unicode separators stay part of the line's content, so line
/// numbers agree with any caller that numbers lines by splitting on `\n`.
#[derive(Debug, Clone)]
pub struct LineIndex {
    rope: Rope,
    /// Char offset where each line starts.
    starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(
            text.chars()
                .enumerate()
                .filter(|&(_, ch)| ch == '\n')
                .map(|(idx, _)| idx + 1),
        );
        Self {
            rope: Rope::from_str(text),
            starts,
        }
    }

    /// Number of lines. An empty document has one (empty) line.
    pub fn len_lines(&self) -> usize {
        self.starts.len()
    }

    pub fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    /// Char offset of the start of the 0-based `line`, if it exists.
    pub fn line_start(&self, line: usize) -> Option<usize> {
        self.starts.get(line).copied()
    }

    /// Char offset of the `\n` ending the 0-based `line`, or the document end
    /// for the last line.
    pub fn line_end(&self, line: usize) -> Option<usize> {
        self.line_start(line)?;
        Some(match self.starts.get(line + 1) {
            Some(next) => next - 1,
            None => self.rope.len_chars(),
        })
    }

    /// Content of the 0-based `line` without its `\n`.
    pub fn line(&self, line: usize) -> Option<String> {
        let start = self.line_start(line)?;
        let end = self.line_end(line)?;
        Some(self.rope.slice(start..end).to_string())
    }

    /// Slice by char range, None if out of bounds.
    pub fn slice(&self, range: Range<usize>) -> Option<String> {
        if range.start > range.end || range.end > self.rope.len_chars() {
            return None;
        }
        Some(self.rope.slice(range).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_char_byte_conversion() {
        let text = "héllo wörld";
        assert_eq!(char_to_byte(text, 2), 3);
        assert_eq!(byte_to_char(text, 3), 2);
        assert_eq!(char_to_byte(text, 100), text.len());
    }

    #[test]
    fn test_slice_chars() {
        let text = "日本語のテキスト";
        assert_eq!(slice_chars(text, 0..3), Some("日本語"));
        assert_eq!(slice_chars(text, 3..2), None);
        assert_eq!(slice_chars(text, 0..99), None);
    }

    #[test]
    fn test_find_chars() {
        assert_eq!(find_chars("añb needle", "needle"), Some(4));
        assert_eq!(find_chars("abc", ""), None);
        assert_eq!(find_chars("abc", "x"), None);
    }

    #[test]
    fn test_find_ignore_case() {
        assert_eq!(find_chars_ignore_case("The Recieve Error", "recieve"), Some(4..11));
        assert_eq!(find_chars_ignore_case("abc", "ABC"), Some(0..3));
        assert_eq!(find_chars_ignore_case("abc", "d"), None);
    }

    #[test]
    fn test_fold_case_expanding_char() {
        // 'İ' lowercases to two chars; the match must still map back to one char.
        let range = find_chars_ignore_case("xİy", "y").unwrap();
        assert_eq!(range, 2..3);
    }

    #[test]
    fn test_line_index() {
        let index = LineIndex::new("Line one\nLine two\nLine three");
        assert_eq!(index.len_lines(), 3);
        assert_eq!(index.line_start(1), Some(9));
        assert_eq!(index.line(1).as_deref(), Some("Line two"));
        assert_eq!(index.line_start(3), None);
        assert_eq!(index.slice(9..13).as_deref(), Some("Line"));
        assert_eq!(index.line_end(0), Some(8));

        let crlf = LineIndex::new("ab\r\ncd");
        assert_eq!(crlf.line(0).as_deref(), Some("ab\r"));
        assert_eq!(crlf.line_start(1), Some(4));
    }

    #[test]
    fn test_only_newline_breaks_lines() {
        let index = LineIndex::new("Intro\u{2028}continued\x0Cstill one\nSecond\r\n");
        assert_eq!(index.len_lines(), 3);
        assert_eq!(index.line(0).as_deref(), Some("Intro\u{2028}continued\x0Cstill one"));
        assert_eq!(index.line_start(1), Some(26));
        assert_eq!(index.line(1).as_deref(), Some("Second\r"));
        assert_eq!(index.line(2).as_deref(), Some(""));
        assert_eq!(index.line_end(2), Some(34));
    }
}
