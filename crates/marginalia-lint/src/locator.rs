//! Line-addressed text → document char offsets.
//!
//! The model reports errors as `(lineStart, lineEnd, text)`. The text is
//! searched for inside those lines only, case-sensitively first.

use std::ops::Range;

use marginalia_core::text::{
    LineIndex, char_len, eq_ignore_case, find_chars, find_chars_ignore_case, slice_chars,
};

/// A document prepared for line-addressed lookups.
#[derive(Debug, Clone)]
pub struct LintDocument {
    content: String,
    lines: LineIndex,
}

impl LintDocument {
    pub fn new(content: impl Into<String>) -> Self {
        let content = content.into();
        let lines = LineIndex::new(&content);
        Self { content, lines }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn lines(&self) -> &LineIndex {
        &self.lines
    }

    pub fn line_count(&self) -> usize {
        self.lines.len_lines()
    }
}

/// Where the model says the text is: 1-based inclusive lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineQuery<'a> {
    pub line_start: usize,
    pub line_end: usize,
    pub text: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocateMatch {
    Exact,
    CaseInsensitive,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedSpan {
    pub start_offset: usize,
    pub end_offset: usize,
    pub matched: LocateMatch,
}

impl LocatedSpan {
    pub fn range(&self) -> Range<usize> {
        self.start_offset..self.end_offset
    }
}

/// Find `query.text` within the addressed lines.
///
/// `line_start` must name an existing line. A `line_end` past the last line
/// is clamped to it.
pub fn locate(query: &LineQuery<'_>, doc: &LintDocument) -> Option<LocatedSpan> {
    if query.text.is_empty() || query.line_start == 0 || query.line_start > query.line_end {
        return None;
    }
    let first = query.line_start - 1;
    let last = (query.line_end - 1).min(doc.line_count().checked_sub(1)?);
    let window_start = doc.lines.line_start(first)?;
    let window_end = doc.lines.line_end(last)?;
    let window = slice_chars(&doc.content, window_start..window_end)?;

    if let Some(at) = find_chars(window, query.text) {
        let start = window_start + at;
        return Some(LocatedSpan {
            start_offset: start,
            end_offset: start + char_len(query.text),
            matched: LocateMatch::Exact,
        });
    }
    find_chars_ignore_case(window, query.text).map(|found| LocatedSpan {
        start_offset: window_start + found.start,
        end_offset: window_start + found.end,
        matched: LocateMatch::CaseInsensitive,
    })
}

/// Check that `[start, end)` is in bounds and covers `quoted` (exactly or
/// case-insensitively).
pub fn validate_span(content: &str, start: i64, end: i64, quoted: &str) -> bool {
    let (Ok(start), Ok(end)) = (usize::try_from(start), usize::try_from(end)) else {
        return false;
    };
    if start >= end {
        return false;
    }
    slice_chars(content, start..end).is_some_and(|found| eq_ignore_case(found, quoted))
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "Line one\nLine two with recieve error\nLine three";

    fn query(line_start: usize, line_end: usize, text: &str) -> LineQuery<'_> {
        LineQuery {
            line_start,
            line_end,
            text,
        }
    }

    #[test]
    fn test_locates_on_addressed_line() {
        let doc = LintDocument::new(DOC);
        let span = locate(&query(2, 2, "recieve"), &doc).unwrap();
        assert_eq!(span.range(), 23..30);
        assert_eq!(span.matched, LocateMatch::Exact);
        assert_eq!(slice_chars(DOC, span.range()), Some("recieve"));
    }

    #[test]
    fn test_line_out_of_range() {
        let doc = LintDocument::new(DOC);
        assert_eq!(locate(&query(5, 5, "recieve"), &doc), None);
        assert_eq!(locate(&query(0, 1, "Line"), &doc), None);
        assert_eq!(locate(&query(3, 2, "Line"), &doc), None);
    }

    #[test]
    fn test_only_searches_addressed_lines() {
        let doc = LintDocument::new(DOC);
        // "one" exists on line 1 only.
        assert_eq!(locate(&query(2, 3, "one"), &doc), None);
        let span = locate(&query(1, 3, "three"), &doc).unwrap();
        assert_eq!(slice_chars(DOC, span.range()), Some("three"));
    }

    #[test]
    fn test_multi_line_text() {
        let doc = LintDocument::new(DOC);
        let span = locate(&query(1, 2, "one\nLine two"), &doc).unwrap();
        assert_eq!(span.range(), 5..17);
    }

    #[test]
    fn test_line_end_clamped() {
        let doc = LintDocument::new(DOC);
        let span = locate(&query(3, 9, "three"), &doc).unwrap();
        assert_eq!(span.range(), 42..47);
    }

    #[test]
    fn test_case_insensitive_fallback() {
        let doc = LintDocument::new(DOC);
        let span = locate(&query(2, 2, "RECIEVE Error"), &doc).unwrap();
        assert_eq!(span.matched, LocateMatch::CaseInsensitive);
        assert_eq!(span.range(), 23..36);
        assert!(validate_span(DOC, 23, 36, "RECIEVE Error"));
    }

    #[test]
    fn test_validate_span() {
        assert!(validate_span(DOC, 23, 30, "recieve"));
        assert!(!validate_span(DOC, 22, 30, "recieve"));
        assert!(!validate_span(DOC, -1, -1, "recieve"));
        assert!(!validate_span(DOC, 30, 23, "recieve"));
        assert!(!validate_span(DOC, 40, 400, "three"));
    }

    #[test]
    fn test_non_ascii_offsets_are_chars() {
        let content = "Prémière ligne\nDeuxième ligne avec erreur";
        let doc = LintDocument::new(content);
        let span = locate(&query(2, 2, "erreur"), &doc).unwrap();
        assert_eq!(slice_chars(content, span.range()), Some("erreur"));
        assert_eq!(span.start_offset, 35);
    }

    #[test]
    fn test_lines_split_on_newline_only() {
        let content = "Intro\u{2028}continued\nSecond line with recieve";
        let doc = LintDocument::new(content);
        assert_eq!(doc.line_count(), 2);
        let span = locate(&query(2, 2, "recieve"), &doc).unwrap();
        assert_eq!(span.range(), 33..40);
        assert_eq!(slice_chars(content, span.range()), Some("recieve"));

        let paged = LintDocument::new("page one\x0Cpage two\nnext");
        assert_eq!(locate(&query(1, 1, "two"), &paged).map(|s| s.range()), Some(14..17));
    }
}
