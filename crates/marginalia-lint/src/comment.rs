//! Model-reported errors and the comments they become.

use marginalia_core::Highlight;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::locator::{LineQuery, LintDocument, locate, validate_span};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LintKind {
    #[default]
    Spelling,
    Grammar,
}

impl LintKind {
    pub fn color(self) -> &'static str {
        match self {
            LintKind::Spelling => "#f87171",
            LintKind::Grammar => "#60a5fa",
        }
    }
}

/// One error as the model reports it.
///
/// Missing fields take their defaults, which the contract check rejects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawLintError {
    pub line_start: i64,
    pub line_end: i64,
    pub highlighted_text: String,
    pub description: String,
    #[serde(alias = "type")]
    pub kind: LintKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub importance: Option<u8>,
}

/// Why a reported error was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    /// Violates the output contract (line order, empty text, short description).
    Contract,
    /// Text not found in the addressed lines.
    NotFound,
    /// Located span doesn't read back as the quoted text.
    Invalid,
    /// Same span as an earlier comment.
    Duplicate,
}

impl RawLintError {
    /// Read one entry of a model response.
    ///
    /// An entry of the wrong shape becomes the default error, so it is
    /// dropped by [`check_contract`](Self::check_contract) instead of failing
    /// the entries around it.
    pub fn from_value(value: serde_json::Value) -> Self {
        serde_json::from_value(value).unwrap_or_else(|err| {
            tracing::debug!(
                target: "marginalia::lint",
                error = %err,
                "malformed reported error"
            );
            Self::default()
        })
    }

    /// Check the output contract: `1 <= lineStart <= lineEnd`, non-empty text,
    /// description of at least `min_description_len` chars.
    pub fn check_contract(&self, min_description_len: usize) -> Result<(), Rejection> {
        let lines_ok = self.line_start >= 1 && self.line_start <= self.line_end;
        let text_ok = !self.highlighted_text.trim().is_empty();
        let description_ok = self.description.trim().chars().count() >= min_description_len;
        if lines_ok && text_ok && description_ok {
            Ok(())
        } else {
            Err(Rejection::Contract)
        }
    }
}

/// A relocated error with document char offsets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LintComment {
    pub id: SmolStr,
    pub kind: LintKind,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub importance: Option<u8>,
    pub line_start: i64,
    pub line_end: i64,
    /// -1 when relocation failed.
    pub start_offset: i64,
    pub end_offset: i64,
    pub quoted_text: String,
    pub is_valid: bool,
}

impl LintComment {
    /// Locate `raw` in the document and validate the result. Failures give an
    /// invalid comment with offsets of -1 rather than an error.
    pub fn relocate(raw: &RawLintError, doc: &LintDocument, id: impl Into<SmolStr>) -> Self {
        let located = match (usize::try_from(raw.line_start), usize::try_from(raw.line_end)) {
            (Ok(line_start), Ok(line_end)) => locate(
                &LineQuery {
                    line_start,
                    line_end,
                    text: &raw.highlighted_text,
                },
                doc,
            ),
            _ => None,
        };
        let (start_offset, end_offset) = located
            .map(|span| (span.start_offset as i64, span.end_offset as i64))
            .unwrap_or((-1, -1));
        let is_valid = validate_span(doc.content(), start_offset, end_offset, &raw.highlighted_text);
        Self {
            id: id.into(),
            kind: raw.kind,
            description: raw.description.clone(),
            importance: raw.importance,
            line_start: raw.line_start,
            line_end: raw.line_end,
            start_offset,
            end_offset,
            quoted_text: raw.highlighted_text.clone(),
            is_valid,
        }
    }

    pub fn span(&self) -> (i64, i64) {
        (self.start_offset, self.end_offset)
    }

    /// The comment as a highlight over the same document, if it is valid.
    pub fn to_highlight(&self) -> Option<Highlight> {
        if !self.is_valid {
            return None;
        }
        Some(Highlight {
            start_offset: self.start_offset,
            end_offset: self.end_offset,
            quoted_text: Some(self.quoted_text.clone()),
            tag: self.id.clone(),
            color: SmolStr::new_static(self.kind.color()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(line_start: i64, line_end: i64, text: &str) -> RawLintError {
        RawLintError {
            line_start,
            line_end,
            highlighted_text: text.to_string(),
            description: "Misspelling of \"receive\".".to_string(),
            kind: LintKind::Spelling,
            importance: None,
        }
    }

    #[test]
    fn test_contract() {
        assert!(raw(2, 2, "recieve").check_contract(10).is_ok());
        assert_eq!(raw(0, 2, "x").check_contract(10), Err(Rejection::Contract));
        assert_eq!(raw(3, 2, "x").check_contract(10), Err(Rejection::Contract));
        assert_eq!(raw(1, 1, "  ").check_contract(10), Err(Rejection::Contract));
        let mut short = raw(1, 1, "x");
        short.description = "too short".to_string();
        assert_eq!(short.check_contract(10), Err(Rejection::Contract));
    }

    #[test]
    fn test_deserialize_model_output() {
        let json = r#"{"lineStart": 2, "lineEnd": 2, "highlightedText": "recieve",
            "description": "Misspelled word", "type": "grammar", "extra": 1}"#;
        let parsed: RawLintError = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.kind, LintKind::Grammar);
        assert_eq!(parsed.importance, None);
    }

    #[test]
    fn test_malformed_entries_fail_contract() {
        let missing = RawLintError::from_value(serde_json::json!({
            "lineStart": 2, "lineEnd": 2, "highlightedText": "recieve"
        }));
        assert_eq!(missing.highlighted_text, "recieve");
        assert_eq!(missing.check_contract(10), Err(Rejection::Contract));

        let wrong_type = RawLintError::from_value(serde_json::json!({
            "lineStart": "two", "lineEnd": 2, "highlightedText": "recieve",
            "description": "Misspelling of receive."
        }));
        assert_eq!(wrong_type, RawLintError::default());
        assert_eq!(wrong_type.check_contract(10), Err(Rejection::Contract));

        let not_an_object = RawLintError::from_value(serde_json::json!("teh"));
        assert_eq!(not_an_object.check_contract(10), Err(Rejection::Contract));
    }

    #[test]
    fn test_relocate() {
        let doc = LintDocument::new("Line one\nLine two with recieve error\nLine three");
        let comment = LintComment::relocate(&raw(2, 2, "recieve"), &doc, "c0");
        assert!(comment.is_valid);
        assert_eq!(comment.span(), (23, 30));
        let highlight = comment.to_highlight().unwrap();
        assert_eq!(highlight.source_range(), Some(23..30));
        assert_eq!(highlight.tag, "c0");

        let missing = LintComment::relocate(&raw(5, 5, "recieve"), &doc, "c1");
        assert!(!missing.is_valid);
        assert_eq!(missing.span(), (-1, -1));
        assert!(missing.to_highlight().is_none());
    }
}
