//! Highlight → per-leaf decoration ranges.
//!
//! A highlight names a range of the markdown source. For each text leaf we
//! work out which part of the leaf's own content it covers: through the
//! offset map when the range resolves, otherwise by searching the leaf for
//! the highlight's quoted text (verbatim, then normalized, then by first
//! line). A highlight that lands nowhere is dropped without error.

use std::ops::Range;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::cache::PreparedDocument;
use crate::config::EngineConfig;
use crate::normalize::{first_line_prefix, normalize_quote};
use crate::projection::PlainTextSpan;
use crate::reconcile::OffsetMap;
use crate::text::{char_len, find_chars};
use crate::tree::{NodePath, leaf_text};

/// An annotation anchored to a char range of the markdown source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Highlight {
    /// Signed so malformed input deserializes and is skipped instead of
    /// failing the whole list.
    pub start_offset: i64,
    pub end_offset: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quoted_text: Option<String>,
    pub tag: SmolStr,
    pub color: SmolStr,
}

impl Highlight {
    pub fn new(range: Range<usize>, tag: impl Into<SmolStr>, color: impl Into<SmolStr>) -> Self {
        Self {
            start_offset: range.start as i64,
            end_offset: range.end as i64,
            quoted_text: None,
            tag: tag.into(),
            color: color.into(),
        }
    }

    pub fn with_quote(mut self, quote: impl Into<String>) -> Self {
        self.quoted_text = Some(quote.into());
        self
    }

    /// The source range, if `0 <= start < end`.
    pub fn source_range(&self) -> Option<Range<usize>> {
        let start = usize::try_from(self.start_offset).ok()?;
        let end = usize::try_from(self.end_offset).ok()?;
        (start < end).then_some(start..end)
    }
}

/// Which strategy placed a decoration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Reconciled,
    ExactQuote,
    NormalizedQuote,
    PrefixQuote,
}

/// A decorated sub-range of one text leaf, in leaf-local char offsets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecorationRange {
    pub node_path: NodePath,
    pub local_start: usize,
    pub local_end: usize,
    pub tag: SmolStr,
    pub color: SmolStr,
    pub is_active: bool,
    pub matched_by: MatchKind,
}

impl DecorationRange {
    pub fn local_range(&self) -> Range<usize> {
        self.local_start..self.local_end
    }
}

/// A highlight with its plain-text range resolved once up front.
struct Resolved<'h> {
    highlight: &'h Highlight,
    /// None when the source range didn't resolve; fallbacks apply.
    plain: Option<Range<usize>>,
    is_active: bool,
}

fn resolve_all<'h>(
    highlights: &'h [Highlight],
    offset_map: &OffsetMap,
    active_tag: Option<&str>,
    config: &EngineConfig,
) -> Vec<Resolved<'h>> {
    highlights
        .iter()
        .filter_map(|highlight| {
            let Some(source) = highlight.source_range() else {
                tracing::debug!(
                    target: "marginalia::decorate",
                    tag = %highlight.tag,
                    start = highlight.start_offset,
                    end = highlight.end_offset,
                    "skipping invalid highlight range"
                );
                return None;
            };
            Some(Resolved {
                highlight,
                plain: offset_map.resolve_range(source, config.probe_window),
                is_active: active_tag == Some(highlight.tag.as_str()),
            })
        })
        .collect()
}

/// Decorations for a single leaf.
pub fn decorate(
    leaf_span: &PlainTextSpan,
    leaf_content: &str,
    highlights: &[Highlight],
    offset_map: &OffsetMap,
    active_tag: Option<&str>,
    config: &EngineConfig,
) -> Vec<DecorationRange> {
    let resolved = resolve_all(highlights, offset_map, active_tag, config);
    let mut out = Vec::new();
    decorate_leaf(leaf_span, leaf_content, &resolved, config, &mut out);
    out
}

fn decorate_leaf(
    leaf_span: &PlainTextSpan,
    leaf_content: &str,
    resolved: &[Resolved<'_>],
    config: &EngineConfig,
    out: &mut Vec<DecorationRange>,
) {
    let leaf_len = char_len(leaf_content);
    if leaf_len == 0 {
        return;
    }
    for item in resolved {
        let placed = match &item.plain {
            Some(plain) => clip_to_leaf(plain, leaf_span).map(|r| (r, MatchKind::Reconciled)),
            None => item
                .highlight
                .quoted_text
                .as_deref()
                .and_then(|quote| match_quote(leaf_content, quote, config)),
        };
        let Some((local, matched_by)) = placed else {
            continue;
        };
        debug_assert!(local.start < local.end && local.end <= leaf_len);
        out.push(DecorationRange {
            node_path: leaf_span.node_path.clone(),
            local_start: local.start,
            local_end: local.end,
            tag: item.highlight.tag.clone(),
            color: item.highlight.color.clone(),
            is_active: item.is_active,
            matched_by,
        });
    }
}

/// Intersect a plain-text range with a leaf and convert to leaf-local offsets.
fn clip_to_leaf(plain: &Range<usize>, leaf: &PlainTextSpan) -> Option<Range<usize>> {
    let start = plain.start.max(leaf.start);
    let end = plain.end.min(leaf.end);
    (start < end).then(|| start - leaf.start..end - leaf.start)
}

/// Text-matching fallbacks, first hit wins.
fn match_quote(
    leaf_content: &str,
    quote: &str,
    config: &EngineConfig,
) -> Option<(Range<usize>, MatchKind)> {
    let found = |needle: &str| find_chars(leaf_content, needle).map(|at| at..at + char_len(needle));

    if let Some(range) = found(quote) {
        return Some((range, MatchKind::ExactQuote));
    }
    let normalized = normalize_quote(quote);
    if let Some(range) = found(&normalized) {
        return Some((range, MatchKind::NormalizedQuote));
    }
    first_line_prefix(&normalized, config.min_prefix_len)
        .and_then(found)
        .map(|range| (range, MatchKind::PrefixQuote))
}

/// Decorations for every leaf of a prepared document, in traversal order.
pub fn decorate_document(
    doc: &PreparedDocument,
    highlights: &[Highlight],
    active_tag: Option<&str>,
    config: &EngineConfig,
) -> Vec<DecorationRange> {
    let resolved = resolve_all(highlights, doc.offset_map(), active_tag, config);
    let mut out = Vec::new();
    for span in doc.projection().spans() {
        let Some(content) = leaf_text(doc.tree(), &span.node_path) else {
            continue;
        };
        decorate_leaf(span, content, &resolved, config, &mut out);
    }

    if tracing::enabled!(target: "marginalia::decorate", tracing::Level::DEBUG) {
        let dropped: Vec<&str> = highlights
            .iter()
            .filter(|h| !out.iter().any(|range| range.tag == h.tag))
            .map(|h| h.tag.as_str())
            .collect();
        tracing::debug!(
            target: "marginalia::decorate",
            highlights = highlights.len(),
            ranges = out.len(),
            ?dropped,
            "decorated document"
        );
    }
    out
}

/// Re-derive `is_active` without recomputing any range.
pub fn restyle(ranges: &mut [DecorationRange], active_tag: Option<&str>) {
    for range in ranges {
        range.is_active = active_tag == Some(range.tag.as_str());
    }
}
