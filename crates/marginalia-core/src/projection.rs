//! Flatten a document tree into the plain text a reader sees.
//!
//! Every text leaf gets a [`PlainTextSpan`] in the flattened string. The gaps
//! between leaves are block separators, recorded as separator segments so the
//! full string can always be rebuilt from segments in order.

use std::ops::Range;

use serde::Serialize;

use crate::reconcile::AlignedRun;
use crate::text::char_len;
use crate::tree::{DocumentNode, NodeKind, NodePath, SourceAnchor};

/// Separator injected around block containers.
pub const BLOCK_SEPARATOR: &str = "\n\n";
/// Separator between cells of one table row.
pub const CELL_SEPARATOR: &str = "\t";

/// Char range of one text leaf inside the plain-text projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlainTextSpan {
    pub node_path: NodePath,
    pub start: usize,
    pub end: usize,
}

impl PlainTextSpan {
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// True if the half-open ranges intersect.
    pub fn overlaps(&self, range: &Range<usize>) -> bool {
        range.start < self.end && self.start < range.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentKind {
    /// Index into [`PlainTextProjection::spans`].
    Leaf(usize),
    Separator,
}

/// A contiguous piece of the plain text: a leaf or an injected separator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Segment {
    pub start: usize,
    pub end: usize,
    pub kind: SegmentKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlainTextProjection {
    plain_text: String,
    char_len: usize,
    spans: Vec<PlainTextSpan>,
    segments: Vec<Segment>,
    #[serde(skip)]
    anchors: Vec<AlignedRun>,
}

impl PlainTextProjection {
    pub fn plain_text(&self) -> &str {
        &self.plain_text
    }

    /// Length of the plain text in chars.
    pub fn char_len(&self) -> usize {
        self.char_len
    }

    /// Leaf spans in traversal order.
    pub fn spans(&self) -> &[PlainTextSpan] {
        &self.spans
    }

    /// All segments (leaves and separators) in order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Source anchors of every leaf, translated to plain-text offsets.
    pub fn anchors(&self) -> &[AlignedRun] {
        &self.anchors
    }

    /// Find the span of the leaf at `path`.
    pub fn span_for_path(&self, path: &[usize]) -> Option<&PlainTextSpan> {
        self.spans.iter().find(|span| span.node_path == path)
    }

    /// Leaf spans intersecting a plain-text range.
    pub fn spans_overlapping(
        &self,
        range: Range<usize>,
    ) -> impl Iterator<Item = &PlainTextSpan> + '_ {
        // Spans are sorted and contiguous; skip everything ending before the range.
        let first = self.spans.partition_point(|span| span.end <= range.start);
        self.spans[first..]
            .iter()
            .take_while(move |span| span.start < range.end)
            .filter(move |span| span.overlaps(&range))
    }
}

/// Project a tree into plain text plus per-leaf spans.
pub fn project(roots: &[DocumentNode]) -> PlainTextProjection {
    let mut projector = Projector::default();
    let mut path = Vec::new();
    for (idx, node) in roots.iter().enumerate() {
        path.push(idx);
        projector.visit(node, &mut path);
        path.pop();
    }
    projector.finish()
}

#[derive(Debug, Default)]
struct Projector {
    text: String,
    len: usize,
    spans: Vec<PlainTextSpan>,
    segments: Vec<Segment>,
    anchors: Vec<AlignedRun>,
    /// A block opened or closed; separate before the next content.
    pending_separator: bool,
}

impl Projector {
    fn visit(&mut self, node: &DocumentNode, path: &mut NodePath) {
        match node {
            DocumentNode::Text { content, anchors } => self.leaf(content, anchors, path),
            DocumentNode::Element { kind, children } => {
                let separated = kind.is_separated_block();
                if separated {
                    self.pending_separator = true;
                }
                let mut first_cell = true;
                for (idx, child) in children.iter().enumerate() {
                    if matches!(child.kind(), Some(NodeKind::TableCell)) {
                        if !first_cell {
                            self.flush_pending();
                            self.separate(CELL_SEPARATOR);
                        }
                        first_cell = false;
                    }
                    path.push(idx);
                    self.visit(child, path);
                    path.pop();
                }
                if separated {
                    self.pending_separator = true;
                }
            }
        }
    }

    fn leaf(&mut self, content: &str, anchors: &[SourceAnchor], path: &NodePath) {
        if !content.is_empty() {
            self.flush_pending();
        }
        let start = self.len;
        self.anchors
            .extend(anchors.iter().map(|anchor| AlignedRun {
                source_start: anchor.source,
                plain_start: start + anchor.local,
                len: anchor.len,
            }));
        let len = char_len(content);
        self.text.push_str(content);
        self.len += len;
        self.segments.push(Segment {
            start,
            end: self.len,
            kind: SegmentKind::Leaf(self.spans.len()),
        });
        self.spans.push(PlainTextSpan {
            node_path: path.clone(),
            start,
            end: self.len,
        });
    }

    fn flush_pending(&mut self) {
        if self.pending_separator {
            self.pending_separator = false;
            self.separate(BLOCK_SEPARATOR);
        }
    }

    /// Append `sep` unless the text is empty or already ends with it.
    ///
    /// Separators only ever sit between two pieces of content: nothing is
    /// written before the first block, and a block's trailing separator stays
    /// pending until more content follows.
    fn separate(&mut self, sep: &str) {
        if self.text.is_empty() || self.text.ends_with(sep) {
            return;
        }
        let start = self.len;
        self.text.push_str(sep);
        self.len += char_len(sep);
        self.segments.push(Segment {
            start,
            end: self.len,
            kind: SegmentKind::Separator,
        });
    }

    fn finish(self) -> PlainTextProjection {
        PlainTextProjection {
            plain_text: self.text,
            char_len: self.len,
            spans: self.spans,
            segments: self.segments,
            anchors: self.anchors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse;
    use crate::text::slice_chars;
    use crate::tree::leaf_text;

    fn plain(source: &str) -> String {
        project(&parse(source)).plain_text().to_string()
    }

    #[test]
    fn test_heading_then_paragraph() {
        let projection = project(&parse("# Title\n\nBody text here."));
        assert_eq!(projection.plain_text(), "Title\n\nBody text here.");
        assert_eq!(projection.spans()[0].range(), 0..5);
        assert_eq!(projection.spans()[1].range(), 7..22);
    }

    #[test]
    fn test_markup_is_stripped() {
        assert_eq!(plain("**Bold text**"), "Bold text");
        assert_eq!(
            plain("A [link](https://example.com) and _emphasis_."),
            "A link and emphasis."
        );
    }

    #[test]
    fn test_no_duplicate_separators() {
        // Nested blocks would separate twice without the ends_with check.
        assert_eq!(plain("> quoted\n\nafter"), "quoted\n\nafter");
        assert_eq!(plain("- one\n- two"), "one\n\ntwo");
    }

    #[test]
    fn test_separators_only_between_blocks() {
        let projection = project(&parse("> quoted\n\n- one\n- two\n\n---\n"));
        assert_eq!(projection.plain_text(), "quoted\n\none\n\ntwo");
        assert_eq!(projection.spans()[0].start, 0);
        assert_eq!(projection.spans().last().map(|s| s.end), Some(projection.char_len()));
        let kinds: Vec<_> = projection.segments().iter().map(|s| s.kind).collect();
        assert_eq!(kinds.first(), Some(&SegmentKind::Leaf(0)));
        assert_eq!(kinds.last(), Some(&SegmentKind::Leaf(2)));
    }

    #[test]
    fn test_empty_trailing_blocks_add_nothing() {
        assert_eq!(plain("text\n\n---"), "text");
        assert_eq!(plain("text\n\n#"), "text");
        assert_eq!(plain("---\n\ntext"), "text");
    }

    #[test]
    fn test_table_cells() {
        assert_eq!(plain("| a | b |\n|---|---|\n| c | d |"), "a\tb\n\nc\td");
    }

    #[test]
    fn test_segments_rebuild_plain_text() {
        let source = "# H\n\n> q **b** _e_\n\n1. x\n2. y\n\n| a | b |\n|---|---|\n| c | d |";
        let projection = project(&parse(source));
        let rebuilt: String = projection
            .segments()
            .iter()
            .filter_map(|seg| slice_chars(projection.plain_text(), seg.start..seg.end))
            .collect();
        assert_eq!(rebuilt, projection.plain_text());
    }

    #[test]
    fn test_span_text_matches_leaf() {
        let tree = parse("Some **bold** text\n\n## Sub\n\n`code`");
        let projection = project(&tree);
        for span in projection.spans() {
            let leaf = leaf_text(&tree, &span.node_path).unwrap();
            assert_eq!(slice_chars(projection.plain_text(), span.range()), Some(leaf));
        }
    }

    #[test]
    fn test_spans_overlapping() {
        let projection = project(&parse("alpha **beta** gamma"));
        let hits: Vec<_> = projection
            .spans_overlapping(3..8)
            .map(|s| s.node_path.clone())
            .collect();
        assert_eq!(hits, vec![vec![0, 0], vec![0, 1, 0]]);
        assert_eq!(projection.spans_overlapping(100..200).count(), 0);
    }

    #[test]
    fn test_unicode_offsets_are_chars() {
        let projection = project(&parse("# Ünïcode\n\nbody"));
        assert_eq!(projection.spans()[0].range(), 0..7);
        assert_eq!(projection.spans()[1].range(), 9..13);
        assert_eq!(projection.char_len(), 13);
    }
}
