//! Read-only render surface with live highlight decorations.
//!
//! The surface owns the current prepared document, the highlight list and
//! the active tag. Changing highlights re-runs decoration; changing the
//! active tag only flips `is_active` on the existing ranges.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use markdown_weaver_escape::{FmtWriter, StrWrite, escape_href, escape_html, escape_html_body_text};
use smol_str::SmolStr;

use crate::cache::{DocumentCache, PreparedDocument, hash_source};
use crate::config::EngineConfig;
use crate::decorate::{DecorationRange, Highlight, decorate_document, restyle};
use crate::text::{char_len, slice_chars};
use crate::tree::{DocumentNode, NodeKind};

/// Visual weight of a decoration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecorationStyle {
    pub opacity: f32,
    pub border_width: u8,
}

/// Style is a pure function of whether the decoration's tag is active.
pub fn style_for(is_active: bool) -> DecorationStyle {
    if is_active {
        DecorationStyle {
            opacity: 1.0,
            border_width: 2,
        }
    } else {
        DecorationStyle {
            opacity: 0.45,
            border_width: 0,
        }
    }
}

/// Callbacks fired by pointer interaction with a decorated region.
pub trait HighlightEvents {
    /// `Some(tag)` on pointer enter, `None` on leave.
    fn on_highlight_hover(&mut self, tag: Option<&str>);
    fn on_highlight_click(&mut self, tag: &str);
}

/// Pointer interaction with the region of the given id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerEvent {
    Enter(usize),
    Leave(usize),
    Click(usize),
}

/// An interactive region: one decoration range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region<'a> {
    pub id: usize,
    pub decoration: &'a DecorationRange,
}

#[derive(Debug, Clone, Default)]
pub enum SurfaceState {
    #[default]
    Uninitialized,
    Initialized {
        document: Arc<PreparedDocument>,
    },
}

#[derive(Debug, Clone, Default)]
pub struct RenderSurface {
    config: EngineConfig,
    state: SurfaceState,
    highlights: Vec<Highlight>,
    active_tag: Option<SmolStr>,
    decorations: Vec<DecorationRange>,
}

impl RenderSurface {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn state(&self) -> &SurfaceState {
        &self.state
    }

    pub fn is_initialized(&self) -> bool {
        matches!(self.state, SurfaceState::Initialized { .. })
    }

    pub fn document(&self) -> Option<&Arc<PreparedDocument>> {
        match &self.state {
            SurfaceState::Uninitialized => None,
            SurfaceState::Initialized { document } => Some(document),
        }
    }

    /// Install a prepared document, replacing any previous one.
    pub fn initialize(&mut self, document: Arc<PreparedDocument>) {
        tracing::debug!(
            target: "marginalia::surface",
            hash = document.hash(),
            replaced = self.is_initialized(),
            "surface initialized"
        );
        self.state = SurfaceState::Initialized { document };
        self.redecorate();
    }

    /// Show `content`, preparing it through `cache`. Returns false when the
    /// content is unchanged and nothing was redone.
    pub fn set_content(&mut self, content: &str, cache: &DocumentCache) -> bool {
        if let Some(current) = self.document() {
            if current.hash() == hash_source(content) && current.source() == content {
                return false;
            }
        }
        self.initialize(cache.get_or_prepare(content));
        true
    }

    pub fn set_highlights(&mut self, highlights: Vec<Highlight>) {
        self.highlights = highlights;
        self.redecorate();
    }

    /// Change the emphasized tag. Ranges are kept; only their active flag moves.
    pub fn set_active_tag(&mut self, tag: Option<&str>) {
        self.active_tag = tag.map(SmolStr::new);
        restyle(&mut self.decorations, tag);
        tracing::trace!(
            target: "marginalia::surface",
            active = ?self.active_tag,
            ranges = self.decorations.len(),
            "active tag changed"
        );
    }

    pub fn active_tag(&self) -> Option<&str> {
        self.active_tag.as_deref()
    }

    pub fn highlights(&self) -> &[Highlight] {
        &self.highlights
    }

    /// Current decorations; always empty before initialization.
    pub fn decorations(&self) -> &[DecorationRange] {
        &self.decorations
    }

    pub fn regions(&self) -> impl Iterator<Item = Region<'_>> + '_ {
        self.decorations
            .iter()
            .enumerate()
            .map(|(id, decoration)| Region { id, decoration })
    }

    /// Route a pointer event to `handler`. Returns false for unknown regions.
    pub fn dispatch(&self, event: PointerEvent, handler: &mut impl HighlightEvents) -> bool {
        let id = match event {
            PointerEvent::Enter(id) | PointerEvent::Leave(id) | PointerEvent::Click(id) => id,
        };
        let Some(decoration) = self.decorations.get(id) else {
            tracing::trace!(target: "marginalia::surface", id, "pointer event for unknown region");
            return false;
        };
        match event {
            PointerEvent::Enter(_) => handler.on_highlight_hover(Some(&decoration.tag)),
            PointerEvent::Leave(_) => handler.on_highlight_hover(None),
            PointerEvent::Click(_) => handler.on_highlight_click(&decoration.tag),
        }
        true
    }

    fn redecorate(&mut self) {
        self.decorations = match &self.state {
            SurfaceState::Uninitialized => Vec::new(),
            SurfaceState::Initialized { document } => decorate_document(
                document,
                &self.highlights,
                self.active_tag.as_deref(),
                &self.config,
            ),
        };
    }

    /// Write the decorated document as an HTML fragment.
    pub fn write_html<W: StrWrite>(&self, writer: W) -> Result<(), W::Error> {
        let Some(document) = self.document() else {
            return Ok(());
        };
        HtmlWriter::new(writer, &self.decorations).run(document.tree())
    }

    pub fn render_html(&self) -> String {
        let mut out = String::new();
        if let Err(err) = self.write_html(FmtWriter(&mut out)) {
            tracing::error!(target: "marginalia::surface", error = %err, "html render failed");
        }
        out
    }
}

struct HtmlWriter<'d, W> {
    writer: W,
    decorations: &'d [DecorationRange],
    /// Leaf path -> indices into `decorations`.
    by_leaf: HashMap<&'d [usize], Vec<usize>>,
}

impl<'d, W: StrWrite> HtmlWriter<'d, W> {
    fn new(writer: W, decorations: &'d [DecorationRange]) -> Self {
        let mut by_leaf: HashMap<&[usize], Vec<usize>> = HashMap::new();
        for (idx, range) in decorations.iter().enumerate() {
            by_leaf.entry(range.node_path.as_slice()).or_default().push(idx);
        }
        Self {
            writer,
            decorations,
            by_leaf,
        }
    }

    #[inline]
    fn write(&mut self, s: &str) -> Result<(), W::Error> {
        self.writer.write_str(s)
    }

    fn run(mut self, roots: &[DocumentNode]) -> Result<(), W::Error> {
        let mut path = Vec::new();
        self.children(roots, &mut path)
    }

    fn children(&mut self, nodes: &[DocumentNode], path: &mut Vec<usize>) -> Result<(), W::Error> {
        for (idx, node) in nodes.iter().enumerate() {
            path.push(idx);
            self.node(node, path)?;
            path.pop();
        }
        Ok(())
    }

    fn node(&mut self, node: &DocumentNode, path: &mut Vec<usize>) -> Result<(), W::Error> {
        match node {
            DocumentNode::Text { content, .. } => self.leaf(content, path),
            DocumentNode::Element { kind, children } => {
                self.start_tag(kind)?;
                self.children(children, path)?;
                self.end_tag(kind)
            }
        }
    }

    fn start_tag(&mut self, kind: &NodeKind) -> Result<(), W::Error> {
        match kind {
            NodeKind::Heading { level } => write!(&mut self.writer, "<h{}>", level),
            NodeKind::Paragraph => self.write("<p>"),
            NodeKind::BlockQuote => self.write("<blockquote>\n"),
            NodeKind::List { ordered: true } => self.write("<ol>\n"),
            NodeKind::List { ordered: false } => self.write("<ul>\n"),
            NodeKind::ListItem => self.write("<li>"),
            NodeKind::CodeBlock { lang: Some(lang) } => {
                self.write("<pre><code class=\"language-")?;
                escape_html(&mut self.writer, lang)?;
                self.write("\">")
            }
            NodeKind::CodeBlock { lang: None } => self.write("<pre><code>"),
            NodeKind::Table => self.write("<table>\n"),
            NodeKind::TableRow => self.write("<tr>"),
            NodeKind::TableCell => self.write("<td>"),
            NodeKind::Rule => self.write("<hr />\n"),
            NodeKind::Link { url } => {
                self.write("<a href=\"")?;
                escape_href(&mut self.writer, url)?;
                self.write("\">")
            }
            NodeKind::Image { url, alt } => {
                self.write("<img src=\"")?;
                escape_href(&mut self.writer, url)?;
                self.write("\" alt=\"")?;
                escape_html(&mut self.writer, alt)?;
                self.write("\" />")
            }
            NodeKind::CodeInline => self.write("<code>"),
            NodeKind::Emphasis => self.write("<em>"),
            NodeKind::Strong => self.write("<strong>"),
            NodeKind::Strikethrough => self.write("<del>"),
        }
    }

    fn end_tag(&mut self, kind: &NodeKind) -> Result<(), W::Error> {
        match kind {
            NodeKind::Heading { level } => write!(&mut self.writer, "</h{}>\n", level),
            NodeKind::Paragraph => self.write("</p>\n"),
            NodeKind::BlockQuote => self.write("</blockquote>\n"),
            NodeKind::List { ordered: true } => self.write("</ol>\n"),
            NodeKind::List { ordered: false } => self.write("</ul>\n"),
            NodeKind::ListItem => self.write("</li>\n"),
            NodeKind::CodeBlock { .. } => self.write("</code></pre>\n"),
            NodeKind::Table => self.write("</table>\n"),
            NodeKind::TableRow => self.write("</tr>\n"),
            NodeKind::TableCell => self.write("</td>"),
            NodeKind::Rule | NodeKind::Image { .. } => Ok(()),
            NodeKind::Link { .. } => self.write("</a>"),
            NodeKind::CodeInline => self.write("</code>"),
            NodeKind::Emphasis => self.write("</em>"),
            NodeKind::Strong => self.write("</strong>"),
            NodeKind::Strikethrough => self.write("</del>"),
        }
    }

    /// Text with decorations. Overlaps are split at every range boundary so
    /// each piece is one `<mark>` listing every tag that covers it.
    fn leaf(&mut self, content: &str, path: &[usize]) -> Result<(), W::Error> {
        let Some(indices) = self.by_leaf.get(path).cloned() else {
            return escape_html_body_text(&mut self.writer, content);
        };
        let len = char_len(content);
        let mut cuts = BTreeSet::from([0, len]);
        for &idx in &indices {
            let range = &self.decorations[idx];
            cuts.insert(range.local_start.min(len));
            cuts.insert(range.local_end.min(len));
        }
        let cuts: Vec<usize> = cuts.into_iter().collect();

        for window in cuts.windows(2) {
            let (start, end) = (window[0], window[1]);
            let Some(piece) = slice_chars(content, start..end) else {
                continue;
            };
            let covering: Vec<usize> = indices
                .iter()
                .copied()
                .filter(|&idx| {
                    let range = &self.decorations[idx];
                    range.local_start <= start && end <= range.local_end
                })
                .collect();
            // The last active range is on top, otherwise the last one given.
            let top = covering
                .iter()
                .rev()
                .copied()
                .find(|&idx| self.decorations[idx].is_active)
                .or_else(|| covering.last().copied());
            match top {
                Some(top) => self.mark(top, &covering, piece)?,
                None => escape_html_body_text(&mut self.writer, piece)?,
            }
        }
        Ok(())
    }

    fn mark(&mut self, top: usize, covering: &[usize], piece: &str) -> Result<(), W::Error> {
        let decorations = self.decorations;
        let primary = &decorations[top];
        let style = style_for(primary.is_active);

        self.write("<mark class=\"hl")?;
        if primary.is_active {
            self.write(" hl-active")?;
        }
        self.write("\" data-tag=\"")?;
        escape_html(&mut self.writer, &primary.tag)?;
        self.write("\" data-tags=\"")?;
        for (n, &idx) in covering.iter().enumerate() {
            if n > 0 {
                self.write(" ")?;
            }
            escape_html(&mut self.writer, &decorations[idx].tag)?;
        }
        write!(&mut self.writer, "\" data-region=\"{}\" style=\"background-color: ", top)?;
        escape_html(&mut self.writer, &primary.color)?;
        write!(
            &mut self.writer,
            "; opacity: {}; border-width: {}px\">",
            style.opacity, style.border_width
        )?;
        escape_html_body_text(&mut self.writer, piece)?;
        self.write("</mark>")
    }
}
