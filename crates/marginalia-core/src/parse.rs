//! Markdown to [`DocumentNode`] tree.
//!
//! A single pass over the parser's offset-annotated event stream with an
//! explicit frame stack. Tags we do not model (footnote definitions, html
//! blocks...) are transparent: their children are spliced into the parent.
//!
//! Text leaves remember which source chars they were copied from
//! ([`SourceAnchor`]), which lets reconciliation pin verbatim text exactly and
//! only diff the syntax in between.

use std::ops::Range;

use markdown_weaver::{CodeBlockKind, Event, Options, Parser, Tag};
use ropey::Rope;
use smol_str::SmolStr;

use crate::error::ParseError;
use crate::text::char_len;
use crate::tree::{DocumentNode, NodeKind, SourceAnchor};

/// Parser options: CommonMark plus the GFM extensions we render.
pub fn default_md_options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_GFM
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_FOOTNOTES
}

/// Parse markdown into a sequence of root block nodes.
///
/// Never fails: if the event stream cannot be assembled into a tree the
/// whole input is returned verbatim as a single paragraph.
pub fn parse(markdown: &str) -> Vec<DocumentNode> {
    match try_parse(markdown) {
        Ok(nodes) => nodes,
        Err(err) => {
            tracing::warn!(
                target: "marginalia::parse",
                error = %err,
                source_len = markdown.len(),
                "markdown parse failed, falling back to raw paragraph"
            );
            raw_paragraph(markdown)
        }
    }
}

/// Parse markdown, reporting structural failures instead of recovering.
pub fn try_parse(markdown: &str) -> Result<Vec<DocumentNode>, ParseError> {
    let events = Parser::new_ext(markdown, default_md_options()).into_offset_iter();
    TreeBuilder::new(markdown).build(events)
}

/// The fallback tree: the raw source in one paragraph.
pub fn raw_paragraph(markdown: &str) -> Vec<DocumentNode> {
    if markdown.is_empty() {
        return Vec::new();
    }
    let len = char_len(markdown);
    vec![DocumentNode::element(
        NodeKind::Paragraph,
        vec![DocumentNode::Text {
            content: markdown.to_string(),
            anchors: vec![SourceAnchor {
                local: 0,
                source: 0,
                len,
            }],
        }],
    )]
}

#[derive(Debug, Default)]
struct Frame {
    /// None for transparent tags.
    kind: Option<NodeKind>,
    children: Vec<DocumentNode>,
}

impl Frame {
    /// Append text, merging into a trailing text sibling.
    fn push_text(&mut self, text: &str, anchors: &[SourceAnchor]) {
        if text.is_empty() {
            return;
        }
        if let Some(DocumentNode::Text {
            content,
            anchors: existing,
        }) = self.children.last_mut()
        {
            let shift = char_len(content);
            content.push_str(text);
            existing.extend(anchors.iter().map(|anchor| SourceAnchor {
                local: anchor.local + shift,
                ..*anchor
            }));
        } else {
            self.children.push(DocumentNode::Text {
                content: text.to_string(),
                anchors: anchors.to_vec(),
            });
        }
    }
}

struct TreeBuilder<'s> {
    source: &'s str,
    /// For byte -> char conversion of event ranges.
    rope: Rope,
    stack: Vec<Frame>,
}

impl<'s> TreeBuilder<'s> {
    fn new(source: &'s str) -> Self {
        Self {
            source,
            rope: Rope::from_str(source),
            stack: vec![Frame::default()],
        }
    }

    fn current(&mut self) -> &mut Frame {
        // The root frame is only popped in `finish`.
        let last = self.stack.len() - 1;
        &mut self.stack[last]
    }

    /// Anchor `text` to where it appears verbatim inside the event's byte range.
    fn anchor(&self, text: &str, range: &Range<usize>) -> Option<SourceAnchor> {
        let slice = self.source.get(range.clone())?;
        let pos = slice.find(text)?;
        Some(SourceAnchor {
            local: 0,
            source: self.rope.byte_to_char(range.start + pos),
            len: char_len(text),
        })
    }

    fn push_text(&mut self, text: &str, range: &Range<usize>) {
        let anchor = self.anchor(text, range);
        self.current().push_text(text, anchor.as_slice());
    }

    fn build<'a, I>(mut self, events: I) -> Result<Vec<DocumentNode>, ParseError>
    where
        I: Iterator<Item = (Event<'a>, Range<usize>)>,
    {
        for (event, range) in events {
            match event {
                Event::Start(tag) => self.start(tag),
                Event::End(_) => self.end()?,
                Event::Text(text) => self.push_text(text.as_ref(), &range),
                Event::Code(code) => {
                    let anchors: Vec<_> = self.anchor(code.as_ref(), &range).into_iter().collect();
                    let node = DocumentNode::element(
                        NodeKind::CodeInline,
                        vec![DocumentNode::Text {
                            content: code.to_string(),
                            anchors,
                        }],
                    );
                    self.current().children.push(node);
                }
                Event::SoftBreak | Event::HardBreak => self.push_text("\n", &range),
                Event::Rule => {
                    let node = DocumentNode::element(NodeKind::Rule, Vec::new());
                    self.current().children.push(node);
                }
                // Raw html, footnote references, task markers and math are not
                // rendered as text.
                _ => {}
            }
        }
        self.finish()
    }

    fn start(&mut self, tag: Tag<'_>) {
        let kind = match tag {
            Tag::Heading { level, .. } => Some(NodeKind::Heading { level: level as u8 }),
            Tag::Paragraph(_) => Some(NodeKind::Paragraph),
            Tag::BlockQuote(_) => Some(NodeKind::BlockQuote),
            Tag::CodeBlock(info) => {
                let lang = match info {
                    CodeBlockKind::Fenced(info) => info.split_whitespace().next().map(SmolStr::new),
                    _ => None,
                };
                Some(NodeKind::CodeBlock { lang })
            }
            Tag::List(start) => Some(NodeKind::List {
                ordered: start.is_some(),
            }),
            Tag::Item => Some(NodeKind::ListItem),
            Tag::Table(_) => Some(NodeKind::Table),
            // Header cells sit directly under the head; treat it as a row.
            Tag::TableHead | Tag::TableRow => Some(NodeKind::TableRow),
            Tag::TableCell => Some(NodeKind::TableCell),
            Tag::Emphasis => Some(NodeKind::Emphasis),
            Tag::Strong => Some(NodeKind::Strong),
            Tag::Strikethrough => Some(NodeKind::Strikethrough),
            Tag::Link { dest_url, .. } => Some(NodeKind::Link {
                url: SmolStr::new(dest_url.as_ref()),
            }),
            Tag::Image { dest_url, .. } => Some(NodeKind::Image {
                url: SmolStr::new(dest_url.as_ref()),
                alt: String::new(),
            }),
            _ => None,
        };
        self.stack.push(Frame {
            kind,
            children: Vec::new(),
        });
    }

    fn end(&mut self) -> Result<(), ParseError> {
        if self.stack.len() < 2 {
            return Err(ParseError::UnbalancedEnd);
        }
        let frame = self.stack.pop().unwrap_or_default();
        let parent = self.current();
        match frame.kind {
            None => {
                for child in frame.children {
                    match child {
                        DocumentNode::Text { content, anchors } => {
                            parent.push_text(&content, &anchors)
                        }
                        other => parent.children.push(other),
                    }
                }
            }
            Some(NodeKind::Image { url, .. }) => {
                // Image text events are the alt text, not rendered content.
                let alt = frame
                    .children
                    .iter()
                    .map(DocumentNode::text_content)
                    .collect::<String>();
                parent.children.push(DocumentNode::element(
                    NodeKind::Image { url, alt },
                    Vec::new(),
                ));
            }
            Some(NodeKind::ListItem) => {
                let children = wrap_inline_runs(frame.children);
                parent
                    .children
                    .push(DocumentNode::element(NodeKind::ListItem, children));
            }
            Some(kind) => {
                parent
                    .children
                    .push(DocumentNode::element(kind, frame.children));
            }
        }
        Ok(())
    }

    fn finish(mut self) -> Result<Vec<DocumentNode>, ParseError> {
        if self.stack.len() != 1 {
            return Err(ParseError::UnclosedTags {
                depth: self.stack.len() - 1,
            });
        }
        let root = self.stack.pop().unwrap_or_default();
        Ok(wrap_inline_runs(root.children))
    }
}

/// Group consecutive inline nodes into implicit paragraphs, so tight list
/// items are block-separated the same way loose ones are.
fn wrap_inline_runs(children: Vec<DocumentNode>) -> Vec<DocumentNode> {
    let mut out = Vec::with_capacity(children.len());
    let mut run: Vec<DocumentNode> = Vec::new();
    for child in children {
        let is_block = child.kind().is_some_and(NodeKind::is_block);
        if is_block {
            flush_run(&mut run, &mut out);
            out.push(child);
        } else {
            run.push(child);
        }
    }
    flush_run(&mut run, &mut out);
    out
}

fn flush_run(run: &mut Vec<DocumentNode>, out: &mut Vec<DocumentNode>) {
    if run.is_empty() {
        return;
    }
    // Whitespace-only runs between blocks carry nothing visible.
    let visible = run
        .iter()
        .any(|node| node.kind().is_some() || !node.text_content().trim().is_empty());
    let children = std::mem::take(run);
    if visible {
        out.push(DocumentNode::element(NodeKind::Paragraph, children));
    }
}
