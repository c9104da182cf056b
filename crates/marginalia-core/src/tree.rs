//! Parsed document tree.
//!
//! Only `Text` leaves carry characters. Every other variant is a container
//! whose meaning comes from its kind and children.

use serde::Serialize;
use smol_str::SmolStr;

/// Path from the root sequence to a node: one child index per level.
pub type NodePath = Vec<usize>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeKind {
    Heading { level: u8 },
    Paragraph,
    BlockQuote,
    List { ordered: bool },
    ListItem,
    CodeBlock { lang: Option<SmolStr> },
    Table,
    TableRow,
    TableCell,
    Rule,
    Link { url: SmolStr },
    Image { url: SmolStr, alt: String },
    CodeInline,
    Emphasis,
    Strong,
    Strikethrough,
}

impl NodeKind {
    /// Containers that get a `\n\n` separator around their content in plain text.
    pub fn is_separated_block(&self) -> bool {
        matches!(
            self,
            NodeKind::Heading { .. }
                | NodeKind::Paragraph
                | NodeKind::BlockQuote
                | NodeKind::CodeBlock { .. }
                | NodeKind::TableRow
                | NodeKind::Rule
        )
    }

    /// Block-level kinds. Inline content directly under these (outside a
    /// paragraph) gets wrapped in an implicit paragraph.
    pub fn is_block(&self) -> bool {
        matches!(
            self,
            NodeKind::Heading { .. }
                | NodeKind::Paragraph
                | NodeKind::BlockQuote
                | NodeKind::List { .. }
                | NodeKind::ListItem
                | NodeKind::CodeBlock { .. }
                | NodeKind::Table
                | NodeKind::TableRow
                | NodeKind::TableCell
                | NodeKind::Rule
        )
    }
}

/// Where a piece of a text leaf came from in the markdown source.
///
/// `len` chars starting at `local` in the leaf content are a verbatim copy of
/// the source starting at char offset `source`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceAnchor {
    pub local: usize,
    pub source: usize,
    pub len: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum DocumentNode {
    Text {
        content: String,
        #[serde(skip)]
        anchors: Vec<SourceAnchor>,
    },
    Element {
        #[serde(flatten)]
        kind: NodeKind,
        children: Vec<DocumentNode>,
    },
}

impl DocumentNode {
    pub fn text(content: impl Into<String>) -> Self {
        DocumentNode::Text {
            content: content.into(),
            anchors: Vec::new(),
        }
    }

    pub fn element(kind: NodeKind, children: Vec<DocumentNode>) -> Self {
        DocumentNode::Element { kind, children }
    }

    pub fn kind(&self) -> Option<&NodeKind> {
        match self {
            DocumentNode::Text { .. } => None,
            DocumentNode::Element { kind, .. } => Some(kind),
        }
    }

    pub fn children(&self) -> &[DocumentNode] {
        match self {
            DocumentNode::Text { .. } => &[],
            DocumentNode::Element { children, .. } => children,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            DocumentNode::Text { content, .. } => Some(content),
            DocumentNode::Element { .. } => None,
        }
    }

    /// Source anchors of a text leaf; empty for elements.
    pub fn anchors(&self) -> &[SourceAnchor] {
        match self {
            DocumentNode::Text { anchors, .. } => anchors,
            DocumentNode::Element { .. } => &[],
        }
    }

    /// Concatenated content of all descendant text leaves.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            DocumentNode::Text { content, .. } => out.push_str(content),
            DocumentNode::Element { children, .. } => {
                for child in children {
                    child.collect_text(out);
                }
            }
        }
    }
}

/// Resolve a path against a sequence of root nodes.
pub fn node_at<'a>(roots: &'a [DocumentNode], path: &[usize]) -> Option<&'a DocumentNode> {
    let (first, rest) = path.split_first()?;
    let mut node = roots.get(*first)?;
    for idx in rest {
        node = node.children().get(*idx)?;
    }
    Some(node)
}

/// Text content of the leaf at `path`, if the path names a text leaf.
pub fn leaf_text<'a>(roots: &'a [DocumentNode], path: &[usize]) -> Option<&'a str> {
    node_at(roots, path)?.as_text()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_at() {
        let roots = vec![DocumentNode::element(
            NodeKind::Paragraph,
            vec![
                DocumentNode::text("a "),
                DocumentNode::element(NodeKind::Strong, vec![DocumentNode::text("b")]),
            ],
        )];
        assert_eq!(leaf_text(&roots, &[0, 0]), Some("a "));
        assert_eq!(leaf_text(&roots, &[0, 1, 0]), Some("b"));
        assert_eq!(leaf_text(&roots, &[0, 1]), None);
        assert!(node_at(&roots, &[1]).is_none());
        assert!(node_at(&roots, &[]).is_none());
        assert_eq!(roots[0].text_content(), "a b");
    }
}
