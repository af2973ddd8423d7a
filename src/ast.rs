/// Document tree produced by the parser and consumed by the renderer
use serde::{Deserialize, Serialize};
use std::io;

/// A byte range into the immutable source buffer.
///
/// Nodes reference source text through segments instead of owning copies.
/// The parser guarantees `start <= end <= source.len()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub start: usize,
    pub end: usize,
}

impl Segment {
    pub fn new(start: usize, end: usize) -> Segment {
        Segment { start, end }
    }

    /// The source bytes this segment covers.
    pub fn value<'a>(&self, source: &'a [u8]) -> &'a [u8] {
        &source[self.start..self.end]
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// An arbitrary name/value attribute attached to a node (e.g. a heading id).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

/// Whether an autolink was recognized as a URL or a bare email address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AutoLinkKind {
    Url,
    Email,
}

fn default_list_start() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    Document,
    Heading {
        level: u8,
    },
    Blockquote,
    /// Indented code block; `lines` are the raw source lines, reproduced
    /// byte-for-byte in the output.
    CodeBlock {
        #[serde(default)]
        lines: Vec<Segment>,
    },
    FencedCodeBlock {
        /// The info string following the opening fence, if any.
        #[serde(default)]
        info: Option<Segment>,
        #[serde(default)]
        lines: Vec<Segment>,
    },
    HtmlBlock {
        #[serde(default)]
        lines: Vec<Segment>,
        /// The closing line of a type-1..5 block, when present.
        #[serde(default)]
        closure_line: Option<Segment>,
    },
    List {
        ordered: bool,
        #[serde(default = "default_list_start")]
        start: u32,
    },
    ListItem,
    Paragraph,
    /// Paragraph-like block without `<p>` tags, used for tight list items.
    TextBlock,
    ThematicBreak,
    AutoLink {
        kind: AutoLinkKind,
        value: Segment,
    },
    /// Inline code; children are Text nodes rendered by the span itself.
    CodeSpan,
    /// `level` 1 renders `<em>`, 2 renders `<strong>`.
    Emphasis {
        level: u8,
    },
    Image {
        destination: String,
        #[serde(default)]
        title: Option<String>,
    },
    Link {
        destination: String,
        #[serde(default)]
        title: Option<String>,
    },
    /// Inline raw HTML; children are raw Text nodes.
    RawHtml,
    Text {
        segment: Segment,
        /// Raw text is copied to the output without decoding or escaping.
        #[serde(default)]
        raw: bool,
        #[serde(default)]
        soft_break: bool,
        #[serde(default)]
        hard_break: bool,
    },
}

/// One element of the parsed document tree.
///
/// Trees are built entirely by the parser before rendering begins and are
/// never mutated by the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub kind: NodeKind,
    #[serde(default)]
    pub children: Vec<Node>,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
}

impl Node {
    pub fn new(kind: NodeKind) -> Node {
        Node {
            kind,
            children: Vec::new(),
            attributes: Vec::new(),
        }
    }

    pub fn with_children(kind: NodeKind, children: Vec<Node>) -> Node {
        Node {
            kind,
            children,
            attributes: Vec::new(),
        }
    }

    pub fn append_child(&mut self, child: Node) {
        self.children.push(child);
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attributes.push(Attribute {
            name: name.into(),
            value: value.into(),
        });
    }

    /// Flattens the plain text of this subtree: the concatenated source
    /// bytes of every descendant Text node, discarding all markup.
    pub fn text(&self, source: &[u8]) -> Vec<u8> {
        match &self.kind {
            NodeKind::Text { segment, .. } => segment.value(source).to_vec(),
            _ => {
                let mut out = Vec::new();
                for child in &self.children {
                    out.extend_from_slice(&child.text(source));
                }
                out
            }
        }
    }
}

/// Signal returned by a visit: keep descending, or skip the node's subtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkStatus {
    Continue,
    SkipChildren,
}

/// Walks the tree depth-first, visiting every node twice (enter, exit) in
/// document order.
///
/// The visitor receives the node, whether this is the enter visit, and
/// whether a sibling follows the node in its parent. Returning
/// `SkipChildren` from an enter visit suppresses all visits below the node;
/// the node's own exit visit still occurs.
pub fn walk<F>(root: &Node, f: &mut F) -> io::Result<()>
where
    F: FnMut(&Node, bool, bool) -> io::Result<WalkStatus>,
{
    walk_at(root, false, f)
}

fn walk_at<F>(node: &Node, has_next: bool, f: &mut F) -> io::Result<()>
where
    F: FnMut(&Node, bool, bool) -> io::Result<WalkStatus>,
{
    let status = f(node, true, has_next)?;
    if status != WalkStatus::SkipChildren {
        let count = node.children.len();
        for (i, child) in node.children.iter().enumerate() {
            walk_at(child, i + 1 < count, f)?;
        }
    }
    f(node, false, has_next)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_node(start: usize, end: usize) -> Node {
        Node::new(NodeKind::Text {
            segment: Segment::new(start, end),
            raw: false,
            soft_break: false,
            hard_break: false,
        })
    }

    #[test]
    fn test_segment_value() {
        let source = b"hello world";
        let segment = Segment::new(6, 11);
        assert_eq!(segment.value(source), b"world");
        assert_eq!(segment.len(), 5);
        assert!(!segment.is_empty());
        assert!(Segment::new(3, 3).is_empty());
    }

    #[test]
    fn test_walk_visits_enter_and_exit_in_document_order() {
        let doc = Node::with_children(
            NodeKind::Document,
            vec![Node::with_children(
                NodeKind::Paragraph,
                vec![text_node(0, 1), text_node(1, 2)],
            )],
        );
        let mut visits = Vec::new();
        walk(&doc, &mut |node, entering, has_next| {
            let name = match node.kind {
                NodeKind::Document => "document",
                NodeKind::Paragraph => "paragraph",
                _ => "text",
            };
            visits.push((name, entering, has_next));
            Ok(WalkStatus::Continue)
        })
        .unwrap();
        assert_eq!(
            visits,
            vec![
                ("document", true, false),
                ("paragraph", true, false),
                ("text", true, true),
                ("text", false, true),
                ("text", true, false),
                ("text", false, false),
                ("paragraph", false, false),
                ("document", false, false),
            ]
        );
    }

    #[test]
    fn test_walk_skip_children_still_exits_the_node() {
        let doc = Node::with_children(
            NodeKind::Document,
            vec![Node::with_children(NodeKind::CodeSpan, vec![text_node(0, 3)])],
        );
        let mut span_exits = 0;
        let mut text_visits = 0;
        walk(&doc, &mut |node, entering, _| {
            match node.kind {
                NodeKind::CodeSpan if entering => return Ok(WalkStatus::SkipChildren),
                NodeKind::CodeSpan => span_exits += 1,
                NodeKind::Text { .. } => text_visits += 1,
                _ => {}
            }
            Ok(WalkStatus::Continue)
        })
        .unwrap();
        assert_eq!(span_exits, 1);
        assert_eq!(text_visits, 0);
    }

    #[test]
    fn test_text_flattens_nested_inlines() {
        let source = b"foo bar";
        let tree = Node::with_children(
            NodeKind::Paragraph,
            vec![
                text_node(0, 3),
                Node::with_children(NodeKind::Emphasis { level: 1 }, vec![text_node(3, 7)]),
            ],
        );
        assert_eq!(tree.text(source), b"foo bar");
    }
}
