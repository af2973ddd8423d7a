/// Renders parsed Markdown document trees as (X)HTML
pub mod ast;
pub mod escape;
pub mod renderer;
pub mod url;

mod entity;

pub use ast::{Node, NodeKind, Segment};
pub use renderer::{Config, HtmlRenderer};

/// Render a document tree to an HTML string with the default options.
///
/// `source` is the original Markdown source the tree's segments point into.
pub fn render_html(root: &Node, source: &[u8]) -> String {
    let renderer = HtmlRenderer::new();
    let mut out = Vec::new();
    renderer
        .render(&mut out, source, root)
        .expect("rendering to an in-memory buffer cannot fail");
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::AutoLinkKind;

    #[test]
    fn test_empty_document() {
        let doc = Node::new(NodeKind::Document);
        assert_eq!(render_html(&doc, b""), "");
    }

    #[test]
    fn test_basic_paragraph() {
        let source = b"hello *world*";
        let doc = Node::with_children(
            NodeKind::Document,
            vec![Node::with_children(
                NodeKind::Paragraph,
                vec![
                    Node::new(NodeKind::Text {
                        segment: Segment::new(0, 6),
                        raw: false,
                        soft_break: false,
                        hard_break: false,
                    }),
                    Node::with_children(
                        NodeKind::Emphasis { level: 1 },
                        vec![Node::new(NodeKind::Text {
                            segment: Segment::new(7, 12),
                            raw: false,
                            soft_break: false,
                            hard_break: false,
                        })],
                    ),
                ],
            )],
        );
        assert_eq!(render_html(&doc, source), "<p>hello <em>world</em></p>\n");
    }

    #[test]
    fn test_basic_link() {
        let source = b"text";
        let doc = Node::with_children(
            NodeKind::Document,
            vec![Node::with_children(
                NodeKind::Paragraph,
                vec![Node::with_children(
                    NodeKind::Link {
                        destination: "/url".to_owned(),
                        title: Some("title".to_owned()),
                    },
                    vec![Node::new(NodeKind::Text {
                        segment: Segment::new(0, 4),
                        raw: false,
                        soft_break: false,
                        hard_break: false,
                    })],
                )],
            )],
        );
        assert_eq!(
            render_html(&doc, source),
            "<p><a href=\"/url\" title=\"title\">text</a></p>\n"
        );
    }

    #[test]
    fn test_autolink_in_paragraph() {
        let source = b"https://example.com";
        let doc = Node::with_children(
            NodeKind::Document,
            vec![Node::with_children(
                NodeKind::Paragraph,
                vec![Node::new(NodeKind::AutoLink {
                    kind: AutoLinkKind::Url,
                    value: Segment::new(0, source.len()),
                })],
            )],
        );
        assert_eq!(
            render_html(&doc, source),
            "<p><a href=\"https://example.com\">https://example.com</a></p>\n"
        );
    }
}
