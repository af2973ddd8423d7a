/// (X)HTML renderer for the document tree
use std::io::{self, Write};

use crate::ast::{self, AutoLinkKind, Node, NodeKind, Segment, WalkStatus};
use crate::escape::{DefaultTextWriter, TextWriter};
use crate::url::{escape_url, is_dangerous_url};

/// Rendering options, fixed for the duration of one render pass.
pub struct Config {
    /// Render soft line breaks as `<br>` tags.
    pub hard_wraps: bool,
    /// Emit self-closing void elements (`<br />`, `<hr />`).
    pub xhtml: bool,
    /// Pass raw HTML and dangerous URLs through unmodified.
    pub allow_unsafe: bool,
    /// Encoder used for all literal text.
    pub text_writer: Box<dyn TextWriter>,
}

impl Config {
    pub fn new() -> Config {
        Config {
            hard_wraps: false,
            xhtml: false,
            allow_unsafe: false,
            text_writer: Box::new(DefaultTextWriter),
        }
    }

    pub fn with_hard_wraps(mut self) -> Config {
        self.hard_wraps = true;
        self
    }

    pub fn with_xhtml(mut self) -> Config {
        self.xhtml = true;
        self
    }

    pub fn with_unsafe(mut self) -> Config {
        self.allow_unsafe = true;
        self
    }

    pub fn with_text_writer(mut self, text_writer: Box<dyn TextWriter>) -> Config {
        self.text_writer = text_writer;
        self
    }
}

impl Default for Config {
    fn default() -> Config {
        Config::new()
    }
}

/// Renders a document tree as (X)HTML.
///
/// Every node is visited twice in document order; each kind's handler emits
/// its opening markup on enter and closing markup on exit, delegating
/// literal text through the configured `TextWriter`.
pub struct HtmlRenderer {
    config: Config,
}

impl HtmlRenderer {
    pub fn new() -> HtmlRenderer {
        HtmlRenderer::with_config(Config::new())
    }

    pub fn with_config(config: Config) -> HtmlRenderer {
        HtmlRenderer { config }
    }

    /// Renders `root` to `w`. `source` is the buffer the tree's segments
    /// point into. Fails only on sink I/O errors.
    pub fn render(&self, w: &mut dyn Write, source: &[u8], root: &Node) -> io::Result<()> {
        ast::walk(root, &mut |node, entering, has_next| {
            self.render_node(w, source, node, entering, has_next)
        })
    }

    fn render_node(
        &self,
        w: &mut dyn Write,
        source: &[u8],
        node: &Node,
        entering: bool,
        has_next: bool,
    ) -> io::Result<WalkStatus> {
        match &node.kind {
            NodeKind::Document => {}
            NodeKind::Heading { level } => {
                if entering {
                    write!(w, "<h{}", level)?;
                    self.render_attributes(w, node)?;
                    w.write_all(b">")?;
                } else {
                    write!(w, "</h{}>\n", level)?;
                }
            }
            NodeKind::Blockquote => {
                if entering {
                    w.write_all(b"<blockquote>\n")?;
                } else {
                    w.write_all(b"</blockquote>\n")?;
                }
            }
            NodeKind::CodeBlock { lines } => {
                if entering {
                    w.write_all(b"<pre><code>")?;
                    self.write_lines(w, source, lines)?;
                } else {
                    w.write_all(b"</code></pre>\n")?;
                }
            }
            NodeKind::FencedCodeBlock { info, lines } => {
                if entering {
                    w.write_all(b"<pre><code")?;
                    if let Some(info) = info {
                        let info = info.value(source);
                        let language = match info.iter().position(|&c| c == b' ') {
                            Some(i) => &info[..i],
                            None => info,
                        };
                        w.write_all(b" class=\"language-")?;
                        self.config.text_writer.write(w, language)?;
                        w.write_all(b"\"")?;
                    }
                    w.write_all(b">")?;
                    self.write_lines(w, source, lines)?;
                } else {
                    w.write_all(b"</code></pre>\n")?;
                }
            }
            NodeKind::HtmlBlock { lines, closure_line } => {
                if entering {
                    if self.config.allow_unsafe {
                        for line in lines {
                            w.write_all(line.value(source))?;
                        }
                    } else {
                        w.write_all(b"<!-- raw HTML omitted -->\n")?;
                    }
                } else if let Some(closure) = closure_line {
                    if self.config.allow_unsafe {
                        w.write_all(closure.value(source))?;
                    } else {
                        w.write_all(b"<!-- raw HTML omitted -->\n")?;
                    }
                }
            }
            NodeKind::List { ordered, start } => {
                let tag: &[u8] = if *ordered { b"ol" } else { b"ul" };
                if entering {
                    w.write_all(b"<")?;
                    w.write_all(tag)?;
                    if *ordered && *start != 1 {
                        write!(w, " start=\"{}\">\n", start)?;
                    } else {
                        w.write_all(b">\n")?;
                    }
                } else {
                    w.write_all(b"</")?;
                    w.write_all(tag)?;
                    w.write_all(b">\n")?;
                }
            }
            NodeKind::ListItem => {
                if entering {
                    w.write_all(b"<li>")?;
                    // Tight items start with a TextBlock and stay on one line.
                    if let Some(first) = node.children.first() {
                        if !matches!(first.kind, NodeKind::TextBlock) {
                            w.write_all(b"\n")?;
                        }
                    }
                } else {
                    w.write_all(b"</li>\n")?;
                }
            }
            NodeKind::Paragraph => {
                if entering {
                    w.write_all(b"<p>")?;
                } else {
                    w.write_all(b"</p>\n")?;
                }
            }
            NodeKind::TextBlock => {
                if !entering && has_next && !node.children.is_empty() {
                    w.write_all(b"\n")?;
                }
            }
            NodeKind::ThematicBreak => {
                if entering {
                    if self.config.xhtml {
                        w.write_all(b"<hr />\n")?;
                    } else {
                        w.write_all(b"<hr>\n")?;
                    }
                }
            }
            NodeKind::AutoLink { kind, value } => {
                if entering {
                    let value = value.value(source);
                    w.write_all(b"<a href=\"")?;
                    if *kind == AutoLinkKind::Email && !has_mailto_prefix(value) {
                        w.write_all(b"mailto:")?;
                    }
                    let escaped = escape_url(value, false);
                    self.config.text_writer.raw_write(w, &escaped)?;
                    w.write_all(b"\">")?;
                    self.config.text_writer.raw_write(w, value)?;
                    w.write_all(b"</a>")?;
                }
            }
            NodeKind::CodeSpan => {
                if entering {
                    w.write_all(b"<code>")?;
                    let count = node.children.len();
                    for (i, child) in node.children.iter().enumerate() {
                        if let NodeKind::Text { segment, .. } = &child.kind {
                            let value = segment.value(source);
                            if value.ends_with(b"\n") {
                                self.config.text_writer.raw_write(w, &value[..value.len() - 1])?;
                                if i + 1 < count {
                                    self.config.text_writer.raw_write(w, b" ")?;
                                }
                            } else {
                                self.config.text_writer.raw_write(w, value)?;
                            }
                        }
                    }
                    return Ok(WalkStatus::SkipChildren);
                }
                w.write_all(b"</code>")?;
            }
            NodeKind::Emphasis { level } => {
                let tag: &[u8] = if *level == 2 { b"strong" } else { b"em" };
                if entering {
                    w.write_all(b"<")?;
                    w.write_all(tag)?;
                    w.write_all(b">")?;
                } else {
                    w.write_all(b"</")?;
                    w.write_all(tag)?;
                    w.write_all(b">")?;
                }
            }
            NodeKind::Link { destination, title } => {
                if entering {
                    w.write_all(b"<a href=\"")?;
                    self.write_destination(w, destination.as_bytes())?;
                    w.write_all(b"\"")?;
                    if let Some(title) = title {
                        w.write_all(b" title=\"")?;
                        self.config.text_writer.write(w, title.as_bytes())?;
                        w.write_all(b"\"")?;
                    }
                    w.write_all(b">")?;
                } else {
                    w.write_all(b"</a>")?;
                }
            }
            NodeKind::Image { destination, title } => {
                if entering {
                    w.write_all(b"<img src=\"")?;
                    self.write_destination(w, destination.as_bytes())?;
                    w.write_all(b"\" alt=\"")?;
                    w.write_all(&node.text(source))?;
                    w.write_all(b"\"")?;
                    if let Some(title) = title {
                        w.write_all(b" title=\"")?;
                        self.config.text_writer.write(w, title.as_bytes())?;
                        w.write_all(b"\"")?;
                    }
                    if self.config.xhtml {
                        w.write_all(b" />")?;
                    } else {
                        w.write_all(b">")?;
                    }
                    return Ok(WalkStatus::SkipChildren);
                }
            }
            NodeKind::RawHtml => {
                if !self.config.allow_unsafe {
                    if entering {
                        w.write_all(b"<!-- raw HTML omitted -->")?;
                    }
                    return Ok(WalkStatus::SkipChildren);
                }
            }
            NodeKind::Text {
                segment,
                raw,
                soft_break,
                hard_break,
            } => {
                if entering {
                    let value = segment.value(source);
                    if *raw {
                        w.write_all(value)?;
                    } else {
                        self.config.text_writer.write(w, value)?;
                        if *hard_break || (*soft_break && self.config.hard_wraps) {
                            if self.config.xhtml {
                                w.write_all(b"<br />\n")?;
                            } else {
                                w.write_all(b"<br>\n")?;
                            }
                        } else if *soft_break {
                            w.write_all(b"\n")?;
                        }
                    }
                }
            }
        }
        Ok(WalkStatus::Continue)
    }

    /// Writes an href/src value, dropping destinations the classifier
    /// rejects unless unsafe rendering is on. The attribute itself is
    /// always emitted.
    fn write_destination(&self, w: &mut dyn Write, destination: &[u8]) -> io::Result<()> {
        if self.config.allow_unsafe || !is_dangerous_url(destination) {
            let escaped = escape_url(destination, true);
            self.config.text_writer.raw_write(w, &escaped)?;
        }
        Ok(())
    }

    /// Emits a node's attributes as ` name="value"` pairs. Values are
    /// trusted as pre-sanitized by the parser and written unescaped.
    fn render_attributes(&self, w: &mut dyn Write, node: &Node) -> io::Result<()> {
        for attr in &node.attributes {
            write!(w, " {}=\"{}\"", attr.name, attr.value)?;
        }
        Ok(())
    }

    fn write_lines(&self, w: &mut dyn Write, source: &[u8], lines: &[Segment]) -> io::Result<()> {
        for line in lines {
            self.config.text_writer.raw_write(w, line.value(source))?;
        }
        Ok(())
    }
}

impl Default for HtmlRenderer {
    fn default() -> HtmlRenderer {
        HtmlRenderer::new()
    }
}

fn has_mailto_prefix(value: &[u8]) -> bool {
    value.len() >= 7 && value[..7].eq_ignore_ascii_case(b"mailto:")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Attribute;
    use pretty_assertions::assert_eq;

    fn text(start: usize, end: usize) -> Node {
        Node::new(NodeKind::Text {
            segment: Segment::new(start, end),
            raw: false,
            soft_break: false,
            hard_break: false,
        })
    }

    fn render_with(config: Config, source: &[u8], root: &Node) -> String {
        let mut out = Vec::new();
        HtmlRenderer::with_config(config)
            .render(&mut out, source, root)
            .unwrap();
        String::from_utf8(out).unwrap()
    }

    fn render(source: &[u8], root: &Node) -> String {
        render_with(Config::new(), source, root)
    }

    #[test]
    fn test_document_is_a_silent_container() {
        let doc = Node::new(NodeKind::Document);
        assert_eq!(render(b"", &doc), "");
    }

    #[test]
    fn test_heading_levels_and_attributes() {
        let source = b"section";
        let mut heading = Node::with_children(NodeKind::Heading { level: 3 }, vec![text(0, 7)]);
        assert_eq!(render(source, &heading), "<h3>section</h3>\n");
        heading.attributes.push(Attribute {
            name: "id".to_owned(),
            value: "x".to_owned(),
        });
        assert_eq!(render(source, &heading), "<h3 id=\"x\">section</h3>\n");
    }

    #[test]
    fn test_paragraph_and_blockquote() {
        let source = b"quoted";
        let tree = Node::with_children(
            NodeKind::Blockquote,
            vec![Node::with_children(NodeKind::Paragraph, vec![text(0, 6)])],
        );
        assert_eq!(
            render(source, &tree),
            "<blockquote>\n<p>quoted</p>\n</blockquote>\n"
        );
    }

    #[test]
    fn test_code_block_lines_are_copied_without_decoding() {
        let source = b"let x = a &amp; b;\n";
        let block = Node::new(NodeKind::CodeBlock {
            lines: vec![Segment::new(0, source.len())],
        });
        assert_eq!(
            render(source, &block),
            "<pre><code>let x = a &amp;amp; b;\n</code></pre>\n"
        );
    }

    #[test]
    fn test_fenced_code_block_language_class() {
        let source = b"rust linenos\nfn main() {}\n";
        let block = Node::new(NodeKind::FencedCodeBlock {
            info: Some(Segment::new(0, 12)),
            lines: vec![Segment::new(13, source.len())],
        });
        assert_eq!(
            render(source, &block),
            "<pre><code class=\"language-rust\">fn main() {}\n</code></pre>\n"
        );
    }

    #[test]
    fn test_fenced_code_block_without_info_omits_class() {
        let source = b"x\n";
        let block = Node::new(NodeKind::FencedCodeBlock {
            info: None,
            lines: vec![Segment::new(0, 2)],
        });
        assert_eq!(render(source, &block), "<pre><code>x\n</code></pre>\n");
    }

    #[test]
    fn test_fenced_info_is_decoded() {
        let source = b"c&#43;&#43;\n";
        let block = Node::new(NodeKind::FencedCodeBlock {
            info: Some(Segment::new(0, 11)),
            lines: vec![],
        });
        assert_eq!(
            render(source, &block),
            "<pre><code class=\"language-c++\"></code></pre>\n"
        );
    }

    #[test]
    fn test_html_block_is_replaced_unless_unsafe() {
        let source = b"<div>\nhi\n</div>\n";
        let block = Node::new(NodeKind::HtmlBlock {
            lines: vec![Segment::new(0, 9)],
            closure_line: Some(Segment::new(9, 16)),
        });
        assert_eq!(
            render(source, &block),
            "<!-- raw HTML omitted -->\n<!-- raw HTML omitted -->\n"
        );
        assert_eq!(
            render_with(Config::new().with_unsafe(), source, &block),
            "<div>\nhi\n</div>\n"
        );
    }

    #[test]
    fn test_html_block_without_closure_line() {
        let source = b"<hr>\n";
        let block = Node::new(NodeKind::HtmlBlock {
            lines: vec![Segment::new(0, 5)],
            closure_line: None,
        });
        assert_eq!(render(source, &block), "<!-- raw HTML omitted -->\n");
    }

    #[test]
    fn test_unordered_list() {
        let source = b"a";
        let list = Node::with_children(
            NodeKind::List {
                ordered: false,
                start: 1,
            },
            vec![Node::with_children(
                NodeKind::ListItem,
                vec![Node::with_children(NodeKind::TextBlock, vec![text(0, 1)])],
            )],
        );
        assert_eq!(render(source, &list), "<ul>\n<li>a</li>\n</ul>\n");
    }

    #[test]
    fn test_ordered_list_start_offset() {
        let source = b"a";
        let item = Node::with_children(
            NodeKind::ListItem,
            vec![Node::with_children(NodeKind::TextBlock, vec![text(0, 1)])],
        );
        let at_one = Node::with_children(
            NodeKind::List {
                ordered: true,
                start: 1,
            },
            vec![item.clone()],
        );
        assert_eq!(render(source, &at_one), "<ol>\n<li>a</li>\n</ol>\n");
        let at_five = Node::with_children(
            NodeKind::List {
                ordered: true,
                start: 5,
            },
            vec![item],
        );
        assert_eq!(render(source, &at_five), "<ol start=\"5\">\n<li>a</li>\n</ol>\n");
    }

    #[test]
    fn test_loose_list_item_opens_on_its_own_line() {
        let source = b"a";
        let item = Node::with_children(
            NodeKind::ListItem,
            vec![Node::with_children(NodeKind::Paragraph, vec![text(0, 1)])],
        );
        assert_eq!(render(source, &item), "<li>\n<p>a</p>\n</li>\n");
    }

    #[test]
    fn test_text_block_newline_between_siblings() {
        let source = b"ab";
        let item = Node::with_children(
            NodeKind::ListItem,
            vec![
                Node::with_children(NodeKind::TextBlock, vec![text(0, 1)]),
                Node::with_children(NodeKind::TextBlock, vec![text(1, 2)]),
            ],
        );
        assert_eq!(render(source, &item), "<li>a\nb</li>\n");
    }

    #[test]
    fn test_empty_text_block_emits_no_newline() {
        let source = b"a";
        let item = Node::with_children(
            NodeKind::ListItem,
            vec![
                Node::new(NodeKind::TextBlock),
                Node::with_children(NodeKind::TextBlock, vec![text(0, 1)]),
            ],
        );
        assert_eq!(render(source, &item), "<li>a</li>\n");
    }

    #[test]
    fn test_thematic_break() {
        let hr = Node::new(NodeKind::ThematicBreak);
        assert_eq!(render(b"", &hr), "<hr>\n");
        assert_eq!(render_with(Config::new().with_xhtml(), b"", &hr), "<hr />\n");
    }

    #[test]
    fn test_autolink_url() {
        let source = b"https://example.com/?a=1&b=2";
        let link = Node::new(NodeKind::AutoLink {
            kind: AutoLinkKind::Url,
            value: Segment::new(0, source.len()),
        });
        assert_eq!(
            render(source, &link),
            "<a href=\"https://example.com/?a=1&amp;b=2\">https://example.com/?a=1&amp;b=2</a>"
        );
    }

    #[test]
    fn test_autolink_email_gets_mailto_prefix() {
        let source = b"user@example.com";
        let link = Node::new(NodeKind::AutoLink {
            kind: AutoLinkKind::Email,
            value: Segment::new(0, source.len()),
        });
        assert_eq!(
            render(source, &link),
            "<a href=\"mailto:user@example.com\">user@example.com</a>"
        );
    }

    #[test]
    fn test_autolink_email_existing_prefix_is_kept() {
        let source = b"MAILTO:user@example.com";
        let link = Node::new(NodeKind::AutoLink {
            kind: AutoLinkKind::Email,
            value: Segment::new(0, source.len()),
        });
        assert_eq!(
            render(source, &link),
            "<a href=\"MAILTO:user@example.com\">MAILTO:user@example.com</a>"
        );
    }

    #[test]
    fn test_code_span_collapses_trailing_newlines() {
        let source = b"foo\nbar";
        let span = Node::with_children(NodeKind::CodeSpan, vec![text(0, 4), text(4, 7)]);
        assert_eq!(render(source, &span), "<code>foo bar</code>");
    }

    #[test]
    fn test_code_span_last_child_newline_is_stripped_without_space() {
        let source = b"foo\n";
        let span = Node::with_children(NodeKind::CodeSpan, vec![text(0, 4)]);
        assert_eq!(render(source, &span), "<code>foo</code>");
    }

    #[test]
    fn test_code_span_does_not_decode_references() {
        let source = b"a &amp; b";
        let span = Node::with_children(NodeKind::CodeSpan, vec![text(0, 9)]);
        assert_eq!(render(source, &span), "<code>a &amp;amp; b</code>");
    }

    #[test]
    fn test_emphasis_levels() {
        let source = b"x";
        let em = Node::with_children(NodeKind::Emphasis { level: 1 }, vec![text(0, 1)]);
        assert_eq!(render(source, &em), "<em>x</em>");
        let strong = Node::with_children(NodeKind::Emphasis { level: 2 }, vec![text(0, 1)]);
        assert_eq!(render(source, &strong), "<strong>x</strong>");
    }

    #[test]
    fn test_link_with_title() {
        let source = b"text";
        let link = Node::with_children(
            NodeKind::Link {
                destination: "/url".to_owned(),
                title: Some("the \"title\"".to_owned()),
            },
            vec![text(0, 4)],
        );
        assert_eq!(
            render(source, &link),
            "<a href=\"/url\" title=\"the &quot;title&quot;\">text</a>"
        );
    }

    #[test]
    fn test_dangerous_link_keeps_element_drops_url() {
        let source = b"click";
        let link = Node::with_children(
            NodeKind::Link {
                destination: "javascript:alert(1)".to_owned(),
                title: None,
            },
            vec![text(0, 5)],
        );
        assert_eq!(render(source, &link), "<a href=\"\">click</a>");
        assert_eq!(
            render_with(Config::new().with_unsafe(), source, &link),
            "<a href=\"javascript:alert(1)\">click</a>"
        );
    }

    #[test]
    fn test_link_destination_is_resolved_and_escaped() {
        let source = b"x";
        let link = Node::with_children(
            NodeKind::Link {
                destination: "/a b?q=r&s".to_owned(),
                title: None,
            },
            vec![text(0, 1)],
        );
        assert_eq!(render(source, &link), "<a href=\"/a%20b?q=r&amp;s\">x</a>");
    }

    #[test]
    fn test_image_flattens_alt_text_and_skips_children() {
        let source = b"foo bar";
        let image = Node::with_children(
            NodeKind::Image {
                destination: "/img.png".to_owned(),
                title: Some("t".to_owned()),
            },
            vec![
                text(0, 4),
                Node::with_children(NodeKind::Emphasis { level: 1 }, vec![text(4, 7)]),
            ],
        );
        assert_eq!(
            render(source, &image),
            "<img src=\"/img.png\" alt=\"foo bar\" title=\"t\">"
        );
        assert_eq!(
            render_with(Config::new().with_xhtml(), source, &image),
            "<img src=\"/img.png\" alt=\"foo bar\" title=\"t\" />"
        );
    }

    #[test]
    fn test_image_data_uri_policy() {
        let source = b"";
        let safe = Node::new(NodeKind::Image {
            destination: "data:image/png;base64,AAAA".to_owned(),
            title: None,
        });
        assert_eq!(
            render(source, &safe),
            "<img src=\"data:image/png;base64,AAAA\" alt=\"\">"
        );
        let unsafe_uri = Node::new(NodeKind::Image {
            destination: "data:image/svg+xml;base64,AAAA".to_owned(),
            title: None,
        });
        assert_eq!(render(source, &unsafe_uri), "<img src=\"\" alt=\"\">");
    }

    #[test]
    fn test_raw_html_is_replaced_unless_unsafe() {
        let source = b"<b onclick=\"x()\">";
        let raw = Node::with_children(
            NodeKind::RawHtml,
            vec![Node::new(NodeKind::Text {
                segment: Segment::new(0, source.len()),
                raw: true,
                soft_break: false,
                hard_break: false,
            })],
        );
        assert_eq!(render(source, &raw), "<!-- raw HTML omitted -->");
        assert_eq!(
            render_with(Config::new().with_unsafe(), source, &raw),
            "<b onclick=\"x()\">"
        );
    }

    #[test]
    fn test_text_line_breaks() {
        let source = b"ab";
        let soft = Node::new(NodeKind::Text {
            segment: Segment::new(0, 1),
            raw: false,
            soft_break: true,
            hard_break: false,
        });
        assert_eq!(render(source, &soft), "a\n");
        assert_eq!(
            render_with(Config::new().with_hard_wraps(), source, &soft),
            "a<br>\n"
        );
        let hard = Node::new(NodeKind::Text {
            segment: Segment::new(0, 1),
            raw: false,
            soft_break: false,
            hard_break: true,
        });
        assert_eq!(render(source, &hard), "a<br>\n");
        assert_eq!(
            render_with(Config::new().with_xhtml(), source, &hard),
            "a<br />\n"
        );
    }

    #[test]
    fn test_raw_text_bypasses_the_encoder() {
        let source = b"a &amp; <b>";
        let raw = Node::new(NodeKind::Text {
            segment: Segment::new(0, source.len()),
            raw: true,
            soft_break: false,
            hard_break: false,
        });
        assert_eq!(render(source, &raw), "a &amp; <b>");
    }
}
