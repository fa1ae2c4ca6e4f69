//! Combined Markdown + HTML parser built on comrak
//!
//! comrak parses blocks and inlines with source positions. Wherever a group
//! of siblings contains raw HTML, the raw slices are re-lexed by our own
//! tokenizer and merged with the other siblings (as fragment tokens) into
//! one balanced element tree. Anchors and links are collected on the way.

use std::sync::Arc;

use comrak::{
    nodes::{AstNode, ListDelimType, ListType as ComrakListType, NodeList, NodeValue},
    parse_document, Arena, Options,
};
use log::debug;

use crate::config::Dialect;
use crate::error::Result;
use crate::logger::Logger;
use crate::markdown::html_builder::ElementBuilder;
use crate::markdown::html_lexer::{tokenize, Token};
use crate::markdown::link::{Link, LinkMap};
use crate::markdown::node::{ListMarker, MarkdownKind, NodeId, NodeKind, SyntaxTree};
use crate::markdown::slug::AnchorTable;
use crate::text_file::{Span, TextFile};

// ─────────────────────────────────────────────────────────────────────────────
// Public Types
// ─────────────────────────────────────────────────────────────────────────────

/// Dominant line ending of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    #[default]
    Lf,
    CrLf,
}

impl LineEnding {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::CrLf => "\r\n",
        }
    }

    /// Count line starts preceded by `\r\n`; CRLF wins on strict majority.
    pub fn detect(file: &TextFile) -> LineEnding {
        let bytes = file.data().as_bytes();
        let (mut crlf, mut lf) = (0usize, 0usize);
        for &start in file.line_starts().iter().skip(1) {
            if start >= 2 && bytes[start - 2] == b'\r' {
                crlf += 1;
            } else {
                lf += 1;
            }
        }
        if crlf > lf {
            LineEnding::CrLf
        } else {
            LineEnding::Lf
        }
    }
}

/// Everything the later pipeline stages need from one parse.
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    pub tree: SyntaxTree,
    pub links: LinkMap,
    pub anchors: AnchorTable,
    pub line_ending: LineEnding,
    pub dialect: Dialect,
}

impl ParsedDocument {
    pub fn file(&self) -> &Arc<TextFile> {
        self.tree.file()
    }

    /// Root node; always present after a successful parse.
    pub fn root(&self) -> Result<NodeId> {
        self.tree
            .root()
            .ok_or_else(|| crate::error::Error::invariant("parsed document has no root"))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Public API Functions
// ─────────────────────────────────────────────────────────────────────────────

/// Parse a document written in `dialect`.
///
/// Malformed HTML is reported through `logger` and never fails the parse.
///
/// # Example
/// ```ignore
/// let file = Arc::new(TextFile::new("# Hello\n\n[x](#hello)"));
/// let parsed = parse(file, Dialect::GitHub, &MemoryLogger::new())?;
/// assert!(parsed.anchors.contains("hello"));
/// ```
pub fn parse(file: Arc<TextFile>, dialect: Dialect, logger: &dyn Logger) -> Result<ParsedDocument> {
    let arena = Arena::new();
    let mut options = Options::default();
    options.extension.table = true;
    options.extension.strikethrough = true;
    options.extension.front_matter_delimiter = Some("---".to_string());

    let root = parse_document(&arena, file.data(), &options);

    let mut builder = TreeBuilder {
        file: Arc::clone(&file),
        tree: SyntaxTree::new(Arc::clone(&file)),
        links: LinkMap::new(),
        anchors: AnchorTable::new(dialect),
        logger,
    };
    let whole = Span::new(0, file.len());
    match builder.convert(root, whole) {
        Piece::Node(id) => builder.tree.set_root(id),
        Piece::RawHtml(_) => {
            return Err(crate::error::Error::invariant(
                "document root converted to raw HTML",
            ))
        }
    }

    debug!(
        "Parsed {} nodes, {} links, {} anchors",
        builder.tree.len(),
        builder.links.len(),
        builder.anchors.len()
    );

    Ok(ParsedDocument {
        tree: builder.tree,
        links: builder.links,
        anchors: builder.anchors,
        line_ending: LineEnding::detect(&file),
        dialect,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Internal Conversion Functions
// ─────────────────────────────────────────────────────────────────────────────

/// A converted comrak node before HTML reconciliation.
enum Piece {
    Node(NodeId),
    RawHtml(Span),
}

enum Converted {
    Kind(MarkdownKind),
    RawHtml,
}

struct TreeBuilder<'l> {
    file: Arc<TextFile>,
    tree: SyntaxTree,
    links: LinkMap,
    anchors: AnchorTable,
    logger: &'l dyn Logger,
}

impl TreeBuilder<'_> {
    /// Convert a comrak node, keeping its span inside `bounds`.
    fn convert<'a>(&mut self, node: &'a AstNode<'a>, bounds: Span) -> Piece {
        let (converted, span) = {
            let ast = node.data.borrow();
            let span = match &ast.value {
                NodeValue::Document => bounds,
                NodeValue::HtmlBlock(html) => {
                    self.html_block_span(&ast.sourcepos, &html.literal, bounds)
                }
                _ => self.source_span(&ast.sourcepos, bounds),
            };
            (convert_node_value(&ast.value, &self.file, span), span)
        };

        let kind = match converted {
            Converted::RawHtml => return Piece::RawHtml(span),
            Converted::Kind(kind) => kind,
        };

        let mut pieces = Vec::new();
        let mut lower = span.start;
        for child in node.children() {
            let piece = self.convert(child, Span::new(lower, span.end));
            lower = match &piece {
                Piece::Node(id) => self.tree.node(*id).span.end,
                Piece::RawHtml(raw) => raw.end,
            };
            pieces.push(piece);
        }
        let children = self.reconcile(pieces);

        let id = self
            .tree
            .alloc(NodeKind::Markdown(kind.clone()), span, children);
        self.register(id, &kind);
        Piece::Node(id)
    }

    /// Byte span of a comrak source position, clamped into `bounds`.
    fn source_span(&self, sourcepos: &comrak::nodes::Sourcepos, bounds: Span) -> Span {
        let start = self
            .file
            .offset(sourcepos.start.line, sourcepos.start.column);
        let end = self
            .file
            .offset(sourcepos.end.line, sourcepos.end.column + 1)
            .map(|end| self.file.ceil_boundary(end));
        match (start, end) {
            (Some(start), Some(end)) => Span::new(start, end).clamp(bounds.start, bounds.end),
            (Some(start), None) => Span::empty(start).clamp(bounds.start, bounds.end),
            _ => Span::empty(bounds.start),
        }
    }

    /// Span of an HTML block: as many whole source lines as its literal has.
    ///
    /// The engine's end position is unreliable for comment, raw-text,
    /// processing-instruction, declaration and CDATA blocks.
    fn html_block_span(
        &self,
        sourcepos: &comrak::nodes::Sourcepos,
        literal: &str,
        bounds: Span,
    ) -> Span {
        let Some(start) = self
            .file
            .offset(sourcepos.start.line, sourcepos.start.column)
        else {
            return Span::empty(bounds.start);
        };
        let last_line = sourcepos.start.line + literal.lines().count().max(1) - 1;
        let end = self
            .file
            .line_end(last_line.min(self.file.line_count()))
            .unwrap_or(self.file.len());
        Span::new(start, end.max(start)).clamp(bounds.start, bounds.end)
    }

    /// Merge raw HTML siblings with the rest through the element builder.
    fn reconcile(&mut self, pieces: Vec<Piece>) -> Vec<NodeId> {
        if !pieces.iter().any(|p| matches!(p, Piece::RawHtml(_))) {
            return pieces
                .into_iter()
                .filter_map(|p| match p {
                    Piece::Node(id) => Some(id),
                    Piece::RawHtml(_) => None,
                })
                .collect();
        }

        let mut tokens = Vec::new();
        for piece in pieces {
            match piece {
                Piece::Node(id) => tokens.push(Token::Fragment(id)),
                Piece::RawHtml(span) => {
                    let (raw_tokens, issues) = tokenize(self.file.data(), span);
                    for issue in issues {
                        self.logger.error(&format!(
                            "{} at {}",
                            issue.message,
                            self.file.position(issue.offset)
                        ));
                    }
                    tokens.extend(raw_tokens);
                }
            }
        }
        ElementBuilder::new(&mut self.tree, &mut self.links, self.logger, tokens).build()
    }

    /// Record anchors for headings and links for addressed nodes.
    fn register(&mut self, id: NodeId, kind: &MarkdownKind) {
        let span = self.tree.node(id).span;
        match kind {
            MarkdownKind::Heading { .. } => {
                let title = self.tree.plain_text(id);
                let anchor = self.anchors.register(title.trim(), id);
                debug!("Heading '{}' → #{}", anchor.title, anchor.full_link());
            }
            MarkdownKind::Link { url, .. } | MarkdownKind::Image { url, .. } => {
                let is_image = matches!(kind, MarkdownKind::Image { .. });
                let address_span = self.destination_span(id).unwrap_or(span);
                self.links
                    .insert(id, Link::new(id, url, is_image, address_span));
            }
            MarkdownKind::Autolink { url } => {
                let address_span = self
                    .file
                    .slice(span)
                    .find(url.as_str())
                    .map(|at| Span::new(span.start + at, span.start + at + url.len()))
                    .unwrap_or(span);
                self.links.insert(id, Link::new(id, url, false, address_span));
            }
            _ => {}
        }
    }

    /// Locate the destination of an inline link: `](` after the link text,
    /// optional whitespace, then `<dest>` or a run without unbalanced `)`.
    fn destination_span(&self, id: NodeId) -> Option<Span> {
        let node = self.tree.node(id);
        let after_text = node
            .children
            .last()
            .map(|last| self.tree.node(*last).span.end)
            .unwrap_or(node.span.start);
        let data = self.file.data();
        let search = &data[after_text..node.span.end];
        let bracket = search.find("](")?;
        let mut pos = after_text + bracket + 2;
        let bytes = data.as_bytes();
        while pos < node.span.end && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        if pos >= node.span.end {
            return None;
        }
        if bytes[pos] == b'<' {
            let start = pos + 1;
            let close = data[start..node.span.end].find('>')?;
            return Some(Span::new(start, start + close));
        }
        let start = pos;
        let mut depth = 0usize;
        while pos < node.span.end {
            match bytes[pos] {
                b if b.is_ascii_whitespace() => break,
                b'(' => depth += 1,
                b')' if depth == 0 => break,
                b')' => depth -= 1,
                b'\\' => pos += 1,
                _ => {}
            }
            pos += 1;
        }
        let end = pos.min(node.span.end);
        (end > start).then(|| Span::new(start, end))
    }
}

fn list_marker(list: &NodeList) -> ListMarker {
    ListMarker {
        ordered: list.list_type == ComrakListType::Ordered,
        bullet: list.bullet_char as char,
        delimiter: if list.delimiter == ListDelimType::Period {
            '.'
        } else {
            ')'
        },
        start: list.start,
        tight: list.tight,
    }
}

/// Convert a comrak NodeValue to our MarkdownKind.
fn convert_node_value(value: &NodeValue, file: &TextFile, span: Span) -> Converted {
    let kind = match value {
        NodeValue::Document => MarkdownKind::Document,
        NodeValue::FrontMatter(_) => MarkdownKind::FrontMatter,
        NodeValue::BlockQuote => MarkdownKind::Quote,
        NodeValue::List(list) => MarkdownKind::List(list_marker(list)),
        NodeValue::Item(list) => MarkdownKind::ListItem(list_marker(list)),
        NodeValue::CodeBlock(code) => MarkdownKind::CodeBlock {
            fenced: code.fenced,
        },
        NodeValue::HtmlBlock(_) | NodeValue::HtmlInline(_) => return Converted::RawHtml,
        NodeValue::Paragraph => MarkdownKind::Paragraph,
        NodeValue::Heading(heading) => MarkdownKind::Heading {
            level: heading.level,
            setext: heading.setext,
        },
        NodeValue::ThematicBreak => MarkdownKind::ThematicBreak,
        NodeValue::Table(_) => MarkdownKind::Table,
        NodeValue::Text(text) => MarkdownKind::Text(text.to_string()),
        NodeValue::SoftBreak => MarkdownKind::SoftBreak,
        NodeValue::LineBreak => MarkdownKind::LineBreak,
        NodeValue::Code(code) => MarkdownKind::CodeSpan(code.literal.to_string()),
        NodeValue::Emph => MarkdownKind::Emphasis,
        NodeValue::Strong => MarkdownKind::Strong,
        NodeValue::Strikethrough => MarkdownKind::Strikethrough,
        NodeValue::Link(link) => {
            let source = file.slice(span);
            if source.starts_with('<') || !(source.contains('[') || source.contains("](")) {
                MarkdownKind::Autolink {
                    url: link.url.to_string(),
                }
            } else {
                MarkdownKind::Link {
                    url: link.url.to_string(),
                    title: link.title.to_string(),
                }
            }
        }
        NodeValue::Image(link) => MarkdownKind::Image {
            url: link.url.to_string(),
            title: link.title.to_string(),
        },
        other if other.block() => MarkdownKind::OtherBlock,
        _ => MarkdownKind::OtherInline,
    };
    Converted::Kind(kind)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::MemoryLogger;
    use crate::markdown::link::LinkKind;

    fn parse_str(text: &str) -> (ParsedDocument, MemoryLogger) {
        let logger = MemoryLogger::new();
        let parsed = parse(Arc::new(TextFile::new(text)), Dialect::GitHub, &logger).unwrap();
        (parsed, logger)
    }

    fn root_children(parsed: &ParsedDocument) -> Vec<NodeId> {
        let root = parsed.root().unwrap();
        parsed.tree.node(root).children.clone()
    }

    fn assert_tiles(parsed: &ParsedDocument, id: NodeId) {
        let node = parsed.tree.node(id);
        let mut lower = node.span.start;
        for &child in &node.children {
            let span = parsed.tree.node(child).span;
            assert!(span.start >= lower, "child starts before previous sibling ends");
            assert!(node.span.contains(span), "child escapes its parent");
            lower = span.end;
            assert_tiles(parsed, child);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Basic Parsing Tests
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_parse_empty_document() {
        let (parsed, _) = parse_str("");
        assert!(root_children(&parsed).is_empty());
    }

    #[test]
    fn test_parse_blocks() {
        let (parsed, _) = parse_str("# Heading\n\nParagraph\n\n- a\n- b\n\n> quote\n");
        let kinds: Vec<_> = root_children(&parsed)
            .iter()
            .map(|id| parsed.tree.node(*id).markdown().cloned())
            .collect();
        assert!(matches!(kinds[0], Some(MarkdownKind::Heading { level: 1, setext: false })));
        assert!(matches!(kinds[1], Some(MarkdownKind::Paragraph)));
        assert!(matches!(kinds[2], Some(MarkdownKind::List(ListMarker { ordered: false, bullet: '-', .. }))));
        assert!(matches!(kinds[3], Some(MarkdownKind::Quote)));
    }

    #[test]
    fn test_heading_span() {
        let (parsed, _) = parse_str("# Heading\n\nText");
        let heading = root_children(&parsed)[0];
        assert_eq!(parsed.tree.text(heading), "# Heading");
    }

    #[test]
    fn test_spans_tile_the_source() {
        let text = "# T\n\n> a *b* [c](#t)\n> d\n\n1. x\n   - y\n\n<div>\n\nz\n\n</div>\n";
        let (parsed, _) = parse_str(text);
        assert_tiles(&parsed, parsed.root().unwrap());
    }

    // ─────────────────────────────────────────────────────────────────────────
    // HTML Reconciliation Tests
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_html_block_wraps_markdown_fragment() {
        let text = "<details>\n<summary>Title</summary>\n\nBody **text**\n\n</details>\n";
        let (parsed, logger) = parse_str(text);
        assert!(logger.errors().is_empty(), "{:?}", logger.errors());
        let children = root_children(&parsed);
        assert_eq!(children.len(), 1);
        let details = parsed.tree.node(children[0]);
        let element = details.element().expect("details element");
        assert_eq!(element.name, "details");
        assert!(element.end.is_some());
        let has_paragraph = details
            .children
            .iter()
            .any(|c| matches!(parsed.tree.node(*c).markdown(), Some(MarkdownKind::Paragraph)));
        assert!(has_paragraph);
    }

    #[test]
    fn test_inline_html_element() {
        let (parsed, _) = parse_str("Some <b>bold</b> text");
        let paragraph = parsed.tree.node(root_children(&parsed)[0]);
        let bold = paragraph
            .children
            .iter()
            .filter_map(|c| parsed.tree.node(*c).element())
            .next()
            .expect("inline element");
        assert_eq!(bold.name, "b");
        assert!(bold.end.is_some());
    }

    fn comments(parsed: &ParsedDocument) -> Vec<&str> {
        root_children(parsed)
            .into_iter()
            .filter(|id| matches!(parsed.tree.node(*id).kind, NodeKind::HtmlComment))
            .map(|id| parsed.tree.text(id))
            .collect()
    }

    #[test]
    fn test_single_line_block_comment() {
        let (parsed, logger) = parse_str("Text\n\n<!-- block -->\n\nNext\n");
        assert!(logger.errors().is_empty(), "{:?}", logger.errors());
        assert_eq!(comments(&parsed), vec!["<!-- block -->"]);
        assert_tiles(&parsed, parsed.root().unwrap());
    }

    #[test]
    fn test_multi_line_block_comment() {
        let (parsed, logger) = parse_str("Intro\n\n<!-- multi\nline -->\n\nNext\n");
        assert!(logger.errors().is_empty(), "{:?}", logger.errors());
        assert_eq!(comments(&parsed), vec!["<!-- multi\nline -->"]);
    }

    #[test]
    fn test_pre_block_is_one_element() {
        let text = "<pre>\nline one\n\n  line two\n</pre>\n\nAfter\n";
        let (parsed, logger) = parse_str(text);
        assert!(logger.errors().is_empty(), "{:?}", logger.errors());
        let children = root_children(&parsed);
        let pre = parsed.tree.node(children[0]);
        let element = pre.element().expect("pre element");
        assert_eq!(element.name, "pre");
        assert!(element.end.is_some());
        assert_eq!(parsed.tree.text(children[0]), "<pre>\nline one\n\n  line two\n</pre>");
        assert!(matches!(
            parsed.tree.node(children[1]).markdown(),
            Some(MarkdownKind::Paragraph)
        ));
    }

    #[test]
    fn test_script_block_content_is_text() {
        let (_, logger) = parse_str("<script>\nif (a<b) { x(); }\n</script>\n");
        assert!(logger.errors().is_empty(), "{:?}", logger.errors());
    }

    #[test]
    fn test_unbalanced_html_is_reported_not_fatal() {
        let (parsed, logger) = parse_str("<div>\n<span>\n</div>\n");
        let elements = root_children(&parsed)
            .into_iter()
            .filter(|id| parsed.tree.node(*id).element().is_some())
            .count();
        assert_eq!(elements, 1);
        assert_eq!(logger.errors().len(), 1);
        assert!(logger.errors()[0].contains("<span> is not closed"));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Link & Anchor Tests
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_links_are_collected() {
        let text = "[a](https://google.com) [b](#head) ![c](img/c.png) <https://x.org>\n";
        let (parsed, _) = parse_str(text);
        let links: Vec<_> = parsed.links.values().collect();
        assert_eq!(links.len(), 4);
        let kinds: Vec<_> = links.iter().map(|l| (l.kind, l.is_image)).collect();
        assert!(kinds.contains(&(LinkKind::Absolute, false)));
        assert!(kinds.contains(&(LinkKind::Relative, false)));
        assert!(kinds.contains(&(LinkKind::Local, true)));
        for link in links {
            assert_eq!(parsed.file().slice(link.span), link.address);
        }
    }

    #[test]
    fn test_anchors_in_document_order() {
        let (parsed, _) = parse_str("# H2\n\n## H2\n\n### H2 1\n");
        let order: Vec<_> = parsed
            .anchors
            .in_document_order()
            .iter()
            .map(|a| a.full_link())
            .collect();
        assert_eq!(order, vec!["h2", "h2-1", "h2-1-1"]);
    }

    #[test]
    fn test_anchor_title_from_inline_content() {
        let (parsed, _) = parse_str("## Use `cargo` *now*\n");
        let anchor = parsed.anchors.get("use-cargo-now").expect("anchor");
        assert_eq!(anchor.title, "Use cargo now");
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Line Ending Tests
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_line_ending_detection() {
        assert_eq!(LineEnding::detect(&TextFile::new("a\r\nb\r\nc\n")), LineEnding::CrLf);
        assert_eq!(LineEnding::detect(&TextFile::new("a\r\nb\nc\n")), LineEnding::Lf);
        assert_eq!(LineEnding::detect(&TextFile::new("single line")), LineEnding::Lf);
    }

    #[test]
    fn test_parse_malformed_markdown() {
        let inputs = [
            "# Unclosed heading",
            "```\nunclosed code block",
            "| broken | table",
            "[unclosed link(",
            "![broken image",
            "<div <<>",
            "<!-- never closed",
        ];
        for input in inputs {
            let logger = MemoryLogger::new();
            let result = parse(Arc::new(TextFile::new(input)), Dialect::GitHub, &logger);
            assert!(result.is_ok(), "Failed to parse: {}", input);
        }
    }
}
