//! Unified syntax tree for Markdown and embedded HTML.
//!
//! All nodes live in one arena owned by [`SyntaxTree`] and refer to each
//! other by [`NodeId`]. Parent → children is the only ownership relation; an
//! element's end tag is reachable only through [`HtmlElement::end`].

use std::collections::HashMap;
use std::sync::Arc;

use crate::text_file::{Span, TextFile};

// ─────────────────────────────────────────────────────────────────────────────
// Node Kinds
// ─────────────────────────────────────────────────────────────────────────────

/// Index of a node inside its [`SyntaxTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

/// List marker as written in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListMarker {
    pub ordered: bool,
    /// `-`, `*` or `+` for bullet lists
    pub bullet: char,
    /// `.` or `)` for ordered lists
    pub delimiter: char,
    pub start: usize,
    pub tight: bool,
}

/// Block and inline kinds produced by the Markdown engine.
#[derive(Debug, Clone, PartialEq)]
pub enum MarkdownKind {
    Document,
    Heading { level: u8, setext: bool },
    List(ListMarker),
    ListItem(ListMarker),
    Quote,
    CodeBlock { fenced: bool },
    Paragraph,
    ThematicBreak,
    Table,
    FrontMatter,
    /// Any other block (table rows, footnotes, ...), reproduced verbatim
    OtherBlock,
    Text(String),
    SoftBreak,
    LineBreak,
    CodeSpan(String),
    Emphasis,
    Strong,
    Strikethrough,
    Link { url: String, title: String },
    Image { url: String, title: String },
    Autolink { url: String },
    OtherInline,
}

/// One attribute of an HTML tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlAttribute {
    pub name: String,
    /// Whole `name="value"` text
    pub span: Span,
    /// Value without the surrounding quotes
    pub value: Option<Span>,
}

/// An HTML element built from the token stream.
#[derive(Debug, Clone, PartialEq)]
pub struct HtmlElement {
    /// Lower-cased tag name
    pub name: String,
    pub name_span: Span,
    /// Whole opening tag, `<` through `>`
    pub open_span: Span,
    /// Attribute name → attribute; a repeated name keeps the last one
    pub attributes: HashMap<String, HtmlAttribute>,
    /// The `/` of `<tag/>`
    pub self_closing: Option<Span>,
    /// Matching closing tag, if one was found
    pub end: Option<NodeId>,
}

impl HtmlElement {
    pub fn attribute(&self, name: &str) -> Option<&HtmlAttribute> {
        self.attributes.get(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Markdown(MarkdownKind),
    HtmlText,
    HtmlComment,
    HtmlElement(HtmlElement),
    HtmlEndTag { name: String },
}

/// A node of the unified tree.
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
    pub children: Vec<NodeId>,
}

impl Node {
    pub fn markdown(&self) -> Option<&MarkdownKind> {
        match &self.kind {
            NodeKind::Markdown(kind) => Some(kind),
            _ => None,
        }
    }

    pub fn element(&self) -> Option<&HtmlElement> {
        match &self.kind {
            NodeKind::HtmlElement(element) => Some(element),
            _ => None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Syntax Tree
// ─────────────────────────────────────────────────────────────────────────────

/// Arena holding every node of one parsed document.
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    file: Arc<TextFile>,
    nodes: Vec<Node>,
    root: Option<NodeId>,
}

impl SyntaxTree {
    pub fn new(file: Arc<TextFile>) -> Self {
        Self {
            file,
            nodes: Vec::new(),
            root: None,
        }
    }

    pub fn file(&self) -> &Arc<TextFile> {
        &self.file
    }

    /// Add a node; its id is its insertion index.
    pub fn alloc(&mut self, kind: NodeKind, span: Span, children: Vec<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            span,
            children,
        });
        id
    }

    pub fn set_root(&mut self, root: NodeId) {
        self.root = Some(root);
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// Panics on ids from another tree.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Source text of a node.
    pub fn text(&self, id: NodeId) -> &str {
        self.file.slice(self.node(id).span)
    }

    /// Literal text of a node and its descendants (Markdown text, code spans,
    /// HTML text), with soft breaks as spaces.
    pub fn plain_text(&self, id: NodeId) -> String {
        let mut output = String::new();
        self.collect_text(id, &mut output);
        output
    }

    fn collect_text(&self, id: NodeId, output: &mut String) {
        let node = self.node(id);
        match &node.kind {
            NodeKind::Markdown(MarkdownKind::Text(text))
            | NodeKind::Markdown(MarkdownKind::CodeSpan(text)) => output.push_str(text),
            NodeKind::Markdown(MarkdownKind::SoftBreak)
            | NodeKind::Markdown(MarkdownKind::LineBreak) => output.push(' '),
            NodeKind::HtmlText => output.push_str(self.file.slice(node.span)),
            _ => {}
        }
        for &child in &node.children {
            self.collect_text(child, output);
        }
    }

    /// Depth-first pre-order walk starting at `id`.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            result.push(current);
            stack.extend(self.node(current).children.iter().rev().copied());
        }
        result
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn tree_for(text: &str) -> SyntaxTree {
        SyntaxTree::new(Arc::new(TextFile::new(text)))
    }

    #[test]
    fn test_alloc_assigns_sequential_ids() {
        let mut tree = tree_for("ab");
        let a = tree.alloc(NodeKind::HtmlText, Span::new(0, 1), Vec::new());
        let b = tree.alloc(NodeKind::HtmlText, Span::new(1, 2), Vec::new());
        assert_eq!(a, NodeId(0));
        assert_eq!(b, NodeId(1));
        assert_eq!(tree.text(b), "b");
    }

    #[test]
    fn test_plain_text_collects_descendants() {
        let mut tree = tree_for("Hi `x`");
        let text = tree.alloc(
            NodeKind::Markdown(MarkdownKind::Text("Hi ".to_string())),
            Span::new(0, 3),
            Vec::new(),
        );
        let code = tree.alloc(
            NodeKind::Markdown(MarkdownKind::CodeSpan("x".to_string())),
            Span::new(3, 6),
            Vec::new(),
        );
        let para = tree.alloc(
            NodeKind::Markdown(MarkdownKind::Paragraph),
            Span::new(0, 6),
            vec![text, code],
        );
        assert_eq!(tree.plain_text(para), "Hi x");
        assert_eq!(tree.descendants(para), vec![para, text, code]);
    }

    #[test]
    fn test_end_tag_is_not_a_child() {
        let mut tree = tree_for("<b>x</b>");
        let end = tree.alloc(
            NodeKind::HtmlEndTag {
                name: "b".to_string(),
            },
            Span::new(4, 8),
            Vec::new(),
        );
        let text = tree.alloc(NodeKind::HtmlText, Span::new(3, 4), Vec::new());
        let element = HtmlElement {
            name: "b".to_string(),
            name_span: Span::new(1, 2),
            open_span: Span::new(0, 3),
            attributes: HashMap::new(),
            self_closing: None,
            end: Some(end),
        };
        let b = tree.alloc(NodeKind::HtmlElement(element), Span::new(0, 8), vec![text]);
        assert_eq!(tree.node(b).children, vec![text]);
        assert_eq!(tree.node(b).element().and_then(|e| e.end), Some(end));
    }
}
