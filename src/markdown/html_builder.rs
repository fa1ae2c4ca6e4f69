//! Recursive-descent element builder over the combined token stream.
//!
//! Turns [`Token`]s into balanced HTML element nodes. Fragment tokens are
//! already-built Markdown subtrees and land in the content list unchanged.
//! Missing or mismatched closing tags are reported and closed implicitly.

use std::collections::HashMap;

use crate::logger::Logger;
use crate::markdown::html_lexer::{TagToken, Token};
use crate::markdown::link::{Link, LinkMap};
use crate::markdown::node::{HtmlElement, NodeId, NodeKind, SyntaxTree};

/// Elements that never have content or a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "cut", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

pub fn is_void(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name)
}

pub struct ElementBuilder<'a> {
    tree: &'a mut SyntaxTree,
    links: &'a mut LinkMap,
    logger: &'a dyn Logger,
    tokens: Vec<Token>,
    pos: usize,
    open: Vec<String>,
}

impl<'a> ElementBuilder<'a> {
    pub fn new(
        tree: &'a mut SyntaxTree,
        links: &'a mut LinkMap,
        logger: &'a dyn Logger,
        tokens: Vec<Token>,
    ) -> Self {
        Self {
            tree,
            links,
            logger,
            tokens,
            pos: 0,
            open: Vec::new(),
        }
    }

    /// Build the content list for the whole token stream.
    pub fn build(mut self) -> Vec<NodeId> {
        // With nothing open, `content` only stops at the end of the stream
        self.content()
    }

    fn report(&self, offset: usize, message: &str) {
        let position = self.tree.file().position(offset);
        self.logger.error(&format!("{} at {}", message, position));
    }

    fn content(&mut self) -> Vec<NodeId> {
        let mut nodes = Vec::new();
        while let Some(token) = self.tokens.get(self.pos).cloned() {
            match token {
                Token::Close { name, span } => {
                    if self.open.contains(&name) {
                        return nodes;
                    }
                    self.report(span.start, &format!("Unexpected closing tag </{}>", name));
                    self.pos += 1;
                }
                Token::Text(span) => {
                    self.pos += 1;
                    nodes.push(self.tree.alloc(NodeKind::HtmlText, span, Vec::new()));
                }
                Token::Comment(span) => {
                    self.pos += 1;
                    nodes.push(self.tree.alloc(NodeKind::HtmlComment, span, Vec::new()));
                }
                Token::Fragment(id) => {
                    self.pos += 1;
                    nodes.push(id);
                }
                Token::Open(tag) => {
                    self.pos += 1;
                    nodes.push(self.element(tag));
                }
            }
        }
        nodes
    }

    fn element(&mut self, tag: TagToken) -> NodeId {
        let mut children = Vec::new();
        let mut end = None;
        let mut span = tag.span;

        if tag.self_closing.is_none() && !is_void(&tag.name) {
            self.open.push(tag.name.clone());
            children = self.content();
            self.open.pop();

            if let Some(last) = children.last() {
                span.end = span.end.max(self.tree.node(*last).span.end);
            }
            match self.tokens.get(self.pos).cloned() {
                Some(Token::Close { name, span: close }) if name == tag.name => {
                    self.pos += 1;
                    span.end = close.end;
                    end = Some(self.tree.alloc(
                        NodeKind::HtmlEndTag { name },
                        close,
                        Vec::new(),
                    ));
                }
                _ => {
                    self.report(
                        tag.span.start,
                        &format!("Element <{}> is not closed", tag.name),
                    );
                }
            }
        }

        let mut attributes = HashMap::new();
        for attribute in tag.attributes {
            attributes.insert(attribute.name.clone(), attribute);
        }
        let address = match tag.name.as_str() {
            "a" => attributes.get("href").and_then(|a| a.value).map(|v| (v, false)),
            "img" => attributes.get("src").and_then(|a| a.value).map(|v| (v, true)),
            _ => None,
        };

        let element = HtmlElement {
            name: tag.name,
            name_span: tag.name_span,
            open_span: tag.span,
            attributes,
            self_closing: tag.self_closing,
            end,
        };
        let id = self
            .tree
            .alloc(NodeKind::HtmlElement(element), span, children);

        if let Some((value, is_image)) = address {
            let text = self.tree.file().slice(value).to_string();
            self.links.insert(id, Link::new(id, &text, is_image, value));
        }
        id
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
