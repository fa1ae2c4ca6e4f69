//! Markdown parsing module
//!
//! This module turns a document into a unified syntax tree where Markdown
//! blocks and inlines and embedded HTML elements live side by side, using the
//! comrak library for the CommonMark + GFM part and a small tag-soup lexer
//! for raw HTML.
//!
//! # Features
//! - Byte-exact source spans for every node
//! - Balanced HTML elements wrapping Markdown fragments (`<details>` bodies)
//! - Link collection and classification (absolute, relative, local)
//! - Heading anchors with per-dialect slugs and collision renumbering
//!
//! # Example
//! ```ignore
//! use crate::markdown::parse;
//!
//! let file = Arc::new(TextFile::new("# Hello\n\n[Top](#hello)"));
//! let parsed = parse(file, Dialect::GitHub, &logger)?;
//! assert!(parsed.anchors.contains("hello"));
//! ```

pub mod html_builder;
pub mod html_lexer;
mod link;
mod node;
mod parser;
mod slug;

pub use link::{Anchor, Link, LinkKind, LinkMap};
pub use node::{
    HtmlAttribute, HtmlElement, ListMarker, MarkdownKind, Node, NodeId, NodeKind, SyntaxTree,
};
pub use parser::{parse, LineEnding, ParsedDocument};
pub use slug::{slug_for, AnchorTable};
