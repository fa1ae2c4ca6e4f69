//! Links and heading anchors collected while parsing.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::markdown::node::NodeId;
use crate::text_file::Span;

/// Links keyed by the node that introduces them.
pub type LinkMap = BTreeMap<NodeId, Link>;

/// Syntactic classification of an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    /// `http://` or `https://` URL
    Absolute,
    /// In-document reference starting with `#`
    Relative,
    /// Anything else, treated as a filesystem path
    Local,
}

impl LinkKind {
    pub fn classify(address: &str) -> LinkKind {
        static ABSOLUTE: OnceLock<Regex> = OnceLock::new();
        let absolute = ABSOLUTE.get_or_init(|| {
            Regex::new(r"(?i)^https?://").expect("absolute URL pattern is valid")
        });

        if absolute.is_match(address) {
            LinkKind::Absolute
        } else if address.starts_with('#') {
            LinkKind::Relative
        } else {
            LinkKind::Local
        }
    }
}

/// A reference found in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub node: NodeId,
    pub address: String,
    pub is_image: bool,
    pub kind: LinkKind,
    /// Address substring when it could be located, else the node span
    pub span: Span,
}

impl Link {
    pub fn new(node: NodeId, address: &str, is_image: bool, span: Span) -> Self {
        let address = address.trim().to_string();
        let kind = LinkKind::classify(&address);
        Self {
            node,
            address,
            is_image,
            kind,
            span,
        }
    }

    /// Anchor key of a relative link (`#intro` → `intro`).
    pub fn fragment(&self) -> Option<&str> {
        match self.kind {
            LinkKind::Relative => Some(&self.address[1..]),
            _ => None,
        }
    }
}

/// A registered heading anchor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    pub node: NodeId,
    pub title: String,
    /// Slug part, before the collision suffix
    pub address: String,
    /// 0 when un-collided, else the numeric suffix
    pub number: usize,
}

impl Anchor {
    /// Slug as used in links: `address` or `address-number`.
    pub fn full_link(&self) -> String {
        if self.number == 0 {
            self.address.clone()
        } else {
            format!("{}-{}", self.address, self.number)
        }
    }
}
