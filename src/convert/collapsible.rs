//! Collapsible sections in their three dialect forms.
//!
//! `<details><summary>T</summary>…</details>`, `<spoiler title="T">…</spoiler>`
//! and `{% details T %} … {% enddetails %}` describe the same construct: a
//! title plus a hidden body.

use regex::Regex;
use std::sync::OnceLock;

use crate::config::CollapsibleForm;
use crate::markdown::{NodeId, SyntaxTree};
use crate::text_file::Span;

/// A collapsible section found in the tree as an HTML element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collapsible {
    pub form: CollapsibleForm,
    pub title: String,
    /// Source range of the body, between the title and the closing tag
    pub body: Span,
    /// Children of the element that belong to the body
    pub body_children: Vec<NodeId>,
}

impl Collapsible {
    /// Recognize `details` and `spoiler` elements.
    pub fn from_element(tree: &SyntaxTree, id: NodeId) -> Option<Collapsible> {
        let node = tree.node(id);
        let element = node.element()?;
        let body_end = element
            .end
            .map(|end| tree.node(end).span.start)
            .unwrap_or(node.span.end);

        match element.name.as_str() {
            "details" => {
                let summary_index = node.children.iter().position(|child| {
                    tree.node(*child)
                        .element()
                        .map_or(false, |e| e.name == "summary")
                });
                let (title, body_start, body_children) = match summary_index {
                    Some(index) => {
                        let summary = node.children[index];
                        (
                            summary_title(tree, summary),
                            tree.node(summary).span.end,
                            node.children[index + 1..].to_vec(),
                        )
                    }
                    None => (
                        String::new(),
                        element.open_span.end,
                        node.children.clone(),
                    ),
                };
                Some(Collapsible {
                    form: CollapsibleForm::Details,
                    title,
                    body: Span::new(body_start, body_end),
                    body_children,
                })
            }
            "spoiler" => {
                let title = element
                    .attribute("title")
                    .and_then(|a| a.value)
                    .map(|value| unescape_attribute(tree.file().slice(value)))
                    .unwrap_or_default();
                Some(Collapsible {
                    form: CollapsibleForm::Spoiler,
                    title,
                    body: Span::new(element.open_span.end, body_end),
                    body_children: node.children.clone(),
                })
            }
            _ => None,
        }
    }
}

/// Source of the summary content, inline markup included.
fn summary_title(tree: &SyntaxTree, summary: NodeId) -> String {
    let node = tree.node(summary);
    let Some(element) = node.element() else {
        return String::new();
    };
    let end = element
        .end
        .map(|end| tree.node(end).span.start)
        .unwrap_or(node.span.end);
    tree.file()
        .slice(Span::new(element.open_span.end, end))
        .trim()
        .to_string()
}

fn unescape_attribute(value: &str) -> String {
    value.replace("&quot;", "\"").replace("&amp;", "&")
}

fn escape_attribute(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}

/// Opening markup of a section in `form`.
///
/// Block sections leave a blank line before the body so Markdown inside
/// keeps rendering; inline ones stay on one line.
pub fn opening(form: CollapsibleForm, title: &str, block: bool, line_ending: &str) -> String {
    let gap = if block {
        line_ending.repeat(2)
    } else {
        String::new()
    };
    match form {
        CollapsibleForm::Details => format!(
            "<details>{}<summary>{}</summary>{}",
            if block { line_ending } else { "" },
            title,
            gap
        ),
        CollapsibleForm::Spoiler => {
            format!("<spoiler title=\"{}\">{}", escape_attribute(title), gap)
        }
        CollapsibleForm::Liquid => {
            let gap = if block { gap } else { " ".to_string() };
            format!("{{% details {} %}}{}", title, gap)
        }
    }
}

/// Closing markup of a section in `form`.
pub fn closing(form: CollapsibleForm, block: bool, line_ending: &str) -> String {
    let gap = if block {
        line_ending.repeat(2)
    } else {
        String::new()
    };
    match form {
        CollapsibleForm::Details => format!("{}</details>", gap),
        CollapsibleForm::Spoiler => format!("{}</spoiler>", gap),
        CollapsibleForm::Liquid => {
            let gap = if block { gap } else { " ".to_string() };
            format!("{}{{% enddetails %}}", gap)
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Liquid Tags
// ─────────────────────────────────────────────────────────────────────────────

fn liquid_open() -> &'static Regex {
    static OPEN: OnceLock<Regex> = OnceLock::new();
    OPEN.get_or_init(|| {
        Regex::new(r"\{%\s*details\s+(.+?)\s*%\}").expect("liquid open pattern is valid")
    })
}

fn liquid_close() -> &'static Regex {
    static CLOSE: OnceLock<Regex> = OnceLock::new();
    CLOSE.get_or_init(|| {
        Regex::new(r"\{%\s*enddetails\s*%\}").expect("liquid close pattern is valid")
    })
}

fn liquid_section() -> &'static Regex {
    static SECTION: OnceLock<Regex> = OnceLock::new();
    SECTION.get_or_init(|| {
        Regex::new(r"(?s)\{%\s*details\s+.+?%\}.*?\{%\s*enddetails\s*%\}")
            .expect("liquid section pattern is valid")
    })
}

/// Whether text holds a liquid opening tag.
pub fn has_liquid_open(text: &str) -> bool {
    liquid_open().is_match(text)
}

/// Whether text holds a liquid closing tag.
pub fn has_liquid_close(text: &str) -> bool {
    liquid_close().is_match(text)
}

/// Title of a paragraph that is exactly one liquid opening tag.
pub fn liquid_title(text: &str) -> Option<String> {
    let text = text.trim();
    let captures = liquid_open().captures(text)?;
    let whole = captures.get(0)?;
    if whole.start() != 0 || whole.end() != text.len() {
        return None;
    }
    Some(captures.get(1)?.as_str().trim().to_string())
}

/// Whether a paragraph is exactly one liquid closing tag.
pub fn is_liquid_close(text: &str) -> bool {
    let text = text.trim();
    liquid_close()
        .find(text)
        .map_or(false, |m| m.start() == 0 && m.end() == text.len())
}

/// Rewrite liquid tags inside running text into `form`.
pub fn convert_liquid(text: &str, form: CollapsibleForm, line_ending: &str) -> String {
    if form == CollapsibleForm::Liquid {
        return text.to_string();
    }
    let opened = liquid_open().replace_all(text, |caps: &regex::Captures| {
        opening(form, caps[1].trim(), false, line_ending)
    });
    liquid_close()
        .replace_all(&opened, closing(form, false, line_ending).as_str())
        .into_owned()
}

/// Drop complete liquid sections from running text.
pub fn remove_liquid(text: &str) -> String {
    liquid_section().replace_all(text, "").into_owned()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
