//! Tree walker that turns a parsed document into output-dialect text.
//!
//! Source text between children is copied as-is, so every region the
//! options do not touch comes out byte-for-byte. All copies go through
//! [`Renderer::emit_source`], which applies precomputed address
//! replacements.

use std::collections::{BTreeMap, HashMap};

use log::debug;

use crate::config::{CollapsibleForm, Dialect, ProcessorOptions};
use crate::convert::collapsible::{self, Collapsible};
use crate::convert::wrap::{line_prefix, relocate_atoms, wrap_paragraph, WrapMode, Writer};
use crate::error::{Error, Result};
use crate::markdown::{
    AnchorTable, LinkKind, MarkdownKind, NodeId, NodeKind, ParsedDocument, SyntaxTree,
};
use crate::text_file::{Span, TextFile};

/// Replacement text keyed by start offset.
type Replacements = BTreeMap<usize, (usize, String)>;

pub struct Renderer<'a> {
    tree: &'a SyntaxTree,
    file: &'a TextFile,
    options: &'a ProcessorOptions,
    input: Dialect,
    output: Dialect,
    line_ending: &'static str,
    wrap: WrapMode,
    replacements: Replacements,
    header_image: Option<NodeId>,
    title_header: Option<NodeId>,
    list_depth: usize,
    in_paragraph: bool,
}

impl<'a> Renderer<'a> {
    pub fn new(parsed: &'a ParsedDocument, options: &'a ProcessorOptions, output: Dialect) -> Self {
        let tree = &parsed.tree;
        let root = tree.root();
        let mut renderer = Self {
            tree,
            file: tree.file(),
            options,
            input: parsed.dialect,
            output,
            line_ending: parsed.line_ending.as_str(),
            wrap: WrapMode::from_max_length(options.lines_max_length),
            replacements: Replacements::new(),
            header_image: None,
            title_header: None,
            list_depth: 0,
            in_paragraph: false,
        };
        renderer.replacements = renderer.address_replacements(parsed);
        if let Some(root) = root {
            if options.header_image_link.is_some() {
                renderer.header_image = renderer.find_header_image(root, false);
            }
            if options.remove_title_header {
                renderer.title_header = renderer.find_title_header(root);
            }
        }
        renderer
    }

    /// Render the whole document.
    pub fn render(mut self) -> Result<String> {
        let root = self
            .tree
            .root()
            .ok_or_else(|| Error::invariant("document has no root node"))?;
        let mut w = Writer::new();
        self.render_node(root, &mut w)?;

        let final_newline = self
            .file
            .data()
            .ends_with('\n')
            .then_some(self.line_ending);
        Ok(w.finish_document(final_newline))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Precomputation
    // ─────────────────────────────────────────────────────────────────────────

    /// Relative anchors re-slugged for the output dialect, plus the remap
    /// table. Only spans whose text is exactly the address are replaced.
    fn address_replacements(&self, parsed: &ParsedDocument) -> Replacements {
        let mut output_anchors = AnchorTable::new(self.output);
        let mut renamed: HashMap<String, String> = HashMap::new();
        for anchor in parsed.anchors.in_document_order() {
            let remapped = output_anchors.register(&anchor.title, anchor.node);
            renamed.insert(anchor.full_link(), remapped.full_link());
        }

        let mut replacements = Replacements::new();
        for link in parsed.links.values() {
            if self.file.slice(link.span) != link.address {
                continue;
            }
            let mut address = None;
            if link.kind == LinkKind::Relative && !link.is_image {
                if let Some(new) = link.fragment().and_then(|f| renamed.get(f)) {
                    address = Some(format!("#{}", new));
                }
            }
            if let Some(mapped) = self.options.images_map.get(&link.address) {
                address = Some(mapped.clone());
            }
            match address {
                Some(address) if address != link.address => {
                    debug!("Address {} → {}", link.address, address);
                    replacements.insert(link.span.start, (link.span.end, address));
                }
                _ => {}
            }
        }
        replacements
    }

    /// First Markdown image that is not already inside a link.
    fn find_header_image(&self, id: NodeId, in_link: bool) -> Option<NodeId> {
        let node = self.tree.node(id);
        let in_link = in_link
            || match &node.kind {
                NodeKind::Markdown(MarkdownKind::Link { .. })
                | NodeKind::Markdown(MarkdownKind::Autolink { .. }) => true,
                NodeKind::HtmlElement(element) => element.name == "a",
                _ => false,
            };
        if !in_link && matches!(node.markdown(), Some(MarkdownKind::Image { .. })) {
            return Some(id);
        }
        node.children
            .iter()
            .find_map(|child| self.find_header_image(*child, in_link))
    }

    /// A level-1 heading that opens the document, after any front matter.
    fn find_title_header(&self, root: NodeId) -> Option<NodeId> {
        let first = self
            .tree
            .node(root)
            .children
            .iter()
            .copied()
            .find(|child| !matches!(self.tree.node(*child).markdown(), Some(MarkdownKind::FrontMatter)))?;
        match self.tree.node(first).markdown() {
            Some(MarkdownKind::Heading { level: 1, .. }) => Some(first),
            _ => None,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Source Copies
    // ─────────────────────────────────────────────────────────────────────────

    /// Copy source text, substituting replaced addresses.
    fn emit_source(&self, span: Span, w: &mut Writer) {
        if span.is_empty() {
            return;
        }
        let mut pos = span.start;
        for (&start, (end, text)) in self.replacements.range(span.start..span.end) {
            if *end > span.end || start < pos {
                continue;
            }
            w.push(self.file.slice(Span::new(pos, start)));
            w.push(text);
            pos = *end;
        }
        w.push(self.file.slice(Span::new(pos, span.end)));
    }

    /// Copy source text that soft wrap must keep in one piece.
    fn emit_atomic(&self, span: Span, w: &mut Writer) {
        let mut piece = Writer::new();
        self.emit_source(span, &mut piece);
        w.push_atomic(piece.as_str());
    }

    /// Copy the gap before `next`, re-indenting nested list lines when an
    /// indent unit is configured.
    fn emit_gap(&self, gap: Span, next: NodeId, w: &mut Writer) {
        let item_depth = match self.tree.node(next).markdown() {
            Some(MarkdownKind::List(_)) => Some(self.list_depth + 1),
            Some(MarkdownKind::ListItem(_)) => Some(self.list_depth),
            _ => None,
        };
        let indent = &self.options.indent_string;
        if let (Some(depth), false) = (item_depth, indent.is_empty()) {
            let text = self.file.slice(gap);
            if let Some(newline) = text.rfind('\n') {
                let tail = &text[newline + 1..];
                if tail.chars().all(|c| c == ' ' || c == '\t') {
                    self.emit_source(Span::new(gap.start, gap.start + newline + 1), w);
                    w.push(&indent.repeat(depth.saturating_sub(1)));
                    return;
                }
            }
        }
        self.emit_source(gap, w);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Node Rendering
    // ─────────────────────────────────────────────────────────────────────────

    fn render_node(&mut self, id: NodeId, w: &mut Writer) -> Result<()> {
        let node = self.tree.get(id).ok_or_else(|| {
            Error::invariant(format!("node {:?} is missing from the tree", id))
        })?;
        let span = node.span;

        match &node.kind {
            NodeKind::Markdown(kind) => match kind {
                MarkdownKind::Heading { level, .. } => self.render_heading(id, *level, w),
                MarkdownKind::Paragraph => self.render_paragraph(id, w),
                MarkdownKind::List(_) => {
                    self.list_depth += 1;
                    let result = self.render_children(id, w);
                    self.list_depth -= 1;
                    result
                }
                MarkdownKind::ListItem(_) => self.render_list_item(id, w),
                MarkdownKind::CodeBlock { .. }
                | MarkdownKind::ThematicBreak
                | MarkdownKind::Table
                | MarkdownKind::FrontMatter
                | MarkdownKind::Text(_)
                | MarkdownKind::SoftBreak
                | MarkdownKind::LineBreak => {
                    self.emit_source(span, w);
                    Ok(())
                }
                MarkdownKind::CodeSpan(_) => {
                    self.emit_atomic(span, w);
                    Ok(())
                }
                MarkdownKind::Image { .. } if self.header_image == Some(id) => {
                    let url = self.options.header_image_link.clone().unwrap_or_default();
                    w.push("[");
                    self.render_children(id, w)?;
                    w.push(&format!("]({})", url));
                    Ok(())
                }
                _ => self.render_children(id, w),
            },
            NodeKind::HtmlText => {
                self.emit_source(span, w);
                Ok(())
            }
            NodeKind::HtmlComment => {
                if self.options.remove_comments {
                    w.remove();
                } else {
                    self.emit_atomic(span, w);
                }
                Ok(())
            }
            NodeKind::HtmlElement(_) => self.render_element(id, w),
            NodeKind::HtmlEndTag { name } => Err(Error::invariant(format!(
                "end tag </{}> listed as content",
                name
            ))),
        }
    }

    fn render_children(&mut self, id: NodeId, w: &mut Writer) -> Result<()> {
        let node = self.tree.node(id);
        let span = node.span;
        let children = node.children.clone();
        self.render_range(span, &children, w)
    }

    /// Render `children` and the source gaps between them within `range`.
    fn render_range(&mut self, range: Span, children: &[NodeId], w: &mut Writer) -> Result<()> {
        let mut pos = range.start;
        let mut index = 0;
        while index < children.len() {
            let child = children[index];
            let child_span = self.tree.node(child).span;
            if child_span.start > pos {
                self.emit_gap(Span::new(pos, child_span.start), child, w);
            }

            if let Some(close) = self.liquid_section_end(children, index) {
                w.remove();
                pos = self.tree.node(children[close]).span.end;
                index = close + 1;
                continue;
            }

            self.render_node(child, w)?;
            pos = pos.max(child_span.end);
            index += 1;
        }
        if range.end > pos {
            self.emit_source(Span::new(pos, range.end), w);
        }
        Ok(())
    }

    /// With `remove_details` on a liquid input, the sibling index of the
    /// paragraph closing a section opened by `children[index]`.
    fn liquid_section_end(&self, children: &[NodeId], index: usize) -> Option<usize> {
        if !self.options.remove_details || self.input.collapsible_form() != CollapsibleForm::Liquid {
            return None;
        }
        let is_paragraph =
            |id: NodeId| matches!(self.tree.node(id).markdown(), Some(MarkdownKind::Paragraph));
        let opener = children[index];
        let text = self.tree.text(opener);
        if !is_paragraph(opener)
            || !collapsible::has_liquid_open(text)
            || collapsible::has_liquid_close(text)
        {
            return None;
        }
        children[index + 1..]
            .iter()
            .position(|id| is_paragraph(*id) && collapsible::has_liquid_close(self.tree.text(*id)))
            .map(|offset| index + 1 + offset)
    }

    fn render_heading(&mut self, id: NodeId, level: u8, w: &mut Writer) -> Result<()> {
        if self.title_header == Some(id) {
            w.remove();
            return Ok(());
        }
        if !self.options.normalize {
            return self.render_children(id, w);
        }

        let children = self.tree.node(id).children.clone();
        w.push(&"#".repeat(level as usize));
        if let (Some(first), Some(last)) = (children.first(), children.last()) {
            let content = Span::new(
                self.tree.node(*first).span.start,
                self.tree.node(*last).span.end,
            );
            w.push(" ");
            self.render_range(content, &children, w)?;
        }
        Ok(())
    }

    fn render_list_item(&mut self, id: NodeId, w: &mut Writer) -> Result<()> {
        let node = self.tree.node(id);
        let span = node.span;
        let children = node.children.clone();
        let Some(first) = children.first() else {
            self.emit_source(span, w);
            return Ok(());
        };

        let content_start = self.tree.node(*first).span.start;
        let marker = self.file.slice(Span::new(span.start, content_start));
        if self.options.normalize && !marker.contains('\n') && !marker.trim().is_empty() {
            w.push(marker.trim_end());
            w.push(" ");
            return self.render_range(Span::new(content_start, span.end), &children, w);
        }
        self.render_range(span, &children, w)
    }

    fn render_paragraph(&mut self, id: NodeId, w: &mut Writer) -> Result<()> {
        let span = self.tree.node(id).span;
        let form = self.output.collapsible_form();
        let liquid_input = self.input.collapsible_form() == CollapsibleForm::Liquid;

        // A paragraph holding one liquid tag is a block-level section boundary
        if liquid_input && form != CollapsibleForm::Liquid {
            let source = self.tree.text(id);
            if let Some(title) = collapsible::liquid_title(source) {
                let open = collapsible::opening(form, &title, true, self.line_ending);
                w.push(open.trim_end());
                return Ok(());
            }
            if collapsible::is_liquid_close(source) {
                let close = collapsible::closing(form, true, self.line_ending);
                w.push(close.trim_start());
                return Ok(());
            }
        }

        let mut sub = Writer::new();
        self.in_paragraph = true;
        let result = self.render_children(id, &mut sub);
        self.in_paragraph = false;
        result?;
        let (mut text, mut atoms) = sub.finish_paragraph();

        if liquid_input {
            let rewritten = if self.options.remove_details {
                collapsible::remove_liquid(&text)
            } else {
                collapsible::convert_liquid(&text, form, self.line_ending)
            };
            if rewritten != text {
                atoms = relocate_atoms(&text, &atoms, &rewritten);
                text = rewritten;
            }
        }
        if text.trim().is_empty() {
            w.remove();
            return Ok(());
        }

        if self.wrap == WrapMode::Preserve {
            w.push(&text);
        } else {
            let line_start = self.file.line_start_of(span.start);
            let prefix = line_prefix(self.file.slice(Span::new(line_start, span.start)));
            let wrapped = wrap_paragraph(
                &text,
                &atoms,
                &prefix,
                w.column(),
                self.wrap,
                self.line_ending,
            );
            w.push(&wrapped);
        }
        Ok(())
    }

    fn render_element(&mut self, id: NodeId, w: &mut Writer) -> Result<()> {
        let node = self.tree.node(id);
        let span = node.span;
        let Some(element) = node.element() else {
            return Err(Error::invariant(format!("node {:?} is not an element", id)));
        };

        if element.name == "cut" && !self.output.supports_cut() {
            w.remove();
            return Ok(());
        }

        if let Some(section) = Collapsible::from_element(self.tree, id) {
            if self.options.remove_details {
                w.remove();
                return Ok(());
            }
            let form = self.output.collapsible_form();
            if self.input != self.output && section.form != form {
                return self.render_collapsible(&section, form, w);
            }
        }

        let open_span = element.open_span;
        let end_span = element.end.map(|end| self.tree.node(end).span);
        let children = node.children.clone();

        self.emit_atomic(open_span, w);
        let content_end = end_span.map_or(span.end, |end| end.start);
        self.render_range(Span::new(open_span.end, content_end), &children, w)?;
        if let Some(end_span) = end_span {
            self.emit_atomic(end_span, w);
        }
        Ok(())
    }

    fn render_collapsible(
        &mut self,
        section: &Collapsible,
        form: CollapsibleForm,
        w: &mut Writer,
    ) -> Result<()> {
        let block = !self.in_paragraph;
        let mut body = Writer::new();
        self.render_range(section.body, &section.body_children, &mut body)?;
        let body = body.finish_inline();

        w.push_atomic(&collapsible::opening(form, &section.title, block, self.line_ending));
        w.push(body.trim());
        w.push_atomic(&collapsible::closing(form, block, self.line_ending));
        Ok(())
    }
}
