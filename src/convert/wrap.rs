//! Render cursor and soft line-wrap.
//!
//! [`Writer`] accumulates output and tracks the current column plus a
//! pending whitespace cleanup left behind by removed nodes. [`wrap_paragraph`]
//! re-flows the rendered text of one paragraph.

use regex::Regex;
use std::sync::OnceLock;

use crate::text_file::Span;

// ─────────────────────────────────────────────────────────────────────────────
// Writer
// ─────────────────────────────────────────────────────────────────────────────

/// Output buffer with column tracking.
#[derive(Debug, Default)]
pub struct Writer {
    out: String,
    column: usize,
    trim_pending: bool,
    /// Output ranges the wrapper must not split (code spans, tags)
    atoms: Vec<Span>,
}

impl Writer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Characters since the last line break.
    pub fn column(&self) -> usize {
        self.column
    }

    pub fn as_str(&self) -> &str {
        &self.out
    }

    pub fn is_empty(&self) -> bool {
        self.out.is_empty()
    }

    /// Append text, applying a pending cleanup first.
    pub fn push(&mut self, text: &str) {
        let text = if self.trim_pending {
            let trimmed = self.trim_leading(text);
            if trimmed.is_empty() {
                return;
            }
            self.trim_pending = false;
            trimmed
        } else {
            text
        };
        if text.is_empty() {
            return;
        }
        self.out.push_str(text);
        match text.rfind('\n') {
            Some(index) => self.column = text[index + 1..].chars().count(),
            None => self.column += text.chars().count(),
        }
    }

    /// Append text that soft wrap keeps in one piece.
    pub fn push_atomic(&mut self, text: &str) {
        let start = self.out.len();
        self.push(text);
        if self.out.len() > start {
            self.atoms.push(Span::new(start, self.out.len()));
        }
    }

    /// Record that a node produced no output.
    pub fn remove(&mut self) {
        self.trim_pending = true;
    }

    /// Whitespace to drop from the text following a removed node.
    ///
    /// At a line start whole blank lines go and the indentation of the next
    /// content line stays; after a space only spaces and tabs go.
    fn trim_leading<'t>(&self, text: &'t str) -> &'t str {
        let content = text.trim_start();
        let whitespace = &text[..text.len() - content.len()];
        if self.out.is_empty() || self.out.ends_with('\n') {
            match whitespace.rfind('\n') {
                Some(index) => &text[index + 1..],
                None if content.is_empty() => content,
                None => text,
            }
        } else if self.out.ends_with([' ', '\t']) {
            text.trim_start_matches([' ', '\t'])
        } else {
            text
        }
    }

    /// Finish an inline run: drop trailing blanks left by a removal.
    pub fn finish_inline(self) -> String {
        let mut out = self.out;
        if self.trim_pending {
            out.truncate(out.trim_end_matches([' ', '\t']).len());
        }
        out
    }

    /// Finish a paragraph run, keeping the unsplittable ranges.
    pub fn finish_paragraph(mut self) -> (String, Vec<Span>) {
        let atoms = std::mem::take(&mut self.atoms);
        let out = self.finish_inline();
        let atoms = atoms.into_iter().filter(|a| a.end <= out.len()).collect();
        (out, atoms)
    }

    /// Finish a document; after a trailing removal, restore a single final
    /// line ending if the source had one.
    pub fn finish_document(self, final_newline: Option<&str>) -> String {
        let mut out = self.out;
        if self.trim_pending {
            out.truncate(out.trim_end().len());
            if let Some(ending) = final_newline {
                if !out.is_empty() {
                    out.push_str(ending);
                }
            }
        }
        out
    }
}

/// Find the `atoms` of `old` again in `new`, in order.
///
/// Used after a text rewrite that leaves the atoms themselves alone.
pub fn relocate_atoms(old: &str, atoms: &[Span], new: &str) -> Vec<Span> {
    let mut from = 0;
    atoms
        .iter()
        .filter_map(|atom| {
            let piece = &old[atom.start..atom.end];
            let at = from + new[from..].find(piece)?;
            from = at + piece.len();
            Some(Span::new(at, from))
        })
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Paragraph Prefix
// ─────────────────────────────────────────────────────────────────────────────

/// Continuation prefix of a block from the source text preceding it on its
/// first line: `>` and whitespace stay, marker characters become spaces.
pub fn line_prefix(before: &str) -> String {
    before
        .chars()
        .map(|c| if c == '>' || c.is_whitespace() { c } else { ' ' })
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Soft Wrap
// ─────────────────────────────────────────────────────────────────────────────

/// Maximum line length semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapMode {
    /// Keep source breaks
    Preserve,
    /// One line per paragraph segment
    Join,
    /// Break before a word that would pass this column
    Width(usize),
}

impl WrapMode {
    pub fn from_max_length(value: i32) -> WrapMode {
        match value {
            0 => WrapMode::Preserve,
            v if v < 0 => WrapMode::Join,
            v => WrapMode::Width(v as usize),
        }
    }
}

/// Words that must not begin a line, because they would turn the line into
/// a list item, quote, heading, table row, setext underline or code fence.
pub fn is_protected(word: &str) -> bool {
    static PROTECTED: OnceLock<Regex> = OnceLock::new();
    let protected = PROTECTED.get_or_init(|| {
        Regex::new(r"^(?:>+|[*+-]|-+|\d+[.)]|\|+|=+|#{1,6})$|^(?:```|~~~)")
            .expect("protected word pattern is valid")
    });
    protected.is_match(word)
}

/// A source line with its hard-break marker split off.
struct Line<'t> {
    text: &'t str,
    hard_break: Option<&'t str>,
}

fn split_hard_break(line: &str) -> Line<'_> {
    let trimmed = line.trim_end_matches(' ');
    if line.len() - trimmed.len() >= 2 {
        return Line {
            text: trimmed,
            hard_break: Some("  "),
        };
    }
    if trimmed.ends_with('\\') && !trimmed.ends_with("\\\\") {
        return Line {
            text: &trimmed[..trimmed.len() - 1],
            hard_break: Some("\\"),
        };
    }
    Line {
        text: line,
        hard_break: None,
    }
}

/// Strip the continuation prefix of a paragraph line: leading whitespace
/// and at most `quote_depth` quote markers.
fn strip_continuation(line: &str, quote_depth: usize) -> &str {
    let mut rest = line.trim_start();
    for _ in 0..quote_depth {
        match rest.strip_prefix('>') {
            Some(after) => rest = after.trim_start(),
            None => break,
        }
    }
    rest
}

/// Words of `line`, which starts at `base` in the paragraph text.
/// Whitespace inside an atom does not separate words.
fn split_words<'t>(line: &'t str, base: usize, atoms: &[Span]) -> Vec<&'t str> {
    let inside_atom = |at: usize| atoms.iter().any(|atom| atom.start < at && at < atom.end);
    let mut words = Vec::new();
    let mut word_start = None;
    for (index, c) in line.char_indices() {
        if c.is_whitespace() && !inside_atom(base + index) {
            if let Some(start) = word_start.take() {
                words.push(&line[start..index]);
            }
        } else if word_start.is_none() {
            word_start = Some(index);
        }
    }
    if let Some(start) = word_start {
        words.push(&line[start..]);
    }
    words
}

/// Re-flow rendered paragraph text.
///
/// `first_column` is where the paragraph starts in the output, `prefix` is
/// written at the start of every line the wrapper begins. Hard breaks stay
/// where they are, and so does whitespace inside `atoms`.
pub fn wrap_paragraph(
    text: &str,
    atoms: &[Span],
    prefix: &str,
    first_column: usize,
    mode: WrapMode,
    line_ending: &str,
) -> String {
    if mode == WrapMode::Preserve {
        return text.to_string();
    }
    let quote_depth = prefix.matches('>').count();
    let prefix_width = prefix.chars().count();

    let mut out = String::with_capacity(text.len());
    let mut column = first_column;
    let mut line_has_word = false;

    let mut line_start = 0;
    for (index, source_line) in text.split('\n').enumerate() {
        let unterminated = source_line.strip_suffix('\r').unwrap_or(source_line);
        let raw = if index == 0 {
            unterminated
        } else {
            strip_continuation(unterminated, quote_depth)
        };
        let base = line_start + unterminated.len() - raw.len();
        line_start += source_line.len() + 1;
        let line = split_hard_break(raw);

        for word in split_words(line.text, base, atoms) {
            let width = word.chars().count();
            if !line_has_word {
                out.push_str(word);
                column += width;
                line_has_word = true;
                continue;
            }
            let overflows = match mode {
                WrapMode::Width(max) => column + 1 + width > max,
                _ => false,
            };
            if overflows && !is_protected(word) {
                out.push_str(line_ending);
                out.push_str(prefix);
                column = prefix_width;
            } else {
                out.push(' ');
                column += 1;
            }
            out.push_str(word);
            column += width;
        }

        if let Some(marker) = line.hard_break {
            out.push_str(marker);
            out.push_str(line_ending);
            out.push_str(prefix);
            column = prefix_width;
            line_has_word = false;
        }
    }

    // A hard break cannot end a paragraph; drop the dangling prefix
    if !line_has_word && out.ends_with(prefix) {
        out.truncate(out.len() - prefix.len());
        if out.ends_with(line_ending) {
            out.truncate(out.len() - line_ending.len());
        }
    }
    out
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
