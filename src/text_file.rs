//! Immutable source buffer with line lookup.
//!
//! Every syntax node stores byte offsets into one `TextFile`; diagnostics turn
//! those offsets back into human-readable `line:column` positions.

use std::fmt;

// ─────────────────────────────────────────────────────────────────────────────
// Span
// ─────────────────────────────────────────────────────────────────────────────

/// Half-open byte range `[start, end)` into a [`TextFile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    pub fn empty(at: usize) -> Self {
        Self { start: at, end: at }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, other: Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Restrict this span to `[lo, hi]`, keeping it non-inverted.
    pub fn clamp(self, lo: usize, hi: usize) -> Span {
        let start = self.start.clamp(lo, hi);
        let end = self.end.clamp(start, hi);
        Span { start, end }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// TextFile
// ─────────────────────────────────────────────────────────────────────────────

/// Source text plus precomputed line starts (`line_starts[0] == 0`).
#[derive(Debug, Clone)]
pub struct TextFile {
    name: Option<String>,
    data: String,
    line_starts: Vec<usize>,
}

impl TextFile {
    pub fn new(data: impl Into<String>) -> Self {
        let data = data.into();
        let mut line_starts = vec![0];
        line_starts.extend(data.match_indices('\n').map(|(idx, _)| idx + 1));
        Self {
            name: None,
            data,
            line_starts,
        }
    }

    /// Attach a display name used as the prefix of diagnostics.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn data(&self) -> &str {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn line_starts(&self) -> &[usize] {
        &self.line_starts
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Source text covered by `span`, widened to character boundaries.
    pub fn slice(&self, span: Span) -> &str {
        let start = self.floor_boundary(span.start);
        let end = self.ceil_boundary(span.end).max(start);
        &self.data[start..end]
    }

    /// 1-based line and character column of a byte offset.
    pub fn line_column(&self, offset: usize) -> (usize, usize) {
        let offset = self.floor_boundary(offset);
        let line = match self.line_starts.binary_search(&offset) {
            Ok(index) => index,
            Err(index) => index - 1,
        };
        let column = self.data[self.line_starts[line]..offset].chars().count();
        (line + 1, column + 1)
    }

    /// Byte offset of a 1-based line and 1-based byte column.
    ///
    /// Returns `None` for line 0, which the Markdown engine uses for
    /// nodes without a known position. The result never crosses into the
    /// next line.
    pub fn offset(&self, line: usize, column: usize) -> Option<usize> {
        if line == 0 {
            return None;
        }
        let line_start = *self.line_starts.get(line - 1)?;
        let line_end = self
            .line_starts
            .get(line)
            .copied()
            .unwrap_or(self.data.len());
        let offset = (line_start + column.saturating_sub(1)).min(line_end);
        Some(self.floor_boundary(offset))
    }

    /// Offset just past the content of a 1-based line, before its line
    /// ending.
    pub fn line_end(&self, line: usize) -> Option<usize> {
        if line == 0 {
            return None;
        }
        let start = *self.line_starts.get(line - 1)?;
        let next = self
            .line_starts
            .get(line)
            .copied()
            .unwrap_or(self.data.len());
        let content = self.data[start..next].trim_end_matches(['\n', '\r']);
        Some(start + content.len())
    }

    /// Start offset of the line containing `offset`.
    pub fn line_start_of(&self, offset: usize) -> usize {
        match self.line_starts.binary_search(&offset) {
            Ok(index) => self.line_starts[index],
            Err(index) => self.line_starts[index - 1],
        }
    }

    /// Largest char boundary `<= offset`, clamped to the buffer.
    pub fn floor_boundary(&self, offset: usize) -> usize {
        let mut offset = offset.min(self.data.len());
        while !self.data.is_char_boundary(offset) {
            offset -= 1;
        }
        offset
    }

    /// Smallest char boundary `>= offset`, clamped to the buffer.
    pub fn ceil_boundary(&self, offset: usize) -> usize {
        let mut offset = offset.min(self.data.len());
        while !self.data.is_char_boundary(offset) {
            offset += 1;
        }
        offset
    }

    /// `name:line:column` description of an offset.
    pub fn position(&self, offset: usize) -> Position<'_> {
        let (line, column) = self.line_column(offset);
        Position {
            name: self.name(),
            line,
            column,
        }
    }
}

/// Printable location inside a [`TextFile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position<'a> {
    pub name: Option<&'a str>,
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for Position<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name {
            Some(name) => write!(f, "{}:{}:{}", name, self.line, self.column),
            None => write!(f, "{}:{}", self.line, self.column),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
