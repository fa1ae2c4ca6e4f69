//! Tag-soup HTML tokenizer.
//!
//! Splits a raw HTML slice of the document into a flat list of tokens with
//! absolute offsets. Irregularities never stop lexing: they are returned as
//! [`LexIssue`]s next to a best-effort token list.

use crate::markdown::node::{HtmlAttribute, NodeId};
use crate::text_file::Span;

/// An opening or self-closing tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagToken {
    /// Lower-cased tag name
    pub name: String,
    pub name_span: Span,
    pub attributes: Vec<HtmlAttribute>,
    /// The `/` of `<tag/>`
    pub self_closing: Option<Span>,
    pub span: Span,
}

/// Tokens of the combined HTML + Markdown stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Open(TagToken),
    Close { name: String, span: Span },
    Text(Span),
    Comment(Span),
    /// An already-built Markdown subtree passed through untouched
    Fragment(NodeId),
}

/// A recoverable tokenizer problem at an absolute offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexIssue {
    pub offset: usize,
    pub message: String,
}

/// Tokenize `source[span]`.
pub fn tokenize(source: &str, span: Span) -> (Vec<Token>, Vec<LexIssue>) {
    let mut lexer = Lexer {
        src: source.as_bytes(),
        text: source,
        pos: span.start,
        end: span.end.min(source.len()),
        tokens: Vec::new(),
        issues: Vec::new(),
        text_start: None,
    };
    lexer.run();
    (lexer.tokens, lexer.issues)
}

struct Lexer<'s> {
    src: &'s [u8],
    text: &'s str,
    pos: usize,
    end: usize,
    tokens: Vec<Token>,
    issues: Vec<LexIssue>,
    text_start: Option<usize>,
}

/// Elements whose content is text up to their own closing tag.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

fn is_name_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b':' | b'.')
}

fn is_attribute_name_byte(byte: u8) -> bool {
    !byte.is_ascii_whitespace() && !matches!(byte, b'"' | b'\'' | b'>' | b'/' | b'=' | b'<')
}

impl<'s> Lexer<'s> {
    fn run(&mut self) {
        while self.pos < self.end {
            if self.src[self.pos] == b'<' && self.try_markup() {
                continue;
            }
            if self.text_start.is_none() {
                self.text_start = Some(self.pos);
            }
            self.pos += 1;
        }
        self.flush_text(self.end);
    }

    fn peek(&self, offset: usize) -> Option<u8> {
        let index = self.pos + offset;
        if index < self.end {
            Some(self.src[index])
        } else {
            None
        }
    }

    fn starts_with(&self, pattern: &[u8]) -> bool {
        self.src[self.pos..self.end].starts_with(pattern)
    }

    fn flush_text(&mut self, upto: usize) {
        if let Some(start) = self.text_start.take() {
            if upto > start {
                self.tokens.push(Token::Text(Span::new(start, upto)));
            }
        }
    }

    fn issue(&mut self, offset: usize, message: impl Into<String>) {
        self.issues.push(LexIssue {
            offset,
            message: message.into(),
        });
    }

    fn skip_whitespace(&mut self) {
        while self.pos < self.end && self.src[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    /// Lex a tag or comment at `<`; returns false when `<` is plain text.
    fn try_markup(&mut self) -> bool {
        if self.starts_with(b"<!--") {
            self.comment();
            return true;
        }
        match (self.peek(1), self.peek(2)) {
            (Some(b'/'), Some(c)) if c.is_ascii_alphabetic() => {
                self.closing_tag();
                true
            }
            (Some(c), _) if c.is_ascii_alphabetic() => {
                self.opening_tag();
                true
            }
            _ => false,
        }
    }

    fn comment(&mut self) {
        let start = self.pos;
        self.flush_text(start);
        let body = start + 4;
        let close = self.text[body..self.end].find("-->");
        let end = match close {
            Some(index) => body + index + 3,
            None => {
                self.issue(start, "Unterminated comment");
                self.end
            }
        };
        self.tokens.push(Token::Comment(Span::new(start, end)));
        self.pos = end;
    }

    fn name(&mut self) -> (String, Span) {
        let start = self.pos;
        while self.pos < self.end && is_name_byte(self.src[self.pos]) {
            self.pos += 1;
        }
        let span = Span::new(start, self.pos);
        (self.text[start..self.pos].to_ascii_lowercase(), span)
    }

    fn closing_tag(&mut self) {
        let start = self.pos;
        self.flush_text(start);
        self.pos += 2;
        let (name, _) = self.name();
        self.skip_whitespace();
        self.expect_tag_end(&name);
        self.tokens.push(Token::Close {
            name,
            span: Span::new(start, self.pos),
        });
    }

    /// Consume `>`; on anything else report and resynchronize after the next `>`.
    fn expect_tag_end(&mut self, name: &str) {
        match self.peek(0) {
            Some(b'>') => self.pos += 1,
            Some(c) => {
                self.issue(
                    self.pos,
                    format!("Unexpected character '{}' in tag <{}>", c as char, name),
                );
                match self.text[self.pos..self.end].find('>') {
                    Some(index) => self.pos += index + 1,
                    None => self.pos = self.end,
                }
            }
            None => {
                self.issue(self.pos, format!("Unterminated tag <{}>", name));
            }
        }
    }

    fn opening_tag(&mut self) {
        let start = self.pos;
        self.flush_text(start);
        self.pos += 1;
        let (name, name_span) = self.name();
        let mut attributes: Vec<HtmlAttribute> = Vec::new();
        let mut self_closing = None;

        loop {
            self.skip_whitespace();
            match self.peek(0) {
                None => {
                    self.issue(self.pos, format!("Unterminated tag <{}>", name));
                    break;
                }
                Some(b'>') => {
                    self.pos += 1;
                    break;
                }
                Some(b'/') if self.peek(1) == Some(b'>') => {
                    self_closing = Some(Span::new(self.pos, self.pos + 1));
                    self.pos += 2;
                    break;
                }
                Some(c) if is_attribute_name_byte(c) => {
                    if let Some(attribute) = self.attribute() {
                        attributes.push(attribute);
                    }
                }
                Some(c) => {
                    self.issue(
                        self.pos,
                        format!("Unexpected character '{}' in tag <{}>", c as char, name),
                    );
                    self.pos += 1;
                }
            }
        }

        let raw_text = self_closing.is_none() && RAW_TEXT_ELEMENTS.contains(&name.as_str());
        let closing = format!("</{}", name);
        self.tokens.push(Token::Open(TagToken {
            name,
            name_span,
            attributes,
            self_closing,
            span: Span::new(start, self.pos),
        }));
        if raw_text {
            self.raw_text(&closing);
        }
    }

    /// Emit everything up to `closing` (case-insensitive) as one text token.
    fn raw_text(&mut self, closing: &str) {
        let start = self.pos;
        let end = self.text[start..self.end]
            .to_ascii_lowercase()
            .find(closing)
            .map_or(self.end, |index| start + index);
        if end > start {
            self.tokens.push(Token::Text(Span::new(start, end)));
        }
        self.pos = end;
    }

    fn attribute(&mut self) -> Option<HtmlAttribute> {
        let start = self.pos;
        while self.pos < self.end && is_attribute_name_byte(self.src[self.pos]) {
            self.pos += 1;
        }
        let name = self.text[start..self.pos].to_ascii_lowercase();
        let after_name = self.pos;
        self.skip_whitespace();
        if self.peek(0) != Some(b'=') {
            self.pos = after_name;
            return Some(HtmlAttribute {
                name,
                span: Span::new(start, after_name),
                value: None,
            });
        }
        self.pos += 1;
        self.skip_whitespace();

        let value = match self.peek(0) {
            Some(quote @ (b'"' | b'\'')) => {
                let value_start = self.pos + 1;
                match self.src[value_start..self.end]
                    .iter()
                    .position(|&b| b == quote)
                {
                    Some(index) => {
                        self.pos = value_start + index + 1;
                        Span::new(value_start, value_start + index)
                    }
                    None => {
                        self.issue(start, format!("Unterminated value of attribute '{}'", name));
                        self.pos = self.end;
                        Span::new(value_start, self.end)
                    }
                }
            }
            Some(_) => {
                let value_start = self.pos;
                while self.pos < self.end
                    && !self.src[self.pos].is_ascii_whitespace()
                    && self.src[self.pos] != b'>'
                {
                    self.pos += 1;
                }
                Span::new(value_start, self.pos)
            }
            None => {
                self.issue(start, format!("Missing value of attribute '{}'", name));
                return None;
            }
        };

        Some(HtmlAttribute {
            name,
            span: Span::new(start, self.pos),
            value: Some(value),
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
