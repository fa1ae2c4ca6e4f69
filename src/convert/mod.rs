//! Dialect-aware rendering of parsed documents
//!
//! [`Converter`] walks the unified tree and writes it back out in the output
//! dialect: collapsible sections and cut markers are translated, relative
//! anchors are re-slugged, paragraphs are soft-wrapped and the remaining
//! source is reproduced exactly.

pub mod collapsible;
mod render;
pub mod wrap;

use log::debug;

use crate::config::{Dialect, ProcessorOptions};
use crate::error::Result;
use crate::markdown::{LineEnding, ParsedDocument};

/// Renders one parsed document into an output dialect.
pub struct Converter<'a> {
    parsed: &'a ParsedDocument,
    options: &'a ProcessorOptions,
    output: Dialect,
}

impl<'a> Converter<'a> {
    pub fn new(parsed: &'a ParsedDocument, options: &'a ProcessorOptions, output: Dialect) -> Self {
        Self {
            parsed,
            options,
            output,
        }
    }

    /// Produce the converted text.
    ///
    /// # Errors
    ///
    /// `Error::Invariant` when the tree holds a node the renderer cannot
    /// place (an end tag listed as content, a dangling node id).
    pub fn render(&self) -> Result<String> {
        debug!(
            "Rendering {} → {}",
            self.parsed.dialect.name(),
            self.output.name()
        );
        let text = render::Renderer::new(self.parsed, self.options, self.output).render()?;
        if self.options.normalize_breaks {
            Ok(normalize_line_endings(&text, self.parsed.line_ending))
        } else {
            Ok(text)
        }
    }
}

/// Rewrite every line ending to `ending`.
pub fn normalize_line_endings(text: &str, ending: LineEnding) -> String {
    let unix = text.replace("\r\n", "\n");
    match ending {
        LineEnding::Lf => unix,
        LineEnding::CrLf => unix.replace('\n', "\r\n"),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::MemoryLogger;
    use crate::markdown::parse;
    use crate::text_file::TextFile;
    use std::sync::Arc;

    fn convert(text: &str, input: Dialect, output: Dialect, options: &ProcessorOptions) -> String {
        let logger = MemoryLogger::new();
        let parsed = parse(Arc::new(TextFile::new(text)), input, &logger).unwrap();
        Converter::new(&parsed, options, output).render().unwrap()
    }

    fn same(text: &str, dialect: Dialect) -> String {
        convert(text, dialect, dialect, &ProcessorOptions::default())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Round-Trip Tests
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_round_trip_is_byte_exact() {
        let documents = [
            "",
            "plain",
            "# Title\n\nSome *emphasis*, **strong** and `code`.\n",
            "Setext\n======\n\n- a\n- b\n  - nested\n\n1) one\n2) two\n",
            "> quote with [link](#title)\n> continued\n\n---\n\n| a | b |\n|---|---|\n| 1 | 2 |\n",
            "```rust\nfn main() {}\n```\n\n    indented code\n",
            "<details>\n<summary>T</summary>\n\nBody\n\n</details>\n",
            "Inline <b>html</b> and <!-- comment --> here\n",
            "---\ntitle: front\n---\n\n# After\n",
            "Hard  \nbreak and trailing\\\nslash\n",
            "Line one\r\nLine two\r\n\r\nPara\r\n",
            "<div>\n<span>\n</div>\n",
            "Unicode: привет, мир, ünïcödé «ok»\n",
            "Intro\n\n<!-- multi\nline -->\n\n<pre>\n  kept\n\n spacing\n</pre>\n\nEnd\n",
        ];
        for document in documents {
            assert_eq!(same(document, Dialect::GitHub), document);
        }
    }

    #[test]
    fn test_round_trip_habr() {
        let text = "# Заголовок\n\nТекст <cut/>\n\n<spoiler title=\"T\">\n\nBody\n\n</spoiler>\n";
        assert_eq!(same(text, Dialect::Habr), text);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Collapsible Tests
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_details_spoiler_round_trip() {
        let details = "<details>\n<summary>T</summary>\n\nBody\n\n</details>\n";
        let options = ProcessorOptions::default();
        let spoiler = convert(details, Dialect::GitHub, Dialect::Habr, &options);
        assert_eq!(spoiler, "<spoiler title=\"T\">\n\nBody\n\n</spoiler>\n");
        let back = convert(&spoiler, Dialect::Habr, Dialect::GitHub, &options);
        assert_eq!(back, details);
    }

    #[test]
    fn test_same_dialect_keeps_foreign_sections() {
        let details = "<details>\n<summary>T</summary>\n\nBody\n\n</details>\n";
        assert_eq!(same(details, Dialect::Habr), details);
        let spoiler = "<spoiler title=\"T\">\n\nBody\n\n</spoiler>\n";
        assert_eq!(same(spoiler, Dialect::GitHub), spoiler);
    }

    #[test]
    fn test_summary_markup_survives_round_trip() {
        let details = "<details>\n<summary><b>T</b></summary>\n\nBody\n\n</details>\n";
        let options = ProcessorOptions::default();
        let spoiler = convert(details, Dialect::GitHub, Dialect::Habr, &options);
        assert_eq!(spoiler, "<spoiler title=\"<b>T</b>\">\n\nBody\n\n</spoiler>\n");
        let back = convert(&spoiler, Dialect::Habr, Dialect::GitHub, &options);
        assert_eq!(back, details);
    }

    #[test]
    fn test_details_to_liquid() {
        let details = "<details>\n<summary>More</summary>\n\nBody\n\n</details>\n";
        let liquid = convert(details, Dialect::GitHub, Dialect::Dev, &ProcessorOptions::default());
        assert_eq!(liquid, "{% details More %}\n\nBody\n\n{% enddetails %}\n");
    }

    #[test]
    fn test_liquid_to_details() {
        let liquid = "{% details More %}\n\nBody\n\n{% enddetails %}\n";
        let details = convert(liquid, Dialect::Dev, Dialect::GitHub, &ProcessorOptions::default());
        assert_eq!(details, "<details>\n<summary>More</summary>\n\nBody\n\n</details>\n");
    }

    #[test]
    fn test_remove_details() {
        let options = ProcessorOptions {
            remove_details: true,
            ..Default::default()
        };
        let text = "Intro\n\n<details>\n<summary>T</summary>\n\nBody\n\n</details>\n\nOutro\n";
        assert_eq!(
            convert(text, Dialect::GitHub, Dialect::GitHub, &options),
            "Intro\n\nOutro\n"
        );
        let liquid = "Intro\n\n{% details T %}\n\nBody\n\n{% enddetails %}\n\nOutro\n";
        assert_eq!(
            convert(liquid, Dialect::Dev, Dialect::Dev, &options),
            "Intro\n\nOutro\n"
        );
    }

    #[test]
    fn test_cut_dropped_without_cut_support() {
        let text = "Teaser <cut/> rest\n";
        assert_eq!(
            convert(text, Dialect::Habr, Dialect::GitHub, &ProcessorOptions::default()),
            "Teaser rest\n"
        );
    }

    #[test]
    fn test_remove_comments() {
        let options = ProcessorOptions {
            remove_comments: true,
            ..Default::default()
        };
        let text = "Text <!-- note --> more\n\n<!-- block -->\n\nNext\n";
        assert_eq!(
            convert(text, Dialect::GitHub, Dialect::GitHub, &options),
            "Text more\n\nNext\n"
        );
    }

    #[test]
    fn test_remove_multi_line_comment() {
        let options = ProcessorOptions {
            remove_comments: true,
            ..Default::default()
        };
        let text = "Intro\n\n<!-- multi\nline -->\n\nNext\n";
        assert_eq!(
            convert(text, Dialect::GitHub, Dialect::GitHub, &options),
            "Intro\n\nNext\n"
        );
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Link Tests
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_header_image_link() {
        let text = "# Header\n\nParagraph [Some link](https://google.com)\n\n![Header Image](https://x/y.jpg)";
        let options = ProcessorOptions {
            header_image_link: Some("https://example.com".to_string()),
            ..Default::default()
        };
        let result = convert(text, Dialect::GitHub, Dialect::GitHub, &options);
        assert_eq!(
            result,
            "# Header\n\nParagraph [Some link](https://google.com)\n\n[![Header Image](https://x/y.jpg)](https://example.com)"
        );
    }

    #[test]
    fn test_relative_links_are_reslugged() {
        let text = "# Привет мир\n\n[go](#привет-мир)\n";
        let result = convert(text, Dialect::GitHub, Dialect::Habr, &ProcessorOptions::default());
        assert_eq!(result, "# Привет мир\n\n[go](#privet-mir)\n");
    }

    #[test]
    fn test_unknown_anchor_is_kept() {
        let text = "# A\n\n[go](#missing)\n";
        let result = convert(text, Dialect::GitHub, Dialect::Habr, &ProcessorOptions::default());
        assert_eq!(result, text);
    }

    #[test]
    fn test_images_map_substitution() {
        let mut options = ProcessorOptions::default();
        options
            .images_map
            .insert("a.png".to_string(), "https://cdn.example/a.png".to_string());
        let text = "![a](a.png) <img src=\"a.png\">\n";
        assert_eq!(
            convert(text, Dialect::GitHub, Dialect::GitHub, &options),
            "![a](https://cdn.example/a.png) <img src=\"https://cdn.example/a.png\">\n"
        );
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Normalization Tests
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_normalize_headings_and_lists() {
        let options = ProcessorOptions {
            normalize: true,
            ..Default::default()
        };
        let text = "#   Title #\n\nSub\n---\n\n-   item\n*  other\n";
        assert_eq!(
            convert(text, Dialect::GitHub, Dialect::GitHub, &options),
            "# Title\n\n## Sub\n\n- item\n* other\n"
        );
    }

    #[test]
    fn test_remove_title_header() {
        let options = ProcessorOptions {
            remove_title_header: true,
            ..Default::default()
        };
        let text = "# Title\n\nBody\n\n# Second\n";
        assert_eq!(
            convert(text, Dialect::GitHub, Dialect::GitHub, &options),
            "Body\n\n# Second\n"
        );
    }

    #[test]
    fn test_indent_string() {
        let options = ProcessorOptions {
            indent_string: "    ".to_string(),
            ..Default::default()
        };
        let text = "- a\n  - b\n  - c\n";
        assert_eq!(
            convert(text, Dialect::GitHub, Dialect::GitHub, &options),
            "- a\n    - b\n    - c\n"
        );
    }

    #[test]
    fn test_wrap_paragraphs_only() {
        let options = ProcessorOptions {
            lines_max_length: 12,
            ..Default::default()
        };
        let text = "# A very long heading line\n\none two three four five\n";
        assert_eq!(
            convert(text, Dialect::GitHub, Dialect::GitHub, &options),
            "# A very long heading line\n\none two\nthree four\nfive\n"
        );
    }

    #[test]
    fn test_wrap_leaves_code_and_tags_intact() {
        let options = ProcessorOptions {
            lines_max_length: 80,
            ..Default::default()
        };
        let text = "a `x   y` b <span title=\"p  q\">c</span>\nd\n";
        assert_eq!(
            convert(text, Dialect::GitHub, Dialect::GitHub, &options),
            "a `x   y` b <span title=\"p  q\">c</span> d\n"
        );
    }

    #[test]
    fn test_wrap_idempotence() {
        let options = ProcessorOptions {
            lines_max_length: 20,
            ..Default::default()
        };
        let text = "> Lorem ipsum dolor sit amet, consectetur adipiscing elit.\n\n- sed do eiusmod tempor incididunt ut labore\n";
        let once = convert(text, Dialect::GitHub, Dialect::GitHub, &options);
        let twice = convert(&once, Dialect::GitHub, Dialect::GitHub, &options);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_join_lines() {
        let options = ProcessorOptions {
            lines_max_length: -1,
            ..Default::default()
        };
        let text = "one\ntwo\nthree\n\n> four\n> five\n";
        assert_eq!(
            convert(text, Dialect::GitHub, Dialect::GitHub, &options),
            "one two three\n\n> four five\n"
        );
    }

    #[test]
    fn test_normalize_breaks() {
        let options = ProcessorOptions {
            normalize_breaks: true,
            ..Default::default()
        };
        let text = "a\r\nb\r\nc\n";
        assert_eq!(
            convert(text, Dialect::GitHub, Dialect::GitHub, &options),
            "a\r\nb\r\nc\r\n"
        );
    }
}
