//! Conversion options and dialect definitions
//!
//! `ProcessorOptions` is deserialized with serde from JSON or TOML; every
//! field has a default so partial files are accepted.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

// ─────────────────────────────────────────────────────────────────────────────
// Dialect
// ─────────────────────────────────────────────────────────────────────────────

/// A named set of Markdown/HTML rendering conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// GitHub-flavored Markdown: `<details>`/`<summary>`, Latin-preserving anchors
    #[default]
    GitHub,
    /// Habr: `<spoiler title>`, `<cut/>`, transliterated anchors
    Habr,
    /// Dev.to: `{% details %}` liquid tags, Latin-preserving anchors
    Dev,
}

/// How a dialect turns heading titles into anchor slugs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlugStyle {
    /// Keep letters of any script, lower-cased
    LatinPreserving,
    /// Transliterate Cyrillic into ASCII
    Transliterating,
}

/// Syntax used for collapsible sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollapsibleForm {
    /// `<details><summary>T</summary>…</details>`
    Details,
    /// `<spoiler title="T">…</spoiler>`
    Spoiler,
    /// `{% details T %} … {% enddetails %}`
    Liquid,
}

impl Dialect {
    /// Lowercase identifier, also used in output file names.
    pub fn name(&self) -> &'static str {
        match self {
            Dialect::GitHub => "github",
            Dialect::Habr => "habr",
            Dialect::Dev => "dev",
        }
    }

    pub fn slug_style(&self) -> SlugStyle {
        match self {
            Dialect::GitHub | Dialect::Dev => SlugStyle::LatinPreserving,
            Dialect::Habr => SlugStyle::Transliterating,
        }
    }

    pub fn collapsible_form(&self) -> CollapsibleForm {
        match self {
            Dialect::GitHub => CollapsibleForm::Details,
            Dialect::Habr => CollapsibleForm::Spoiler,
            Dialect::Dev => CollapsibleForm::Liquid,
        }
    }

    /// Whether the dialect has a "read more" cut marker.
    pub fn supports_cut(&self) -> bool {
        matches!(self, Dialect::Habr)
    }

    /// Get all available dialects.
    pub fn all() -> &'static [Dialect] {
        &[Dialect::GitHub, Dialect::Habr, Dialect::Dev]
    }

    /// Guess the dialect of a document from platform-specific markup.
    pub fn detect(text: &str) -> Dialect {
        if text.contains("<spoiler") || text.contains("<cut") {
            Dialect::Habr
        } else if text.contains("{% details") {
            Dialect::Dev
        } else {
            Dialect::GitHub
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Dialect::all()
            .iter()
            .copied()
            .find(|d| d.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown dialect '{}' (expected github, habr or dev)", s))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Processor Options
// ─────────────────────────────────────────────────────────────────────────────

/// Options for one conversion run.
///
/// All fields have sensible defaults via the `Default` trait and `#[serde(default)]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorOptions {
    /// `0` keeps original breaks, `-1` joins each paragraph onto one line,
    /// `N > 0` wraps at N columns
    pub lines_max_length: i32,

    /// Dialect of the input; detected from the text when unset
    pub input_dialect: Option<Dialect>,

    /// Dialect of the output; same as the input when unset
    pub output_dialect: Option<Dialect>,

    /// URL that the first image gets wrapped into as a link target
    pub header_image_link: Option<String>,

    /// Drop a leading level-1 heading
    pub remove_title_header: bool,

    /// Rewrite every line ending to the document's dominant style
    pub normalize_breaks: bool,

    /// Canonicalize heading and list marker spacing
    pub normalize: bool,

    /// Indentation unit for nested list items (empty keeps the source)
    pub indent_string: String,

    /// Probe absolute links and verify relative anchors
    pub check_links: bool,

    /// Whether duplicate images were mapped by content hash (gates loading
    /// of the remap side file in the CLI)
    pub compare_image_hashes: bool,

    /// Base directory for resolving local links
    pub root_directory: Option<PathBuf>,

    /// Address substitutions applied to links and images
    pub images_map: HashMap<String, String>,

    /// Drop collapsible sections together with their content
    pub remove_details: bool,

    /// Drop HTML comments
    pub remove_comments: bool,

    /// Minimum text length before a cut marker
    pub cut_min_length: usize,

    /// Maximum text length before a cut marker (and of a cut-less article)
    pub cut_max_length: usize,

    /// Minimum text length after a cut marker
    pub cut_after_min_length: usize,

    /// Per-probe timeout of the link checker
    pub link_check_timeout_ms: u64,
}

impl Default for ProcessorOptions {
    fn default() -> Self {
        Self {
            lines_max_length: 0,
            input_dialect: None,
            output_dialect: None,
            header_image_link: None,
            remove_title_header: false,
            normalize_breaks: false,
            normalize: false,
            indent_string: String::new(),
            check_links: false,
            compare_image_hashes: false,
            root_directory: None,
            images_map: HashMap::new(),
            remove_details: false,
            remove_comments: false,
            cut_min_length: 100,
            cut_max_length: 1000,
            cut_after_min_length: 100,
            link_check_timeout_ms: 2000,
        }
    }
}

impl ProcessorOptions {
    /// Smallest accepted probe timeout.
    pub const MIN_TIMEOUT_MS: u64 = 100;

    /// Resolve the input dialect for a document.
    pub fn input_dialect_for(&self, text: &str) -> Dialect {
        self.input_dialect.unwrap_or_else(|| Dialect::detect(text))
    }

    /// Resolve the output dialect once the input dialect is known.
    pub fn output_dialect_for(&self, input: Dialect) -> Dialect {
        self.output_dialect.unwrap_or(input)
    }

    /// Clamp values that a hand-edited file might get wrong.
    pub fn sanitize(&mut self) {
        if self.lines_max_length < -1 {
            self.lines_max_length = -1;
        }
        if self.cut_min_length > self.cut_max_length {
            self.cut_min_length = self.cut_max_length;
        }
        self.link_check_timeout_ms = self.link_check_timeout_ms.max(Self::MIN_TIMEOUT_MS);
        if let Some(link) = &self.header_image_link {
            if link.trim().is_empty() {
                self.header_image_link = None;
            }
        }
    }

    /// Deserialize JSON and sanitize the result.
    pub fn from_json_sanitized(json: &str) -> Result<Self, serde_json::Error> {
        let mut options: Self = serde_json::from_str(json)?;
        options.sanitize();
        Ok(options)
    }

    /// Deserialize TOML and sanitize the result.
    pub fn from_toml_sanitized(text: &str) -> Result<Self, toml::de::Error> {
        let mut options: Self = toml::from_str(text)?;
        options.sanitize();
        Ok(options)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = ProcessorOptions::default();
        assert_eq!(options.lines_max_length, 0);
        assert!(options.input_dialect.is_none());
        assert!(!options.check_links);
        assert_eq!(options.cut_min_length, 100);
        assert_eq!(options.cut_max_length, 1000);
    }

    #[test]
    fn test_dialect_serialization() {
        let json = serde_json::to_string(&Dialect::Habr).unwrap();
        assert_eq!(json, "\"habr\"");
        let dialect: Dialect = serde_json::from_str("\"dev\"").unwrap();
        assert_eq!(dialect, Dialect::Dev);
    }

    #[test]
    fn test_dialect_from_str() {
        assert_eq!("GitHub".parse::<Dialect>(), Ok(Dialect::GitHub));
        assert_eq!(" habr ".parse::<Dialect>(), Ok(Dialect::Habr));
        assert!("gitlab".parse::<Dialect>().is_err());
    }

    #[test]
    fn test_dialect_detection() {
        assert_eq!(Dialect::detect("text <cut/> more"), Dialect::Habr);
        assert_eq!(Dialect::detect("<spoiler title=\"x\">y</spoiler>"), Dialect::Habr);
        assert_eq!(Dialect::detect("{% details T %}\nx\n{% enddetails %}"), Dialect::Dev);
        assert_eq!(Dialect::detect("# plain"), Dialect::GitHub);
    }

    #[test]
    fn test_output_dialect_defaults_to_input() {
        let options = ProcessorOptions::default();
        assert_eq!(options.output_dialect_for(Dialect::Habr), Dialect::Habr);
    }

    #[test]
    fn test_deserialize_partial_json() {
        let json = r#"{"lines_max_length": 80, "output_dialect": "habr"}"#;
        let options = ProcessorOptions::from_json_sanitized(json).unwrap();
        assert_eq!(options.lines_max_length, 80);
        assert_eq!(options.output_dialect, Some(Dialect::Habr));
        assert!(!options.normalize);
    }

    #[test]
    fn test_deserialize_toml() {
        let text = "normalize = true\ninput_dialect = \"github\"\n\n[images_map]\n\"a.png\" = \"b.png\"\n";
        let options = ProcessorOptions::from_toml_sanitized(text).unwrap();
        assert!(options.normalize);
        assert_eq!(options.input_dialect, Some(Dialect::GitHub));
        assert_eq!(options.images_map.get("a.png").map(String::as_str), Some("b.png"));
    }

    #[test]
    fn test_sanitize() {
        let mut options = ProcessorOptions {
            lines_max_length: -5,
            cut_min_length: 2000,
            link_check_timeout_ms: 0,
            header_image_link: Some("  ".to_string()),
            ..Default::default()
        };
        options.sanitize();
        assert_eq!(options.lines_max_length, -1);
        assert_eq!(options.cut_min_length, options.cut_max_length);
        assert_eq!(options.link_check_timeout_ms, ProcessorOptions::MIN_TIMEOUT_MS);
        assert!(options.header_image_link.is_none());
    }
}
