//! Final-text validation of the "read more" cut marker.

use regex::Regex;
use std::sync::OnceLock;

use crate::config::{Dialect, ProcessorOptions};
use crate::logger::Logger;

fn cut_marker() -> &'static Regex {
    static CUT: OnceLock<Regex> = OnceLock::new();
    CUT.get_or_init(|| Regex::new(r"<cut\b[^>]*>").expect("cut marker pattern is valid"))
}

/// Checks output text against the cut placement limits of its dialect.
pub struct Postprocessor;

impl Postprocessor {
    /// Emit one warning per violated bound. Never changes the text.
    pub fn postprocess(text: &str, dialect: Dialect, options: &ProcessorOptions, logger: &dyn Logger) {
        if !dialect.supports_cut() {
            return;
        }
        let length = |s: &str| s.trim().chars().count();

        let Some(cut) = cut_marker().find(text) else {
            let total = length(text);
            if total > options.cut_max_length {
                logger.warn(&format!(
                    "Text is {} characters long; a <cut/> is required above {}",
                    total, options.cut_max_length
                ));
            }
            return;
        };

        let before = length(&text[..cut.start()]);
        let after = length(&text[cut.end()..]);
        if before < options.cut_min_length {
            logger.warn(&format!(
                "Text before <cut/> is too short: {} < {}",
                before, options.cut_min_length
            ));
        }
        if before > options.cut_max_length {
            logger.warn(&format!(
                "Text before <cut/> is too long: {} > {}",
                before, options.cut_max_length
            ));
        }
        if after < options.cut_after_min_length {
            logger.warn(&format!(
                "Text after <cut/> is too short: {} < {}",
                after, options.cut_after_min_length
            ));
        }
    }
}
